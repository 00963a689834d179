//! Command runner that plays the container runtime and disassembler

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chromium_ferry::pipeline::runner::{CommandError, CommandOutput, CommandRunner, ExternalCommand};

use super::tiers::put_files;

/// Records every command and fakes its effect on the filesystem:
///
/// - the download container writes the source tarballs to
///   `<mount>/chrome/<VERSION>`
/// - `image save -o <path>` writes `<path>`
/// - the build container writes both libraries to `<mount>/save`
/// - the disassembler writes `<library>.i64`
#[derive(Default)]
pub struct FakeRunner {
    commands: Mutex<Vec<ExternalCommand>>,
    stale_containers: Vec<String>,
    failing_program: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `name` in `container ls -a` output.
    pub fn with_stale_container(mut self, name: &str) -> Self {
        self.stale_containers.push(name.to_string());
        self
    }

    /// Makes every invocation of `program` exit unsuccessfully.
    pub fn failing(mut self, program: &str) -> Self {
        self.failing_program = Some(program.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Commands whose program is `program`, without the program name.
    pub fn invocations_of(&self, program: &str) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.program == program)
            .map(|cmd| cmd.args.clone())
            .collect()
    }
}

fn mount_source(command: &ExternalCommand) -> PathBuf {
    let mount = command
        .args
        .iter()
        .find_map(|arg| arg.strip_prefix("type=bind,source="))
        .unwrap();
    PathBuf::from(mount.split(",target=").next().unwrap())
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutput, CommandError> {
        self.commands.lock().unwrap().push(command.clone());

        if self.failing_program.as_deref() == Some(command.program.as_str()) {
            return Err(CommandError::Failed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
            });
        }

        let mut stdout = String::new();
        if command.program == "id" {
            stdout = "1000\n".to_string();
        } else if command.has_args_prefix(&["container", "ls"]) {
            stdout = self.stale_containers.join("\n");
        } else if command.has_args_prefix(&["container", "run", "--rm"]) {
            put_files(
                &mount_source(command).join("save"),
                &["libmonochrome32.so", "libmonochrome64.so", "build.stamp"],
            );
        } else if command.has_args_prefix(&["container", "run"]) {
            let version = command
                .args
                .iter()
                .find_map(|arg| arg.strip_prefix("VERSION="))
                .unwrap();
            put_files(
                &mount_source(command).join("chrome").join(version),
                &["chromium.tgz", "depot_tools.tgz"],
            );
        } else if command.has_args_prefix(&["image", "save", "-o"]) {
            fs::write(&command.args[3], "image").unwrap();
        } else if command.program == "idat" {
            let library = command.args.last().unwrap();
            fs::write(format!("{library}.i64"), "idb").unwrap();
        }

        Ok(CommandOutput {
            stdout: if command.capture_output {
                stdout
            } else {
                String::new()
            },
        })
    }
}
