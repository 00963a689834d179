//! Thin wrapper over the container runtime CLI

use std::path::Path;

use crate::pipeline::runner::{CommandError, CommandRunner, ExternalCommand};
use crate::version::types::Version;

/// Container and image name used for a version's download/build environment.
pub fn container_name(version: &Version) -> String {
    format!("chrome_{version}")
}

/// Bind mount of `source` at `/home` inside the container.
fn home_mount(source: &Path) -> [String; 4] {
    [
        "--mount".to_string(),
        format!("type=bind,source={},target=/home", source.display()),
        "-e".to_string(),
        "HOME=/home".to_string(),
    ]
}

pub struct ContainerRuntime<'a> {
    runner: &'a dyn CommandRunner,
    program: &'a str,
}

impl<'a> ContainerRuntime<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: &'a str) -> Self {
        Self { runner, program }
    }

    fn command(&self) -> ExternalCommand {
        ExternalCommand::new(self.program)
    }

    /// Whether a container named `name` exists in any state.
    pub fn container_exists(&self, name: &str) -> Result<bool, CommandError> {
        let output = self
            .runner
            .run(&self.command().args(["container", "ls", "-a"]).captured())?;
        Ok(output.stdout.contains(name))
    }

    pub fn pull(&self, image: &str) -> Result<(), CommandError> {
        self.runner
            .run(&self.command().args(["image", "pull", image]))
            .map(drop)
    }

    /// Runs the download script in a named, persistent container.
    pub fn run_download(
        &self,
        name: &str,
        version: &Version,
        home: &Path,
        image: &str,
        script: &str,
    ) -> Result<(), CommandError> {
        let command = self
            .command()
            .args(["container", "run", "--name", name])
            .args(["--env".to_string(), format!("VERSION={version}")])
            .args(home_mount(home))
            .args([image, script]);
        self.runner.run(&command).map(drop)
    }

    /// Runs the build script in a throwaway container as `user` (`uid:gid`).
    pub fn run_build(
        &self,
        image: &str,
        user: &str,
        home: &Path,
        script: &str,
    ) -> Result<(), CommandError> {
        let command = self
            .command()
            .args(["container", "run", "--rm", "--user", user])
            .args(home_mount(home))
            .args([image, script]);
        self.runner.run(&command).map(drop)
    }

    pub fn commit(&self, container: &str, image: &str) -> Result<(), CommandError> {
        let command = self
            .command()
            .args(["container", "commit", container, image]);
        self.runner.run(&command).map(drop)
    }

    pub fn save_image(&self, image: &str, output: &Path) -> Result<(), CommandError> {
        let command = self
            .command()
            .args(["image", "save", "-o"])
            .arg(output.display().to_string())
            .arg(image);
        self.runner.run(&command).map(drop)
    }

    pub fn load_image(&self, input: &Path) -> Result<(), CommandError> {
        let command = self
            .command()
            .args(["load", "-i"])
            .arg(input.display().to_string());
        self.runner.run(&command).map(drop)
    }

    pub fn remove_container(&self, name: &str) -> Result<(), CommandError> {
        self.runner
            .run(&self.command().args(["container", "rm", name]))
            .map(drop)
    }

    pub fn remove_image(&self, name: &str) -> Result<(), CommandError> {
        self.runner
            .run(&self.command().args(["image", "rm", name]))
            .map(drop)
    }
}
