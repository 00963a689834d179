//! Offline build collaborator: compiles a version from its source bundle,
//! archives the output and runs the disassembler on it

use std::fs;

use tracing::info;

use crate::config::Config;
use crate::pipeline::container::{ContainerRuntime, container_name};
use crate::pipeline::download::StagedScript;
use crate::pipeline::error::PipelineError;
use crate::pipeline::runner::{CommandRunner, ExternalCommand};
use crate::tier::copy::{CopyOptions, copy_dir};
use crate::tier::locator::{ArtifactSet, SOURCE_FILES};
use crate::version::types::Version;

pub const BUILD_SCRIPT: &str = "build.sh";

/// Subdirectory of the build tree the build script writes its output to
pub const BUILD_OUTPUT_DIR: &str = "save";

/// Disassembler script that creates the analysis database
pub const DISASSEMBLER_SCRIPT: &str = "create_idb.idc";

/// Extra cache some versions leave behind next to the source bundle
const VPYTHON_CACHE: &str = "vpython_root.tgz";

/// Built libraries, 64-bit first, with the tag used for their log files.
const LIBRARIES: [(&str, &str); 2] = [("64", "libmonochrome64.so"), ("32", "libmonochrome32.so")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Built,
    AlreadyBuilt,
}

pub struct Builder<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Builder<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    pub fn build(&self, version: &Version) -> Result<BuildOutcome, PipelineError> {
        let archive_dir = self.config.archive_root.join(version.as_str());
        let build_dir = self.config.build_root.join(version.as_str());

        if ArtifactSet::Build.is_present_in(&archive_dir) {
            info!("{} already built", version);
            return Ok(BuildOutcome::AlreadyBuilt);
        }

        if !ArtifactSet::Source.is_present_in(&build_dir) {
            return Err(PipelineError::MissingSource(version.clone()));
        }

        let user = self.invoking_user()?;
        let name = container_name(version);
        let runtime = ContainerRuntime::new(self.runner, &self.config.container.runtime);

        let script = StagedScript::stage(
            &self.config.scripts_dir.join(BUILD_SCRIPT),
            &build_dir.join(BUILD_SCRIPT),
        )?;

        runtime.load_image(&build_dir.join("docker.tar"))?;
        runtime.run_build(&name, &user, &build_dir, &format!("/home/{BUILD_SCRIPT}"))?;
        runtime.remove_image(&name)?;

        let output_dir = build_dir.join(BUILD_OUTPUT_DIR);
        copy_dir(&output_dir, &archive_dir, CopyOptions::default())?;
        fs::remove_dir_all(&output_dir).map_err(PipelineError::io(&output_dir))?;

        for file in SOURCE_FILES {
            let path = build_dir.join(file);
            fs::remove_file(&path).map_err(PipelineError::io(&path))?;
        }
        let vpython = build_dir.join(VPYTHON_CACHE);
        if vpython.exists() {
            fs::remove_file(&vpython).map_err(PipelineError::io(&vpython))?;
        }
        script.remove()?;

        for (arch, library) in LIBRARIES {
            self.disassemble(arch, &archive_dir.join(library))?;
        }

        Ok(BuildOutcome::Built)
    }

    /// `uid:gid` of the current user, so build output is not owned by root.
    fn invoking_user(&self) -> Result<String, PipelineError> {
        let id = |flag: &str| -> Result<String, PipelineError> {
            let output = self
                .runner
                .run(&ExternalCommand::new("id").arg(flag).captured())?;
            Ok(output.stdout.trim().to_string())
        };
        Ok(format!("{}:{}", id("-u")?, id("-g")?))
    }

    fn disassemble(&self, arch: &str, library: &std::path::Path) -> Result<(), PipelineError> {
        let scripts = &self.config.scripts_dir;
        let command = ExternalCommand::new(&self.config.disassembler)
            .arg("-A")
            .arg(format!("-L{}", scripts.join(format!("ida{arch}.log")).display()))
            .arg(format!("-S{}", scripts.join(DISASSEMBLER_SCRIPT).display()))
            .arg(library.display().to_string());
        self.runner.run(&command)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::pipeline::runner::{CommandError, CommandOutput, MockCommandRunner};
    use crate::tier::locator::BUILD_FILES;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn offline_config(temp_dir: &TempDir) -> Config {
        let root = temp_dir.path();
        let scripts_dir = root.join("scripts");
        fs::create_dir_all(&scripts_dir).unwrap();
        fs::write(scripts_dir.join(BUILD_SCRIPT), "#!/bin/sh\n").unwrap();

        Config {
            mode: Mode::Offline,
            archive_root: root.join("apks"),
            bridge_root: root.join("usb"),
            build_root: root.join("chrome"),
            scripts_dir,
            ..Config::default()
        }
    }

    fn put_files(dir: &Path, files: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for file in files {
            fs::write(dir.join(file), "").unwrap();
        }
    }

    /// Stands in for the container and disassembler: the build container
    /// writes both libraries to `save/`, the disassembler writes `<lib>.i64`.
    fn fake_toolchain(
        build_dir: PathBuf,
    ) -> impl FnMut(&ExternalCommand) -> Result<CommandOutput, CommandError> + Send + 'static {
        move |cmd: &ExternalCommand| {
            if cmd.program == "id" {
                return Ok(CommandOutput {
                    stdout: "1000\n".into(),
                });
            }
            if cmd.has_args_prefix(&["container", "run"]) {
                assert!(
                    cmd.args
                        .windows(2)
                        .any(|w| w[0] == "--user" && w[1] == "1000:1000")
                );
                put_files(
                    &build_dir.join(BUILD_OUTPUT_DIR),
                    &["libmonochrome32.so", "libmonochrome64.so", "build.stamp"],
                );
            }
            if cmd.program == "idat" {
                let library = cmd.args.last().unwrap();
                fs::write(format!("{library}.i64"), "").unwrap();
            }
            Ok(CommandOutput::default())
        }
    }

    #[test]
    fn missing_source_is_reported_without_running_anything() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        put_files(
            &config.build_root.join("1.2.3.4"),
            &["chromium.tgz", "docker.tar"],
        );
        let runner = MockCommandRunner::new();

        let result = Builder::new(&config, &runner).build(&v("1.2.3.4"));

        match result {
            Err(PipelineError::MissingSource(version)) => assert_eq!(version.as_str(), "1.2.3.4"),
            other => panic!("expected MissingSource, got {other:?}"),
        }
    }

    #[test]
    fn already_built_version_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        put_files(&config.archive_root.join("1.2.3.4"), &BUILD_FILES);
        let runner = MockCommandRunner::new();

        let outcome = Builder::new(&config, &runner).build(&v("1.2.3.4")).unwrap();

        assert_eq!(outcome, BuildOutcome::AlreadyBuilt);
    }

    #[test]
    fn build_archives_output_and_clears_source() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        let build_dir = config.build_root.join("1.2.3.4");
        put_files(&build_dir, &SOURCE_FILES);
        put_files(&build_dir, &[VPYTHON_CACHE]);

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(fake_toolchain(build_dir.clone()));

        let outcome = Builder::new(&config, &runner).build(&v("1.2.3.4")).unwrap();

        let archive_dir = config.archive_root.join("1.2.3.4");
        assert_eq!(outcome, BuildOutcome::Built);
        assert!(ArtifactSet::Build.is_present_in(&archive_dir));
        assert!(archive_dir.join("libmonochrome64.so").exists());
        assert!(!archive_dir.join("build.stamp").exists());
        assert!(!build_dir.join(BUILD_OUTPUT_DIR).exists());
        assert!(!ArtifactSet::Source.is_present_in(&build_dir));
        assert!(!build_dir.join(VPYTHON_CACHE).exists());
        assert!(!build_dir.join(BUILD_SCRIPT).exists());
    }

    #[test]
    fn disassembler_runs_for_64_bit_then_32_bit() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        let build_dir = config.build_root.join("5.6.7.8");
        put_files(&build_dir, &SOURCE_FILES);

        let libraries: std::sync::Arc<std::sync::Mutex<Vec<String>>> = Default::default();
        let seen = std::sync::Arc::clone(&libraries);
        let mut fake = fake_toolchain(build_dir.clone());

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |cmd: &ExternalCommand| {
            if cmd.program == "idat" {
                let library = cmd.args.last().unwrap();
                let name = library.rsplit(['/', '\\']).next().unwrap();
                seen.lock().unwrap().push(name.to_string());
            }
            fake(cmd)
        });

        Builder::new(&config, &runner).build(&v("5.6.7.8")).unwrap();

        assert_eq!(
            *libraries.lock().unwrap(),
            vec!["libmonochrome64.so", "libmonochrome32.so"]
        );
    }
}
