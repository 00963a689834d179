//! Online download collaborator: fetches a version's source inside a
//! container and saves the container image next to it

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::pipeline::container::{ContainerRuntime, container_name};
use crate::pipeline::error::PipelineError;
use crate::pipeline::runner::CommandRunner;
use crate::tier::locator::ArtifactSet;
use crate::version::types::Version;

pub const DOWNLOAD_SCRIPT: &str = "download.sh";

const CASE_CHECK_FILE: &str = "CASE_SENSITIVITY_CHECK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    AlreadyPresent,
}

pub struct Downloader<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Downloader<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    pub fn download(&self, version: &Version) -> Result<DownloadOutcome, PipelineError> {
        let archive_dir = self.config.archive_root.join(version.as_str());

        if ArtifactSet::Source.is_present_in(&archive_dir) {
            info!("{} already downloaded", version);
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        let runtime = ContainerRuntime::new(self.runner, &self.config.container.runtime);
        let name = container_name(version);
        if runtime.container_exists(&name)? {
            return Err(PipelineError::ContainerNameCollision(name));
        }

        // Chromium checkouts contain paths differing only by case; gclient sync
        // breaks on a case-insensitive build root.
        ensure_case_sensitive(&self.config.build_root)?;

        info!("Downloading version {}", version);
        let script = StagedScript::stage(
            &self.config.scripts_dir.join(DOWNLOAD_SCRIPT),
            &self.config.build_root.join(DOWNLOAD_SCRIPT),
        )?;

        let image = &self.config.container.base_image;
        runtime.pull(image)?;
        runtime.run_download(
            &name,
            version,
            &self.config.build_root,
            image,
            &format!("/home/{DOWNLOAD_SCRIPT}"),
        )?;
        runtime.commit(&name, &name)?;

        fs::create_dir_all(&archive_dir).map_err(PipelineError::io(&archive_dir))?;
        runtime.save_image(&name, &archive_dir.join("docker.tar"))?;
        runtime.remove_container(&name)?;
        runtime.remove_image(&name)?;

        script.remove()?;
        Ok(DownloadOutcome::Downloaded)
    }
}

/// Fails unless `dir` distinguishes file names by case.
pub fn ensure_case_sensitive(dir: &Path) -> Result<(), PipelineError> {
    let marker = dir.join(CASE_CHECK_FILE);
    fs::write(&marker, b"").map_err(PipelineError::io(&marker))?;

    let folded = dir.join(CASE_CHECK_FILE.to_lowercase()).exists();
    fs::remove_file(&marker).map_err(PipelineError::io(&marker))?;

    if folded {
        return Err(PipelineError::EnvironmentPrecondition(format!(
            "{} must be case sensitive",
            dir.display()
        )));
    }
    Ok(())
}

/// A helper script copied into a directory mounted by a container. Removed
/// explicitly on success; left in place on failure for inspection.
pub(crate) struct StagedScript {
    path: PathBuf,
}

impl StagedScript {
    pub(crate) fn stage(from: &Path, to: &Path) -> Result<Self, PipelineError> {
        fs::copy(from, to).map_err(PipelineError::io(from))?;
        Ok(Self {
            path: to.to_path_buf(),
        })
    }

    pub(crate) fn remove(self) -> Result<(), PipelineError> {
        fs::remove_file(&self.path).map_err(PipelineError::io(&self.path))
    }
}
