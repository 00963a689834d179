//! Temporary tier layouts for both sides of the air gap

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use chromium_ferry::config::{Config, Mode};

pub fn put_files(dir: &Path, files: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for file in files {
        fs::write(dir.join(file), file).unwrap();
    }
}

/// An online host and an offline host sharing one bridge directory.
pub struct Tiers {
    _temp_dir: TempDir,
    pub online: Config,
    pub offline: Config,
}

impl Tiers {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let scripts_dir = root.join("scripts");
        put_files(&scripts_dir, &["download.sh", "build.sh", "create_idb.idc"]);
        let bridge_root = root.join("usb").join("chrome");

        let online_build = root.join("docker-home");
        let online = Config {
            mode: Mode::Online,
            archive_root: online_build.join("chrome"),
            bridge_root: bridge_root.clone(),
            build_root: online_build,
            scripts_dir: scripts_dir.clone(),
            ..Config::default()
        };

        let offline = Config {
            mode: Mode::Offline,
            archive_root: root.join("apks").join("chromium"),
            bridge_root,
            build_root: root.join("chrome"),
            scripts_dir,
            ..Config::default()
        };

        for config in [&online, &offline] {
            for dir in [
                &config.archive_root,
                &config.bridge_root,
                &config.build_root,
            ] {
                fs::create_dir_all(dir).unwrap();
            }
        }

        Self {
            _temp_dir: temp_dir,
            online,
            offline,
        }
    }

    /// Simulates unplugging the bridge drive.
    pub fn unmount_bridge(&self) {
        fs::remove_dir_all(&self.online.bridge_root).unwrap();
    }
}
