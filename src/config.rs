use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::version::registries::version_history::DEFAULT_BASE_URL;

/// File name of the stable release snapshot kept on the bridge drive
pub const CATALOG_FILE_NAME: &str = "versions.json";

/// Config file looked up in the config directory when `--config` is absent
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Which side of the air gap this machine is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Network-connected: downloads sources, archives every stable build
    Online,
    /// Air-gapped: builds from sources carried over on the bridge drive
    Offline,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime configuration, built once in `main` and handed to every component
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub mode: Mode,
    /// Local archive of versions (the "save" root). Online, the download
    /// container writes sources to `<build_root>/chrome/<version>`, so the
    /// default archive sits there.
    pub archive_root: PathBuf,
    /// Removable drive that carries artifacts across the air gap
    pub bridge_root: PathBuf,
    /// Scratch tree mounted into build containers
    pub build_root: PathBuf,
    /// Directory holding `download.sh`, `build.sh` and `create_idb.idc`
    pub scripts_dir: PathBuf,
    /// Stable snapshot location; defaults to `<bridge_root>/versions.json`
    pub catalog_path: Option<PathBuf>,
    pub container: ContainerConfig,
    /// Disassembler executable run on each built library
    pub disassembler: String,
    pub version_history_url: String,
    pub resume_partial_copies: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerConfig {
    pub runtime: String,
    pub base_image: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            base_image: "ubuntu:20.04".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let scripts_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        host_defaults(std::env::consts::OS, dirs::home_dir(), scripts_dir)
    }
}

impl Config {
    /// Loads `path` over the host defaults. Fields missing from the file keep
    /// their default value.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Uses the explicit file if given, else the default config file if it
    /// exists, else host defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| self.bridge_root.join(CATALOG_FILE_NAME))
    }

    pub fn is_online(&self) -> bool {
        self.mode == Mode::Online
    }
}

/// Platform-selected defaults: Windows and macOS hosts are the online side,
/// everything else is the offline build machine.
fn host_defaults(os: &str, home_dir: Option<PathBuf>, scripts_dir: PathBuf) -> Config {
    let home = home_dir.unwrap_or_else(|| PathBuf::from("."));

    let (mode, bridge_root, build_root, archive_root) = match os {
        "windows" => {
            let build_root = home.join("docker-home");
            (
                Mode::Online,
                PathBuf::from(r"I:\chrome"),
                build_root.clone(),
                build_root.join("chrome"),
            )
        }
        "macos" => {
            let build_root = PathBuf::from("/Volumes/case-sensitive/chrome");
            (
                Mode::Online,
                PathBuf::from("/Volumes/ferry/chrome"),
                build_root.clone(),
                build_root.join("chrome"),
            )
        }
        _ => (
            Mode::Offline,
            PathBuf::from("/media/ferry/chrome"),
            home.join("chrome"),
            home.join("apks").join("chromium"),
        ),
    };

    Config {
        mode,
        archive_root,
        bridge_root,
        build_root,
        scripts_dir,
        catalog_path: None,
        container: ContainerConfig::default(),
        disassembler: "idat".to_string(),
        version_history_url: DEFAULT_BASE_URL.to_string(),
        resume_partial_copies: false,
    }
}

/// Returns the path to the config directory for chromium-ferry.
/// Uses $XDG_CONFIG_HOME/chromium-ferry if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/chromium-ferry,
/// or ./chromium-ferry if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join("chromium-ferry")
}
