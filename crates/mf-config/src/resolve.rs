//! Configuration discovery.
//!
//! Each file is looked up independently, in order: the directory given on
//! the command line, `$MEANFIELD_CONFIG_DIR`, then the XDG config
//! directory. A file found nowhere falls back to built-in defaults, so a
//! directory holding only `engine.json` still gets default priors.

use std::path::{Path, PathBuf};

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Inside the directory given on the command line.
    CliArgument,

    /// Inside `MEANFIELD_CONFIG_DIR`.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfigSource::CliArgument => "CLI argument",
            ConfigSource::Environment => "environment variable",
            ConfigSource::XdgConfig => "XDG config",
            ConfigSource::BuiltinDefault => "builtin default",
        };
        f.write_str(s)
    }
}

/// Environment variable naming a config directory.
pub const ENV_CONFIG_DIR: &str = "MEANFIELD_CONFIG_DIR";

pub const PRIORS_FILENAME: &str = "priors.json";
pub const ENGINE_FILENAME: &str = "engine.json";

/// Application name for XDG directories.
const APP_NAME: &str = "meanfield";

/// Discovered configuration file paths.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `priors.json`, or None for built-in priors.
    pub priors: Option<PathBuf>,

    /// `engine.json`, or None for built-in engine settings.
    pub engine: Option<PathBuf>,

    pub priors_source: ConfigSource,
    pub engine_source: ConfigSource,
}

/// Resolve both files against the process environment.
pub fn resolve_config(cli_dir: Option<&Path>) -> ConfigPaths {
    let env_dir = std::env::var_os(ENV_CONFIG_DIR).map(PathBuf::from);
    let dirs = search_dirs(cli_dir, env_dir.as_deref(), xdg_config_dir().as_deref());
    resolve_in(&dirs)
}

/// Candidate directories in priority order.
pub fn search_dirs(
    cli_dir: Option<&Path>,
    env_dir: Option<&Path>,
    xdg_dir: Option<&Path>,
) -> Vec<(ConfigSource, PathBuf)> {
    [
        (ConfigSource::CliArgument, cli_dir),
        (ConfigSource::Environment, env_dir),
        (ConfigSource::XdgConfig, xdg_dir),
    ]
    .into_iter()
    .filter_map(|(source, dir)| dir.map(|d| (source, d.to_path_buf())))
    .collect()
}

/// Look up each file in `dirs`, first hit wins.
pub fn resolve_in(dirs: &[(ConfigSource, PathBuf)]) -> ConfigPaths {
    let (priors, priors_source) = find(dirs, PRIORS_FILENAME);
    let (engine, engine_source) = find(dirs, ENGINE_FILENAME);
    ConfigPaths {
        priors,
        engine,
        priors_source,
        engine_source,
    }
}

fn find(dirs: &[(ConfigSource, PathBuf)], filename: &str) -> (Option<PathBuf>, ConfigSource) {
    dirs.iter()
        .map(|(source, dir)| (*source, dir.join(filename)))
        .find(|(_, path)| path.is_file())
        .map(|(source, path)| (Some(path), source))
        .unwrap_or((None, ConfigSource::BuiltinDefault))
}

/// `$XDG_CONFIG_HOME/meanfield` (or the platform equivalent).
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
