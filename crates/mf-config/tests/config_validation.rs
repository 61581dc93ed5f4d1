//! Configuration validation + resolution tests against real files.
//!
//! Covers:
//! - Priors and engine validation on JSON written to disk
//! - Resolution order (CLI dir > env dir > defaults)

use mf_config::resolve::{resolve_config, ConfigSource, ENV_CONFIG_DIR};
use mf_config::validate::{validate_engine, validate_priors, ValidationError};
use mf_config::{EngineSettings, Priors};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved: keys.iter().map(|k| env::var(k).ok()).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, saved) in self.keys.iter().zip(self.saved.iter()) {
            match saved {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f()
}

const VALID_PRIORS: &str = r#"{
    "schema_version": "1.0.0",
    "description": "test priors",
    "mean": { "mean": 0.0, "precision": 0.01, "noise_precision": 2.0 },
    "precision": { "shape": 2.0, "rate": 1.0 },
    "mixture": { "components": 2, "concentration": [1.0, 1.0] }
}"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).expect("create config dir");
    fs::write(dir.join(name), content).expect("write config file");
}

#[test]
fn test_validate_priors_file_ok() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "priors.json", VALID_PRIORS);
    let priors = Priors::from_file(&tmp.path().join("priors.json")).expect("read priors");
    validate_priors(&priors).expect("valid priors should pass validation");
    assert_eq!(priors.mean.noise_precision, 2.0);
}

#[test]
fn test_validate_priors_rejects_negative_rate() {
    let json = VALID_PRIORS.replace(r#""rate": 1.0"#, r#""rate": -1.0"#);
    let priors = Priors::from_str(&json).unwrap();
    let err = validate_priors(&priors).expect_err("negative rate should fail");
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "precision.rate"));
}

#[test]
fn test_validate_priors_rejects_concentration_length() {
    let json = VALID_PRIORS.replace("[1.0, 1.0]", "[1.0, 1.0, 1.0]");
    let priors = Priors::from_str(&json).unwrap();
    let err = validate_priors(&priors).expect_err("length 3 for k=2 should fail");
    assert!(matches!(err, ValidationError::SemanticError(_)));
}

#[test]
fn test_validate_priors_rejects_version() {
    let json = VALID_PRIORS.replace("1.0.0", "2.0.0");
    let priors = Priors::from_str(&json).unwrap();
    assert!(matches!(
        validate_priors(&priors),
        Err(ValidationError::VersionMismatch { .. })
    ));
}

#[test]
fn test_validate_engine_rejects_negative_tolerance() {
    let settings = EngineSettings::from_str(r#"{ "tolerance": -0.5 }"#).unwrap();
    assert!(validate_engine(&settings).is_err());
}

#[test]
fn test_missing_file_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let err = Priors::from_file(&tmp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ValidationError::IoError(_)));
}

#[test]
fn test_resolve_cli_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_DIR, "XDG_CONFIG_HOME"]);
        let cli = TempDir::new().unwrap();
        let envdir = TempDir::new().unwrap();
        let xdg = TempDir::new().unwrap();
        write(cli.path(), "priors.json", VALID_PRIORS);
        write(envdir.path(), "priors.json", VALID_PRIORS);
        write(envdir.path(), "engine.json", "{}");
        env::set_var(ENV_CONFIG_DIR, envdir.path());
        env::set_var("XDG_CONFIG_HOME", xdg.path());

        let paths = resolve_config(Some(cli.path()));
        assert_eq!(paths.priors_source, ConfigSource::CliArgument);
        assert_eq!(paths.priors, Some(cli.path().join("priors.json")));
        // engine.json only exists in the env dir
        assert_eq!(paths.engine_source, ConfigSource::Environment);
        assert_eq!(paths.engine, Some(envdir.path().join("engine.json")));
    });
}

#[test]
fn test_resolve_defaults_when_nothing_present() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_DIR, "XDG_CONFIG_HOME"]);
        let empty = TempDir::new().unwrap();
        env::remove_var(ENV_CONFIG_DIR);
        env::set_var("XDG_CONFIG_HOME", empty.path());

        let paths = resolve_config(Some(empty.path()));
        assert!(paths.priors.is_none());
        assert!(paths.engine.is_none());
        assert_eq!(paths.priors_source, ConfigSource::BuiltinDefault);
    });
}
