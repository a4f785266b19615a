//! Config command workflows

use crate::common::TestEnv;
use crate::quell;
use anyhow::Result;

#[test]
fn test_config_set_and_get() -> Result<()> {
    let env = TestEnv::new()?;

    quell!(env, "config", "set", "debounce.delay_ms", "250").assert_success()?;
    quell!(env, "config", "set", "debounce.rest_patterns", "/api/search, /api/save").assert_success()?;

    let delay = quell!(env, "config", "get", "debounce.delay_ms").assert_success()?;
    assert_eq!(delay.stdout.trim(), "250");

    let patterns = quell!(env, "config", "get", "debounce.rest_patterns").assert_success()?;
    assert_eq!(patterns.stdout.trim(), "/api/search,/api/save");

    assert!(env.config_path().exists());
    Ok(())
}

#[test]
fn test_config_defaults_without_file() -> Result<()> {
    let env = TestEnv::new()?;

    let level = quell!(env, "config", "get", "log.level").assert_success()?;
    assert_eq!(level.stdout.trim(), "warn");

    let list = quell!(env, "config", "list").assert_success()?;
    assert!(list.contains_stdout("[debounce]"));
    assert!(list.contains_stdout("[log]"));
    assert!(list.contains_stdout("No patterns set"));
    assert!(!env.config_path().exists());
    Ok(())
}

#[test]
fn test_config_rejects_invalid_values() -> Result<()> {
    let env = TestEnv::new()?;

    let too_long = quell!(env, "config", "set", "debounce.delay_ms", "90000").assert_failure()?;
    assert!(too_long.contains_stderr("Invalid configuration value"));

    quell!(env, "config", "set", "debounce.delay_ms", "soon").assert_failure()?;
    quell!(env, "config", "set", "log.level", "loud").assert_failure()?;

    let unknown = quell!(env, "config", "get", "debounce.jitter").assert_failure()?;
    assert!(unknown.contains_stderr("Unknown config key"));

    // Nothing invalid was written
    assert!(!env.config_path().exists());
    Ok(())
}

#[test]
fn test_config_path_honors_override() -> Result<()> {
    let env = TestEnv::new()?;

    let path = quell!(env, "config", "path").assert_success()?;
    assert!(path.contains_stdout(&env.config_path().display().to_string()));
    assert!(!env.config_path().exists());

    quell!(env, "config", "path", "--create").assert_success()?;
    assert!(env.config_path().exists());
    Ok(())
}
