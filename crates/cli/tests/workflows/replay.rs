//! Replay command workflows

use crate::common::TestEnv;
use crate::quell;
use anyhow::Result;

#[test]
fn test_replay_collapses_bursts() -> Result<()> {
    let env = TestEnv::new()?;
    quell!(env, "config", "set", "debounce.rest_patterns", "/api/search").assert_success()?;
    quell!(env, "config", "set", "debounce.delay_ms", "100").assert_success()?;

    let trace = env.write(
        "trace.json",
        r#"[
            {"at_ms": 0, "url": "/api/search?q=r"},
            {"at_ms": 10, "url": "/api/search?q=r"},
            {"at_ms": 20, "url": "/api/search?q=r"},
            {"at_ms": 30, "url": "/api/users"}
        ]"#,
    )?;

    let result = quell!(env, "replay", &trace.to_string_lossy()).assert_success()?;
    assert_eq!(result.last_line(), "4 calls, 2 forwarded");
    assert!(result.contains_stdout("debounced"));
    assert!(result.contains_stdout("direct"));
    assert!(!result.contains_stdout("No debounce patterns configured"));
    Ok(())
}

#[test]
fn test_replay_channel_calls() -> Result<()> {
    let env = TestEnv::new()?;
    quell!(env, "config", "set", "debounce.rest_patterns", "/api/save").assert_success()?;
    quell!(env, "config", "set", "debounce.delay_ms", "100").assert_success()?;

    let trace = env.write(
        "trace.json",
        r#"[
            {"at_ms": 0, "shape": "channel", "method": "POST", "url": "/api/save", "body": "v1"},
            {"at_ms": 20, "shape": "channel", "method": "POST", "url": "/api/save", "body": "v2"}
        ]"#,
    )?;

    let result = quell!(env, "replay", &trace.to_string_lossy(), "--latency-ms", "5").assert_success()?;
    assert_eq!(result.last_line(), "2 calls, 1 forwarded");
    Ok(())
}

#[test]
fn test_replay_without_settings_forwards_everything() -> Result<()> {
    let env = TestEnv::new()?;
    let trace = env.write(
        "trace.json",
        r#"[{"at_ms": 0, "url": "/api/search"}, {"at_ms": 5, "url": "/api/search"}]"#,
    )?;

    let result = quell!(env, "replay", &trace.to_string_lossy()).assert_success()?;
    assert_eq!(result.last_line(), "2 calls, 2 forwarded");
    assert!(result.contains_stdout("No debounce patterns configured"));
    Ok(())
}

#[test]
fn test_replay_missing_trace_fails() -> Result<()> {
    let env = TestEnv::new()?;
    let missing = env.path().join("missing.json");

    let result = quell!(env, "replay", &missing.to_string_lossy()).assert_failure()?;
    assert!(result.contains_stderr("Failed to read trace"));
    Ok(())
}
