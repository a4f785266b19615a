//! Classify command workflows

use crate::common::TestEnv;
use crate::quell;
use anyhow::Result;

fn configure(env: &TestEnv) -> Result<()> {
    quell!(env, "config", "set", "debounce.rest_patterns", "/api/search").assert_success()?;
    quell!(env, "config", "set", "debounce.graphql_operation_patterns", "Search*").assert_success()?;
    quell!(env, "config", "set", "debounce.delay_ms", "300").assert_success()?;
    Ok(())
}

#[test]
fn test_classify_rest_call() -> Result<()> {
    let env = TestEnv::new()?;
    configure(&env)?;

    let eligible = quell!(env, "classify", "--url", "/api/search?q=rust").assert_success()?;
    assert!(eligible.contains_stdout("rest:/api/search?q=rust:GET"));
    assert!(eligible.contains_stdout("300ms"));

    let other = quell!(env, "classify", "--url", "/api/users", "--method", "post").assert_success()?;
    assert!(other.contains_stdout("rest:/api/users:POST"));
    assert!(!other.contains_stdout("Delay"));
    Ok(())
}

#[test]
fn test_classify_graphql_call() -> Result<()> {
    let env = TestEnv::new()?;
    configure(&env)?;

    let body = r#"{"query":"query SearchProducts($q: String) { products(q: $q) { id } }"}"#;
    let result = quell!(env, "classify", "--url", "/graphql", "--method", "POST", "--body", body)
        .assert_success()?;

    assert!(result.contains_stdout("graphql:/graphql:SearchProducts"));
    assert!(result.contains_stdout("SearchProducts"));
    assert!(result.contains_stdout("300ms"));
    Ok(())
}

#[test]
fn test_classify_body_from_file() -> Result<()> {
    let env = TestEnv::new()?;
    configure(&env)?;

    let body = env.write("body.graphql", "mutation UpdateCart { cart { id } }")?;
    let result = quell!(
        env,
        "classify",
        "--url",
        "/graphql",
        "--method",
        "POST",
        "--body-file",
        &body.to_string_lossy()
    )
    .assert_success()?;

    assert!(result.contains_stdout("graphql:/graphql:UpdateCart"));
    assert!(result.contains_stdout("mutation"));
    assert!(!result.contains_stdout("Delay"));
    Ok(())
}
