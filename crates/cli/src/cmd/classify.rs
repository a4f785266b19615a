//! Show how the current settings classify a call

use crate::system_config;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use quell_core::{classify, parse_operation, CallDescriptor, CallKind};
use std::path::PathBuf;

pub fn run(method: &str, url: &str, body: Option<String>, body_file: Option<PathBuf>) -> Result<()> {
    let config = system_config::load()?;

    let body = match body_file {
        Some(path) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read body from {}", path.display()))?,
        ),
        None => body,
    };

    let call = CallDescriptor::new(method, url, body.as_deref().map(str::as_bytes));
    let classification = classify(&call, &config.debounce);

    println!("{}", "Classification".bold());
    println!("Call:        {} {}", call.method, call.url.cyan());
    println!("Kind:        {}", call.kind);

    if call.kind == CallKind::Graphql {
        let query = body.as_deref().map(query_text).unwrap_or_default();
        let info = parse_operation(&query);
        println!(
            "Operation:   {}",
            classification.operation.as_deref().unwrap_or("(anonymous)")
        );
        println!(
            "Type:        {}",
            info.kind.map(|kind| kind.as_str()).unwrap_or("query")
        );
        if !info.is_valid {
            println!("{}", "Warning: query document looks malformed".yellow());
        }
    }

    if classification.eligible {
        println!("Eligible:    {}", "yes".green());
        println!("Delay:       {}ms", classification.delay.as_millis());
    } else {
        println!("Eligible:    {}", "no".red());
    }
    println!("Key:         {}", classification.key);

    Ok(())
}

/// Query document out of a JSON envelope, or the raw body
fn query_text(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("query")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
