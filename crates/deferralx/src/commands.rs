use anyhow::{bail, Context};
use colored::Colorize;
use deferral::Deferred;
use deferral_adapters::{fs, timers, AdapterError};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Print the metadata of `path` as pretty JSON.
pub async fn stat(path: &str, lstat: bool) -> anyhow::Result<()> {
    let pending = if lstat { fs::lstat(path) } else { fs::stat(path) };
    let stats = pending.await?;
    let pretty = serde_json::to_string_pretty(&stats).context("encode stats")?;
    println!("{pretty}");
    Ok(())
}

/// Run an adapted setTimeout and report how it settled.
pub async fn timeout(
    delay_ms: u64,
    value: Option<&str>,
    cancel: bool,
    grace_ms: Option<u64>,
) -> anyhow::Result<()> {
    let delay = Duration::from_millis(delay_ms);
    let grace = grace_ms.map(Duration::from_millis).unwrap_or(delay * 2);
    let deferred = timers::timeout(delay, value.map(parse_value));
    info!(delay_ms, cancel, "timeout scheduled");
    wait(deferred, cancel, grace).await
}

/// Run an adapted setImmediate and report how it settled.
pub async fn immediate(value: Option<&str>, cancel: bool, grace_ms: u64) -> anyhow::Result<()> {
    let deferred = timers::immediate(value.map(parse_value));
    info!(cancel, "immediate scheduled");
    wait(deferred, cancel, Duration::from_millis(grace_ms)).await
}

async fn wait(
    deferred: Deferred<Value, AdapterError>,
    cancel: bool,
    grace: Duration,
) -> anyhow::Result<()> {
    if cancel && !deferred.cancel_task() {
        bail!("cancel: no scheduled task attached");
    }

    match tokio::time::timeout(grace, deferred).await {
        Ok(Ok(value)) => {
            println!("{} {}", "fulfilled:".green().bold(), value);
            Ok(())
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            println!(
                "{} {}",
                "pending:".yellow().bold(),
                format!("not settled after {}ms", grace.as_millis()).dimmed()
            );
            Ok(())
        }
    }
}

/// JSON when it parses, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
