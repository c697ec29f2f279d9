//! Shared helpers for the steer examples.

use std::path::Path;

use serde_json::{json, Value};
use steer::{FunctionSchema, Result};
use steer_runtime::FunctionInvocation;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber honoring `RUST_LOG`, defaulting to `info`
/// (or `debug` when `verbose`).
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second initialization (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The weather and stock functions used throughout the examples.
#[must_use]
pub fn demo_functions() -> Vec<FunctionSchema> {
    vec![
        FunctionSchema::new(
            "get_weather",
            "Get weather in a location",
            json!({
                "type": "object",
                "properties": {
                    "location": {"type": "string", "description": "City name"}
                },
                "required": ["location"]
            }),
        ),
        FunctionSchema::new(
            "get_stock_price",
            "Get the latest stock price for a ticker symbol",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string", "description": "Ticker symbol, e.g. AAPL"}
                },
                "required": ["symbol"]
            }),
        ),
    ]
}

/// Load a JSON array of function schemas.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_functions(path: &Path) -> Result<Vec<FunctionSchema>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Run one of the demo functions locally. Returns `None` for names it does
/// not know.
#[must_use]
pub fn run_demo_function(invocation: &FunctionInvocation) -> Option<String> {
    let arg = |key: &str| {
        invocation
            .arguments
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    match invocation.name.as_str() {
        "get_weather" => Some(format!("The weather in {} is sunny", arg("location"))),
        "get_stock_price" => Some(format!("{} is trading at $123.45", arg("symbol"))),
        _ => None,
    }
}
