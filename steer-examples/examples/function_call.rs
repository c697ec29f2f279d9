//! Function calling against a hosted model
//!
//! Usage:
//!   # One question, DeepInfra (reads DEEPINFRA_API_KEY):
//!   cargo run --example function_call -- "What's the weather in Paris?"
//!   # Interactive loop against another provider:
//!   cargo run --example function_call -- --provider openai -m gpt-4o-mini
//!   # Custom function catalog:
//!   cargo run --example function_call -- --functions tools.json "..."

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use steer::Result;
use steer_examples::{demo_functions, init_tracing, load_functions, run_demo_function};
use steer_remote::{Provider, RemoteClient};
use steer_runtime::{process_function_call, FunctionCallConfig, DEFAULT_MODEL};

const EXAMPLE_PROMPTS: [&str; 4] = [
    "What's the weather in Paris?",
    "Tell me the weather in Tokyo",
    "What's the weather in Paris and the stock price for AAPL?",
    "Check the AAPL stock price",
];

/// Select functions for a question and generate their arguments
#[derive(Parser)]
#[command(name = "function_call")]
struct Cli {
    /// Question to answer; omit for an interactive loop
    prompt: Option<String>,

    /// Hosted provider (deepinfra, openai, hyperbolic)
    #[arg(long, env = "STEER_PROVIDER", default_value = "deepinfra")]
    provider: Provider,

    /// Model identifier at the provider
    #[arg(short, long, env = "STEER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Temperature of the first attempt of each stage
    #[arg(short, long, default_value_t = 0.1)]
    temperature: f32,

    /// Attempts per stage before giving up
    #[arg(short = 'a', long, default_value_t = 3)]
    max_attempts: usize,

    /// JSON file with an array of function schemas
    #[arg(short, long)]
    functions: Option<PathBuf>,

    /// Override the provider's base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Log request payloads
    #[arg(short, long)]
    verbose: bool,
}

async fn answer(
    client: &mut RemoteClient,
    question: &str,
    functions: &[steer::FunctionSchema],
    config: &FunctionCallConfig,
) -> Result<()> {
    match process_function_call(client, question, functions, config).await? {
        None => println!("No known function applies."),
        Some(invocations) => {
            for invocation in &invocations {
                println!("{}({})", invocation.name, invocation.arguments);
                if let Some(result) = run_demo_function(invocation) {
                    println!("  -> {result}");
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let functions = match &cli.functions {
        Some(path) => load_functions(path)?,
        None => demo_functions(),
    };
    let mut client = RemoteClient::from_env(cli.provider)?;
    if let Some(base_url) = &cli.base_url {
        client = client.with_base_url(base_url);
    }
    tracing::info!(provider = %cli.provider, functions = functions.len(), "Ready");
    let config = FunctionCallConfig {
        model: cli.model,
        temperature: cli.temperature,
        max_attempts: cli.max_attempts,
    };

    if let Some(question) = &cli.prompt {
        return answer(&mut client, question, &functions, &config).await;
    }

    println!("\nExample questions you can ask:");
    for example in EXAMPLE_PROMPTS {
        println!("- {example}");
    }
    println!();

    let stdin = io::stdin();
    loop {
        print!("Ask a question (or 'quit' to exit): ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }
        // Errors are reported per question; the loop keeps going.
        if let Err(e) = answer(&mut client, question, &functions, &config).await {
            eprintln!("Error: {e}");
        }
    }
    Ok(())
}
