//! `courier agent` -- interactive session or single-message mode.
//!
//! In single-message mode (`--message "..."`), answers one request and
//! exits. In interactive mode, reads requests from stdin and keeps the
//! conversation history between them.
//!
//! # Examples
//!
//! ```text
//! # Single message
//! courier agent -m "list my recent emails"
//!
//! # Interactive mode
//! courier agent
//! > any mail from alice this week?
//! [answer]
//! > /exit
//!
//! # Override model
//! courier agent --model gpt-4o -m "hello"
//! ```

use std::io::Write;
use std::path::Path;

use clap::Args;
use tokio::io::AsyncBufReadExt;
use tracing::info;

use courier_core::agent::Orchestrator;
use courier_core::bootstrap::{AppContext, Secrets};
use courier_core::chat::respond;
use courier_types::conversation::Turn;

use super::load;

/// Arguments for the `courier agent` subcommand.
#[derive(Args)]
pub struct AgentArgs {
    /// Send a single message and exit (non-interactive mode).
    #[arg(short, long)]
    pub message: Option<String>,

    /// Model to use (overrides config).
    #[arg(long)]
    pub model: Option<String>,
}

/// Run the agent command.
pub async fn run(args: AgentArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load(config_path)?;
    if let Some(model) = args.model {
        config.llm.model = model;
    }
    let model = config.llm.model.clone();
    info!(model = %model, "initializing agent");

    let secrets = Secrets::resolve(&config)?;
    let ctx = AppContext::new(config, secrets)?;
    let tool_names = ctx.tools().list();
    let orchestrator = ctx.into_orchestrator();

    if let Some(message) = args.message {
        println!("{}", respond(&orchestrator, &message, &[]).await);
        return Ok(());
    }

    run_interactive(&orchestrator, &tool_names, &model).await
}

/// Read requests line by line until `/exit` or EOF.
async fn run_interactive(
    orchestrator: &Orchestrator,
    tool_names: &[String],
    model: &str,
) -> anyhow::Result<()> {
    println!("courier agent -- interactive mode (type /help for commands)");
    println!("Model: {model}");
    println!();

    let mut history: Vec<Turn> = Vec::new();
    let mut reader = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = reader.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/exit" | "/quit" => break,
            "/clear" => {
                history.clear();
                println!("[conversation cleared]");
                continue;
            }
            "/help" => {
                print_help();
                continue;
            }
            "/tools" => {
                println!("Registered tools ({}):", tool_names.len());
                for name in tool_names {
                    println!("  - {name}");
                }
                println!();
                continue;
            }
            _ => {}
        }

        let reply = respond(orchestrator, input, &history).await;
        println!("{reply}");
        println!();

        history.push(Turn::user(input));
        history.push(Turn::assistant(reply));
    }

    println!("Goodbye.");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /help   Show this help");
    println!("  /tools  List registered tools");
    println!("  /clear  Forget the conversation so far");
    println!("  /exit   Quit");
    println!();
}
