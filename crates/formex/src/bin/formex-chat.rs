//! formex-chat - ask questions about an extracted form
//!
//! Loads JSON written by `formex -o` and starts an interactive session
//! with a Claude model that has the form as context.
//!
//! Usage:
//!   formex-chat                     Chat about ./form_output.json
//!   formex-chat w9.json -r us-west-2

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use formex_core::{
    config::{default_config_path, load_config, validate_model},
    BedrockClient, FormConversation, FormData, ModelSettings,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[path = "../logging.rs"]
mod logging;

#[derive(Parser, Debug)]
#[command(name = "formex-chat")]
#[command(version, about = "Chat with a Claude model about a form extracted by formex")]
struct Args {
    /// Form JSON produced by formex
    #[arg(default_value = "form_output.json")]
    form: PathBuf,

    /// AWS region (default: ambient AWS configuration)
    #[arg(short, long)]
    region: Option<String>,

    /// Bedrock model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let form = load_form(&args.form)?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = load_config(&config_path)?;
    let mut settings = config.model_settings(ModelSettings::conversational());
    if let Some(model) = &args.model {
        settings.model_id.clone_from(model);
    }
    validate_model(&settings)?;
    let region = args.region.clone().or_else(|| config.region());

    let client = BedrockClient::new(region.as_deref(), settings).await;
    let mut conversation = FormConversation::new(&form);
    info!(fields = form.len(), "loaded form");

    println!("Form Conversation Agent");
    println!("Type 'exit' to end the conversation");
    println!("{}", "-".repeat(50));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye!");
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            println!("\nGoodbye!");
            break;
        }

        match conversation.ask(&client, question).await {
            Ok(answer) => println!("\nAssistant: {answer}"),
            Err(e) => eprintln!("\nError processing your request: {e}"),
        }
    }

    Ok(())
}

fn load_form(path: &Path) -> Result<FormData> {
    if !path.exists() {
        bail!(
            "{} not found. Run `formex <PDF> -o {}` first.",
            path.display(),
            path.display()
        );
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON object", path.display()))
}
