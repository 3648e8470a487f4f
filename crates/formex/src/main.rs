//! formex - PDF form to JSON
//!
//! Extracts the text of a PDF form, asks a Claude model on AWS Bedrock to
//! identify its fields, and prints them as a JSON object.
//!
//! Usage:
//!   formex form.pdf                     Print the form's fields as JSON
//!   formex form.pdf -o form.json        Write them to a file instead
//!   formex form.pdf -r eu-west-1        Use another AWS region

use anyhow::Result;
use clap::{ArgAction, Parser};
use formex_core::{
    config::{default_config_path, load_config, Config},
    BedrockClient, Destination, ExtractorSettings, FormExtractor, FormexError, ModelClient,
    PromptBuilder,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

mod logging;

#[derive(Parser, Debug)]
#[command(name = "formex")]
#[command(version, about = "Extract PDF form fields as JSON with a Claude model on AWS Bedrock")]
struct Args {
    /// Path to the PDF form
    pdf: PathBuf,

    /// Write JSON to this file instead of stdout (overwrites)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// AWS region (default: ambient AWS configuration)
    #[arg(short, long)]
    region: Option<String>,

    /// Bedrock model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum tokens in the model reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature (0.0-1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Refuse forms whose text is longer than this many characters
    #[arg(long)]
    max_input_chars: Option<usize>,

    /// Add a "metadata" object describing the run
    #[arg(long)]
    with_metadata: bool,

    /// Config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command-line values over the config file over built-in defaults.
    fn settings(&self, config: &Config) -> ExtractorSettings {
        let mut settings = config.extractor_settings();
        if let Some(model) = &self.model {
            settings.model.model_id.clone_from(model);
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.model.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            settings.model.temperature = temperature;
        }
        if let Some(max_input_chars) = self.max_input_chars {
            settings.max_input_chars = max_input_chars;
        }
        if self.region.is_some() {
            settings.region.clone_from(&self.region);
        }
        settings.include_metadata |= self.with_metadata;
        settings
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            let code = e
                .downcast_ref::<FormexError>()
                .map_or(1, FormexError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = load_config(&config_path)?;
    debug!(path = %config_path.display(), "loaded config");

    let settings = args.settings(&config);
    settings.validate()?;

    let client = BedrockClient::new(settings.region.as_deref(), settings.model.clone()).await;
    info!(model_id = client.model_id(), "using Bedrock model");

    let extractor = FormExtractor::new(client, PromptBuilder::new(settings.max_input_chars))
        .with_metadata(settings.include_metadata);

    let destination = Destination::from_option(args.output);
    let form = extractor
        .run(&args.pdf, &destination, &mut std::io::stdout().lock())
        .await?;

    if let Destination::File(path) = &destination {
        eprintln!("Extracted {} fields to {}", form.len(), path.display());
    }
    Ok(())
}
