//! # formex-core
//!
//! Turns filled-in PDF forms into JSON by asking a Claude model on AWS
//! Bedrock to read the form text.
//!
//! ## Overview
//!
//! The pipeline is strictly linear:
//! 1. Extract the visible text of every page ([`extract`])
//! 2. Wrap it in fixed extraction instructions ([`prompt`])
//! 3. Send it to the model ([`bedrock`])
//! 4. Recover the JSON object from the reply ([`response`])
//! 5. Write pretty-printed JSON to stdout or a file ([`output`])
//!
//! [`FormExtractor`] drives the steps; any failure aborts the run before
//! output is written. [`conversation`] adds question answering over a form
//! that has already been extracted.
//!
//! ## Example Usage
//!
//! ```no_run
//! use formex_core::{BedrockClient, Destination, FormExtractor, ModelSettings, PromptBuilder};
//! use std::path::Path;
//!
//! # async fn example() -> formex_core::Result<()> {
//! let client = BedrockClient::new(Some("us-east-1"), ModelSettings::default()).await;
//! let extractor = FormExtractor::new(client, PromptBuilder::default());
//!
//! let form = extractor
//!     .run(Path::new("application.pdf"), &Destination::Stdout, &mut std::io::stdout())
//!     .await?;
//! eprintln!("{} fields", form.len());
//! # Ok(())
//! # }
//! ```

pub mod bedrock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod response;

pub use bedrock::{
    BedrockClient, ChatMessage, InferenceError, ModelClient, ModelResponse, ModelSettings,
};
pub use config::{default_config_path, load_config, Config, ExtractorSettings};
pub use conversation::FormConversation;
pub use error::{FormexError, Result};
pub use extract::{extract_text, ExtractError, ExtractedText};
pub use output::{render, write_form, Destination, ExtractionMetadata};
pub use pipeline::FormExtractor;
pub use prompt::{Prompt, PromptBuilder, PromptError};
pub use response::{parse_response, FormData};
