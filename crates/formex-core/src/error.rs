//! Error types for formex-core

use std::path::PathBuf;
use thiserror::Error;

use crate::bedrock::InferenceError;
use crate::extract::ExtractError;
use crate::prompt::PromptError;

/// Result type for formex operations
pub type Result<T> = std::result::Result<T, FormexError>;

/// Every way a form conversion can fail.
///
/// All variants are terminal: the run aborts and nothing is written.
#[derive(Error, Debug)]
pub enum FormexError {
    /// Invalid or unreadable configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The PDF could not be opened or its text could not be extracted
    #[error(transparent)]
    FileAccess(#[from] ExtractError),

    /// The extracted text does not fit the model's input budget
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The inference call failed (auth, throttling, network, empty reply)
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The model reply does not contain a JSON object
    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String },

    /// The destination could not be written
    #[error("Failed to write output to {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FormexError {
    /// Process exit code for this error.
    ///
    /// Code 2 is left to clap for usage errors.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::FileAccess(_) => 3,
            Self::Prompt(_) => 4,
            Self::Inference(_) => 5,
            Self::MalformedResponse { .. } => 6,
            Self::OutputWrite { .. } => 7,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let errors = [
            FormexError::Config("bad".to_string()),
            FormexError::FileAccess(ExtractError::NoText),
            FormexError::Prompt(PromptError::TooLarge { chars: 10, limit: 5 }),
            FormexError::Inference(InferenceError::EmptyResponse {
                model_id: "m".to_string(),
            }),
            FormexError::malformed("no object"),
            FormexError::OutputWrite {
                path: PathBuf::from("/nope/out.json"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        ];

        let mut codes: Vec<u8> = errors.iter().map(FormexError::exit_code).collect();
        assert!(codes.iter().all(|&c| c != 0 && c != 2));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_output_write_message_names_path() {
        let err = FormexError::OutputWrite {
            path: PathBuf::from("/readonly/form.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/readonly/form.json"));
    }
}
