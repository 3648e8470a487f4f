//! JSON output for extracted forms.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FormexError, Result};
use crate::response::FormData;

/// Key under which processing metadata is attached to a form.
pub const METADATA_KEY: &str = "metadata";

/// Where the run came from; attached to the output on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// RFC 3339 UTC timestamp
    pub processed_at: String,
    pub pdf_path: String,
    pub model_id: String,
    pub pages: usize,
    /// formex version that produced the output
    pub version: String,
}

impl ExtractionMetadata {
    /// Metadata stamped with the current time.
    #[must_use]
    pub fn now(pdf_path: &Path, model_id: &str, pages: usize) -> Self {
        Self {
            processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            pdf_path: pdf_path.display().to_string(),
            model_id: model_id.to_string(),
            pages,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Attach to `form`, replacing any `metadata` field the model produced.
    pub fn attach_to(&self, form: &mut FormData) {
        let value = serde_json::to_value(self).unwrap_or_default();
        form.insert(METADATA_KEY, value);
    }
}

/// Pretty-printed JSON for `form`, ending in a newline.
///
/// # Errors
///
/// Returns [`FormexError::MalformedResponse`] if the form cannot be
/// serialized, which only happens for non-finite numbers.
pub fn render(form: &FormData) -> Result<String> {
    let mut json = serde_json::to_string_pretty(form)
        .map_err(|e| FormexError::malformed(format!("form is not serializable: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Where rendered JSON goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    /// Created or overwritten without confirmation
    File(PathBuf),
}

impl Destination {
    #[must_use]
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Stdout, Self::File)
    }
}

/// Write `form` to `destination`, using `stdout` for [`Destination::Stdout`].
///
/// The JSON is fully rendered before anything is written.
///
/// # Errors
///
/// Returns [`FormexError::OutputWrite`] if the destination cannot be written.
pub fn write_form<W: Write>(
    form: &FormData,
    destination: &Destination,
    stdout: &mut W,
) -> Result<()> {
    let json = render(form)?;
    match destination {
        Destination::Stdout => {
            stdout
                .write_all(json.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|source| FormexError::OutputWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
        Destination::File(path) => {
            std::fs::write(path, &json).map_err(|source| FormexError::OutputWrite {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), bytes = json.len(), "wrote form JSON");
        }
    }
    Ok(())
}
