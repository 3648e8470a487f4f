//! The extraction pipeline: PDF → text → prompt → model → form → JSON.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::bedrock::ModelClient;
use crate::error::Result;
use crate::extract::extract_text;
use crate::output::{write_form, Destination, ExtractionMetadata};
use crate::prompt::PromptBuilder;
use crate::response::{parse_response, FormData};

/// Runs the pipeline against one model client.
#[derive(Debug, Clone)]
pub struct FormExtractor<C> {
    client: C,
    prompt_builder: PromptBuilder,
    include_metadata: bool,
}

impl<C: ModelClient> FormExtractor<C> {
    #[must_use]
    pub fn new(client: C, prompt_builder: PromptBuilder) -> Self {
        Self {
            client,
            prompt_builder,
            include_metadata: false,
        }
    }

    /// Attach processing metadata to every extracted form.
    #[must_use]
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Extract the form fields of the PDF at `pdf_path`.
    ///
    /// The model is only called once the text has been extracted and fits
    /// the prompt budget.
    ///
    /// # Errors
    ///
    /// Any [`FormexError`](crate::FormexError) except `OutputWrite`.
    pub async fn extract_form(&self, pdf_path: &Path) -> Result<FormData> {
        let start = Instant::now();

        let text = extract_text(pdf_path)?;
        info!(
            path = %pdf_path.display(),
            pages = text.page_count(),
            chars = text.char_count(),
            "extracted PDF text"
        );

        let prompt = self.prompt_builder.build(&text)?;
        let response = self.client.complete(prompt.as_str()).await?;
        let mut form = parse_response(&response)?;
        info!(
            fields = form.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "parsed form fields"
        );

        if self.include_metadata {
            ExtractionMetadata::now(pdf_path, self.client.model_id(), text.page_count())
                .attach_to(&mut form);
        }
        Ok(form)
    }

    /// Extract the form and write it to `destination`.
    ///
    /// Nothing is written unless every earlier stage succeeded.
    ///
    /// # Errors
    ///
    /// Any [`FormexError`](crate::FormexError).
    pub async fn run<W: Write>(
        &self,
        pdf_path: &Path,
        destination: &Destination,
        stdout: &mut W,
    ) -> Result<FormData> {
        let form = self.extract_form(pdf_path).await?;
        write_form(&form, destination, stdout)?;
        Ok(form)
    }
}
