//! Prompt construction for form field extraction.

use std::fmt;

use thiserror::Error;

use crate::extract::ExtractedText;

/// Default input budget in characters (roughly 100k tokens of English text).
pub const DEFAULT_MAX_INPUT_CHARS: usize = 400_000;

/// Fixed instructions placed ahead of the form text.
pub const EXTRACTION_INSTRUCTIONS: &str = "\
Extract all form fields and their values from the form text below as a single JSON object.

Guidelines:
1. Identify every form field and the value filled in for it
2. Use the field names exactly as they appear in the form as JSON keys
3. Give every value as a JSON string
4. Use null for empty or missing values
5. Return only valid JSON, without any additional text or markdown formatting

Form Text:
";

#[derive(Error, Debug)]
pub enum PromptError {
    /// Extracted text is over the configured input budget
    #[error("Form text is {chars} characters, over the {limit} character input limit")]
    TooLarge { chars: usize, limit: usize },
}

/// Text sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps extracted text in [`EXTRACTION_INSTRUCTIONS`].
///
/// Text over the input budget is rejected, never truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    max_input_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS)
    }
}

impl PromptBuilder {
    #[must_use]
    pub const fn new(max_input_chars: usize) -> Self {
        Self { max_input_chars }
    }

    #[must_use]
    pub const fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// Build the prompt for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::TooLarge`] if the text exceeds the budget.
    pub fn build(&self, text: &ExtractedText) -> Result<Prompt, PromptError> {
        let chars = text.char_count();
        if chars > self.max_input_chars {
            return Err(PromptError::TooLarge {
                chars,
                limit: self.max_input_chars,
            });
        }

        let body = text.joined();
        let mut prompt = String::with_capacity(EXTRACTION_INSTRUCTIONS.len() + body.len());
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str(&body);
        Ok(Prompt(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractedText {
        ExtractedText::from_pages(vec![
            "Applicant Name: Alice Smith\nDate of Birth:".to_string(),
            "Signature: ______".to_string(),
        ])
    }

    #[test]
    fn test_prompt_contains_text_and_instructions() {
        let text = sample();
        let prompt = PromptBuilder::default().build(&text).unwrap();

        assert!(prompt.as_str().contains(&text.joined()));
        assert!(prompt.as_str().contains("Use null for empty or missing values"));
        assert!(prompt.as_str().starts_with(EXTRACTION_INSTRUCTIONS));
    }

    #[test]
    fn test_text_at_limit_is_accepted() {
        let text = sample();
        let limit = text.char_count();
        assert!(PromptBuilder::new(limit).build(&text).is_ok());
    }

    #[test]
    fn test_text_over_limit_fails_fast() {
        let text = sample();
        let limit = text.char_count() - 1;
        let err = PromptBuilder::new(limit).build(&text).unwrap_err();
        let PromptError::TooLarge { chars, limit: got } = err;
        assert_eq!(chars, text.char_count());
        assert_eq!(got, limit);
    }
}
