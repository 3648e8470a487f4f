//! Question answering over an extracted form.
//!
//! A [`FormConversation`] holds the form as system context plus the running
//! history, and replays the whole history to the model on every turn.

use serde_json::Value;
use tracing::debug;

use crate::bedrock::{ChatMessage, InferenceError, ModelClient};
use crate::output::METADATA_KEY;
use crate::response::FormData;

/// One `key: value` line per field, flattening nested objects one level.
///
/// The processing metadata block is skipped.
#[must_use]
pub fn form_summary(form: &FormData) -> String {
    let mut lines = Vec::with_capacity(form.len());
    for (key, value) in form.fields() {
        if key == METADATA_KEY {
            continue;
        }
        match value {
            Value::Object(children) => {
                for (child, child_value) in children {
                    lines.push(format!("{key}.{child}: {}", display_value(child_value)));
                }
            }
            other => lines.push(format!("{key}: {}", display_value(other))),
        }
    }
    lines.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// System prompt embedding the form summary.
#[must_use]
pub fn system_prompt(summary: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions about a form. Here is the form data:\n\
         \n\
         {summary}\n\
         \n\
         You can help users by:\n\
         1. Answering questions about specific fields\n\
         2. Explaining the form structure\n\
         3. Providing insights about the data\n\
         4. Suggesting related information\n\
         \n\
         Please be concise and friendly in your responses. If you don't have enough \
         information to answer a question, say so."
    )
}

/// A chat session about one form.
#[derive(Debug, Clone)]
pub struct FormConversation {
    system: String,
    history: Vec<ChatMessage>,
}

impl FormConversation {
    #[must_use]
    pub fn new(form: &FormData) -> Self {
        Self {
            system: system_prompt(&form_summary(form)),
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Completed turns, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Ask a question and record both sides of the turn.
    ///
    /// On failure the question is dropped so the history stays alternating.
    ///
    /// # Errors
    ///
    /// Returns the client's [`InferenceError`].
    pub async fn ask<C: ModelClient + ?Sized>(
        &mut self,
        client: &C,
        question: &str,
    ) -> Result<String, InferenceError> {
        self.history.push(ChatMessage::user(question));

        match client.converse(Some(&self.system), &self.history).await {
            Ok(response) => {
                let answer = response.text.trim().to_string();
                debug!(turns = self.history.len(), chars = answer.len(), "assistant replied");
                self.history.push(ChatMessage::assistant(answer.clone()));
                Ok(answer)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::{ModelResponse, Role};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with scripted answers and records each request's history.
    struct Scripted {
        replies: Mutex<Vec<Result<String, ()>>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, ()>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for Scripted {
        fn model_id(&self) -> &str {
            "scripted"
        }

        async fn converse(
            &self,
            system: Option<&str>,
            messages: &[ChatMessage],
        ) -> Result<ModelResponse, InferenceError> {
            assert!(system.is_some_and(|s| s.contains("form data")));
            self.requests.lock().unwrap().push(messages.to_vec());
            match self.replies.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(ModelResponse::from_text(text)),
                _ => Err(InferenceError::Service {
                    model_id: "scripted".to_string(),
                    reason: "ThrottlingException".to_string(),
                }),
            }
        }
    }

    fn form() -> FormData {
        serde_json::from_value(json!({
            "Name": "Alice",
            "Employer": {"Company": "ACME", "Phone": null},
            "Age": 42,
            "metadata": {"pdf_path": "x.pdf"}
        }))
        .unwrap()
    }

    #[test]
    fn test_form_summary_flattens_and_skips_metadata() {
        assert_eq!(
            form_summary(&form()),
            "Name: Alice\nEmployer.Company: ACME\nEmployer.Phone: null\nAge: 42"
        );
    }

    #[test]
    fn test_system_prompt_embeds_summary() {
        let conversation = FormConversation::new(&form());
        assert!(conversation.system().contains("Employer.Company: ACME"));
        assert!(!conversation.system().contains("x.pdf"));
    }

    #[tokio::test]
    async fn test_history_grows_each_turn() {
        let client = Scripted::new(vec![Ok(" Alice. "), Ok("ACME.")]);
        let mut conversation = FormConversation::new(&form());

        assert_eq!(conversation.ask(&client, "Who filled it?").await.unwrap(), "Alice.");
        assert_eq!(conversation.ask(&client, "Employer?").await.unwrap(), "ACME.");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].len(), 1);
        assert_eq!(requests[1].len(), 3);
        assert_eq!(requests[1][1], ChatMessage::assistant("Alice."));
        assert_eq!(conversation.history().len(), 4);
        assert_eq!(conversation.history()[3].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_failed_turn_is_dropped() {
        let client = Scripted::new(vec![Err(()), Ok("Alice.")]);
        let mut conversation = FormConversation::new(&form());

        assert!(conversation.ask(&client, "Who?").await.is_err());
        assert!(conversation.history().is_empty());

        conversation.ask(&client, "Who, again?").await.unwrap();
        assert_eq!(
            conversation.history(),
            &[ChatMessage::user("Who, again?"), ChatMessage::assistant("Alice.")]
        );
    }
}
