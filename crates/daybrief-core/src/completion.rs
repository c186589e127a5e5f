//! Completion gateway trait.
//!
//! Analysis units talk to a language model only through
//! [`CompletionModel`]: an ordered list of role-tagged messages in, plain
//! text out. HTTP-backed clients live in the `daybrief` app crate; tests
//! supply scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-style language model.
///
/// Implementations must be stateless per call: the gateway is shared by
/// all analysis units, which may invoke it concurrently.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Send `messages` and return the response text.
    ///
    /// Transport and provider failures map to [`Error::ModelInvocation`].
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// A model that fails every call. Used when `completion.provider = "disabled"`.
pub struct DisabledCompletion;

#[async_trait]
impl CompletionModel for DisabledCompletion {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(Error::ModelInvocation(
            "completion provider is disabled".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let v = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(v["role"], "system");
        assert_eq!(v["content"], "be brief");
    }

    #[tokio::test]
    async fn test_disabled_completion_fails() {
        let err = DisabledCompletion
            .invoke(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelInvocation(_)));
    }
}
