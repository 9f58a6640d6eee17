use snafu::ensure;
use std::sync::Arc;

use crate::{
    chats::{session::ChatSession, Error, InvalidHistorySnafu},
    client::{GeminiClient, Model},
    generation::GenerationConfig,
    Content, Role,
};

/// Builder for a [`ChatSession`]
pub struct ChatBuilder {
    client: Arc<GeminiClient>,
    model: Option<Model>,
    history: Vec<Content>,
    system_instruction: Option<Content>,
    generation_config: Option<GenerationConfig>,
}

impl ChatBuilder {
    pub(crate) fn new(client: Arc<GeminiClient>) -> Self {
        Self {
            client,
            model: None,
            history: Vec::new(),
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Chat with a model other than the client's default.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Seed the conversation with earlier turns.
    ///
    /// Every entry needs a role and the first one must come from the user.
    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::text(text));
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Validate the history and start the session.
    pub fn build(self) -> Result<ChatSession, Error> {
        validate_history(&self.history)?;
        let model = self.model.unwrap_or_else(|| self.client.model.clone());
        Ok(ChatSession::new(
            self.client,
            model,
            self.history,
            self.system_instruction,
            self.generation_config,
        ))
    }
}

fn validate_history(history: &[Content]) -> Result<(), Error> {
    for (index, content) in history.iter().enumerate() {
        let role = content.role.as_ref();
        ensure!(
            role.is_some(),
            InvalidHistorySnafu {
                index,
                reason: "entry has no role",
            }
        );
        ensure!(
            index != 0 || role == Some(&Role::User),
            InvalidHistorySnafu {
                index,
                reason: "conversation must start with a user turn",
            }
        );
    }
    Ok(())
}
