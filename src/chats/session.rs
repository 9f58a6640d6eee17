use snafu::ResultExt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    chats::{ClientSnafu, Error},
    client::{GeminiClient, Model},
    generation::{
        CountTokensRequest, CountTokensResponse, GenerateContentRequest, GenerationConfig,
        GenerationResponse,
    },
    Content, Part, Role,
};

/// A conversation with a model.
///
/// The history lives in the session and is sent in full with every message.
#[derive(Debug)]
pub struct ChatSession {
    client: Arc<GeminiClient>,
    model: Model,
    history: Vec<Content>,
    system_instruction: Option<Content>,
    generation_config: Option<GenerationConfig>,
}

impl ChatSession {
    pub(crate) fn new(
        client: Arc<GeminiClient>,
        model: Model,
        history: Vec<Content>,
        system_instruction: Option<Content>,
        generation_config: Option<GenerationConfig>,
    ) -> Self {
        Self {
            client,
            model,
            history,
            system_instruction,
            generation_config,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Send a text message and record the exchange.
    pub async fn send_message(
        &mut self,
        text: impl Into<String>,
    ) -> Result<GenerationResponse, Error> {
        self.send_parts(vec![Part::text(text)]).await
    }

    /// Send a user turn made of arbitrary parts and record the exchange.
    ///
    /// The history is only extended when the request succeeds.
    #[instrument(skip_all, fields(
        model = %self.model,
        history.len = self.history.len(),
        message.parts.count = parts.len(),
    ))]
    pub async fn send_parts(&mut self, parts: Vec<Part>) -> Result<GenerationResponse, Error> {
        let user_turn = Content::from_parts(parts).with_role(Role::User);
        let request = self.request_with(Some(user_turn.clone()));

        let response = self
            .client
            .generate_content_raw(&self.model, request)
            .await
            .map_err(Box::new)
            .context(ClientSnafu)?;

        let model_turn = response
            .candidates
            .first()
            .map(|candidate| candidate.content.clone())
            .unwrap_or_default();
        let model_turn = match model_turn.role {
            Some(_) => model_turn,
            None => model_turn.with_role(Role::Model),
        };

        self.history.push(user_turn);
        self.history.push(model_turn);
        debug!(history.len = self.history.len(), "chat history extended");

        Ok(response)
    }

    /// The conversation so far.
    ///
    /// With `curated` set, exchanges whose model reply is missing or empty are
    /// dropped together with the user turn that prompted them. This is the
    /// history the service is able to continue from.
    pub fn history(&self, curated: bool) -> Vec<Content> {
        if curated {
            curate(&self.history)
        } else {
            self.history.clone()
        }
    }

    /// Count the tokens of the history plus `extra` contents.
    #[instrument(skip_all, fields(model = %self.model, extra.count = extra.len()))]
    pub async fn count_tokens(&self, extra: Vec<Content>) -> Result<CountTokensResponse, Error> {
        let mut request = self.request_with(None);
        request.contents.extend(extra);
        let request = CountTokensRequest::from_request(&self.model, request);

        self.client
            .count_tokens(&self.model, request)
            .await
            .map_err(Box::new)
            .context(ClientSnafu)
    }

    fn request_with(&self, turn: Option<Content>) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.extend(turn);
        GenerateContentRequest {
            contents,
            generation_config: self.generation_config.clone(),
            system_instruction: self.system_instruction.clone(),
            cached_content: None,
        }
    }
}

/// Keep user turns, and runs of model turns only when every turn in the run
/// is valid. An invalid run also removes the user turn before it.
fn curate(history: &[Content]) -> Vec<Content> {
    let mut curated: Vec<Content> = Vec::with_capacity(history.len());
    let mut index = 0;

    while index < history.len() {
        if history[index].role != Some(Role::Model) {
            curated.push(history[index].clone());
            index += 1;
            continue;
        }

        let start = index;
        while index < history.len() && history[index].role == Some(Role::Model) {
            index += 1;
        }
        let run = &history[start..index];
        if run.iter().all(Content::is_valid) {
            curated.extend_from_slice(run);
        } else {
            curated.pop();
        }
    }

    curated
}
