pub mod builder;
pub mod model;

pub use builder::ContentBuilder;
pub use model::{
    Candidate, CountTokensGenerateRequest, CountTokensRequest, CountTokensResponse, FinishReason,
    GenerateContentRequest, GenerationConfig, GenerationResponse, Modality, ModalityTokenCount,
    PromptFeedback, UsageMetadata,
};
