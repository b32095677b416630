//! Core building blocks for chatrelay.
//!
//! Everything here is free of HTTP-server and database concerns:
//! - [`message`]: the persisted conversation turn and role conventions.
//! - [`prompt`]: serialises a conversation into the provider's prompt format.
//! - [`poll`]: the client refresh contract used by the chat page.
//! - [`id`]: conversation identifier generation.
//! - [`prediction`]: the asynchronous prediction API (client + webhook payload).

pub mod id;
pub mod message;
pub mod poll;
pub mod prediction;
pub mod prompt;

pub use message::{Message, ROLE_ASSISTANT, ROLE_USER, STARTER_CONTENT};
pub use poll::PollPolicy;
pub use prediction::{
    Prediction, PredictionClient, PredictionError, PredictionInput, PredictionOutput,
    PredictionRequest, PredictionStatus, ReplicateClient, WebhookPayload,
};
pub use prompt::PromptTemplate;
