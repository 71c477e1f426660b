//! Persona chat pipeline.
//!
//! A question is answered in the voice of a chat participant: retrieve
//! matching historical messages, widen each match into a window of
//! neighbouring messages (without the primary interlocutor's own lines),
//! render the persona prompt, and generate the reply.
//!
//! Entry point: [`ChatSession::respond`] over an immutable [`ChatContext`]
//! built by [`build_chat_context`].

pub mod bootstrap;
pub mod cfg;
pub mod context;
pub mod corpus;
pub mod error;
pub mod generator;
pub mod persona;
pub mod prompt;
pub mod session;
pub mod window;

pub use bootstrap::build_chat_context;
pub use cfg::ContextorConfig;
pub use context::ChatContext;
pub use corpus::{DocumentStore, MessageRecord};
pub use error::{BootstrapError, ChatError, FormatError, GenerationError};
pub use generator::{GenerationRequest, LlmGenerator, ResponseGenerator};
pub use persona::{Persona, resolve_persona};
pub use prompt::PersonaPrompt;
pub use session::{ChatSession, ChatTurn};
pub use window::{WindowConfig, expand_hits, split_block};
