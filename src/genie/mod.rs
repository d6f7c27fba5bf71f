//! Conversation client for the Genie service.

pub mod api;
pub mod conversation;
pub mod message;

pub use api::{GenieApi, StartedConversation};
pub use conversation::Conversation;
pub use message::{Attachment, Message, MessageStatus, QueryResult};
