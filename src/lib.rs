//! WhatsApp Assist: conversational HR assistant behind a WhatsApp relay.

pub mod cache;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod store;
