//! These models represent the conversation passed around by the agent
//!
//! There are two related wire formats we need to interact with:
//! - anthropic messages/tools, sent from the agent to the LLM
//! - openai chat completion messages/tools, sent from the agent to the LLM
//!
//! The internal models are shaped exactly like the anthropic messages format, so a
//! conversation can be sent there (and persisted) without translation. The openai
//! format is produced from these structs by the payload builders in `providers`.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
