pub mod anthropic;
pub mod base;
pub mod client;
pub mod configs;
pub mod errors;
pub mod factory;
pub mod openai;
pub mod stream;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub mod mock;
