//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for interacting with the language
//! model hosting environments a catalog entity can reference. It abstracts
//! away provider-specific wire formats behind common traits, so workflow nodes
//! only ever see the [`LanguageModelInvoker`](crate::capabilities::LanguageModelInvoker)
//! capability.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Chooses a backend from an [`LlmEntity`](crate::types::LlmEntity)
//! - [`ProviderInvoker`] - Implements the invoker capability on top of providers
//!
//! # Example
//!
//! ```ignore
//! use agentplane::llm::{LLMClient, Provider};
//!
//! let provider = Provider::from_entity(&entity)?;
//! let client = provider.create_client(reqwest::Client::new());
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Invoker capability implementation.
pub mod invoker;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use client::{CompletionRequest, LLMClient, Provider};
pub use invoker::ProviderInvoker;
