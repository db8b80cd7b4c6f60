//! Client side of the generative-language API: request building, envelope
//! parsing, failure classification, retries and tolerant payload extraction.

mod client;
mod outcome;
pub mod payload;
mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod wire;

pub use client::{GeminiClient, GenerativeBackend};
pub use outcome::{RemoteCallOutcome, RemoteError};
pub use payload::PayloadError;
pub use retry::RetryPolicy;
pub use wire::{Content, GenerateRequest, GenerateResponse, GenerationConfig, InlineData, Part};
