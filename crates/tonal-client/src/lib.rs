//! Tonal client crate - HTTP collaborators backed by the Tonal proxy.
//!
//! `ProxyClient` implements the chat, transcription and speech collaborator
//! traits by calling the proxy's `/api/*` endpoints.

pub mod proxy;

pub use proxy::ProxyClient;
