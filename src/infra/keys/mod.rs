//! Feed API-key management.
//!
//! [`KeyStore`] is the async trait for resolving a reference into its plaintext value.
//! [`EnvKeyStore`] implements [`KeyStore`] over process environment variables
//! (including those loaded from `.env`).

mod env;

pub use env::EnvKeyStore;

use anyhow::Result;

/// Resolves a reference (e.g. an environment variable name) into a plaintext secret.
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, reference: &str) -> Result<String>;
}
