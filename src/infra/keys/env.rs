use anyhow::{Context, Result};

use super::KeyStore;

/// Resolves secrets from environment variables.
///
/// An optional prefix lets several deployments share one `.env`
/// (`PROD_TRANSIT_API_KEY`, `STAGING_TRANSIT_API_KEY`).
#[derive(Debug, Default)]
pub struct EnvKeyStore {
    prefix: Option<String>,
}

impl EnvKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn var_name(&self, reference: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{reference}"),
            None => reference.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl KeyStore for EnvKeyStore {
    async fn get(&self, reference: &str) -> Result<String> {
        let name = self.var_name(reference);
        let value = std::env::var(&name)
            .with_context(|| format!("Environment variable '{name}' is not set"))?;
        if value.trim().is_empty() {
            anyhow::bail!("Environment variable '{name}' is empty");
        }
        Ok(value)
    }
}
