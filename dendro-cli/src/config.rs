//! Configuration module
//!
//! Handles CLI configuration: where the orchestrator lives and who is asking.

use anyhow::{Result, anyhow};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
    /// User API key for commands that act on a user's behalf
    pub api_key: Option<String>,
}

impl Config {
    /// The API key, or an error naming how to provide one
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow!("this command needs an API key; pass --api-key or set DENDRO_API_KEY")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_required() {
        let mut config = Config {
            orchestrator_url: "http://localhost:8080".to_string(),
            api_key: None,
        };
        assert!(config.api_key().is_err());

        config.api_key = Some(String::new());
        assert!(config.api_key().is_err());

        config.api_key = Some("abc".to_string());
        assert_eq!(config.api_key().unwrap(), "abc");
    }
}
