//! The two upstream providers the relay can dispatch to.
//!
//! Each provider has a fixed identity (name, default endpoint, default environment
//! variable for its API key). Endpoints and keys can be overridden in config.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Primary provider; speaks the bot/user/additional_messages format natively.
    Coze,
    /// Fallback provider; speaks the OpenAI-style chat completions format.
    DeepSeek,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Coze => "Coze",
            Self::DeepSeek => "DeepSeek",
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            Self::Coze => "https://api.coze.com/v1/chat",
            Self::DeepSeek => "https://api.deepseek.com/v1/chat/completions",
        }
    }

    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::Coze => "COZE_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    pub fn url_env(self) -> &'static str {
        match self {
            Self::Coze => "COZE_API_URL",
            Self::DeepSeek => "DEEPSEEK_API_URL",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
