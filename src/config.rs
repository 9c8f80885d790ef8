use crate::error::{RelayError, Result};
use crate::providers::Provider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SYSTEM_TEMPLATE: &str = include_str!("prompts/sales_coach.txt");

/// Process-wide relay configuration. Built once at startup, then shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route the relay handler is mounted on.
    #[serde(default = "default_path")]
    pub path: String,
    /// Try Coze first for Coze-format requests, falling back to DeepSeek.
    #[serde(default)]
    pub fallback: bool,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    #[serde(default)]
    pub coze: ProviderConfig,
    #[serde(default)]
    pub deepseek: ProviderConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Inline key; the environment variable takes precedence when both are set.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// System prompt template. `{stage}` is replaced with the conversation stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl PromptConfig {
    pub fn render(&self, stage: &str) -> String {
        self.template
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_TEMPLATE)
            .replace("{stage}", stage)
    }
}

fn default_port() -> u16 {
    3000
}

fn default_path() -> String {
    "/api/relay".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_request_size() -> usize {
    10 * 1024 * 1024
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
            fallback: false,
            request_timeout_ms: default_request_timeout_ms(),
            max_request_size: default_max_request_size(),
            coze: ProviderConfig::default(),
            deepseek: ProviderConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults and environment");
        Ok(Self::default())
    }

    /// Apply environment overrides and resolve API keys.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("USE_COZE") {
            self.fallback = v.trim() == "true";
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT") {
            self.request_timeout_ms = parse_env("REQUEST_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("MAX_REQUEST_SIZE") {
            self.max_request_size = parse_env("MAX_REQUEST_SIZE", &v)?;
        }
        if let Some(v) = lookup("PORT") {
            self.port = parse_env("PORT", &v)?;
        }

        for provider in [Provider::Coze, Provider::DeepSeek] {
            let key_env = self.api_key_env(provider).to_string();
            let cfg = self.provider_mut(provider);
            if let Some(url) = lookup(provider.url_env()) {
                cfg.url = Some(url);
            }
            if let Some(key) = lookup(&key_env) {
                cfg.api_key = Some(key);
            }
        }

        Ok(())
    }

    /// Check the resolved config. A missing DeepSeek key is fatal; a missing Coze key
    /// only turns fallback off.
    pub fn validate(&mut self) -> Result<()> {
        if self.api_key(Provider::DeepSeek).is_none() {
            return Err(RelayError::config(format!(
                "{} is required",
                self.api_key_env(Provider::DeepSeek)
            )));
        }

        if self.fallback && self.api_key(Provider::Coze).is_none() {
            tracing::warn!(
                "{} not set, Coze-first routing disabled",
                self.api_key_env(Provider::Coze)
            );
            self.fallback = false;
        }

        if self.request_timeout_ms == 0 {
            return Err(RelayError::config("request_timeout_ms must be greater than 0"));
        }

        if !self.path.starts_with('/') {
            return Err(RelayError::config(format!(
                "Relay path '{}' must start with '/'",
                self.path
            )));
        }

        Ok(())
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Coze => &self.coze,
            Provider::DeepSeek => &self.deepseek,
        }
    }

    fn provider_mut(&mut self, provider: Provider) -> &mut ProviderConfig {
        match provider {
            Provider::Coze => &mut self.coze,
            Provider::DeepSeek => &mut self.deepseek,
        }
    }

    /// Resolve the endpoint (config override or provider default).
    pub fn effective_url(&self, provider: Provider) -> &str {
        self.provider(provider)
            .url
            .as_deref()
            .unwrap_or_else(|| provider.default_url())
    }

    pub fn api_key_env(&self, provider: Provider) -> &str {
        self.provider(provider)
            .api_key_env
            .as_deref()
            .unwrap_or_else(|| provider.default_api_key_env())
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        self.provider(provider)
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// Whether Coze-format requests should try Coze before DeepSeek.
    pub fn coze_first(&self) -> bool {
        self.fallback && self.api_key(Provider::Coze).is_some()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RelayError::config(format!("Invalid value for {}: '{}'", name, value)))
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("chat-relay.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = dirs_path() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("chat-relay")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("chat-relay").join("config.toml"));
        }
        if let Some(home) = dirs_path() {
            paths.push(home.join(".config").join("chat-relay").join("config.toml"));
        }
    }

    // Home directory fallback
    if let Some(home) = dirs_path() {
        paths.push(home.join(".chat-relay.toml"));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000
path = "/relay"
fallback = true
request_timeout_ms = 1500

[coze]
url = "http://localhost:9000/v1/chat"
api_key_env = "MY_COZE_KEY"

[prompt]
template = "Stage is {{stage}}"
"#
        )
        .unwrap();

        let config = RelayConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.path, "/relay");
        assert!(config.fallback);
        assert_eq!(config.request_timeout_ms, 1500);
        assert_eq!(config.max_request_size, 10 * 1024 * 1024);
        assert_eq!(
            config.effective_url(Provider::Coze),
            "http://localhost:9000/v1/chat"
        );
        assert_eq!(config.api_key_env(Provider::Coze), "MY_COZE_KEY");
        assert_eq!(
            config.effective_url(Provider::DeepSeek),
            Provider::DeepSeek.default_url()
        );
        assert_eq!(config.prompt.render("Closing"), "Stage is Closing");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RelayConfig::default();
        config
            .apply_env(env(&[
                ("USE_COZE", "true"),
                ("COZE_API_KEY", "ck"),
                ("DEEPSEEK_API_KEY", "dk"),
                ("DEEPSEEK_API_URL", "http://127.0.0.1:1/chat"),
                ("REQUEST_TIMEOUT", "500"),
                ("MAX_REQUEST_SIZE", "64"),
            ]))
            .unwrap();
        config.validate().unwrap();

        assert!(config.coze_first());
        assert_eq!(config.api_key(Provider::Coze), Some("ck"));
        assert_eq!(config.api_key(Provider::DeepSeek), Some("dk"));
        assert_eq!(
            config.effective_url(Provider::DeepSeek),
            "http://127.0.0.1:1/chat"
        );
        assert_eq!(config.request_timeout_ms, 500);
        assert_eq!(config.max_request_size, 64);
    }

    #[test]
    fn test_invalid_timeout_env() {
        let mut config = RelayConfig::default();
        let err = config
            .apply_env(env(&[("REQUEST_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
    }

    #[test]
    fn test_missing_deepseek_key_is_fatal() {
        let mut config = RelayConfig::default();
        config.apply_env(env(&[("COZE_API_KEY", "ck")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_API_KEY is required"));
    }

    #[test]
    fn test_missing_coze_key_disables_fallback() {
        let mut config = RelayConfig::default();
        config
            .apply_env(env(&[("USE_COZE", "true"), ("DEEPSEEK_API_KEY", "dk")]))
            .unwrap();
        config.validate().unwrap();
        assert!(!config.fallback);
        assert!(!config.coze_first());
    }

    #[test]
    fn test_default_prompt_mentions_stage() {
        let prompt = PromptConfig::default().render("Negotiation");
        assert!(prompt.contains("The current sales stage is: Negotiation."));
        assert!(!prompt.contains("{stage}"));
    }

    #[test]
    fn test_default_prompt_carries_full_style_rules() {
        let prompt = PromptConfig::default().render("Opening");
        assert!(prompt.starts_with("You are an expert sales coach specializing in closing"));
        assert!(prompt.contains("Your chatting style:"));
        assert!(prompt.contains("- Strictly no exclamation marks in all your replies"));
        assert!(prompt.contains("- No emoticons"));
        assert!(prompt.contains("(reason must be an object with en and zh)"));
        assert!(prompt.ends_with("Do NOT include any markdown, code blocks, or extra commentary."));
    }
}
