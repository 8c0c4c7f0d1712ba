use std::env;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:8080";

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub openrouter_base_url: String,
    pub max_tokens: u32,
    pub bind_addr: String,
    pub bridge_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // A missing key is not fatal: the provider rejects the call and the
        // caller sees that as an upstream failure.
        let openrouter_api_key = lookup("OPENROUTER_API_KEY").unwrap_or_else(|| {
            log::warn!("⚠️ OPENROUTER_API_KEY not set, analysis calls will be rejected upstream");
            String::new()
        });

        let max_tokens = match lookup("ANALYSIS_MAX_TOKENS") {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                log::warn!("⚠️ Invalid ANALYSIS_MAX_TOKENS '{}', using {}", raw, DEFAULT_MAX_TOKENS);
                DEFAULT_MAX_TOKENS
            }),
            None => DEFAULT_MAX_TOKENS,
        };

        Self {
            openrouter_api_key,
            openrouter_model: lookup("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openrouter_base_url: lookup("OPENROUTER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            bridge_url: lookup("BRIDGE_URL").unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[]));

        assert_eq!(config.openrouter_api_key, "");
        assert_eq!(config.openrouter_model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("OPENROUTER_MODEL", "google/gemini-flash"),
            ("OPENROUTER_BASE_URL", "http://127.0.0.1:9000/v1/"),
            ("ANALYSIS_MAX_TOKENS", "300"),
        ]));

        assert_eq!(config.openrouter_api_key, "sk-test");
        assert_eq!(config.openrouter_model, "google/gemini-flash");
        assert_eq!(config.openrouter_base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(config.max_tokens, 300);
    }

    #[test]
    fn test_bad_max_tokens_falls_back() {
        let config = Config::from_lookup(lookup_from(&[("ANALYSIS_MAX_TOKENS", "lots")]));
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
