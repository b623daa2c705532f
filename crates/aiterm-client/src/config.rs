//! Client configuration.
//!
//! Base URLs are resolved once at startup in priority order: explicit
//! override (CLI flag) > `AITERM_*` env var > legacy `REACT_APP_*` env var >
//! `http://localhost:5002`.

use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5002";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1000);
pub const RECONNECT_ATTEMPTS: u32 = 5;

const API_URL_VARS: [&str; 2] = ["AITERM_API_URL", "REACT_APP_API_URL"];
const WS_URL_VARS: [&str; 2] = ["AITERM_WS_URL", "REACT_APP_WS_URL"];

/// Fixed-delay, bounded retry for the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: RECONNECT_DELAY,
            max_attempts: RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST base, e.g. `http://localhost:5002`. Never ends with `/`.
    pub api_base_url: String,
    /// Channel base; `http(s)` is mapped to `ws(s)` when connecting.
    pub ws_base_url: String,
    pub request_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            ws_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve against the process environment, letting explicit overrides win.
    pub fn resolve(
        api_override: Option<String>,
        ws_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(api_override, ws_override, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        api_override: Option<String>,
        ws_override: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let pick = |explicit: Option<String>, vars: &[&str]| {
            explicit
                .filter(|v| !v.trim().is_empty())
                .or_else(|| {
                    vars.iter()
                        .filter_map(|key| lookup(key))
                        .find(|v| !v.trim().is_empty())
                })
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        };

        let api_base_url = normalize_base_url(&pick(api_override, &API_URL_VARS))?;
        let ws_base_url = normalize_base_url(&pick(ws_override, &WS_URL_VARS))?;

        Ok(Self {
            api_base_url,
            ws_base_url,
            ..Self::default()
        })
    }

    /// Engine.IO v4 WebSocket endpoint for the channel base URL.
    pub fn channel_endpoint(&self) -> Result<String, ConfigError> {
        let mut url = Url::parse(&self.ws_base_url)
            .map_err(|e| ConfigError::InvalidUrl(self.ws_base_url.clone(), e.to_string()))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url.to_string())
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url =
        Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(trimmed.to_string()),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_localhost() {
        let cfg = ClientConfig::resolve_with(None, None, lookup(&[])).unwrap();
        assert_eq!(cfg.api_base_url, "http://localhost:5002");
        assert_eq!(cfg.ws_base_url, "http://localhost:5002");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.reconnect.max_attempts, 5);
    }

    #[test]
    fn override_beats_env_and_env_beats_legacy() {
        let env = lookup(&[
            ("AITERM_API_URL", "http://api.internal:9000/"),
            ("REACT_APP_API_URL", "http://legacy:1"),
            ("REACT_APP_WS_URL", "http://legacy-ws:2"),
        ]);
        let cfg = ClientConfig::resolve_with(None, None, &env).unwrap();
        assert_eq!(cfg.api_base_url, "http://api.internal:9000");
        assert_eq!(cfg.ws_base_url, "http://legacy-ws:2");

        let cfg =
            ClientConfig::resolve_with(Some("https://cli.example".into()), None, &env).unwrap();
        assert_eq!(cfg.api_base_url, "https://cli.example");
    }

    #[test]
    fn blank_values_fall_through() {
        let cfg = ClientConfig::resolve_with(
            Some("  ".into()),
            None,
            lookup(&[("AITERM_API_URL", "")]),
        )
        .unwrap();
        assert_eq!(cfg.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err =
            ClientConfig::resolve_with(Some("ftp://host".into()), None, lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(s) if s == "ftp"));
        assert!(ClientConfig::resolve_with(Some("not a url".into()), None, lookup(&[])).is_err());
    }

    #[test]
    fn channel_endpoint_maps_scheme_and_path() {
        let cfg = ClientConfig::default();
        assert_eq!(
            cfg.channel_endpoint().unwrap(),
            "ws://localhost:5002/socket.io/?EIO=4&transport=websocket"
        );

        let cfg = ClientConfig {
            ws_base_url: "https://term.example/proxy".into(),
            ..ClientConfig::default()
        };
        assert_eq!(
            cfg.channel_endpoint().unwrap(),
            "wss://term.example/proxy/socket.io/?EIO=4&transport=websocket"
        );
    }
}
