use crate::error::ConfigError;
use crate::reducer::ClearScope;
use crate::transport::ReconnectPolicy;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8000/ws";

pub const ENDPOINT_VAR: &str = "AGENTUI_ENDPOINT";
pub const CLEAR_SCOPE_VAR: &str = "AGENTUI_CLEAR_SCOPE";
pub const RECONNECT_INITIAL_MS_VAR: &str = "AGENTUI_RECONNECT_INITIAL_MS";
pub const RECONNECT_MAX_MS_VAR: &str = "AGENTUI_RECONNECT_MAX_MS";
pub const RECONNECT_MAX_RETRIES_VAR: &str = "AGENTUI_RECONNECT_MAX_RETRIES";

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub endpoint: Url,
    pub clear_scope: ClearScope,
    pub reconnect: ReconnectPolicy,
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ReconnectPolicy::default();

        let endpoint = match lookup(ENDPOINT_VAR).filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => parse_endpoint(raw.trim())?,
            None => parse_endpoint(DEFAULT_ENDPOINT)?,
        };

        let clear_scope = match lookup(CLEAR_SCOPE_VAR) {
            Some(raw) => parse_clear_scope(&raw)?,
            None => ClearScope::default(),
        };

        let initial_delay = parse_positive_u64(&lookup, RECONNECT_INITIAL_MS_VAR)
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay);
        let max_delay = parse_positive_u64(&lookup, RECONNECT_MAX_MS_VAR)
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay)
            .max(initial_delay);

        let max_retries = lookup(RECONNECT_MAX_RETRIES_VAR).and_then(|raw| {
            raw.trim()
                .parse::<u32>()
                .inspect_err(|_| {
                    warn!(
                        var = RECONNECT_MAX_RETRIES_VAR,
                        value = %raw,
                        "ignoring unparsable retry limit; retrying forever"
                    )
                })
                .ok()
        });

        Ok(Self {
            endpoint,
            clear_scope,
            reconnect: ReconnectPolicy {
                initial_delay,
                max_delay,
                max_retries,
                ..defaults
            },
        })
    }
}

/// Only plain `ws` is accepted; the transport is built without TLS.
pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint {
        value: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "ws" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

pub fn parse_clear_scope(raw: &str) -> Result<ClearScope, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "global" => Ok(ClearScope::Global),
        "container" => Ok(ClearScope::Container),
        _ => Err(ConfigError::InvalidClearScope(raw.to_string())),
    }
}

fn parse_positive_u64<F>(lookup: &F, name: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    let parsed = raw.trim().parse::<u64>().ok().filter(|value| *value > 0);

    if parsed.is_none() {
        warn!(var = name, value = %raw, "ignoring invalid value; using default");
    }

    parsed
}
