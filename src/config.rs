//! Configuration types for the Signals relay.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

/// Root configuration for the relay.
///
/// Built once at startup and shared read-only with every component.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Inbound token verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Auth0 Signals API access.
    #[serde(default)]
    pub signals: SignalsConfig,

    /// CTIM document defaults and lookup tables.
    #[serde(default)]
    pub ctim: CtimConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:9090".
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:9090".to_string()
}

/// How the bearer token yields the vendor API key.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// HS256-signed JWT carrying the key in its `key` claim.
    #[default]
    Jwt,
    /// The bearer token is the API key itself.
    Passthrough,
}

/// Inbound token verification.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    /// HS256 signing secret (supports ${ENV_VAR} syntax).
    #[serde(default)]
    pub secret_key: String,
}

/// Auth0 Signals API access.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalsConfig {
    /// Base URL of the Signals API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// UI report link template; `{value}` is replaced with the observable.
    #[serde(default = "default_ui_url")]
    pub ui_url: String,

    /// User-Agent sent with every outbound request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// API request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Maximum number of blocklist details fetched per observable.
    #[serde(default = "default_entities_limit")]
    pub entities_limit: usize,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ui_url: default_ui_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout(),
            entities_limit: default_entities_limit(),
        }
    }
}

fn default_api_url() -> String {
    "https://signals.api.auth0.com/".to_string()
}

fn default_ui_url() -> String {
    "https://auth0.com/signals/ip/{value}-report".to_string()
}

fn default_user_agent() -> String {
    "Cisco Threat Response Integrations <tr-integrations-support@cisco.com>".to_string()
}

fn default_timeout() -> u64 {
    5000
}

/// Default cap on entities per response.
pub const DEFAULT_ENTITIES_LIMIT: usize = 100;

fn default_entities_limit() -> usize {
    DEFAULT_ENTITIES_LIMIT
}

/// Disposition assigned to a verdict for a given Signals score.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Disposition {
    pub disposition: u8,
    pub disposition_name: String,
}

impl Disposition {
    fn new(disposition: u8, name: &str) -> Self {
        Self {
            disposition,
            disposition_name: name.to_string(),
        }
    }
}

/// CTIM document defaults and lookup tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CtimConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// `source` written on judgements.
    #[serde(default = "default_source")]
    pub source: String,

    /// Judgement validity window in days.
    #[serde(default = "default_judgement_days")]
    pub judgement_valid_days: i64,

    /// Verdict disposition keyed by the top-level Signals score.
    #[serde(default = "default_dispositions")]
    pub dispositions: BTreeMap<i64, Disposition>,

    /// Judgement reason keyed by Signals category.
    #[serde(default = "default_reasons")]
    pub reasons: BTreeMap<String, String>,

    /// Sighting/indicator severity keyed by blocklist sensitivity code.
    #[serde(default = "default_severities")]
    pub severities: BTreeMap<String, String>,
}

impl Default for CtimConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            source: default_source(),
            judgement_valid_days: default_judgement_days(),
            dispositions: default_dispositions(),
            reasons: default_reasons(),
            severities: default_severities(),
        }
    }
}

fn default_schema_version() -> String {
    "1.0.17".to_string()
}

fn default_source() -> String {
    "Auth0 Signals Report".to_string()
}

fn default_judgement_days() -> i64 {
    7
}

fn default_dispositions() -> BTreeMap<i64, Disposition> {
    BTreeMap::from([
        (0, Disposition::new(5, "Unknown")),
        (-1, Disposition::new(3, "Suspicious")),
        (-2, Disposition::new(3, "Suspicious")),
        (-3, Disposition::new(2, "Malicious")),
    ])
}

fn default_reasons() -> BTreeMap<String, String> {
    [
        ("baddomain", "Associated hostname found on blocklist"),
        ("badip", "IP found on blocklist"),
        ("history", "IP found on blocklist in recent past"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_severities() -> BTreeMap<String, String> {
    [("1", "High"), ("5", "Medium"), ("10", "Info")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Apply process environment overrides on top of file/default values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(url) = lookup("SIGNALS_API_URL") {
            self.signals.api_url = url;
        }
        if let Some(url) = lookup("SIGNALS_UI_URL") {
            self.signals.ui_url = url;
        }
        if let Some(agent) = lookup("SIGNALS_USER_AGENT") {
            self.signals.user_agent = agent;
        }
        if let Some(raw) = lookup("CTR_ENTITIES_LIMIT") {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => self.signals.entities_limit = limit,
                _ => {
                    warn!(value = %raw, "Ignoring invalid CTR_ENTITIES_LIMIT");
                    self.signals.entities_limit = DEFAULT_ENTITIES_LIMIT;
                }
            }
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        reqwest::Url::parse(&self.signals.api_url).map_err(|e| {
            anyhow::anyhow!("Invalid signals.api_url '{}': {}", self.signals.api_url, e)
        })?;

        if !self.signals.ui_url.contains("{value}") {
            anyhow::bail!("signals.ui_url must contain a {{value}} placeholder");
        }

        if self.signals.entities_limit == 0 {
            anyhow::bail!("signals.entities_limit must be > 0");
        }

        if self.signals.timeout_ms == 0 {
            anyhow::bail!("signals.timeout_ms must be > 0");
        }

        if self.ctim.dispositions.is_empty() {
            anyhow::bail!("ctim.dispositions must not be empty");
        }

        if self.ctim.judgement_valid_days <= 0 {
            anyhow::bail!("ctim.judgement_valid_days must be > 0");
        }

        // A missing secret is reported per request, not at startup.
        if self.auth.mode == AuthMode::Jwt && self.auth.secret_key.is_empty() {
            warn!("auth.secret_key is empty; every JWT will be rejected");
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# Auth0 Signals relay configuration

server:
  listen: "0.0.0.0:9090"

auth:
  mode: jwt                    # jwt or passthrough
  secret_key: "${SECRET_KEY}"  # HS256 secret for inbound tokens

signals:
  api_url: "https://signals.api.auth0.com/"
  ui_url: "https://auth0.com/signals/ip/{value}-report"
  user_agent: "Cisco Threat Response Integrations <tr-integrations-support@cisco.com>"
  timeout_ms: 5000
  entities_limit: 100          # Max blocklist details per observable

ctim:
  schema_version: "1.0.17"
  source: "Auth0 Signals Report"
  judgement_valid_days: 7
  dispositions:
    0: { disposition: 5, disposition_name: Unknown }
    -1: { disposition: 3, disposition_name: Suspicious }
    -2: { disposition: 3, disposition_name: Suspicious }
    -3: { disposition: 2, disposition_name: Malicious }
  reasons:
    baddomain: "Associated hostname found on blocklist"
    badip: "IP found on blocklist"
    history: "IP found on blocklist in recent past"
  severities:
    "1": High
    "5": Medium
    "10": Info
"#
        .to_string()
    }
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
