use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameter carrying the backend project URL.
pub const PARAM_PROJECT_URL: &str = "project_url";
/// Query parameter carrying the public (anon) API key.
pub const PARAM_PUBLIC_KEY: &str = "public_key";
pub const PARAM_ACCESS_TOKEN: &str = "access_token";
pub const PARAM_REFRESH_TOKEN: &str = "refresh_token";
/// Optional query parameter naming the application on the HTTP front.
pub const PARAM_APP_ID: &str = "app_id";

pub const ENV_PREFIX: &str = "SESSION_GATE_";

/// How the initialization gate decides who runs the callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStrategy {
    /// Read the record, run the callback, then upsert. Not atomic.
    #[default]
    CheckThenUpsert,
    /// Conditionally claim the record first; losers skip the callback.
    Claim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub loglevel: String,
    pub listen_addr: String,
    /// When set, installation records live in this SQLite database instead of
    /// the hosted table.
    pub database_url: Option<String>,
    pub installations_table: String,
    pub app_id: String,
    pub gate_strategy: GateStrategy,
    pub proxy: Option<Url>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: None,
            installations_table: "installations".to_string(),
            app_id: "default".to_string(),
            gate_strategy: GateStrategy::default(),
            proxy: None,
            connect_timeout_secs: 5,
            request_timeout_secs: 15,
            user_agent: concat!("session-gate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `SESSION_GATE_*` environment variables.
    /// An invalid value is an error; nothing falls back to defaults.
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }
}
