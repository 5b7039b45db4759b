//! Config schema types. Everything is externally supplied: operator
//! allow-list, business-hours window, rate cap/cooldown, auto-finalize delay,
//! reconciliation sweep interval.

use std::str::FromStr;

use {
    chrono::{TimeZone, Timelike, Utc},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FestaConfig {
    pub telegram: TelegramConfig,
    pub operators: Vec<OperatorConfig>,
    pub hours: BusinessHours,
    pub limits: RateLimitConfig,
    pub orders: OrdersConfig,
    pub assist: AssistConfig,
    pub storefront: StorefrontConfig,
    pub persistence: PersistenceConfig,
}

impl FestaConfig {
    pub fn is_operator(&self, id: i64) -> bool {
        self.operators.iter().any(|op| op.id == id)
    }

    pub fn operator_name(&self, id: i64) -> String {
        self.operators
            .iter()
            .find(|op| op.id == id)
            .map(|op| op.name.clone())
            .unwrap_or_else(|| format!("Operator {id}"))
    }
}

/// Telegram bot credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// A registered human operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub id: i64,
    pub name: String,
}

/// Hours during which clients can request a live operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
    /// First hour of the working day (inclusive).
    pub start_hour: u32,
    /// First hour after the working day (exclusive).
    pub end_hour: u32,
    /// IANA timezone name the window is expressed in.
    pub timezone: String,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 21,
            timezone: "Europe/Kyiv".into(),
        }
    }
}

impl BusinessHours {
    /// Whether the window is open right now.
    pub fn is_open_now(&self) -> bool {
        let tz = chrono_tz::Tz::from_str(&self.timezone).unwrap_or(chrono_tz::UTC);
        self.is_open_at(tz.from_utc_datetime(&Utc::now().naive_utc()).hour())
    }

    /// Whether `hour` (in the configured timezone) falls inside the window.
    pub fn is_open_at(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Per-sender inbound rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    pub window_secs: u64,
    /// Messages allowed per window.
    pub max_messages: u32,
    /// Cooldown in seconds once the cap is exceeded.
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_messages: 30,
            cooldown_secs: 300,
        }
    }
}

/// Order aggregation and state-reconciliation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    /// Quiet period after which a draft auto-finalizes, in seconds.
    pub auto_finalize_secs: u64,
    /// Interval of the session/assignment reconciliation sweep, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            auto_finalize_secs: 300,
            sweep_interval_secs: 600,
        }
    }
}

/// Text-completion service used by the general responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// API key; the responder falls back to a canned reply when unset.
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL.
    pub base_url: String,
    pub model: String,
    /// Per-attempt timeout in seconds. Exactly one attempt is made.
    pub timeout_secs: u64,
    /// Rolling history window: entries kept per client.
    pub history_len: usize,
    /// Rolling history TTL in seconds.
    pub history_ttl_secs: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            timeout_secs: 20,
            history_len: 12,
            history_ttl_secs: 5 * 60 * 60,
        }
    }
}

/// Store identity used in menus, FAQ texts, and the responder prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub name: String,
    pub site_url: String,
    pub phone: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            name: "Festa".into(),
            site_url: "https://festa.example".into(),
            phone: "(063) 000-00-00".into(),
        }
    }
}

/// Cold storage. Best-effort only; never authoritative over live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub database_url: String,
    /// Interval of the best-effort full-state snapshot, in seconds.
    pub snapshot_interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:festa.db?mode=rwc".into(),
            snapshot_interval_secs: 3600,
        }
    }
}
