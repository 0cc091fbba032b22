use std::path::PathBuf;
use std::time::Duration;

/// Process configuration derived from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    /// HTTP relay of the chat gateway; `None` logs payloads instead.
    pub chat_relay_url: Option<String>,
    pub lifecycle: LifecycleConfig,
}

/// Intake thresholds used by the lifecycle controller.
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    pub min_reason_len: usize,
    pub min_evidence_len: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { min_reason_len: 10, min_evidence_len: 10 }
    }
}

pub(crate) fn usize_env(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub(crate) fn dur_env(name: &str, default: u64) -> Duration {
    Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default))
}

pub(crate) fn bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn opt_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl LifecycleConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            min_reason_len: usize_env("REPORT_MIN_REASON_LEN", d.min_reason_len),
            min_evidence_len: usize_env("STAFF_MIN_EVIDENCE_LEN", d.min_evidence_len),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: opt_env("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            data_dir: opt_env("BLACKLIST_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            database_url: opt_env("DATABASE_URL"),
            chat_relay_url: opt_env("CHAT_RELAY_URL"),
            lifecycle: LifecycleConfig::from_env(),
        }
    }
}
