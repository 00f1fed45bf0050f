use anyhow::{Context, Result};
use belltower_core::AppConfig;
use std::path::PathBuf;

const DEFAULT_CACHE_DIR: &str = ".belltower";

/// 命令行运行配置
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CliConfig {
    pub app: AppConfig,
    pub cache_dir: PathBuf,
}

pub(crate) fn config_from_env() -> Result<CliConfig> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Overlays `BELLTOWER_*` variables on the defaults. Unset keys keep the
/// default, malformed numbers are errors.
pub(crate) fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<CliConfig> {
    let mut app = AppConfig::default();

    if let Some(server) = lookup("BELLTOWER_SERVER") {
        app.server_url = server;
    }
    if let Some(text) = lookup("BELLTOWER_TIMEOUT_SECS") {
        app.timeout_seconds = parse_secs("BELLTOWER_TIMEOUT_SECS", &text)?;
    }
    if let Some(text) = lookup("BELLTOWER_POLL_SECS") {
        app.poll_interval_seconds = parse_secs("BELLTOWER_POLL_SECS", &text)?;
    }
    if let Some(token) = lookup("BELLTOWER_TOKEN").filter(|t| !t.is_empty()) {
        app.token = Some(token);
    }

    let cache_dir = lookup("BELLTOWER_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

    Ok(CliConfig { app, cache_dir })
}

fn parse_secs(key: &str, text: &str) -> Result<u64> {
    let secs: u64 = text
        .trim()
        .parse()
        .with_context(|| format!("invalid {key}: {text}"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(secs)
}
