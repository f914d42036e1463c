//! `tracegate check`

use anyhow::Result;
use tracegate_core::{GatewayConfig, LangfuseConfig, kv};

use crate::output;

pub async fn handle() -> Result<()> {
    let config = GatewayConfig::from_env();
    config.validate()?;

    output::header("Gateway");
    output::kv("key prefix", &config.key_prefix);
    output::kv("cache ttl", &format!("{}s", config.cache_ttl.as_secs()));
    output::kv("lock ttl", &format!("{}ms", config.lock_ttl.as_millis()));
    output::kv(
        "max lock wait",
        &format!("{}ms", config.max_lock_wait().as_millis()),
    );
    output::kv("default tags", &config.default_tags.join(","));

    output::header("Cache backend");
    let backend = kv::from_config(&config)?;
    output::kv("backend", backend.backend_id());
    match backend.ping().await {
        Ok(()) => output::success("Backend reachable"),
        Err(e) => output::warning(&format!("Backend unreachable, validation will fail open: {e}")),
    }

    output::header("Sink");
    match LangfuseConfig::from_env() {
        Ok(langfuse) => {
            output::kv("langfuse", &langfuse.base_url);
            output::kv("timeout", &format!("{}s", langfuse.timeout.as_secs()));
        }
        Err(e) => {
            output::warning(&e.to_string());
            output::dim("Only --dry-run submissions are possible");
        }
    }
    Ok(())
}
