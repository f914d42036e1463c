//! `tracegate validate`

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracegate_core::cache::IdentityKeys;
use tracegate_core::{GatewayConfig, IdentityValidator, StaticDirectory, kv};

use crate::output;

pub async fn handle(identity: &str, client_address: &str, directory: &Path) -> Result<()> {
    let config = GatewayConfig::from_env();
    config.validate()?;
    let backend = kv::from_config(&config)?;
    let directory = StaticDirectory::from_file(directory)
        .await
        .with_context(|| format!("loading directory {}", directory.display()))?;

    let keys = IdentityKeys::derive(&config.key_prefix, client_address, identity);
    let validator = IdentityValidator::new(backend, Arc::new(directory), &config);
    let valid = validator.validate(identity, client_address).await?;

    output::data(
        "validation",
        &json!({ "valid": valid, "digest": keys.digest, "cacheKey": keys.cache_key }),
    );
    if valid {
        output::success("Identity is registered");
    } else {
        output::warning("Identity is not registered");
    }
    Ok(())
}
