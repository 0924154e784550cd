use crate::cache::CacheTtls;
use crate::options::FeatureToggles;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

const DAY_SECS: u64 = 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub provider_gateway_url: String,
    pub provider_gateway_token: String,
    pub provider_timeout_secs: u64,
    pub max_parallel_batches: usize,
    pub max_batch_size: usize,
    pub max_batch_records: usize,
    pub use_state_license: bool,
    pub use_pdl: bool,
    pub registry_cache_ttl_secs: u64,
    pub association_cache_ttl_secs: u64,
    pub contact_cache_ttl_secs: u64,
    pub classification_cache_ttl_secs: u64,
    pub cache_max_capacity: u64,
}

/// Reads an optional numeric variable, falling back to `default` when unset.
fn numeric_var<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}

/// Feature toggles are on unless set to the literal `false`.
fn toggle_var(name: &str) -> bool {
    !matches!(std::env::var(name), Ok(value) if value.trim().eq_ignore_ascii_case("false"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            provider_gateway_url: std::env::var("PROVIDER_GATEWAY_URL")
                .map_err(|_| anyhow::anyhow!("PROVIDER_GATEWAY_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("PROVIDER_GATEWAY_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("PROVIDER_GATEWAY_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            provider_gateway_token: std::env::var("PROVIDER_GATEWAY_TOKEN")
                .map_err(|_| {
                    anyhow::anyhow!("PROVIDER_GATEWAY_TOKEN environment variable required")
                })
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("PROVIDER_GATEWAY_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            provider_timeout_secs: numeric_var("PROVIDER_TIMEOUT_SECS", 30)?,
            max_parallel_batches: numeric_var("MAX_PARALLEL_BATCHES", 3)?,
            max_batch_size: numeric_var("MAX_BATCH_SIZE", 10)?,
            max_batch_records: numeric_var("MAX_BATCH_RECORDS", 500)?,
            use_state_license: toggle_var("USE_STATE_LICENSE"),
            use_pdl: toggle_var("USE_PDL"),
            registry_cache_ttl_secs: numeric_var("REGISTRY_CACHE_TTL_SECS", DAY_SECS)?,
            association_cache_ttl_secs: numeric_var("ASSOCIATION_CACHE_TTL_SECS", 7 * DAY_SECS)?,
            contact_cache_ttl_secs: numeric_var("CONTACT_CACHE_TTL_SECS", DAY_SECS)?,
            classification_cache_ttl_secs: numeric_var(
                "CLASSIFICATION_CACHE_TTL_SECS",
                7 * DAY_SECS,
            )?,
            cache_max_capacity: numeric_var("CACHE_MAX_CAPACITY", 100_000)?,
        };

        config.validate()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Provider Gateway URL: {}", config.provider_gateway_url);
        tracing::debug!("Provider timeout: {}s", config.provider_timeout_secs);
        tracing::debug!(
            "Batching: {} parallel batches of {} (max {} records)",
            config.max_parallel_batches,
            config.max_batch_size,
            config.max_batch_records
        );
        if !config.use_state_license {
            tracing::info!("State license lookups disabled by USE_STATE_LICENSE=false");
        }
        if !config.use_pdl {
            tracing::info!("Person enrichment disabled by USE_PDL=false");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("PROVIDER_TIMEOUT_SECS must be greater than 0");
        }
        if self.max_parallel_batches == 0 {
            anyhow::bail!("MAX_PARALLEL_BATCHES must be greater than 0");
        }
        if self.max_batch_size == 0 {
            anyhow::bail!("MAX_BATCH_SIZE must be greater than 0");
        }
        if self.max_batch_records == 0 {
            anyhow::bail!("MAX_BATCH_RECORDS must be greater than 0");
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn feature_toggles(&self) -> FeatureToggles {
        FeatureToggles {
            use_state_license: self.use_state_license,
            use_pdl: self.use_pdl,
        }
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            registry: Duration::from_secs(self.registry_cache_ttl_secs),
            association: Duration::from_secs(self.association_cache_ttl_secs),
            contact: Duration::from_secs(self.contact_cache_ttl_secs),
        }
    }

    pub fn classification_ttl(&self) -> Duration {
        Duration::from_secs(self.classification_cache_ttl_secs)
    }
}
