use super::types::{Config, StoreBackend};
use super::ConfigError;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upstream base URL is set and the timeout is positive
/// - The S3 backend has a bucket configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.upstream.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.base_url cannot be empty".to_string(),
        ));
    }

    if config.upstream.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "upstream.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.store.backend == StoreBackend::S3 {
        match &config.store.s3 {
            Some(s3) if !s3.bucket.trim().is_empty() => {}
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "store.s3.bucket cannot be empty".to_string(),
                ))
            }
            None => {
                return Err(ConfigError::ValidationError(
                    "store.backend is \"s3\" but [store.s3] is missing".to_string(),
                ))
            }
        }
    }

    Ok(())
}
