//! Configuration module
//!
//! Env-driven configuration for the upload pipeline. The retry and spacing
//! values are policy, not load-bearing invariants; defaults match the
//! documented constants and every value can be overridden per deployment.

use std::env;
use std::time::Duration;

use crate::constants;

/// Upload pipeline configuration.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Maximum transport uploads in flight through one limiter instance.
    pub max_concurrent_uploads: usize,
    /// Quiet period after which an in-progress upload is flagged stale.
    pub stale_upload_ms: i64,
    /// Ceiling on link attempts while the remote asset is still processing.
    pub link_max_attempts: u32,
    /// Fixed delay between link retries.
    pub link_retry_delay_ms: u64,
    /// Fixed spacing between link dispatches within a batch.
    pub link_spacing_ms: u64,
    /// Concurrency bound for a batch of link requests.
    pub link_concurrency: usize,
    /// Bounded prefix read for EXIF extraction, in bytes.
    pub exif_prefix_bytes: usize,
    /// Longest edge of the generated preview image, in pixels.
    pub preview_max_dimension: u32,
    /// JPEG quality for the compressed preview (1-100).
    pub preview_jpeg_quality: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: constants::MAX_CONCURRENT_UPLOADS,
            stale_upload_ms: constants::STALE_UPLOAD_MS,
            link_max_attempts: constants::LINK_MAX_ATTEMPTS,
            link_retry_delay_ms: constants::LINK_RETRY_DELAY_MS,
            link_spacing_ms: constants::LINK_SPACING_MS,
            link_concurrency: constants::LINK_CONCURRENCY,
            exif_prefix_bytes: EXIF_PREFIX_BYTES,
            preview_max_dimension: PREVIEW_MAX_DIMENSION,
            preview_jpeg_quality: PREVIEW_JPEG_QUALITY,
        }
    }
}

const EXIF_PREFIX_BYTES: usize = 64 * 1024;
const PREVIEW_MAX_DIMENSION: u32 = 320;
const PREVIEW_JPEG_QUALITY: u8 = 75;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = UploadConfig {
            max_concurrent_uploads: env_parse(
                "MAX_CONCURRENT_UPLOADS",
                constants::MAX_CONCURRENT_UPLOADS,
            ),
            stale_upload_ms: env_parse("STALE_UPLOAD_MS", constants::STALE_UPLOAD_MS),
            link_max_attempts: env_parse("LINK_MAX_ATTEMPTS", constants::LINK_MAX_ATTEMPTS),
            link_retry_delay_ms: env_parse("LINK_RETRY_DELAY_MS", constants::LINK_RETRY_DELAY_MS),
            link_spacing_ms: env_parse("LINK_SPACING_MS", constants::LINK_SPACING_MS),
            link_concurrency: env_parse("LINK_CONCURRENCY", constants::LINK_CONCURRENCY),
            exif_prefix_bytes: env_parse("EXIF_PREFIX_BYTES", EXIF_PREFIX_BYTES),
            preview_max_dimension: env_parse("PREVIEW_MAX_DIMENSION", PREVIEW_MAX_DIMENSION),
            preview_jpeg_quality: env_parse("PREVIEW_JPEG_QUALITY", PREVIEW_JPEG_QUALITY),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent_uploads == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_UPLOADS must be at least 1"
            ));
        }
        if self.link_concurrency == 0 {
            return Err(anyhow::anyhow!("LINK_CONCURRENCY must be at least 1"));
        }
        if self.link_max_attempts == 0 {
            return Err(anyhow::anyhow!("LINK_MAX_ATTEMPTS must be at least 1"));
        }
        if self.preview_jpeg_quality == 0 || self.preview_jpeg_quality > 100 {
            return Err(anyhow::anyhow!(
                "PREVIEW_JPEG_QUALITY must be between 1 and 100"
            ));
        }
        Ok(())
    }

    pub fn link_retry_delay(&self) -> Duration {
        Duration::from_millis(self.link_retry_delay_ms)
    }

    pub fn link_spacing(&self) -> Duration {
        Duration::from_millis(self.link_spacing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.max_concurrent_uploads, 4);
        assert_eq!(config.stale_upload_ms, 120_000);
        assert_eq!(config.link_max_attempts, 10);
        assert_eq!(config.link_retry_delay_ms, 2_000);
        assert_eq!(config.link_spacing_ms, 1_000);
        assert_eq!(config.link_concurrency, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = UploadConfig {
            max_concurrent_uploads: 0,
            ..UploadConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_jpeg_quality() {
        let config = UploadConfig {
            preview_jpeg_quality: 0,
            ..UploadConfig::default()
        };
        assert!(config.validate().is_err());

        let config = UploadConfig {
            preview_jpeg_quality: 101,
            ..UploadConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
