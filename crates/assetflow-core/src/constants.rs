//! Constants governing pipeline behavior.
//!
//! These are the documented defaults; most are surfaced as configurable
//! policy through [`crate::config::UploadConfig`] rather than hard limits.

/// Reserved field on the owning document that holds transient upload state.
pub const UPLOAD_FIELD: &str = "_upload";

/// Field on the owning document that receives the asset reference on
/// completion.
pub const ASSET_FIELD: &str = "asset";

/// An upload is considered stale when no progress update has been observed
/// for this long. Staleness is advisory, never automatically destructive.
pub const STALE_UPLOAD_MS: i64 = 120_000;

/// Default number of transport uploads allowed in flight at once.
pub const MAX_CONCURRENT_UPLOADS: usize = 4;

/// Percent reserved for "starting" so a freshly submitted upload shows a
/// non-zero indicator before the transport reports anything. Transport
/// percent is remapped linearly into the remaining range.
pub const PROGRESS_HEADROOM_PERCENT: f64 = 2.0;

/// Default ceiling on link attempts for a not-yet-ready remote asset.
pub const LINK_MAX_ATTEMPTS: u32 = 10;

/// Default delay between link retries, in milliseconds.
pub const LINK_RETRY_DELAY_MS: u64 = 2_000;

/// Default spacing between link dispatches within a batch, in milliseconds.
pub const LINK_SPACING_MS: u64 = 1_000;

/// Default concurrency bound for a batch of link requests.
pub const LINK_CONCURRENCY: usize = 5;

/// The 422 message payload that marks a link failure as retryable.
pub const ASSET_NOT_READY_MESSAGE: &str = "Media library asset is not ready";
