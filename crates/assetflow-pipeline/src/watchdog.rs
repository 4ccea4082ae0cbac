//! Stale upload detection.
//!
//! An upload whose inline state stops advancing (the writer navigated
//! away, the process died mid-transfer) leaves the document stuck showing
//! a progress bar forever. The watchdog surfaces that condition so the
//! surrounding application can offer a manual clear. It is strictly
//! advisory: nothing here mutates state or cancels work.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use assetflow_core::models::UploadState;
use assetflow_core::UploadConfig;

/// Flags uploads that have gone quiet past a threshold.
#[derive(Clone, Debug)]
pub struct StaleUploadWatchdog {
    threshold_ms: i64,
}

impl StaleUploadWatchdog {
    pub fn new(threshold_ms: i64) -> Self {
        Self { threshold_ms }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.stale_upload_ms)
    }

    /// Whether the persisted state's last update is older than the
    /// threshold.
    pub fn is_stale(&self, state: &UploadState, now: DateTime<Utc>) -> bool {
        state.is_stale_after(now, self.threshold_ms)
    }

    /// Watch a live activity signal.
    ///
    /// Each `()` on `activity` marks progress and resets the timer; once
    /// the threshold elapses with no activity the returned receiver flips
    /// to `true`. Later activity flips it back. The watch task ends when
    /// the activity channel closes.
    pub fn observe(&self, mut activity: mpsc::Receiver<()>) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        let threshold = Duration::from_millis(self.threshold_ms.max(0) as u64);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = activity.recv() => match message {
                        Some(()) => {
                            if *tx.borrow() {
                                let _ = tx.send(false);
                            }
                        }
                        None => break,
                    },
                    _ = tokio::time::sleep(threshold) => {
                        if !*tx.borrow() {
                            let _ = tx.send(true);
                        }
                    }
                }
            }
        });
        rx
    }
}
