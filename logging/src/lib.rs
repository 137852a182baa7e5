use core::sync::atomic::{AtomicU64, Ordering};

use derive_more::Display;

pub static INGESTION_PROGRESS: IngestionProgress = IngestionProgress::new();

/// Ingestion position shown in front of log messages emitted with the `*_with_progress` macros.
#[derive(Display, Debug)]
#[display("slots: {processed_slot:?}/{head_slot:?}")]
pub struct IngestionProgress {
    processed_slot: AtomicU64,
    head_slot: AtomicU64,
}

impl IngestionProgress {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            processed_slot: AtomicU64::new(0),
            head_slot: AtomicU64::new(0),
        }
    }

    pub fn set_processed_slot(&self, processed_slot: u64) {
        self.processed_slot.store(processed_slot, Ordering::Relaxed)
    }

    pub fn set_head_slot(&self, head_slot: u64) {
        self.head_slot.store(head_slot, Ordering::Relaxed)
    }
}

impl Default for IngestionProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[macro_export]
macro_rules! info_with_progress {
    ($($arg:tt)*) => {
        ::tracing::info!("[{}] {}", $crate::INGESTION_PROGRESS, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! debug_with_progress {
    ($($arg:tt)*) => {
        ::tracing::debug!("[{}] {}", $crate::INGESTION_PROGRESS, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! warn_with_progress {
    ($($arg:tt)*) => {
        ::tracing::warn!("[{}] {}", $crate::INGESTION_PROGRESS, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! error_with_progress {
    ($($arg:tt)*) => {
        ::tracing::error!("[{}] {}", $crate::INGESTION_PROGRESS, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_with_progress {
    ($($arg:tt)*) => {
        ::tracing::trace!("[{}] {}", $crate::INGESTION_PROGRESS, format_args!($($arg)*));
    };
}
