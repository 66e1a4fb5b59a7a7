//! # Push Validation Metrics
//!
//! Prometheus metrics for monitoring push admission.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! fc-01-push-validation = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `push_notes_validated_total` - Counter of push notes accepted
//! - `push_notes_rejected_total` - Counter of push notes rejected (by reason)
//! - `endorsements_rejected_total` - Counter of endorsements rejected (by reason)
//! - `push_validation_latency_seconds` - Histogram of full push validation times

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total push notes accepted
    pub static ref PUSH_NOTES_VALIDATED: IntCounter = register_int_counter!(
        "push_notes_validated_total",
        "Total number of push notes accepted"
    )
    .expect("Failed to create PUSH_NOTES_VALIDATED metric");

    /// Total push notes rejected, labeled by rejection reason
    pub static ref PUSH_NOTES_REJECTED: CounterVec = register_counter_vec!(
        "push_notes_rejected_total",
        "Total number of push notes rejected",
        &["reason"]
    )
    .expect("Failed to create PUSH_NOTES_REJECTED metric");

    /// Total endorsements rejected, labeled by rejection reason
    pub static ref ENDORSEMENTS_REJECTED: CounterVec = register_counter_vec!(
        "endorsements_rejected_total",
        "Total number of endorsements rejected",
        &["reason"]
    )
    .expect("Failed to create ENDORSEMENTS_REJECTED metric");

    /// Histogram of push validation latency
    pub static ref VALIDATION_LATENCY: Histogram = register_histogram!(
        "push_validation_latency_seconds",
        "Time taken to validate a push note in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create VALIDATION_LATENCY metric");
}

/// Record an accepted push note
#[cfg(feature = "metrics")]
pub fn record_push_note_validated() {
    PUSH_NOTES_VALIDATED.inc();
}

/// Record a rejected push note with reason
#[cfg(feature = "metrics")]
pub fn record_push_note_rejected(reason: &str) {
    PUSH_NOTES_REJECTED.with_label_values(&[reason]).inc();
}

/// Record a rejected endorsement with reason
#[cfg(feature = "metrics")]
pub fn record_endorsement_rejected(reason: &str) {
    ENDORSEMENTS_REJECTED.with_label_values(&[reason]).inc();
}

/// Record validation latency
#[cfg(feature = "metrics")]
pub fn record_validation_latency(seconds: f64) {
    VALIDATION_LATENCY.observe(seconds);
}

#[cfg(not(feature = "metrics"))]
pub fn record_push_note_validated() {}

#[cfg(not(feature = "metrics"))]
pub fn record_push_note_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_endorsement_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_validation_latency(_seconds: f64) {}
