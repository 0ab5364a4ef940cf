//! Reservation metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `reservation_orders_committed_total` - Orders committed
//! - `reservation_orders_rejected_total{reason}` - Submissions rejected, by error kind
//! - `reservation_tickets_committed_total` - Tickets committed
//! - `reservation_orders_cancelled_total` - Orders cancelled
//!
//! ## Histograms
//! - `reservation_commit_duration_seconds` - Time spent in the atomic commit

use metrics::{describe_counter, describe_histogram};

/// Orders committed.
pub const ORDERS_COMMITTED: &str = "reservation_orders_committed_total";
/// Submissions rejected, labelled by `reason`.
pub const ORDERS_REJECTED: &str = "reservation_orders_rejected_total";
/// Tickets committed.
pub const TICKETS_COMMITTED: &str = "reservation_tickets_committed_total";
/// Orders cancelled.
pub const ORDERS_CANCELLED: &str = "reservation_orders_cancelled_total";
/// Commit latency.
pub const COMMIT_DURATION: &str = "reservation_commit_duration_seconds";

/// Register metric descriptions. Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(ORDERS_COMMITTED, "Total number of committed orders");
    describe_counter!(
        ORDERS_REJECTED,
        "Total number of rejected order submissions by reason"
    );
    describe_counter!(TICKETS_COMMITTED, "Total number of committed tickets");
    describe_counter!(ORDERS_CANCELLED, "Total number of cancelled orders");
    describe_histogram!(
        COMMIT_DURATION,
        "Time taken by the atomic order commit in seconds"
    );

    tracing::info!("Reservation metrics registered");
}

/// Record a committed order.
pub fn record_order_committed(tickets: usize, duration_secs: f64) {
    metrics::counter!(ORDERS_COMMITTED).increment(1);
    metrics::counter!(TICKETS_COMMITTED).increment(tickets as u64);
    metrics::histogram!(COMMIT_DURATION).record(duration_secs);
}

/// Record a rejected submission.
pub fn record_order_rejected(reason: &'static str) {
    metrics::counter!(ORDERS_REJECTED, "reason" => reason).increment(1);
}

/// Record a cancelled order.
pub fn record_order_cancelled() {
    metrics::counter!(ORDERS_CANCELLED).increment(1);
}
