//! Core domain logic for Rollcall, a weekly class attendance tracker.
//! This crate is the single source of truth for business invariants.

pub mod logging;
pub mod model;
pub mod ops;
pub mod stats;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{
    from_json_bytes, to_json_bytes, AttendanceRecord, Class, Document, ExportError, ExportResult,
    Person,
};
pub use model::normalize::normalize;
pub use ops::{OpError, OpResult};
pub use stats::{
    by_date_series, date_ranking, last_date_breakdown, person_metrics, ClassTally, DateTally,
    PersonMetrics, DROPOUT_STREAK_THRESHOLD,
};
pub use store::{
    AttendanceStore, FileCache, HttpRemote, LocalCache, PushAck, RemoteDocumentService,
    RemoteError, RemoteResult, SyncStatus, DEFAULT_DEBOUNCE,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
