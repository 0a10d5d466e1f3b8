//! Per-subscriber delivery: turn a raw notification payload into the JSON
//! frames this connection's principal is allowed to see.
//!
//! Kept free of socket I/O so the whole delivery policy is testable with a
//! fake store — the connection loop owns the actual sends.

use logbus_store::{LogStore, Principal};
use tracing::{debug, warn};

/// Resolve one broadcast payload into zero or more outbound frames.
///
/// The payload is the textual id of a freshly created log record. Anything
/// that yields no visible record — malformed payload, unknown id, record
/// not visible to this principal, store error — delivers nothing; only the
/// store error is worth a warning.
pub async fn frames_for_payload(
    payload: &str,
    principal: &Principal,
    store: &dyn LogStore,
) -> Vec<String> {
    let id: i64 = match payload.trim().parse() {
        Ok(id) => id,
        Err(_) => {
            debug!(payload, "ignoring non-numeric notification payload");
            return Vec::new();
        }
    };

    let records = match store.find_by_id(id, principal).await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, id, "log lookup failed; skipping delivery");
            return Vec::new();
        }
    };

    records
        .iter()
        .filter_map(|record| match serde_json::to_string(record) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, id = record.id, "log record failed to serialize");
                None
            }
        })
        .collect()
}
