//! Server selection policy

use crate::registry::AvailabilitySnapshot;

/// Pick the server a new request should go to
///
/// Always the lowest available ordinal; `None` when nothing is available,
/// including before the first health check has completed.
pub fn pick_server(snapshot: &AvailabilitySnapshot) -> Option<usize> {
    snapshot.available().first().copied()
}
