//! Server availability registry
//!
//! The registry holds one immutable [`AvailabilitySnapshot`] behind an
//! `Arc`. Readers clone the `Arc` and never hold the lock while they use
//! it; the health monitor replaces the whole snapshot in one write.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Partition of server ordinals into available and unavailable
///
/// Both sequences are sorted ascending and never share an ordinal. A
/// configured server may be absent from both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    available: Vec<usize>,
    unavailable: Vec<usize>,
    generation: u64,
}

impl AvailabilitySnapshot {
    /// Build a snapshot from unordered probe results
    ///
    /// An ordinal reported both ways is kept only as unavailable.
    pub fn new(mut available: Vec<usize>, mut unavailable: Vec<usize>) -> Self {
        unavailable.sort_unstable();
        unavailable.dedup();
        available.sort_unstable();
        available.dedup();
        available.retain(|ordinal| unavailable.binary_search(ordinal).is_err());

        AvailabilitySnapshot {
            available,
            unavailable,
            generation: 0,
        }
    }

    /// Snapshot with every ordinal in `0..count` available
    pub fn all_available(count: usize) -> Self {
        Self::new((0..count).collect(), Vec::new())
    }

    pub fn available(&self) -> &[usize] {
        &self.available
    }

    pub fn unavailable(&self) -> &[usize] {
        &self.unavailable
    }

    /// Number of publications before this one; 0 for the initial empty snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_available(&self, ordinal: usize) -> bool {
        self.available.binary_search(&ordinal).is_ok()
    }

    /// Health summary against `total` configured servers
    pub fn status(&self, total: usize) -> StatusReport {
        if self.available.is_empty() {
            StatusReport {
                status_id: ServiceStatus::Unavailable,
                status_text: ServiceStatus::Unavailable.text(),
                msg: "None of authentication servers available".to_string(),
            }
        } else if !self.unavailable.is_empty() {
            StatusReport {
                status_id: ServiceStatus::Degraded,
                status_text: ServiceStatus::Degraded.text(),
                msg: format!(
                    "{} of {} authentication servers available",
                    self.available.len(),
                    total
                ),
            }
        } else {
            StatusReport {
                status_id: ServiceStatus::Ok,
                status_text: ServiceStatus::Ok.text(),
                msg: String::new(),
            }
        }
    }
}

/// Overall gateway health, serialised as its numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Ok = 1,
    Degraded = 2,
    Unavailable = 3,
}

impl ServiceStatus {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn text(self) -> &'static str {
        match self {
            ServiceStatus::Ok => "ok",
            ServiceStatus::Degraded => "warn",
            ServiceStatus::Unavailable => "err",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl Serialize for ServiceStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.id())
    }
}

/// Status query answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status_id: ServiceStatus,
    pub status_text: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

/// Process-wide holder of the current snapshot
#[derive(Debug)]
pub struct AvailabilityRegistry {
    current: RwLock<Arc<AvailabilitySnapshot>>,
    total: usize,
}

impl AvailabilityRegistry {
    /// Empty registry for `total` configured servers; nothing is available yet
    pub fn new(total: usize) -> Self {
        AvailabilityRegistry {
            current: RwLock::new(Arc::new(AvailabilitySnapshot::default())),
            total,
        }
    }

    /// Number of configured servers
    pub fn total(&self) -> usize {
        self.total
    }

    /// The current snapshot; later publications do not affect it
    pub fn snapshot(&self) -> Arc<AvailabilitySnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn current_available(&self) -> Vec<usize> {
        self.snapshot().available.clone()
    }

    pub fn current_unavailable(&self) -> Vec<usize> {
        self.snapshot().unavailable.clone()
    }

    pub fn status(&self) -> StatusReport {
        self.snapshot().status(self.total)
    }

    /// Replace the current snapshot, returning the one it replaced
    pub(crate) fn publish(&self, mut snapshot: AvailabilitySnapshot) -> Arc<AvailabilitySnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        snapshot.generation = guard.generation + 1;
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_snapshot_sorted_and_disjoint() {
        let snapshot = AvailabilitySnapshot::new(vec![4, 0, 2, 2], vec![3, 1, 2]);
        assert_eq!(snapshot.available(), &[0, 4]);
        assert_eq!(snapshot.unavailable(), &[1, 2, 3]);
        assert!(snapshot.is_available(4));
        assert!(!snapshot.is_available(2));
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = AvailabilityRegistry::new(3);
        assert!(registry.current_available().is_empty());
        assert!(registry.current_unavailable().is_empty());
        assert_eq!(registry.snapshot().generation(), 0);
        assert_eq!(registry.status().status_id, ServiceStatus::Unavailable);
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let registry = AvailabilityRegistry::new(3);
        let before = registry.snapshot();

        registry.publish(AvailabilitySnapshot::new(vec![2, 0], vec![1]));
        assert_eq!(registry.current_available(), vec![0, 2]);
        assert_eq!(registry.current_unavailable(), vec![1]);
        assert_eq!(registry.snapshot().generation(), 1);

        // A reader's snapshot is unaffected by later publications
        assert!(before.available().is_empty());

        let previous = registry.publish(AvailabilitySnapshot::all_available(3));
        assert_eq!(previous.available(), &[0, 2]);
        assert_eq!(registry.snapshot().generation(), 2);
    }

    #[test]
    fn test_status_reports() {
        let ok = AvailabilitySnapshot::all_available(2).status(2);
        assert_eq!(ok.status_id, ServiceStatus::Ok);
        assert_eq!(ok.status_text, "ok");
        assert!(ok.msg.is_empty());

        let degraded = AvailabilitySnapshot::new(vec![0, 2], vec![1]).status(3);
        assert_eq!(degraded.status_id, ServiceStatus::Degraded);
        assert_eq!(degraded.status_text, "warn");
        assert_eq!(degraded.msg, "2 of 3 authentication servers available");

        let down = AvailabilitySnapshot::new(Vec::new(), vec![0, 1]).status(2);
        assert_eq!(down.status_id, ServiceStatus::Unavailable);
        assert_eq!(down.status_text, "err");
        assert_eq!(down.msg, "None of authentication servers available");
    }

    #[test]
    fn test_status_serialization() {
        let degraded = AvailabilitySnapshot::new(vec![0], vec![1]).status(2);
        assert_eq!(
            serde_json::to_string(&degraded).unwrap(),
            r#"{"status_id":2,"status_text":"warn","msg":"1 of 2 authentication servers available"}"#
        );

        let ok = AvailabilitySnapshot::all_available(1).status(1);
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"status_id":1,"status_text":"ok"}"#
        );
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_snapshot() {
        let registry = Arc::new(AvailabilityRegistry::new(4));
        let writer = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..500 {
                    if i % 2 == 0 {
                        registry.publish(AvailabilitySnapshot::new(vec![0, 1], vec![2, 3]));
                    } else {
                        registry.publish(AvailabilitySnapshot::new(vec![2, 3], vec![0, 1]));
                    }
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = registry.snapshot();
                        let available = snapshot.available();
                        let unavailable = snapshot.unavailable();
                        assert!(available.iter().all(|o| !unavailable.contains(o)));
                        if !available.is_empty() {
                            assert!(available == [0, 1] || available == [2, 3]);
                            assert_eq!(available.len() + unavailable.len(), 4);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
