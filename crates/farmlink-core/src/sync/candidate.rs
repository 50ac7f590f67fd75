//! Sync candidates and the pure tie-break decision
//!
//! A candidate is one named unit under reconciliation (a save folder or a
//! mod name), derived per run from the union of local and device names.
//! Deciding what to do with it is a pure function of existence and
//! timestamps, kept free of I/O so the tie-break rules are trivially
//! testable.

use chrono::{DateTime, Duration, Utc};

/// One named unit under reconciliation.
#[derive(Debug, Clone)]
pub struct SyncCandidate {
    pub name: String,
    pub local_exists: bool,
    pub device_exists: bool,
    pub local_modified: Option<DateTime<Utc>>,
    pub device_modified: Option<DateTime<Utc>>,
}

/// What to do with one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Timestamps agree within the tolerance window.
    InSync,
    /// Device content replaces local. `backup` is set when a local copy
    /// exists and must be snapshotted first; `default_yes` picks the
    /// confirmation default.
    Pull { backup: bool, default_yes: bool },
    /// Local content replaces device. No device-side backup is taken.
    Push { default_yes: bool },
    /// Both sides exist but a timestamp is unavailable; nothing can be
    /// decided safely.
    Undecidable,
}

/// Classify one candidate against the tolerance window.
///
/// Device-newer yields a pull (with backup), local-newer a push. The
/// both-present directions default to "yes" at the confirmation gate; the
/// ambiguous one-sided cases default to "no".
pub fn decide(candidate: &SyncCandidate, tolerance: Duration) -> Decision {
    match (candidate.local_exists, candidate.device_exists) {
        (true, true) => {
            let (Some(local), Some(device)) =
                (candidate.local_modified, candidate.device_modified)
            else {
                return Decision::Undecidable;
            };
            let delta = device - local;
            if delta.abs() < tolerance {
                Decision::InSync
            } else if delta > Duration::zero() {
                Decision::Pull {
                    backup: true,
                    default_yes: true,
                }
            } else {
                Decision::Push { default_yes: true }
            }
        }
        (true, false) => Decision::Push { default_yes: false },
        (false, true) => Decision::Pull {
            backup: false,
            default_yes: false,
        },
        // A candidate only exists because one side named it.
        (false, false) => Decision::InSync,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(epoch: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(epoch, 0).unwrap())
    }

    fn both(local: i64, device: i64) -> SyncCandidate {
        SyncCandidate {
            name: "Farm1".to_string(),
            local_exists: true,
            device_exists: true,
            local_modified: at(local),
            device_modified: at(device),
        }
    }

    fn tolerance() -> Duration {
        Duration::seconds(60)
    }

    #[test]
    fn test_within_tolerance_is_in_sync() {
        assert_eq!(decide(&both(1_000_000, 1_000_059), tolerance()), Decision::InSync);
        assert_eq!(decide(&both(1_000_059, 1_000_000), tolerance()), Decision::InSync);
    }

    #[test]
    fn test_device_newer_pulls_with_backup() {
        assert_eq!(
            decide(&both(1_000_000, 1_000_300), tolerance()),
            Decision::Pull {
                backup: true,
                default_yes: true
            }
        );
    }

    #[test]
    fn test_local_newer_pushes_without_backup() {
        assert_eq!(
            decide(&both(1_000_300, 1_000_000), tolerance()),
            Decision::Push { default_yes: true }
        );
    }

    #[test]
    fn test_exact_tolerance_boundary_acts() {
        // |delta| == tolerance is outside the window.
        assert_eq!(
            decide(&both(1_000_000, 1_000_060), tolerance()),
            Decision::Pull {
                backup: true,
                default_yes: true
            }
        );
    }

    #[test]
    fn test_missing_timestamp_is_undecidable() {
        let mut candidate = both(1_000_000, 1_000_300);
        candidate.device_modified = None;
        assert_eq!(decide(&candidate, tolerance()), Decision::Undecidable);

        let mut candidate = both(1_000_000, 1_000_300);
        candidate.local_modified = None;
        assert_eq!(decide(&candidate, tolerance()), Decision::Undecidable);
    }

    #[test]
    fn test_one_sided_defaults_to_no() {
        let local_only = SyncCandidate {
            name: "Farm1".to_string(),
            local_exists: true,
            device_exists: false,
            local_modified: at(1_000_000),
            device_modified: None,
        };
        assert_eq!(
            decide(&local_only, tolerance()),
            Decision::Push { default_yes: false }
        );

        let device_only = SyncCandidate {
            name: "Farm1".to_string(),
            local_exists: false,
            device_exists: true,
            local_modified: None,
            device_modified: at(1_000_000),
        };
        assert_eq!(
            decide(&device_only, tolerance()),
            Decision::Pull {
                backup: false,
                default_yes: false
            }
        );
    }
}
