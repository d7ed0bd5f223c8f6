//! The grouping state machine.
//!
//! One entry per [`GroupKey`], tracking which raw kinds have been
//! observed. States are `Empty → Partial → Complete`; `Complete` is
//! absorbing. The registry itself performs no I/O and never invokes the
//! merge transform — it only reports when a group's required triple is
//! fully observed, and is told (via [`GroupRegistry::mark_complete`])
//! when the merge actually succeeded. Keeping the success transition
//! external means a failed transform leaves the group un-promoted and a
//! later event retries it.
//!
//! On restart nothing is replayed: the owning watcher rebuilds the
//! registry by rescanning the artifact directories through the
//! classifier, so recovery is a pure function of on-disk state.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use gale_types::{ArtifactDescriptor, ArtifactKind, GroupKey};

/// The raw kinds a group needs before its merge may run.
pub const REQUIRED_KINDS: [ArtifactKind; 3] = [
    ArtifactKind::PressureA,
    ArtifactKind::PressureB,
    ArtifactKind::Surface,
];

/// Per-group state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupState {
    /// Some but not all required kinds observed.
    Partial(HashSet<ArtifactKind>),
    /// Merge transform has succeeded (or its output already existed).
    Complete,
}

/// What one observation did to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The artifact kind plays no part in grouping (merged/raw files).
    Ignored,
    /// The group is still missing the listed kinds.
    Partial { missing: Vec<ArtifactKind> },
    /// All required kinds are now observed; the caller should attempt the
    /// merge transform.
    ReadyToMerge,
    /// The group already completed; nothing to do.
    AlreadyComplete,
}

/// Explicit keyed registry of group states.
///
/// Created at watcher start, rebuilt from disk on restart, and passed
/// explicitly to whatever reads or writes it.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<GroupKey, GroupState>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classified arrival.
    ///
    /// Duplicate observations are harmless: observing a kind that is
    /// already in the set changes nothing, and a group whose triple is
    /// complete but whose merge has not yet succeeded keeps answering
    /// `ReadyToMerge` so the caller can retry.
    pub fn observe(&mut self, descriptor: &ArtifactDescriptor) -> Observation {
        if !REQUIRED_KINDS.contains(&descriptor.kind) {
            return Observation::Ignored;
        }
        let key = descriptor.group_key();

        match self
            .groups
            .entry(key)
            .or_insert_with(|| GroupState::Partial(HashSet::new()))
        {
            GroupState::Complete => Observation::AlreadyComplete,
            GroupState::Partial(observed) => {
                observed.insert(descriptor.kind);
                let missing: Vec<ArtifactKind> = REQUIRED_KINDS
                    .iter()
                    .filter(|k| !observed.contains(k))
                    .copied()
                    .collect();
                if missing.is_empty() {
                    Observation::ReadyToMerge
                } else {
                    debug!(group = %key, ?missing, "group still partial");
                    Observation::Partial { missing }
                }
            }
        }
    }

    /// Promote a group to `Complete` after its merge succeeded (or its
    /// output was found to already exist).
    pub fn mark_complete(&mut self, key: &GroupKey) {
        self.groups.insert(*key, GroupState::Complete);
    }

    /// Current state of a group, if it has been seen at all.
    pub fn state(&self, key: &GroupKey) -> Option<&GroupState> {
        self.groups.get(key)
    }

    /// Keys currently in the `Complete` state.
    pub fn complete_keys(&self) -> Vec<GroupKey> {
        self.groups
            .iter()
            .filter(|(_, s)| matches!(s, GroupState::Complete))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_types::{ForecastOffset, RunId};

    fn descriptor(kind: ArtifactKind) -> ArtifactDescriptor {
        ArtifactDescriptor {
            run: "2025010106".parse::<RunId>().unwrap(),
            forecast: ForecastOffset::new(3).unwrap(),
            kind,
        }
    }

    #[test]
    fn triple_in_any_order_reaches_ready_exactly_at_third_kind() {
        let mut registry = GroupRegistry::new();

        assert!(matches!(
            registry.observe(&descriptor(ArtifactKind::Surface)),
            Observation::Partial { .. }
        ));
        assert!(matches!(
            registry.observe(&descriptor(ArtifactKind::PressureB)),
            Observation::Partial { .. }
        ));
        assert!(matches!(
            registry.observe(&descriptor(ArtifactKind::PressureA)),
            Observation::ReadyToMerge
        ));
    }

    #[test]
    fn partial_reports_the_exact_missing_kinds() {
        let mut registry = GroupRegistry::new();
        let obs = registry.observe(&descriptor(ArtifactKind::PressureA));
        match obs {
            Observation::Partial { missing } => {
                assert_eq!(
                    missing,
                    vec![ArtifactKind::PressureB, ArtifactKind::Surface]
                );
            }
            other => panic!("unexpected observation: {other:?}"),
        }
    }

    #[test]
    fn duplicates_do_not_advance_the_state() {
        let mut registry = GroupRegistry::new();
        registry.observe(&descriptor(ArtifactKind::PressureA));
        let obs = registry.observe(&descriptor(ArtifactKind::PressureA));
        assert!(matches!(obs, Observation::Partial { missing } if missing.len() == 2));
    }

    #[test]
    fn ready_repeats_until_marked_complete_then_absorbs() {
        let mut registry = GroupRegistry::new();
        registry.observe(&descriptor(ArtifactKind::PressureA));
        registry.observe(&descriptor(ArtifactKind::PressureB));
        assert!(matches!(
            registry.observe(&descriptor(ArtifactKind::Surface)),
            Observation::ReadyToMerge
        ));

        // Merge has not succeeded yet: a duplicate event retries
        assert!(matches!(
            registry.observe(&descriptor(ArtifactKind::Surface)),
            Observation::ReadyToMerge
        ));

        registry.mark_complete(&descriptor(ArtifactKind::Surface).group_key());
        assert!(matches!(
            registry.observe(&descriptor(ArtifactKind::Surface)),
            Observation::AlreadyComplete
        ));
    }

    #[test]
    fn merged_and_raw_kinds_are_ignored() {
        let mut registry = GroupRegistry::new();
        assert_eq!(
            registry.observe(&descriptor(ArtifactKind::Merged)),
            Observation::Ignored
        );
        assert_eq!(
            registry.observe(&descriptor(ArtifactKind::Raw)),
            Observation::Ignored
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn groups_with_different_keys_are_independent() {
        let mut registry = GroupRegistry::new();
        registry.observe(&descriptor(ArtifactKind::PressureA));

        let other = ArtifactDescriptor {
            run: "2025010112".parse::<RunId>().unwrap(),
            forecast: ForecastOffset::new(3).unwrap(),
            kind: ArtifactKind::PressureA,
        };
        assert!(matches!(
            registry.observe(&other),
            Observation::Partial { missing } if missing.len() == 2
        ));
        assert_eq!(registry.len(), 2);
    }
}
