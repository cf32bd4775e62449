// ── Assignment snapshot ──
//
// Immutable slot → officers mapping. Every change produces a new
// snapshot; nothing patches one in place.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::model::{AssignmentRecord, OfficerId, SlotName};

/// The store's view of who is assigned where.
///
/// Every configured slot is present, in configured order, even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct AssignmentSnapshot {
    slots: IndexMap<SlotName, Vec<OfficerId>>,
}

impl AssignmentSnapshot {
    /// A snapshot with every slot materialized and empty.
    pub fn empty(slots: &[SlotName]) -> Self {
        Self {
            slots: slots.iter().map(|s| (s.clone(), Vec::new())).collect(),
        }
    }

    /// Group persisted rows by slot.
    ///
    /// Rows naming a slot outside `slots` are skipped. If the backend
    /// reports an officer more than once, the first row wins.
    pub fn from_records(slots: &[SlotName], records: impl IntoIterator<Item = AssignmentRecord>) -> Self {
        let mut snapshot = Self::empty(slots);
        for record in records {
            if snapshot.slot_of(&record.officer_id).is_some() {
                warn!(officer = %record.officer_id, slot = %record.slot_name, "officer listed in more than one slot, keeping first");
                continue;
            }
            match snapshot.slots.get_mut(&record.slot_name) {
                Some(officers) => officers.push(record.officer_id),
                None => {
                    warn!(officer = %record.officer_id, slot = %record.slot_name, "row for unknown slot skipped");
                }
            }
        }
        snapshot
    }

    /// Officers in `slot`, in assignment order.
    pub fn slot(&self, slot: &SlotName) -> Option<&[OfficerId]> {
        self.slots.get(slot).map(Vec::as_slice)
    }

    /// The slot currently holding `officer`, if any.
    pub fn slot_of(&self, officer: &OfficerId) -> Option<&SlotName> {
        self.slots
            .iter()
            .find(|(_, officers)| officers.contains(officer))
            .map(|(slot, _)| slot)
    }

    /// How many slots list `officer`. Reconciled snapshots never exceed one.
    pub fn occurrences(&self, officer: &OfficerId) -> usize {
        self.slots
            .values()
            .map(|officers| officers.iter().filter(|o| *o == officer).count())
            .sum()
    }

    pub fn contains(&self, officer: &OfficerId) -> bool {
        self.slot_of(officer).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotName, &[OfficerId])> {
        self.slots.iter().map(|(slot, officers)| (slot, officers.as_slice()))
    }

    /// Per-slot head count, in slot order.
    pub fn counts(&self) -> IndexMap<SlotName, usize> {
        self.slots
            .iter()
            .map(|(slot, officers)| (slot.clone(), officers.len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &SlotName> {
        self.slots.keys()
    }

    /// Copy with `officer` moved to the end of `target`.
    pub(crate) fn with_assignment(&self, officer: &OfficerId, target: &SlotName) -> Self {
        let mut next = self.without(officer);
        if let Some(officers) = next.slots.get_mut(target) {
            officers.push(officer.clone());
        }
        next
    }

    /// Copy with `officer` removed from every slot.
    pub(crate) fn without(&self, officer: &OfficerId) -> Self {
        let mut next = self.clone();
        for officers in next.slots.values_mut() {
            officers.retain(|o| o != officer);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn slots() -> Vec<SlotName> {
        ["Unassigned", "Patrol", "Traffic"]
            .into_iter()
            .map(SlotName::from)
            .collect()
    }

    #[test]
    fn empty_slots_are_materialized() {
        let snap = AssignmentSnapshot::from_records(&slots(), [AssignmentRecord::new("Patrol", "O1")]);
        assert_eq!(snap.slot(&"Unassigned".into()), Some(&[][..]));
        assert_eq!(snap.slot(&"Traffic".into()), Some(&[][..]));
        assert_eq!(snap.slot(&"Patrol".into()), Some(&["O1".into()][..]));
        assert_eq!(
            snap.slot_names().map(SlotName::as_str).collect::<Vec<_>>(),
            ["Unassigned", "Patrol", "Traffic"]
        );
    }

    #[test]
    fn unknown_slots_and_duplicates_are_skipped() {
        let snap = AssignmentSnapshot::from_records(
            &slots(),
            [
                AssignmentRecord::new("Patrol", "O1"),
                AssignmentRecord::new("Harbor", "O2"),
                AssignmentRecord::new("Traffic", "O1"),
            ],
        );
        assert_eq!(snap.slot_of(&"O1".into()), Some(&"Patrol".into()));
        assert!(!snap.contains(&"O2".into()));
        assert_eq!(snap.total(), 1);
    }

    #[test]
    fn with_assignment_moves_officer_to_end_of_target() {
        let snap = AssignmentSnapshot::from_records(
            &slots(),
            [
                AssignmentRecord::new("Unassigned", "O1"),
                AssignmentRecord::new("Patrol", "O2"),
            ],
        );
        let moved = snap.with_assignment(&"O1".into(), &"Patrol".into());

        assert_eq!(moved.slot(&"Unassigned".into()), Some(&[][..]));
        assert_eq!(moved.slot(&"Patrol".into()), Some(&["O2".into(), "O1".into()][..]));
        assert_eq!(moved.occurrences(&"O1".into()), 1);
        // The original is untouched.
        assert_eq!(snap.slot_of(&"O1".into()), Some(&"Unassigned".into()));
    }

    #[test]
    fn without_is_idempotent() {
        let snap = AssignmentSnapshot::from_records(&slots(), [AssignmentRecord::new("Traffic", "O3")]);
        let once = snap.without(&"O3".into());
        assert_eq!(once.without(&"O3".into()), once);
        assert_eq!(once.total(), 0);
    }

    #[test]
    fn counts_follow_slot_order() {
        let snap = AssignmentSnapshot::from_records(
            &slots(),
            [
                AssignmentRecord::new("Traffic", "O1"),
                AssignmentRecord::new("Traffic", "O2"),
            ],
        );
        let counts: Vec<(String, usize)> = snap
            .counts()
            .into_iter()
            .map(|(slot, n)| (slot.to_string(), n))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("Unassigned".to_owned(), 0),
                ("Patrol".to_owned(), 0),
                ("Traffic".to_owned(), 2)
            ]
        );
    }

    #[test]
    fn serializes_as_slot_map() {
        let snap = AssignmentSnapshot::from_records(&slots(), [AssignmentRecord::new("Patrol", "O1")]);
        let json = serde_json::to_string(&snap).unwrap_or_default();
        assert_eq!(json, r#"{"Unassigned":[],"Patrol":["O1"],"Traffic":[]}"#);
    }
}
