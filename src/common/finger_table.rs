//! Per-peer logarithmic routing shortcuts.

use std::iter::Rev;
use std::slice::Iter;

use crate::common::{Id, Ring};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Finger table of a single peer `n`.
///
/// Entry `i` is the first ring member at or after `(n + 2^i) mod 2^m`, wrapping to the
/// smallest member. Entries repeat when the ring is sparse relative to `m`.
pub struct FingerTable {
    owner: Id,
    entries: Box<[Id]>,
}

impl FingerTable {
    /// Compute the finger table of `owner` on `ring`.
    pub fn build<A>(ring: &Ring<A>, owner: Id) -> FingerTable {
        let space = ring.space();

        let entries = (0..space.bits())
            .map(|i| ring.first_at_or_after(space.finger_target(owner, i)))
            .collect();

        FingerTable { owner, entries }
    }

    // === Getters ===

    /// The peer owning this table.
    pub fn owner(&self) -> Id {
        self.owner
    }

    pub fn entries(&self) -> &[Id] {
        &self.entries
    }

    pub fn entry(&self, i: usize) -> Option<Id> {
        self.entries.get(i).copied()
    }

    /// Entry 0, the immediate successor of the owner.
    pub fn successor(&self) -> Id {
        self.entries[0]
    }

    /// Entry `m - 1`, the farthest shortcut.
    pub fn farthest(&self) -> Id {
        self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from the farthest (`m - 1`) down to the nearest (0).
    pub fn farthest_first(&self) -> Rev<Iter<'_, Id>> {
        self.entries.iter().rev()
    }
}

#[derive(Debug, Clone)]
/// Finger tables of every peer, aligned with the ring's peer order.
pub struct FingerTables {
    ids: Box<[Id]>,
    tables: Box<[FingerTable]>,
}

impl FingerTables {
    /// Compute the finger table of every ring member.
    pub fn build<A>(ring: &Ring<A>) -> FingerTables {
        let tables = ring
            .iter()
            .map(|peer| FingerTable::build(ring, peer.id()))
            .collect();

        FingerTables {
            ids: ring.ids().into(),
            tables,
        }
    }

    /// Returns the finger table of `id`, or [Error::InvalidPeer] if it is not a ring member.
    pub fn get(&self, id: Id) -> Result<&FingerTable> {
        self.ids
            .binary_search(&id)
            .map(|index| &self.tables[index])
            .map_err(|_| Error::InvalidPeer(id))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, FingerTable> {
        self.tables.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::{IdSpace, IdentityHash, RingBuilder};

    fn ring(bits: u32, ids: Vec<u64>) -> Ring<u64> {
        RingBuilder::new(IdSpace::new(bits).unwrap(), IdentityHash)
            .build(ids)
            .unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<Id> {
        raw.iter().map(|&x| Id(x)).collect()
    }

    #[test]
    fn reference_finger_table() {
        let ring = ring(7, vec![32, 45, 80, 96, 112, 144]);
        let tables = FingerTables::build(&ring);

        let table = tables.get(Id(80)).unwrap();
        assert_eq!(table.entries(), ids(&[96, 96, 96, 96, 96, 112, 16]).as_slice());
        assert_eq!(table.owner(), Id(80));
        assert_eq!(table.successor(), Id(96));
        assert_eq!(table.farthest(), Id(16));
    }

    #[test]
    fn other_reference_tables() {
        let ring = ring(7, vec![32, 45, 80, 96, 112, 144]);
        let tables = FingerTables::build(&ring);

        assert_eq!(
            tables.get(Id(16)).unwrap().entries(),
            ids(&[32, 32, 32, 32, 32, 80, 80]).as_slice()
        );
        assert_eq!(
            tables.get(Id(32)).unwrap().entries(),
            ids(&[45, 45, 45, 45, 80, 80, 96]).as_slice()
        );
        // Targets 113..=127 and 16, 48 wrap or land past the top.
        assert_eq!(
            tables.get(Id(112)).unwrap().entries(),
            ids(&[16, 16, 16, 16, 16, 16, 80]).as_slice()
        );
    }

    #[test]
    fn one_table_per_peer() {
        let ring = ring(7, vec![32, 45, 80, 96, 112, 144]);
        let tables = FingerTables::build(&ring);

        assert_eq!(tables.len(), ring.len());
        for table in tables.iter() {
            assert_eq!(table.len(), 7);
        }
    }

    #[test]
    fn non_member() {
        let ring = ring(7, vec![32, 45]);
        let tables = FingerTables::build(&ring);

        assert!(matches!(tables.get(Id(33)), Err(Error::InvalidPeer(Id(33)))));
    }

    #[test]
    fn entries_are_first_member_at_or_after_target() {
        let space = IdSpace::new(10).unwrap();
        let ring = Ring::random(space, 40).unwrap();
        let tables = FingerTables::build(&ring);
        let members = ring.ids();

        for table in tables.iter() {
            let n = table.owner();

            for (i, &entry) in table.entries().iter().enumerate() {
                let target = space.finger_target(n, i as u32);

                assert!(ring.contains_peer(entry));

                // No member lies strictly between the target and the entry.
                let gap = space.distance_forward(target, entry);
                assert!(members
                    .iter()
                    .all(|&other| space.distance_forward(target, other) >= gap));
            }
        }
    }

    #[test]
    fn single_peer_points_to_itself() {
        let ring = ring(5, vec![9]);
        let tables = FingerTables::build(&ring);

        assert_eq!(tables.get(Id(9)).unwrap().entries(), ids(&[9; 5]).as_slice());
    }
}
