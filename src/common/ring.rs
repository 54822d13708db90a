//! Sorted, circular sequence of peers and its construction from raw addresses.

use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt::Debug;
use std::slice::Iter;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::{HashFn, Id, IdSpace, Peer};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What to do when two distinct addresses reduce to the same identifier.
///
/// Repeated occurrences of the *same* address always collapse silently.
pub enum CollisionPolicy {
    /// Keep the first address seen for an identifier and drop the later ones.
    #[default]
    Merge,
    /// Fail construction with [Error::DuplicateIdentifier].
    Reject,
}

/// Builds a [Ring] by hashing addresses into an [IdSpace].
#[derive(Debug, Clone)]
pub struct RingBuilder<H> {
    space: IdSpace,
    hasher: H,
    collision_policy: CollisionPolicy,
}

impl<H> RingBuilder<H> {
    pub fn new(space: IdSpace, hasher: H) -> Self {
        RingBuilder {
            space,
            hasher,
            collision_policy: CollisionPolicy::default(),
        }
    }

    // === Options ===

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    // === Public Methods ===

    /// Hash, reduce, deduplicate and sort `addresses` into a ring.
    pub fn build<A, I>(&self, addresses: I) -> Result<Ring<A>>
    where
        I: IntoIterator<Item = A>,
        A: PartialEq + Debug,
        H: HashFn<A>,
    {
        let mut peers: BTreeMap<Id, A> = BTreeMap::new();

        for address in addresses {
            let id = self.space.reduce(self.hasher.hash(&address));

            match peers.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(address);
                }
                Entry::Occupied(existing) => {
                    if existing.get() == &address {
                        continue;
                    }

                    match self.collision_policy {
                        CollisionPolicy::Merge => {
                            warn!(
                                ?id,
                                existing = ?existing.get(),
                                dropped = ?address,
                                "Identifier collision, dropping peer"
                            );
                        }
                        CollisionPolicy::Reject => {
                            return Err(Error::DuplicateIdentifier {
                                id,
                                existing: format!("{:?}", existing.get()),
                                rejected: format!("{:?}", address),
                            });
                        }
                    }
                }
            }
        }

        if peers.is_empty() {
            return Err(Error::EmptyRing);
        }

        let peers: Vec<_> = peers
            .into_iter()
            .map(|(id, address)| Peer::new(id, address))
            .collect();

        debug!(space = ?self.space, size = peers.len(), "Built ring");

        Ok(Ring {
            space: self.space,
            peers,
        })
    }
}

#[derive(Debug, Clone)]
/// Peers sorted by strictly ascending identifier, with wraparound successor semantics.
///
/// Never empty. Immutable once built.
pub struct Ring<A> {
    space: IdSpace,
    peers: Vec<Peer<A>>,
}

impl<A> Ring<A> {
    // === Getters ===

    /// Returns the identifier space of this ring.
    pub fn space(&self) -> IdSpace {
        self.space
    }

    /// Number of peers on the ring.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Always `false`, building an empty ring fails with [Error::EmptyRing].
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Returns an iterator over the peers in ascending identifier order.
    pub fn iter(&self) -> Iter<'_, Peer<A>> {
        self.peers.iter()
    }

    /// Export an owned vector of the ring's identifiers, ascending.
    pub fn ids(&self) -> Vec<Id> {
        self.peers.iter().map(|peer| peer.id()).collect()
    }

    /// Smallest identifier on the ring.
    pub fn first(&self) -> Id {
        self.peers[0].id()
    }

    /// Largest identifier on the ring.
    pub fn last(&self) -> Id {
        self.peers[self.peers.len() - 1].id()
    }

    /// Index of `id` on the ring, if it is a member.
    pub fn position(&self, id: Id) -> Option<usize> {
        self.peers.binary_search_by_key(&id, |peer| peer.id()).ok()
    }

    /// Returns `true` if `id` is a ring member.
    pub fn contains_peer(&self, id: Id) -> bool {
        self.position(id).is_some()
    }

    /// Returns the peer with identifier `id`, if it is a member.
    pub fn peer(&self, id: Id) -> Option<&Peer<A>> {
        self.position(id).map(|i| &self.peers[i])
    }

    // === Public Methods ===

    /// Next member clockwise from the member `id`.
    ///
    /// Returns [Error::InvalidPeer] if `id` is not on the ring, see [Ring::first_after] for
    /// the generalized form.
    pub fn successor(&self, id: Id) -> Result<Id> {
        let index = self.position(id).ok_or(Error::InvalidPeer(id))?;

        Ok(self.peers[(index + 1) % self.peers.len()].id())
    }

    /// Smallest member strictly greater than `id`, wrapping to the first member.
    pub fn first_after(&self, id: Id) -> Id {
        let index = self.peers.partition_point(|peer| peer.id() <= id);
        self.wrapped(index)
    }

    /// Smallest member `>= target`, wrapping to the first member.
    ///
    /// This is the peer responsible for `target`.
    pub fn first_at_or_after(&self, target: Id) -> Id {
        let index = self.peers.partition_point(|peer| peer.id() < target);
        self.wrapped(index)
    }

    // === Private Methods ===

    fn wrapped(&self, index: usize) -> Id {
        self.peers.get(index).unwrap_or(&self.peers[0]).id()
    }
}

impl Ring<Id> {
    #[doc(hidden)]
    /// Convenience function for generating rings of random identifiers in tests and benches.
    ///
    /// The ring may hold fewer than `size` peers if random identifiers collide.
    pub fn random(space: IdSpace, size: usize) -> Result<Ring<Id>> {
        let ids: Vec<Id> = (0..size).map(|_| space.random_id()).collect();

        RingBuilder::new(space, |id: &Id| id.value()).build(ids)
    }
}

impl<'a, A> IntoIterator for &'a Ring<A> {
    type Item = &'a Peer<A>;
    type IntoIter = Iter<'a, Peer<A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::{IdentityHash, Sha1Hash};

    fn reference_ring() -> Ring<u64> {
        let space = IdSpace::new(7).unwrap();
        RingBuilder::new(space, IdentityHash)
            .build(vec![32, 45, 80, 96, 112, 128 + 16])
            .unwrap()
    }

    #[test]
    fn peers_are_sorted_and_reduced() {
        let ring = reference_ring();

        assert_eq!(
            ring.ids(),
            vec![Id(16), Id(32), Id(45), Id(80), Id(96), Id(112)]
        );
        assert_eq!(ring.peer(Id(16)).unwrap().address(), &144);
    }

    #[test]
    fn empty_ring() {
        let space = IdSpace::new(7).unwrap();
        let result = RingBuilder::new(space, IdentityHash).build(Vec::<u64>::new());

        assert!(matches!(result, Err(Error::EmptyRing)));
    }

    #[test]
    fn same_address_collapses() {
        let space = IdSpace::new(7).unwrap();
        let ring = RingBuilder::new(space, IdentityHash)
            .collision_policy(CollisionPolicy::Reject)
            .build(vec![32u64, 32, 45])
            .unwrap();

        assert_eq!(ring.ids(), vec![Id(32), Id(45)]);
    }

    #[test]
    fn merge_keeps_first_address() {
        let space = IdSpace::new(7).unwrap();
        let ring = RingBuilder::new(space, IdentityHash)
            .build(vec![16u64, 144, 45])
            .unwrap();

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.peer(Id(16)).unwrap().address(), &16);
    }

    #[test]
    fn reject_distinct_collision() {
        let space = IdSpace::new(7).unwrap();
        let result = RingBuilder::new(space, IdentityHash)
            .collision_policy(CollisionPolicy::Reject)
            .build(vec![16u64, 144]);

        match result {
            Err(Error::DuplicateIdentifier {
                id,
                existing,
                rejected,
            }) => {
                assert_eq!(id, Id(16));
                assert_eq!(existing, "16");
                assert_eq!(rejected, "144");
            }
            other => panic!("expected DuplicateIdentifier, got {:?}", other.map(|r| r.ids())),
        }
    }

    #[test]
    fn successor() {
        let ring = reference_ring();

        assert_eq!(ring.successor(Id(32)).unwrap(), Id(45));
        assert_eq!(ring.successor(Id(45)).unwrap(), Id(80));
        assert_eq!(ring.successor(Id(80)).unwrap(), Id(96));
        assert_eq!(ring.successor(Id(112)).unwrap(), Id(16));
    }

    #[test]
    fn successor_of_non_member() {
        let ring = reference_ring();

        assert!(matches!(ring.successor(Id(33)), Err(Error::InvalidPeer(Id(33)))));
    }

    #[test]
    fn successor_wraps_in_nine_bit_space() {
        let space = IdSpace::new(9).unwrap();
        let ring = RingBuilder::new(space, IdentityHash)
            .build(vec![1u64, 12, 123, 234, 345, 456, 501])
            .unwrap();

        assert_eq!(ring.successor(Id(501)).unwrap(), Id(1));
        assert_eq!(ring.successor(Id(1)).unwrap(), Id(12));
    }

    #[test]
    fn first_after() {
        let ring = reference_ring();

        assert_eq!(ring.first_after(Id(32)), Id(45));
        assert_eq!(ring.first_after(Id(33)), Id(45));
        assert_eq!(ring.first_after(Id(0)), Id(16));
        assert_eq!(ring.first_after(Id(112)), Id(16));
        assert_eq!(ring.first_after(Id(127)), Id(16));
    }

    #[test]
    fn first_at_or_after() {
        let ring = reference_ring();

        // Boundary: a member is responsible for its own identifier.
        assert_eq!(ring.first_at_or_after(Id(45)), Id(45));
        assert_eq!(ring.first_at_or_after(Id(42)), Id(45));
        assert_eq!(ring.first_at_or_after(Id(0)), Id(16));
        // Wraparound past the largest member.
        assert_eq!(ring.first_at_or_after(Id(113)), Id(16));
    }

    #[test]
    fn single_peer_ring() {
        let space = IdSpace::new(4).unwrap();
        let ring = RingBuilder::new(space, IdentityHash).build(vec![5u64]).unwrap();

        assert_eq!(ring.successor(Id(5)).unwrap(), Id(5));
        assert_eq!(ring.first_at_or_after(Id(15)), Id(5));
        assert_eq!(ring.first_after(Id(5)), Id(5));
    }

    #[test]
    fn string_addresses() {
        let space = IdSpace::new(16).unwrap();
        let ring = RingBuilder::new(space, Sha1Hash)
            .build(vec!["10.0.0.1:4000", "10.0.0.2:4000", "10.0.0.3:4000"])
            .unwrap();

        assert_eq!(ring.len(), 3);
        for peer in &ring {
            assert_eq!(peer.id(), space.reduce(Sha1Hash.hash(*peer.address())));
        }
    }

    #[test]
    fn random_ring_is_strictly_ascending() {
        let space = IdSpace::new(12).unwrap();
        let ring = Ring::random(space, 200).unwrap();

        assert!(ring.ids().windows(2).all(|pair| pair[0] < pair[1]));
    }
}
