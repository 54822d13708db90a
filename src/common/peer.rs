//! A ring member: an opaque address and the identifier derived from it.

use crate::common::Id;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Peer entry on the ring.
pub struct Peer<A> {
    id: Id,
    address: A,
}

impl<A> Peer<A> {
    /// Creates a new Peer from an id and an address.
    pub fn new(id: Id, address: A) -> Peer<A> {
        Peer { id, address }
    }

    // === Getters ===

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn address(&self) -> &A {
        &self.address
    }
}
