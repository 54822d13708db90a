//! Hop trace accumulated while resolving a lookup.

use std::slice::Iter;

use serde::{Deserialize, Serialize};

use crate::common::Id;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Peers visited during a lookup, in visitation order.
///
/// Whether the initiating peer is included depends on the routing strategy, see
/// [crate::RoutingStrategy]. The last entry is the peer declared responsible.
pub struct LookupTrace {
    hops: Vec<Id>,
}

impl LookupTrace {
    pub fn new() -> Self {
        Self::default()
    }

    // === Getters ===

    pub fn hops(&self) -> &[Id] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// The last visited peer, the responsible one once a lookup is done.
    pub fn last(&self) -> Option<Id> {
        self.hops.last().copied()
    }

    pub fn iter(&self) -> Iter<'_, Id> {
        self.hops.iter()
    }

    // === Public Methods ===

    pub fn push(&mut self, id: Id) {
        self.hops.push(id)
    }

    pub fn clear(&mut self) {
        self.hops.clear()
    }

    pub fn into_vec(self) -> Vec<Id> {
        self.hops
    }
}

impl<'a> IntoIterator for &'a LookupTrace {
    type Item = &'a Id;
    type IntoIter = Iter<'a, Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Vec<Id>> for LookupTrace {
    fn from(hops: Vec<Id>) -> Self {
        LookupTrace { hops }
    }
}
