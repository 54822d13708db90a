//! Key to responsible-peer resolution over an immutable ring snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::{FingerTable, FingerTables, HashFn, Id, IdSpace, Ring};
use crate::core::LookupTrace;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lookup algorithm used by [RoutingEngine::query].
///
/// The two strategies agree on most keys but their hop traces differ on sparse rings,
/// and they disagree on which peer is responsible for keys at or below the first peer,
/// equal to a peer reached through a finger, or above the last peer.
pub enum RoutingStrategy {
    /// Iterative crawl over finger tables.
    ///
    /// At each peer, the fingers are scanned from the farthest to the nearest and the first
    /// entry `<= key` is taken, comparing identifiers as plain integers (not along the ring).
    /// If no entry qualifies, the successor of the current peer is the answer. If the
    /// selected entry is the current peer, the current peer is the answer.
    ///
    /// The trace excludes the starting peer. Keys wrapping past the top of the ring can make
    /// the crawl revisit a peer, which fails the lookup with [Error::RoutingLoop].
    FingerJump,
    /// Authoritative binary search for the first peer `>=` key (wrapping), plus a
    /// reconstructed hop path from the starting peer, see [RoutingEngine::trace_path].
    ///
    /// The trace includes the starting peer. A path longer than the hop limit is cut short
    /// without failing the lookup.
    #[default]
    DirectMembership,
}

/// Outcome of evaluating one finger-jump step at a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FingerStep {
    /// The current peer selected itself, it is responsible.
    Resolved,
    /// No finger qualified, the successor is responsible.
    Successor(Id),
    /// Continue from this finger entry.
    Forward(Id),
}

/// Resolves keys to responsible peers over a shared, immutable ring and its finger tables.
///
/// Cheap to clone, concurrent lookups on clones share the same snapshot.
#[derive(Debug)]
pub struct RoutingEngine<A, H> {
    ring: Arc<Ring<A>>,
    fingers: Arc<FingerTables>,
    hasher: H,
    strategy: RoutingStrategy,
    hop_limit: usize,
}

impl<A, H: Clone> Clone for RoutingEngine<A, H> {
    fn clone(&self) -> Self {
        RoutingEngine {
            ring: self.ring.clone(),
            fingers: self.fingers.clone(),
            hasher: self.hasher.clone(),
            strategy: self.strategy,
            hop_limit: self.hop_limit,
        }
    }
}

impl<A, H> RoutingEngine<A, H> {
    /// Creates an engine over a ring, computing its finger tables.
    pub fn new(ring: Ring<A>, hasher: H) -> Self {
        let fingers = FingerTables::build(&ring);

        Self::from_parts(Arc::new(ring), Arc::new(fingers), hasher)
    }

    /// Creates an engine from an already shared snapshot.
    ///
    /// `fingers` must have been built from `ring`.
    pub fn from_parts(ring: Arc<Ring<A>>, fingers: Arc<FingerTables>, hasher: H) -> Self {
        let hop_limit = 2 * ring.space().bits() as usize + 1;

        RoutingEngine {
            ring,
            fingers,
            hasher,
            strategy: RoutingStrategy::default(),
            hop_limit,
        }
    }

    // === Options ===

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_hop_limit(mut self, hop_limit: usize) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    // === Getters ===

    pub fn ring(&self) -> &Arc<Ring<A>> {
        &self.ring
    }

    pub fn fingers(&self) -> &Arc<FingerTables> {
        &self.fingers
    }

    pub fn space(&self) -> IdSpace {
        self.ring.space()
    }

    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    pub fn hop_limit(&self) -> usize {
        self.hop_limit
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    // === Public Methods ===

    /// Hash `key` into the identifier space.
    pub fn hash_key<K: ?Sized>(&self, key: &K) -> Id
    where
        H: HashFn<K>,
    {
        self.space().reduce(self.hasher.hash(key))
    }

    /// Next peer clockwise from `node`, [Error::InvalidPeer] if `node` is not on the ring.
    pub fn successor(&self, node: Id) -> Result<Id> {
        self.ring.successor(node)
    }

    /// Finger table of `node`, [Error::InvalidPeer] if `node` is not on the ring.
    pub fn finger_table(&self, node: Id) -> Result<&FingerTable> {
        self.fingers.get(node)
    }

    /// The peer responsible for `key`: the first peer `>=` its hash, wrapping.
    pub fn responsible<K: ?Sized>(&self, key: &K) -> Id
    where
        H: HashFn<K>,
    {
        self.responsible_id(self.hash_key(key))
    }

    /// Same as [Self::responsible] for an already hashed key.
    pub fn responsible_id(&self, key: Id) -> Id {
        self.ring.first_at_or_after(self.space().reduce(key.value()))
    }

    /// Returns `true` if `node` is the peer responsible for `key`.
    pub fn contains<K: ?Sized>(&self, node: Id, key: &K) -> bool
    where
        H: HashFn<K>,
    {
        self.contains_id(node, self.hash_key(key))
    }

    /// Same as [Self::contains] for an already hashed key.
    pub fn contains_id(&self, node: Id, key: Id) -> bool {
        self.responsible_id(key) == node
    }

    /// Resolve `key` starting at `start` with the configured [RoutingStrategy].
    pub fn query<K: ?Sized>(&self, start: Id, key: &K) -> Result<Id>
    where
        H: HashFn<K>,
    {
        self.resolve(start, self.hash_key(key), None)
    }

    /// Same as [Self::query], appending every visited peer to `trace`.
    pub fn query_traced<K: ?Sized>(
        &self,
        start: Id,
        key: &K,
        trace: &mut LookupTrace,
    ) -> Result<Id>
    where
        H: HashFn<K>,
    {
        self.resolve(start, self.hash_key(key), Some(trace))
    }

    /// Same as [Self::query] for an already hashed key, the key is not hashed again.
    pub fn query_id(&self, start: Id, key: Id) -> Result<Id> {
        self.resolve(start, self.space().reduce(key.value()), None)
    }

    /// Same as [Self::query_traced] for an already hashed key.
    pub fn query_id_traced(&self, start: Id, key: Id, trace: &mut LookupTrace) -> Result<Id> {
        self.resolve(start, self.space().reduce(key.value()), Some(trace))
    }

    /// Reconstruct a hop path from `start` to `target`, both included.
    ///
    /// From each peer, jump to the finger entry farthest along the ring that does not pass
    /// `target`, until `target` is reached. Falls back to the farthest finger if no entry
    /// qualifies. Every jump strictly shortens the remaining distance, so paths take
    /// `O(log N)` hops on well-formed tables.
    ///
    /// Returns [Error::HopLimitExceeded] if the path needs more than the hop limit.
    pub fn trace_path(&self, start: Id, target: Id) -> Result<LookupTrace> {
        let mut trace = LookupTrace::new();
        self.walk_path(start, target, &mut trace)?;

        Ok(trace)
    }

    // === Private Methods ===

    fn resolve(&self, start: Id, key: Id, trace: Option<&mut LookupTrace>) -> Result<Id> {
        let responsible = match self.strategy {
            RoutingStrategy::FingerJump => self.finger_jump(start, key, trace),
            RoutingStrategy::DirectMembership => self.direct(start, key, trace),
        }?;

        debug!(?start, ?key, ?responsible, strategy = ?self.strategy, "Lookup done");

        Ok(responsible)
    }

    fn direct(&self, start: Id, key: Id, trace: Option<&mut LookupTrace>) -> Result<Id> {
        if !self.ring.contains_peer(start) {
            return Err(Error::InvalidPeer(start));
        }

        let responsible = self.responsible_id(key);

        if let Some(trace) = trace {
            // The answer is already known, a path over the hop limit is only cut short.
            match self.walk_path(start, responsible, trace) {
                Err(Error::HopLimitExceeded { limit }) => {
                    debug!(?start, ?responsible, limit, "Hop path truncated");
                }
                result => result?,
            }
        }

        Ok(responsible)
    }

    /// Append the path from `start` to `target` to `trace`, stopping at the hop limit.
    fn walk_path(&self, start: Id, target: Id, trace: &mut LookupTrace) -> Result<()> {
        if !self.ring.contains_peer(target) {
            return Err(Error::InvalidPeer(target));
        }

        let space = self.space();
        let mut current = start;
        let mut table = self.fingers.get(current)?;
        let mut hops = 0;
        trace.push(current);

        while current != target {
            if hops >= self.hop_limit {
                return Err(Error::HopLimitExceeded {
                    limit: self.hop_limit,
                });
            }

            let remaining = space.distance_forward(current, target);
            let next = table
                .farthest_first()
                .copied()
                .find(|&entry| {
                    let jump = space.distance_forward(current, entry);
                    jump != 0 && jump <= remaining
                })
                .unwrap_or_else(|| table.farthest());

            trace!(?current, ?next, ?target, "Path hop");

            current = next;
            table = self.fingers.get(current)?;
            hops += 1;
            trace.push(current);
        }

        Ok(())
    }

    fn finger_jump(
        &self,
        start: Id,
        key: Id,
        mut trace: Option<&mut LookupTrace>,
    ) -> Result<Id> {
        let mut visited = HashSet::new();
        let mut current = start;
        visited.insert(current);

        loop {
            match self.finger_step(current, key)? {
                FingerStep::Resolved => return Ok(current),
                FingerStep::Successor(successor) => {
                    trace!(?current, ?successor, ?key, "Resolved at successor");

                    if let Some(trace) = trace.as_deref_mut() {
                        trace.push(successor);
                    }

                    return Ok(successor);
                }
                FingerStep::Forward(next) => {
                    if !visited.insert(next) {
                        return Err(Error::RoutingLoop { at: next, key });
                    }
                    if visited.len() > self.hop_limit {
                        return Err(Error::HopLimitExceeded {
                            limit: self.hop_limit,
                        });
                    }

                    trace!(?current, ?next, ?key, "Finger hop");

                    if let Some(trace) = trace.as_deref_mut() {
                        trace.push(next);
                    }

                    current = next;
                }
            }
        }
    }

    /// Evaluate a single finger-jump step for `key` at `current`.
    pub(crate) fn finger_step(&self, current: Id, key: Id) -> Result<FingerStep> {
        let table = self.fingers.get(current)?;

        Ok(match admissible_fingers(table, key).next() {
            None => FingerStep::Successor(self.ring.successor(current)?),
            Some(entry) if entry == current => FingerStep::Resolved,
            Some(entry) => FingerStep::Forward(entry),
        })
    }
}

/// Finger entries `<= key` (plain integer order), farthest first, without repeats.
pub(crate) fn admissible_fingers(table: &FingerTable, key: Id) -> impl Iterator<Item = Id> + '_ {
    let mut last = None;

    table
        .farthest_first()
        .copied()
        .filter(move |&entry| entry <= key)
        .filter(move |&entry| {
            let repeat = last == Some(entry);
            last = Some(entry);
            !repeat
        })
}
