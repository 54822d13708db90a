//! Chord ring handle.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    actor::Transport,
    common::{CollisionPolicy, FingerTable, HashFn, Id, Ring, RingBuilder, Sha1Hash},
    config::Config,
    core::{LookupTrace, RemoteLookup, RoutingEngine, RoutingStrategy},
    Result,
};

#[derive(Debug)]
/// Static ring snapshot with its finger tables and a configured [RoutingEngine].
///
/// Cheap to clone, clones share the same immutable snapshot and can serve lookups
/// from different threads.
pub struct Chord<A, H = Sha1Hash> {
    engine: RoutingEngine<A, H>,
    config: Config,
}

impl<A, H: Clone> Clone for Chord<A, H> {
    fn clone(&self) -> Self {
        Chord {
            engine: self.engine.clone(),
            config: self.config.clone(),
        }
    }
}

impl Chord<(), Sha1Hash> {
    /// Returns a builder to edit settings before building the ring.
    pub fn builder() -> ChordBuilder<Sha1Hash> {
        ChordBuilder::default()
    }
}

impl<A, H> Chord<A, H> {
    // === Getters ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &RoutingEngine<A, H> {
        &self.engine
    }

    pub fn ring(&self) -> &Arc<Ring<A>> {
        self.engine.ring()
    }

    // === Public Methods ===

    /// Resolve `key` from `start` with the configured [RoutingStrategy].
    pub fn query<K: ?Sized>(&self, start: Id, key: &K) -> Result<Id>
    where
        H: HashFn<K>,
    {
        self.engine.query(start, key)
    }

    /// Resolve `key` from `start`, recording visited peers into `trace`.
    pub fn query_traced<K: ?Sized>(
        &self,
        start: Id,
        key: &K,
        trace: &mut LookupTrace,
    ) -> Result<Id>
    where
        H: HashFn<K>,
    {
        self.engine.query_traced(start, key, trace)
    }

    /// The peer responsible for `key`.
    pub fn responsible<K: ?Sized>(&self, key: &K) -> Id
    where
        H: HashFn<K>,
    {
        self.engine.responsible(key)
    }

    pub fn contains<K: ?Sized>(&self, node: Id, key: &K) -> bool
    where
        H: HashFn<K>,
    {
        self.engine.contains(node, key)
    }

    pub fn successor(&self, node: Id) -> Result<Id> {
        self.engine.successor(node)
    }

    pub fn finger_table(&self, node: Id) -> Result<&FingerTable> {
        self.engine.finger_table(node)
    }

    pub fn trace_path(&self, start: Id, target: Id) -> Result<LookupTrace> {
        self.engine.trace_path(start, target)
    }

    /// A finger-jump lookup over `transport`, using the configured hop timeout and
    /// successor fallbacks.
    pub fn remote_lookup<'a, T: Transport + ?Sized>(
        &'a self,
        transport: &'a T,
    ) -> RemoteLookup<'a, A, H, T> {
        RemoteLookup::new(&self.engine, transport)
            .with_hop_timeout(self.config.hop_timeout)
            .with_successor_fallbacks(self.config.successor_fallbacks)
    }
}

#[derive(Debug, Clone)]
/// Chord settings builder
pub struct ChordBuilder<H> {
    config: Config,
    hasher: H,
}

impl Default for ChordBuilder<Sha1Hash> {
    fn default() -> Self {
        ChordBuilder {
            config: Config::default(),
            hasher: Sha1Hash,
        }
    }
}

impl<H> ChordBuilder<H> {
    /// Replace all settings at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the bit width `m` of the identifier space.
    pub fn bits(mut self, bits: u32) -> Self {
        self.config.bits = bits;
        self
    }

    pub fn strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    /// Set the maximum hops of a single lookup, defaults to `2 * bits + 1`.
    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.config.max_hops = Some(max_hops);
        self
    }

    pub fn hop_timeout(mut self, hop_timeout: Duration) -> Self {
        self.config.hop_timeout = hop_timeout;
        self
    }

    pub fn successor_fallbacks(mut self, successor_fallbacks: usize) -> Self {
        self.config.successor_fallbacks = successor_fallbacks;
        self
    }

    /// Replace the hash function used for peer addresses and lookup keys.
    pub fn hasher<H2>(self, hasher: H2) -> ChordBuilder<H2> {
        ChordBuilder {
            config: self.config,
            hasher,
        }
    }

    /// Build the ring from `addresses` and derive the finger tables.
    pub fn build<A, I>(self, addresses: I) -> Result<Chord<A, H>>
    where
        I: IntoIterator<Item = A>,
        A: PartialEq + Debug,
        H: HashFn<A>,
    {
        let hasher = &self.hasher;
        let ring = RingBuilder::new(self.config.space()?, |address: &A| hasher.hash(address))
            .collision_policy(self.config.collision_policy)
            .build(addresses)?;

        let engine = RoutingEngine::new(ring, self.hasher)
            .with_strategy(self.config.strategy)
            .with_hop_limit(self.config.hop_limit());

        Ok(Chord {
            engine,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;
    use crate::common::IdentityHash;
    use crate::Error;

    #[test]
    fn reference_scenario() {
        let chord = Chord::builder()
            .bits(7)
            .hasher(IdentityHash)
            .strategy(RoutingStrategy::FingerJump)
            .build(vec![32u64, 45, 80, 96, 112, 128 + 16])
            .unwrap();

        assert_eq!(chord.successor(Id(112)).unwrap(), Id(16));
        assert_eq!(chord.query(Id(80), &42u64).unwrap(), Id(45));
        assert!(chord.contains(Id(45), &42u64));
    }

    #[test]
    fn default_hasher_with_string_addresses() {
        let chord = Chord::builder()
            .bits(16)
            .build(vec!["a:1", "b:2", "c:3", "d:4"])
            .unwrap();

        let start = chord.ring().first();
        let responsible = chord.query(start, "key").unwrap();

        assert_eq!(responsible, chord.responsible("key"));
        assert!(chord.contains(responsible, "key"));
    }

    #[test]
    fn invalid_bits() {
        let result = Chord::builder()
            .bits(0)
            .hasher(IdentityHash)
            .build(vec![1u64]);

        assert!(matches!(result, Err(Error::InvalidBitWidth(0))));
    }

    #[test]
    fn max_hops_is_applied() {
        let chord = Chord::builder()
            .bits(7)
            .max_hops(3)
            .hasher(IdentityHash)
            .build(vec![1u64])
            .unwrap();

        assert_eq!(chord.engine().hop_limit(), 3);
    }

    #[test]
    fn clones_share_the_snapshot() {
        let chord = Chord::builder()
            .bits(12)
            .hasher(IdentityHash)
            .build((0..100u64).map(|i| i * 37))
            .unwrap();

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let chord = chord.clone();
                thread::spawn(move || {
                    let start = chord.ring().first();
                    (0..1000u64)
                        .map(|k| k * 4 + t)
                        .all(|k| chord.contains(chord.query(start, &k).unwrap(), &k))
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(Arc::ptr_eq(chord.ring(), chord.clone().ring()));
    }
}
