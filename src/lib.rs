//! Static Chord ring: consistent hashing of peers onto an identifier ring, per-peer
//! finger tables, and lookups resolving a key to its responsible peer while recording
//! the hop path.
//!
//! ```
//! use chord::{Chord, Id, IdentityHash, LookupTrace, RoutingStrategy};
//!
//! let chord = Chord::builder()
//!     .bits(7)
//!     .hasher(IdentityHash)
//!     .strategy(RoutingStrategy::FingerJump)
//!     .build(vec![32u64, 45, 80, 96, 112, 144])
//!     .unwrap();
//!
//! let mut trace = LookupTrace::new();
//! assert_eq!(chord.query_traced(Id(80), &42u64, &mut trace).unwrap(), Id(45));
//! assert_eq!(trace.hops(), &[Id(16), Id(32), Id(45)]);
//! ```
//!
//! The ring is built once and never mutated, membership changes, failure detection and
//! replication are left to other components. Lookups where every hop is a remote call
//! go through [RemoteLookup] and a [Transport].

mod actor;
mod chord;
mod common;
mod config;
mod core;
mod error;

pub use crate::actor::{ChannelTransport, LocalTransport, Transport};
pub use crate::chord::{Chord, ChordBuilder};
pub use crate::common::{
    CollisionPolicy, Crc32Hash, FingerTable, FingerTables, HashFn, Id, IdSpace, IdentityHash,
    Peer, Ring, RingBuilder, Sha1Hash, MAX_BITS,
};
pub use crate::config::{Config, DEFAULT_BITS, DEFAULT_HOP_TIMEOUT, DEFAULT_SUCCESSOR_FALLBACKS};
pub use crate::core::{CancellationToken, LookupTrace, RemoteLookup, RoutingEngine, RoutingStrategy};
pub use crate::error::{Error, HopError};

/// Alias `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
