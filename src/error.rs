//! Main Crate Error

use crate::common::Id;

#[derive(thiserror::Error, Debug)]
/// Chord crate error enum.
pub enum Error {
    /// The node is not a member of the ring.
    #[error("Peer {0} is not a member of the ring")]
    InvalidPeer(Id),

    /// A ring was built from zero addresses, no node can ever be responsible for a key.
    #[error("Ring has no peers")]
    EmptyRing,

    /// Two distinct addresses reduced to the same identifier under
    /// [CollisionPolicy::Reject](crate::CollisionPolicy::Reject).
    #[error("Identifier {id} already taken by {existing}, rejecting {rejected}")]
    DuplicateIdentifier {
        id: Id,
        existing: String,
        rejected: String,
    },

    #[error("Identifier space must be 1 to 64 bits wide, got {0}")]
    InvalidBitWidth(u32),

    /// Finger-jump routing came back to a node it already visited.
    #[error("Lookup for key {key} looped back to {at}")]
    RoutingLoop { at: Id, key: Id },

    #[error("Lookup exceeded {limit} hops")]
    HopLimitExceeded { limit: usize },

    /// Every candidate next hop from `at` failed.
    #[error("All next hops from {at} failed while looking up {key}")]
    HopFailed { at: Id, key: Id },

    #[error("Lookup was cancelled")]
    Cancelled,
}

/// Failure of a single remote hop.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HopError {
    /// No acknowledgement within the hop timeout.
    #[error("Hop timed out")]
    Timeout,

    /// The peer is not known to the transport.
    #[error("Peer {0} is unreachable")]
    Unreachable(Id),

    /// The peer's endpoint was shut down.
    #[error("Peer {0} disconnected")]
    Disconnected(Id),
}
