//! Routing logic - pure computation over an immutable ring snapshot.
//!
//! Contains the [RoutingEngine] with its two lookup strategies, the [LookupTrace]
//! accumulator, and [RemoteLookup], which drives finger-jump routing over a
//! fallible [crate::Transport].

pub(crate) mod remote;
pub(crate) mod routing;
pub(crate) mod trace;

pub use remote::{CancellationToken, RemoteLookup};
pub use routing::{RoutingEngine, RoutingStrategy};
pub use trace::LookupTrace;
