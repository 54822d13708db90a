//! Finger-jump lookups where every hop is a remote call that may fail.
//!
//! Each hop is delivered through a [Transport] with a bounded timeout. A failed hop is
//! retried against the next-best candidate instead of aborting the lookup: the remaining
//! admissible fingers from farthest to nearest, then the successor. When the responsible
//! successor itself does not answer, the lookup walks further down the successor chain.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::actor::Transport;
use crate::common::{HashFn, Id};
use crate::config::{DEFAULT_HOP_TIMEOUT, DEFAULT_SUCCESSOR_FALLBACKS};
use crate::core::routing::{admissible_fingers, FingerStep};
use crate::core::{LookupTrace, RoutingEngine};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
/// Shared flag to abort an in-progress lookup before its next hop.
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A finger-jump lookup driven hop by hop over a [Transport].
///
/// The trace excludes the starting peer, as with [crate::RoutingStrategy::FingerJump].
#[derive(Debug)]
pub struct RemoteLookup<'a, A, H, T: ?Sized> {
    engine: &'a RoutingEngine<A, H>,
    transport: &'a T,
    hop_timeout: Duration,
    successor_fallbacks: usize,
    cancellation: Option<CancellationToken>,
}

impl<'a, A, H, T: Transport + ?Sized> RemoteLookup<'a, A, H, T> {
    pub fn new(engine: &'a RoutingEngine<A, H>, transport: &'a T) -> Self {
        RemoteLookup {
            engine,
            transport,
            hop_timeout: DEFAULT_HOP_TIMEOUT,
            successor_fallbacks: DEFAULT_SUCCESSOR_FALLBACKS,
            cancellation: None,
        }
    }

    // === Options ===

    pub fn with_hop_timeout(mut self, hop_timeout: Duration) -> Self {
        self.hop_timeout = hop_timeout;
        self
    }

    pub fn with_successor_fallbacks(mut self, successor_fallbacks: usize) -> Self {
        self.successor_fallbacks = successor_fallbacks;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    // === Public Methods ===

    /// Hash `key` once and resolve it starting at `start`.
    pub fn run<K: ?Sized>(&self, start: Id, key: &K, trace: &mut LookupTrace) -> Result<Id>
    where
        H: HashFn<K>,
    {
        self.run_id(start, self.engine.hash_key(key), trace)
    }

    /// Resolve an already hashed key starting at `start`.
    pub fn run_id(&self, start: Id, key: Id, trace: &mut LookupTrace) -> Result<Id> {
        let key = self.engine.space().reduce(key.value());
        let hop_limit = self.engine.hop_limit();

        let mut visited = HashSet::new();
        let mut current = start;
        visited.insert(current);

        loop {
            self.check_cancelled()?;

            match self.engine.finger_step(current, key)? {
                FingerStep::Resolved => {
                    debug!(?start, ?key, responsible = ?current, "Remote lookup done");
                    return Ok(current);
                }
                FingerStep::Successor(successor) => {
                    let responsible = self.reach_successor(current, successor, key)?;
                    trace.push(responsible);

                    debug!(?start, ?key, ?responsible, hops = ?trace.len(), "Remote lookup done");
                    return Ok(responsible);
                }
                FingerStep::Forward(_) => {
                    let next = self.forward(current, key, &visited)?;

                    visited.insert(next);
                    if visited.len() > hop_limit {
                        return Err(Error::HopLimitExceeded { limit: hop_limit });
                    }

                    trace.push(next);
                    current = next;
                }
            }
        }
    }

    // === Private Methods ===

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Try the admissible fingers farthest first, then the successor.
    fn forward(&self, current: Id, key: Id, visited: &HashSet<Id>) -> Result<Id> {
        let table = self.engine.finger_table(current)?;
        let successor = table.successor();

        let mut candidates: Vec<Id> = admissible_fingers(table, key)
            .filter(|&entry| entry != current)
            .collect();
        if !candidates.contains(&successor) {
            candidates.push(successor);
        }

        for candidate in candidates {
            self.check_cancelled()?;

            if visited.contains(&candidate) {
                return Err(Error::RoutingLoop { at: candidate, key });
            }

            match self
                .transport
                .forward(current, candidate, key, self.hop_timeout)
            {
                Ok(()) => {
                    trace!(?current, next = ?candidate, ?key, "Remote hop");
                    return Ok(candidate);
                }
                Err(error) => {
                    warn!(
                        ?current,
                        ?candidate,
                        ?key,
                        ?error,
                        "Hop failed, trying next candidate"
                    );
                }
            }
        }

        Err(Error::HopFailed { at: current, key })
    }

    /// Contact the responsible successor, walking the successor chain if it does not answer.
    fn reach_successor(&self, current: Id, successor: Id, key: Id) -> Result<Id> {
        // Single peer ring.
        if successor == current {
            return Ok(current);
        }

        let mut candidate = successor;

        for _ in 0..=self.successor_fallbacks {
            if candidate == current {
                break;
            }

            self.check_cancelled()?;

            match self
                .transport
                .forward(current, candidate, key, self.hop_timeout)
            {
                Ok(()) => return Ok(candidate),
                Err(error) => {
                    warn!(
                        ?current,
                        ?candidate,
                        ?key,
                        ?error,
                        "Successor unreachable, falling back"
                    );
                }
            }

            candidate = self.engine.successor(candidate)?;
        }

        Err(Error::HopFailed { at: current, key })
    }
}
