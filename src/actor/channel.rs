//! Threaded transport: one worker per peer, fed through a channel.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use super::Transport;
use crate::common::{Id, Ring};
use crate::error::HopError;

struct HopRequest {
    from: Id,
    key: Id,
    reply: Sender<Id>,
}

enum PeerMessage {
    Hop(HopRequest),
    Shutdown,
}

#[derive(Debug)]
struct PeerState {
    reachable: AtomicBool,
    served: AtomicU64,
    held: AtomicUsize,
}

struct PeerEndpoint {
    sender: Sender<PeerMessage>,
    state: Arc<PeerState>,
    handle: Option<JoinHandle<()>>,
}

/// A [Transport] where every ring member is served by its own worker thread.
///
/// A hop sends a request over the peer's channel and waits for the acknowledgement
/// with a timeout. Peers can be made unreachable, their requests are then held
/// unanswered so the caller times out, or shut down, which disconnects them.
pub struct ChannelTransport {
    peers: HashMap<Id, PeerEndpoint>,
}

impl ChannelTransport {
    /// Spawn one worker per peer on `ring`.
    ///
    /// Returns Err if a worker thread could not be spawned, workers spawned so far are
    /// stopped.
    pub fn spawn<A>(ring: &Ring<A>) -> io::Result<Self> {
        let mut transport = ChannelTransport {
            peers: HashMap::with_capacity(ring.len()),
        };

        for peer in ring.iter() {
            let endpoint = PeerEndpoint::spawn(peer.id())?;
            transport.peers.insert(peer.id(), endpoint);
        }

        Ok(transport)
    }

    // === Getters ===

    /// Number of hops acknowledged by `id`, or None if it is not served by this transport.
    pub fn served(&self, id: Id) -> Option<u64> {
        self.peers
            .get(&id)
            .map(|endpoint| endpoint.state.served.load(Ordering::Relaxed))
    }

    /// Number of requests `id` currently holds unanswered while unreachable, or None if it
    /// is not served by this transport.
    pub fn held(&self, id: Id) -> Option<usize> {
        self.peers
            .get(&id)
            .map(|endpoint| endpoint.state.held.load(Ordering::Relaxed))
    }

    pub fn is_reachable(&self, id: Id) -> bool {
        self.peers
            .get(&id)
            .map(|endpoint| endpoint.state.reachable.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    // === Public Methods ===

    /// Make `id` (un)reachable. Returns `false` if it is not served by this transport.
    pub fn set_reachable(&self, id: Id, reachable: bool) -> bool {
        match self.peers.get(&id) {
            Some(endpoint) => {
                endpoint.state.reachable.store(reachable, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Stop the worker of `id`, later hops to it fail with [HopError::Disconnected].
    pub fn shutdown_peer(&mut self, id: Id) {
        if let Some(endpoint) = self.peers.get_mut(&id) {
            endpoint.shutdown();
        }
    }
}

impl Transport for ChannelTransport {
    fn forward(&self, from: Id, to: Id, key: Id, timeout: Duration) -> Result<(), HopError> {
        let endpoint = self.peers.get(&to).ok_or(HopError::Unreachable(to))?;

        let (reply, receiver) = flume::bounded(1);

        endpoint
            .sender
            .send(PeerMessage::Hop(HopRequest { from, key, reply }))
            .map_err(|_| HopError::Disconnected(to))?;

        match receiver.recv_timeout(timeout) {
            Ok(_) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(HopError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(HopError::Disconnected(to)),
        }
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        for endpoint in self.peers.values_mut() {
            endpoint.shutdown();
        }
    }
}

impl Debug for ChannelTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelTransport({} peers)", self.peers.len())
    }
}

impl PeerEndpoint {
    fn spawn(id: Id) -> io::Result<Self> {
        let (sender, receiver) = flume::unbounded();
        let state = Arc::new(PeerState {
            reachable: AtomicBool::new(true),
            served: AtomicU64::new(0),
            held: AtomicUsize::new(0),
        });

        let worker_state = state.clone();
        let handle = thread::Builder::new()
            .name(format!("chord-peer-{}", id))
            .spawn(move || run(id, receiver, worker_state))
            .map_err(|error| {
                warn!(peer = ?id, ?error, "Could not spawn peer worker");
                error
            })?;

        Ok(PeerEndpoint {
            sender,
            state,
            handle: Some(handle),
        })
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(PeerMessage::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run(id: Id, receiver: Receiver<PeerMessage>, state: Arc<PeerState>) {
    // Requests received while unreachable, held so their callers time out.
    let mut held: Vec<Sender<Id>> = Vec::new();

    while let Ok(message) = receiver.recv() {
        match message {
            PeerMessage::Hop(request) => {
                if !state.reachable.load(Ordering::Relaxed) {
                    // Callers that already timed out dropped their receivers.
                    held.retain(|reply| !reply.is_disconnected());
                    held.push(request.reply);
                    state.held.store(held.len(), Ordering::Relaxed);
                    continue;
                }

                held.clear();
                state.held.store(0, Ordering::Relaxed);
                state.served.fetch_add(1, Ordering::Relaxed);
                trace!(peer = ?id, from = ?request.from, key = ?request.key, "Hop received");

                let _ = request.reply.send(id);
            }
            PeerMessage::Shutdown => break,
        }
    }

    debug!(peer = ?id, "Peer worker stopped");
}
