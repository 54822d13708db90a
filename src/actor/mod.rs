//! Actor implementation - delivery of lookup hops between peers.

mod channel;

use std::time::Duration;

use crate::common::Id;
use crate::error::HopError;

pub use channel::ChannelTransport;

/// Delivers a single lookup hop to a remote peer.
///
/// Implementations block for at most `timeout` and report a failed hop instead of
/// retrying, retries are decided by [crate::RemoteLookup].
pub trait Transport {
    /// Forward the lookup for `key` from `from` to `to`, returning once `to` acknowledged it.
    fn forward(&self, from: Id, to: Id, key: Id, timeout: Duration) -> Result<(), HopError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn forward(&self, from: Id, to: Id, key: Id, timeout: Duration) -> Result<(), HopError> {
        (**self).forward(from, to, key, timeout)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// In-process delivery that never fails, every peer lives in the same snapshot.
pub struct LocalTransport;

impl Transport for LocalTransport {
    fn forward(&self, _from: Id, _to: Id, _key: Id, _timeout: Duration) -> Result<(), HopError> {
        Ok(())
    }
}
