use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{CollisionPolicy, IdSpace};
use crate::core::RoutingStrategy;
use crate::Result;

/// Default bit width of the identifier space.
pub const DEFAULT_BITS: u32 = 32;
/// Default time to wait for a remote peer to acknowledge a hop.
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_millis(2000); // 2 seconds
/// Default number of extra successors tried when the responsible peer does not answer.
pub const DEFAULT_SUCCESSOR_FALLBACKS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Ring and routing configurations
pub struct Config {
    /// Bit width `m` of the identifier space, `1..=64`.
    ///
    /// Defaults to [DEFAULT_BITS]
    pub bits: u32,
    /// Lookup algorithm used by [crate::RoutingEngine::query].
    ///
    /// Defaults to [RoutingStrategy::DirectMembership]
    pub strategy: RoutingStrategy,
    /// Policy for distinct addresses hashing to the same identifier.
    ///
    /// Defaults to [CollisionPolicy::Merge]
    pub collision_policy: CollisionPolicy,
    /// Upper bound on hops for a single lookup.
    ///
    /// Defaults to None, meaning `2 * bits + 1`.
    pub max_hops: Option<usize>,
    /// Remote hop timeout duration.
    ///
    /// The longer this duration is, the longer a lookup blocks on a dead peer before
    /// falling back to the next candidate.
    ///
    /// Defaults to [DEFAULT_HOP_TIMEOUT]
    pub hop_timeout: Duration,
    /// How many further successors a remote lookup tries when the responsible peer
    /// is unreachable.
    ///
    /// Defaults to [DEFAULT_SUCCESSOR_FALLBACKS]
    pub successor_fallbacks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bits: DEFAULT_BITS,
            strategy: RoutingStrategy::default(),
            collision_policy: CollisionPolicy::default(),
            max_hops: None,
            hop_timeout: DEFAULT_HOP_TIMEOUT,
            successor_fallbacks: DEFAULT_SUCCESSOR_FALLBACKS,
        }
    }
}

impl Config {
    /// Validated identifier space for [Self::bits].
    pub fn space(&self) -> Result<IdSpace> {
        IdSpace::new(self.bits)
    }

    /// Effective hop limit, resolving the `None` default.
    pub fn hop_limit(&self) -> usize {
        self.max_hops.unwrap_or(2 * self.bits as usize + 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.bits, 32);
        assert_eq!(config.hop_limit(), 65);
        assert_eq!(config.strategy, RoutingStrategy::DirectMembership);
        assert_eq!(config.collision_policy, CollisionPolicy::Merge);
    }

    #[test]
    fn partial_json() {
        let config: Config =
            serde_json::from_str(r#"{ "bits": 7, "strategy": "finger_jump", "max_hops": 10 }"#)
                .unwrap();

        assert_eq!(config.bits, 7);
        assert_eq!(config.strategy, RoutingStrategy::FingerJump);
        assert_eq!(config.hop_limit(), 10);
        assert_eq!(config.hop_timeout, DEFAULT_HOP_TIMEOUT);
        assert_eq!(config.successor_fallbacks, DEFAULT_SUCCESSOR_FALLBACKS);
    }

    #[test]
    fn invalid_bits() {
        let config = Config {
            bits: 70,
            ..Default::default()
        };

        assert!(config.space().is_err());
    }
}
