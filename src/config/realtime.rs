//! Realtime surface configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Realtime surface configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds an unanswered call may ring before both parties get
    /// `callEnded`. Unset lets calls ring until a party acts.
    pub ring_timeout_secs: Option<u64>,

    /// Synthesize `callEnded` to the peer when a party's last session
    /// disconnects mid-call.
    #[serde(default = "default_end_call_on_disconnect")]
    pub end_call_on_disconnect: bool,
}

impl RealtimeConfig {
    /// Get ring timeout as Duration
    pub fn ring_timeout(&self) -> Option<Duration> {
        self.ring_timeout_secs.map(Duration::from_secs)
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ring_timeout_secs == Some(0) {
            return Err(ValidationError::InvalidRingTimeout);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ring_timeout_secs: None,
            end_call_on_disconnect: default_end_call_on_disconnect(),
        }
    }
}

fn default_end_call_on_disconnect() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_config_defaults() {
        let config = RealtimeConfig::default();
        assert!(config.ring_timeout().is_none());
        assert!(config.end_call_on_disconnect);
    }

    #[test]
    fn test_ring_timeout_duration() {
        let config = RealtimeConfig {
            ring_timeout_secs: Some(45),
            ..Default::default()
        };
        assert_eq!(config.ring_timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_validation_zero_ring_timeout() {
        let config = RealtimeConfig {
            ring_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
