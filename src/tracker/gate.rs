//! Tracking gate backed by an optional binary signal.

use std::sync::Arc;

/// Live view of external entity states.
pub trait StateLookup: Send + Sync {
    /// Current raw state of `entity_id`, `None` when unknown to the host.
    fn state_of(&self, entity_id: &str) -> Option<String>;
}

/// Answers "is tracking currently active?".
///
/// Holds no state of its own: every call reads the binary signal through the
/// injected [`StateLookup`].
#[derive(Clone)]
pub struct Gate {
    binary_sensor: Option<String>,
    states: Arc<dyn StateLookup>,
}

impl Gate {
    pub fn new(binary_sensor: Option<String>, states: Arc<dyn StateLookup>) -> Self {
        Self {
            binary_sensor,
            states,
        }
    }

    pub fn binary_sensor(&self) -> Option<&str> {
        self.binary_sensor.as_deref()
    }

    /// `true` without a binary sensor, otherwise `true` only while it reads `on`.
    pub fn is_active(&self) -> bool {
        match &self.binary_sensor {
            None => true,
            Some(entity_id) => self.states.state_of(entity_id).as_deref() == Some("on"),
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("binary_sensor", &self.binary_sensor)
            .field("active", &self.is_active())
            .finish()
    }
}
