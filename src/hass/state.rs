use crate::tracker::StateLookup;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Latest known raw state per entity, shared between the watcher and the gate.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    states: Arc<RwLock<HashMap<String, String>>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state of `entity_id`; `None` forgets it.
    pub fn set(&self, entity_id: &str, state: Option<String>) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        match state {
            Some(state) => {
                states.insert(entity_id.to_string(), state);
            }
            None => {
                states.remove(entity_id);
            }
        }
    }

    pub fn get(&self, entity_id: &str) -> Option<String> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }
}

impl StateLookup for StateCache {
    fn state_of(&self, entity_id: &str) -> Option<String> {
        self.get(entity_id)
    }
}
