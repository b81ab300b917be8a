//! CSRF state management for OAuth login flows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Manager for OAuth state parameters with expiration.
///
/// Generates and validates single-use CSRF state tokens that bind an
/// authorization request to its callback. A state is consumed on first
/// validation, so a replayed callback always fails.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    ttl: Duration,
}

impl StateManager {
    /// Create a new state manager with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::minutes(10),
        }
    }

    /// Create a new state manager with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Generate a new state token and record it for later validation.
    pub fn generate(&self) -> String {
        let state = Self::generate_token();
        let expires_at = Utc::now() + self.ttl;

        let mut states = self.states.lock().unwrap();
        states.insert(state.clone(), expires_at);

        state
    }

    /// Validate and consume a state token.
    ///
    /// Returns `true` if the state was previously issued, unexpired, and not
    /// yet consumed. The state is removed from storage either way.
    pub fn validate(&self, state: &str) -> bool {
        let mut states = self.states.lock().unwrap();

        match states.remove(state) {
            Some(expires_at) => Utc::now() <= expires_at,
            None => false,
        }
    }

    /// Clean up expired states.
    ///
    /// Should be called periodically to prevent memory leaks.
    pub fn cleanup_expired(&self) {
        let mut states = self.states.lock().unwrap();
        let now = Utc::now();
        states.retain(|_, expires_at| *expires_at > now);
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
