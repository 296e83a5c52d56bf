use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::utils;

/// How long a started login may take before its verifier is discarded.
pub const LOGIN_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct PendingLogin {
    code_verifier: String,
    started_at: Instant,
}

/// Keeps the PKCE code verifier of every login in flight, keyed by the
/// OAuth `state` value sent to Spotify.
///
/// Each state can be redeemed once. Expired entries are pruned whenever a
/// new login starts.
#[derive(Debug)]
pub struct LoginManager {
    pending: Mutex<HashMap<String, PendingLogin>>,
    ttl: Duration,
}

impl Default for LoginManager {
    fn default() -> Self {
        Self::new(LOGIN_TTL)
    }
}

impl LoginManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Starts a login. Returns the `state` value and the code verifier.
    pub fn begin(&self) -> (String, String) {
        let state = utils::generate_state();
        let code_verifier = utils::generate_code_verifier();

        let mut pending = self.pending.lock();
        let ttl = self.ttl;
        pending.retain(|_, login| login.started_at.elapsed() < ttl);
        pending.insert(
            state.clone(),
            PendingLogin {
                code_verifier: code_verifier.clone(),
                started_at: Instant::now(),
            },
        );

        (state, code_verifier)
    }

    /// Redeems a `state` value, returning its code verifier if the login is
    /// known and not expired.
    pub fn take(&self, state: &str) -> Option<String> {
        let login = self.pending.lock().remove(state)?;
        if login.started_at.elapsed() >= self.ttl {
            return None;
        }
        Some(login.code_verifier)
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}
