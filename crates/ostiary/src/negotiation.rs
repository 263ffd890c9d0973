//! Credential negotiation state for HTTP authentication challenges.
//!
//! The engine may raise several challenges for one page load, possibly for
//! different realms, before the first resolves. The failure counter and the
//! proposal queue are therefore one critical section: every mutation
//! happens under a single lock, keyed to the protection boundary the queue
//! was populated for.

use ostiary_core::{CoreResult, Credential, CredentialStore, ProtectionSpace};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type BoundaryKey = (String, String, Option<String>, Option<u16>);

pub struct AuthNegotiation {
    store: Arc<dyn CredentialStore>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    failure_count: u32,
    proposed: VecDeque<Credential>,
    populated_for: Option<BoundaryKey>,
}

impl AuthNegotiation {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            state: Mutex::new(State::default()),
        }
    }

    /// Record one challenge arrival for `space`: bump the failure count and
    /// bring the proposal queue in line with the boundary, querying the
    /// store once per boundary. Returns the updated count and the front
    /// proposal.
    pub fn record_challenge(&self, space: &ProtectionSpace) -> (u32, Option<Credential>) {
        let key = boundary_key(space);
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return (1, None),
        };
        state.failure_count += 1;
        if state.populated_for.as_ref() != Some(&key) {
            let credentials = self
                .store
                .lookup(
                    &space.host,
                    &space.protocol,
                    space.realm.as_deref(),
                    space.port,
                )
                .unwrap_or_else(|error| {
                    tracing::warn!(host = %space.host, error = %error, "Credential lookup failed");
                    Vec::new()
                });
            state.proposed = credentials.into();
            state.populated_for = Some(key);
        }
        (state.failure_count, state.proposed.front().cloned())
    }

    /// Consume the next credential the session proposes.
    pub fn pop_proposed(&self) -> Option<Credential> {
        match self.state.lock() {
            Ok(mut state) => state.proposed.pop_front(),
            Err(_) => None,
        }
    }

    /// Write a credential to the store for the boundary.
    pub fn persist(&self, space: &ProtectionSpace, credential: &Credential) -> CoreResult<()> {
        self.store.store(
            &space.host,
            &space.protocol,
            space.realm.as_deref(),
            space.port,
            &credential.username,
            credential.password.expose(),
        )
    }

    /// Clear the counter and the queue. Called at navigation boundaries and
    /// on a canceled challenge.
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = State::default();
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.state
            .lock()
            .map(|state| state.failure_count)
            .unwrap_or(0)
    }
}

fn boundary_key(space: &ProtectionSpace) -> BoundaryKey {
    (
        space.host.clone(),
        space.protocol.clone(),
        space.realm.clone(),
        space.port,
    )
}
