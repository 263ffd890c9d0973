//! The decision bridge, pairing one challenge with one typed action.
//!
//! A bridge owns the authority channel. Callers hand it a challenge and a
//! one-shot `deliver` closure; the bridge serializes the challenge, invokes
//! the channel, and runs `deliver` with the parsed decision on whatever
//! thread the channel replies from. Channel failures are logged here, once,
//! so every caller inherits the same fallback behavior.

use crate::decision::{self, ChallengeDecision, NavigationDecision};
use crate::payload;
use ostiary_core::wire::method;
use ostiary_core::{AuthorityChannel, AuthorityReply, Challenge, NavigationAction};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct DecisionBridge {
    channel: Arc<dyn AuthorityChannel>,
}

impl DecisionBridge {
    pub fn new(channel: Arc<dyn AuthorityChannel>) -> Self {
        Self { channel }
    }

    /// Clone of the underlying channel, for collaborators that talk to the
    /// authority directly.
    pub fn channel(&self) -> Arc<dyn AuthorityChannel> {
        Arc::clone(&self.channel)
    }

    /// Ask the authority whether a navigation may proceed. `deliver` runs
    /// exactly once.
    pub fn ask_navigation(
        &self,
        action: &NavigationAction,
        deliver: impl FnOnce(NavigationDecision) + Send + 'static,
    ) {
        self.channel.invoke(
            method::SHOULD_OVERRIDE_URL_LOADING,
            payload::navigation_action(action),
            Box::new(move |reply| {
                log_failure(method::SHOULD_OVERRIDE_URL_LOADING, &reply);
                deliver(decision::navigation(&reply));
            }),
        );
    }

    /// Ask the authority to resolve a challenge. `deliver` runs exactly once
    /// with a decision tagged with the challenge's kind.
    pub fn ask(
        &self,
        challenge: &Challenge,
        deliver: impl FnOnce(ChallengeDecision) + Send + 'static,
    ) {
        let parse: fn(&AuthorityReply) -> ChallengeDecision = match challenge {
            Challenge::HttpAuth { .. } => {
                |reply| ChallengeDecision::HttpAuth(decision::http_auth(reply))
            }
            Challenge::ServerTrust { .. } => {
                |reply| ChallengeDecision::ServerTrust(decision::server_trust(reply))
            }
            Challenge::ClientCert { .. } => {
                |reply| ChallengeDecision::ClientCert(decision::client_cert(reply))
            }
            Challenge::SafeBrowsing { .. } => {
                |reply| ChallengeDecision::SafeBrowsing(decision::safe_browsing(reply))
            }
            Challenge::FormResubmission { .. } => {
                |reply| ChallengeDecision::FormResubmission(decision::form_resubmission(reply))
            }
        };
        let method = challenge.method();
        self.channel.invoke(
            method,
            payload::challenge(challenge),
            Box::new(move |reply| {
                log_failure(method, &reply);
                deliver(parse(&reply));
            }),
        );
    }

    /// Fire-and-forget notification to the authority.
    pub fn notify(&self, method: &str, arguments: Value) {
        self.channel.notify(method, arguments);
    }
}

fn log_failure(method: &str, reply: &AuthorityReply) {
    if let AuthorityReply::Failed { code, message } = reply {
        tracing::warn!(
            method,
            code = %code,
            message = message.as_deref().unwrap_or(""),
            "Authority call failed, falling back"
        );
    }
}
