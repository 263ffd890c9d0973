//! Ostiary Decision Bridge
//!
//! Turns rendering-engine policy callbacks into authority calls and maps
//! the replies back into typed actions. One challenge in, one decision out.
//!
//! The three layers are deliberately separable:
//! - `payload`: the wire shapes sent to the authority
//! - `decision`: pure, total parsers from replies to typed decisions
//! - `bridge`: the channel plumbing that connects the two
//!
//! Every parser falls back to the action the engine would have taken on its
//! own, so a mute, crashing or partial authority never wedges the engine.

pub mod bridge;
pub mod decision;
pub mod payload;

// Re-export primary types and functions
pub use bridge::DecisionBridge;
pub use decision::{
    ChallengeDecision, ClientCertDecision, FormResubmissionDecision, HttpAuthDecision,
    NavigationDecision, SafeBrowsingDecision, ServerTrustDecision,
};
