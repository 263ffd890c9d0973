//! Ostiary Session Layer
//!
//! Top-level crate for embedding: one [`EngineClient`] per rendering-engine
//! session, routing the engine's policy callbacks through the decision
//! bridge and the interception pipeline.
//!
//! # Architecture
//!
//! The session layer is a thin dispatcher. The embedder supplies an
//! `AuthorityChannel` (the link to whatever process decides policy) and an
//! `EngineSink` (the write side of the engine), plus optional collaborators
//! for credentials, content filtering, cookies, and script injection. The
//! dispatcher owns the per-session negotiation state and applies every
//! authority decision back onto the engine. A disposed session turns all
//! in-flight replies into no-ops.

pub mod client;
pub mod config;
pub mod error;
pub mod negotiation;
pub mod observer;

pub use client::{EngineClient, SessionBuilder};
pub use config::SessionOptions;
pub use error::{OstiaryError, OstiaryResult};
pub use negotiation::AuthNegotiation;
pub use observer::{NavigationObserver, ObserverSet};

// The collaborator contracts and decision types embedders implement or
// match on, re-exported from the component crates.
pub use ostiary_core::wire;

pub use ostiary_bridge::{
    ChallengeDecision, ClientCertDecision, DecisionBridge, FormResubmissionDecision,
    HttpAuthDecision, NavigationDecision, SafeBrowsingDecision, ServerTrustDecision,
};
pub use ostiary_core::{
    AuthorityChannel, AuthorityReply, Certificate, Challenge, ClientCertResponder,
    ClientCertSelection, ContentFilter, CookieJar, CoreError, CoreResult, Credential,
    CredentialStore, EngineSink, FormResubmissionResponder, HttpAuthResponder,
    InMemoryCredentialStore, InterceptedResponse, KeyEvent, NavigationAction, Password,
    ProtectionSpace, RendererExitDetail, ReplyHandler, ResourceRequest, SafeBrowsingResponder,
    ScriptContext, ServerTrustResponder, ThreatType,
};
pub use ostiary_intercept::{
    FetchedResource, HttpFetcher, InterceptError, InterceptOptions, InterceptPipeline,
    InterceptResult, ResourceFetch, TlsVersion,
};
