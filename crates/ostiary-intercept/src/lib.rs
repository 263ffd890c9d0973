//! Ostiary Interception Pipeline
//!
//! Synchronous resource interception for a rendering engine that demands an
//! immediate answer at the interception call site. The pipeline resolves a
//! request in order:
//!
//! 1. Registered custom scheme: blocking authority round-trip for inline
//!    bytes, optionally re-filtered.
//! 2. Content filter rules: a match answers locally.
//! 3. Intercept-all sessions: fallback fetch of main-frame GETs with a
//!    redirect-blind secondary client, then a blocking authority decision
//!    over the synthesized response.
//! 4. Anything else: no interception.
//!
//! Blocking round-trips ride a one-shot [`rendezvous`] with a timeout, so a
//! mute authority stalls a resource load for a bounded time and never wedges
//! the engine. Every failure in this crate degrades to "no interception".

pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod rendezvous;

// Re-export primary types and functions
pub use error::{InterceptError, InterceptResult};
pub use fetch::{
    sniff_media_type, split_content_type, synthesize_response, FetchedResource, HttpFetcher,
    ResourceFetch, TlsVersion, DEFAULT_CHARSET,
};
pub use pipeline::{InterceptOptions, InterceptPipeline};
pub use rendezvous::{rendezvous, Completer, Waiter};
