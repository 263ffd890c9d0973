use crate::error::CoreResult;
use crate::types::{Certificate, ClientCertSelection, Credential, InterceptedResponse};
use serde_json::Value;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// AuthorityChannel — the asynchronous link to the policy authority
//
// Replies are delivered exactly once per invoke. Nothing about a reply
// payload may be assumed well-formed; parsers tolerate absent, null, and
// wrong-typed fields.
// ---------------------------------------------------------------------------

/// Outcome of one authority call.
#[derive(Debug, Clone)]
pub enum AuthorityReply {
    /// The authority produced a decision value (possibly `null`).
    Decision(Value),
    /// The authority signalled a failure.
    Failed { code: String, message: Option<String> },
    /// The authority does not handle this method.
    Unhandled,
}

pub type ReplyHandler = Box<dyn FnOnce(AuthorityReply) + Send + 'static>;

pub trait AuthorityChannel: Send + Sync {
    /// Invoke `method` with `arguments`, delivering the reply to `reply`
    /// exactly once, on any thread.
    fn invoke(&self, method: &str, arguments: Value, reply: ReplyHandler);

    /// Fire-and-forget notification; the reply is discarded.
    fn notify(&self, method: &str, arguments: Value) {
        self.invoke(method, arguments, Box::new(|_| {}));
    }
}

// ---------------------------------------------------------------------------
// CredentialStore — persistent credentials, keyed by protection boundary
// ---------------------------------------------------------------------------

pub trait CredentialStore: Send + Sync {
    /// Stored credentials for the boundary, in proposal order.
    fn lookup(
        &self,
        host: &str,
        protocol: &str,
        realm: Option<&str>,
        port: Option<u16>,
    ) -> CoreResult<Vec<Credential>>;

    fn store(
        &self,
        host: &str,
        protocol: &str,
        realm: Option<&str>,
        port: Option<u16>,
        username: &str,
        password: &str,
    ) -> CoreResult<()>;
}

// ---------------------------------------------------------------------------
// ContentFilter — rule-based resource blocking/replacement
// ---------------------------------------------------------------------------

pub trait ContentFilter: Send + Sync {
    fn has_rules(&self) -> bool;

    /// Evaluate the rules against `url`. `declared_content_type` is set when
    /// the resource bytes are already in hand (custom-scheme replies).
    fn evaluate(
        &self,
        url: &str,
        declared_content_type: Option<&str>,
    ) -> CoreResult<Option<InterceptedResponse>>;
}

// ---------------------------------------------------------------------------
// CookieJar / ScriptContext — session collaborators with narrow contracts
// ---------------------------------------------------------------------------

pub trait CookieJar: Send + Sync {
    /// Value for a `Cookie` request header matching `url`, if any.
    fn cookies_for(&self, url: &str) -> Option<String>;

    /// Flush pending persistent cookie writes.
    fn flush(&self);
}

pub trait ScriptContext: Send + Sync {
    /// Drop per-page script state at a main-frame navigation start.
    fn reset(&self);

    fn document_start_source(&self) -> Option<String> {
        None
    }

    fn document_end_source(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// EngineSink — the write side of the rendering engine
// ---------------------------------------------------------------------------

pub trait EngineSink: Send + Sync {
    fn navigate(&self, url: &str, headers: &HashMap<String, String>);
    fn evaluate_script(&self, source: &str);
    fn stop_loading(&self);
    /// Replace the current document with a blank page.
    fn blank(&self);
    fn current_url(&self) -> Option<String>;
    fn peer_certificate(&self) -> Option<Certificate>;
}

// ---------------------------------------------------------------------------
// Responders — one-shot challenge resolution handles
//
// Every responder is consumed by the resolving call; `engine_default`
// invokes whatever behavior the engine itself would apply absent any
// interception.
// ---------------------------------------------------------------------------

pub trait HttpAuthResponder: Send {
    fn proceed(self: Box<Self>, username: &str, password: &str);
    fn cancel(self: Box<Self>);
    fn engine_default(self: Box<Self>);
}

pub trait ServerTrustResponder: Send {
    fn proceed(self: Box<Self>);
    fn cancel(self: Box<Self>);
    fn engine_default(self: Box<Self>);
}

pub trait ClientCertResponder: Send {
    fn proceed(self: Box<Self>, selection: ClientCertSelection);
    fn ignore(self: Box<Self>);
    fn cancel(self: Box<Self>);
    fn engine_default(self: Box<Self>);
}

pub trait SafeBrowsingResponder: Send {
    fn back_to_safety(self: Box<Self>, report: bool);
    fn proceed(self: Box<Self>, report: bool);
    fn show_interstitial(self: Box<Self>, report: bool);
    fn engine_default(self: Box<Self>);
}

pub trait FormResubmissionResponder: Send {
    fn resend(self: Box<Self>);
    fn dont_resend(self: Box<Self>);
    fn engine_default(self: Box<Self>);
}
