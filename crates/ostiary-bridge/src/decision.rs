//! Pure mapping from authority replies to typed actions.
//!
//! Reply payloads are untrusted: every field may be absent, null or
//! wrong-typed. Each parser here is total and falls back to the action the
//! engine would have taken on its own. The one asymmetry is deliberate:
//! for navigation a `null` reply allows while an empty object cancels,
//! because an authority that answers with an object has started expressing
//! a decision and the safe reading of an incomplete one is "cancel".

use ostiary_core::wire::key;
use ostiary_core::{AuthorityReply, ClientCertSelection, Credential};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuthDecision {
    /// Retry with the supplied credential.
    UseCredentials(Credential),
    /// Retry with the next credential proposed by the session.
    UseNextProposed,
    Cancel,
    /// Leave the challenge to the engine's built-in handling.
    EngineDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTrustDecision {
    Proceed,
    Cancel,
    EngineDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCertDecision {
    Proceed(ClientCertSelection),
    /// Answer the request with no certificate.
    Ignore,
    Cancel,
    EngineDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeBrowsingDecision {
    BackToSafety { report: bool },
    Proceed { report: bool },
    ShowInterstitial { report: bool },
    EngineDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormResubmissionDecision {
    Resend,
    DontResend,
    EngineDefault,
}

/// A challenge decision, tagged with the challenge kind it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeDecision {
    HttpAuth(HttpAuthDecision),
    ServerTrust(ServerTrustDecision),
    ClientCert(ClientCertDecision),
    SafeBrowsing(SafeBrowsingDecision),
    FormResubmission(FormResubmissionDecision),
}

// ---------------------------------------------------------------------------
// Parsers, one per decision method
// ---------------------------------------------------------------------------

pub fn navigation(reply: &AuthorityReply) -> NavigationDecision {
    let value = match reply {
        AuthorityReply::Decision(Value::Null) => return NavigationDecision::Allow,
        AuthorityReply::Decision(value) => value,
        AuthorityReply::Failed { .. } | AuthorityReply::Unhandled => {
            return NavigationDecision::Allow
        }
    };
    match action_code(value) {
        Some(1) => NavigationDecision::Allow,
        _ => NavigationDecision::Cancel,
    }
}

pub fn http_auth(reply: &AuthorityReply) -> HttpAuthDecision {
    let Some(value) = decision_value(reply) else {
        return HttpAuthDecision::EngineDefault;
    };
    let Some(code) = action_code(value) else {
        return HttpAuthDecision::EngineDefault;
    };
    match code {
        1 => {
            let username = str_field(value, key::USERNAME).unwrap_or_default();
            let password = str_field(value, key::PASSWORD).unwrap_or_default();
            let persist = bool_field(value, key::PERMANENT_PERSISTENCE).unwrap_or(false);
            HttpAuthDecision::UseCredentials(
                Credential::new(username, password).with_persistence(persist),
            )
        }
        2 => HttpAuthDecision::UseNextProposed,
        _ => HttpAuthDecision::Cancel,
    }
}

pub fn server_trust(reply: &AuthorityReply) -> ServerTrustDecision {
    match decision_value(reply).and_then(action_code) {
        Some(1) => ServerTrustDecision::Proceed,
        Some(_) => ServerTrustDecision::Cancel,
        None => ServerTrustDecision::EngineDefault,
    }
}

pub fn client_cert(reply: &AuthorityReply) -> ClientCertDecision {
    let Some(value) = decision_value(reply) else {
        return ClientCertDecision::EngineDefault;
    };
    match action_code(value) {
        Some(1) => ClientCertDecision::Proceed(ClientCertSelection {
            certificate_path: str_field(value, key::CERTIFICATE_PATH).unwrap_or_default(),
            certificate_password: str_field(value, key::CERTIFICATE_PASSWORD),
            key_store_type: str_field(value, key::KEY_STORE_TYPE),
        }),
        Some(2) => ClientCertDecision::Ignore,
        Some(_) => ClientCertDecision::Cancel,
        None => ClientCertDecision::EngineDefault,
    }
}

pub fn safe_browsing(reply: &AuthorityReply) -> SafeBrowsingDecision {
    let Some(value) = decision_value(reply) else {
        return SafeBrowsingDecision::EngineDefault;
    };
    let report = bool_field(value, key::REPORT).unwrap_or(true);
    match action_code(value) {
        Some(0) => SafeBrowsingDecision::BackToSafety { report },
        Some(1) => SafeBrowsingDecision::Proceed { report },
        Some(_) => SafeBrowsingDecision::ShowInterstitial { report },
        None => SafeBrowsingDecision::EngineDefault,
    }
}

pub fn form_resubmission(reply: &AuthorityReply) -> FormResubmissionDecision {
    match decision_value(reply).and_then(action_code) {
        Some(0) => FormResubmissionDecision::Resend,
        Some(_) => FormResubmissionDecision::DontResend,
        None => FormResubmissionDecision::EngineDefault,
    }
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// The decision value, unless the reply carries none (null, failure, or
/// unhandled method).
fn decision_value(reply: &AuthorityReply) -> Option<&Value> {
    match reply {
        AuthorityReply::Decision(Value::Null) => None,
        AuthorityReply::Decision(value) => Some(value),
        AuthorityReply::Failed { .. } | AuthorityReply::Unhandled => None,
    }
}

fn action_code(value: &Value) -> Option<i64> {
    value.as_object()?.get(key::ACTION)?.as_i64()
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field)?.as_str().map(str::to_string)
}

fn bool_field(value: &Value, field: &str) -> Option<bool> {
    value.get(field)?.as_bool()
}
