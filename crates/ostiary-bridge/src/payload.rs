//! Payload construction for the authority channel.
//!
//! Every value that crosses to the authority is built here so the wire
//! shapes live in one place. Field names come from
//! [`ostiary_core::wire::key`]. Optional fields are carried as explicit
//! nulls rather than omitted; the authority side destructures fixed shapes.

use ostiary_core::wire::key;
use ostiary_core::{
    Challenge, Credential, NavigationAction, ProtectionSpace, RendererExitDetail, ResourceRequest,
};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Decision-request payloads
// ---------------------------------------------------------------------------

/// Payload for `shouldOverrideUrlLoading`.
pub fn navigation_action(action: &NavigationAction) -> Value {
    let mut payload = Map::new();
    payload.insert(key::REQUEST.to_string(), resource_request(&action.request));
    payload.insert(
        key::IS_FOR_MAIN_FRAME.to_string(),
        action.is_main_frame.into(),
    );
    payload.insert(key::HAS_GESTURE.to_string(), action.has_gesture.into());
    payload.insert(key::IS_REDIRECT.to_string(), action.is_redirect.into());
    Value::Object(payload)
}

/// Payload for the challenge's own method (see [`Challenge::method`]).
pub fn challenge(challenge: &Challenge) -> Value {
    let mut payload = Map::new();
    match challenge {
        Challenge::HttpAuth {
            space,
            previous_failure_count,
            proposed_credential,
        } => {
            payload.insert(key::PROTECTION_SPACE.to_string(), protection_space(space));
            payload.insert(
                key::PREVIOUS_FAILURE_COUNT.to_string(),
                (*previous_failure_count).into(),
            );
            payload.insert(
                key::PROPOSED_CREDENTIAL.to_string(),
                proposed_credential
                    .as_ref()
                    .map(credential)
                    .unwrap_or(Value::Null),
            );
        }
        Challenge::ServerTrust { space } => {
            payload.insert(key::PROTECTION_SPACE.to_string(), protection_space(space));
        }
        Challenge::ClientCert {
            space,
            principals,
            key_types,
        } => {
            payload.insert(key::PROTECTION_SPACE.to_string(), protection_space(space));
            payload.insert(key::PRINCIPALS.to_string(), string_list(principals));
            payload.insert(key::KEY_TYPES.to_string(), string_list(key_types));
        }
        Challenge::SafeBrowsing { url, threat_type } => {
            payload.insert(key::URL.to_string(), url.clone().into());
            payload.insert(key::THREAT_TYPE.to_string(), threat_type.code().into());
        }
        Challenge::FormResubmission { url } => {
            payload.insert(key::URL.to_string(), url.clone().into());
        }
    }
    Value::Object(payload)
}

pub fn protection_space(space: &ProtectionSpace) -> Value {
    // The wire format has no optional port; absent means -1.
    let port = space.port.map(i64::from).unwrap_or(-1);
    let certificate = space
        .certificate
        .as_ref()
        .and_then(|cert| serde_json::to_value(cert).ok())
        .unwrap_or(Value::Null);
    let mut payload = Map::new();
    payload.insert(key::HOST.to_string(), space.host.clone().into());
    payload.insert(key::PROTOCOL.to_string(), space.protocol.clone().into());
    payload.insert(
        key::REALM.to_string(),
        space.realm.clone().map(Value::from).unwrap_or(Value::Null),
    );
    payload.insert(key::PORT.to_string(), port.into());
    payload.insert(key::CERTIFICATE.to_string(), certificate);
    Value::Object(payload)
}

fn resource_request(request: &ResourceRequest) -> Value {
    let headers: Map<String, Value> = request
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(value.as_str())))
        .collect();
    let mut payload = Map::new();
    payload.insert(key::URL.to_string(), request.url.clone().into());
    payload.insert(key::METHOD.to_string(), request.method.clone().into());
    payload.insert(key::HEADERS.to_string(), Value::Object(headers));
    Value::Object(payload)
}

fn credential(credential: &Credential) -> Value {
    let mut payload = Map::new();
    payload.insert(key::USERNAME.to_string(), credential.username.clone().into());
    payload.insert(
        key::PASSWORD.to_string(),
        credential.password.expose().into(),
    );
    Value::Object(payload)
}

fn string_list(items: &Option<Vec<String>>) -> Value {
    match items {
        Some(items) => items.iter().map(|item| Value::from(item.as_str())).collect(),
        None => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Notification payloads
// ---------------------------------------------------------------------------

/// `{url}` payload shared by load-start, load-stop, commit and
/// custom-scheme events.
pub fn url_only(url: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(key::URL.to_string(), url.into());
    Value::Object(payload)
}

pub fn load_error(url: &str, code: i64, message: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(key::URL.to_string(), url.into());
    payload.insert(key::CODE.to_string(), code.into());
    payload.insert(key::MESSAGE.to_string(), message.into());
    Value::Object(payload)
}

pub fn http_error(url: &str, status_code: u16, description: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(key::URL.to_string(), url.into());
    payload.insert(key::STATUS_CODE.to_string(), status_code.into());
    payload.insert(key::DESCRIPTION.to_string(), description.into());
    Value::Object(payload)
}

pub fn visited_history(url: Option<&str>, is_reload: bool) -> Value {
    let mut payload = Map::new();
    payload.insert(
        key::URL.to_string(),
        url.map(Value::from).unwrap_or(Value::Null),
    );
    payload.insert(key::IS_RELOAD.to_string(), is_reload.into());
    Value::Object(payload)
}

pub fn zoom_change(old_scale: f64, new_scale: f64) -> Value {
    let mut payload = Map::new();
    payload.insert(key::OLD_SCALE.to_string(), old_scale.into());
    payload.insert(key::NEW_SCALE.to_string(), new_scale.into());
    Value::Object(payload)
}

pub fn renderer_exit(detail: &RendererExitDetail) -> Value {
    let mut payload = Map::new();
    payload.insert(key::DID_CRASH.to_string(), detail.did_crash.into());
    payload.insert(
        key::RENDERER_PRIORITY_AT_EXIT.to_string(),
        detail.renderer_priority_at_exit.into(),
    );
    Value::Object(payload)
}

pub fn login_request(realm: &str, account: Option<&str>, args: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(key::REALM.to_string(), realm.into());
    payload.insert(
        key::ACCOUNT.to_string(),
        account.map(Value::from).unwrap_or(Value::Null),
    );
    payload.insert(key::ARGS.to_string(), args.into());
    Value::Object(payload)
}
