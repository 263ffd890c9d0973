use crate::error::{CoreError, CoreResult};
use crate::wire;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Certificate — peer certificate in DER form
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate(#[serde(with = "base64_bytes")] pub Vec<u8>);

impl Certificate {
    pub fn new(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    pub fn der(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.0[..self.0.len().min(8)];
        write!(f, "Certificate({}, {} bytes)", hex::encode(prefix), self.0.len())
    }
}

// ---------------------------------------------------------------------------
// ProtectionSpace — the authentication/trust boundary a challenge targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionSpace {
    pub host: String,
    pub protocol: String,
    pub realm: Option<String>,
    /// Explicit port only; `None` when the URL carries no port.
    pub port: Option<u16>,
    pub certificate: Option<Certificate>,
}

impl ProtectionSpace {
    pub fn new(host: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            protocol: protocol.into(),
            realm: None,
            port: None,
            certificate: None,
        }
    }

    /// Derive host/protocol/port from a URL, keeping realm and certificate
    /// as supplied. Fails when the URL does not parse or has no host.
    pub fn from_url(
        url: &str,
        realm: Option<String>,
        certificate: Option<Certificate>,
    ) -> CoreResult<Self> {
        let parsed = url::Url::parse(url).map_err(|e| CoreError::InvalidUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| CoreError::InvalidUrl(format!("no host in {url}")))?
            .to_string();
        Ok(Self {
            host,
            protocol: parsed.scheme().to_string(),
            realm,
            port: parsed.port(),
            certificate,
        })
    }

    /// True when both spaces name the same (host, protocol, realm, port)
    /// tuple. The peer certificate is not part of the boundary identity.
    pub fn same_boundary(&self, other: &ProtectionSpace) -> bool {
        self.host == other.host
            && self.protocol == other.protocol
            && self.realm == other.realm
            && self.port == other.port
    }
}

// ---------------------------------------------------------------------------
// Password — credential secret, zeroized on drop, redacted in Debug
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password(***)")
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

// ---------------------------------------------------------------------------
// Credential — username/password pair offered for an authentication retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: Password,
    /// Whether the authority asked for this credential to be persisted.
    pub persist: bool,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Password::new(password),
            persist: false,
        }
    }

    pub fn with_persistence(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

// ---------------------------------------------------------------------------
// ResourceRequest / NavigationAction — one navigation attempt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
}

impl ResourceRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationAction {
    pub request: ResourceRequest,
    pub is_main_frame: bool,
    pub has_gesture: bool,
    pub is_redirect: bool,
}

impl NavigationAction {
    /// A main-frame navigation with no gesture/redirect context, as raised
    /// by engines that only report the target URL.
    pub fn main_frame(request: ResourceRequest) -> Self {
        Self {
            request,
            is_main_frame: true,
            has_gesture: false,
            is_redirect: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ThreatType — safe-browsing threat classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatType {
    Unknown,
    Malware,
    Phishing,
    UnwantedSoftware,
    Billing,
    /// Codes this build does not know about are carried through unchanged.
    Other(i64),
}

impl ThreatType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ThreatType::Unknown,
            1 => ThreatType::Malware,
            2 => ThreatType::Phishing,
            3 => ThreatType::UnwantedSoftware,
            4 => ThreatType::Billing,
            other => ThreatType::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ThreatType::Unknown => 0,
            ThreatType::Malware => 1,
            ThreatType::Phishing => 2,
            ThreatType::UnwantedSoftware => 3,
            ThreatType::Billing => 4,
            ThreatType::Other(code) => *code,
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatType::Unknown => write!(f, "unknown"),
            ThreatType::Malware => write!(f, "malware"),
            ThreatType::Phishing => write!(f, "phishing"),
            ThreatType::UnwantedSoftware => write!(f, "unwanted_software"),
            ThreatType::Billing => write!(f, "billing"),
            ThreatType::Other(code) => write!(f, "other({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Challenge — one-shot policy decision request
//
// Created by the dispatcher, sent to the authority exactly once, and retired
// after the resulting action has been applied.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Challenge {
    HttpAuth {
        space: ProtectionSpace,
        previous_failure_count: u32,
        proposed_credential: Option<Credential>,
    },
    ServerTrust {
        space: ProtectionSpace,
    },
    ClientCert {
        space: ProtectionSpace,
        principals: Option<Vec<String>>,
        key_types: Option<Vec<String>>,
    },
    SafeBrowsing {
        url: String,
        threat_type: ThreatType,
    },
    FormResubmission {
        url: String,
    },
}

impl Challenge {
    /// The authority method this challenge is delivered on.
    pub fn method(&self) -> &'static str {
        match self {
            Challenge::HttpAuth { .. } => wire::method::ON_RECEIVED_HTTP_AUTH_REQUEST,
            Challenge::ServerTrust { .. } => wire::method::ON_RECEIVED_SERVER_TRUST_AUTH_REQUEST,
            Challenge::ClientCert { .. } => wire::method::ON_RECEIVED_CLIENT_CERT_REQUEST,
            Challenge::SafeBrowsing { .. } => wire::method::ON_SAFE_BROWSING_HIT,
            Challenge::FormResubmission { .. } => wire::method::ON_FORM_RESUBMISSION,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientCertSelection — authority-chosen client identity source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertSelection {
    pub certificate_path: String,
    pub certificate_password: Option<String>,
    pub key_store_type: Option<String>,
}

// ---------------------------------------------------------------------------
// InterceptedResponse — synthesized or authority-supplied resource response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedResponse {
    #[serde(default)]
    pub content_type: String,
    #[serde(rename = "contentEncoding", default = "default_charset")]
    pub charset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_phrase: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(rename = "data", with = "base64_bytes", default)]
    pub body: Vec<u8>,
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

impl InterceptedResponse {
    pub fn new(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            charset: default_charset(),
            status_code: None,
            reason_phrase: None,
            headers: HashMap::new(),
            body,
        }
    }

    /// Read a response out of an authority reply value. Absent, null, and
    /// wrong-typed fields fall back to defaults; only a non-object value
    /// yields `None`.
    pub fn from_payload(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let content_type = map
            .get(wire::key::CONTENT_TYPE)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let charset = map
            .get(wire::key::CONTENT_ENCODING)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(default_charset);
        let status_code = map
            .get(wire::key::STATUS_CODE)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok());
        let reason_phrase = map
            .get(wire::key::REASON_PHRASE)
            .and_then(Value::as_str)
            .map(str::to_string);
        let headers = map
            .get(wire::key::HEADERS)
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let body = map.get(wire::key::DATA).map(decode_body).unwrap_or_default();
        Some(Self {
            content_type,
            charset,
            status_code,
            reason_phrase,
            headers,
            body,
        })
    }
}

/// Body bytes arrive either base64-encoded or as a plain integer array,
/// depending on the channel implementation.
fn decode_body(value: &Value) -> Vec<u8> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    match value {
        Value::String(encoded) => BASE64.decode(encoded).unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|byte| u8::try_from(byte).ok())
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// RendererExitDetail / KeyEvent — engine notifications carried verbatim
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererExitDetail {
    pub did_crash: bool,
    pub renderer_priority_at_exit: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: i32,
    pub is_down: bool,
}

// ---------------------------------------------------------------------------
// Base64 serialization helper for byte vectors
// ---------------------------------------------------------------------------

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(&s).map_err(serde::de::Error::custom)
    }
}
