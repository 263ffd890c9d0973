//! Fallback resource fetch for the interception pipeline.
//!
//! When the session intercepts all resource loads, main-frame GET requests
//! are fetched here, on the calling thread, with a secondary HTTP client
//! that never follows redirects. The raw exchange is then distilled into an
//! [`InterceptedResponse`] by [`synthesize_response`], which is a pure
//! function of (status, reason, headers, body) so its edge cases are
//! testable without a network.

use crate::error::{InterceptError, InterceptResult};
use ostiary_core::{InterceptedResponse, ResourceRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Charset applied when neither the content-type header nor the body
/// declares one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

// ---------------------------------------------------------------------------
// TlsVersion — allow-list entries for the secondary client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "1.0")]
    Tls10,
    #[serde(rename = "1.1")]
    Tls11,
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

impl TlsVersion {
    fn as_reqwest(self) -> reqwest::tls::Version {
        match self {
            TlsVersion::Tls10 => reqwest::tls::Version::TLS_1_0,
            TlsVersion::Tls11 => reqwest::tls::Version::TLS_1_1,
            TlsVersion::Tls12 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::Tls13 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceFetch — the secondary client behind a seam
// ---------------------------------------------------------------------------

/// One fetched resource, as close to the raw exchange as the pipeline
/// needs. Header entries keep arrival order; repeated names stay repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    /// `None` when the body could not be read at all.
    pub body: Option<Vec<u8>>,
}

impl FetchedResource {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub trait ResourceFetch: Send + Sync {
    /// Perform `request` without following redirects.
    fn fetch(&self, request: &ResourceRequest) -> InterceptResult<FetchedResource>;
}

/// Production fetcher backed by a blocking `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build the secondary client. `allowed_tls` restricts the negotiated
    /// TLS versions to the given allow-list; `None` or an empty list leaves
    /// the platform defaults in place.
    pub fn new(allowed_tls: Option<&[TlsVersion]>) -> InterceptResult<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(versions) = allowed_tls {
            if let Some(min) = versions.iter().min() {
                builder = builder.min_tls_version(min.as_reqwest());
            }
            if let Some(max) = versions.iter().max() {
                builder = builder.max_tls_version(max.as_reqwest());
            }
        }
        let client = builder
            .build()
            .map_err(|error| InterceptError::ClientInit(error.to_string()))?;
        Ok(Self { client })
    }
}

impl ResourceFetch for HttpFetcher {
    fn fetch(&self, request: &ResourceRequest) -> InterceptResult<FetchedResource> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|error| InterceptError::Fetch(error.to_string()))?;
        let mut call = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            call = call.header(name, value);
        }
        let response = call
            .send()
            .map_err(|error| InterceptError::Fetch(error.to_string()))?;

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = match response.bytes() {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(error) => {
                tracing::debug!(url = %request.url, error = %error, "Failed to read response body");
                None
            }
        };

        Ok(FetchedResource {
            status: status.as_u16(),
            reason,
            headers,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Response synthesis
// ---------------------------------------------------------------------------

/// Distill a fetched resource into the response description offered to the
/// policy authority. Returns `None` for anything the response type cannot
/// represent: 3xx statuses and absent or empty bodies.
pub fn synthesize_response(resource: &FetchedResource) -> Option<InterceptedResponse> {
    if (300..400).contains(&resource.status) {
        return None;
    }
    let body = resource.body.as_deref()?;
    if body.is_empty() {
        return None;
    }

    let (content_type, charset) = match resource.header_value("content-type") {
        Some(header) => split_content_type(header),
        None => (sniff_media_type(body), None),
    };
    let charset = charset.unwrap_or_else(|| DEFAULT_CHARSET.to_string());

    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in &resource.headers {
        headers
            .entry(name.clone())
            .and_modify(|joined| {
                joined.push_str("; ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.clone());
    }

    let (status_code, reason_phrase) = if (200..300).contains(&resource.status) {
        (None, None)
    } else {
        let reason = resource
            .reason
            .clone()
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", resource.status));
        (Some(resource.status), Some(reason))
    };

    Some(InterceptedResponse {
        content_type,
        charset,
        status_code,
        reason_phrase,
        headers,
        body: body.to_vec(),
    })
}

/// Split a content-type header into media type and charset parameter. The
/// first `;`-segment is the type; the last `charset=` parameter wins.
pub fn split_content_type(header: &str) -> (String, Option<String>) {
    let mut parts = header.split(';');
    let media_type = parts.next().unwrap_or("").trim().to_string();
    let mut charset = None;
    for part in parts {
        if let Some((name, value)) = part.split_once('=') {
            if name.trim().eq_ignore_ascii_case("charset") {
                charset = Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    (media_type, charset)
}

/// Media type declared by the body bytes themselves, for responses whose
/// content-type header is missing.
pub fn sniff_media_type(body: &[u8]) -> String {
    let content = body
        .strip_prefix([0xEF, 0xBB, 0xBF].as_slice())
        .unwrap_or(body);
    let start = content
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(content.len());
    let content = &content[start..];

    let media_type = match content.first() {
        Some(b'{') | Some(b'[') => "application/json",
        Some(b'<') => {
            if content.starts_with(b"<?xml") {
                "text/xml"
            } else {
                "text/html"
            }
        }
        _ => {
            if std::str::from_utf8(content).is_ok() {
                "text/plain"
            } else {
                "application/octet-stream"
            }
        }
    };
    media_type.to_string()
}
