//! The synchronous interception pipeline.
//!
//! The rendering engine demands an immediate `Option<InterceptedResponse>`
//! at the interception call site, which runs on an engine-provided resource
//! thread. Authority round-trips therefore block on a [`rendezvous`] with a
//! timeout. Every failure inside the pipeline degrades to `None`; nothing
//! here may abort a navigation.

use crate::error::InterceptError;
use crate::fetch::{synthesize_response, ResourceFetch};
use crate::rendezvous::rendezvous;
use ostiary_core::wire::{key, method};
use ostiary_core::{
    AuthorityChannel, AuthorityReply, ContentFilter, CookieJar, InterceptedResponse,
    ResourceRequest,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

const COOKIE_HEADER: &str = "Cookie";

// ---------------------------------------------------------------------------
// InterceptOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InterceptOptions {
    /// Schemes whose loads are answered by the authority instead of the
    /// engine.
    pub custom_schemes: Vec<String>,
    /// Offer every main-frame GET to the authority via a fallback fetch.
    pub intercept_all: bool,
    /// Upper bound for each blocking authority round-trip.
    pub reply_timeout: Duration,
}

impl Default for InterceptOptions {
    fn default() -> Self {
        Self {
            custom_schemes: Vec::new(),
            intercept_all: false,
            reply_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// InterceptPipeline
// ---------------------------------------------------------------------------

pub struct InterceptPipeline {
    channel: Arc<dyn AuthorityChannel>,
    fetcher: Arc<dyn ResourceFetch>,
    filter: Option<Arc<dyn ContentFilter>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    options: InterceptOptions,
}

impl InterceptPipeline {
    pub fn new(
        channel: Arc<dyn AuthorityChannel>,
        fetcher: Arc<dyn ResourceFetch>,
        options: InterceptOptions,
    ) -> Self {
        Self {
            channel,
            fetcher,
            filter: None,
            cookie_jar: None,
            options,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_cookie_jar(mut self, cookie_jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(cookie_jar);
        self
    }

    /// Resolve one resource load. `None` means the engine loads the
    /// resource itself.
    pub fn intercept(
        &self,
        request: &ResourceRequest,
        is_main_frame: bool,
    ) -> Option<InterceptedResponse> {
        if self.is_custom_scheme(&request.url) {
            return self.intercept_custom_scheme(request);
        }

        if let Some(response) = self.apply_filter(&request.url, None) {
            return Some(response);
        }

        if self.options.intercept_all && is_main_frame && request.is_get() {
            return self.intercept_via_fetch(request);
        }

        None
    }

    fn is_custom_scheme(&self, url: &str) -> bool {
        if self.options.custom_schemes.is_empty() {
            return false;
        }
        match url::Url::parse(url) {
            Ok(parsed) => self
                .options
                .custom_schemes
                .iter()
                .any(|scheme| scheme.eq_ignore_ascii_case(parsed.scheme())),
            Err(_) => false,
        }
    }

    /// Custom-scheme loads are answered by the authority with inline bytes.
    /// The content filter may still replace those bytes; a filter failure
    /// keeps them.
    fn intercept_custom_scheme(&self, request: &ResourceRequest) -> Option<InterceptedResponse> {
        let mut arguments = Map::new();
        arguments.insert(key::URL.to_string(), request.url.clone().into());
        let value = self.ask_blocking(
            method::ON_LOAD_RESOURCE_CUSTOM_SCHEME,
            Value::Object(arguments),
        )?;
        let inline = InterceptedResponse::from_payload(&value)?;

        if let Some(filtered) = self.apply_filter(&request.url, Some(&inline.content_type)) {
            return Some(filtered);
        }
        Some(inline)
    }

    /// Fetch the resource with the secondary client, describe it to the
    /// authority, and serve whatever the authority returns.
    fn intercept_via_fetch(&self, request: &ResourceRequest) -> Option<InterceptedResponse> {
        let mut request = request.clone();
        self.inject_cookies(&mut request);

        let resource = match self.fetcher.fetch(&request) {
            Ok(resource) => resource,
            Err(error) => {
                tracing::debug!(url = %request.url, error = %error, "Fallback fetch failed");
                return None;
            }
        };
        let synthesized = synthesize_response(&resource)?;

        let mut arguments = match serde_json::to_value(&synthesized) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        };
        arguments.insert(key::URL.to_string(), request.url.clone().into());

        let value = self.ask_blocking(method::SHOULD_INTERCEPT_RESPONSE, Value::Object(arguments))?;
        // The fetched bytes are never served directly; only an authority
        // decision is.
        InterceptedResponse::from_payload(&value)
    }

    /// Engine-managed cookies do not reach the secondary client on their
    /// own; copy them in unless the request already carries some.
    fn inject_cookies(&self, request: &mut ResourceRequest) {
        let Some(jar) = &self.cookie_jar else {
            return;
        };
        let already_present = request
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(COOKIE_HEADER));
        if already_present {
            return;
        }
        if let Some(cookie) = jar.cookies_for(&request.url) {
            request.headers.insert(COOKIE_HEADER.to_string(), cookie);
        }
    }

    fn apply_filter(
        &self,
        url: &str,
        declared_content_type: Option<&str>,
    ) -> Option<InterceptedResponse> {
        let filter = self.filter.as_ref()?;
        if !filter.has_rules() {
            return None;
        }
        match filter.evaluate(url, declared_content_type) {
            Ok(matched) => matched,
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "Content filter evaluation failed");
                None
            }
        }
    }

    /// One blocking authority round-trip. `None` on timeout, an abandoned
    /// reply, a channel failure, or an unhandled method.
    fn ask_blocking(&self, method: &'static str, arguments: Value) -> Option<Value> {
        let (completer, waiter) = rendezvous();
        self.channel.invoke(
            method,
            arguments,
            Box::new(move |reply| completer.complete(reply)),
        );
        let reply = match waiter.wait(self.options.reply_timeout) {
            Ok(reply) => reply,
            Err(error @ InterceptError::ReplyTimeout(_)) => {
                tracing::warn!(method, error = %error, "Blocking authority call timed out");
                return None;
            }
            Err(error) => {
                tracing::debug!(method, error = %error, "Blocking authority call abandoned");
                return None;
            }
        };
        match reply {
            AuthorityReply::Decision(value) => Some(value),
            AuthorityReply::Failed { code, message } => {
                tracing::warn!(
                    method,
                    code = %code,
                    message = message.as_deref().unwrap_or(""),
                    "Authority call failed"
                );
                None
            }
            AuthorityReply::Unhandled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedResource;
    use ostiary_core::{CoreError, CoreResult, ReplyHandler};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted channel: replies per method, records calls.
    struct ScriptedChannel {
        replies: HashMap<&'static str, AuthorityReply>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedChannel {
        fn new() -> Self {
            Self {
                replies: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_reply(mut self, method: &'static str, reply: AuthorityReply) -> Arc<Self> {
            self.replies.insert(method, reply);
            Arc::new(self)
        }

        fn silent(self) -> Arc<Self> {
            Arc::new(self)
        }
    }

    impl AuthorityChannel for ScriptedChannel {
        fn invoke(&self, method: &str, arguments: Value, reply: ReplyHandler) {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), arguments));
            match self.replies.get(method) {
                Some(scripted) => reply(scripted.clone()),
                // Dropping the handler wakes the waiter immediately.
                None => drop(reply),
            }
        }
    }

    struct StubFetcher {
        result: Option<FetchedResource>,
        requests: Mutex<Vec<ResourceRequest>>,
    }

    impl StubFetcher {
        fn returning(resource: FetchedResource) -> Arc<Self> {
            Arc::new(Self {
                result: Some(resource),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: None,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl ResourceFetch for StubFetcher {
        fn fetch(&self, request: &ResourceRequest) -> crate::error::InterceptResult<FetchedResource> {
            self.requests.lock().unwrap().push(request.clone());
            self.result
                .clone()
                .ok_or_else(|| InterceptError::Fetch("refused".to_string()))
        }
    }

    struct StubFilter {
        response: Option<InterceptedResponse>,
        fail: bool,
    }

    impl ContentFilter for StubFilter {
        fn has_rules(&self) -> bool {
            true
        }

        fn evaluate(
            &self,
            _url: &str,
            _declared_content_type: Option<&str>,
        ) -> CoreResult<Option<InterceptedResponse>> {
            if self.fail {
                return Err(CoreError::Filter("rule exploded".to_string()));
            }
            Ok(self.response.clone())
        }
    }

    struct StubJar(Option<String>);

    impl CookieJar for StubJar {
        fn cookies_for(&self, _url: &str) -> Option<String> {
            self.0.clone()
        }

        fn flush(&self) {}
    }

    fn custom_scheme_options() -> InterceptOptions {
        InterceptOptions {
            custom_schemes: vec!["app-assets".to_string()],
            intercept_all: false,
            reply_timeout: Duration::from_millis(200),
        }
    }

    fn intercept_all_options() -> InterceptOptions {
        InterceptOptions {
            custom_schemes: Vec::new(),
            intercept_all: true,
            reply_timeout: Duration::from_millis(200),
        }
    }

    fn html_resource() -> FetchedResource {
        FetchedResource {
            status: 200,
            reason: None,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Some(b"<html></html>".to_vec()),
        }
    }

    #[test]
    fn test_custom_scheme_served_from_authority_reply() {
        let channel = ScriptedChannel::new().with_reply(
            method::ON_LOAD_RESOURCE_CUSTOM_SCHEME,
            AuthorityReply::Decision(json!({
                "contentType": "text/css",
                "data": "Ym9keSB7fQ==",
            })),
        );
        let pipeline = InterceptPipeline::new(
            channel.clone(),
            StubFetcher::failing(),
            custom_scheme_options(),
        );

        let request = ResourceRequest::get("app-assets://styles/site.css");
        let response = pipeline.intercept(&request, false).unwrap();

        assert_eq!(response.content_type, "text/css");
        assert_eq!(response.body, b"body {}");
        let calls = channel.calls.lock().unwrap();
        assert_eq!(calls[0].0, "onLoadResourceCustomScheme");
        assert_eq!(calls[0].1["url"], "app-assets://styles/site.css");
    }

    #[test]
    fn test_custom_scheme_filter_match_replaces_inline_bytes() {
        let channel = ScriptedChannel::new().with_reply(
            method::ON_LOAD_RESOURCE_CUSTOM_SCHEME,
            AuthorityReply::Decision(json!({"contentType": "text/html", "data": "aGk="})),
        );
        let replacement = InterceptedResponse::new("text/plain", b"blocked".to_vec());
        let pipeline = InterceptPipeline::new(
            channel,
            StubFetcher::failing(),
            custom_scheme_options(),
        )
        .with_filter(Arc::new(StubFilter {
            response: Some(replacement.clone()),
            fail: false,
        }));

        let request = ResourceRequest::get("app-assets://index.html");
        assert_eq!(pipeline.intercept(&request, true), Some(replacement));
    }

    #[test]
    fn test_custom_scheme_filter_failure_keeps_inline_bytes() {
        let channel = ScriptedChannel::new().with_reply(
            method::ON_LOAD_RESOURCE_CUSTOM_SCHEME,
            AuthorityReply::Decision(json!({"contentType": "text/html", "data": "aGk="})),
        );
        let pipeline = InterceptPipeline::new(
            channel,
            StubFetcher::failing(),
            custom_scheme_options(),
        )
        .with_filter(Arc::new(StubFilter {
            response: None,
            fail: true,
        }));

        let request = ResourceRequest::get("app-assets://index.html");
        let response = pipeline.intercept(&request, true).unwrap();
        assert_eq!(response.body, b"hi");
    }

    #[test]
    fn test_custom_scheme_abandoned_reply_yields_none() {
        let channel = ScriptedChannel::new().silent();
        let pipeline = InterceptPipeline::new(
            channel,
            StubFetcher::failing(),
            custom_scheme_options(),
        );

        let request = ResourceRequest::get("app-assets://index.html");
        assert_eq!(pipeline.intercept(&request, true), None);
    }

    #[test]
    fn test_filter_short_circuits_ordinary_requests() {
        let channel = ScriptedChannel::new().silent();
        let blocked = InterceptedResponse::new("text/plain", Vec::new());
        let pipeline = InterceptPipeline::new(
            channel.clone(),
            StubFetcher::failing(),
            InterceptOptions::default(),
        )
        .with_filter(Arc::new(StubFilter {
            response: Some(blocked.clone()),
            fail: false,
        }));

        let request = ResourceRequest::get("https://ads.example/pixel.gif");
        assert_eq!(pipeline.intercept(&request, false), Some(blocked));
        // No authority call: the filter answered locally.
        assert!(channel.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_flow_serves_the_authority_decision() {
        let channel = ScriptedChannel::new().with_reply(
            method::SHOULD_INTERCEPT_RESPONSE,
            AuthorityReply::Decision(json!({
                "contentType": "text/html",
                "data": "cmVwbGFjZWQ=",
            })),
        );
        let fetcher = StubFetcher::returning(html_resource());
        let pipeline =
            InterceptPipeline::new(channel.clone(), fetcher.clone(), intercept_all_options());

        let request = ResourceRequest::get("https://example.com/");
        let response = pipeline.intercept(&request, true).unwrap();

        assert_eq!(response.body, b"replaced");
        let calls = channel.calls.lock().unwrap();
        assert_eq!(calls[0].0, "shouldInterceptResponse");
        assert_eq!(calls[0].1["contentType"], "text/html");
        assert_eq!(calls[0].1["url"], "https://example.com/");
        assert_eq!(calls[0].1["data"], "PGh0bWw+PC9odG1sPg==");
    }

    #[test]
    fn test_fetch_flow_null_decision_yields_none() {
        let channel = ScriptedChannel::new().with_reply(
            method::SHOULD_INTERCEPT_RESPONSE,
            AuthorityReply::Decision(Value::Null),
        );
        let fetcher = StubFetcher::returning(html_resource());
        let pipeline = InterceptPipeline::new(channel, fetcher, intercept_all_options());

        let request = ResourceRequest::get("https://example.com/");
        assert_eq!(pipeline.intercept(&request, true), None);
    }

    #[test]
    fn test_fetch_flow_skips_non_main_frame_and_non_get() {
        let fetcher = StubFetcher::returning(html_resource());
        let pipeline = InterceptPipeline::new(
            ScriptedChannel::new().silent(),
            fetcher.clone(),
            intercept_all_options(),
        );

        let get = ResourceRequest::get("https://example.com/");
        assert_eq!(pipeline.intercept(&get, false), None);

        let mut post = ResourceRequest::get("https://example.com/");
        post.method = "POST".to_string();
        assert_eq!(pipeline.intercept(&post, true), None);

        assert_eq!(fetcher.request_count(), 0);
    }

    #[test]
    fn test_fetch_flow_swallows_fetch_errors() {
        let pipeline = InterceptPipeline::new(
            ScriptedChannel::new().silent(),
            StubFetcher::failing(),
            intercept_all_options(),
        );

        let request = ResourceRequest::get("https://example.com/");
        assert_eq!(pipeline.intercept(&request, true), None);
    }

    #[test]
    fn test_fetch_flow_injects_cookies_once() {
        let channel = ScriptedChannel::new().with_reply(
            method::SHOULD_INTERCEPT_RESPONSE,
            AuthorityReply::Decision(Value::Null),
        );
        let fetcher = StubFetcher::returning(html_resource());
        let pipeline = InterceptPipeline::new(channel, fetcher.clone(), intercept_all_options())
            .with_cookie_jar(Arc::new(StubJar(Some("session=abc".to_string()))));

        let request = ResourceRequest::get("https://example.com/");
        pipeline.intercept(&request, true);

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(
            requests[0].headers.get("Cookie").map(String::as_str),
            Some("session=abc")
        );
    }

    #[test]
    fn test_fetch_flow_keeps_caller_cookies() {
        let channel = ScriptedChannel::new().with_reply(
            method::SHOULD_INTERCEPT_RESPONSE,
            AuthorityReply::Decision(Value::Null),
        );
        let fetcher = StubFetcher::returning(html_resource());
        let pipeline = InterceptPipeline::new(channel, fetcher.clone(), intercept_all_options())
            .with_cookie_jar(Arc::new(StubJar(Some("session=abc".to_string()))));

        let mut request = ResourceRequest::get("https://example.com/");
        request
            .headers
            .insert("cookie".to_string(), "mine=1".to_string());
        pipeline.intercept(&request, true);

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].headers.get("cookie").map(String::as_str), Some("mine=1"));
        assert!(requests[0].headers.get("Cookie").is_none());
    }
}
