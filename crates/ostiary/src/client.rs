//! Session dispatcher: rendering-engine callbacks in, policy decisions out.
//!
//! One `EngineClient` serves one engine session. Engine callbacks arrive on
//! the engine's own dispatcher thread; authority replies may arrive on any
//! thread, so applied decisions go through a weak handle that a disposed
//! session invalidates.

use crate::config::SessionOptions;
use crate::error::OstiaryResult;
use crate::negotiation::AuthNegotiation;
use crate::observer::{NavigationObserver, ObserverSet};
use ostiary_bridge::payload;
use ostiary_bridge::{
    ChallengeDecision, ClientCertDecision, DecisionBridge, FormResubmissionDecision,
    HttpAuthDecision, NavigationDecision, SafeBrowsingDecision, ServerTrustDecision,
};
use ostiary_core::wire::method;
use ostiary_core::{
    AuthorityChannel, Certificate, Challenge, ClientCertResponder, ContentFilter, CookieJar,
    CoreError, CoreResult, CredentialStore, EngineSink, FormResubmissionResponder,
    HttpAuthResponder, InMemoryCredentialStore, InterceptedResponse, KeyEvent, NavigationAction,
    ProtectionSpace, RendererExitDetail, ResourceRequest, SafeBrowsingResponder, ScriptContext,
    ServerTrustResponder, ThreatType,
};
use ostiary_intercept::{HttpFetcher, InterceptPipeline, ResourceFetch};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// SessionBuilder — collaborator wiring for one engine session
// ---------------------------------------------------------------------------

/// Builds an [`EngineClient`]. The authority channel and the engine sink
/// are mandatory; every other collaborator has a working default.
pub struct SessionBuilder {
    channel: Arc<dyn AuthorityChannel>,
    sink: Arc<dyn EngineSink>,
    options: SessionOptions,
    credential_store: Option<Arc<dyn CredentialStore>>,
    content_filter: Option<Arc<dyn ContentFilter>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    script_context: Option<Arc<dyn ScriptContext>>,
    fetcher: Option<Arc<dyn ResourceFetch>>,
}

impl SessionBuilder {
    pub fn new(channel: Arc<dyn AuthorityChannel>, sink: Arc<dyn EngineSink>) -> Self {
        Self {
            channel,
            sink,
            options: SessionOptions::default(),
            credential_store: None,
            content_filter: None,
            cookie_jar: None,
            script_context: None,
            fetcher: None,
        }
    }

    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn content_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.content_filter = Some(filter);
        self
    }

    pub fn cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn script_context(mut self, scripts: Arc<dyn ScriptContext>) -> Self {
        self.script_context = Some(scripts);
        self
    }

    /// Replace the fallback-fetch client, primarily for tests.
    pub fn fetcher(mut self, fetcher: Arc<dyn ResourceFetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn build(self) -> OstiaryResult<EngineClient> {
        self.options.validate()?;
        let subframe_pattern = self.options.subframe_matcher()?;
        let fetcher: Arc<dyn ResourceFetch> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(
                self.options.allowed_tls_versions.as_deref(),
            )?),
        };
        let store = self
            .credential_store
            .unwrap_or_else(|| Arc::new(InMemoryCredentialStore::new()));
        let mut pipeline = InterceptPipeline::new(
            self.channel.clone(),
            fetcher,
            self.options.intercept_options(),
        );
        if let Some(filter) = self.content_filter {
            pipeline = pipeline.with_filter(filter);
        }
        if let Some(jar) = &self.cookie_jar {
            pipeline = pipeline.with_cookie_jar(jar.clone());
        }
        Ok(EngineClient {
            inner: Arc::new(ClientInner {
                bridge: DecisionBridge::new(self.channel),
                sink: self.sink,
                negotiation: AuthNegotiation::new(store),
                observers: ObserverSet::new(),
                pipeline,
                scripts: self.script_context,
                cookie_jar: self.cookie_jar,
                subframe_pattern,
                options: self.options,
                disposed: AtomicBool::new(false),
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// EngineClient — per-session dispatcher
// ---------------------------------------------------------------------------

struct ClientInner {
    bridge: DecisionBridge,
    sink: Arc<dyn EngineSink>,
    negotiation: AuthNegotiation,
    observers: ObserverSet,
    pipeline: InterceptPipeline,
    scripts: Option<Arc<dyn ScriptContext>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    subframe_pattern: Option<Regex>,
    options: SessionOptions,
    disposed: AtomicBool,
}

impl ClientInner {
    /// Host-only challenges carry no scheme or port; derive them from the
    /// view's current URL, keeping the callback's host. The view's peer
    /// certificate rides along as trust context.
    fn space_from_view(&self, host: &str, realm: Option<&str>) -> CoreResult<ProtectionSpace> {
        let current = self
            .sink
            .current_url()
            .ok_or_else(|| CoreError::Engine("no current URL".to_string()))?;
        let derived = ProtectionSpace::from_url(&current, realm.map(str::to_string), None)?;
        Ok(ProtectionSpace {
            host: host.to_string(),
            protocol: derived.protocol,
            realm: derived.realm,
            port: derived.port,
            certificate: self.sink.peer_certificate(),
        })
    }
}

/// Routes one rendering-engine session's callbacks through the decision
/// bridge and applies the authority's answers to the engine.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct EngineClient {
    inner: Arc<ClientInner>,
}

impl EngineClient {
    pub fn builder(channel: Arc<dyn AuthorityChannel>, sink: Arc<dyn EngineSink>) -> SessionBuilder {
        SessionBuilder::new(channel, sink)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    pub fn register_observer(&self, observer: Arc<dyn NavigationObserver>) {
        self.inner.observers.register(observer);
    }

    // -----------------------------------------------------------------------
    // Navigation gate
    // -----------------------------------------------------------------------

    /// Answer the engine's synchronous "should this load be taken over"
    /// query and, when gating is on, ask the authority in the background.
    ///
    /// The return value tells the engine to abandon its own load. Main-frame
    /// loads are always claimed while the gate is on; the authority's Allow
    /// re-issues them through the sink. Sub-frame loads cannot be re-issued,
    /// so they are only claimed (cancelled) when they match the configured
    /// pattern.
    pub fn should_override_url_loading(&self, action: &NavigationAction) -> bool {
        if !self.inner.options.use_should_override_url_loading {
            return false;
        }

        let inner = Arc::downgrade(&self.inner);
        let url = action.request.url.clone();
        let headers = action.request.headers.clone();
        let is_main_frame = action.is_main_frame;
        self.inner.bridge.ask_navigation(action, move |decision| {
            let Some(inner) = inner.upgrade() else { return };
            if inner.disposed.load(Ordering::SeqCst) {
                return;
            }
            if decision == NavigationDecision::Allow && is_main_frame {
                inner.sink.navigate(&url, &headers);
            }
        });

        match &self.inner.subframe_pattern {
            Some(pattern) => action.is_main_frame || pattern.is_match(&action.request.url),
            None => action.is_main_frame,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle events
    // -----------------------------------------------------------------------

    pub fn on_page_started(&self, url: &str) {
        self.inner.negotiation.reset();
        if let Some(scripts) = &self.inner.scripts {
            scripts.reset();
            if let Some(source) = scripts.document_start_source() {
                self.inner.sink.evaluate_script(&source);
            }
        }
        self.inner
            .observers
            .each(|observer| observer.on_navigation_started(url));
        self.inner
            .bridge
            .notify(method::ON_LOAD_START, payload::url_only(url));
    }

    pub fn on_page_finished(&self, url: &str) {
        // Covers challenge sequences that never saw a fresh start.
        self.inner.negotiation.reset();
        if let Some(scripts) = &self.inner.scripts {
            if let Some(source) = scripts.document_end_source() {
                self.inner.sink.evaluate_script(&source);
            }
        }
        self.inner
            .observers
            .each(|observer| observer.on_navigation_finished(url));
        if let Some(jar) = &self.inner.cookie_jar {
            jar.flush();
        }
        self.inner
            .bridge
            .notify(method::ON_LOAD_STOP, payload::url_only(url));
    }

    /// The engine's callback argument can lag a redirect; the sink's
    /// current URL wins when it is available.
    pub fn on_update_visited_history(&self, url: Option<&str>, is_reload: bool) {
        let current = self.inner.sink.current_url();
        let reported = current.as_deref().or(url);
        self.inner
            .observers
            .each(|observer| observer.on_visited_history(reported, is_reload));
        self.inner.bridge.notify(
            method::ON_UPDATE_VISITED_HISTORY,
            payload::visited_history(reported, is_reload),
        );
    }

    pub fn on_load_error(&self, url: &str, code: i64, message: &str, is_main_frame: bool) {
        if is_main_frame {
            self.inner.negotiation.reset();
            if self.inner.options.disable_default_error_page {
                self.inner.sink.stop_loading();
                self.inner.sink.blank();
            }
        }
        self.inner
            .observers
            .each(|observer| observer.on_load_error(url, code, message));
        self.inner
            .bridge
            .notify(method::ON_LOAD_ERROR, payload::load_error(url, code, message));
    }

    /// Sub-frame HTTP errors are the sub-document's own business and are
    /// not reported.
    pub fn on_http_error(&self, url: &str, status_code: u16, description: &str, is_main_frame: bool) {
        if !is_main_frame {
            return;
        }
        self.inner
            .observers
            .each(|observer| observer.on_http_error(url, status_code, description));
        self.inner.bridge.notify(
            method::ON_LOAD_HTTP_ERROR,
            payload::http_error(url, status_code, description),
        );
    }

    pub fn on_page_commit_visible(&self, url: &str) {
        self.inner
            .observers
            .each(|observer| observer.on_page_commit_visible(url));
        self.inner
            .bridge
            .notify(method::ON_PAGE_COMMIT_VISIBLE, payload::url_only(url));
    }

    pub fn on_zoom_scale_changed(&self, old_scale: f64, new_scale: f64) {
        self.inner
            .observers
            .each(|observer| observer.on_zoom_changed(old_scale, new_scale));
        self.inner.bridge.notify(
            method::ON_ZOOM_SCALE_CHANGED,
            payload::zoom_change(old_scale, new_scale),
        );
    }

    pub fn on_received_login_request(&self, realm: &str, account: Option<&str>, args: &str) {
        self.inner
            .observers
            .each(|observer| observer.on_login_request(realm, account, args));
        self.inner.bridge.notify(
            method::ON_RECEIVED_LOGIN_REQUEST,
            payload::login_request(realm, account, args),
        );
    }

    /// Returns whether the session claims the crash as handled. `false`
    /// leaves the engine's default teardown in place.
    pub fn on_render_process_gone(&self, detail: &RendererExitDetail) -> bool {
        self.inner
            .observers
            .each(|observer| observer.on_renderer_exit(detail));
        if !self.inner.options.handle_renderer_exit {
            return false;
        }
        self.inner.bridge.notify(
            method::ON_RENDER_PROCESS_GONE,
            payload::renderer_exit(detail),
        );
        true
    }

    /// Key events have no wire method; observers only.
    pub fn on_unhandled_key_event(&self, event: &KeyEvent) {
        self.inner
            .observers
            .each(|observer| observer.on_key_event(event));
    }

    // -----------------------------------------------------------------------
    // Challenges
    // -----------------------------------------------------------------------

    pub fn on_received_http_auth_request(
        &self,
        host: &str,
        realm: Option<&str>,
        responder: Box<dyn HttpAuthResponder>,
    ) {
        let space = match self.inner.space_from_view(host, realm) {
            Ok(space) => space,
            Err(error) => {
                tracing::warn!(host, error = %error, "HTTP auth challenge without a usable view URL");
                self.inner.negotiation.reset();
                responder.cancel();
                return;
            }
        };
        let (previous_failure_count, proposed_credential) =
            self.inner.negotiation.record_challenge(&space);
        let challenge = Challenge::HttpAuth {
            space: space.clone(),
            previous_failure_count,
            proposed_credential,
        };
        self.ask_challenge(challenge, move |inner, decision| {
            let ChallengeDecision::HttpAuth(decision) = decision else {
                return;
            };
            match decision {
                HttpAuthDecision::UseCredentials(credential) => {
                    if credential.persist {
                        if let Err(error) = inner.negotiation.persist(&space, &credential) {
                            tracing::warn!(host = %space.host, error = %error, "Credential persistence failed");
                        }
                    }
                    responder.proceed(&credential.username, credential.password.expose());
                }
                HttpAuthDecision::UseNextProposed => match inner.negotiation.pop_proposed() {
                    Some(credential) => {
                        responder.proceed(&credential.username, credential.password.expose());
                    }
                    None => {
                        inner.negotiation.reset();
                        responder.cancel();
                    }
                },
                HttpAuthDecision::Cancel => {
                    inner.negotiation.reset();
                    responder.cancel();
                }
                HttpAuthDecision::EngineDefault => responder.engine_default(),
            }
        });
    }

    pub fn on_received_server_trust_request(
        &self,
        url: &str,
        certificate: Option<Certificate>,
        responder: Box<dyn ServerTrustResponder>,
    ) {
        let space = match ProtectionSpace::from_url(url, None, certificate) {
            Ok(space) => space,
            Err(error) => {
                tracing::warn!(url, error = %error, "Server trust challenge with unparseable URL");
                self.inner.negotiation.reset();
                responder.cancel();
                return;
            }
        };
        self.ask_challenge(Challenge::ServerTrust { space }, move |_inner, decision| {
            let ChallengeDecision::ServerTrust(decision) = decision else {
                return;
            };
            match decision {
                ServerTrustDecision::Proceed => responder.proceed(),
                ServerTrustDecision::Cancel => responder.cancel(),
                ServerTrustDecision::EngineDefault => responder.engine_default(),
            }
        });
    }

    pub fn on_received_client_cert_request(
        &self,
        host: &str,
        port: Option<u16>,
        principals: Option<Vec<String>>,
        key_types: Option<Vec<String>>,
        responder: Box<dyn ClientCertResponder>,
    ) {
        let mut space = match self.inner.space_from_view(host, None) {
            Ok(space) => space,
            Err(error) => {
                tracing::warn!(host, error = %error, "Client cert challenge without a usable view URL");
                self.inner.negotiation.reset();
                responder.cancel();
                return;
            }
        };
        // The engine reports the port directly on this challenge.
        space.port = port;
        let challenge = Challenge::ClientCert {
            space,
            principals,
            key_types,
        };
        self.ask_challenge(challenge, move |_inner, decision| {
            let ChallengeDecision::ClientCert(decision) = decision else {
                return;
            };
            match decision {
                ClientCertDecision::Proceed(selection) => responder.proceed(selection),
                ClientCertDecision::Ignore => responder.ignore(),
                ClientCertDecision::Cancel => responder.cancel(),
                ClientCertDecision::EngineDefault => responder.engine_default(),
            }
        });
    }

    pub fn on_safe_browsing_hit(
        &self,
        url: &str,
        threat_code: i64,
        responder: Box<dyn SafeBrowsingResponder>,
    ) {
        let challenge = Challenge::SafeBrowsing {
            url: url.to_string(),
            threat_type: ThreatType::from_code(threat_code),
        };
        self.ask_challenge(challenge, move |_inner, decision| {
            let ChallengeDecision::SafeBrowsing(decision) = decision else {
                return;
            };
            match decision {
                SafeBrowsingDecision::BackToSafety { report } => responder.back_to_safety(report),
                SafeBrowsingDecision::Proceed { report } => responder.proceed(report),
                SafeBrowsingDecision::ShowInterstitial { report } => {
                    responder.show_interstitial(report)
                }
                SafeBrowsingDecision::EngineDefault => responder.engine_default(),
            }
        });
    }

    pub fn on_form_resubmission(&self, responder: Box<dyn FormResubmissionResponder>) {
        let url = self.inner.sink.current_url().unwrap_or_default();
        self.ask_challenge(Challenge::FormResubmission { url }, move |_inner, decision| {
            let ChallengeDecision::FormResubmission(decision) = decision else {
                return;
            };
            match decision {
                FormResubmissionDecision::Resend => responder.resend(),
                FormResubmissionDecision::DontResend => responder.dont_resend(),
                FormResubmissionDecision::EngineDefault => responder.engine_default(),
            }
        });
    }

    /// Send `challenge` through the bridge; `apply` runs once with the
    /// decision unless the session was disposed in the meantime.
    fn ask_challenge(
        &self,
        challenge: Challenge,
        apply: impl FnOnce(&ClientInner, ChallengeDecision) + Send + 'static,
    ) {
        let inner = Arc::downgrade(&self.inner);
        self.inner.bridge.ask(&challenge, move |decision| {
            let Some(inner) = inner.upgrade() else { return };
            if inner.disposed.load(Ordering::SeqCst) {
                return;
            }
            apply(&inner, decision);
        });
    }

    // -----------------------------------------------------------------------
    // Interception and disposal
    // -----------------------------------------------------------------------

    /// Resolve one resource load synchronously. Must not be called from the
    /// engine's own dispatcher thread; the pipeline blocks.
    pub fn intercept(
        &self,
        request: &ResourceRequest,
        is_main_frame: bool,
    ) -> Option<InterceptedResponse> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.pipeline.intercept(request, is_main_frame)
    }

    /// Detach the session from the engine. Pending authority replies become
    /// no-ops; responders held by them are dropped unresolved.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.observers.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}
