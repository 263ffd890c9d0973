//! Wire-level vocabulary for the authority channel.
//!
//! Method and field names are part of the external contract with the policy
//! authority and must not drift. Byte-valued fields travel base64-encoded.

/// Methods invoked on the authority channel.
pub mod method {
    // Decision requests (a reply is expected).
    pub const SHOULD_OVERRIDE_URL_LOADING: &str = "shouldOverrideUrlLoading";
    pub const ON_RECEIVED_HTTP_AUTH_REQUEST: &str = "onReceivedHttpAuthRequest";
    pub const ON_RECEIVED_SERVER_TRUST_AUTH_REQUEST: &str = "onReceivedServerTrustAuthRequest";
    pub const ON_RECEIVED_CLIENT_CERT_REQUEST: &str = "onReceivedClientCertRequest";
    pub const ON_SAFE_BROWSING_HIT: &str = "onSafeBrowsingHit";
    pub const ON_FORM_RESUBMISSION: &str = "onFormResubmission";
    pub const ON_LOAD_RESOURCE_CUSTOM_SCHEME: &str = "onLoadResourceCustomScheme";
    pub const SHOULD_INTERCEPT_RESPONSE: &str = "shouldInterceptResponse";

    // Notifications (fire-and-forget).
    pub const ON_LOAD_START: &str = "onLoadStart";
    pub const ON_LOAD_STOP: &str = "onLoadStop";
    pub const ON_UPDATE_VISITED_HISTORY: &str = "onUpdateVisitedHistory";
    pub const ON_LOAD_ERROR: &str = "onLoadError";
    pub const ON_LOAD_HTTP_ERROR: &str = "onLoadHttpError";
    pub const ON_ZOOM_SCALE_CHANGED: &str = "onZoomScaleChanged";
    pub const ON_PAGE_COMMIT_VISIBLE: &str = "onPageCommitVisible";
    pub const ON_RENDER_PROCESS_GONE: &str = "onRenderProcessGone";
    pub const ON_RECEIVED_LOGIN_REQUEST: &str = "onReceivedLoginRequest";
}

/// Payload and reply field names.
pub mod key {
    pub const ACTION: &str = "action";
    pub const URL: &str = "url";
    pub const METHOD: &str = "method";
    pub const HEADERS: &str = "headers";
    pub const REQUEST: &str = "request";
    pub const IS_FOR_MAIN_FRAME: &str = "isForMainFrame";
    pub const HAS_GESTURE: &str = "hasGesture";
    pub const IS_REDIRECT: &str = "isRedirect";

    pub const PROTECTION_SPACE: &str = "protectionSpace";
    pub const HOST: &str = "host";
    pub const PROTOCOL: &str = "protocol";
    pub const REALM: &str = "realm";
    pub const PORT: &str = "port";
    pub const CERTIFICATE: &str = "certificate";

    pub const PREVIOUS_FAILURE_COUNT: &str = "previousFailureCount";
    pub const PROPOSED_CREDENTIAL: &str = "proposedCredential";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const PERMANENT_PERSISTENCE: &str = "permanentPersistence";

    pub const PRINCIPALS: &str = "principals";
    pub const KEY_TYPES: &str = "keyTypes";
    pub const CERTIFICATE_PATH: &str = "certificatePath";
    pub const CERTIFICATE_PASSWORD: &str = "certificatePassword";
    pub const KEY_STORE_TYPE: &str = "keyStoreType";

    pub const THREAT_TYPE: &str = "threatType";
    pub const REPORT: &str = "report";

    pub const CONTENT_TYPE: &str = "contentType";
    pub const CONTENT_ENCODING: &str = "contentEncoding";
    pub const DATA: &str = "data";
    pub const STATUS_CODE: &str = "statusCode";
    pub const REASON_PHRASE: &str = "reasonPhrase";

    pub const CODE: &str = "code";
    pub const MESSAGE: &str = "message";
    pub const DESCRIPTION: &str = "description";
    pub const IS_RELOAD: &str = "isReload";
    pub const OLD_SCALE: &str = "oldScale";
    pub const NEW_SCALE: &str = "newScale";
    pub const DID_CRASH: &str = "didCrash";
    pub const RENDERER_PRIORITY_AT_EXIT: &str = "rendererPriorityAtExit";
    pub const ACCOUNT: &str = "account";
    pub const ARGS: &str = "args";
}
