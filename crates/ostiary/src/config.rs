use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{OstiaryError, OstiaryResult};
use ostiary_intercept::{InterceptOptions, TlsVersion};
use regex::Regex;

/// Per-session behavior switches.
///
/// Loaded from a TOML file or built in code. Every switch defaults to the
/// engine's own behavior: a default-constructed session asks the authority
/// nothing and intercepts nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Gate main-frame navigations on the authority's decision.
    #[serde(default)]
    pub use_should_override_url_loading: bool,

    /// Cancel sub-frame loads whose URL matches this pattern. Only
    /// meaningful while the navigation gate is on.
    #[serde(default)]
    pub cancel_subframe_pattern: Option<String>,

    /// Schemes whose resource loads are answered by the authority.
    #[serde(default)]
    pub custom_schemes: Vec<String>,

    /// Offer every main-frame GET to the authority via the fallback fetch.
    #[serde(default)]
    pub intercept_all: bool,

    /// Upper bound for each blocking authority round-trip, in milliseconds.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Restrict the fallback fetch to these TLS versions. `None` keeps the
    /// platform defaults.
    #[serde(default)]
    pub allowed_tls_versions: Option<Vec<TlsVersion>>,

    /// Blank the page instead of showing the engine's built-in error page.
    #[serde(default)]
    pub disable_default_error_page: bool,

    /// Report renderer exits to the authority and claim the crash as
    /// handled.
    #[serde(default)]
    pub handle_renderer_exit: bool,
}

fn default_reply_timeout_ms() -> u64 {
    10_000
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            use_should_override_url_loading: false,
            cancel_subframe_pattern: None,
            custom_schemes: Vec::new(),
            intercept_all: false,
            reply_timeout_ms: default_reply_timeout_ms(),
            allowed_tls_versions: None,
            disable_default_error_page: false,
            handle_renderer_exit: false,
        }
    }
}

impl SessionOptions {
    /// Load options from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> OstiaryResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(OstiaryError::Io)?;
        let options: SessionOptions = toml::from_str(&contents)?;
        options.validate()?;
        Ok(options)
    }

    /// Write the options to a TOML file.
    pub fn save(&self, path: &Path) -> OstiaryResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| OstiaryError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(OstiaryError::Io)?;
        }
        std::fs::write(path, contents).map_err(OstiaryError::Io)?;
        Ok(())
    }

    /// Validate option values.
    pub fn validate(&self) -> OstiaryResult<()> {
        if self.reply_timeout_ms == 0 {
            return Err(OstiaryError::Config("reply_timeout_ms must be > 0".into()));
        }
        if let Some(pattern) = &self.cancel_subframe_pattern {
            Regex::new(pattern).map_err(|e| {
                OstiaryError::Config(format!("cancel_subframe_pattern is not a valid regex: {}", e))
            })?;
        }
        for scheme in &self.custom_schemes {
            if scheme.is_empty() || scheme.contains([':', '/']) {
                return Err(OstiaryError::Config(format!(
                    "custom scheme must be a bare scheme name, got '{}'",
                    scheme
                )));
            }
        }
        Ok(())
    }

    /// Compiled sub-frame cancel pattern, if one is configured.
    pub fn subframe_matcher(&self) -> OstiaryResult<Option<Regex>> {
        self.cancel_subframe_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    OstiaryError::Config(format!(
                        "cancel_subframe_pattern is not a valid regex: {}",
                        e
                    ))
                })
            })
            .transpose()
    }

    /// The interception slice of these options.
    pub fn intercept_options(&self) -> InterceptOptions {
        InterceptOptions {
            custom_schemes: self.custom_schemes.clone(),
            intercept_all: self.intercept_all,
            reply_timeout: Duration::from_millis(self.reply_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_options_change_nothing() {
        let options = SessionOptions::default();
        assert!(!options.use_should_override_url_loading);
        assert!(options.cancel_subframe_pattern.is_none());
        assert!(options.custom_schemes.is_empty());
        assert!(!options.intercept_all);
        assert_eq!(options.reply_timeout_ms, 10_000);
        assert!(options.allowed_tls_versions.is_none());
        assert!(!options.disable_default_error_page);
        assert!(!options.handle_renderer_exit);
    }

    #[test]
    fn test_options_from_toml() {
        let toml_str = r#"
use_should_override_url_loading = true
cancel_subframe_pattern = "^https://ads\\."
custom_schemes = ["app-assets"]
intercept_all = true
reply_timeout_ms = 2500
allowed_tls_versions = ["1.2", "1.3"]
"#;
        let options: SessionOptions = toml::from_str(toml_str).unwrap();
        assert!(options.use_should_override_url_loading);
        assert_eq!(
            options.cancel_subframe_pattern.as_deref(),
            Some("^https://ads\\.")
        );
        assert_eq!(options.custom_schemes, vec!["app-assets".to_string()]);
        assert!(options.intercept_all);
        assert_eq!(options.reply_timeout_ms, 2500);
        assert_eq!(
            options.allowed_tls_versions,
            Some(vec![TlsVersion::Tls12, TlsVersion::Tls13])
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let options = SessionOptions {
            reply_timeout_ms: 0,
            ..SessionOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_regex() {
        let options = SessionOptions {
            cancel_subframe_pattern: Some("(unclosed".to_string()),
            ..SessionOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_decorated_schemes() {
        for scheme in ["", "app:", "app://x"] {
            let options = SessionOptions {
                custom_schemes: vec![scheme.to_string()],
                ..SessionOptions::default()
            };
            assert!(options.validate().is_err(), "scheme: {scheme:?}");
        }
    }

    #[test]
    fn test_subframe_matcher_compiles_once() {
        let options = SessionOptions {
            cancel_subframe_pattern: Some("^https://ads\\.".to_string()),
            ..SessionOptions::default()
        };
        let matcher = options.subframe_matcher().unwrap().unwrap();
        assert!(matcher.is_match("https://ads.example/banner"));
        assert!(!matcher.is_match("https://example.com/"));
    }

    #[test]
    fn test_intercept_options_slice() {
        let options = SessionOptions {
            custom_schemes: vec!["app-assets".to_string()],
            intercept_all: true,
            reply_timeout_ms: 1500,
            ..SessionOptions::default()
        };
        let intercept = options.intercept_options();
        assert_eq!(intercept.custom_schemes, vec!["app-assets".to_string()]);
        assert!(intercept.intercept_all);
        assert_eq!(intercept.reply_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let options = SessionOptions::load(Path::new("/nonexistent/session.toml")).unwrap();
        assert!(!options.intercept_all);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("ostiary-test-config");
        let _ = std::fs::remove_dir_all(&dir);
        let path: PathBuf = dir.join("session.toml");

        let options = SessionOptions {
            use_should_override_url_loading: true,
            custom_schemes: vec!["app-assets".to_string()],
            reply_timeout_ms: 4000,
            ..SessionOptions::default()
        };
        options.save(&path).unwrap();
        let loaded = SessionOptions::load(&path).unwrap();

        assert!(loaded.use_should_override_url_loading);
        assert_eq!(loaded.custom_schemes, vec!["app-assets".to_string()]);
        assert_eq!(loaded.reply_timeout_ms, 4000);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
