// ==============================================================================
// cors.rs - Cross-Origin Policy Evaluation
// ==============================================================================
// Description: Origin allow-listing, preflight answers and CORS response headers
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Credentialed CORS: the allowed origin is always echoed back literally, never
// as `*`. Origins that match nothing get no CORS headers and the browser
// blocks the response on its side.
//
// ==============================================================================

use axum::{
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use regex::Regex;

use crate::error::ConfigError;

const VARY_VALUE: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

// ==============================================================================
// ORIGIN PATTERNS
// ==============================================================================

/// Origin glob such as `https://*.example.com` or `http://localhost:[3000,5173]`
///
/// `*` matches any run of characters. A trailing `:[*]` accepts any port (or
/// none), a trailing `:[p1,p2]` accepts only the listed ports.
#[derive(Debug, Clone)]
pub struct OriginPattern {
    raw: String,
    regex: Regex,
}

impl OriginPattern {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let raw = pattern.trim().trim_end_matches('/').to_string();
        let err = |reason: String| ConfigError::OriginPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(err("empty pattern".to_string()));
        }

        let (host_part, port_regex) = match raw.rfind(":[") {
            Some(idx) if raw.ends_with(']') => {
                let ports = &raw[idx + 2..raw.len() - 1];
                let port_regex = if ports == "*" {
                    r"(:\d+)?".to_string()
                } else {
                    let list: Vec<&str> = ports.split(',').map(str::trim).collect();
                    if list.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
                        return Err(err(format!("invalid port list [{}]", ports)));
                    }
                    format!(":({})", list.join("|"))
                };
                (&raw[..idx], port_regex)
            }
            _ => (raw.as_str(), String::new()),
        };

        let host_regex = host_part
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!("^{}{}$", host_regex, port_regex))
            .map_err(|e| err(e.to_string()))?;

        Ok(Self { raw, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, origin: &str) -> bool {
        self.regex.is_match(origin)
    }
}

// ==============================================================================
// POLICY
// ==============================================================================

/// Headers a cross-origin request may send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedHeaders {
    /// Echo whatever the preflight asked for
    Any,
    /// Lowercase header names
    List(Vec<String>),
}

/// Settings the policy is built from
#[derive(Debug, Clone)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub allowed_origin_patterns: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: AllowedHeaders,
    pub allow_credentials: bool,
    pub max_age_secs: Option<u64>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            // Accepts every http(s) origin; narrow via CORS_ALLOWED_ORIGIN_PATTERNS
            allowed_origin_patterns: vec!["http://*".to_string(), "https://*".to_string()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ],
            allowed_headers: AllowedHeaders::Any,
            allow_credentials: true,
            max_age_secs: Some(1800),
        }
    }
}

/// Compiled cross-origin policy, immutable after construction
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allowed_origin_patterns: Vec<OriginPattern>,
    allowed_methods: Vec<Method>,
    allowed_methods_header: HeaderValue,
    allowed_headers: AllowedHeaders,
    allow_credentials: bool,
    max_age_secs: Option<u64>,
}

impl CorsPolicy {
    pub fn new(settings: CorsSettings) -> Result<Self, ConfigError> {
        if settings.allow_credentials && settings.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::WildcardOriginWithCredentials);
        }

        let allowed_origin_patterns = settings
            .allowed_origin_patterns
            .iter()
            .map(|p| OriginPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        let methods = settings
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let allowed_methods_header =
            HeaderValue::from_str(&methods).map_err(|e| ConfigError::InvalidValue {
                key: "CORS_ALLOWED_METHODS",
                reason: e.to_string(),
            })?;

        Ok(Self {
            allowed_origins: settings
                .allowed_origins
                .iter()
                .map(|o| o.trim_end_matches('/').to_string())
                .collect(),
            allowed_origin_patterns,
            allowed_methods: settings.allowed_methods,
            allowed_methods_header,
            allowed_headers: settings.allowed_headers,
            allow_credentials: settings.allow_credentials,
            max_age_secs: settings.max_age_secs,
        })
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
            || self.allowed_origin_patterns.iter().any(|p| p.matches(origin))
    }

    /// Decides how a request should be treated with respect to CORS
    ///
    /// `request_method` and `request_headers` are the values of the
    /// `Access-Control-Request-Method` / `-Headers` headers, if sent.
    pub fn evaluate(
        &self,
        origin: Option<&str>,
        method: &Method,
        request_method: Option<&str>,
        request_headers: Option<&str>,
    ) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision::SameOrigin;
        };

        let preflight = *method == Method::OPTIONS && request_method.is_some();

        if !self.origin_allowed(origin) {
            return CorsDecision::Rejected { preflight };
        }
        let Ok(echoed_origin) = HeaderValue::from_str(origin) else {
            return CorsDecision::Rejected { preflight };
        };

        if preflight {
            let method_ok = request_method
                .and_then(|m| Method::from_bytes(m.trim().as_bytes()).ok())
                .is_some_and(|m| self.allowed_methods.contains(&m));
            if !method_ok {
                return CorsDecision::Rejected { preflight };
            }
        }

        let Some(allowed_headers) = self.negotiate_headers(request_headers) else {
            return CorsDecision::Rejected { preflight };
        };

        CorsDecision::Allowed(CorsGrant {
            preflight,
            echoed_origin,
            allowed_methods: self.allowed_methods_header.clone(),
            allowed_headers,
            allow_credentials: self.allow_credentials,
            max_age_secs: self.max_age_secs.filter(|_| preflight),
        })
    }

    /// Convenience wrapper reading the relevant request headers
    pub fn evaluate_request(&self, method: &Method, headers: &HeaderMap) -> CorsDecision {
        let get = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        self.evaluate(
            get(header::ORIGIN),
            method,
            get(header::ACCESS_CONTROL_REQUEST_METHOD),
            get(header::ACCESS_CONTROL_REQUEST_HEADERS),
        )
    }

    fn negotiate_headers(&self, requested: Option<&str>) -> Option<HeaderValue> {
        let requested = requested.map(str::trim).filter(|r| !r.is_empty());

        match (&self.allowed_headers, requested) {
            (AllowedHeaders::Any, Some(requested)) => HeaderValue::from_str(requested).ok(),
            (AllowedHeaders::Any, None) => Some(HeaderValue::from_static("*")),
            (AllowedHeaders::List(list), Some(requested)) => {
                let all_allowed = requested
                    .split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .all(|h| list.contains(&h));
                all_allowed
                    .then(|| HeaderValue::from_str(requested).ok())
                    .flatten()
            }
            (AllowedHeaders::List(list), None) => HeaderValue::from_str(&list.join(",")).ok(),
        }
    }
}

// ==============================================================================
// DECISION
// ==============================================================================

/// Headers granted to an allowed cross-origin request
#[derive(Debug, Clone)]
pub struct CorsGrant {
    pub preflight: bool,
    pub echoed_origin: HeaderValue,
    pub allowed_methods: HeaderValue,
    pub allowed_headers: HeaderValue,
    pub allow_credentials: bool,
    pub max_age_secs: Option<u64>,
}

/// Per-request CORS outcome
#[derive(Debug, Clone)]
pub enum CorsDecision {
    /// No `Origin` header
    SameOrigin,
    /// Origin, method or headers not allowed
    Rejected { preflight: bool },
    Allowed(CorsGrant),
}

impl CorsDecision {
    pub fn allow(&self) -> bool {
        !matches!(self, CorsDecision::Rejected { .. })
    }

    pub fn is_preflight(&self) -> bool {
        match self {
            CorsDecision::SameOrigin => false,
            CorsDecision::Rejected { preflight } => *preflight,
            CorsDecision::Allowed(grant) => grant.preflight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CorsDecision::SameOrigin => "same_origin",
            CorsDecision::Rejected { .. } => "rejected",
            CorsDecision::Allowed(_) => "allowed",
        }
    }

    /// Response for requests answered without reaching the gate
    ///
    /// Only preflights are answered here: 200 with the negotiated headers, or
    /// 403 with an empty body when the preflight is not allowed.
    pub fn preflight_response(&self) -> Option<Response> {
        if !self.is_preflight() {
            return None;
        }

        let mut response = match self {
            CorsDecision::Allowed(_) => StatusCode::OK.into_response(),
            _ => StatusCode::FORBIDDEN.into_response(),
        };
        self.apply(response.headers_mut());
        Some(response)
    }

    /// Adds CORS headers to an outgoing response
    pub fn apply(&self, headers: &mut HeaderMap) {
        match self {
            CorsDecision::SameOrigin => {}
            CorsDecision::Rejected { .. } => {
                headers.append(header::VARY, HeaderValue::from_static(VARY_VALUE));
            }
            CorsDecision::Allowed(grant) => {
                headers.append(header::VARY, HeaderValue::from_static(VARY_VALUE));
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    grant.echoed_origin.clone(),
                );
                if grant.allow_credentials {
                    headers.insert(
                        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                        HeaderValue::from_static("true"),
                    );
                }
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    grant.allowed_methods.clone(),
                );
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    grant.allowed_headers.clone(),
                );
                if let Some(max_age) = grant.max_age_secs {
                    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(CorsSettings::default()).unwrap()
    }

    fn grant(decision: CorsDecision) -> CorsGrant {
        match decision {
            CorsDecision::Allowed(grant) => grant,
            other => panic!("expected allowed, got {:?}", other),
        }
    }

    #[test]
    fn test_no_origin_is_same_origin() {
        let decision = policy().evaluate(None, &Method::GET, None, None);
        assert!(matches!(decision, CorsDecision::SameOrigin));

        let mut headers = HeaderMap::new();
        decision.apply(&mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_default_patterns_accept_any_http_origin() {
        let policy = policy();
        for origin in [
            "https://app.example.com",
            "http://localhost:5173",
            "https://5174-cat-workspace.gitpod.io",
        ] {
            assert!(policy.origin_allowed(origin), "{} should be allowed", origin);
        }
        assert!(!policy.origin_allowed("null"));
        assert!(!policy.origin_allowed("file://"));
    }

    #[test]
    fn test_actual_request_echoes_origin_with_credentials() {
        let decision = policy().evaluate(Some("https://app.example.com"), &Method::POST, None, None);
        assert!(!decision.is_preflight());

        let mut headers = HeaderMap::new();
        decision.apply(&mut headers);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET,POST,PUT,DELETE,PATCH,OPTIONS"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert!(headers.get(header::ACCESS_CONTROL_MAX_AGE).is_none());
    }

    #[test]
    fn test_preflight_echoes_requested_headers() {
        let decision = policy().evaluate(
            Some("https://app.example.com"),
            &Method::OPTIONS,
            Some("POST"),
            Some("content-type, x-requested-with"),
        );
        let response = decision.preflight_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "content-type, x-requested-with"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "1800");
    }

    #[test]
    fn test_options_without_request_method_is_not_preflight() {
        let decision = policy().evaluate(Some("https://app.example.com"), &Method::OPTIONS, None, None);
        assert!(!decision.is_preflight());
        assert!(decision.preflight_response().is_none());
    }

    #[test]
    fn test_rejected_origin_gets_no_cors_headers() {
        let policy = CorsPolicy::new(CorsSettings {
            allowed_origin_patterns: vec!["https://*.example.com".to_string()],
            ..CorsSettings::default()
        })
        .unwrap();

        let decision = policy.evaluate(Some("https://evil.test"), &Method::GET, None, None);
        assert!(!decision.allow());

        let mut headers = HeaderMap::new();
        decision.apply(&mut headers);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn test_rejected_preflight_answers_forbidden() {
        let policy = CorsPolicy::new(CorsSettings {
            allowed_origin_patterns: vec!["https://*.example.com".to_string()],
            ..CorsSettings::default()
        })
        .unwrap();

        let decision = policy.evaluate(Some("https://evil.test"), &Method::OPTIONS, Some("GET"), None);
        let response = decision.preflight_response().unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_preflight_with_disallowed_method() {
        let decision = policy().evaluate(
            Some("https://app.example.com"),
            &Method::OPTIONS,
            Some("TRACE"),
            None,
        );
        assert!(!decision.allow());
        assert_eq!(decision.preflight_response().unwrap().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_header_list_restricts_preflight() {
        let policy = CorsPolicy::new(CorsSettings {
            allowed_headers: AllowedHeaders::List(vec!["content-type".to_string()]),
            ..CorsSettings::default()
        })
        .unwrap();

        let ok = policy.evaluate(Some("http://a.test"), &Method::OPTIONS, Some("POST"), Some("Content-Type"));
        assert_eq!(grant(ok).allowed_headers, "Content-Type");

        let denied = policy.evaluate(Some("http://a.test"), &Method::OPTIONS, Some("POST"), Some("X-Secret"));
        assert!(!denied.allow());
    }

    #[test]
    fn test_origin_pattern_ports() {
        let any_port = OriginPattern::parse("http://localhost:[*]").unwrap();
        assert!(any_port.matches("http://localhost"));
        assert!(any_port.matches("http://localhost:5173"));
        assert!(!any_port.matches("http://localhost.evil.test"));

        let listed = OriginPattern::parse("https://*.example.com:[443,8443]").unwrap();
        assert!(listed.matches("https://app.example.com:8443"));
        assert!(!listed.matches("https://app.example.com:9000"));
        assert!(!listed.matches("https://app.example.com"));

        assert!(OriginPattern::parse("https://x:[80,abc]").is_err());
    }

    #[test]
    fn test_pattern_escapes_regex_metacharacters() {
        let pattern = OriginPattern::parse("https://app.example.com/").unwrap();
        assert_eq!(pattern.as_str(), "https://app.example.com");
        assert!(pattern.matches("https://app.example.com"));
        assert!(!pattern.matches("https://appxexample.com"));
    }

    #[test]
    fn test_wildcard_origin_with_credentials_rejected() {
        let result = CorsPolicy::new(CorsSettings {
            allowed_origins: vec!["*".to_string()],
            ..CorsSettings::default()
        });
        assert!(matches!(result, Err(ConfigError::WildcardOriginWithCredentials)));

        let without_credentials = CorsPolicy::new(CorsSettings {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
            ..CorsSettings::default()
        });
        assert!(without_credentials.is_ok());
    }

    #[test]
    fn test_wildcard_pattern_still_echoes_literal_origin() {
        let policy = CorsPolicy::new(CorsSettings {
            allowed_origin_patterns: vec!["*".to_string()],
            ..CorsSettings::default()
        })
        .unwrap();

        let grant = grant(policy.evaluate(Some("https://x.test"), &Method::GET, None, None));
        assert_eq!(grant.echoed_origin, "https://x.test");
    }

    #[test]
    fn test_evaluate_request_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://app.example.com"));
        headers.insert(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("DELETE"),
        );

        let decision = policy().evaluate_request(&Method::OPTIONS, &headers);
        assert!(decision.is_preflight());
        assert!(decision.allow());
    }
}
