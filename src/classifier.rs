// ==============================================================================
// classifier.rs - Request Path Classification
// ==============================================================================
// Description: Ordered rule table mapping (path, method) to an access outcome
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// Rules are evaluated in declaration order and the first match wins. A path
// that matches no rule is classified `RequiresAuth`.
//
// ==============================================================================

use axum::http::Method;
use serde::Serialize;

/// Access outcome assigned to every inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Bypasses the gate entirely (static resources, error page)
    Ignored,
    /// Reaches the handler regardless of session state
    Public,
    /// Requires a valid session
    RequiresAuth,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Ignored => "ignored",
            Classification::Public => "public",
            Classification::RequiresAuth => "requires_auth",
        }
    }
}

// ==============================================================================
// PATH PATTERNS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*` - exactly one segment
    Any,
}

/// Segment-wise path matcher
///
/// Supports literal segments, `*` for a single segment, and a trailing `/**`
/// which matches the prefix itself plus any number of further segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
    trailing_wildcard: bool,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let (body, trailing_wildcard) = match pattern.strip_suffix("/**") {
            Some(prefix) => (prefix, true),
            None => (pattern, false),
        };

        let segments = split_segments(body)
            .map(|s| match s {
                "*" => Segment::Any,
                other => Segment::Literal(other.to_string()),
            })
            .collect();

        Self {
            segments,
            trailing_wildcard,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split_segments(path).collect();

        if parts.len() < self.segments.len() {
            return false;
        }
        if !self.trailing_wildcard && parts.len() != self.segments.len() {
            return false;
        }

        self.segments
            .iter()
            .zip(parts.iter())
            .all(|(segment, part)| match segment {
                Segment::Any => true,
                Segment::Literal(lit) => lit == part,
            })
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

// ==============================================================================
// RULES
// ==============================================================================

/// Methods a rule applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    Any,
    Only(Vec<Method>),
}

impl MethodSet {
    pub fn contains(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Only(methods) => methods.contains(method),
        }
    }
}

/// One row of the rule table
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: PathPattern,
    pub methods: MethodSet,
    pub outcome: Classification,
}

impl Rule {
    pub fn new(pattern: &str, methods: MethodSet, outcome: Classification) -> Self {
        Self {
            pattern: PathPattern::new(pattern),
            methods,
            outcome,
        }
    }

    pub fn matches(&self, path: &str, method: &Method) -> bool {
        self.methods.contains(method) && self.pattern.matches(path)
    }
}

/// Immutable, ordered rule table
///
/// Built once at startup and shared by reference; `classify` is pure and
/// safe to call concurrently.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classifies a percent-decoded path without query string
    pub fn classify(&self, path: &str, method: &Method) -> Classification {
        self.rules
            .iter()
            .find(|rule| rule.matches(path, method))
            .map(|rule| rule.outcome)
            .unwrap_or(Classification::RequiresAuth)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        use Classification::{Ignored, Public, RequiresAuth};

        let any = |pattern: &str, outcome| Rule::new(pattern, MethodSet::Any, outcome);

        Self::new(vec![
            // Static resources and the error page never reach the gate
            any("/public/**", Ignored),
            any("/favicon.ico", Ignored),
            any("/assets/**", Ignored),
            any("/error", Ignored),
            any("/api/user/signup", Public),
            any("/api/user/login", Public),
            any("/api/user/reset-password", Public),
            // Cat profile image upload happens before signup completes
            any("/api/upload/cat-image", Public),
            any("/api/events/**", RequiresAuth),
            any("/api/user/**", RequiresAuth),
        ])
    }
}
