//! Pattern compilation.
//!
//! A route pattern is canonicalized and then expanded into an anchored regular
//! expression:
//!
//! | pattern              | matcher                                   |
//! |----------------------|-------------------------------------------|
//! | `/users`             | `^/users/?$`                              |
//! | `/users/:id`         | `^/users/(?P<id>[^/#?]+)/?$`              |
//! | `/files/(a\|b)/:name` | `^/files/(a\|b)/(?P<name>[^/#?]+)/?$`     |
//!
//! Literal text outside parentheses is escaped; text inside parentheses is
//! passed to the regex engine untouched. A pattern is *dynamic* when it has
//! at least one placeholder, regex group or backslash escape. Static patterns are looked up by
//! exact string comparison before any regex is run.

use regex::Regex;

use crate::error::{RouteError, RouteResult};
use crate::params::Params;
use crate::path::canonicalize;

/// Character class a placeholder captures.
const PARAM_CLASS: &str = "[^/#?]+";

/// A canonicalized and compiled route pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Canonical pattern text
    source: String,
    /// Key used to detect the same route registered twice
    identity: String,
    /// Anchored matcher
    matcher: Regex,
    /// Placeholder names in order of appearance
    params: Vec<String>,
    /// True if the pattern has placeholders, regex groups or escapes
    dynamic: bool,
}

impl CompiledPattern {
    /// Canonicalizes and compiles a pattern.
    ///
    /// # Example
    ///
    /// ```rust
    /// use falcon_router::CompiledPattern;
    ///
    /// let pattern = CompiledPattern::compile("user/:id/").unwrap();
    /// assert_eq!(pattern.as_str(), "/user/:id");
    /// assert!(pattern.is_dynamic());
    /// assert!(pattern.is_match("/user/42/"));
    /// assert!(!pattern.is_match("/user"));
    /// ```
    pub fn compile(pattern: &str) -> RouteResult<Self> {
        let source = canonicalize(pattern);
        if !parentheses_balanced(&source) {
            return Err(RouteError::UnbalancedParentheses {
                pattern: pattern.to_string(),
            });
        }

        let expansion = expand(&source);
        let matcher = Regex::new(&format!("^{}/?$", expansion.regex)).map_err(|source_err| {
            RouteError::InvalidPattern {
                pattern: source.clone(),
                source: source_err,
            }
        })?;

        let identity = if expansion.params.is_empty() {
            source.clone()
        } else {
            format!("{}/?", expansion.regex)
        };

        Ok(Self {
            dynamic: !expansion.params.is_empty() || expansion.has_group || expansion.has_escape,
            params: expansion.params,
            identity,
            matcher,
            source,
        })
    }

    /// Compiles `prefix` joined with this pattern.
    pub fn with_prefix(&self, prefix: &str) -> RouteResult<Self> {
        Self::compile(&format!("{}/{}", prefix, self.source))
    }

    /// Returns the canonical pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the key that identifies this route within a scope.
    ///
    /// For static patterns this is the canonical text itself; for patterns
    /// with placeholders it is the expanded regex source.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns true if matching requires the regex.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Returns the placeholder names in order of appearance.
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// Returns the compiled matcher.
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Returns true if `path` matches this pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Matches `path` and returns every named capture.
    ///
    /// Named groups written directly inside a regex fragment are returned
    /// alongside placeholder captures.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;
        let mut params = Params::new();
        for name in self.matcher.capture_names().flatten() {
            if let Some(value) = caps.name(name) {
                params.push(name, value.as_str());
            }
        }
        Some(params)
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for CompiledPattern {}

struct Expansion {
    regex: String,
    params: Vec<String>,
    has_group: bool,
    has_escape: bool,
}

fn is_label_char(c: char) -> bool {
    !matches!(c, '/' | '#' | '?' | '.' | '\\' | '(' | ')')
}

/// Expands placeholders and escapes literal text outside parentheses.
fn expand(source: &str) -> Expansion {
    let mut regex = String::with_capacity(source.len() * 2);
    let mut params = Vec::new();
    let mut has_group = false;
    let mut has_escape = false;
    let mut depth = 0usize;
    let mut chars = source.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // escapes are regex syntax, so the path never equals the source
                has_escape = true;
                regex.push('\\');
                if let Some(escaped) = chars.next() {
                    regex.push(escaped);
                }
            }
            '(' => {
                depth += 1;
                has_group = true;
                regex.push('(');
            }
            ')' => {
                depth = depth.saturating_sub(1);
                regex.push(')');
            }
            ':' if depth == 0 => {
                let mut label = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_label_char(next) {
                        break;
                    }
                    label.push(next);
                    chars.next();
                }
                if label.is_empty() {
                    regex.push(':');
                } else {
                    regex.push_str("(?P<");
                    regex.push_str(&label);
                    regex.push('>');
                    regex.push_str(PARAM_CLASS);
                    regex.push(')');
                    params.push(label);
                }
            }
            _ if depth > 0 => regex.push(c),
            _ => regex.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }

    Expansion {
        regex,
        params,
        has_group,
        has_escape,
    }
}

fn parentheses_balanced(source: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0
}
