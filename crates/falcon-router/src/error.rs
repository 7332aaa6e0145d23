//! Registration errors.
//!
//! Every variant here is a build-time configuration error: it is raised while
//! routes are being registered or while the snapshot is built, and never while
//! a request is being matched.

use thiserror::Error;

use crate::method::RouteMethod;

/// Result type for registration operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while registering routes or building a router.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The expanded pattern is not a valid regular expression.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Canonical pattern as registered
        pattern: String,
        /// Underlying regex compilation error
        #[source]
        source: regex::Error,
    },

    /// The pattern contains an unmatched `(` or `)`.
    #[error("unbalanced parentheses in route pattern '{pattern}'")]
    UnbalancedParentheses {
        /// Pattern as given by the caller
        pattern: String,
    },

    /// A handler for this method is already registered at this pattern.
    #[error("method {method} already registered for '{pattern}'")]
    MethodConflict {
        /// Canonical pattern of the route
        pattern: String,
        /// The colliding method
        method: RouteMethod,
    },

    /// Two namespace prefixes overlap.
    #[error("namespace '{prefix}' overlaps registered namespace '{existing}'")]
    NamespaceOverlap {
        /// Prefix being registered
        prefix: String,
        /// Prefix already registered
        existing: String,
    },

    /// A namespace prefix contains placeholders or regex groups.
    #[error("namespace prefix '{prefix}' must be static")]
    DynamicNamespace {
        /// The offending prefix
        prefix: String,
    },

    /// The same full pattern is owned by two different groups.
    #[error("route '{pattern}' is registered by both group '{first}' and group '{second}'")]
    ShadowedPattern {
        /// Canonical pattern of the route
        pattern: String,
        /// Prefix of the group that registered it first
        first: String,
        /// Prefix of the group that registered it again
        second: String,
    },

    /// A method name that the router does not know.
    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),
}

impl RouteError {
    /// Creates a method conflict error.
    pub fn conflict(pattern: impl Into<String>, method: RouteMethod) -> Self {
        Self::MethodConflict {
            pattern: pattern.into(),
            method,
        }
    }

    /// Returns true for errors caused by two registrations colliding, as opposed
    /// to a single malformed registration.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::MethodConflict { .. } | Self::NamespaceOverlap { .. } | Self::ShadowedPattern { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let err = RouteError::conflict("/item", RouteMethod::Get);
        assert_eq!(err.to_string(), "method GET already registered for '/item'");
        assert!(err.is_conflict());
    }

    #[test]
    fn test_namespace_overlap_display() {
        let err = RouteError::NamespaceOverlap {
            prefix: "/api/v1".to_string(),
            existing: "/api".to_string(),
        };
        assert!(err.to_string().contains("'/api/v1'"));
        assert!(err.to_string().contains("'/api'"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_malformed_is_not_conflict() {
        let err = RouteError::UnbalancedParentheses {
            pattern: "/a/(b".to_string(),
        };
        assert!(!err.is_conflict());
    }
}
