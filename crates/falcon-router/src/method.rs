//! Per-route method tables.
//!
//! [`Actions`] maps each supported method to at most one handler. Handlers are
//! never overwritten: a second registration for a method is handed back to
//! the caller as a conflict, so the first registration always wins.

use std::fmt;
use std::str::FromStr;

use http::Method;

use crate::error::RouteError;

/// Methods a route can register a handler for.
///
/// `Any` is a wildcard consulted when the request method has no handler of
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// Wildcard
    Any,
}

impl RouteMethod {
    /// Every method in table order.
    pub const ALL: [RouteMethod; 8] = [
        RouteMethod::Get,
        RouteMethod::Put,
        RouteMethod::Post,
        RouteMethod::Patch,
        RouteMethod::Delete,
        RouteMethod::Head,
        RouteMethod::Options,
        RouteMethod::Any,
    ];

    /// Returns the upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "ANY",
        }
    }

    /// Maps a request method onto a table slot.
    ///
    /// Returns `None` for methods without a slot (TRACE, CONNECT, extensions);
    /// those can only be served by an `Any` handler.
    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::PUT => Some(Self::Put),
            Method::POST => Some(Self::Post),
            Method::PATCH => Some(Self::Patch),
            Method::DELETE => Some(Self::Delete),
            Method::HEAD => Some(Self::Head),
            Method::OPTIONS => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteMethod {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RouteError::UnsupportedMethod(s.to_string()))
    }
}

/// Handler table for a single route.
///
/// # Example
///
/// ```rust
/// use falcon_router::{Actions, RouteMethod};
/// use http::Method;
///
/// let mut actions = Actions::new();
/// assert!(actions.insert(RouteMethod::Get, "show").is_ok());
/// assert_eq!(actions.insert(RouteMethod::Get, "again"), Err("again"));
/// assert!(actions.insert(RouteMethod::Any, "fallback").is_ok());
///
/// assert_eq!(actions.resolve(&Method::GET), Some(&"show"));
/// assert_eq!(actions.resolve(&Method::DELETE), Some(&"fallback"));
/// ```
#[derive(Clone)]
pub struct Actions<H> {
    get: Option<H>,
    put: Option<H>,
    post: Option<H>,
    patch: Option<H>,
    delete: Option<H>,
    head: Option<H>,
    options: Option<H>,
    any: Option<H>,
}

impl<H> Default for Actions<H> {
    fn default() -> Self {
        Self {
            get: None,
            put: None,
            post: None,
            patch: None,
            delete: None,
            head: None,
            options: None,
            any: None,
        }
    }
}

impl<H> Actions<H> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with a single handler.
    pub fn single(method: RouteMethod, handler: H) -> Self {
        let mut actions = Self::new();
        *actions.slot_mut(method) = Some(handler);
        actions
    }

    fn slot(&self, method: RouteMethod) -> &Option<H> {
        match method {
            RouteMethod::Get => &self.get,
            RouteMethod::Put => &self.put,
            RouteMethod::Post => &self.post,
            RouteMethod::Patch => &self.patch,
            RouteMethod::Delete => &self.delete,
            RouteMethod::Head => &self.head,
            RouteMethod::Options => &self.options,
            RouteMethod::Any => &self.any,
        }
    }

    fn slot_mut(&mut self, method: RouteMethod) -> &mut Option<H> {
        match method {
            RouteMethod::Get => &mut self.get,
            RouteMethod::Put => &mut self.put,
            RouteMethod::Post => &mut self.post,
            RouteMethod::Patch => &mut self.patch,
            RouteMethod::Delete => &mut self.delete,
            RouteMethod::Head => &mut self.head,
            RouteMethod::Options => &mut self.options,
            RouteMethod::Any => &mut self.any,
        }
    }

    /// Registers a handler. If the slot is taken the handler is returned
    /// unchanged as the error.
    pub fn insert(&mut self, method: RouteMethod, handler: H) -> Result<(), H> {
        let slot = self.slot_mut(method);
        if slot.is_some() {
            return Err(handler);
        }
        *slot = Some(handler);
        Ok(())
    }

    /// Moves every handler of `other` into this table.
    ///
    /// Slots already filled here are kept; the methods whose handlers were
    /// dropped are returned.
    pub fn merge(&mut self, other: Actions<H>) -> Vec<RouteMethod> {
        let mut other = other;
        let mut conflicts = Vec::new();
        for method in RouteMethod::ALL {
            if let Some(handler) = other.slot_mut(method).take() {
                if self.insert(method, handler).is_err() {
                    conflicts.push(method);
                }
            }
        }
        conflicts
    }

    /// Returns the handler registered for exactly `method`.
    pub fn get(&self, method: RouteMethod) -> Option<&H> {
        self.slot(method).as_ref()
    }

    /// Returns the handler serving a request method, falling back to `Any`.
    pub fn resolve(&self, method: &Method) -> Option<&H> {
        RouteMethod::from_http(method)
            .and_then(|m| self.get(m))
            .or(self.any.as_ref())
    }

    /// Returns true if a handler is registered for `method`.
    pub fn contains(&self, method: RouteMethod) -> bool {
        self.slot(method).is_some()
    }

    /// Returns the registered methods in table order.
    pub fn methods(&self) -> Vec<RouteMethod> {
        RouteMethod::ALL
            .into_iter()
            .filter(|m| self.contains(*m))
            .collect()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        RouteMethod::ALL.iter().all(|m| !self.contains(*m))
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        RouteMethod::ALL.iter().filter(|m| self.contains(**m)).count()
    }
}

impl<H> fmt::Debug for Actions<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.methods()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip() {
        for method in RouteMethod::ALL {
            assert_eq!(method.as_str().parse::<RouteMethod>().unwrap(), method);
        }
        assert_eq!("get".parse::<RouteMethod>().unwrap(), RouteMethod::Get);
        assert!("TRACE".parse::<RouteMethod>().is_err());
    }

    #[test]
    fn test_from_http() {
        assert_eq!(RouteMethod::from_http(&Method::PATCH), Some(RouteMethod::Patch));
        assert_eq!(RouteMethod::from_http(&Method::TRACE), None);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut actions = Actions::new();
        actions.insert(RouteMethod::Post, 1).unwrap();
        assert_eq!(actions.insert(RouteMethod::Post, 2), Err(2));
        assert_eq!(actions.get(RouteMethod::Post), Some(&1));
    }

    #[test]
    fn test_merge_reports_conflicts() {
        let mut a = Actions::single(RouteMethod::Get, "a-get");
        a.insert(RouteMethod::Delete, "a-delete").unwrap();

        let mut b = Actions::single(RouteMethod::Get, "b-get");
        b.insert(RouteMethod::Put, "b-put").unwrap();

        let conflicts = a.merge(b);
        assert_eq!(conflicts, vec![RouteMethod::Get]);
        assert_eq!(a.get(RouteMethod::Get), Some(&"a-get"));
        assert_eq!(a.get(RouteMethod::Put), Some(&"b-put"));
        assert_eq!(
            a.methods(),
            vec![RouteMethod::Get, RouteMethod::Put, RouteMethod::Delete]
        );
    }

    #[test]
    fn test_resolve_falls_back_to_any() {
        let mut actions = Actions::single(RouteMethod::Any, "any");
        actions.insert(RouteMethod::Get, "get").unwrap();
        assert_eq!(actions.resolve(&Method::GET), Some(&"get"));
        assert_eq!(actions.resolve(&Method::POST), Some(&"any"));
        assert_eq!(actions.resolve(&Method::TRACE), Some(&"any"));
    }

    #[test]
    fn test_resolve_without_any() {
        let actions = Actions::single(RouteMethod::Head, ());
        assert!(actions.resolve(&Method::HEAD).is_some());
        assert!(actions.resolve(&Method::GET).is_none());
    }

    #[test]
    fn test_empty_and_len() {
        let mut actions: Actions<u8> = Actions::new();
        assert!(actions.is_empty());
        actions.insert(RouteMethod::Options, 0).unwrap();
        actions.insert(RouteMethod::Any, 1).unwrap();
        assert!(!actions.is_empty());
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_debug_lists_methods() {
        let actions = Actions::single(RouteMethod::Get, ());
        assert_eq!(format!("{actions:?}"), "{Get}");
    }
}
