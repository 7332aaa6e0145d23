//! Path canonicalization.
//!
//! Patterns and request paths are reduced to a single canonical form before
//! they are compiled or matched:
//!
//! - exactly one leading `/`, no trailing `/`, no empty segments
//! - `.` segments are dropped, `..` removes the previous segment
//! - text inside parentheses is copied verbatim, so a `/` inside a regex
//!   fragment such as `(a/b|c)` is not treated as a separator
//! - a backslash escapes the next character, so `\/` is not a separator either
//!
//! Canonicalization never fails. Unbalanced parentheses are reported later by
//! the pattern compiler.

/// Returns the canonical form of a route pattern or request path.
///
/// # Example
///
/// ```rust
/// use falcon_router::canonicalize;
///
/// assert_eq!(canonicalize(""), "/");
/// assert_eq!(canonicalize("a//b/"), "/a/b");
/// assert_eq!(canonicalize("/a/./b/../c"), "/a/c");
/// assert_eq!(canonicalize("/a/(x/y)/b"), "/a/(x/y)/b");
/// ```
pub fn canonicalize(path: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for segment in Segments::new(path) {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            other => kept.push(other),
        }
    }

    if kept.is_empty() {
        return "/".to_string();
    }

    let mut out = String::with_capacity(path.len() + 1);
    for segment in kept {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Returns true if `path` is already in canonical form.
pub fn is_canonical(path: &str) -> bool {
    canonicalize(path) == path
}

/// Splits a path on `/`, ignoring separators nested in parentheses or escaped
/// with a backslash.
struct Segments<'a> {
    path: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Segments<'a> {
    fn new(path: &'a str) -> Self {
        Self {
            path,
            pos: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }

        let bytes = self.path.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = start;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b'/' if depth == 0 => break,
                _ => {}
            }
            i += 1;
        }

        // Only ASCII bytes are ever inspected, so `end` is always a char boundary.
        let end = i.min(bytes.len());
        if end >= bytes.len() {
            self.done = true;
        } else {
            self.pos = end + 1;
        }
        Some(&self.path[start..end])
    }
}
