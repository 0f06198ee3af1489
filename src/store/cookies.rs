//! Session cookie jar.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// CookieJar
// ============================================================================

/// Ordered `name=value` cookie store.
///
/// Rendered as a single `Cookie` header value for HTTP requests and the
/// transport handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cookie, replacing the value of an existing name in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.cookies.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    /// Returns the value of a cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v.as_str()))
    }

    /// Removes a cookie. Returns `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|(n, _)| n != name);
        self.cookies.len() != before
    }

    /// Absorbs one `Set-Cookie` header value.
    ///
    /// Only the leading `name=value` pair is kept; attributes are dropped.
    /// Returns `false` for a value without a name.
    pub fn absorb_set_cookie(&mut self, header: &str) -> bool {
        let pair = header.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return false;
        };

        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        self.set(name, value.trim());
        true
    }

    /// Returns the number of cookies.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` if the jar is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Renders the jar as one `Cookie` header value.
    ///
    /// Returns `None` when the jar is empty.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.cookies.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
