//! Ordered query parameters.
//!
//! [`RequestParameters`] keeps insertion order, so a flattened query string is
//! stable for a given sequence of inserts. That matters for signing, where the
//! flattened target URL is what gets authorized.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::constants::DEFAULT_CLIENT_PARAMS;

// ============================================================================
// ParamValue
// ============================================================================

/// Scalar query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean, rendered as `true`/`false`.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// String.
    Str(Cow<'static, str>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<&'static str> for ParamValue {
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// ============================================================================
// RequestParameters
// ============================================================================

/// Ordered mapping from parameter name to scalar value.
///
/// Re-inserting an existing key replaces the value in its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    entries: Vec<(String, ParamValue)>,
}

// ============================================================================
// RequestParameters - Constructors
// ============================================================================

impl RequestParameters {
    /// Creates an empty parameter set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default client parameter set.
    #[must_use]
    pub fn client_defaults() -> Self {
        DEFAULT_CLIENT_PARAMS
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }
}

// ============================================================================
// RequestParameters - Accessors & Mutation
// ============================================================================

impl RequestParameters {
    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Returns the number of parameters.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a copy of `self` with `overrides` applied on top.
    #[must_use]
    pub fn merged(&self, overrides: Option<&RequestParameters>) -> Self {
        let mut merged = self.clone();
        if let Some(overrides) = overrides {
            for (key, value) in overrides.iter() {
                merged.insert(key, value.clone());
            }
        }
        merged
    }
}

// ============================================================================
// RequestParameters - Rendering
// ============================================================================

impl RequestParameters {
    /// Flattens to `k=v&k=v` with URL-encoded keys and values.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(&v.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Appends the flattened parameters to `url`.
    ///
    /// Returns `url` unchanged when the set is empty.
    #[must_use]
    pub fn append_to(&self, url: &str) -> String {
        if self.is_empty() {
            return url.to_string();
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{}", self.to_query_string())
    }

    /// Returns the parameters as string pairs for an HTTP query.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RequestParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// ============================================================================
// Tests
// ============================================================================
