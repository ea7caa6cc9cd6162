//! Request header composition.
//!
//! Caller-supplied headers are merged with an `Authorization` header derived
//! from [`ClientOptions::authentication`]. A caller-supplied `Authorization`
//! header (any casing) always wins and suppresses synthesis.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::DownloadError;
use super::options::{Authentication, ClientOptions};

const AUTHORIZATION: &str = "Authorization";

/// A single caller-supplied header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header from name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Headers folded into a case-insensitive mapping.
///
/// Names keep the casing of their first occurrence and their position;
/// a later duplicate (any casing) replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedHeaders {
    entries: Vec<(String, String)>,
}

impl ComposedHeaders {
    /// Inserts or replaces a header, comparing names case-insensitively.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Looks up a header value by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Converts to a wire header map for a single request.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidHeader`] if a name or value is not valid HTTP.
    pub fn to_header_map(&self) -> Result<HeaderMap, DownloadError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DownloadError::invalid_header(name, e.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| DownloadError::invalid_header(name, e.to_string()))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

/// Merges caller headers with the authentication header derived from `options`.
///
/// When no header named `Authorization` (case-insensitive) is supplied:
/// - [`Authentication::Basic`] adds `Basic base64(username:password)`
/// - [`Authentication::OAuth`] adds `Bearer <token>`
/// - [`Authentication::None`] adds nothing
///
/// The result is empty when there are no caller headers and nothing was synthesized.
#[must_use]
pub fn compose_headers(headers: &[Header], options: &ClientOptions) -> ComposedHeaders {
    let caller_has_auth = headers
        .iter()
        .any(|header| header.name.eq_ignore_ascii_case(AUTHORIZATION));

    let synthesized = if caller_has_auth {
        None
    } else {
        authorization_value(options)
    };

    let mut composed = ComposedHeaders::default();
    for header in headers {
        composed.insert(header.name.clone(), header.value.clone());
    }
    if let Some(value) = synthesized {
        composed.insert(AUTHORIZATION, value);
    }

    debug!(
        count = composed.len(),
        caller_auth = caller_has_auth,
        scheme = ?options.authentication,
        "composed request headers"
    );
    composed
}

fn authorization_value(options: &ClientOptions) -> Option<String> {
    match options.authentication {
        Authentication::None => None,
        Authentication::Basic => {
            let credentials = format!("{}:{}", options.username, options.password);
            Some(format!("Basic {}", STANDARD.encode(ascii_bytes(&credentials))))
        }
        Authentication::OAuth => Some(format!("Bearer {}", options.token)),
    }
}

/// Single-byte ASCII encoding; characters outside ASCII become `?`.
fn ascii_bytes(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b'?'))
        .collect()
}
