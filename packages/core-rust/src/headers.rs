//! Case-insensitive signal headers.
//!
//! Header names are normalized to lower case on insertion, so lookups never
//! depend on the casing a transport or a client happened to use.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::content_type::ContentType;

/// Well-known header names.
pub mod names {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CORRELATION_ID: &str = "correlation-id";
    pub const CHANNEL: &str = "channel";
    pub const STATUS: &str = "status";
}

/// Channel a thing signal travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Persisted digital-twin state.
    Twin,
    /// Routed to the device, not persisted.
    Live,
}

impl Channel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Twin => "twin",
            Self::Live => "live",
        }
    }

    /// Parses a channel name, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("twin") {
            Some(Self::Twin)
        } else if value.eq_ignore_ascii_case("live") {
            Some(Self::Live)
        } else {
            None
        }
    }
}

/// Immutable-by-convention header map with lower-cased keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.get(names::CORRELATION_ID)
    }

    /// Raw `content-type` header value.
    #[must_use]
    pub fn content_type_raw(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }

    /// Parsed `content-type` header, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type_raw().map(ContentType::parse)
    }

    /// Whether the content type declares the Ditto protocol envelope format.
    #[must_use]
    pub fn is_ditto_protocol(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.is_ditto_protocol())
    }

    /// Channel declared by the `channel` header. Defaults to twin.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.get(names::CHANNEL)
            .and_then(Channel::parse)
            .unwrap_or(Channel::Twin)
    }

    #[must_use]
    pub fn is_channel_live(&self) -> bool {
        self.channel() == Channel::Live
    }

    /// Returns a copy of `self` overlaid with every entry of `other`.
    #[must_use]
    pub fn merged_with(&self, other: &Headers) -> Headers {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.insert(name, value);
        }
        merged
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Envelopes may carry non-string header values (e.g. booleans); keep their JSON text.
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect())
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}
