//! Media type parsing and classification.

use std::fmt;

/// Content type of the Ditto protocol envelope.
pub const DITTO_PROTOCOL: &str = "application/vnd.eclipse.ditto+json";

/// Default for entities that declare no content type.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Default for text entities built without an explicit content type.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=UTF-8";

const TEXT_MEDIA_TYPES: &[&str] = &[
    "application/xml",
    "application/javascript",
    "application/x-www-form-urlencoded",
    "application/ecmascript",
];

/// How a payload with this content type should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingKind {
    Text,
    Json,
    DittoProtocol,
    Binary,
}

/// A parsed `type/subtype; param=value` media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    raw: String,
    media_type: String,
    charset: Option<String>,
    kind: ParsingKind,
}

impl ContentType {
    /// Parses a content-type header value. Never fails: unknown media types
    /// are classified as binary.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let media_type = parts
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let charset = parts.find_map(|param| {
            let (name, val) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| val.trim().trim_matches('"').to_ascii_lowercase())
        });
        let kind = classify_media_type(&media_type);
        Self {
            raw: value.trim().to_string(),
            media_type,
            charset,
            kind,
        }
    }

    #[must_use]
    pub fn application_octet_stream() -> Self {
        Self::parse(APPLICATION_OCTET_STREAM)
    }

    /// The header value as it was received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lower-cased `type/subtype` without parameters.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> ParsingKind {
        self.kind
    }

    /// JSON, including the Ditto protocol envelope.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self.kind, ParsingKind::Json | ParsingKind::DittoProtocol)
    }

    #[must_use]
    pub fn is_ditto_protocol(&self) -> bool {
        self.kind == ParsingKind::DittoProtocol
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.kind == ParsingKind::Binary
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == ParsingKind::Text
    }

    /// Decodes `bytes` using the declared charset. UTF-8 unless ISO-8859-1 is declared;
    /// invalid sequences are replaced rather than rejected.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.charset() {
            Some("iso-8859-1" | "latin1" | "l1") => bytes.iter().map(|&b| char::from(b)).collect(),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn classify_media_type(media_type: &str) -> ParsingKind {
    if media_type == DITTO_PROTOCOL {
        ParsingKind::DittoProtocol
    } else if media_type == "application/json" || media_type.ends_with("+json") {
        ParsingKind::Json
    } else if media_type.starts_with("text/") || TEXT_MEDIA_TYPES.contains(&media_type) {
        ParsingKind::Text
    } else {
        ParsingKind::Binary
    }
}
