//! Validated HTTP status codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Returned when a numeric code lies outside `100..=599`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("HTTP status code <{code}> is out of range [100, 599]")]
pub struct StatusCodeOutOfRange {
    pub code: u16,
}

/// An HTTP status code known to be in the legal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct HttpStatus(u16);

impl HttpStatus {
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const NO_CONTENT: Self = Self(204);
    pub const BAD_REQUEST: Self = Self(400);
    pub const REQUEST_TIMEOUT: Self = Self(408);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    pub const SERVICE_UNAVAILABLE: Self = Self(503);

    /// # Errors
    ///
    /// Returns `StatusCodeOutOfRange` for codes below 100 or above 599.
    pub fn new(code: u16) -> Result<Self, StatusCodeOutOfRange> {
        if (100..=599).contains(&code) {
            Ok(Self(code))
        } else {
            Err(StatusCodeOutOfRange { code })
        }
    }

    #[must_use]
    pub fn code(self) -> u16 {
        self.0
    }

    /// 2xx.
    #[must_use]
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    #[must_use]
    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.0)
    }

    #[must_use]
    pub fn is_server_error(self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl TryFrom<u16> for HttpStatus {
    type Error = StatusCodeOutOfRange;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.0
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
