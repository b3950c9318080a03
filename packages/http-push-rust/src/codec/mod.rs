//! Wire codec: outbound request construction and response body classification.
//!
//! - [`target`]: publish target addresses and the connection endpoint
//! - [`request`]: building a [`WireRequest`] from an external message
//! - [`body`]: classifying response entities by content type

pub mod body;
pub mod request;
pub mod target;

pub use body::classify_body;
pub use request::{build_request, is_reserved_header, WireRequest, HTTP_PATH, HTTP_QUERY};
pub use target::{strip_user_info, BasicCredentials, HttpPublishTarget, PushEndpoint};
