//! Publish targets and the endpoint they are resolved against.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use http::header::HeaderValue;
use http::uri::{Authority, PathAndQuery, Uri};
use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::CodecError;

fn is_supported(method: &Method) -> bool {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ]
    .contains(method)
}

/// A target address of the form `VERB:path[?query]`, e.g. `POST:/events?src=bridge`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPublishTarget {
    method: Method,
    path: String,
    query: Option<String>,
}

impl HttpPublishTarget {
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTarget` if the verb prefix is missing or not a
    /// supported method.
    pub fn parse(address: &str) -> Result<Self, CodecError> {
        let invalid = || CodecError::InvalidTarget(address.to_string());
        let (verb, rest) = address.split_once(':').ok_or_else(invalid)?;
        let method = Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes())
            .ok()
            .filter(is_supported)
            .ok_or_else(invalid)?;
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        Ok(Self {
            method,
            path: path.to_string(),
            query,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

impl fmt::Display for HttpPublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

/// Basic credentials taken from the user-info of an endpoint URI.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: Option<String>,
}

impl BasicCredentials {
    /// Parses percent-encoded `user[:password]`.
    fn parse(user_info: &str) -> Result<Self, CodecError> {
        let decode = |part: &str| {
            percent_decode_str(part)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .map_err(|_| CodecError::InvalidUri("user-info is not valid UTF-8".to_string()))
        };
        Ok(match user_info.split_once(':') {
            Some((username, password)) => Self {
                username: decode(username)?,
                password: Some(decode(password)?),
            },
            None => Self {
                username: decode(user_info)?,
                password: None,
            },
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value of the `Authorization` header, marked sensitive.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidRequest` if the encoded value is not a valid header.
    pub fn authorization(&self) -> Result<HeaderValue, CodecError> {
        let raw = format!("{}:{}", self.username, self.password.as_deref().unwrap_or_default());
        let mut value = HeaderValue::try_from(format!("Basic {}", BASE64_STANDARD.encode(raw)))
            .map_err(|e| CodecError::InvalidRequest(e.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Base URI of the connection.
///
/// User-info in the configured URI is split off into [`BasicCredentials`];
/// the stored URI never carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEndpoint {
    uri: Uri,
    credentials: Option<BasicCredentials>,
}

impl PushEndpoint {
    /// # Errors
    ///
    /// Returns `CodecError::InvalidUri` unless `uri` is an absolute `http`/`https` URI
    /// with UTF-8 user-info, if any.
    pub fn parse(uri: &str) -> Result<Self, CodecError> {
        let uri: Uri = uri
            .parse()
            .map_err(|e: http::uri::InvalidUri| CodecError::InvalidUri(e.to_string()))?;
        let authority = match (uri.scheme_str(), uri.authority()) {
            (Some("http" | "https"), Some(authority)) => authority.clone(),
            _ => {
                return Err(CodecError::InvalidUri(format!(
                    "<{}> is not an absolute http(s) URI",
                    strip_user_info(&uri)
                )))
            }
        };
        let Some((user_info, host)) = authority.as_str().rsplit_once('@') else {
            return Ok(Self {
                uri,
                credentials: None,
            });
        };
        let credentials = BasicCredentials::parse(user_info)?;
        let mut parts = uri.into_parts();
        parts.authority = Some(
            Authority::try_from(host).map_err(|e| CodecError::InvalidUri(e.to_string()))?,
        );
        let uri = Uri::from_parts(parts).map_err(|e| CodecError::InvalidUri(e.to_string()))?;
        Ok(Self {
            uri,
            credentials: Some(credentials),
        })
    }

    /// The endpoint URI without user-info.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&BasicCredentials> {
        self.credentials.as_ref()
    }

    /// Joins the endpoint's base path with the target path and uses the target query.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidUri` if the joined path or query is not a valid URI component.
    pub fn request_uri(&self, target: &HttpPublishTarget) -> Result<Uri, CodecError> {
        let base_path = self.uri.path().trim_end_matches('/');
        let target_path = target.path().trim_start_matches('/');
        let mut path_and_query = format!("{base_path}/{target_path}");
        if let Some(query) = target.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }
        with_path_and_query(&self.uri, &path_and_query)
    }
}

pub(crate) fn with_path_and_query(uri: &Uri, path_and_query: &str) -> Result<Uri, CodecError> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| CodecError::InvalidUri(format!("<{path_and_query}>: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| CodecError::InvalidUri(e.to_string()))
}

/// Renders `uri` without user-info, for logs and error messages.
#[must_use]
pub fn strip_user_info(uri: &Uri) -> String {
    let mut rendered = String::new();
    if let Some(scheme) = uri.scheme_str() {
        rendered.push_str(scheme);
        rendered.push_str("://");
    }
    if let Some(authority) = uri.authority() {
        let host = authority
            .as_str()
            .rsplit_once('@')
            .map_or(authority.as_str(), |(_, host)| host);
        rendered.push_str(host);
    }
    if let Some(path_and_query) = uri.path_and_query() {
        rendered.push_str(path_and_query.as_str());
    }
    rendered
}
