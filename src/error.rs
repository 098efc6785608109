//! Some common error types.

use std::{
    convert::Infallible,
    error::Error as StdError,
    fmt::{self, Debug, Display, Formatter},
    string::FromUtf8Error,
};

use http::{header, StatusCode};

use crate::{Body, Response};

/// General error.
///
/// Carries the status class the outer boundary should answer with, and the
/// underlying reason. Typed reasons can be recovered with
/// [`downcast_ref`](Error::downcast_ref).
#[derive(Debug)]
pub struct Error {
    status: StatusCode,
    reason: anyhow::Error,
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: err,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.reason)
    }
}

#[derive(Debug)]
struct StatusError(StatusCode);

impl Display for StatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for StatusError {}

impl Error {
    /// Create a new error with status code.
    #[inline]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: anyhow::Error::from(StatusError(status)),
        }
    }

    /// Sets the reason for this error.
    #[inline]
    pub fn with_reason(self, reason: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            reason: anyhow::Error::from(reason),
            ..self
        }
    }

    /// Sets the reason string for this error.
    #[inline]
    pub fn with_reason_string(self, reason: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self {
            reason: anyhow::Error::msg(reason),
            ..self
        }
    }

    /// Returns the status code of this error.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the reason of this error.
    #[inline]
    pub fn reason(&self) -> &impl Display {
        &self.reason
    }

    /// Downcast this error object by reference.
    #[inline]
    pub fn downcast_ref<T: Display + Debug + Send + Sync + 'static>(&self) -> Option<&T> {
        self.reason.downcast_ref()
    }

    /// Returns `true` if the reason of this error is of type `T`.
    #[inline]
    pub fn is<T: Display + Debug + Send + Sync + 'static>(&self) -> bool {
        self.reason.is::<T>()
    }

    /// Returns `true` if no route matched the request.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.is::<RouteNotFoundError>()
    }

    /// Creates full response for this error.
    pub fn as_response(&self) -> Response {
        let mut resp = Response::builder()
            .status(self.status)
            .body(Body::from_string(self.reason.to_string()));
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        resp
    }
}

/// A specialized Result type for Stanza.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// No registered route matches the method and path of a request.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("no route matches `{method} {path}`")]
pub struct RouteNotFoundError {
    /// Request method.
    pub method: String,
    /// Request path.
    pub path: String,
}

impl From<RouteNotFoundError> for Error {
    fn from(err: RouteNotFoundError) -> Self {
        Error::new(StatusCode::NOT_FOUND).with_reason(err)
    }
}

/// A route definition rejected at registration time.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InvalidRouteDefinition {
    /// The uri pattern is empty.
    #[error("the uri pattern is empty")]
    EmptyPattern,

    /// The uri pattern does not start with `/`.
    #[error("the uri pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    /// A `{` without a matching `}` or the other way round.
    #[error("unbalanced parameter delimiters in `{0}`")]
    UnbalancedDelimiters(String),

    /// A placeholder without a name, e.g. `/users/{}`.
    #[error("empty parameter name in `{0}`")]
    EmptyParameterName(String),

    /// A parameter name with characters other than ASCII letters, digits
    /// and `_`.
    #[error("invalid parameter name `{name}` in `{pattern}`")]
    InvalidParameterName {
        /// Pattern.
        pattern: String,
        /// Parameter name.
        name: String,
    },

    /// The same parameter name appears twice.
    #[error("duplicate parameter `{name}` in `{pattern}`")]
    DuplicateParameter {
        /// Pattern.
        pattern: String,
        /// Parameter name.
        name: String,
    },

    /// A placeholder shares its segment with literal text.
    #[error("placeholder must span the whole segment in `{0}`")]
    PartialSegment(String),

    /// A `{*tail}` placeholder that is not the last segment.
    #[error("wildcard parameter must be the last segment in `{0}`")]
    WildcardNotLast(String),

    /// The verb set is empty.
    #[error("a route needs at least one method")]
    NoMethods,

    /// A verb that is not a valid HTTP method token.
    #[error("invalid method `{0}`")]
    InvalidMethod(String),

    /// The route has no action, e.g. an empty controller reference.
    #[error("route `{0}` has no action")]
    MissingAction(String),
}

impl From<InvalidRouteDefinition> for Error {
    fn from(err: InvalidRouteDefinition) -> Self {
        Error::new(StatusCode::INTERNAL_SERVER_ERROR).with_reason(err)
    }
}

/// A controller reference could not be resolved to an invokable handler.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ActionResolutionError {
    /// The router was built without a controller resolver.
    #[error("no controller resolver is configured for `{0}`")]
    NoResolver(String),

    /// The reference is not of the form `Class` or `Class@method`.
    #[error("malformed controller reference `{0}`")]
    Malformed(String),

    /// Nothing is bound under this reference.
    #[error("controller `{0}` is not bound")]
    NotFound(String),

    /// The alias chain for this reference loops back on itself.
    #[error("controller alias `{0}` is ambiguous")]
    Ambiguous(String),
}

impl From<ActionResolutionError> for Error {
    fn from(err: ActionResolutionError) -> Self {
        Error::new(StatusCode::INTERNAL_SERVER_ERROR).with_reason(err)
    }
}

/// A handler returned a value that cannot be turned into a response.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("handler returned `{0}`, expected a string or a response")]
pub struct InvalidResponseType(pub &'static str);

impl From<InvalidResponseType> for Error {
    fn from(err: InvalidResponseType) -> Self {
        Error::new(StatusCode::INTERNAL_SERVER_ERROR).with_reason(err)
    }
}

/// A possible error value when reading the body.
#[derive(Debug, thiserror::Error)]
pub enum ReadBodyError {
    /// Body is not a valid utf8 string.
    #[error("parse utf8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// Io error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ReadBodyError> for Error {
    fn from(err: ReadBodyError) -> Self {
        Error::new(StatusCode::BAD_REQUEST).with_reason(err)
    }
}

/// A possible error value when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the configuration.
    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A possible error value when loading a routes file.
#[derive(Debug, thiserror::Error)]
pub enum LoadRoutesError {
    /// The routes file could not be read.
    #[error("read `{path}`: {source}")]
    Io {
        /// Path of the routes file.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The routes file is not valid.
    #[error("parse `{path}`: {source}")]
    Parse {
        /// Path of the routes file.
        path: String,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An entry was rejected by the registration api.
    #[error("route #{index}: {source}")]
    Route {
        /// Zero-based position of the entry in the file.
        index: usize,
        /// Underlying error.
        source: InvalidRouteDefinition,
    },
}

impl From<LoadRoutesError> for Error {
    fn from(err: LoadRoutesError) -> Self {
        Error::new(StatusCode::INTERNAL_SERVER_ERROR).with_reason(err)
    }
}
