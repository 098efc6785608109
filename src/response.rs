use std::{
    any::Any,
    convert::TryInto,
    fmt::{self, Debug, Formatter},
};

use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Extensions, Method, StatusCode, Version,
};

use crate::{Body, RequestHead};

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Represents an HTTP response.
#[derive(Default)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: Body,
}

impl Debug for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .finish()
    }
}

impl From<Response> for hyper::Response<hyper::Body> {
    fn from(resp: Response) -> Self {
        let mut hyper_resp = hyper::Response::new(resp.body.into());
        *hyper_resp.status_mut() = resp.status;
        *hyper_resp.version_mut() = resp.version;
        *hyper_resp.headers_mut() = resp.headers;
        *hyper_resp.extensions_mut() = resp.extensions;
        hyper_resp
    }
}

impl From<StatusCode> for Response {
    fn from(status: StatusCode) -> Self {
        Response::builder().status(status).finish()
    }
}

impl Response {
    /// Creates a response builder.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            status: StatusCode::OK,
            version: Default::default(),
            headers: Default::default(),
            extensions: Default::default(),
        }
    }

    /// Returns the associated status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code for this response.
    #[inline]
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns a reference to the associated header map.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the associated header map.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the string value of the specified header.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the content type of this response.
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE)
    }

    /// Returns the associated version.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns a reference to the associated extensions.
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Sets the body for this response.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Consumes the response returning the body.
    #[inline]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Finalizes this response against the request it answers.
    ///
    /// - Informational, `204` and `304` responses lose their body and
    ///   entity headers.
    /// - A missing `Content-Type` defaults to `text/html; charset=utf-8`,
    ///   `text/*` types get a utf-8 charset when they have none.
    /// - `Content-Length` is set from a body of known size, unless
    ///   `Transfer-Encoding` is present.
    /// - `HEAD` requests get an empty body but keep `Content-Length`.
    /// - The protocol version follows an HTTP/1.0 request, HTTP/1.1
    ///   otherwise.
    ///
    /// Calling it more than once gives the same result.
    pub fn prepare(&mut self, req: &RequestHead) {
        if self.status.is_informational()
            || self.status == StatusCode::NO_CONTENT
            || self.status == StatusCode::NOT_MODIFIED
        {
            self.body = Body::empty();
            self.headers.remove(header::CONTENT_TYPE);
            self.headers.remove(header::CONTENT_LENGTH);
        } else {
            self.prepare_content_type();

            if self.headers.contains_key(header::TRANSFER_ENCODING) {
                self.headers.remove(header::CONTENT_LENGTH);
            } else if !self.headers.contains_key(header::CONTENT_LENGTH) {
                if let Some(len) = self.body.exact_len() {
                    self.headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
                }
            }

            if req.method == Method::HEAD {
                self.body = Body::empty();
            }
        }

        self.version = if req.version == Version::HTTP_10 {
            Version::HTTP_10
        } else {
            Version::HTTP_11
        };

        if self.version == Version::HTTP_10 && self.has_no_cache() {
            self.headers
                .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            self.headers
                .insert(header::EXPIRES, HeaderValue::from_static("-1"));
        }
    }

    fn prepare_content_type(&mut self) {
        let content_type = match self.content_type() {
            Some(content_type) => content_type,
            None => {
                self.headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
                );
                return;
            }
        };

        let is_text = content_type
            .parse::<mime::Mime>()
            .map(|mime| mime.type_() == mime::TEXT && mime.get_param(mime::CHARSET).is_none())
            .unwrap_or(false);
        if is_text {
            let value = format!("{}; charset=utf-8", content_type);
            if let Ok(value) = HeaderValue::from_str(&value) {
                self.headers.insert(header::CONTENT_TYPE, value);
            }
        }
    }

    fn has_no_cache(&self) -> bool {
        self.header(header::CACHE_CONTROL)
            .map(|value| value.to_ascii_lowercase().contains("no-cache"))
            .unwrap_or(false)
    }
}

/// An response builder.
pub struct ResponseBuilder {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
}

impl ResponseBuilder {
    /// Sets the HTTP status for this response.
    ///
    /// By default this is [`StatusCode::OK`].
    #[must_use]
    pub fn status(self, status: StatusCode) -> Self {
        Self { status, ..self }
    }

    /// Sets the HTTP version for this response.
    ///
    /// By default this is [`Version::HTTP_11`]
    #[must_use]
    pub fn version(self, version: Version) -> Self {
        Self { version, ..self }
    }

    /// Appends a header to this response builder.
    ///
    /// This function will append the provided key/value as a header to the
    /// internal [`HeaderMap`] being constructed.
    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let key = key.try_into();
        let value = value.try_into();
        if let (Ok(key), Ok(value)) = (key, value) {
            self.headers.append(key, value);
        }
        self
    }

    /// Sets the `Content-Type` header on the response.
    #[must_use]
    pub fn content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = content_type.try_into() {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
        self
    }

    /// Adds an extension to this response.
    #[must_use]
    pub fn extension<T>(mut self, extension: T) -> Self
    where
        T: Any + Send + Sync + 'static,
    {
        self.extensions.insert(extension);
        self
    }

    /// Consumes this builder, using the provided body to return a constructed
    /// [Response].
    pub fn body(self, body: impl Into<Body>) -> Response {
        Response {
            status: self.status,
            version: self.version,
            headers: self.headers,
            extensions: self.extensions,
            body: body.into(),
        }
    }

    /// Consumes this builder, using an empty body to return a constructed
    /// [Response].
    pub fn finish(self) -> Response {
        self.body(Body::empty())
    }
}
