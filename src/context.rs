use std::{str::FromStr, sync::Arc};

use http::StatusCode;

use crate::{route::Params, Error, Request, Result, Route};

/// The state of one dispatch, handed to the handler of the matched route.
///
/// Each dispatch gets its own context, so concurrent requests never see each
/// other's request, route or parameters.
pub struct RouteContext {
    request: Request,
    route: Arc<Route>,
    params: Params,
}

impl RouteContext {
    pub(crate) fn new(request: Request, route: Arc<Route>, params: Params) -> Self {
        Self {
            request,
            route,
            params,
        }
    }

    /// Returns the request being dispatched.
    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns a mutable reference to the request being dispatched.
    #[inline]
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Consumes the context returning the request.
    #[inline]
    pub fn into_request(self) -> Request {
        self.request
    }

    /// Returns the route that matched the request.
    #[inline]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Returns all parameters bound by the match.
    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the parameter bound to `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns the parameter bound to `name`, or `default` if the route has
    /// no such parameter.
    pub fn parameter<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.params.get_or(name, default)
    }

    /// Parses the parameter bound to `name`.
    ///
    /// A missing parameter is a server error, a value that does not parse is
    /// a bad request.
    pub fn param_as<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.param(name).ok_or_else(|| {
            Error::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_reason_string(format!("route has no parameter `{}`", name))
        })?;
        value.parse().map_err(|err: T::Err| {
            Error::new(StatusCode::BAD_REQUEST)
                .with_reason_string(format!("invalid parameter `{}`: {}", name, err))
        })
    }
}
