use std::sync::Arc;

use super::{Params, Route};
use crate::{error::RouteNotFoundError, Request};

/// A route selected for a request, together with the parameters it bound.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route.
    pub route: Arc<Route>,
    /// Parameters captured from the request path.
    pub params: Params,
}

impl RouteMatch {
    /// Returns the parameter bound to `name`, or `default`.
    pub fn parameter<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.params.get_or(name, default)
    }
}

/// An ordered set of routes.
///
/// Routes are tried in registration order and the first one that matches
/// wins, so specific routes must be registered before general ones.
#[derive(Debug, Default)]
pub struct RouteCollection {
    routes: Vec<Arc<Route>>,
}

impl RouteCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends `route`, returning it for further configuration.
    pub fn add(&mut self, route: Route) -> &mut Route {
        let idx = self.routes.len();
        self.routes.push(Arc::new(route));
        Arc::make_mut(&mut self.routes[idx])
    }

    /// Returns the first route that matches `req`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteNotFoundError`] if no route matches.
    pub fn match_route(&self, req: &Request) -> Result<RouteMatch, RouteNotFoundError> {
        self.routes
            .iter()
            .find_map(|route| {
                route.matches(req).map(|params| RouteMatch {
                    route: route.clone(),
                    params,
                })
            })
            .ok_or_else(|| RouteNotFoundError {
                method: req.method().to_string(),
                path: req.path().to_string(),
            })
    }

    /// Returns the route registered under `name`.
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.iter().find(|route| route.name() == Some(name))
    }

    /// An iterator over the routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|route| &**route)
    }

    /// Returns the number of routes.
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
