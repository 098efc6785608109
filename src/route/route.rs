use http::Method;

use super::{pattern::Pattern, Params};
use crate::{
    action::{Action, Output},
    container::ControllerResolver,
    error::{InvalidRouteDefinition, Result},
    Request, RouteContext,
};

/// Values that name one or more HTTP methods.
///
/// A single method is a one-element set. Names are uppercased when the
/// route is built.
pub trait IntoMethods {
    /// Returns the method names.
    fn into_methods(self) -> Vec<String>;
}

impl IntoMethods for &str {
    fn into_methods(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoMethods for String {
    fn into_methods(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoMethods for Method {
    fn into_methods(self) -> Vec<String> {
        vec![self.as_str().to_string()]
    }
}

impl<T: AsRef<str>> IntoMethods for Vec<T> {
    fn into_methods(self) -> Vec<String> {
        self.iter().map(|method| method.as_ref().to_string()).collect()
    }
}

impl<T: AsRef<str>> IntoMethods for &[T] {
    fn into_methods(self) -> Vec<String> {
        self.iter().map(|method| method.as_ref().to_string()).collect()
    }
}

impl<T: AsRef<str>, const N: usize> IntoMethods for [T; N] {
    fn into_methods(self) -> Vec<String> {
        self.iter().map(|method| method.as_ref().to_string()).collect()
    }
}

fn normalize_methods(methods: Vec<String>) -> Result<Vec<Method>, InvalidRouteDefinition> {
    let mut normalized = Vec::with_capacity(methods.len());
    for name in methods {
        let upper = name.trim().to_ascii_uppercase();
        let method = Method::from_bytes(upper.as_bytes())
            .map_err(|_| InvalidRouteDefinition::InvalidMethod(name.clone()))?;
        if !normalized.contains(&method) {
            normalized.push(method);
        }
    }

    if normalized.is_empty() {
        return Err(InvalidRouteDefinition::NoMethods);
    }
    Ok(normalized)
}

/// A binding of HTTP methods and a uri pattern to an [`Action`].
///
/// The pattern is compiled once, when the route is built. Matching never
/// mutates the route: captured parameters are returned to the caller.
#[derive(Debug, Clone)]
pub struct Route {
    methods: Vec<Method>,
    uri: String,
    pattern: Pattern,
    action: Action,
    name: Option<String>,
}

impl Route {
    /// Create a new route.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRouteDefinition`] if the method set is empty or
    /// invalid, the pattern is malformed, or the action is missing.
    pub fn new(
        methods: impl IntoMethods,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<Self, InvalidRouteDefinition> {
        let methods = normalize_methods(methods.into_methods())?;
        let pattern = Pattern::parse(uri)?;
        let action = action.into();
        if action.is_missing() {
            return Err(InvalidRouteDefinition::MissingAction(uri.to_string()));
        }

        Ok(Self {
            methods,
            uri: uri.to_string(),
            pattern,
            action,
            name: None,
        })
    }

    /// Returns the methods this route answers.
    #[inline]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Returns the uri pattern of this route.
    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the action of this route.
    #[inline]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Returns the name of this route.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Names this route, see [`Router::url_for`](crate::Router::url_for).
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the names of the parameters this route captures.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.pattern.param_names()
    }

    /// Returns `true` if this route answers `method`.
    pub fn allows(&self, method: &Method) -> bool {
        self.methods
            .iter()
            .any(|allowed| allowed.as_str().eq_ignore_ascii_case(method.as_str()))
    }

    /// Matches `req` against this route.
    ///
    /// Returns the captured parameters if both the method and the path
    /// match.
    pub fn matches(&self, req: &Request) -> Option<Params> {
        if !self.allows(req.method()) {
            return None;
        }
        self.pattern.matches(req.path())
    }

    /// Builds a path for this route from `params`.
    pub fn path_for(&self, params: &[(&str, &str)]) -> Option<String> {
        self.pattern.generate(params)
    }

    /// Runs the action of this route.
    pub(crate) async fn run(
        &self,
        ctx: RouteContext,
        resolver: Option<&dyn ControllerResolver>,
    ) -> Result<Output> {
        self.action.invoke(ctx, resolver).await
    }
}
