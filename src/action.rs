//! Route actions and their outputs.

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
    future::Future,
    sync::Arc,
};

use crate::{
    container::ControllerResolver,
    error::{ActionResolutionError, Error, Result},
    RouteContext, Response,
};

/// A request handler invoked by a matched route.
///
/// Implemented for every `Fn(RouteContext) -> impl Future<Output = R>` where
/// `R` implements [`IntoOutput`].
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles the request of the current dispatch.
    async fn call(&self, ctx: RouteContext) -> Result<Output>;
}

#[async_trait::async_trait]
impl<F, Fut, R> Handler for F
where
    F: Fn(RouteContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
    async fn call(&self, ctx: RouteContext) -> Result<Output> {
        (self)(ctx).await.into_output()
    }
}

/// The value a handler produced, before it is turned into a response.
#[derive(Debug)]
pub enum Output {
    /// A plain string, wrapped into a `200 OK` response.
    Text(String),
    /// A response, passed through as is.
    Response(Response),
    /// Any other value. Dispatch fails with
    /// [`InvalidResponseType`](crate::error::InvalidResponseType).
    Unsupported(&'static str),
}

impl Output {
    /// Records that a handler produced `value`, which has no response
    /// representation.
    pub fn unsupported<T: ?Sized>(_value: &T) -> Self {
        Output::Unsupported(std::any::type_name::<T>())
    }
}

/// Types a handler may return.
pub trait IntoOutput {
    /// Consumes itself and returns the [`Output`].
    fn into_output(self) -> Result<Output>;
}

impl IntoOutput for Output {
    fn into_output(self) -> Result<Output> {
        Ok(self)
    }
}

impl IntoOutput for String {
    fn into_output(self) -> Result<Output> {
        Ok(Output::Text(self))
    }
}

impl IntoOutput for &'static str {
    fn into_output(self) -> Result<Output> {
        Ok(Output::Text(self.to_string()))
    }
}

impl IntoOutput for Response {
    fn into_output(self) -> Result<Output> {
        Ok(Output::Response(self))
    }
}

impl<T, E> IntoOutput for std::result::Result<T, E>
where
    T: IntoOutput,
    E: Into<Error>,
{
    fn into_output(self) -> Result<Output> {
        match self {
            Ok(value) => value.into_output(),
            Err(err) => Err(err.into()),
        }
    }
}

/// A reference to a controller, resolved when the route runs.
///
/// The reference has the form `Class@method`, or just `Class` for an
/// invokable controller. Building one always records the `controller`
/// alongside `uses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerAction {
    uses: String,
    controller: String,
    metadata: BTreeMap<String, String>,
}

impl ControllerAction {
    /// Create a controller action from a reference such as
    /// `UsersController@show`.
    pub fn new(uses: impl Into<String>) -> Self {
        let uses = uses.into();
        Self {
            controller: uses.clone(),
            uses,
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches a metadata entry to this action.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the reference this action uses.
    #[inline]
    pub fn uses(&self) -> &str {
        &self.uses
    }

    /// Returns the controller recorded for introspection.
    #[inline]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Returns the metadata attached to this action.
    #[inline]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Returns the class part of the reference.
    pub fn class(&self) -> &str {
        match self.uses.split_once('@') {
            Some((class, _)) => class,
            None => &self.uses,
        }
    }

    /// Returns the method part of the reference, `None` for invokable
    /// controllers.
    pub fn method(&self) -> Option<&str> {
        self.uses.split_once('@').map(|(_, method)| method)
    }
}

/// What a route runs once it matched.
#[derive(Clone)]
pub enum Action {
    /// A handler called directly.
    Handler(Arc<dyn Handler>),
    /// A controller resolved through the router's
    /// [`ControllerResolver`].
    Controller(ControllerAction),
}

impl Debug for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Action::Handler(_) => f.write_str("Handler"),
            Action::Controller(action) => f.debug_tuple("Controller").field(action).finish(),
        }
    }
}

impl From<&str> for Action {
    fn from(uses: &str) -> Self {
        Action::Controller(ControllerAction::new(uses))
    }
}

impl From<String> for Action {
    fn from(uses: String) -> Self {
        Action::Controller(ControllerAction::new(uses))
    }
}

impl From<ControllerAction> for Action {
    fn from(action: ControllerAction) -> Self {
        Action::Controller(action)
    }
}

impl From<Arc<dyn Handler>> for Action {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Action::Handler(handler)
    }
}

/// Wraps a handler into an [`Action`].
///
/// # Example
///
/// ```
/// use stanza::{handler, Router};
///
/// let mut router = Router::new();
/// router
///     .get("/hello/{name}", handler(|ctx: stanza::RouteContext| async move {
///         format!("hello: {}", ctx.parameter("name", "world"))
///     }))
///     .unwrap();
/// ```
pub fn handler(h: impl Handler) -> Action {
    Action::Handler(Arc::new(h))
}

impl Action {
    /// Returns the controller reference if this action is one.
    pub fn as_controller(&self) -> Option<&ControllerAction> {
        match self {
            Action::Controller(action) => Some(action),
            Action::Handler(_) => None,
        }
    }

    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, Action::Controller(action) if action.uses().trim().is_empty())
    }

    /// Invokes this action for the current dispatch.
    ///
    /// Controller references are resolved first, a failed resolution is an
    /// [`ActionResolutionError`]. Errors raised by the handler itself are
    /// returned unchanged.
    pub(crate) async fn invoke(
        &self,
        ctx: RouteContext,
        resolver: Option<&dyn ControllerResolver>,
    ) -> Result<Output> {
        match self {
            Action::Handler(handler) => handler.call(ctx).await,
            Action::Controller(action) => {
                let resolved = match resolver {
                    Some(resolver) => resolver.resolve(action),
                    None => Err(ActionResolutionError::NoResolver(action.uses().to_string())),
                };
                let handler = resolved.map_err(|err| {
                    tracing::warn!(uses = action.uses(), error = %err, "failed to resolve controller");
                    Error::from(err)
                })?;
                handler.call(ctx).await
            }
        }
    }
}
