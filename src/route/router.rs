use std::sync::Arc;

use http::Method;
use tracing::Instrument;

use super::{loader, IntoMethods, Route, RouteCollection, RouteMatch};
use crate::{
    action::{Action, Output},
    container::ControllerResolver,
    error::{InvalidResponseType, InvalidRouteDefinition, LoadRoutesError, RouteNotFoundError},
    Endpoint, Request, RequestHead, Response, Result, RouteContext, RouterConfig,
};

/// All of the methods supported by the router.
pub const VERBS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// The methods registered by [`Router::all`]. `OPTIONS` is left out.
const ALL_VERBS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Routes requests to handlers.
///
/// Routes are registered once at startup. After that the router is only
/// read, and [`dispatch`](Router::dispatch) can run concurrently from many
/// tasks: the state of a dispatch lives in its [`RouteContext`], never in
/// the router.
///
/// # Example
///
/// ```
/// use stanza::{handler, http::StatusCode, Request, RouteContext, Router};
///
/// let mut router = Router::new();
/// router
///     .get("/items/{id}", handler(|ctx: RouteContext| async move {
///         format!("item {}", ctx.parameter("id", ""))
///     }))
///     .unwrap();
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let resp = router
///     .dispatch(Request::builder().uri_str("/items/42").finish())
///     .await
///     .unwrap();
/// assert_eq!(resp.status(), StatusCode::OK);
/// assert_eq!(resp.into_body().into_string().await.unwrap(), "item 42");
///
/// let err = router
///     .dispatch(Request::builder().uri_str("/missing").finish())
///     .await
///     .unwrap_err();
/// assert!(err.is_not_found());
/// # });
/// ```
#[derive(Default)]
pub struct Router {
    routes: RouteCollection,
    resolver: Option<Arc<dyn ControllerResolver>>,
}

impl Router {
    /// Create a new router.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the resolver used for controller actions.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ControllerResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Returns the registered routes.
    #[inline]
    pub fn routes(&self) -> &RouteCollection {
        &self.routes
    }

    /// Registers a new `GET` route, which also answers `HEAD`.
    pub fn get(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route([Method::GET, Method::HEAD], uri, action)
    }

    /// Registers a new `POST` route.
    pub fn post(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(Method::POST, uri, action)
    }

    /// Registers a new `PUT` route.
    pub fn put(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(Method::PUT, uri, action)
    }

    /// Registers a new `PATCH` route.
    pub fn patch(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(Method::PATCH, uri, action)
    }

    /// Registers a new `DELETE` route.
    pub fn delete(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(Method::DELETE, uri, action)
    }

    /// Registers a new `OPTIONS` route.
    pub fn options(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(Method::OPTIONS, uri, action)
    }

    /// Registers a new route answering every method except `OPTIONS`.
    pub fn all(
        &mut self,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(ALL_VERBS, uri, action)
    }

    /// Registers a new route answering the given methods.
    ///
    /// Method names are uppercased.
    pub fn any(
        &mut self,
        methods: impl IntoMethods,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        self.add_route(methods, uri, action)
    }

    fn add_route(
        &mut self,
        methods: impl IntoMethods,
        uri: &str,
        action: impl Into<Action>,
    ) -> Result<&mut Route, InvalidRouteDefinition> {
        let route = Route::new(methods, uri, action).map_err(|err| {
            tracing::error!(uri = uri, error = %err, "invalid route definition");
            err
        })?;
        tracing::debug!(
            methods = ?route.methods(),
            uri = route.uri(),
            action = ?route.action(),
            "register route"
        );
        Ok(self.routes.add(route))
    }

    /// Loads the routes file named by `config` and registers its routes.
    ///
    /// Returns the number of routes registered.
    pub fn gather_routes(&mut self, config: &RouterConfig) -> Result<usize, LoadRoutesError> {
        loader::load_file(self, &config.routes_file())
    }

    /// Registers the routes declared in `src`, using the routes file format.
    pub fn load_routes(&mut self, src: &str) -> Result<usize, LoadRoutesError> {
        loader::load_str(self, src, "<inline>")
    }

    /// Builds the path of the route named `name`.
    ///
    /// Returns `None` if there is no such route or a parameter is missing.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        self.routes.by_name(name)?.path_for(params)
    }

    /// Dispatches `req` to the first matching route and returns its
    /// prepared response.
    ///
    /// # Errors
    ///
    /// - [`RouteNotFoundError`] if no route matches.
    /// - [`ActionResolutionError`](crate::error::ActionResolutionError) if a
    ///   controller action cannot be resolved.
    /// - [`InvalidResponseType`] if the handler output is neither a string
    ///   nor a response.
    /// - Any error raised by the handler, unchanged.
    pub async fn dispatch(&self, req: Request) -> Result<Response> {
        let span = tracing::info_span!(
            "dispatch",
            method = %req.method(),
            path = %req.uri().path(),
        );
        self.dispatch_to_route(req).instrument(span).await
    }

    async fn dispatch_to_route(&self, req: Request) -> Result<Response> {
        let head = req.head();
        let RouteMatch { route, params } = self.matching_route(&req)?;
        tracing::debug!(route = route.uri(), "route matched");

        let ctx = RouteContext::new(req, route.clone(), params);
        let output = route.run(ctx, self.resolver.as_deref()).await?;
        let resp = Self::prepare_response(&head, output)?;
        tracing::debug!(status = %resp.status(), "response prepared");
        Ok(resp)
    }

    /// Finds the route matching `req`.
    pub fn matching_route(&self, req: &Request) -> Result<RouteMatch, RouteNotFoundError> {
        self.routes.match_route(req).map_err(|err| {
            tracing::debug!(error = %err, "no matching route");
            err
        })
    }

    /// Turns a handler output into a response prepared against `req`.
    ///
    /// Strings become a `200 OK` response with the string as body, responses
    /// are passed through.
    pub fn prepare_response(req: &RequestHead, output: Output) -> Result<Response> {
        let mut resp = match output {
            Output::Text(text) => Response::builder().body(text),
            Output::Response(resp) => resp,
            Output::Unsupported(type_name) => return Err(InvalidResponseType(type_name).into()),
        };
        resp.prepare(req);
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl Endpoint for Router {
    async fn call(&self, req: Request) -> Result<Response> {
        self.dispatch(req).await
    }
}

#[cfg(test)]
mod tests {
    use http::{header, StatusCode};

    use super::*;
    use crate::{
        error::ActionResolutionError, handler, Container, ControllerAction, Error,
    };

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri_str(uri).finish()
    }

    async fn body_of(router: &Router, method: Method, uri: &str) -> Result<String> {
        let resp = router.dispatch(request(method, uri)).await?;
        Ok(resp.into_body().into_string().await?)
    }

    fn text(value: &'static str) -> Action {
        handler(move |_ctx: RouteContext| async move { value })
    }

    #[tokio::test]
    async fn get_answers_get_and_head_only() {
        let mut router = Router::new();
        router.get("/", text("home")).unwrap();

        assert_eq!(body_of(&router, Method::GET, "/").await.unwrap(), "home");

        let resp = router.dispatch(request(Method::HEAD, "/")).await.unwrap();
        assert_eq!(resp.header(header::CONTENT_LENGTH), Some("4"));
        assert_eq!(resp.into_body().into_string().await.unwrap(), "");

        for method in [
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ] {
            let err = router.dispatch(request(method, "/")).await.unwrap_err();
            assert!(err.is_not_found());
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn registration_verbs() {
        let mut router = Router::new();
        router.post("/a", "A@post").unwrap();
        router.put("/a", "A@put").unwrap();
        router.patch("/a", "A@patch").unwrap();
        router.delete("/a", "A@delete").unwrap();
        router.options("/a", "A@options").unwrap();
        router.all("/b", "B@all").unwrap();
        router.any(["get", "options"], "/c", "C@any").unwrap();

        let methods: Vec<Vec<Method>> = router
            .routes()
            .iter()
            .map(|route| route.methods().to_vec())
            .collect();
        assert_eq!(
            methods,
            vec![
                vec![Method::POST],
                vec![Method::PUT],
                vec![Method::PATCH],
                vec![Method::DELETE],
                vec![Method::OPTIONS],
                ALL_VERBS.to_vec(),
                vec![Method::GET, Method::OPTIONS],
            ]
        );
        assert!(!router.routes().iter().nth(5).unwrap().allows(&Method::OPTIONS));
    }

    #[test]
    fn invalid_definitions_fail_fast() {
        let mut router = Router::new();
        assert_eq!(
            router.get("/users/{id", "A@b").unwrap_err(),
            InvalidRouteDefinition::UnbalancedDelimiters("/users/{id".to_string())
        );
        assert_eq!(
            router.get("/users", "").unwrap_err(),
            InvalidRouteDefinition::MissingAction("/users".to_string())
        );
        assert!(router.routes().is_empty());
    }

    #[test]
    fn controller_action_normalization() {
        let mut router = Router::new();
        let route = router.get("/users/{id}", "UsersController@show").unwrap();
        let action = route.action().as_controller().unwrap();
        assert_eq!(action.uses(), "UsersController@show");
        assert_eq!(action.controller(), "UsersController@show");
    }

    #[tokio::test]
    async fn first_match_wins() {
        let mut router = Router::new();
        router.get("/posts/{id}", text("first")).unwrap();
        router.get("/posts/{slug}", text("second")).unwrap();
        router.any("GET", "/posts/new", text("third")).unwrap();

        for uri in ["/posts/1", "/posts/new"] {
            assert_eq!(body_of(&router, Method::GET, uri).await.unwrap(), "first");
        }
    }

    #[tokio::test]
    async fn parameters_reach_the_handler() {
        let mut router = Router::new();
        router
            .get(
                "/items/{id}",
                handler(|ctx: RouteContext| async move {
                    format!(
                        "{} {} {}",
                        ctx.route().uri(),
                        ctx.request().path(),
                        ctx.parameter("id", "none")
                    )
                }),
            )
            .unwrap();

        assert_eq!(
            body_of(&router, Method::GET, "/items/42").await.unwrap(),
            "/items/{id} /items/42 42"
        );
        assert!(body_of(&router, Method::GET, "/items/")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn response_normalization() {
        let mut router = Router::new();
        router.get("/text", text("ok")).unwrap();
        router
            .get(
                "/response",
                handler(|_ctx: RouteContext| async {
                    Response::builder()
                        .status(StatusCode::CREATED)
                        .content_type("application/json")
                        .body("{}")
                }),
            )
            .unwrap();
        router
            .get(
                "/number",
                handler(|_ctx: RouteContext| async { Output::unsupported(&42u8) }),
            )
            .unwrap();

        let resp = router.dispatch(request(Method::GET, "/text")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(resp.into_body().into_string().await.unwrap(), "ok");

        let resp = router
            .dispatch(request(Method::GET, "/response"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.header(header::CONTENT_LENGTH), Some("2"));
        assert_eq!(resp.into_body().into_string().await.unwrap(), "{}");

        let err = router
            .dispatch(request(Method::GET, "/number"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.downcast_ref::<InvalidResponseType>(),
            Some(&InvalidResponseType("u8"))
        );
    }

    #[test]
    fn prepare_response_passes_responses_through() {
        let head = request(Method::GET, "/").head();
        let resp = Router::prepare_response(
            &head,
            Output::Response(Response::builder().status(StatusCode::ACCEPTED).finish()),
        )
        .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("database is down")]
    struct DatabaseError;

    #[tokio::test]
    async fn handler_errors_propagate() {
        let mut router = Router::new();
        router
            .get(
                "/fail",
                handler(|_ctx: RouteContext| async {
                    Err::<String, _>(
                        Error::new(StatusCode::SERVICE_UNAVAILABLE).with_reason(DatabaseError),
                    )
                }),
            )
            .unwrap();

        let err = router
            .dispatch(request(Method::GET, "/fail"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is::<DatabaseError>());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn controller_actions() {
        let container = Container::new();
        container.bind("UsersController@show", |ctx: RouteContext| async move {
            format!("user {}", ctx.parameter("id", ""))
        });

        let mut router = Router::new().with_resolver(container);
        router.get("/users/{id}", "UsersController@show").unwrap();
        router
            .get(
                "/users/{id}/edit",
                ControllerAction::new("UsersController@edit").with("middleware", "auth"),
            )
            .unwrap();

        assert_eq!(
            body_of(&router, Method::GET, "/users/7").await.unwrap(),
            "user 7"
        );

        let err = body_of(&router, Method::GET, "/users/7/edit")
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.downcast_ref::<ActionResolutionError>(),
            Some(&ActionResolutionError::NotFound(
                "UsersController@edit".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn controller_without_resolver() {
        let mut router = Router::new();
        router.get("/", "HomeController").unwrap();
        let err = body_of(&router, Method::GET, "/").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ActionResolutionError>(),
            Some(&ActionResolutionError::NoResolver(
                "HomeController".to_string()
            ))
        );
    }

    #[test]
    fn url_for() {
        let mut router = Router::new();
        router
            .get("/users/{id}", "Users@show")
            .unwrap()
            .set_name("users.show");

        assert_eq!(
            router.url_for("users.show", &[("id", "5")]).as_deref(),
            Some("/users/5")
        );
        assert_eq!(router.url_for("users.show", &[]), None);
        assert_eq!(router.url_for("missing", &[("id", "5")]), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatch_keeps_parameters_apart() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let mut router = Router::new();
        router
            .get(
                "/a/{x}",
                handler(|ctx: RouteContext| async move {
                    tokio::task::yield_now().await;
                    format!("x={}:{}", ctx.parameter("x", ""), ctx.parameter("y", "-"))
                }),
            )
            .unwrap();
        router
            .get(
                "/b/{y}",
                handler(|ctx: RouteContext| async move {
                    tokio::task::yield_now().await;
                    format!("y={}:{}", ctx.parameter("y", ""), ctx.parameter("x", "-"))
                }),
            )
            .unwrap();
        let router = Arc::new(router);

        let tasks = (0..200).map(|i| {
            let router = router.clone();
            tokio::spawn(async move {
                let (uri, expected) = if i % 2 == 0 {
                    (format!("/a/{}", i), format!("x={}:-", i))
                } else {
                    (format!("/b/{}", i), format!("y={}:-", i))
                };
                let body = body_of(&router, Method::GET, &uri).await.unwrap();
                assert_eq!(body, expected);
            })
        });

        for res in futures_util::future::join_all(tasks).await {
            res.unwrap();
        }
    }
}
