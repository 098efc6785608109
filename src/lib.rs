//! Stanza is a routing and dispatch engine for HTTP services.
//!
//! Routes pair a set of methods and a uri pattern with an action. An action
//! is either an async handler or a controller reference such as
//! `UsersController@show`, resolved through a [`ControllerResolver`] when
//! the route runs.
//!
//! # Example
//!
//! ```
//! use stanza::{handler, http::StatusCode, Container, Request, RouteContext, Router};
//!
//! let container = Container::new();
//! container.bind(
//!     "UsersController@show",
//!     |ctx: RouteContext| async move { format!("user {}", ctx.parameter("id", "")) },
//! );
//!
//! let mut router = Router::new().with_resolver(container);
//! router
//!     .get("/", handler(|_ctx: RouteContext| async { "home" }))
//!     .unwrap();
//! router
//!     .get("/users/{id}", "UsersController@show")
//!     .unwrap()
//!     .set_name("users.show");
//!
//! assert_eq!(
//!     router.url_for("users.show", &[("id", "7")]).as_deref(),
//!     Some("/users/7")
//! );
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let resp = router
//!     .dispatch(Request::builder().uri_str("/users/7").finish())
//!     .await
//!     .unwrap();
//! assert_eq!(resp.status(), StatusCode::OK);
//! assert_eq!(resp.into_body().into_string().await.unwrap(), "user 7");
//! # });
//! ```

#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod action;
pub mod container;
pub mod error;
pub mod route;

mod body;
mod config;
mod context;
mod endpoint;
mod request;
mod response;
mod server;

#[doc(inline)]
pub use http;

pub use action::{handler, Action, ControllerAction, Handler, IntoOutput, Output};
pub use async_trait::async_trait;
pub use body::Body;
pub use config::RouterConfig;
pub use container::{Container, ControllerResolver};
pub use context::RouteContext;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use request::{Request, RequestBuilder, RequestHead};
pub use response::{Response, ResponseBuilder};
pub use route::{IntoMethods, Params, Route, RouteCollection, RouteMatch, Router, VERBS};
pub use server::Server;
