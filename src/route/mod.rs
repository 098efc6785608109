//! Route object and DSL

mod collection;
mod loader;
mod params;
mod pattern;
#[allow(clippy::module_inception)]
mod route;
mod router;

pub use collection::{RouteCollection, RouteMatch};
pub use params::Params;
pub use route::{IntoMethods, Route};
pub use router::{Router, VERBS};
