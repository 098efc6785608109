//! Controller resolution.

use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::RwLock;

use crate::{action::Handler, error::ActionResolutionError, ControllerAction};

/// Resolves a [`ControllerAction`] to the handler that serves it.
pub trait ControllerResolver: Send + Sync + 'static {
    /// Returns the handler bound to `action`.
    fn resolve(&self, action: &ControllerAction) -> Result<Arc<dyn Handler>, ActionResolutionError>;
}

impl<T: ControllerResolver + ?Sized> ControllerResolver for Arc<T> {
    fn resolve(&self, action: &ControllerAction) -> Result<Arc<dyn Handler>, ActionResolutionError> {
        self.as_ref().resolve(action)
    }
}

/// A registry of controller handlers.
///
/// Handlers are bound under `Class@method`, or `Class` for invokable
/// controllers. Aliases rename a class, `alias("Users", "UsersController")`
/// lets `Users@show` resolve to the binding of `UsersController@show`.
///
/// # Example
///
/// ```
/// use stanza::{Container, Router, RouteContext};
///
/// let container = Container::new();
/// container.bind("UsersController@show", |ctx: RouteContext| async move {
///     format!("user {}", ctx.parameter("id", "?"))
/// });
///
/// let mut router = Router::new().with_resolver(container);
/// router.get("/users/{id}", "UsersController@show").unwrap();
/// ```
#[derive(Default)]
pub struct Container {
    bindings: RwLock<FnvHashMap<String, Arc<dyn Handler>>>,
    aliases: RwLock<FnvHashMap<String, String>>,
}

impl Container {
    /// Create a new, empty container.
    pub fn new() -> Self {
        Default::default()
    }

    /// Binds `handler` under `reference`, replacing a previous binding.
    pub fn bind(&self, reference: impl Into<String>, handler: impl Handler) -> &Self {
        let reference = reference.into();
        tracing::debug!(reference = %reference, "bind controller");
        self.bindings.write().insert(reference, Arc::new(handler));
        self
    }

    /// Makes the class `alias` resolve like the class `target`.
    pub fn alias(&self, alias: impl Into<String>, target: impl Into<String>) -> &Self {
        self.aliases.write().insert(alias.into(), target.into());
        self
    }

    /// Returns `true` if something is bound under `reference`.
    pub fn contains(&self, reference: &str) -> bool {
        self.bindings.read().contains_key(reference)
    }
}

fn is_well_formed(action: &ControllerAction) -> bool {
    let uses = action.uses();
    let class = action.class();
    !class.is_empty()
        && uses.matches('@').count() <= 1
        && action.method().map(|method| !method.is_empty()).unwrap_or(true)
}

fn binding_key(class: &str, method: Option<&str>) -> String {
    match method {
        Some(method) => format!("{}@{}", class, method),
        None => class.to_string(),
    }
}

impl ControllerResolver for Container {
    fn resolve(&self, action: &ControllerAction) -> Result<Arc<dyn Handler>, ActionResolutionError> {
        if !is_well_formed(action) {
            return Err(ActionResolutionError::Malformed(action.uses().to_string()));
        }

        let bindings = self.bindings.read();
        let aliases = self.aliases.read();
        let method = action.method();
        let mut class = action.class();
        let mut seen = FnvHashSet::default();

        loop {
            if let Some(handler) = bindings.get(&binding_key(class, method)) {
                return Ok(handler.clone());
            }

            match aliases.get(class) {
                Some(target) => {
                    if !seen.insert(class) {
                        return Err(ActionResolutionError::Ambiguous(action.uses().to_string()));
                    }
                    class = target.as_str();
                }
                None => return Err(ActionResolutionError::NotFound(action.uses().to_string())),
            }
        }
    }
}
