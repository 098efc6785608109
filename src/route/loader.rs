//! Registers routes declared in a TOML routes file.
//!
//! ```toml
//! [[routes]]
//! uri = "/users/{id}"
//! uses = "UsersController@show"
//! methods = "get"
//! name = "users.show"
//!
//! [[routes]]
//! uri = "/users"
//! uses = "UsersController@store"
//! methods = ["post", "put"]
//! metadata = { middleware = "auth" }
//! ```
//!
//! An entry without `methods` answers every method except `OPTIONS`.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use super::{Route, Router};
use crate::{
    error::{InvalidRouteDefinition, LoadRoutesError},
    ControllerAction,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoutesFile {
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Methods {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteEntry {
    uri: String,
    uses: String,
    methods: Option<Methods>,
    name: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl RouteEntry {
    fn register(self, router: &mut Router) -> Result<(), InvalidRouteDefinition> {
        let mut action = ControllerAction::new(self.uses);
        for (key, value) in self.metadata {
            action = action.with(key, value);
        }

        let uri = self.uri.as_str();
        let route: &mut Route = match self.methods {
            None => router.all(uri, action)?,
            Some(Methods::One(method)) => match method.trim().to_ascii_uppercase().as_str() {
                "GET" => router.get(uri, action)?,
                "POST" => router.post(uri, action)?,
                "PUT" => router.put(uri, action)?,
                "PATCH" => router.patch(uri, action)?,
                "DELETE" => router.delete(uri, action)?,
                "OPTIONS" => router.options(uri, action)?,
                _ => router.any(method, uri, action)?,
            },
            Some(Methods::Many(methods)) => router.any(methods, uri, action)?,
        };

        if let Some(name) = self.name {
            route.set_name(name);
        }
        Ok(())
    }
}

pub(crate) fn load_str(router: &mut Router, src: &str, path: &str) -> Result<usize, LoadRoutesError> {
    let file: RoutesFile = toml::from_str(src).map_err(|source| LoadRoutesError::Parse {
        path: path.to_string(),
        source,
    })?;

    let count = file.routes.len();
    for (index, entry) in file.routes.into_iter().enumerate() {
        entry
            .register(router)
            .map_err(|source| LoadRoutesError::Route { index, source })?;
    }

    tracing::info!(path = path, routes = count, "routes loaded");
    Ok(count)
}

pub(crate) fn load_file(router: &mut Router, path: &Path) -> Result<usize, LoadRoutesError> {
    let display = path.display().to_string();
    let src = fs::read_to_string(path).map_err(|source| LoadRoutesError::Io {
        path: display.clone(),
        source,
    })?;
    load_str(router, &src, &display)
}
