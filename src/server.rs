use std::{convert::Infallible, future::Future, io, net::SocketAddr, sync::Arc};

use http::StatusCode;

use crate::{Endpoint, Request};

/// An HTTP server serving an [`Endpoint`].
///
/// This is the outer boundary of a dispatch: errors that reach it are
/// turned into responses with [`Error::as_response`](crate::Error::as_response).
///
/// # Example
///
/// ```no_run
/// use stanza::{handler, RouteContext, Router, Server};
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let mut router = Router::new();
///     router
///         .get("/", handler(|_ctx: RouteContext| async { "hello" }))
///         .unwrap();
///     Server::bind(([127, 0, 0, 1], 3000)).run(router).await
/// }
/// ```
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Create a server that will listen on `addr`.
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// Serves `ep` until `Ctrl-C` is received, then shuts down gracefully.
    pub async fn run(self, ep: impl Endpoint) -> io::Result<()> {
        self.run_with_graceful_shutdown(ep, ctrl_c()).await
    }

    /// Serves `ep` until `signal` completes, then waits for in-flight
    /// requests.
    pub async fn run_with_graceful_shutdown(
        self,
        ep: impl Endpoint,
        signal: impl Future<Output = ()>,
    ) -> io::Result<()> {
        let ep: Arc<dyn Endpoint> = Arc::new(ep);

        let service = hyper::service::make_service_fn(move |_| {
            let ep = ep.clone();
            async move {
                Ok::<_, Infallible>(hyper::service::service_fn(
                    move |req: hyper::Request<hyper::Body>| {
                        let ep = ep.clone();
                        async move { Ok::<_, Infallible>(serve_request(ep.as_ref(), req.into()).await) }
                    },
                ))
            }
        });

        let server = hyper::Server::try_bind(&self.addr)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
            .serve(service);
        tracing::info!(addr = %self.addr, "listening");

        server
            .with_graceful_shutdown(signal)
            .await
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("ctrl-c received, shutting down");
}

async fn serve_request(ep: &dyn Endpoint, req: Request) -> hyper::Response<hyper::Body> {
    let head = req.head();
    let mut resp = match ep.call(req).await {
        Ok(resp) => resp,
        Err(err) => {
            if err.status() == StatusCode::NOT_FOUND {
                tracing::debug!(error = %err, "not found");
            } else if err.status().is_server_error() {
                tracing::error!(error = %err, "an error occurred");
            }
            err.as_response()
        }
    };
    resp.prepare(&head);
    resp.into()
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::{handler, RouteContext, Router};

    #[tokio::test]
    async fn shutdown_signal_stops_the_server() {
        let mut router = Router::new();
        router
            .get("/", handler(|_ctx: RouteContext| async { "home" }))
            .unwrap();

        Server::bind(([127, 0, 0, 1], 0))
            .run_with_graceful_shutdown(router, async {})
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn errors_become_responses() {
        let mut router = Router::new();
        router
            .get("/", handler(|_ctx: RouteContext| async { "home" }))
            .unwrap();
        router.get("/broken", "MissingController").unwrap();

        let resp = serve_request(&router, Request::builder().uri_str("/").finish()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = serve_request(
            &router,
            Request::builder()
                .method(Method::POST)
                .uri_str("/")
                .finish(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = serve_request(&router, Request::builder().uri_str("/broken").finish()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(
            body,
            "no controller resolver is configured for `MissingController`"
        );
    }
}
