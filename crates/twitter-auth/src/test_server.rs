//! In-process mock of the Twitter API for HTTP tests

use tokio::net::TcpListener;

use crate::constants::Endpoints;

/// Serve `router` on an ephemeral localhost port and return endpoints for it.
pub async fn start(router: axum::Router) -> (Endpoints, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (Endpoints::with_base(&format!("http://{addr}")), handle)
}
