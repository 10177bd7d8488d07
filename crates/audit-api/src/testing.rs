use std::sync::Arc;
use std::time::Duration;

use audit_auth::{Session, TokenStore};
use audit_client::{ApiClient, ClientConfig, HttpClient, RetryPolicy};
use tokio::net::TcpListener;

pub async fn start_server(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Client with an authenticated in-memory session and fast retries.
pub async fn api_for(base: String) -> (ApiClient, Arc<Session>) {
    let session = Arc::new(Session::new(Arc::new(TokenStore::in_memory())));
    session
        .set_credentials("at_test".into(), Some("rt_test".into()))
        .await
        .unwrap();
    let core = HttpClient::new(
        ClientConfig {
            base_url: base,
            timeout: Duration::from_secs(5),
        },
        session.clone(),
    )
    .unwrap();
    let api = ApiClient::new(Arc::new(core), RetryPolicy::new(2, Duration::from_millis(10)));
    (api, session)
}
