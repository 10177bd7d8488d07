//! Verb helpers wrapped in the retry policy
//!
//! The domain modules call these and nothing else. Each call is one
//! `with_retry` around `HttpClient::send`, so a retried attempt goes through
//! the whole interceptor chain again.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::client::HttpClient;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, with_retry};
use crate::transport::{ApiRequest, ApiResponse};

#[derive(Clone)]
pub struct ApiClient {
    core: Arc<HttpClient>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(core: Arc<HttpClient>, retry: RetryPolicy) -> Self {
        Self { core, retry }
    }

    pub fn core(&self) -> &Arc<HttpClient> {
        &self.core
    }

    /// Send `request` with retries.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let core = self.core.as_ref();
        let request = &request;
        with_retry(self.retry, move || core.send(request.clone())).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(ApiRequest::post(path).with_json(encode(body)?))
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(ApiRequest::put(path).with_json(encode(body)?))
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(ApiRequest::patch(path).with_json(encode(body)?))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| Error::Payload(format!("encoding request: {e}")))
}
