/// reqwest-backed transport and a JSON request builder.
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;
use url::Url;

use super::transport::{Response, Transport};
use crate::error::{BuildError, TransportError};

/// Sends requests through one pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `timeout` bounds each request end to end. Without one a hung server
    /// stalls the run.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Request builder that shares this transport's connection pool.
    pub fn json_requests(&self, method: Method, url: Url) -> JsonRequestBuilder {
        JsonRequestBuilder {
            client: self.client.clone(),
            method,
            url,
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    type Request = reqwest::Request;

    async fn send(&self, request: reqwest::Request) -> Result<Response, TransportError> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| TransportError(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;

        Ok(Response {
            status,
            body: body.to_vec(),
        })
    }
}

/// Encodes each payload as a JSON body sent to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct JsonRequestBuilder {
    client: Client,
    method: Method,
    url: Url,
}

impl JsonRequestBuilder {
    /// A JSON `null` payload is sent as a literal `null` body.
    pub fn build<P: Serialize>(&self, payload: &P) -> Result<reqwest::Request, BuildError> {
        let body = sonic_rs::to_vec(payload)
            .map_err(|e| BuildError(format!("Failed to encode payload: {}", e)))?;

        self.client
            .request(self.method.clone(), self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(|e| BuildError(format!("Invalid request: {}", e)))
    }
}
