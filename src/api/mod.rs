//! # HTTP Client
//!
//! Thin wrapper around reqwest that gives every backend call the same
//! behavior:
//!
//! - **Bearer injection**: `Authorization: Bearer <token>` is attached
//!   whenever the session store holds a token.
//! - **One dispatch path**: every request funnels through [`ApiClient::dispatch`],
//!   which applies the flat per-request timeout, the status mapping, and the
//!   global 401 policy.
//! - **401 policy**: a 401 from any call resets the session (token cleared,
//!   absent-user published) *before* the caller observes the
//!   [`ApiError::Unauthorized`] result, so every subscriber is consistent by
//!   the time the error propagates. The policy cannot be overridden per call.
//!
//! Payload decoding is typed; endpoints with an unstable response shape
//! (the image list) fetch a raw [`serde_json::Value`] and normalize in the
//! catalog layer.

pub mod error;

pub use error::ApiError;

use std::time::Duration;

use log::debug;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::config::ApiConfig;
use crate::session::Session;

/// HTTP client bound to one backend base URL and one session store.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Build a client with the configured base URL and flat request timeout.
    ///
    /// # Arguments
    /// - `config`: Backend connection settings
    /// - `session`: Session store consulted for the bearer token and reset
    ///   on 401
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(error::map_transport_error)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The session store this client mutates on 401.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// GET a typed payload.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.dispatch(self.request(Method::GET, path)).await?;
        decode(&body)
    }

    /// GET a typed payload with query parameters.
    ///
    /// Decode into [`serde_json::Value`] for endpoints whose shape the
    /// caller normalizes itself.
    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self
            .dispatch(self.request(Method::GET, path).query(query))
            .await?;
        decode(&body)
    }

    /// POST an optional JSON body and decode a typed payload.
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request(Method::POST, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let body = self.dispatch(builder).await?;
        decode(&body)
    }

    /// POST an optional JSON body, discarding whatever the backend answers.
    pub async fn post_unit<B>(&self, path: &str, body: Option<&B>) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(Method::POST, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.dispatch(builder).await.map(|_| ())
    }

    /// DELETE, discarding the response body.
    pub async fn delete_unit(&self, path: &str) -> Result<(), ApiError> {
        self.dispatch(self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    /// PUT a multipart form and decode a typed payload.
    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let body = self
            .dispatch(self.request(Method::PUT, path).multipart(form))
            .await?;
        decode(&body)
    }

    /// Start a request builder with the base URL joined and, when a token is
    /// stored, the bearer header attached.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        debug!("{} {}{}", method, self.base_url, path);
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a built request and map the outcome.
    ///
    /// # Returns
    /// - `Ok(bytes)`: 2xx response body
    /// - `Err(ApiError::Unauthorized)`: 401; the session has been reset
    ///   before returning
    /// - `Err(_)`: other statuses mapped by [`error::map_status_error`], or
    ///   a network failure when no response arrived
    async fn dispatch(&self, builder: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = builder.send().await.map_err(error::map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(error::map_transport_error)?;

        if status == StatusCode::UNAUTHORIZED {
            // Global policy: tear the session down before the caller sees
            // the error, so every subscriber observes the sign-out first.
            self.session.reset();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(error::map_status_error(status, &body));
        }
        Ok(body.to_vec())
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        message: e.to_string(),
    })
}
