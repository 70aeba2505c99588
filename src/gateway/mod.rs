//! Outbound HTTP to the farm backend.
//!
//! `ApiGateway` is the only type in the crate that performs network I/O. It
//! attaches `Authorization: Bearer <token>` whenever the session holds a
//! token and omits the header otherwise; rejecting anonymous calls is the
//! server's job.

pub mod api;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::errors::GatewayError;
use crate::session::Session;

pub use api::FarmBackend;

const USER_AGENT: &str = concat!("smartfarm/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed 2xx exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        serde_json::from_str(&self.body).map_err(|e| GatewayError::InvalidResponse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

pub struct ApiGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiGateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<Session>,
    ) -> Result<Self, GatewayError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GatewayError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(GatewayError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            session,
        })
    }

    pub fn from_config(config: &ClientConfig, session: Arc<Session>) -> Result<Self, GatewayError> {
        Self::new(&config.base_url(), config.timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build a request with the bearer token attached when one is present.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Send `builder`; non-2xx statuses become [`GatewayError::Http`].
    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<RawResponse, GatewayError> {
        let resp = builder.send().await.map_err(|source| {
            warn!(path, error = %source, "Request failed without a response");
            GatewayError::Network {
                path: path.to_string(),
                source,
            }
        })?;

        let status = resp.status();
        // An unreadable body on an otherwise complete response is treated as empty.
        let body = resp.text().await.unwrap_or_default();
        debug!(path, status = status.as_u16(), "Response received");

        if status.is_success() {
            Ok(RawResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(GatewayError::Http {
                path: path.to_string(),
                status: status.as_u16(),
                body: if body.trim().is_empty() {
                    None
                } else {
                    Some(body)
                },
            })
        }
    }

    pub async fn get_raw(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<RawResponse, GatewayError> {
        debug!(path, "GET");
        let mut builder = self.request(Method::GET, path);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.send(path, builder).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.get_raw(path, &[]).await?.json(path)
    }

    pub async fn post_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, GatewayError> {
        debug!(path, "POST");
        let builder = self.request(Method::POST, path).json(body);
        self.send(path, builder).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        self.post_raw(path, body).await?.json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(session: Arc<Session>) -> ApiGateway {
        ApiGateway::new("http://localhost:8080/", Duration::from_secs(5), session).unwrap()
    }

    #[test]
    fn test_rejects_base_url_without_scheme() {
        let result = ApiGateway::new(
            "localhost:8080",
            Duration::from_secs(5),
            Arc::new(Session::in_memory()),
        );
        assert!(matches!(result, Err(GatewayError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_url_joins_paths() {
        let gw = gateway(Arc::new(Session::in_memory()));
        assert_eq!(gw.base_url(), "http://localhost:8080");
        assert_eq!(gw.url("/api/farms"), "http://localhost:8080/api/farms");
        assert_eq!(gw.url("api/farms"), "http://localhost:8080/api/farms");
    }

    #[test]
    fn test_bearer_header_attached_when_token_present() {
        let session = Arc::new(Session::in_memory());
        session.login("jwt-abc").unwrap();
        let gw = gateway(session);

        let req = gw.request(Method::GET, "/api/farms").build().unwrap();
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer jwt-abc"
        );
    }

    #[test]
    fn test_header_omitted_without_token() {
        let gw = gateway(Arc::new(Session::in_memory()));
        let req = gw.request(Method::GET, "/api/farms").build().unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_header_follows_logout() {
        let session = Arc::new(Session::in_memory());
        session.login("jwt-abc").unwrap();
        let gw = gateway(session.clone());
        session.logout().unwrap();

        let req = gw.request(Method::POST, "/api/farms").build().unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_raw_response_decode_error_is_invalid_response() {
        let raw = RawResponse {
            status: 200,
            body: "oops".into(),
        };
        let result: Result<Vec<i64>, _> = raw.json("/api/farms");
        assert!(matches!(
            result,
            Err(GatewayError::InvalidResponse { ref path, .. }) if path == "/api/farms"
        ));
    }
}
