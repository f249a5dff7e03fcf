//! Authenticated POST client for Frappe whitelisted methods.

use ontime_core::config::{RouteConfig, ServerConfig};
use reqwest::multipart::Form;
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TransportError;

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-Frappe-CSRF-Token";

/// HTTP client bound to one Frappe site.
#[derive(Debug, Clone)]
pub struct FrappeClient {
    http: reqwest::Client,
    server: ServerConfig,
    routes: RouteConfig,
}

impl FrappeClient {
    /// Build a client for the configured site and route table.
    pub fn new(server: ServerConfig, routes: RouteConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(server.timeout())
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;
        Ok(Self {
            http,
            server,
            routes,
        })
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    /// Absolute URL of a whitelisted method.
    pub fn method_url(&self, route: &str) -> String {
        format!(
            "{}/api/method/{}",
            self.server.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }

    /// Absolute URL for a site-relative path (navigation targets).
    pub fn site_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.server.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, route: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .post(self.method_url(route))
            .header(CSRF_HEADER, &self.server.csrf_token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(sid) = &self.server.session_id {
            builder = builder.header(reqwest::header::COOKIE, format!("sid={}", sid));
        }
        builder
    }

    /// POST a JSON payload and return the decoded body.
    pub async fn post_json(&self, route: &str, payload: &Value) -> Result<Value, TransportError> {
        let builder = self.request(route).json(payload);
        self.send(route, builder).await
    }

    /// POST a multipart form and return the decoded body.
    ///
    /// No JSON content type is set; reqwest supplies the multipart boundary.
    pub async fn post_multipart(&self, route: &str, form: Form) -> Result<Value, TransportError> {
        let builder = self.request(route).multipart(form);
        self.send(route, builder).await
    }

    async fn send(&self, route: &str, builder: RequestBuilder) -> Result<Value, TransportError> {
        debug!(route, "POST");
        let response = builder.send().await.map_err(|e| {
            warn!(route, error = %e, "Request failed");
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(route, status = status.as_u16(), "Host returned an error status");
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> FrappeClient {
        let server = ServerConfig {
            base_url: base_url.to_string(),
            ..ServerConfig::default()
        };
        FrappeClient::new(server, RouteConfig::default()).unwrap()
    }

    #[test]
    fn test_method_url_joins_cleanly() {
        let c = client("https://erp.example.com/");
        assert_eq!(
            c.method_url("upload_file"),
            "https://erp.example.com/api/method/upload_file"
        );
        assert_eq!(
            c.method_url("/frappe.ping"),
            "https://erp.example.com/api/method/frappe.ping"
        );
    }

    #[test]
    fn test_site_url() {
        let c = client("https://erp.example.com");
        assert_eq!(
            c.site_url("/app/sales-invoice/new"),
            "https://erp.example.com/app/sales-invoice/new"
        );
        assert_eq!(c.site_url("app/todo"), "https://erp.example.com/app/todo");
        assert_eq!(
            c.site_url("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is assumed closed.
        let c = client("http://127.0.0.1:9");
        let err = c
            .post_json("frappe.ping", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
