//! Bearer-token protection for the MCP endpoint.
//!
//! Tokens are issued by a remote authorization server and verified here
//! against its published key set. Clients discover that server through the
//! OAuth 2.0 Protected Resource Metadata document (RFC 9728).

pub mod verifier;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
pub use verifier::{AuthError, TokenVerifier, VerifiedToken, VerifierSettings};

pub const RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
}

/// Token verifier plus the discovery data advertised to clients
#[derive(Clone)]
pub struct RemoteAuthProvider {
    verifier: TokenVerifier,
    authorization_servers: Vec<String>,
    resource_url: String,
}

impl RemoteAuthProvider {
    pub fn new(verifier: TokenVerifier, authorization_servers: Vec<String>, resource_url: String) -> Self {
        Self {
            verifier,
            authorization_servers,
            resource_url,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let verifier = TokenVerifier::new(VerifierSettings::from(config))?;
        Ok(Self::new(
            verifier,
            config.authorization_servers(),
            config.resource_server_url.clone(),
        ))
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn resource_metadata(&self) -> ResourceMetadata {
        ResourceMetadata {
            resource: self.resource_url.clone(),
            authorization_servers: self.authorization_servers.clone(),
            bearer_methods_supported: vec!["header".to_string()],
        }
    }

    /// Absolute URL of the metadata document, rooted at the resource URL's origin
    pub fn resource_metadata_url(&self) -> String {
        match reqwest::Url::parse(&self.resource_url) {
            Ok(url) => format!("{}{}", url.origin().ascii_serialization(), RESOURCE_METADATA_PATH),
            Err(_) => format!("{}{}", self.resource_url.trim_end_matches('/'), RESOURCE_METADATA_PATH),
        }
    }

    fn challenge(&self, error: &AuthError) -> Response {
        let metadata_url = self.resource_metadata_url();
        let (header, body) = match error {
            AuthError::MissingToken => (
                format!("Bearer resource_metadata=\"{}\"", metadata_url),
                serde_json::json!({
                    "error": "invalid_request",
                    "error_description": error.to_string(),
                }),
            ),
            _ => (
                format!(
                    "Bearer error=\"invalid_token\", error_description=\"{}\", resource_metadata=\"{}\"",
                    quoted_string_safe(&error.to_string()),
                    metadata_url
                ),
                serde_json::json!({
                    "error": "invalid_token",
                    "error_description": error.to_string(),
                }),
            ),
        };

        let value = HeaderValue::from_str(&header).unwrap_or_else(|_| HeaderValue::from_static("Bearer"));
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
        response
    }
}

/// Keeps printable ASCII only, with quotes and backslashes replaced, so the
/// text fits inside a quoted `WWW-Authenticate` parameter
fn quoted_string_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '"' | '\\' => '\'',
            ' '..='~' => c,
            _ => '?',
        })
        .collect()
}

/// Serves the protected resource metadata document
pub async fn resource_metadata(State(provider): State<Arc<RemoteAuthProvider>>) -> Json<ResourceMetadata> {
    Json(provider.resource_metadata())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Rejects any request without a valid bearer token before it reaches the MCP service
pub async fn require_bearer(
    State(provider): State<Arc<RemoteAuthProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!(path = %request.uri().path(), "Request without bearer token");
        return provider.challenge(&AuthError::MissingToken);
    };

    match provider.verifier.verify(&token).await {
        Ok(verified) => {
            tracing::debug!(
                subject = ?verified.subject,
                client_id = ?verified.client_id,
                scopes = ?verified.scopes,
                expires_at = ?verified.expires_at,
                "Authenticated request"
            );
            request.extensions_mut().insert(verified);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(error = %err, "Rejected bearer token");
            provider.challenge(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::verifier::test_support::*;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::Extension;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt;

    fn provider(jwks_uri: String) -> Arc<RemoteAuthProvider> {
        let verifier = TokenVerifier::with_http_client(settings(jwks_uri), reqwest::Client::new(), Duration::from_secs(60));
        Arc::new(RemoteAuthProvider::new(
            verifier,
            vec![ISSUER.to_string()],
            "https://weather.test/mcp".to_string(),
        ))
    }

    fn protected_router(provider: Arc<RemoteAuthProvider>) -> Router {
        Router::new()
            .route(
                "/mcp",
                get(|Extension(verified): Extension<VerifiedToken>| async move {
                    verified.subject.unwrap_or_default()
                }),
            )
            .layer(axum::middleware::from_fn_with_state(provider, require_bearer))
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/mcp");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_resource_metadata() {
        let provider = provider("http://127.0.0.1:9/jwks.json".to_string());

        assert_eq!(
            provider.resource_metadata(),
            ResourceMetadata {
                resource: "https://weather.test/mcp".to_string(),
                authorization_servers: vec!["https://tenant.test/".to_string()],
                bearer_methods_supported: vec!["header".to_string()],
            }
        );
        assert_eq!(
            provider.resource_metadata_url(),
            "https://weather.test/.well-known/oauth-protected-resource"
        );
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_challenge_survives_unprintable_error_text() {
        let provider = provider("http://127.0.0.1:9/jwks.json".to_string());
        let error = AuthError::Malformed("bad \"kid\" \\ caf\u{e9}\r\nX-Injected: 1".to_string());

        let response = provider.challenge(&error);

        let challenge = response.headers()[WWW_AUTHENTICATE].to_str().unwrap();
        assert_eq!(
            challenge,
            "Bearer error=\"invalid_token\", error_description=\"malformed token: bad 'kid' ' caf???X-Injected: 1\", \
             resource_metadata=\"https://weather.test/.well-known/oauth-protected-resource\""
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_challenged() {
        let app = protected_router(provider("http://127.0.0.1:9/jwks.json".to_string()));

        let response = app.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[WWW_AUTHENTICATE].to_str().unwrap();
        assert_eq!(
            challenge,
            "Bearer resource_metadata=\"https://weather.test/.well-known/oauth-protected-resource\""
        );
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected_before_handler() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jwks.json")
            .with_status(200)
            .with_body(jwks_body())
            .create_async()
            .await;
        let app = protected_router(provider(format!("{}/jwks.json", server.url())));

        let mut claims = claims();
        claims["aud"] = "https://other.test".into();
        let response = app
            .oneshot(request(Some(&format!("Bearer {}", sign(&claims)))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.starts_with("Bearer error=\"invalid_token\""));
        assert!(challenge.contains("Invalid audience"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "invalid_token");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jwks.json")
            .with_status(200)
            .with_body(jwks_body())
            .create_async()
            .await;
        let app = protected_router(provider(format!("{}/jwks.json", server.url())));

        let response = app
            .oneshot(request(Some(&format!("Bearer {}", sign(&claims())))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"auth0|user-1");
    }
}
