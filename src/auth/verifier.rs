//! Bearer token verification against the identity provider's JSON Web Key Set.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::constants::{JWKS_CACHE_TTL, JWKS_FETCH_TIMEOUT, JWKS_MIN_REFRESH_INTERVAL};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unknown signing key: {0}")]
    UnknownKey(String),
    #[error("key discovery failed: {0}")]
    Jwks(String),
    #[error("{0}")]
    Rejected(&'static str),
}

/// Where keys come from and what every token must claim
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub jwks_uri: String,
    pub issuer: String,
    pub audience: String,
}

impl From<&Config> for VerifierSettings {
    fn from(config: &Config) -> Self {
        Self {
            jwks_uri: config.jwks_uri(),
            issuer: config.issuer(),
            audience: config.auth0_audience.clone(),
        }
    }
}

/// Identity extracted from a verified token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub subject: Option<String>,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<u64>,
}

/// Published keys are RSA public keys, so only RSA signatures are accepted
fn is_rsa_algorithm(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

#[derive(Clone)]
struct SigningKey {
    kid: Option<String>,
    signing_use: bool,
    key: DecodingKey,
}

struct CachedJwks {
    keys: Vec<SigningKey>,
    fetched_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    fn find(&self, kid: Option<&str>) -> Option<&SigningKey> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None if self.keys.len() == 1 => self.keys.first(),
            None => self.keys.iter().find(|k| k.signing_use),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    kid: Option<String>,
    #[serde(rename = "use")]
    use_: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

impl Jwk {
    fn to_signing_key(&self) -> Result<SigningKey, String> {
        if self.kty != "RSA" {
            return Err(format!("unsupported key type {}", self.kty));
        }

        let n = self.n.as_deref().ok_or("missing RSA modulus")?;
        let e = self.e.as_deref().ok_or("missing RSA exponent")?;
        let key = DecodingKey::from_rsa_components(n, e).map_err(|e| e.to_string())?;

        Ok(SigningKey {
            kid: self.kid.clone(),
            signing_use: self.use_.as_deref().map_or(true, |u| u == "sig"),
            key,
        })
    }
}

/// Validates JWT bearer tokens for a single issuer and audience.
///
/// The key set is fetched lazily and cached for an hour. A token naming a
/// key id the cache does not know forces an early refresh, but at most once
/// per `min_refresh_interval`; fetches happen under the cache's write lock
/// so concurrent misses share one request.
#[derive(Clone)]
pub struct TokenVerifier {
    settings: Arc<VerifierSettings>,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl TokenVerifier {
    pub fn new(settings: VerifierSettings) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()?;

        Ok(Self::with_http_client(settings, http_client, JWKS_CACHE_TTL))
    }

    pub fn with_http_client(
        settings: VerifierSettings,
        http_client: reqwest::Client,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            min_refresh_interval: JWKS_MIN_REFRESH_INTERVAL,
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verifies signature, expiry, issuer and audience of `token`
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let key = self.signing_key(&header).await?;

        if !is_rsa_algorithm(header.alg) {
            return Err(AuthError::Rejected("Algorithm does not match signing key"));
        }

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_audience(&[self.settings.audience.as_str()]);

        let token_data =
            decode::<serde_json::Value>(token, &key.key, &validation).map_err(|e| {
                AuthError::Rejected(match e.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::ImmatureSignature => "Token not yet valid",
                    ErrorKind::InvalidIssuer => "Invalid issuer",
                    ErrorKind::InvalidAudience => "Invalid audience",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    ErrorKind::MissingRequiredClaim(_) => "Missing required claim",
                    _ => "Token validation failed",
                })
            })?;

        let claims = token_data.claims;
        let string_claim = |name: &str| claims.get(name).and_then(|v| v.as_str()).map(String::from);

        Ok(VerifiedToken {
            subject: string_claim("sub"),
            client_id: string_claim("azp").or_else(|| string_claim("client_id")),
            scopes: parse_scopes(&claims),
            expires_at: claims.get("exp").and_then(|v| v.as_u64()),
        })
    }

    async fn signing_key(&self, header: &Header) -> Result<SigningKey, AuthError> {
        let kid = header.kid.as_deref();
        let unknown = || AuthError::UnknownKey(kid.unwrap_or("<none>").to_string());

        {
            let cache = self.cache.read().await;
            if let Some(key) = cache
                .as_ref()
                .filter(|cached| cached.is_fresh(self.cache_ttl))
                .and_then(|cached| cached.find(kid))
            {
                return Ok(key.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref().filter(|cached| cached.is_fresh(self.cache_ttl)) {
            if let Some(key) = cached.find(kid) {
                return Ok(key.clone());
            }
            if cached.fetched_at.elapsed() < self.min_refresh_interval {
                tracing::debug!(kid = ?kid, "Unknown key id, JWKS refreshed too recently");
                return Err(unknown());
            }
        }

        let fetched = self.fetch_jwks().await?;
        let key = fetched.find(kid).cloned();
        *cache = Some(fetched);
        key.ok_or_else(unknown)
    }

    async fn fetch_jwks(&self) -> Result<CachedJwks, AuthError> {
        let jwks_uri = &self.settings.jwks_uri;
        tracing::debug!(jwks_uri = %jwks_uri, "Fetching JWKS");

        let response = self
            .http_client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::Jwks(format!("failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::Jwks(format!(
                "JWKS endpoint returned status {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthError::Jwks(format!("failed to parse JWKS: {}", e)))?;

        let mut keys = Vec::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            match jwk.to_signing_key() {
                Ok(key) => keys.push(key),
                Err(err) => tracing::warn!(kid = ?jwk.kid, error = %err, "Skipping unusable JWK"),
            }
        }

        if keys.is_empty() {
            return Err(AuthError::Jwks("no usable keys in JWKS".to_string()));
        }

        tracing::info!(jwks_uri = %jwks_uri, keys_count = keys.len(), "Cached JWKS keys");

        Ok(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        })
    }
}

fn parse_scopes(claims: &serde_json::Value) -> Vec<String> {
    if let Some(scope) = claims.get("scope").and_then(|v| v.as_str()) {
        return scope.split_whitespace().map(String::from).collect();
    }

    ["scp", "permissions"]
        .iter()
        .filter_map(|name| claims.get(*name).and_then(|v| v.as_array()))
        .flatten()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
}
