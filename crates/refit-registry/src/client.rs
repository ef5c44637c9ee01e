//! Client for OCI-compatible container registries

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use refit_core::AuthEntry;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, trace};

const MANIFEST_ACCEPT: &str =
    "application/vnd.oci.image.manifest.v1+json,application/vnd.docker.distribution.manifest.v2+json";

/// Client for interacting with OCI-compatible container registries
pub struct RegistryClient {
    client: reqwest::Client,
    /// Base URL of the registry API, e.g. `https://ghcr.io`
    registry_base: String,
    /// Base URL of the token service (defaults to the registry itself)
    auth_base: String,
    /// `service` parameter sent to the token endpoint
    service: String,
    /// Raw token (e.g. a registry PAT) used when no per-repository
    /// credentials exist
    auth_token: Option<String>,
    /// Per-repository credentials for the token request
    credentials: HashMap<String, AuthEntry>,
    /// Cached bearer tokens per repository, refreshed once expired
    tokens: RwLock<HashMap<String, BearerToken>>,
}

#[derive(Debug, Clone)]
struct BearerToken {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// A token is never reused past `issued_at + expires_in`
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl RegistryClient {
    /// Create a new registry client for a host (`ghcr.io`) or base URL
    /// (`http://127.0.0.1:5000`)
    pub fn new(registry: impl Into<String>) -> Result<Self> {
        let registry = registry.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!("refit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let registry_base = base_url(&registry);
        Ok(Self {
            client,
            auth_base: registry_base.clone(),
            registry_base,
            service: registry,
            auth_token: None,
            credentials: HashMap::new(),
            tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Set a raw authentication token exchanged at the token endpoint for
    /// repositories without their own credentials
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Use a separate token-service host (or base URL)
    pub fn with_auth_host(mut self, auth_host: impl Into<String>) -> Self {
        self.auth_base = base_url(&auth_host.into());
        self
    }

    /// Attach per-repository credentials used as basic auth on the token
    /// request
    pub fn with_credentials(mut self, entries: Vec<AuthEntry>) -> Self {
        self.credentials = entries
            .into_iter()
            .map(|e| (e.repository.clone(), e))
            .collect();
        self
    }

    /// Get a bearer token for a repository, fetching or refreshing through
    /// the registry's token endpoint when the cached one is missing or
    /// expired. Registries without a token service (404) yield no token.
    async fn bearer_token(&self, repository: &str) -> Result<Option<String>> {
        {
            let tokens = self.tokens.read().unwrap();
            if let Some(cached) = tokens.get(repository) {
                if !cached.is_expired() {
                    return Ok(cached.token.clone());
                }
                debug!("Bearer token for {} expired, refreshing", repository);
            }
        }

        let token_url = format!(
            "{}/token?service={}&scope=repository:{}:pull",
            self.auth_base, self.service, repository
        );
        debug!("Requesting registry token from: {}", token_url);

        let mut request = self.client.get(&token_url);
        if let Some(entry) = self.credentials.get(repository) {
            request = request.basic_auth(&entry.username, Some(&entry.password));
        } else if let Some(token) = &self.auth_token {
            request = request.basic_auth("token", Some(token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to request token from {}", token_url))?;

        if response.status() == StatusCode::NOT_FOUND {
            // No token service; the registry is unauthenticated
            debug!("No token endpoint at {}, proceeding anonymously", token_url);
            self.tokens.write().unwrap().insert(
                repository.to_string(),
                BearerToken {
                    token: None,
                    expires_at: None,
                },
            );
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Token request for {} failed ({}): {}",
                repository,
                status,
                if body.is_empty() {
                    "(no response body)".to_string()
                } else {
                    body
                }
            ));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let token = token_response
            .access_token
            .or(token_response.token)
            .ok_or_else(|| anyhow!("Token response carried neither access_token nor token"))?;

        // Expiry is issued_at + expires_in; a missing issued_at counts
        // from receipt.
        let expires_at = token_response
            .expires_in
            .map(|secs| token_response.issued_at.unwrap_or_else(Utc::now) + Duration::seconds(secs));

        self.tokens.write().unwrap().insert(
            repository.to_string(),
            BearerToken {
                token: Some(token.clone()),
                expires_at,
            },
        );

        Ok(Some(token))
    }

    /// The authorization header for a repository request, if any
    async fn auth_header(&self, repository: &str) -> Result<Option<HeaderValue>> {
        match self.bearer_token(repository).await? {
            Some(bearer) => Ok(Some(HeaderValue::from_str(&format!("Bearer {}", bearer))?)),
            None => Ok(None),
        }
    }

    /// List all tags for a repository (handles pagination)
    pub async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let mut all_tags = Vec::new();
        let mut url = format!("{}/v2/{}/tags/list?n=1000", self.registry_base, repository);

        loop {
            debug!("Listing tags from: {}", url);

            let mut headers = HeaderMap::new();
            if let Some(auth_header) = self.auth_header(repository).await? {
                headers.insert(AUTHORIZATION, auth_header);
            }

            let response = self
                .client
                .get(&url)
                .headers(headers)
                .send()
                .await
                .with_context(|| format!("Failed to connect to registry at {}", url))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!(
                    "Registry returned {} for {}: {}",
                    status,
                    url,
                    if body.is_empty() {
                        "(no response body)".to_string()
                    } else {
                        body
                    }
                ));
            }

            // Check for Link header for pagination
            let next_url = response
                .headers()
                .get("link")
                .and_then(|h| h.to_str().ok())
                .and_then(|link| parse_link_header(link, &self.registry_base));

            let tags_response: TagsResponse = response
                .json()
                .await
                .context("Failed to parse tags response")?;

            all_tags.extend(tags_response.tags);

            match next_url {
                Some(next) => url = next,
                None => break,
            }
        }

        trace!("Found {} tags total for {}", all_tags.len(), repository);
        Ok(all_tags)
    }

    /// Resolve the content digest for a tag via the manifest endpoint's
    /// `Docker-Content-Digest` header
    pub async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<String> {
        let url = format!("{}/v2/{}/manifests/{}", self.registry_base, repository, tag);
        trace!("Resolving digest from: {}", url);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MANIFEST_ACCEPT));
        if let Some(auth_header) = self.auth_header(repository).await? {
            headers.insert(AUTHORIZATION, auth_header);
        }

        let response = self
            .client
            .head(&url)
            .headers(headers)
            .send()
            .await
            .with_context(|| format!("Failed to fetch manifest for {}:{}", repository, tag))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Manifest request for {}:{} failed ({})",
                repository,
                tag,
                response.status()
            ));
        }

        response
            .headers()
            .get("docker-content-digest")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "Registry sent no Docker-Content-Digest for {}:{}",
                    repository,
                    tag
                )
            })
    }
}

/// Normalize a host into a base URL, leaving explicit schemes alone
fn base_url(registry: &str) -> String {
    if registry.starts_with("http://") || registry.starts_with("https://") {
        registry.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", registry)
    }
}

/// Parse Link header for pagination
/// Format: <https://ghcr.io/v2/repo/tags/list?n=100&last=tag>; rel="next"
fn parse_link_header(link: &str, registry_base: &str) -> Option<String> {
    for part in link.split(',') {
        let part = part.trim();
        if part.contains("rel=\"next\"") {
            if let Some(start) = part.find('<') {
                if let Some(end) = part.find('>') {
                    let url = &part[start + 1..end];
                    // URL might be relative, make it absolute
                    if url.starts_with('/') {
                        return Some(format!("{}{}", registry_base, url));
                    }
                    return Some(url.to_string());
                }
            }
        }
    }
    None
}

// Internal types for registry API responses

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    issued_at: Option<DateTime<Utc>>,
}
