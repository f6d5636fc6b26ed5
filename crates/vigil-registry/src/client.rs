//! OCI Distribution API client for tag and digest resolution.
//!
//! One client instance per registry component. The client works against
//! the normalized registry URL carried on each image, so a single
//! instance serves every repository its provider matched.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use sha2::{Digest as _, Sha256};

use vigil_core::container::ContainerImage;
use vigil_core::registry::ManifestDigest;

use crate::config::{AuthScheme, DEFAULT_TIMEOUT};
use crate::error::RegistryError;
use crate::oci::{ManifestResponse, TagList, TokenResponse, DOCKER_CONTENT_DIGEST, MANIFEST_ACCEPT};

/// Client for one OCI-compatible registry.
#[derive(Debug)]
pub struct OciClient {
    auth: AuthScheme,
    http: reqwest::Client,
}

impl OciClient {
    /// Creates a client with the given authentication scheme.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(auth: AuthScheme) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("vigil/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { auth, http })
    }

    /// Lists every tag of the image repository, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry is unreachable or answers with
    /// a non-success status (404 yields an empty list).
    pub async fn get_tags(&self, image: &ContainerImage) -> Result<Vec<String>, RegistryError> {
        let headers = self.auth_headers(image).await?;
        let mut url = format!("{}/{}/tags/list?n=1000", image.registry.url, image.name);
        let mut tags = Vec::new();

        loop {
            let response = self.http.get(&url).headers(headers.clone()).send().await?;

            if response.status().as_u16() == 404 {
                tracing::debug!(image = %image.name, "repository unknown to the registry");
                return Ok(Vec::new());
            }
            if !response.status().is_success() {
                return Err(RegistryError::Http {
                    status: response.status().as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let next = next_page_url(response.headers(), &image.registry.url);
            let page: TagList = response.json().await?;
            tags.extend(page.tags);

            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }

        Ok(tags)
    }

    /// Resolves the manifest digest for a reference (tag or digest).
    ///
    /// # Errors
    ///
    /// Returns an error when the registry is unreachable, answers with a
    /// non-success status, or the manifest body cannot be interpreted.
    pub async fn get_manifest_digest(
        &self,
        image: &ContainerImage,
        reference: &str,
    ) -> Result<ManifestDigest, RegistryError> {
        let headers = self.auth_headers(image).await?;
        let url = format!("{}/{}/manifests/{reference}", image.registry.url, image.name);

        let response = self
            .http
            .get(&url)
            .headers(headers)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::Http {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let header_digest = response
            .headers()
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await?;
        let manifest: ManifestResponse =
            serde_json::from_slice(&body).map_err(|e| RegistryError::InvalidManifest {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;

        if manifest.schema_version >= 2 {
            let digest = header_digest.unwrap_or_else(|| compute_digest(&body));
            Ok(ManifestDigest {
                digest: Some(digest),
                created: None,
                version: 2,
            })
        } else {
            Ok(ManifestDigest {
                digest: header_digest,
                created: manifest.v1_created(),
                version: 1,
            })
        }
    }

    /// Builds the authentication headers for a repository-scoped call.
    async fn auth_headers(&self, image: &ContainerImage) -> Result<HeaderMap, RegistryError> {
        let mut headers = HeaderMap::new();
        let value = match &self.auth {
            AuthScheme::None => None,
            AuthScheme::Basic { credentials } => Some(format!("Basic {credentials}")),
            AuthScheme::Bearer { token } => Some(format!("Bearer {token}")),
            AuthScheme::TokenService {
                auth_url,
                service,
                credentials,
            } => {
                let token = self
                    .fetch_token(auth_url, service.as_deref(), credentials.as_deref(), image)
                    .await?;
                Some(format!("Bearer {token}"))
            }
        };
        if let Some(value) = value {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|_| RegistryError::AuthenticationFailed {
                    message: "credentials contain invalid header characters".to_string(),
                })?,
            );
        }
        Ok(headers)
    }

    /// Fetches a repository-scoped bearer token from a token service.
    async fn fetch_token(
        &self,
        auth_url: &str,
        service: Option<&str>,
        credentials: Option<&str>,
        image: &ContainerImage,
    ) -> Result<String, RegistryError> {
        let mut request = self.http.get(auth_url).query(&[(
            "scope",
            format!("repository:{}:pull", image.name),
        )]);
        if let Some(service) = service {
            request = request.query(&[("service", service)]);
        }
        if let Some(credentials) = credentials {
            request = request.header(AUTHORIZATION, format!("Basic {credentials}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::AuthenticationFailed {
                message: format!("token service answered {}", response.status()),
            });
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.token)
    }
}

/// Extracts the next page URL from a `Link: <...>; rel="next"` header.
fn next_page_url(headers: &HeaderMap, registry_url: &str) -> Option<String> {
    let link = headers.get("link")?.to_str().ok()?;
    let target = link
        .split(',')
        .find(|part| part.contains("rel=\"next\""))?
        .split('<')
        .nth(1)?
        .split('>')
        .next()?;

    if target.starts_with("http://") || target.starts_with("https://") {
        return Some(target.to_string());
    }
    // Relative link: resolve against the registry origin.
    let base = url::Url::parse(registry_url).ok()?;
    base.join(target).ok().map(Into::into)
}

/// Computes the sha256 digest of a manifest body.
fn compute_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
