//! npm registry client.

use super::error::PkgError;
use super::spec::{unscoped_name, PinnedPackage};
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Default registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.yarnpkg.com/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "GARN_NPM_REGISTRY";

/// Maximum archive size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// The subset of a packument the resolver needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    /// Published version strings.
    #[serde(default, deserialize_with = "version_keys")]
    pub versions: Vec<String>,
    /// Tag name -> version.
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
}

fn version_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let versions: BTreeMap<String, serde::de::IgnoredAny> = BTreeMap::deserialize(deserializer)?;
    Ok(versions.into_keys().collect())
}

/// Source of package metadata and archives.
///
/// Calls are awaited one at a time by the resolver and installer.
#[allow(async_fn_in_trait)]
pub trait Registry {
    /// Fetch the published versions and dist-tags for `name`.
    async fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, PkgError>;

    /// Fetch the `.tgz` archive for a pinned package.
    async fn fetch_archive(&self, pkg: &PinnedPackage) -> Result<Bytes, PkgError>;
}

/// HTTP registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;

        // `Url::join` drops the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .user_agent(concat!("garn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET a URL and return the body. Any non-2xx status is a transport error.
    ///
    /// # Errors
    /// Returns `TransportError` on network failure, bad status, or oversize body.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, PkgError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PkgError::transport(format!("Failed to fetch '{url}': {e}")))?;

        if !response.status().is_success() {
            return Err(PkgError::transport(format!(
                "Fetch failed with status {} for '{url}'",
                response.status()
            )));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_TARBALL_SIZE {
                return Err(PkgError::transport(format!(
                    "Response too large: {len} bytes (max: {MAX_TARBALL_SIZE})"
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PkgError::transport(format!("Failed to read response body: {e}")))?;

        if bytes.len() as u64 > MAX_TARBALL_SIZE {
            return Err(PkgError::transport(format!(
                "Response too large: {} bytes (max: {MAX_TARBALL_SIZE})",
                bytes.len()
            )));
        }

        Ok(bytes)
    }

    /// Build the archive URL for an exact version.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be built.
    pub fn tarball_url(&self, name: &str, version: &str) -> Result<Url, PkgError> {
        let path = format!("{name}/-/{}-{version}.tgz", unscoped_name(name));
        self.base_url
            .join(&path)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))
    }

    fn metadata_url(&self, name: &str) -> Result<Url, PkgError> {
        // URL-encode the name for scoped packages
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        self.base_url
            .join(&encoded_name)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))
    }
}

impl Registry for RegistryClient {
    async fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, PkgError> {
        let url = self.metadata_url(name)?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PkgError::registry(format!("Package not found: {name}")));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        parse_metadata(name, &body)
    }

    async fn fetch_archive(&self, pkg: &PinnedPackage) -> Result<Bytes, PkgError> {
        match pkg.version() {
            Some(version) => {
                let url = self.tarball_url(&pkg.name, &version.to_string())?;
                self.fetch(url.as_str()).await
            }
            None => self.fetch(&pkg.reference).await,
        }
    }
}

/// Parse a packument body.
///
/// # Errors
/// Returns `RegistryError` if the body is not a packument.
pub fn parse_metadata(name: &str, body: &[u8]) -> Result<PackageMetadata, PkgError> {
    serde_json::from_slice(body)
        .map_err(|e| PkgError::registry(format!("Invalid metadata for '{name}': {e}")))
}
