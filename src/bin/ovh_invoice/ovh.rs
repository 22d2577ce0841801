//! OVH API client module.
//!
//! Implements the signed GET requests used to read billing records.
//!
//! Documentation:
//! <https://help.ovhcloud.com/csm/en-api-getting-started-ovhcloud-api>

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};

use crate::api::BillingApi;
use crate::period::BillingPeriod;
use crate::records::{Record, RecordKind};

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Known endpoint aliases and their API base urls.
const ENDPOINTS: [(&str, &str); 7] = [
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Read-only access rights requested when creating a consumer key.
const TOKEN_RIGHTS: [&str; 8] = [
    "/me/bill",
    "/me/bill/*",
    "/me/deposit",
    "/me/deposit/*",
    "/me/order",
    "/me/order/*",
    "/me/refund",
    "/me/refund/*",
];

/// Application and consumer credentials for signing requests.
#[derive(Clone, Default)]
pub struct Credentials {
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("application_key", &self.application_key)
            .field("application_secret", &"***")
            .field("consumer_key", &"***")
            .finish()
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// OVH API client.
#[derive(Debug)]
pub struct OvhClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    /// Server time minus local time in seconds.
    time_delta: i64,
}

impl OvhClient {
    /// Create a new client for the given endpoint alias or url.
    ///
    /// # Errors
    /// Returns an error if a credential is missing or the endpoint is unknown.
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self> {
        if credentials.application_key.is_empty() {
            bail!("Missing application key (set --application-key or OVH_AK)");
        }
        if credentials.application_secret.is_empty() {
            bail!("Missing application secret (set --application-secret or OVH_AS)");
        }
        if credentials.consumer_key.is_empty() {
            bail!("Missing consumer key (set --consumer-key or OVH_CK, run `init` to create one)");
        }

        let base_url = resolve_endpoint(endpoint)?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
            time_delta: 0,
        })
    }

    /// Create a new client and synchronise its clock with the API server.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created or the server time cannot be read.
    pub async fn connect(endpoint: &str, credentials: Credentials) -> Result<Self> {
        let mut client = Self::new(endpoint, credentials)?;
        client.sync_time().await?;
        Ok(client)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read the server time so request timestamps are not rejected because of local clock drift.
    async fn sync_time(&mut self) -> Result<()> {
        let url = format!("{}/auth/time", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get API server time")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read API server time")?;
        if !status.is_success() {
            bail!("Failed to get API server time: HTTP {status} - {body}");
        }

        self.time_delta = parse_server_time(&body)? - Utc::now().timestamp();
        Ok(())
    }

    /// Send a signed GET request and parse the JSON response.
    ///
    /// # Errors
    /// Returns an error if the request fails, the API responds with an error status,
    /// or the response cannot be parsed.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.build_url(path, query)?;
        let timestamp = Utc::now().timestamp() + self.time_delta;
        let signature = sign(&self.credentials, "GET", url.as_str(), "", timestamp);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header("X-Ovh-Application", &self.credentials.application_key)
            .header("X-Ovh-Consumer", &self.credentials.consumer_key)
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Signature", signature)
            .send()
            .await
            .with_context(|| format!("Failed to send request: GET {path}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response: GET {path}"))?;

        if !status.is_success() {
            return Err(api_error(status, path, &body));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse response JSON: GET {path}"))
    }

    /// Build full API url from the base url, path and query parameters.
    fn build_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let url = format!("{}{path}", self.base_url);
        if query.is_empty() {
            Url::parse(&url)
        } else {
            Url::parse_with_params(&url, query)
        }
        .with_context(|| format!("Invalid API url: {url}"))
    }
}

impl BillingApi for OvhClient {
    async fn list_ids(&self, kind: RecordKind, period: &BillingPeriod) -> Result<Vec<String>> {
        let (path, [(from_key, from), (to_key, to)]) = list_request(kind, period);
        self.get(&path, &[(from_key, from.as_str()), (to_key, to.as_str())]).await
    }

    async fn get_record<R: Record>(&self, id: &str) -> Result<R> {
        self.get(&format!("/me/{}/{id}", R::KIND.api_path()), &[]).await
    }

    async fn paid_bills(&self, deposit_id: &str) -> Result<Vec<String>> {
        self.get(&format!("/me/deposit/{deposit_id}/paidBills"), &[]).await
    }

    /// Documents are served from a pre-signed url and are fetched without API headers.
    async fn download_document(&self, url: &str) -> Result<Vec<u8>> {
        if url.is_empty() {
            bail!("Record has no document url");
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send document request")?;

        check_document_status(response.status())?;
        let bytes = response.bytes().await.context("Failed to read document")?;
        Ok(bytes.to_vec())
    }
}

/// Path and date range query for listing records of one kind.
fn list_request(kind: RecordKind, period: &BillingPeriod) -> (String, [(&'static str, String); 2]) {
    let (from, to) = period.api_range();
    (format!("/me/{}", kind.api_path()), [("date.from", from), ("date.to", to)])
}

/// Parse the Unix timestamp returned by `/auth/time`.
fn parse_server_time(body: &str) -> Result<i64> {
    body.trim()
        .parse()
        .with_context(|| format!("Invalid API server time: '{}'", body.trim()))
}

fn check_document_status(status: StatusCode) -> Result<()> {
    match status {
        _ if status.is_success() => Ok(()),
        StatusCode::NOT_FOUND => bail!("Document not found: HTTP {status}"),
        StatusCode::FORBIDDEN => bail!("Document link expired or access denied: HTTP {status}"),
        _ => bail!("Failed to download document: HTTP {status}"),
    }
}

/// Resolve an endpoint alias such as `ovh-eu` to its API base url.
///
/// Values starting with `http://` or `https://` are used as is.
///
/// # Errors
/// Returns an error for an unknown alias.
pub fn resolve_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }

    ENDPOINTS
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(endpoint))
        .map(|(_, url)| (*url).to_string())
        .ok_or_else(|| {
            let known = ENDPOINTS.iter().map(|(alias, _)| *alias).collect::<Vec<_>>().join(", ");
            anyhow!("Unknown API endpoint '{endpoint}', expected one of: {known}")
        })
}

/// Url of the consumer key creation page with read-only billing rights.
///
/// # Errors
/// Returns an error for an unknown endpoint alias.
pub fn token_creation_url(endpoint: &str) -> Result<String> {
    let base_url = resolve_endpoint(endpoint)?;
    let host = base_url.strip_suffix("/1.0").unwrap_or(&base_url);
    let rights = TOKEN_RIGHTS
        .iter()
        .map(|right| format!("GET={right}"))
        .collect::<Vec<_>>()
        .join("&");
    Ok(format!("{host}/createToken/?{rights}"))
}

/// Compute the `X-Ovh-Signature` header value.
///
/// The signature is `$1$` followed by the hex SHA-1 of
/// `secret+consumer_key+method+url+body+timestamp`.
#[must_use]
pub fn sign(credentials: &Credentials, method: &str, url: &str, body: &str, timestamp: i64) -> String {
    let payload = format!(
        "{}+{}+{method}+{url}+{body}+{timestamp}",
        credentials.application_secret, credentials.consumer_key
    );
    let digest = Sha1::digest(payload.as_bytes());
    format!("$1${}", to_hex(&digest))
}

/// Convert bytes to a lowercase hex string.
fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push(char::from(HEX_CHARS[(byte >> 4) as usize]));
        hex.push(char::from(HEX_CHARS[(byte & 0x0f) as usize]));
    }
    hex
}

/// Build an error from an unsuccessful API response.
fn api_error(status: StatusCode, path: &str, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<ApiError>(body).map_or_else(|_| body.trim().to_string(), |error| error.message);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            anyhow!("Access denied for GET {path}: HTTP {status} - {message}")
        }
        StatusCode::NOT_FOUND => anyhow!("Not found: GET {path} - {message}"),
        _ => anyhow!("Request failed: GET {path}: HTTP {status} - {message}"),
    }
}
