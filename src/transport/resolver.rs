//! Token and host discovery.
//!
//! Before connecting, the client asks the live metadata API for an auth
//! token and a list of push servers for the room:
//!
//! ```text
//! GET /xlive/web-room/v1/index/getDanmuInfo?id=<room_id>
//!
//! {"code":0,"data":{"token":"...","host_list":[
//!     {"host":"broadcastlv.chat.bilibili.com","port":2243,"wss_port":443,"ws_port":2244}
//! ]}}
//! ```
//!
//! Each host is then resolved to its first IPv4 address. Hosts that do not
//! resolve are skipped, keeping the server's order for the rest.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::lookup_host;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default metadata endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://api.live.bilibili.com/xlive/web-room/v1/index/getDanmuInfo";

/// Default metadata request timeout.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with metadata requests.
const USER_AGENT: &str = concat!("blive-rs/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HostCandidate
// ============================================================================

/// A push server the session may connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCandidate {
    /// Hostname as reported by the metadata API.
    pub host: String,
    /// Resolved IPv4 address.
    pub addr: Ipv4Addr,
    /// Plain TCP port.
    pub port: u16,
    /// WebSocket port (unused).
    pub ws_port: u16,
    /// Secure WebSocket port (unused).
    pub wss_port: u16,
}

impl HostCandidate {
    /// Creates a candidate for a known TCP address with no WebSocket ports.
    #[must_use]
    pub fn new(host: impl Into<String>, addr: SocketAddrV4) -> Self {
        Self {
            host: host.into(),
            addr: *addr.ip(),
            port: addr.port(),
            ws_port: 0,
            wss_port: 0,
        }
    }

    /// Returns the TCP address to connect to.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.addr, self.port))
    }
}

impl fmt::Display for HostCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.host, self.addr, self.port)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Auth token plus the ordered candidate hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Token for the auth request.
    pub token: String,
    /// Candidate hosts, tried in order.
    pub hosts: Vec<HostCandidate>,
}

// ============================================================================
// HostResolver Trait
// ============================================================================

/// Turns a room id into a token and candidate hosts.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolves credentials for `room_id`.
    ///
    /// # Errors
    ///
    /// [`Error::ResolveFailed`] if no usable credentials are available.
    async fn resolve(&self, room_id: u64) -> Result<Credentials>;
}

// ============================================================================
// Metadata Response
// ============================================================================

/// Top-level metadata response.
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<DanmuInfo>,
}

/// Payload of a successful metadata response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DanmuInfo {
    /// Auth token.
    pub token: String,
    /// Unresolved host entries.
    pub host_list: Vec<HostRecord>,
}

/// One unresolved host entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostRecord {
    /// Hostname.
    pub host: String,
    /// Plain TCP port.
    pub port: u16,
    /// WebSocket port.
    pub ws_port: u16,
    /// Secure WebSocket port.
    pub wss_port: u16,
}

impl DanmuInfo {
    /// Parses a metadata response body.
    ///
    /// # Errors
    ///
    /// [`Error::ResolveFailed`] if the body is not JSON, reports a non-zero
    /// `code`, or lacks a well-typed `token` or `host_list`.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let response: MetadataResponse = serde_json::from_slice(body)
            .map_err(|e| Error::resolve_failed(format!("malformed metadata: {e}")))?;

        if response.code != 0 {
            return Err(Error::resolve_failed(format!(
                "metadata API returned code {}: {}",
                response.code, response.message
            )));
        }

        response
            .data
            .ok_or_else(|| Error::resolve_failed("metadata has no `data` object"))
    }
}

/// Resolves each record to its first IPv4 address.
///
/// Records that fail to resolve, or resolve only to IPv6, are skipped.
///
/// # Errors
///
/// [`Error::ResolveFailed`] if no record survives.
pub async fn resolve_records(records: &[HostRecord]) -> Result<Vec<HostCandidate>> {
    let mut hosts = Vec::with_capacity(records.len());

    for record in records {
        let addrs = match lookup_host((record.host.as_str(), record.port)).await {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!(host = %record.host, error = %e, "Host lookup failed, skipping");
                continue;
            }
        };

        let Some(addr) = addrs.into_iter().find_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        }) else {
            warn!(host = %record.host, "Host has no IPv4 address, skipping");
            continue;
        };

        debug!(host = %record.host, %addr, port = record.port, "Host resolved");
        hosts.push(HostCandidate {
            host: record.host.clone(),
            addr,
            port: record.port,
            ws_port: record.ws_port,
            wss_port: record.wss_port,
        });
    }

    if hosts.is_empty() {
        return Err(Error::resolve_failed(format!(
            "none of {} host(s) resolved to an IPv4 address",
            records.len()
        )));
    }

    Ok(hosts)
}

// ============================================================================
// HttpResolver
// ============================================================================

/// Resolver backed by the live metadata HTTP API.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpResolver {
    /// Creates a resolver for the default endpoint.
    ///
    /// # Errors
    ///
    /// [`Error::ResolveFailed`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_ENDPOINT, DEFAULT_RESOLVE_TIMEOUT)
    }

    /// Creates a resolver for a custom endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `endpoint` is not a valid URL
    /// - [`Error::ResolveFailed`] if the HTTP client cannot be built
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Self::with_options(endpoint, DEFAULT_RESOLVE_TIMEOUT)
    }

    /// Creates a resolver with a custom endpoint and request timeout.
    ///
    /// # Errors
    ///
    /// See [`with_endpoint`](Self::with_endpoint).
    pub fn with_options(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            Error::invalid_argument(format!("invalid resolver endpoint {endpoint:?}: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::resolve_failed(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// Returns the metadata endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the request URL for `room_id`.
    #[must_use]
    pub fn request_url(&self, room_id: u64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id", &room_id.to_string());
        url
    }
}

#[async_trait]
impl HostResolver for HttpResolver {
    async fn resolve(&self, room_id: u64) -> Result<Credentials> {
        let url = self.request_url(room_id);
        debug!(room_id, %url, "Requesting push server metadata");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::resolve_failed(format!("metadata request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::resolve_failed(format!(
                "metadata request returned {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::resolve_failed(format!("metadata body read failed: {e}")))?;

        let info = DanmuInfo::parse(&body)?;
        debug!(room_id, hosts = info.host_list.len(), "Metadata received");

        let hosts = resolve_records(&info.host_list).await?;
        Ok(Credentials {
            token: info.token,
            hosts,
        })
    }
}

// ============================================================================
// StaticResolver
// ============================================================================

/// Resolver that always returns the same credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResolver {
    credentials: Credentials,
}

impl StaticResolver {
    /// Creates a resolver returning `token` and `hosts`.
    #[must_use]
    pub fn new(token: impl Into<String>, hosts: Vec<HostCandidate>) -> Self {
        Self {
            credentials: Credentials {
                token: token.into(),
                hosts,
            },
        }
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, room_id: u64) -> Result<Credentials> {
        if self.credentials.hosts.is_empty() {
            return Err(Error::resolve_failed(format!(
                "no static hosts configured for room {room_id}"
            )));
        }
        Ok(self.credentials.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
