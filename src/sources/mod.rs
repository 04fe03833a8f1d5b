//! Domain source loading
//!
//! Block and override domains are loaded from newline-delimited text
//! sources, either local files or http(s) URLs. Sources use the common
//! hosts-list format: plain domain names, or `0.0.0.0 domain` style hosts
//! lines; `#` starts a comment. Empty results are valid and the caller
//! treats them as "nothing to do", never as an error.

use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::path::Path;

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Method, Request};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::client::build_https_client;

/// Error type for domain source loading
#[derive(Debug, Error)]
pub enum SourceError {
    /// Local file could not be read
    #[error("Failed to read source file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote source could not be fetched
    #[error("Failed to fetch source {url}: {detail}")]
    Fetch { url: String, detail: String },
}

impl SourceError {
    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SourceError::Fetch { .. })
    }
}

/// Result type for source loading
pub type SourceResult<T> = Result<T, SourceError>;

/// Domains to be redirected to one destination address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRoute {
    /// Destination IP the gateway should answer with
    pub destination: String,
    /// Domains redirected to the destination
    pub domains: Vec<String>,
}

/// Load block domains from the configured sources
///
/// Domains are deduplicated across sources, preserving first-seen order.
pub async fn load_block_domains(sources: &[String]) -> SourceResult<Vec<String>> {
    let mut domains = Vec::new();
    let mut seen = HashSet::new();

    for source in sources {
        let contents = fetch_source(source).await?;
        let parsed = parse_hosts(&contents);
        debug!("Source {} yielded {} domains", source, parsed.len());
        for domain in parsed {
            if seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
    }

    info!(
        "Loaded {} block domains from {} sources",
        domains.len(),
        sources.len()
    );
    Ok(domains)
}

/// Load override routes from the configured destination → sources map
///
/// Destinations whose sources yield no domains are dropped with a warning.
pub async fn load_override_routes(
    redirect: &BTreeMap<String, Vec<String>>,
) -> SourceResult<Vec<OverrideRoute>> {
    let mut routes = Vec::new();

    for (destination, sources) in redirect {
        let domains = load_block_domains(sources).await?;
        if domains.is_empty() {
            warn!("No domains to redirect to {}, skipping", destination);
            continue;
        }
        routes.push(OverrideRoute {
            destination: destination.clone(),
            domains,
        });
    }

    Ok(routes)
}

/// Fetch one source as text, from a local path or an http(s) URL
async fn fetch_source(source: &str) -> SourceResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_url(source).await
    } else {
        std::fs::read_to_string(Path::new(source)).map_err(|e| SourceError::Io {
            path: source.to_string(),
            source: e,
        })
    }
}

async fn fetch_url(url: &str) -> SourceResult<String> {
    let client = build_https_client().map_err(|e| SourceError::Fetch {
        url: url.to_string(),
        detail: e.to_string(),
    })?;

    let request = Request::builder()
        .method(Method::GET)
        .uri(url)
        .header("User-Agent", crate::api::constants::USER_AGENT)
        .body(http_body_util::Full::new(Bytes::new()))
        .map_err(|e| SourceError::Fetch {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

    let response = client
        .request(request)
        .await
        .map_err(|e| SourceError::Fetch {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

    let (parts, body) = response.into_parts();
    let body_bytes = body
        .collect()
        .await
        .map_err(|e| SourceError::Fetch {
            url: url.to_string(),
            detail: e.to_string(),
        })?
        .to_bytes();

    if !parts.status.is_success() {
        return Err(SourceError::Fetch {
            url: url.to_string(),
            detail: format!("HTTP {}", parts.status),
        });
    }

    Ok(String::from_utf8_lossy(&body_bytes).into_owned())
}

/// Names that appear in hosts files but are not routable domains
const HOSTS_NOISE: &[&str] = &["localhost", "localhost.localdomain", "broadcasthost", "local"];

/// Parse hosts-format text into domain names
///
/// Accepts plain domain lines and `<ip> <domain>` hosts lines. Comments
/// (`#` to end of line) and blank lines are ignored, as are bare IP
/// lines and the conventional localhost entries.
fn parse_hosts(contents: &str) -> Vec<String> {
    let mut domains = Vec::new();

    for line in contents.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let first = tokens.next().unwrap_or("");

        let domain = if first.parse::<IpAddr>().is_ok() {
            match tokens.next() {
                Some(second) => second,
                None => continue, // bare IP line
            }
        } else {
            first
        };

        if HOSTS_NOISE.contains(&domain) {
            continue;
        }

        domains.push(domain.to_ascii_lowercase());
    }

    domains
}
