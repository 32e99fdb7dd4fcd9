//! Agent-card discovery with an SSRF guard and a bounded fan-out.

use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

use automaton_core::message::DiscoveredAgent;
use automaton_core::validate::validate_address;
use automaton_core::{Error, HttpClient, Result};
use automaton_crypto::keccak_hex;
use automaton_state::StateStore;

/// Well-known path every agent serves its card at.
pub const CARD_PATH: &str = "/.well-known/agent-card.json";

/// How long a fetched card stays fresh.
const CARD_TTL_HOURS: i64 = 1;

/// Cap on concurrent card fetches.
const MAX_CONCURRENT_FETCHES: usize = 5;

/// Whether a URI may be fetched at all: HTTPS only, and never anything
/// that resolves into our own network neighbourhood.
pub fn is_allowed_uri(uri: &str) -> bool {
    let Some(rest) = uri.strip_prefix("https://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    if host.is_empty() {
        return false;
    }
    if host == "localhost" || host.ends_with(".localhost") || host.ends_with(".local") {
        return false;
    }
    if host.starts_with('[') {
        // IPv6 literals (loopback, link-local, everything) are refused.
        return false;
    }
    if let Some(octets) = parse_ipv4(&host) {
        return !is_private_ipv4(octets);
    }
    true
}

fn parse_ipv4(host: &str) -> Option<[u8; 4]> {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut octets = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
        octets[i] = part.parse().ok()?;
    }
    Some(octets)
}

fn is_private_ipv4(octets: [u8; 4]) -> bool {
    match octets {
        [0, ..] => true,
        [10, ..] => true,
        [127, ..] => true,
        [169, 254, ..] => true,
        [172, b, ..] if (16..=31).contains(&b) => true,
        [192, 168, ..] => true,
        _ => false,
    }
}

/// Fetches and caches other agents' cards.
pub struct AgentDiscovery {
    store: Arc<StateStore>,
    http: Arc<dyn HttpClient>,
}

impl AgentDiscovery {
    /// Discovery over the shared store and HTTP client.
    pub fn new(store: Arc<StateStore>, http: Arc<dyn HttpClient>) -> Self {
        Self { store, http }
    }

    /// A card for `address`: fresh cache hit, or a fetch from the
    /// agent's endpoint base.
    pub async fn discover(&self, address: &str, endpoint_base: &str) -> Result<DiscoveredAgent> {
        validate_address(address)?;
        let address = address.to_lowercase();

        let now = automaton_core::id::now_iso();
        if let Some(cached) = self.store.get_discovered_agent(&address, &now)? {
            return Ok(cached);
        }

        let url = format!("{}{CARD_PATH}", endpoint_base.trim_end_matches('/'));
        if !is_allowed_uri(&url) {
            return Err(Error::InvalidInput(format!("blocked card uri: {url}")));
        }

        let response = self.http.get(&url).await?;
        if !(200..300).contains(&response.status) {
            return Err(Error::Unavailable(format!(
                "card fetch returned HTTP {}",
                response.status
            )));
        }

        let card: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| Error::Integrity(format!("unparseable agent card: {e}")))?;
        let agent = DiscoveredAgent {
            agent_address: address,
            card,
            fetched_from: url,
            card_hash: keccak_hex(response.body.as_bytes()),
            valid_until: automaton_core::id::to_iso(Utc::now() + Duration::hours(CARD_TTL_HOURS)),
            fetch_count: 1,
        };
        self.store.upsert_discovered_agent(&agent)?;
        Ok(agent)
    }

    /// Discover many agents concurrently, at most five in flight.
    /// Failures come back as per-address errors, not a collapsed run.
    pub async fn discover_many(
        &self,
        targets: &[(String, String)],
    ) -> Vec<(String, Result<DiscoveredAgent>)> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
        let fetches = targets.iter().map(|(address, endpoint)| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                (address.clone(), self.discover(address, endpoint).await)
            }
        });
        join_all(fetches).await
    }
}
