//! Auth0 Signals vendor API: response types and the lookup seam.

pub mod client;

use crate::error::RelayError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

pub use client::SignalsClient;

/// Body of `GET /ip/{value}`.
#[derive(Debug, Deserialize)]
pub(crate) struct SignalsResponse {
    #[serde(default)]
    pub fullip: Option<SignalsRecord>,
}

/// Reputation record for one IP (`fullip` object).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalsRecord {
    /// Overall score: 0 (clean) down to -3 (worst). Required.
    #[serde(deserialize_with = "required_score")]
    pub score: i64,

    #[serde(default)]
    pub badip: BadIp,

    #[serde(default)]
    pub baddomain: BadDomain,

    #[serde(default)]
    pub history: History,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BadIp {
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: i64,

    /// Blocklist ids the IP is listed on.
    #[serde(default, deserialize_with = "lenient_lists")]
    pub blacklists: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BadDomain {
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: i64,

    #[serde(default)]
    pub domain: DomainLists,
}

/// Blocklists the IP's hostname, MX or NS records appear on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainLists {
    #[serde(default, deserialize_with = "lenient_lists")]
    pub blacklist: Vec<String>,
    #[serde(default, deserialize_with = "lenient_lists")]
    pub blacklist_mx: Vec<String>,
    #[serde(default, deserialize_with = "lenient_lists")]
    pub blacklist_ns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct History {
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: i64,
}

/// Blocklist family in the metadata API path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlocklistKind {
    BadIp,
    BadDomain,
}

impl BlocklistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlocklistKind::BadIp => "badip",
            BlocklistKind::BadDomain => "baddomain",
        }
    }
}

impl std::fmt::Display for BlocklistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignalsRecord {
    /// Nested score for a reason category, if the category exists.
    pub fn category_score(&self, category: &str) -> Option<i64> {
        match category {
            "badip" => Some(self.badip.score),
            "baddomain" => Some(self.baddomain.score),
            "history" => Some(self.history.score),
            _ => None,
        }
    }

    /// Every blocklist membership, IP lists first, then domain lists.
    pub fn memberships(&self) -> Vec<(BlocklistKind, &str)> {
        let domain = &self.baddomain.domain;
        let ip_lists = self
            .badip
            .blacklists
            .iter()
            .map(|id| (BlocklistKind::BadIp, id.as_str()));
        let domain_lists = [&domain.blacklist, &domain.blacklist_mx, &domain.blacklist_ns]
            .into_iter()
            .flatten()
            .map(|id| (BlocklistKind::BadDomain, id.as_str()));

        ip_lists.chain(domain_lists).collect()
    }
}

/// Metadata for one blocklist (`GET /metadata/{kind}/lists/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BlocklistDetail {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    /// Sensitivity code: "1", "5" or "10".
    #[serde(default, deserialize_with = "string_or_number")]
    pub sensitivity: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: Option<String>,
}

/// Source of IP reputation data.
#[async_trait]
pub trait ReputationSource: Send + Sync {
    /// Look up one IP. `Ok(None)` means the vendor has no data for it.
    async fn lookup(&self, key: &str, ip: &str) -> Result<Option<SignalsRecord>, RelayError>;

    /// Confirm the vendor is reachable and accepts the key.
    async fn check_health(&self, key: &str) -> Result<(), RelayError>;

    /// Fetch metadata for a single blocklist.
    async fn blocklist_detail(
        &self,
        key: &str,
        kind: BlocklistKind,
        id: &str,
    ) -> Result<Option<BlocklistDetail>, RelayError>;

    /// Fetch metadata for the first `limit` blocklists in `record`. Lists the
    /// vendor has no metadata for still count toward the limit.
    async fn blocklist_details(
        &self,
        key: &str,
        record: &SignalsRecord,
        limit: usize,
    ) -> Result<Vec<BlocklistDetail>, RelayError> {
        let mut details = Vec::new();

        for (kind, id) in record.memberships().into_iter().take(limit) {
            if let Some(detail) = self.blocklist_detail(key, kind, id).await? {
                details.push(detail);
            }
        }

        Ok(details)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_score_value<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(n)) => Ok(Some(n)),
        Some(Scalar::Float(f)) => Ok(Some(f.trunc() as i64)),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid score: {s:?}"))),
    }
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(lenient_score_value(deserializer)?.unwrap_or(0))
}

fn required_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match lenient_score_value(deserializer)? {
        Some(score) => Ok(score),
        None => Err(serde::de::Error::custom("score is null")),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrText {
    List(Vec<Option<String>>),
    Text(String),
}

/// Blocklist ids as a list; `null` and `""` mean none, other text is comma-separated.
fn lenient_lists<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let ids = match Option::<ListOrText>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListOrText::List(ids)) => ids.into_iter().flatten().collect(),
        Some(ListOrText::Text(text)) => text.split(',').map(|id| id.trim().to_string()).collect(),
    };
    Ok(ids.into_iter().filter(|id| !id.is_empty()).collect())
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    }))
}
