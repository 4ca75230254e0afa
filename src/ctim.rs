//! Normalization of Signals data into CTIM documents.
//!
//! Every builder runs off a [`CtimContext`] holding the configured tables and
//! a single clock reading, so all documents in one response share timestamps.

use crate::config::CtimConfig;
use crate::error::RelayError;
use crate::observable::Observable;
use crate::signals::{BlocklistDetail, SignalsRecord};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

const CONFIDENCE: &str = "High";
const PRODUCER: &str = "Auth0 Signals";
const SIGHTING_DESCRIPTION: &str = "Found on blocklist";
const UNKNOWN_SEVERITY: &str = "Unknown";

#[derive(Debug, Clone, Serialize)]
pub struct ValidTime {
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObservedTime {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub observable: Observable,
    pub disposition: u8,
    pub disposition_name: String,
    pub valid_time: ValidTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Judgement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub observable: Observable,
    pub disposition: u8,
    pub disposition_name: &'static str,
    pub confidence: &'static str,
    pub severity: &'static str,
    pub priority: u8,
    pub reason: String,
    pub source: String,
    pub schema_version: String,
    pub valid_time: ValidTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sighting {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub count: u32,
    pub confidence: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    pub observables: Vec<Observable>,
    pub observed_time: ObservedTime,
    pub severity: String,
    pub tlp: &'static str,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Indicator {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub producer: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub confidence: &'static str,
    pub severity: String,
    pub tlp: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    pub valid_time: ValidTime,
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub relationship_type: &'static str,
    pub source_ref: String,
    pub target_ref: String,
    pub schema_version: String,
}

/// UI pivot returned by the refer route.
#[derive(Debug, Clone, Serialize)]
pub struct ReferLink {
    pub id: String,
    pub title: &'static str,
    pub description: &'static str,
    pub url: String,
    pub categories: [&'static str; 2],
}

fn transient_id(kind: &str) -> String {
    format!("transient:{kind}-{}", Uuid::new_v4())
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// TLP marking derived from blocklist visibility.
pub fn tlp(visibility: Option<&str>) -> &'static str {
    match visibility {
        Some("Public") => "white",
        _ => "amber",
    }
}

/// Document builders bound to one request.
pub struct CtimContext<'a> {
    config: &'a CtimConfig,
    now: DateTime<Utc>,
}

impl<'a> CtimContext<'a> {
    pub fn new(config: &'a CtimConfig) -> Self {
        Self::at(config, Utc::now())
    }

    pub fn at(config: &'a CtimConfig, now: DateTime<Utc>) -> Self {
        Self { config, now }
    }

    fn now(&self) -> String {
        timestamp(self.now)
    }

    fn severity(&self, sensitivity: Option<&str>) -> String {
        sensitivity
            .and_then(|code| self.config.severities.get(code.trim()))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string())
    }

    /// Verdict from the record's overall score.
    pub fn verdict(
        &self,
        record: &SignalsRecord,
        observable: &Observable,
    ) -> Result<Verdict, RelayError> {
        let mapping = self
            .config
            .dispositions
            .get(&record.score)
            .ok_or(RelayError::UnexpectedScore(record.score))?;

        Ok(Verdict {
            kind: "verdict",
            observable: observable.clone(),
            disposition: mapping.disposition,
            disposition_name: mapping.disposition_name.clone(),
            valid_time: ValidTime {
                start_time: self.now(),
                end_time: None,
            },
        })
    }

    /// One judgement per reason category with a negative score.
    pub fn judgements(&self, record: &SignalsRecord, observable: &Observable) -> Vec<Judgement> {
        let end = self.now + Duration::days(self.config.judgement_valid_days);

        self.config
            .reasons
            .iter()
            .filter(|(category, _)| record.category_score(category).is_some_and(|s| s < 0))
            .map(|(_, reason)| Judgement {
                id: transient_id("judgement"),
                kind: "judgement",
                observable: observable.clone(),
                disposition: 3,
                disposition_name: "Suspicious",
                confidence: CONFIDENCE,
                severity: "Medium",
                priority: 90,
                reason: reason.clone(),
                source: self.config.source.clone(),
                schema_version: self.config.schema_version.clone(),
                valid_time: ValidTime {
                    start_time: self.now(),
                    end_time: Some(timestamp(end)),
                },
            })
            .collect()
    }

    /// One sighting per blocklist the observable was found on.
    pub fn sightings(&self, details: &[BlocklistDetail], observable: &Observable) -> Vec<Sighting> {
        details
            .iter()
            .map(|detail| Sighting {
                id: transient_id("sighting"),
                kind: "sighting",
                count: 1,
                confidence: CONFIDENCE,
                description: SIGHTING_DESCRIPTION,
                short_description: detail.name.clone(),
                observables: vec![observable.clone()],
                observed_time: ObservedTime {
                    start_time: self.now(),
                    end_time: self.now(),
                },
                severity: self.severity(detail.sensitivity.as_deref()),
                tlp: tlp(detail.visibility.as_deref()),
                source: self.config.source.clone(),
                source_uri: detail.site.clone(),
                schema_version: self.config.schema_version.clone(),
            })
            .collect()
    }

    /// One indicator per blocklist.
    pub fn indicators(&self, details: &[BlocklistDetail]) -> Vec<Indicator> {
        details
            .iter()
            .map(|detail| Indicator {
                id: transient_id("indicator"),
                kind: "indicator",
                producer: PRODUCER,
                title: detail.name.clone(),
                description: detail.description.clone(),
                tags: split_tags(detail.tags.as_deref()),
                confidence: CONFIDENCE,
                severity: self.severity(detail.sensitivity.as_deref()),
                tlp: tlp(detail.visibility.as_deref()),
                source: detail.source.clone(),
                source_uri: detail.site.clone(),
                valid_time: ValidTime {
                    start_time: self.now(),
                    end_time: None,
                },
                schema_version: self.config.schema_version.clone(),
            })
            .collect()
    }

    /// Link sightings to indicators by position.
    pub fn relationships(
        &self,
        sightings: &[Sighting],
        indicators: &[Indicator],
    ) -> Vec<Relationship> {
        sightings
            .iter()
            .zip(indicators)
            .map(|(sighting, indicator)| Relationship {
                id: transient_id("relationship"),
                kind: "relationship",
                relationship_type: "sighting-of",
                source_ref: sighting.id.clone(),
                target_ref: indicator.id.clone(),
                schema_version: self.config.schema_version.clone(),
            })
            .collect()
    }
}

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Search pivot for the Signals UI.
pub fn refer_link(ui_url: &str, observable: &Observable) -> ReferLink {
    ReferLink {
        id: format!(
            "ref-auth0-signals-search-{}-{}",
            observable.kind, observable.value
        ),
        title: "Search for this IP",
        description: "Lookup this IP on Auth0 Signals",
        url: ui_url.replace("{value}", &observable.value),
        categories: ["Search", "Auth0 Signals"],
    }
}
