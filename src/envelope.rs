//! Response envelope: `{data, errors?}`.

use crate::ctim::{Indicator, Judgement, ReferLink, Relationship, Sighting, Verdict};
use crate::error::{ErrorDoc, RelayError};
use serde::Serialize;

/// A category of documents as `{count, docs}`.
#[derive(Debug, Clone, Serialize)]
pub struct DocList<T> {
    pub count: usize,
    pub docs: Vec<T>,
}

impl<T> DocList<T> {
    /// `None` for an empty category so it is left out of the response.
    fn non_empty(docs: Vec<T>) -> Option<Self> {
        if docs.is_empty() {
            None
        } else {
            Some(Self {
                count: docs.len(),
                docs,
            })
        }
    }
}

/// `data` of the deliberate and observe routes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdicts: Option<DocList<Verdict>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judgements: Option<DocList<Judgement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sightings: Option<DocList<Sighting>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<DocList<Indicator>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<DocList<Relationship>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Enrichment(EnrichmentData),
    Refer(Vec<ReferLink>),
    Health(HealthStatus),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Enrichment(EnrichmentData::default())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Envelope {
    pub data: Payload,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDoc>,
}

impl Envelope {
    pub fn data(data: Payload) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Envelope for a request that failed before producing any data.
    pub fn failure(error: &RelayError) -> Self {
        Self {
            data: Payload::default(),
            errors: vec![error.to_doc()],
        }
    }
}

/// Documents and errors accumulated over one enrichment request.
#[derive(Debug, Default)]
pub struct Observations {
    pub verdicts: Vec<Verdict>,
    pub judgements: Vec<Judgement>,
    pub sightings: Vec<Sighting>,
    pub indicators: Vec<Indicator>,
    pub relationships: Vec<Relationship>,
    pub errors: Vec<ErrorDoc>,
}

impl Observations {
    pub fn push_error(&mut self, error: &RelayError) {
        self.errors.push(error.to_doc());
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope {
            data: Payload::Enrichment(EnrichmentData {
                verdicts: DocList::non_empty(self.verdicts),
                judgements: DocList::non_empty(self.judgements),
                sightings: DocList::non_empty(self.sightings),
                indicators: DocList::non_empty(self.indicators),
                relationships: DocList::non_empty(self.relationships),
            }),
            errors: self.errors,
        }
    }
}
