//! Request orchestration for the relay routes.
//!
//! Each route authenticates, validates the observables, dispatches to the
//! Signals API and normalizes the results. Failures before dispatch end the
//! request; failures while enriching one observable are recorded and the
//! remaining observables are still processed.

use crate::auth::{extract_bearer, provider_from_config, AuthProvider};
use crate::config::Config;
use crate::ctim::{refer_link, CtimContext};
use crate::envelope::{Envelope, HealthStatus, Observations, Payload};
use crate::error::RelayError;
use crate::observable::{parse_observables, Observable};
use crate::signals::{ReputationSource, SignalsClient};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which documents an enrichment request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Verdicts only.
    Deliberate,
    /// Verdicts, judgements, sightings, indicators and relationships.
    Observe,
}

/// Signals relay.
pub struct Relay {
    config: Arc<Config>,
    auth: Arc<dyn AuthProvider>,
    source: Arc<dyn ReputationSource>,
}

impl Relay {
    /// Create a relay backed by the Auth0 Signals API.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = SignalsClient::new(&config.signals)?;
        let auth = provider_from_config(&config.auth);

        info!(
            api_url = %config.signals.api_url,
            auth_mode = ?config.auth.mode,
            entities_limit = config.signals.entities_limit,
            "Signals relay initialized"
        );

        Ok(Self::with_parts(Arc::new(config), auth, Arc::new(client)))
    }

    /// Assemble a relay from explicit parts.
    pub fn with_parts(
        config: Arc<Config>,
        auth: Arc<dyn AuthProvider>,
        source: Arc<dyn ReputationSource>,
    ) -> Self {
        Self {
            config,
            auth,
            source,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn authenticate(&self, authorization: Option<&str>) -> Result<String, RelayError> {
        let token = extract_bearer(authorization)?;
        self.auth.vendor_key(token)
    }

    fn prepare(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Result<(String, Vec<Observable>), RelayError> {
        let key = self.authenticate(authorization)?;
        let observables = parse_observables(body)?;
        Ok((key, observables))
    }

    /// `POST /deliberate/observables`
    pub async fn deliberate(&self, authorization: Option<&str>, body: &[u8]) -> Envelope {
        self.enrich(authorization, body, Mode::Deliberate).await
    }

    /// `POST /observe/observables`
    pub async fn observe(&self, authorization: Option<&str>, body: &[u8]) -> Envelope {
        self.enrich(authorization, body, Mode::Observe).await
    }

    /// `POST /refer/observables`
    pub async fn refer(&self, authorization: Option<&str>, body: &[u8]) -> Envelope {
        let observables = match self.prepare(authorization, body) {
            Ok((_, observables)) => observables,
            Err(e) => return rejected("refer", &e),
        };

        let links = observables
            .iter()
            .filter(|o| o.is_supported())
            .map(|o| refer_link(&self.config.signals.ui_url, o))
            .collect();

        Envelope::data(Payload::Refer(links))
    }

    /// `POST /health`
    pub async fn health(&self, authorization: Option<&str>) -> Envelope {
        let key = match self.authenticate(authorization) {
            Ok(key) => key,
            Err(e) => return rejected("health", &e),
        };

        match self.source.check_health(&key).await {
            Ok(()) => Envelope::data(Payload::Health(HealthStatus { status: "ok" })),
            Err(e) => {
                warn!(error = %e, "Auth0 Signals health check failed");
                Envelope::failure(&e)
            }
        }
    }

    async fn enrich(&self, authorization: Option<&str>, body: &[u8], mode: Mode) -> Envelope {
        let (key, observables) = match self.prepare(authorization, body) {
            Ok(prepared) => prepared,
            Err(e) => return rejected(mode.route(), &e),
        };

        let ctx = CtimContext::new(&self.config.ctim);
        let mut observations = Observations::default();

        for observable in &observables {
            if !observable.is_supported() {
                debug!(kind = %observable.kind, "Skipping unsupported observable");
                continue;
            }

            if let Err(e) = self
                .enrich_one(&key, observable, mode, &ctx, &mut observations)
                .await
            {
                warn!(
                    value = %observable.value,
                    code = %e.code(),
                    error = %e,
                    "Enrichment failed"
                );
                observations.push_error(&e);
            }
        }

        debug!(
            route = mode.route(),
            observables = observables.len(),
            verdicts = observations.verdicts.len(),
            sightings = observations.sightings.len(),
            errors = observations.errors.len(),
            "Enrichment complete"
        );

        observations.into_envelope()
    }

    async fn enrich_one(
        &self,
        key: &str,
        observable: &Observable,
        mode: Mode,
        ctx: &CtimContext<'_>,
        out: &mut Observations,
    ) -> Result<(), RelayError> {
        let Some(record) = self.source.lookup(key, &observable.value).await? else {
            debug!(value = %observable.value, "No Auth0 Signals data");
            return Ok(());
        };

        out.verdicts.push(ctx.verdict(&record, observable)?);

        if mode == Mode::Deliberate {
            return Ok(());
        }

        out.judgements.extend(ctx.judgements(&record, observable));

        let details = self
            .source
            .blocklist_details(key, &record, self.config.signals.entities_limit)
            .await?;

        // Both lists come from the same details, so positions line up.
        let sightings = ctx.sightings(&details, observable);
        let indicators = ctx.indicators(&details);
        out.relationships
            .extend(ctx.relationships(&sightings, &indicators));
        out.sightings.extend(sightings);
        out.indicators.extend(indicators);

        Ok(())
    }
}

impl Mode {
    fn route(&self) -> &'static str {
        match self {
            Mode::Deliberate => "deliberate",
            Mode::Observe => "observe",
        }
    }
}

fn rejected(route: &str, error: &RelayError) -> Envelope {
    warn!(route, code = %error.code(), error = %error, "Request rejected");
    Envelope::failure(error)
}
