//! Budget-gated enrichment waterfall.
//!
//! Runs the stage catalog for one record in fixed order. For every stage:
//! request flag and preconditions, then classification/geography routing,
//! then the stage cache, then the budget, then the provider. Provider
//! failures are recorded and the run moves on; only an unexpected failure
//! of the run itself marks the response `success = false`.

use crate::budget::BudgetLedger;
use crate::cache::{fingerprint, CacheTtls, TtlCache};
use crate::classification::{BusinessType, Classification, ConfidenceLevel, ProviderCategory};
use crate::confidence::confidence_score;
use crate::errors::{AppError, ResultExt};
use crate::extractors::{self, LicenseLookup};
use crate::geographic::GeographicContext;
use crate::models::{
    BusinessRecord, EnrichedData, EnrichmentResponse, ServiceError, StageOutcome, StageStatus,
    ValidationSummary,
};
use crate::options::ResolvedOptions;
use crate::providers::{default_estimate, ProviderRegistry, ProviderResponse, StageRequest};
use crate::stages::{PdlLookup, StageId};
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use uuid::Uuid;

const DEFAULT_PDL_TITLES: [&str; 6] = [
    "Owner",
    "Founder",
    "CEO",
    "President",
    "Managing Partner",
    "Principal",
];
const OWNER_TITLES: [&str; 3] = ["Owner", "Principal", "Managing Partner"];

/// Inputs of one waterfall run.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub record: &'a BusinessRecord,
    pub classification: &'a Classification,
    pub geography: &'a GeographicContext,
    pub options: &'a ResolvedOptions,
}

/// Why a stage is pruned for this record, if it is.
///
/// Low confidence: classification's skip list or geography alone is enough.
/// Medium/high confidence: both have to reject the category.
pub fn routing_skip(
    category: ProviderCategory,
    classification: &Classification,
    geography: &GeographicContext,
) -> Option<&'static str> {
    let rejected_by_classification = classification.recommended_providers.skips(category);
    let rejected_by_geography = !geography.is_relevant(category);

    match classification.confidence {
        ConfidenceLevel::Low if rejected_by_classification => Some("classification"),
        ConfidenceLevel::Low if rejected_by_geography => Some("geography"),
        ConfidenceLevel::Low => None,
        _ if rejected_by_classification && rejected_by_geography => {
            Some("classification+geography")
        }
        _ => None,
    }
}

enum StagePlan {
    NotRequested,
    Skip { service: String, reason: &'static str },
    Calls(Vec<StageRequest>),
}

enum Merge {
    Executed {
        payload_cost: Option<f64>,
        extracted: Option<Value>,
    },
    NoMatch,
    Failed(String),
}

struct RunState {
    ledger: BudgetLedger,
    enriched: EnrichedData,
    stages: Vec<StageOutcome>,
    services_used: Vec<String>,
    services_skipped: Vec<String>,
    errors: Vec<ServiceError>,
    provider_calls: u32,
    cache_lookups: u32,
}

impl RunState {
    fn new(cap: f64) -> Self {
        Self {
            ledger: BudgetLedger::new(cap),
            enriched: EnrichedData::default(),
            stages: Vec::new(),
            services_used: Vec::new(),
            services_skipped: Vec::new(),
            errors: Vec::new(),
            provider_calls: 0,
            cache_lookups: 0,
        }
    }

    fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    fn outcome(stage: StageId, service: &str, status: StageStatus, estimate: f64) -> StageOutcome {
        StageOutcome {
            stage_id: stage,
            service: service.to_string(),
            status,
            estimated_cost: estimate,
            cost_applied: 0.0,
            reason: None,
            extracted_data: None,
            error_detail: None,
            cache_hit: false,
        }
    }

    fn not_requested(&mut self, stage: StageId) {
        let service = stage.service_tag();
        let mut outcome = Self::outcome(stage, service, StageStatus::Skipped, 0.0);
        outcome.reason = Some(format!("{} (not requested)", service));
        self.stages.push(outcome);
    }

    fn skip(&mut self, stage: StageId, service: &str, estimate: f64, reason: &str) {
        let reason = format!("{} ({})", service, reason);
        tracing::debug!("⏭ {}", reason);
        let mut outcome = Self::outcome(stage, service, StageStatus::Skipped, estimate);
        outcome.reason = Some(reason.clone());
        self.stages.push(outcome);
        self.services_skipped.push(reason);
    }

    fn error(&mut self, stage: StageId, service: &str, estimate: f64, error: String) {
        tracing::error!("❌ {} failed: {}", service, error);
        let mut outcome = Self::outcome(stage, service, StageStatus::Errored, estimate);
        outcome.error_detail = Some(error.clone());
        self.stages.push(outcome);
        self.errors.push(ServiceError {
            service: service.to_string(),
            error,
        });
    }

    fn executed(
        &mut self,
        stage: StageId,
        service: &str,
        estimate: f64,
        cost: f64,
        extracted: Option<Value>,
        cache_hit: bool,
    ) {
        let mut outcome = Self::outcome(stage, service, StageStatus::Executed, estimate);
        if cache_hit {
            outcome.cache_hit = true;
            self.services_used.push(format!("{} (cached)", service));
        } else {
            outcome.cost_applied = self.ledger.commit(service, cost);
            self.services_used.push(service.to_string());
        }
        outcome.extracted_data = extracted;
        let ledger = self.ledger();
        tracing::info!(
            "✓ {} executed (${:.3}, running ${:.3} of ${:.2})",
            service,
            outcome.cost_applied,
            ledger.running_cost(),
            ledger.cap()
        );
        self.stages.push(outcome);
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::InternalError(format!("failed to serialize stage data: {}", e)))
}

fn usable_cost(cost: Option<f64>) -> Option<f64> {
    cost.filter(|c| c.is_finite() && *c >= 0.0)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Executes the waterfall for single records. Cheap to clone.
#[derive(Clone)]
pub struct WaterfallExecutor {
    registry: ProviderRegistry,
    stage_cache: TtlCache<ProviderResponse>,
    ttls: CacheTtls,
    call_timeout: Duration,
}

impl WaterfallExecutor {
    pub fn new(
        registry: ProviderRegistry,
        stage_cache: TtlCache<ProviderResponse>,
        ttls: CacheTtls,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            stage_cache,
            ttls,
            call_timeout,
        }
    }

    /// Runs every stage for the record and returns the structured response.
    ///
    /// Never fails: provider problems end up in `errors[]`, and a failure of
    /// the run itself (including a panic) yields `success = false` with the
    /// partial results accumulated so far.
    pub async fn execute(&self, ctx: RunContext<'_>) -> EnrichmentResponse {
        let started = Instant::now();
        let mut state = RunState::new(ctx.options.budget_cap);

        tracing::info!(
            "🚀 Enriching '{}' ({} tier, cap ${:.2})",
            ctx.record.name,
            ctx.options.tier.as_str(),
            ctx.options.budget_cap
        );

        let run = AssertUnwindSafe(self.run_stages(ctx, &mut state))
            .catch_unwind()
            .await;

        let fatal = match run {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(format!("panic: {}", panic_message(panic.as_ref()))),
        };

        if let Some(error) = &fatal {
            tracing::error!("❌ Enrichment of '{}' aborted: {}", ctx.record.name, error);
            state.errors.push(ServiceError {
                service: "orchestrator".to_string(),
                error: error.clone(),
            });
        }

        let response = self.build_response(ctx, state, fatal.is_none(), started);
        tracing::info!(
            "✓ Enrichment complete: {} - Confidence: {}% - Cost: ${:.3}",
            response.business_name,
            response.confidence_score,
            response.total_cost
        );
        response
    }

    /// Response for a record the batch scheduler decided not to enrich. Every
    /// stage is recorded as skipped and nothing is charged.
    pub fn skipped_response(&self, ctx: RunContext<'_>) -> EnrichmentResponse {
        let started = Instant::now();
        let mut state = RunState::new(ctx.options.budget_cap);

        for stage in StageId::CATALOG {
            match self.plan(stage, ctx, &state) {
                StagePlan::NotRequested => state.not_requested(stage),
                StagePlan::Skip { service, reason } => state.skip(stage, &service, 0.0, reason),
                StagePlan::Calls(requests) => {
                    for request in requests {
                        let estimate = default_estimate(&request);
                        state.skip(stage, &request.service, estimate, "batch skip");
                    }
                }
            }
        }

        let mut response = self.build_response(ctx, state, true, started);
        response.skipped = true;
        response
    }

    /// External stages that would be attempted for this record, ignoring budget.
    pub fn applicable_stages(&self, ctx: RunContext<'_>) -> Vec<StageId> {
        let state = RunState::new(ctx.options.budget_cap);
        let mut applicable: Vec<StageId> = StageId::CATALOG
            .into_iter()
            .filter(|stage| !stage.is_local())
            .filter(|stage| matches!(self.plan(*stage, ctx, &state), StagePlan::Calls(_)))
            .collect();

        // Verification only lacks the emails that discovery would produce
        if ctx.options.flags.verify_emails
            && applicable.contains(&StageId::EmailDiscovery)
            && !applicable.contains(&StageId::EmailVerification)
        {
            applicable.push(StageId::EmailVerification);
        }

        applicable
    }

    async fn run_stages(&self, ctx: RunContext<'_>, state: &mut RunState) -> Result<(), AppError> {
        for stage in StageId::CATALOG {
            match self.plan(stage, ctx, state) {
                StagePlan::NotRequested => state.not_requested(stage),
                StagePlan::Skip { service, reason } => state.skip(stage, &service, 0.0, reason),
                StagePlan::Calls(requests) => {
                    for request in requests {
                        self.run_call(ctx, state, request)
                            .await
                            .with_context(|| format!("stage {}", stage))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn base_request(&self, stage: StageId, service: &str, ctx: RunContext<'_>) -> StageRequest {
        let mut request = StageRequest::new(stage, service, ctx.record);
        request.state = ctx
            .geography
            .state
            .clone()
            .or_else(|| ctx.record.state.clone());
        request.tier = Some(ctx.options.tier.as_str().to_string());
        request
    }

    fn routed(
        &self,
        stage: StageId,
        service: &str,
        category: Option<ProviderCategory>,
        ctx: RunContext<'_>,
    ) -> StagePlan {
        let skip = category.and_then(|c| routing_skip(c, ctx.classification, ctx.geography));
        match skip {
            Some(reason) => StagePlan::Skip {
                service: service.to_string(),
                reason,
            },
            None => StagePlan::Calls(vec![self.base_request(stage, service, ctx)]),
        }
    }

    /// Decides whether and how a stage runs. Budget is not considered here
    /// except to choose between a combined and a split PDL lookup.
    fn plan(&self, stage: StageId, ctx: RunContext<'_>, state: &RunState) -> StagePlan {
        let flags = ctx.options.flags;
        let service = stage.service_tag();
        let skip = |reason: &'static str| StagePlan::Skip {
            service: service.to_string(),
            reason,
        };

        match stage {
            StageId::BasicValidation => {
                StagePlan::Calls(vec![self.base_request(stage, service, ctx)])
            }

            StageId::ChamberVerification => {
                if !flags.chamber_verification {
                    return StagePlan::NotRequested;
                }
                self.routed(stage, service, stage.routed_category(), ctx)
            }

            StageId::TradeAssociation => {
                if !flags.trade_associations {
                    return StagePlan::NotRequested;
                }
                let (category, tag) = match ctx.classification.primary_type {
                    Some(BusinessType::Spa) => (ProviderCategory::SpaAssociation, "spa_association"),
                    Some(BusinessType::Beauty) => {
                        (ProviderCategory::BeautyAssociation, "beauty_association")
                    }
                    _ => return skip("not applicable"),
                };
                if !ctx.classification.recommended_providers.recommends(category) {
                    return StagePlan::Skip {
                        service: tag.to_string(),
                        reason: "classification",
                    };
                }
                self.routed(stage, tag, Some(category), ctx)
            }

            StageId::EmailDiscovery => {
                if !flags.discover_emails {
                    return StagePlan::NotRequested;
                }
                if ctx.record.effective_domain().is_none() {
                    return skip("missing domain");
                }
                StagePlan::Calls(vec![self.base_request(stage, service, ctx)])
            }

            StageId::ComplianceSos => {
                if !(flags.compliance_verification || flags.include_business_license) {
                    return StagePlan::NotRequested;
                }
                let mut request = self.base_request(stage, service, ctx);
                if request.state.is_none() {
                    return skip("missing state");
                }
                request.live_data = Some(flags.compliance_verification);
                StagePlan::Calls(vec![request])
            }

            StageId::StateLicense => {
                if !flags.include_business_license {
                    return StagePlan::NotRequested;
                }
                self.routed(stage, service, stage.routed_category(), ctx)
            }

            StageId::CompanyPersonEnrichment => {
                let lookups = match (
                    flags.include_company_enrichment,
                    flags.include_person_enrichment,
                ) {
                    (false, false) => return StagePlan::NotRequested,
                    (true, false) => vec![PdlLookup::Company],
                    (false, true) => vec![PdlLookup::Person],
                    (true, true) => {
                        let combined = PdlLookup::CompanyAndPerson;
                        if state.ledger().can_afford(combined.estimate()) {
                            vec![combined]
                        } else {
                            tracing::debug!(
                                "Combined PDL lookup exceeds remaining ${:.3}, splitting",
                                state.ledger().remaining()
                            );
                            vec![PdlLookup::Company, PdlLookup::Person]
                        }
                    }
                };

                let requests = lookups
                    .into_iter()
                    .map(|lookup| self.pdl_request(lookup, ctx))
                    .collect();
                StagePlan::Calls(requests)
            }

            StageId::EmailVerification => {
                if !flags.verify_emails {
                    return StagePlan::NotRequested;
                }
                if state.enriched.emails.is_empty() {
                    return skip("no emails");
                }
                let mut request = self.base_request(stage, service, ctx);
                request.emails = state
                    .enriched
                    .emails
                    .iter()
                    .map(|e| e.email.clone())
                    .collect();
                StagePlan::Calls(vec![request])
            }

            StageId::ExecutiveContacts => {
                if !flags.apollo_enrichment {
                    return StagePlan::NotRequested;
                }
                if ctx.record.effective_domain().is_none() {
                    return skip("missing domain");
                }
                self.routed(stage, service, stage.routed_category(), ctx)
            }
        }
    }

    fn pdl_request(&self, lookup: PdlLookup, ctx: RunContext<'_>) -> StageRequest {
        let mut request = self.base_request(
            StageId::CompanyPersonEnrichment,
            lookup.service_tag(),
            ctx,
        );
        request.lookup_type = Some(lookup);
        if lookup.includes_person() {
            let titles: &[&str] = if ctx.options.executive_contacts_only {
                &OWNER_TITLES
            } else {
                &DEFAULT_PDL_TITLES
            };
            request.title_keywords = Some(titles.iter().map(|t| t.to_string()).collect());
            request.minimum_likelihood = ctx
                .options
                .min_confidence_score
                .map(|score| (f64::from(score) / 100.0).clamp(0.5, 0.95));
        }
        request
    }

    fn cache_key(&self, ctx: RunContext<'_>, request: &StageRequest) -> String {
        fingerprint(&[
            &ctx.record.name,
            ctx.record.address.as_deref().unwrap_or(""),
            &request.service,
            &request.cache_input(),
        ])
    }

    async fn run_call(
        &self,
        ctx: RunContext<'_>,
        state: &mut RunState,
        request: StageRequest,
    ) -> Result<(), AppError> {
        let stage = request.stage;
        let service = request.service.clone();

        let Some(provider) = self.registry.get(stage.provider_kind()) else {
            state.skip(stage, &service, default_estimate(&request), "not configured");
            return Ok(());
        };

        let estimate = Some(provider.estimate_cost(&request))
            .filter(|c| c.is_finite() && *c >= 0.0)
            .unwrap_or_else(|| default_estimate(&request));

        let key = self.cache_key(ctx, &request);
        state.cache_lookups += 1;
        if let Some(cached) = self.stage_cache.get(&key).await {
            tracing::debug!("Stage cache hit for {} ('{}')", service, ctx.record.name);
            return self.apply(ctx, state, &request, &cached, estimate, true);
        }

        if !state.ledger().can_afford(estimate) {
            tracing::warn!(
                "⚠ Skipping {} - ${:.3} would exceed budget (running ${:.3} of ${:.2})",
                service,
                estimate,
                state.ledger().running_cost(),
                state.ledger().cap()
            );
            state.skip(stage, &service, estimate, "budget");
            return Ok(());
        }

        state.provider_calls += 1;
        let result = match tokio::time::timeout(self.call_timeout, provider.invoke(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} did not answer within {}s",
                service,
                self.call_timeout.as_secs_f64()
            ))),
        };

        match result {
            Err(e) => {
                state.error(stage, &service, estimate, e.to_string());
                Ok(())
            }
            Ok(response) if !response.success => {
                if response.status == 501 {
                    state.skip(stage, &service, estimate, "not implemented");
                } else {
                    let error = response.error.clone().unwrap_or_else(|| {
                        format!("{} response status {}", service, response.status)
                    });
                    state.error(stage, &service, estimate, error);
                }
                Ok(())
            }
            Ok(response) => {
                self.apply(ctx, state, &request, &response, estimate, false)?;
                let ttl = self.ttls.for_category(stage.cache_category());
                self.stage_cache.set(key, response, ttl).await;
                Ok(())
            }
        }
    }

    /// Extracts the stage payload, merges it and records the outcome.
    fn apply(
        &self,
        ctx: RunContext<'_>,
        state: &mut RunState,
        request: &StageRequest,
        response: &ProviderResponse,
        estimate: f64,
        cache_hit: bool,
    ) -> Result<(), AppError> {
        let stage = request.stage;
        let service = request.service.as_str();
        let empty = Value::Null;
        let data = response.data.as_ref().unwrap_or(&empty);

        match self.merge(ctx, state, request, data)? {
            Merge::Executed {
                payload_cost,
                extracted,
            } => {
                let cost = usable_cost(response.cost)
                    .or(payload_cost)
                    .unwrap_or(estimate);
                if !cache_hit && cost > estimate {
                    tracing::warn!(
                        "⚠ {} reported ${:.3}, above its ${:.3} estimate",
                        service,
                        cost,
                        estimate
                    );
                }
                state.executed(stage, service, estimate, cost, extracted, cache_hit);
            }
            Merge::NoMatch => {
                state.skip(stage, service, estimate, "no match");
                if let Some(outcome) = state.stages.last_mut() {
                    outcome.cache_hit = cache_hit;
                }
            }
            Merge::Failed(error) => state.error(stage, service, estimate, error),
        }
        Ok(())
    }

    fn merge(
        &self,
        ctx: RunContext<'_>,
        state: &mut RunState,
        request: &StageRequest,
        data: &Value,
    ) -> Result<Merge, AppError> {
        let enriched = &mut state.enriched;

        let merge = match request.stage {
            StageId::BasicValidation => {
                let summary: ValidationSummary =
                    serde_json::from_value(data.clone()).unwrap_or_default();
                let extracted = to_json(&summary)?;
                enriched.validation = Some(summary);
                Merge::Executed {
                    payload_cost: None,
                    extracted: Some(extracted),
                }
            }

            StageId::ChamberVerification | StageId::TradeAssociation => {
                match extractors::association_membership(data, &request.service) {
                    Some(membership) => {
                        let extracted = to_json(&membership)?;
                        if request.stage == StageId::ChamberVerification {
                            enriched.chamber_membership = Some(membership);
                        } else {
                            enriched.trade_association = Some(membership);
                        }
                        Merge::Executed {
                            payload_cost: None,
                            extracted: Some(extracted),
                        }
                    }
                    None => Merge::NoMatch,
                }
            }

            StageId::EmailDiscovery => {
                let emails = extractors::hunter_emails(data).unwrap_or_default();
                let extracted = to_json(&emails)?;
                for email in emails {
                    if !enriched.emails.iter().any(|e| e.email == email.email) {
                        enriched.emails.push(email);
                    }
                }
                tracing::debug!("Discovered {} emails", enriched.emails.len());
                Merge::Executed {
                    payload_cost: None,
                    extracted: Some(extracted),
                }
            }

            StageId::ComplianceSos => {
                let record = extractors::secretary_of_state(
                    data,
                    &ctx.record.name,
                    request.state.as_deref(),
                );
                let compliance = extractors::compliance_data(data);
                let extracted = serde_json::json!({
                    "secretaryOfState": to_json(&record)?,
                    "complianceData": to_json(&compliance)?,
                });
                if record.is_some() {
                    enriched.secretary_of_state = record;
                }
                if compliance.is_some() {
                    enriched.compliance_data = compliance;
                }
                Merge::Executed {
                    payload_cost: None,
                    extracted: Some(extracted),
                }
            }

            StageId::StateLicense => match extractors::business_license(data) {
                LicenseLookup::Found(license) => {
                    let extracted = to_json(&license)?;
                    enriched.business_license = Some(license);
                    Merge::Executed {
                        payload_cost: None,
                        extracted: Some(extracted),
                    }
                }
                LicenseLookup::NoMatch => Merge::NoMatch,
                LicenseLookup::Failed(error) => Merge::Failed(error),
            },

            StageId::CompanyPersonEnrichment => {
                let matched = extractors::people_data_labs(
                    data,
                    &ctx.record.name,
                    ctx.record.website.as_deref(),
                );
                if !matched.errors.is_empty() {
                    state.errors.push(ServiceError {
                        service: request.service.clone(),
                        error: matched.errors.join("; "),
                    });
                }
                if matched.is_empty() {
                    Merge::NoMatch
                } else {
                    let payload_cost = Some(matched.applied_cost());
                    let extracted = serde_json::json!({
                        "companyInfo": to_json(&matched.company)?,
                        "person": to_json(&matched.person)?,
                    });
                    let enriched = &mut state.enriched;
                    if let Some(company) = matched.company {
                        enriched.company_info = Some(company);
                    }
                    if let Some(person) = matched.person {
                        enriched.person_enrichment.push(person);
                    }
                    Merge::Executed {
                        payload_cost,
                        extracted: Some(extracted),
                    }
                }
            }

            StageId::EmailVerification => {
                let results = extractors::neverbounce_results(data).unwrap_or_default();
                extractors::apply_verification(&mut enriched.emails, &results);
                let verified = enriched.emails.iter().filter(|e| e.verified).count();
                tracing::debug!("Verified {}/{} emails", verified, enriched.emails.len());
                let payload_cost = if results.is_empty() {
                    None
                } else {
                    Some(extractors::neverbounce_cost(&results))
                };
                Merge::Executed {
                    payload_cost,
                    extracted: Some(to_json(&enriched.emails)?),
                }
            }

            StageId::ExecutiveContacts => {
                let contacts = extractors::executive_contacts(data).unwrap_or_default();
                let extracted = to_json(&contacts)?;
                enriched.executive_contacts.extend(contacts);
                Merge::Executed {
                    payload_cost: None,
                    extracted: Some(extracted),
                }
            }
        };

        Ok(merge)
    }

    fn build_response(
        &self,
        ctx: RunContext<'_>,
        state: RunState,
        success: bool,
        started: Instant,
    ) -> EnrichmentResponse {
        let ledger = state.ledger;

        EnrichmentResponse {
            request_id: Uuid::new_v4(),
            success,
            business_name: ctx.record.name.clone(),
            tier: ctx.options.tier,
            budget_cap: ledger.cap(),
            confidence_score: confidence_score(&state.enriched),
            enriched_data: state.enriched,
            total_cost: ledger.running_cost(),
            cost_breakdown: ledger.breakdown().clone(),
            services_used: state.services_used,
            services_skipped: state.services_skipped,
            errors: state.errors,
            stages: state.stages,
            classification: Some(ctx.classification.clone()),
            geography: Some(ctx.geography.clone()),
            skipped: false,
            provider_calls: state.provider_calls,
            cache_lookups: state.cache_lookups,
            processing_time_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}
