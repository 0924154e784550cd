//! Shared helpers for integration tests: scripted in-process providers and
//! executor wiring.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_prospect_api::cache::{CacheTtls, TtlCache};
use rust_prospect_api::classification::classify;
use rust_prospect_api::errors::AppError;
use rust_prospect_api::geographic::analyze_location;
use rust_prospect_api::models::{BusinessRecord, EnrichmentOptions, EnrichmentResponse};
use rust_prospect_api::options::{resolve_options, FeatureToggles};
use rust_prospect_api::providers::{Provider, ProviderRegistry, ProviderResponse, StageRequest};
use rust_prospect_api::stages::ProviderKind;
use rust_prospect_api::validation::BasicValidationProvider;
use rust_prospect_api::waterfall::{RunContext, WaterfallExecutor};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum Behavior {
    Respond(ProviderResponse),
    Fail(AppError),
    Panic,
    Hang,
}

/// Provider with a fixed scripted answer that records every request.
pub struct MockProvider {
    kind: ProviderKind,
    behavior: Behavior,
    estimate: Option<f64>,
    calls: AtomicUsize,
    requests: Mutex<Vec<StageRequest>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            estimate: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(kind: ProviderKind, data: Value) -> Arc<Self> {
        Self::new(kind, Behavior::Respond(ProviderResponse::ok(data)))
    }

    pub fn with_estimate(kind: ProviderKind, data: Value, estimate: f64) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior: Behavior::Respond(ProviderResponse::ok(data)),
            estimate: Some(estimate),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(kind: ProviderKind, error: AppError) -> Arc<Self> {
        Self::new(kind, Behavior::Fail(error))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<StageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn estimate_cost(&self, request: &StageRequest) -> f64 {
        self.estimate
            .unwrap_or_else(|| rust_prospect_api::providers::default_estimate(request))
    }

    async fn invoke(&self, request: &StageRequest) -> Result<ProviderResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            Behavior::Respond(response) => Ok(response.clone()),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Panic => panic!("mock provider exploded"),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ProviderResponse::ok(json!({})))
            }
        }
    }
}

pub fn hunter_payload() -> Value {
    json!({
        "emails": [
            {"value": "owner@sunrisespa.com", "confidence": 92, "type": "personal",
             "first_name": "Maya", "last_name": "Lopez", "position": "Owner"},
            {"value": "info@sunrisespa.com", "confidence": 80, "type": "generic"}
        ]
    })
}

pub fn neverbounce_payload() -> Value {
    json!({
        "results": [
            {"email": "owner@sunrisespa.com", "result": "valid"},
            {"email": "info@sunrisespa.com", "result": "catchall"}
        ]
    })
}

/// Registry holding only the free validation provider; add mocks with `.with(..)`.
pub fn base_registry() -> ProviderRegistry {
    ProviderRegistry::new().with(Arc::new(BasicValidationProvider))
}

pub fn executor(registry: ProviderRegistry) -> WaterfallExecutor {
    executor_with_timeout(registry, Duration::from_secs(5))
}

pub fn executor_with_timeout(registry: ProviderRegistry, timeout: Duration) -> WaterfallExecutor {
    WaterfallExecutor::new(registry, TtlCache::new(1_000), CacheTtls::default(), timeout)
}

pub fn spa_record() -> BusinessRecord {
    let mut record = BusinessRecord::new(
        "Sunrise Spa & Wellness",
        "1 Ocean Ave, San Diego, CA 92101",
    );
    record.domain = Some("sunrisespa.com".to_string());
    record
}

/// Classifies, locates and runs one record with the default toggles.
pub async fn enrich(
    executor: &WaterfallExecutor,
    record: &BusinessRecord,
    options: &EnrichmentOptions,
) -> EnrichmentResponse {
    let classification = classify(record);
    let geography = analyze_location(record);
    let resolved = resolve_options(options, &FeatureToggles::default());
    executor
        .execute(RunContext {
            record,
            classification: &classification,
            geography: &geography,
            options: &resolved,
        })
        .await
}

/// Options with every flag off except the ones set afterwards.
pub fn only(tier: &str) -> EnrichmentOptions {
    EnrichmentOptions {
        discover_emails: Some(false),
        verify_emails: Some(false),
        include_business_license: Some(false),
        include_company_enrichment: Some(false),
        include_person_enrichment: Some(false),
        compliance_verification: Some(false),
        apollo_enrichment: Some(false),
        chamber_verification: Some(false),
        trade_associations: Some(false),
        tier: Some(tier.to_string()),
        ..Default::default()
    }
}
