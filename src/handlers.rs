use crate::cache::TtlCache;
use crate::classification::{BusinessClassifier, Classification};
use crate::config::Config;
use crate::errors::AppError;
use crate::geographic::{analyze_location, GeographicContext};
use crate::models::*;
use crate::options::{resolve_options, FeatureToggles};
use crate::providers::ProviderRegistry;
use crate::scheduler::BatchScheduler;
use crate::stages::StageId;
use crate::waterfall::{RunContext, WaterfallExecutor};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Classifier backed by the classification cache.
    pub classifier: BusinessClassifier,
    /// Single-record waterfall executor, sharing the stage cache.
    pub executor: WaterfallExecutor,
    /// Batch scheduler on top of the same executor and classifier.
    pub scheduler: BatchScheduler,
    /// Environment-level feature toggles.
    pub toggles: FeatureToggles,
}

impl AppState {
    /// Wires caches, executor and scheduler around a provider registry.
    pub fn new(config: Config, registry: ProviderRegistry) -> Self {
        let classifier = BusinessClassifier::new(
            TtlCache::new(config.cache_max_capacity),
            config.classification_ttl(),
        );
        let executor = WaterfallExecutor::new(
            registry,
            TtlCache::new(config.cache_max_capacity),
            config.cache_ttls(),
            config.provider_timeout(),
        );
        let toggles = config.feature_toggles();
        let scheduler = BatchScheduler::new(
            executor.clone(),
            classifier.clone(),
            toggles,
            config.max_parallel_batches,
            config.max_batch_size,
        );

        Self {
            config,
            classifier,
            executor,
            scheduler,
            toggles,
        }
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-prospect-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

fn validate_record(record: &BusinessRecord) -> Result<(), AppError> {
    if record.name.trim().is_empty() {
        return Err(AppError::BadRequest("Business name is required".to_string()));
    }
    Ok(())
}

fn validate_options(options: &EnrichmentOptions) -> Result<(), AppError> {
    if let Some(cap) = options.max_cost_per_business {
        if !cap.is_finite() || cap < 0.0 {
            return Err(AppError::BadRequest(
                "maxCostPerBusiness must be a finite, non-negative number".to_string(),
            ));
        }
    }
    if let Some(score) = options.min_confidence_score {
        if score > 100 {
            return Err(AppError::BadRequest(
                "minConfidenceScore must be between 0 and 100".to_string(),
            ));
        }
    }
    Ok(())
}

/// POST /api/v1/enrich
///
/// Runs the budget-gated waterfall for one business.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The business record with flattened enrichment options.
///
/// # Returns
///
/// * `Result<Json<EnrichmentResponse>, AppError>` - The enrichment response, or 400 on invalid input.
pub async fn enrich(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<EnrichmentResponse>, AppError> {
    tracing::info!("POST /enrich - business: {}", request.record.name);

    validate_record(&request.record)?;
    validate_options(&request.options)?;

    let classification = state.classifier.classify(&request.record).await;
    let geography = analyze_location(&request.record);
    let options = resolve_options(&request.options, &state.toggles);

    let response = state
        .executor
        .execute(RunContext {
            record: &request.record,
            classification: &classification,
            geography: &geography,
            options: &options,
        })
        .await;

    Ok(Json(response))
}

/// POST /api/v1/enrich/batch
///
/// Schedules a batch of businesses by classification and location.
pub async fn enrich_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchEnrichRequest>,
) -> Result<Json<BatchEnrichResponse>, AppError> {
    tracing::info!("POST /enrich/batch - {} records", request.records.len());

    if request.records.is_empty() {
        return Err(AppError::BadRequest(
            "At least one business record is required".to_string(),
        ));
    }
    if request.records.len() > state.config.max_batch_records {
        return Err(AppError::BadRequest(format!(
            "Batch too large: {} records (max {})",
            request.records.len(),
            state.config.max_batch_records
        )));
    }
    for (index, record) in request.records.iter().enumerate() {
        validate_record(record)
            .map_err(|_| AppError::BadRequest(format!("records[{}]: name is required", index)))?;
    }
    validate_options(&request.options)?;

    let response = state.scheduler.run(request.records, &request.options).await;
    Ok(Json(response))
}

/// Query parameters of `GET /api/v1/classify`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyQuery {
    pub name: Option<String>,
    pub address: Option<String>,
    pub domain: Option<String>,
    pub website: Option<String>,
    pub state: Option<String>,
    pub description: Option<String>,
    pub tier: Option<String>,
}

impl ClassifyQuery {
    fn into_parts(self) -> (BusinessRecord, EnrichmentOptions) {
        let record = BusinessRecord {
            name: self.name.unwrap_or_default(),
            address: self.address,
            domain: self.domain,
            website: self.website,
            state: self.state,
            description: self.description,
            ..Default::default()
        };
        let options = EnrichmentOptions {
            tier: self.tier,
            ..Default::default()
        };
        (record, options)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub business_name: String,
    pub classification: Classification,
    pub geography: GeographicContext,
    /// External stages the tier defaults would attempt for this record.
    pub applicable_stages: Vec<StageId>,
}

/// GET /api/v1/classify
///
/// Classification and routing preview. Never calls a provider.
pub async fn classify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClassifyQuery>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let (record, options) = query.into_parts();
    validate_record(&record)?;

    let classification = state.classifier.classify(&record).await;
    let geography = analyze_location(&record);
    let options = resolve_options(&options, &state.toggles);
    let applicable_stages = state.executor.applicable_stages(RunContext {
        record: &record,
        classification: &classification,
        geography: &geography,
        options: &options,
    });

    tracing::debug!(
        "Classified '{}' as {:?} ({:?}), {} applicable stages",
        record.name,
        classification.primary_type,
        classification.confidence,
        applicable_stages.len()
    );

    Ok(Json(ClassifyResponse {
        business_name: record.name,
        classification,
        geography,
        applicable_stages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let record = BusinessRecord::new("   ", "1 Main St");
        assert!(matches!(validate_record(&record), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_negative_or_infinite_cap_rejected() {
        for cap in [-1.0, f64::INFINITY, f64::NAN] {
            let options = EnrichmentOptions {
                max_cost_per_business: Some(cap),
                ..Default::default()
            };
            assert!(validate_options(&options).is_err());
        }
        let options = EnrichmentOptions {
            max_cost_per_business: Some(0.0),
            ..Default::default()
        };
        assert!(validate_options(&options).is_ok());
    }

    #[test]
    fn test_classify_query_into_record() {
        let query = ClassifyQuery {
            name: Some("Sunrise Spa".to_string()),
            address: Some("1 Ocean Ave, San Diego, CA 92101".to_string()),
            tier: Some("starter".to_string()),
            ..Default::default()
        };
        let (record, options) = query.into_parts();
        assert_eq!(record.name, "Sunrise Spa");
        assert_eq!(options.tier.as_deref(), Some("starter"));
    }
}
