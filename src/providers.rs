//! Provider contract consumed by the waterfall executor.

use crate::errors::AppError;
use crate::models::BusinessRecord;
use crate::stages::{PdlLookup, ProviderKind, StageId, NEVERBOUNCE_COST_PER_EMAIL};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Input handed to a provider for one stage of one record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    pub stage: StageId,
    pub service: String,
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_type: Option<PdlLookup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_likelihood: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

impl StageRequest {
    pub fn new(stage: StageId, service: impl Into<String>, record: &BusinessRecord) -> Self {
        Self {
            stage,
            service: service.into(),
            business_name: record.name.clone(),
            address: record.address.clone(),
            domain: record.effective_domain(),
            website: record.website.clone(),
            phone: record.phone.clone(),
            state: record.state.clone(),
            industry: record.industry.clone(),
            emails: Vec::new(),
            lookup_type: None,
            title_keywords: None,
            minimum_likelihood: None,
            live_data: None,
            tier: None,
        }
    }

    /// Stage-specific part of the request, used in cache keys. Covers every
    /// input that changes what the provider answers.
    pub fn cache_input(&self) -> String {
        match self.stage {
            StageId::EmailVerification => self.emails.join(","),
            StageId::ComplianceSos => format!(
                "{}|live={}",
                self.state.as_deref().unwrap_or(""),
                self.live_data.unwrap_or(false)
            ),
            StageId::StateLicense => self.state.clone().unwrap_or_default(),
            StageId::CompanyPersonEnrichment => format!(
                "{}|{}|{}|{}",
                self.domain.as_deref().unwrap_or(""),
                self.lookup_type
                    .map(|l| l.service_tag())
                    .unwrap_or_default(),
                self.title_keywords
                    .as_deref()
                    .map(|titles| titles.join(","))
                    .unwrap_or_default(),
                self.minimum_likelihood
                    .map(|likelihood| format!("{:.2}", likelihood))
                    .unwrap_or_default()
            ),
            _ => self.domain.clone().unwrap_or_default(),
        }
    }
}

/// Uniform provider answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    /// Actual cost when the provider knows it.
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: u16,
}

impl ProviderResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            cost: None,
            error: None,
            status: 200,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            cost: None,
            error: Some(error.into()),
            status,
        }
    }
}

/// External enrichment collaborator. Retries, if any, belong to the
/// implementation; the executor calls `invoke` at most once per stage.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Cost estimate checked against the budget before invocation.
    fn estimate_cost(&self, request: &StageRequest) -> f64 {
        default_estimate(request)
    }

    async fn invoke(&self, request: &StageRequest) -> Result<ProviderResponse, AppError>;
}

/// Catalog cost for a request, scaled by input size where the price is per item.
pub fn default_estimate(request: &StageRequest) -> f64 {
    match request.stage {
        StageId::EmailVerification => NEVERBOUNCE_COST_PER_EMAIL * request.emails.len() as f64,
        StageId::CompanyPersonEnrichment => request
            .lookup_type
            .map(|lookup| lookup.estimate())
            .unwrap_or(0.0),
        StageId::EmailDiscovery => crate::stages::HUNTER_COST,
        StageId::ComplianceSos => crate::stages::COBALT_COST,
        StageId::StateLicense => crate::stages::LICENSE_COST,
        StageId::ExecutiveContacts => crate::stages::APOLLO_COST,
        StageId::BasicValidation
        | StageId::ChamberVerification
        | StageId::TradeAssociation => 0.0,
    }
}

/// Providers available to the executor, keyed by kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Stand-in for directories that have no real integration yet (chamber and
/// trade association membership). Always answers 501.
pub struct UnavailableProvider {
    name: String,
    kind: ProviderKind,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[async_trait]
impl Provider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn invoke(&self, _request: &StageRequest) -> Result<ProviderResponse, AppError> {
        Ok(ProviderResponse::failure(
            501,
            format!("{} directory lookup is not implemented", self.name),
        ))
    }
}
