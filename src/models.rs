use crate::classification::Classification;
use crate::geographic::GeographicContext;
use crate::stages::StageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============ Input Models ============

/// A business to enrich.
///
/// Immutable input to a single enrichment run; owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    /// Business name (also accepted as `businessName`).
    #[serde(alias = "businessName", default)]
    pub name: String,
    /// Free-form street address, e.g. "123 Main St, San Diego, CA 92101".
    pub address: Option<String>,
    /// Primary domain, e.g. "sunrisespa.com".
    pub domain: Option<String>,
    /// Phone number in any common format.
    pub phone: Option<String>,
    /// Website URL.
    pub website: Option<String>,
    /// Industry hint supplied by the caller.
    pub industry: Option<String>,
    /// Two-letter state code, when known.
    pub state: Option<String>,
    /// Optional description used by the classifier.
    pub description: Option<String>,
}

impl BusinessRecord {
    /// Creates a record with only a name and an address.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Some(address.into()),
            ..Default::default()
        }
    }

    /// Domain to use for email discovery and premium lookups.
    ///
    /// Falls back to the host of `website` when `domain` is missing.
    pub fn effective_domain(&self) -> Option<String> {
        if let Some(domain) = self.domain.as_deref().map(str::trim) {
            if !domain.is_empty() {
                let domain = domain.to_lowercase();
                return Some(domain.trim_start_matches("www.").to_string());
            }
        }

        let website = self.website.as_deref()?.trim();
        if website.is_empty() {
            return None;
        }
        let candidate = if website.starts_with("http://") || website.starts_with("https://") {
            website.to_string()
        } else {
            format!("https://{}", website)
        };
        url::Url::parse(&candidate)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase().trim_start_matches("www.").to_string()))
    }
}

/// Named bundle of default flags and a budget cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Starter,
    Professional,
    Enterprise,
    Compliance,
}

impl Tier {
    /// Resolves a loosely formatted tier name ("PROFESSIONAL_PLAN", "starter").
    ///
    /// Unknown or missing input resolves to `Professional`.
    pub fn resolve(input: Option<&str>) -> Self {
        let normalized = match input {
            Some(value) if !value.trim().is_empty() => value.trim().to_lowercase(),
            _ => return Tier::Professional,
        };

        if normalized.contains("starter") {
            Tier::Starter
        } else if normalized.contains("professional") {
            Tier::Professional
        } else if normalized.contains("enterprise") {
            Tier::Enterprise
        } else if normalized.contains("compliance") {
            Tier::Compliance
        } else {
            Tier::Professional
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Starter => "starter",
            Tier::Professional => "professional",
            Tier::Enterprise => "enterprise",
            Tier::Compliance => "compliance",
        }
    }
}

/// Per-request enrichment flags. Unset flags fall back to tier defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentOptions {
    pub discover_emails: Option<bool>,
    pub verify_emails: Option<bool>,
    pub include_business_license: Option<bool>,
    pub include_company_enrichment: Option<bool>,
    pub include_person_enrichment: Option<bool>,
    pub compliance_verification: Option<bool>,
    pub apollo_enrichment: Option<bool>,
    pub chamber_verification: Option<bool>,
    pub trade_associations: Option<bool>,
    /// Restricts person enrichment to owner-level titles.
    pub executive_contacts_only: Option<bool>,
    /// Minimum person-match likelihood (0-100) requested from PDL.
    pub min_confidence_score: Option<u8>,
    /// Tier name; see [`Tier::resolve`].
    #[serde(alias = "tierKey")]
    pub tier: Option<String>,
    /// Overrides the tier budget cap (USD).
    pub max_cost_per_business: Option<f64>,
}

/// Body of `POST /api/v1/enrich`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichRequest {
    #[serde(flatten)]
    pub record: BusinessRecord,
    #[serde(flatten)]
    pub options: EnrichmentOptions,
}

/// Body of `POST /api/v1/enrich/batch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnrichRequest {
    #[serde(alias = "businesses")]
    pub records: Vec<BusinessRecord>,
    #[serde(default)]
    pub options: EnrichmentOptions,
}

// ============ Enriched Data Models ============

/// An email address found by discovery, optionally verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEmail {
    pub email: String,
    pub confidence: Option<u8>,
    pub verified: bool,
    pub verification_result: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
}

/// Secretary of State registry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretaryOfStateRecord {
    pub entity_name: String,
    pub registry_number: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub good_standing: Option<bool>,
    pub source: String,
}

/// State license lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessLicenseRecord {
    pub is_valid: bool,
    pub license_number: Option<String>,
    pub status: Option<String>,
    pub expiration_date: Option<String>,
    pub professional_type: Option<String>,
    pub source: String,
}

/// Company firmographics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub founded: Option<i64>,
    pub revenue: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub source: String,
}

/// A person matched by person enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonContact {
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    /// Match likelihood, 0-100.
    pub confidence: u8,
}

/// Executive contact from the premium provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveContact {
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: String,
}

/// Compliance screening attached to a registry lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceData {
    pub finra_check: Option<bool>,
    pub sanctions_check: Option<bool>,
    pub risk_score: Option<f64>,
    pub findings: Vec<ComplianceFinding>,
}

/// Chamber or trade-association membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationMembership {
    pub verified: bool,
    pub memberships: Vec<String>,
    pub membership_level: Option<String>,
    pub source: String,
}

/// Output of the free validation stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub normalized_domain: Option<String>,
    pub normalized_phone: Option<String>,
    pub phone_valid: Option<bool>,
    pub free_mail_domain: bool,
    pub checks: Vec<String>,
}

/// Accumulated enrichment output for one business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub emails: Vec<DiscoveredEmail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secretary_of_state: Option<SecretaryOfStateRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_license: Option<BusinessLicenseRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_info: Option<CompanyInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub person_enrichment: Vec<PersonContact>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub executive_contacts: Vec<ExecutiveContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_data: Option<ComplianceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chamber_membership: Option<AssociationMembership>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_association: Option<AssociationMembership>,
}

// ============ Result Models ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Executed,
    Skipped,
    Errored,
}

/// Outcome of one stage (or one sub-call of a split stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutcome {
    pub stage_id: StageId,
    /// Service tag, e.g. "hunter_io" or "people_data_labs_company".
    pub service: String,
    pub status: StageStatus,
    pub estimated_cost: f64,
    pub cost_applied: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub cache_hit: bool,
}

/// Error entry surfaced in `errors[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    pub service: String,
    pub error: String,
}

/// Structured result of one enrichment run.
///
/// Always returned to the caller, even when the run failed part-way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub business_name: String,
    pub tier: Tier,
    pub budget_cap: f64,
    pub enriched_data: EnrichedData,
    pub confidence_score: u8,
    pub total_cost: f64,
    pub cost_breakdown: BTreeMap<String, f64>,
    pub services_used: Vec<String>,
    pub services_skipped: Vec<String>,
    pub errors: Vec<ServiceError>,
    pub stages: Vec<StageOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geography: Option<GeographicContext>,
    /// Set by the batch scheduler for records it chose not to enrich.
    pub skipped: bool,
    /// Calls actually sent to a provider (cache hits excluded).
    pub provider_calls: u32,
    pub cache_lookups: u32,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl EnrichmentResponse {
    /// Number of stage outcomes that were served from the stage cache.
    pub fn cache_hits(&self) -> usize {
        self.stages.iter().filter(|s| s.cache_hit).count()
    }

    /// Stages pruned by classification or geography.
    pub fn routing_skips(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| {
                s.status == StageStatus::Skipped
                    && s.reason
                        .as_deref()
                        .is_some_and(|r| r.contains("(classification") || r.contains("(geography)"))
            })
            .count()
    }
}

/// Scheduler-level statistics for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_records: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub sequential: usize,
    pub skipped: usize,
    pub api_calls_skipped: usize,
    pub cache_lookups: usize,
    pub cache_hits: usize,
    pub cache_hit_rate: f64,
    pub provider_calls: u32,
    pub total_cost: f64,
    pub processing_time_ms: u64,
}

/// Result of `POST /api/v1/enrich/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnrichResponse {
    pub results: Vec<EnrichmentResponse>,
    pub stats: BatchStats,
}
