//! Fixed enrichment stage catalog.
//!
//! Free/local stages first, then ascending by estimated cost, with the
//! premium executive lookup last.

use crate::cache::CacheCategory;
use crate::classification::ProviderCategory;
use serde::{Deserialize, Serialize};

pub const HUNTER_COST: f64 = 0.034;
pub const COBALT_COST: f64 = 0.90;
pub const LICENSE_COST: f64 = 0.05;
pub const PDL_COMPANY_COST: f64 = 0.05;
pub const PDL_PERSON_COST: f64 = 0.28;
pub const NEVERBOUNCE_COST_PER_EMAIL: f64 = 0.008;
pub const APOLLO_COST: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    BasicValidation,
    ChamberVerification,
    TradeAssociation,
    EmailDiscovery,
    ComplianceSos,
    StateLicense,
    CompanyPersonEnrichment,
    EmailVerification,
    ExecutiveContacts,
}

/// Which provider adapter serves a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Validation,
    Chamber,
    TradeAssociation,
    Hunter,
    Cobalt,
    BusinessLicense,
    PeopleDataLabs,
    NeverBounce,
    Apollo,
}

/// People Data Labs sub-call variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdlLookup {
    Company,
    Person,
    CompanyAndPerson,
}

impl PdlLookup {
    pub fn service_tag(&self) -> &'static str {
        match self {
            PdlLookup::Company => "people_data_labs_company",
            PdlLookup::Person => "people_data_labs_person",
            PdlLookup::CompanyAndPerson => "people_data_labs_company_and_person",
        }
    }

    pub fn estimate(&self) -> f64 {
        match self {
            PdlLookup::Company => PDL_COMPANY_COST,
            PdlLookup::Person => PDL_PERSON_COST,
            PdlLookup::CompanyAndPerson => PDL_COMPANY_COST + PDL_PERSON_COST,
        }
    }

    pub fn includes_person(&self) -> bool {
        matches!(self, PdlLookup::Person | PdlLookup::CompanyAndPerson)
    }
}

impl StageId {
    pub const CATALOG: [StageId; 9] = [
        StageId::BasicValidation,
        StageId::ChamberVerification,
        StageId::TradeAssociation,
        StageId::EmailDiscovery,
        StageId::ComplianceSos,
        StageId::StateLicense,
        StageId::CompanyPersonEnrichment,
        StageId::EmailVerification,
        StageId::ExecutiveContacts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::BasicValidation => "basic_validation",
            StageId::ChamberVerification => "chamber_verification",
            StageId::TradeAssociation => "trade_association",
            StageId::EmailDiscovery => "email_discovery",
            StageId::ComplianceSos => "compliance_sos",
            StageId::StateLicense => "state_license",
            StageId::CompanyPersonEnrichment => "company_person_enrichment",
            StageId::EmailVerification => "email_verification",
            StageId::ExecutiveContacts => "executive_contacts",
        }
    }

    /// Default service tag. Trade association and PDL stages pick a more
    /// specific tag at run time.
    pub fn service_tag(&self) -> &'static str {
        match self {
            StageId::BasicValidation => "basic_validation",
            StageId::ChamberVerification => "chamber_directory",
            StageId::TradeAssociation => "trade_association",
            StageId::EmailDiscovery => "hunter_io",
            StageId::ComplianceSos => "cobalt_sos",
            StageId::StateLicense => "state_license",
            StageId::CompanyPersonEnrichment => "people_data_labs",
            StageId::EmailVerification => "neverbounce",
            StageId::ExecutiveContacts => "apollo",
        }
    }

    pub fn provider_kind(&self) -> ProviderKind {
        match self {
            StageId::BasicValidation => ProviderKind::Validation,
            StageId::ChamberVerification => ProviderKind::Chamber,
            StageId::TradeAssociation => ProviderKind::TradeAssociation,
            StageId::EmailDiscovery => ProviderKind::Hunter,
            StageId::ComplianceSos => ProviderKind::Cobalt,
            StageId::StateLicense => ProviderKind::BusinessLicense,
            StageId::CompanyPersonEnrichment => ProviderKind::PeopleDataLabs,
            StageId::EmailVerification => ProviderKind::NeverBounce,
            StageId::ExecutiveContacts => ProviderKind::Apollo,
        }
    }

    pub fn cache_category(&self) -> CacheCategory {
        match self {
            StageId::ComplianceSos | StageId::StateLicense => CacheCategory::Registry,
            StageId::ChamberVerification | StageId::TradeAssociation => CacheCategory::Association,
            _ => CacheCategory::Contact,
        }
    }

    /// Provider category whose relevance gates this stage, if any. The trade
    /// association category depends on the business type and is resolved by
    /// the executor.
    pub fn routed_category(&self) -> Option<ProviderCategory> {
        match self {
            StageId::ChamberVerification => Some(ProviderCategory::Chamber),
            StageId::StateLicense => Some(ProviderCategory::CpaLicensing),
            StageId::ExecutiveContacts => Some(ProviderCategory::Apollo),
            _ => None,
        }
    }

    /// Local stages never leave the process and don't count as provider work
    /// for batch bucketing.
    pub fn is_local(&self) -> bool {
        matches!(self, StageId::BasicValidation)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
