//! Enrichment option resolution.
//!
//! Three layers, lowest precedence first:
//!
//! 1. Environment toggles (`USE_STATE_LICENSE`, `USE_PDL`). They can only
//!    switch a tier default off, never on.
//! 2. Tier defaults (flags and budget cap).
//! 3. Flags present on the request. A flag set on the request always wins,
//!    and `maxCostPerBusiness` replaces the tier cap.

use crate::models::{EnrichmentOptions, Tier};
use serde::Serialize;

/// Process-wide feature switches read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureToggles {
    pub use_state_license: bool,
    pub use_pdl: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            use_state_license: true,
            use_pdl: true,
        }
    }
}

/// Effective per-stage request flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFlags {
    pub discover_emails: bool,
    pub verify_emails: bool,
    pub include_business_license: bool,
    pub include_company_enrichment: bool,
    pub include_person_enrichment: bool,
    pub compliance_verification: bool,
    pub apollo_enrichment: bool,
    pub chamber_verification: bool,
    pub trade_associations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptions {
    pub tier: Tier,
    pub flags: StageFlags,
    pub budget_cap: f64,
    pub executive_contacts_only: bool,
    pub min_confidence_score: Option<u8>,
}

impl Tier {
    pub fn budget_cap(&self) -> f64 {
        match self {
            Tier::Starter => 0.50,
            Tier::Professional => 1.50,
            Tier::Enterprise => 3.50,
            Tier::Compliance => 7.50,
        }
    }

    /// Default flags for the tier before environment toggles are applied.
    pub fn default_flags(&self) -> StageFlags {
        let starter = StageFlags {
            discover_emails: true,
            ..StageFlags::default()
        };
        let professional = StageFlags {
            include_business_license: true,
            include_company_enrichment: true,
            verify_emails: true,
            chamber_verification: true,
            trade_associations: true,
            ..starter
        };
        let enterprise = StageFlags {
            include_person_enrichment: true,
            ..professional
        };

        match self {
            Tier::Starter => starter,
            Tier::Professional => professional,
            Tier::Enterprise => enterprise,
            Tier::Compliance => StageFlags {
                apollo_enrichment: true,
                compliance_verification: true,
                ..enterprise
            },
        }
    }
}

/// Merges request options, tier defaults and environment toggles.
pub fn resolve_options(options: &EnrichmentOptions, toggles: &FeatureToggles) -> ResolvedOptions {
    let tier = Tier::resolve(options.tier.as_deref());
    let mut defaults = tier.default_flags();

    if !toggles.use_state_license {
        defaults.include_business_license = false;
    }
    if !toggles.use_pdl {
        defaults.include_person_enrichment = false;
    }

    let flags = StageFlags {
        discover_emails: options.discover_emails.unwrap_or(defaults.discover_emails),
        verify_emails: options.verify_emails.unwrap_or(defaults.verify_emails),
        include_business_license: options
            .include_business_license
            .unwrap_or(defaults.include_business_license),
        include_company_enrichment: options
            .include_company_enrichment
            .unwrap_or(defaults.include_company_enrichment),
        include_person_enrichment: options
            .include_person_enrichment
            .unwrap_or(defaults.include_person_enrichment),
        compliance_verification: options
            .compliance_verification
            .unwrap_or(defaults.compliance_verification),
        apollo_enrichment: options.apollo_enrichment.unwrap_or(defaults.apollo_enrichment),
        chamber_verification: options
            .chamber_verification
            .unwrap_or(defaults.chamber_verification),
        trade_associations: options
            .trade_associations
            .unwrap_or(defaults.trade_associations),
    };

    let budget_cap = options
        .max_cost_per_business
        .filter(|cap| cap.is_finite() && *cap >= 0.0)
        .unwrap_or_else(|| tier.budget_cap());

    ResolvedOptions {
        tier,
        flags,
        budget_cap,
        executive_contacts_only: options.executive_contacts_only.unwrap_or(false),
        min_confidence_score: options.min_confidence_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_for(tier: &str) -> EnrichmentOptions {
        EnrichmentOptions {
            tier: Some(tier.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_starter_is_email_discovery_only() {
        let resolved = resolve_options(&options_for("starter"), &FeatureToggles::default());
        assert!(resolved.flags.discover_emails);
        assert!(!resolved.flags.verify_emails);
        assert!(!resolved.flags.include_business_license);
        assert_eq!(resolved.budget_cap, 0.5);
    }

    #[test]
    fn test_tier_ladder_accumulates_flags() {
        let toggles = FeatureToggles::default();
        let pro = resolve_options(&options_for("professional"), &toggles);
        assert!(pro.flags.include_business_license && pro.flags.include_company_enrichment);
        assert!(!pro.flags.include_person_enrichment);

        let ent = resolve_options(&options_for("enterprise"), &toggles);
        assert!(ent.flags.include_person_enrichment);
        assert!(!ent.flags.apollo_enrichment);
        assert_eq!(ent.budget_cap, 3.5);

        let comp = resolve_options(&options_for("compliance"), &toggles);
        assert!(comp.flags.apollo_enrichment && comp.flags.compliance_verification);
        assert_eq!(comp.budget_cap, 7.5);
    }

    #[test]
    fn test_env_toggle_only_disables_defaults() {
        let toggles = FeatureToggles {
            use_state_license: false,
            use_pdl: false,
        };
        let resolved = resolve_options(&options_for("enterprise"), &toggles);
        assert!(!resolved.flags.include_business_license);
        assert!(!resolved.flags.include_person_enrichment);

        let mut options = options_for("enterprise");
        options.include_business_license = Some(true);
        let resolved = resolve_options(&options, &toggles);
        assert!(resolved.flags.include_business_license);
    }

    #[test]
    fn test_request_flags_and_cap_override_tier() {
        let mut options = options_for("compliance");
        options.apollo_enrichment = Some(false);
        options.max_cost_per_business = Some(0.25);
        let resolved = resolve_options(&options, &FeatureToggles::default());
        assert!(!resolved.flags.apollo_enrichment);
        assert_eq!(resolved.budget_cap, 0.25);
    }

    #[test]
    fn test_invalid_cap_falls_back_to_tier() {
        let mut options = options_for("starter");
        options.max_cost_per_business = Some(f64::NAN);
        let resolved = resolve_options(&options, &FeatureToggles::default());
        assert_eq!(resolved.budget_cap, 0.5);
    }

    #[test]
    fn test_missing_tier_defaults_to_professional() {
        let resolved = resolve_options(&EnrichmentOptions::default(), &FeatureToggles::default());
        assert_eq!(resolved.tier, Tier::Professional);
        assert_eq!(resolved.budget_cap, 1.5);
    }
}
