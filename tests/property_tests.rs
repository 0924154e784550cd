/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
mod common;

use common::*;
use proptest::prelude::*;
use rust_prospect_api::budget::BudgetLedger;
use rust_prospect_api::cache::fingerprint;
use rust_prospect_api::classification::classify;
use rust_prospect_api::confidence::confidence_score;
use rust_prospect_api::geographic::analyze_location;
use rust_prospect_api::models::{
    BusinessRecord, CompanyInfo, ComplianceData, DiscoveredEmail, EnrichedData, ExecutiveContact,
    SecretaryOfStateRecord, StageStatus,
};
use rust_prospect_api::stages::ProviderKind;
use rust_prospect_api::validation::{is_valid_email, validate_us_phone};
use serde_json::json;

// Property: Classification is a pure function of its inputs
proptest! {
    #[test]
    fn classification_is_deterministic(
        name in "\\PC{0,40}",
        address in "\\PC{0,60}",
        description in proptest::option::of("\\PC{0,60}")
    ) {
        let mut record = BusinessRecord::new(name, address);
        record.description = description;
        let first = classify(&record);
        let second = classify(&record);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn classification_scores_stay_in_range(name in "[a-zA-Z &]{0,40}") {
        let classification = classify(&BusinessRecord::new(name, ""));
        for score in classification.per_type_scores.values() {
            prop_assert!((0.0..=100.0).contains(score));
        }
    }

    #[test]
    fn location_parsing_never_panics(address in "\\PC*", state in proptest::option::of("\\PC{0,4}")) {
        let mut record = BusinessRecord::new("Acme", address);
        record.state = state;
        let context = analyze_location(&record);
        if let Some(state) = context.state {
            prop_assert_eq!(state.len(), 2);
        }
    }
}

// Property: Confidence score is bounded and depends only on field presence
proptest! {
    #[test]
    fn confidence_score_is_bounded(
        company in any::<bool>(),
        company_details in any::<bool>(),
        emails in 0usize..4,
        verified in any::<bool>(),
        executives in any::<bool>(),
        compliance in any::<bool>(),
        sos in any::<bool>(),
        good_standing in any::<bool>()
    ) {
        let mut data = EnrichedData::default();
        if company {
            data.company_info = Some(CompanyInfo {
                name: "Acme".to_string(),
                industry: company_details.then(|| "retail".to_string()),
                size: company_details.then(|| "11-50".to_string()),
                founded: None,
                revenue: None,
                website: None,
                description: None,
                source: "people_data_labs".to_string(),
            });
        }
        for i in 0..emails {
            data.emails.push(DiscoveredEmail {
                email: format!("person{}@acme.com", i),
                confidence: None,
                verified: verified && i == 0,
                verification_result: None,
                kind: None,
                first_name: None,
                last_name: None,
                position: None,
            });
        }
        if executives {
            data.executive_contacts.push(ExecutiveContact {
                name: "Pat Doe".to_string(),
                title: "CEO".to_string(),
                email: None,
                phone: None,
                linkedin: None,
            });
        }
        if compliance {
            data.compliance_data = Some(ComplianceData {
                finra_check: Some(true),
                sanctions_check: None,
                risk_score: None,
                findings: Vec::new(),
            });
        }
        if sos {
            data.secretary_of_state = Some(SecretaryOfStateRecord {
                entity_name: "Acme".to_string(),
                registry_number: None,
                status: None,
                state: None,
                good_standing: Some(good_standing),
                source: "cobalt".to_string(),
            });
        }

        let score = confidence_score(&data);
        prop_assert!(score >= 40 && score <= 100);
        prop_assert_eq!(score, confidence_score(&data.clone()));
    }
}

// Property: The ledger never commits past its cap when callers check first
proptest! {
    #[test]
    fn ledger_respects_cap(cap in 0.0f64..5.0, costs in proptest::collection::vec(0.0f64..2.0, 0..20)) {
        let mut ledger = BudgetLedger::new(cap);
        let mut committed = 0.0;
        for cost in costs {
            if ledger.can_afford(cost) {
                committed += ledger.commit("stage", cost);
            }
            prop_assert!(ledger.running_cost() <= cap + 1e-9);
        }
        prop_assert!((ledger.running_cost() - committed).abs() < 1e-9);
    }

    #[test]
    fn fingerprint_ignores_case_and_spacing(name in "[a-zA-Z]{1,12}( [a-zA-Z]{1,12}){0,3}") {
        let spaced = format!("  {}  ", name.replace(' ', "   ").to_uppercase());
        prop_assert_eq!(fingerprint(&[&name, "x"]), fingerprint(&[&spaced, "x"]));
    }
}

// Property: A full waterfall run never exceeds its cap and its cost adds up
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn waterfall_total_cost_is_sum_of_stages(
        cap in 0.0f64..3.0,
        flags in proptest::collection::vec(any::<bool>(), 7)
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let response = runtime.block_on(async {
            let executor = executor(
                base_registry()
                    .with(MockProvider::ok(ProviderKind::Hunter, hunter_payload()))
                    .with(MockProvider::ok(ProviderKind::NeverBounce, neverbounce_payload()))
                    .with(MockProvider::ok(ProviderKind::Cobalt, json!({"entity": {"name": "Sunrise Spa & Wellness", "status": "Active"}})))
                    .with(MockProvider::ok(ProviderKind::BusinessLicense, json!({"records": [{"licenseNumber": "L-1", "status": "Active"}]})))
                    .with(MockProvider::ok(ProviderKind::PeopleDataLabs, json!({"company": {"enriched": true, "data": {"name": "Sunrise"}}})))
                    .with(MockProvider::ok(ProviderKind::Apollo, json!({"contacts": [{"name": "Maya Lopez"}]}))),
            );

            let mut options = only("compliance");
            options.discover_emails = Some(flags[0]);
            options.verify_emails = Some(flags[1]);
            options.include_business_license = Some(flags[2]);
            options.include_company_enrichment = Some(flags[3]);
            options.include_person_enrichment = Some(flags[4]);
            options.compliance_verification = Some(flags[5]);
            options.apollo_enrichment = Some(flags[6]);
            options.max_cost_per_business = Some(cap);

            enrich(&executor, &spa_record(), &options).await
        });

        prop_assert!(response.success);
        prop_assert!(response.total_cost <= cap + 1e-9);
        let executed: f64 = response
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Executed)
            .map(|s| s.cost_applied)
            .sum();
        prop_assert!((executed - response.total_cost).abs() < 1e-9);
        prop_assert!(response.confidence_score <= 100);
    }
}

// Property: Validation helpers never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_us_phone(&phone);
    }

    #[test]
    fn normalized_phones_are_e164(area in 201u32..=989u32, exchange in 200u32..=999u32, line in 0u32..=9999u32) {
        let phone = format!("({}) {}-{:04}", area, exchange, line);
        if let Some(normalized) = validate_us_phone(&phone) {
            prop_assert!(normalized.starts_with("+1"));
            prop_assert_eq!(normalized.len(), 12);
            prop_assert!(normalized[1..].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
