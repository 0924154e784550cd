/// Waterfall executor tests against scripted in-process providers
mod common;

use common::*;
use rust_prospect_api::errors::AppError;
use rust_prospect_api::models::{BusinessRecord, StageStatus};
use rust_prospect_api::providers::{ProviderResponse, UnavailableProvider};
use rust_prospect_api::stages::{ProviderKind, StageId};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn company_payload() -> serde_json::Value {
    json!({
        "company": {
            "enriched": true,
            "data": {"name": "Sunrise Spa & Wellness", "industry": "health, wellness and fitness", "employee_count_range": "11-50"}
        }
    })
}

#[tokio::test]
async fn test_budget_skips_stage_that_would_exceed_cap() {
    let hunter = MockProvider::ok(ProviderKind::Hunter, hunter_payload());
    let cobalt = MockProvider::ok(ProviderKind::Cobalt, json!({"entity": {"name": "Sunrise Spa & Wellness"}}));
    let executor = executor(base_registry().with(hunter.clone()).with(cobalt.clone()));

    let mut options = only("starter");
    options.discover_emails = Some(true);
    options.compliance_verification = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;

    assert!(response.success);
    assert!(approx(response.budget_cap, 0.50));
    assert!(approx(response.total_cost, 0.034));
    assert!(response.services_used.contains(&"hunter_io".to_string()));
    assert!(response
        .services_skipped
        .iter()
        .any(|s| s == "cobalt_sos (budget)"));
    assert_eq!(hunter.calls(), 1);
    assert_eq!(cobalt.calls(), 0);
}

#[tokio::test]
async fn test_second_identical_run_is_served_from_cache() {
    let hunter = MockProvider::ok(ProviderKind::Hunter, hunter_payload());
    let executor = executor(base_registry().with(hunter.clone()));

    let mut options = only("starter");
    options.discover_emails = Some(true);

    let first = enrich(&executor, &spa_record(), &options).await;
    let second = enrich(&executor, &spa_record(), &options).await;

    assert_eq!(hunter.calls(), 1);
    assert!(approx(first.total_cost, 0.034));
    assert!(approx(second.total_cost, 0.0));
    assert!(second
        .services_used
        .contains(&"hunter_io (cached)".to_string()));

    let discovery = second
        .stages
        .iter()
        .find(|s| s.stage_id == StageId::EmailDiscovery)
        .unwrap();
    assert!(discovery.cache_hit);
    assert_eq!(discovery.status, StageStatus::Executed);
    assert_eq!(second.enriched_data.emails.len(), 2);
    assert!(first.provider_calls >= 1);
    assert_eq!(second.provider_calls, 0);
}

#[tokio::test]
async fn test_verification_error_is_recorded_and_later_stages_run() {
    let hunter = MockProvider::ok(ProviderKind::Hunter, hunter_payload());
    let neverbounce = MockProvider::failing(
        ProviderKind::NeverBounce,
        AppError::ExternalApiError("connection reset by peer".to_string()),
    );
    let apollo = MockProvider::ok(
        ProviderKind::Apollo,
        json!({"contacts": [{"name": "Maya Lopez", "title": "Owner", "email": "owner@sunrisespa.com"}]}),
    );
    let executor = executor(
        base_registry()
            .with(hunter.clone())
            .with(neverbounce.clone())
            .with(apollo.clone()),
    );

    let mut options = only("compliance");
    options.discover_emails = Some(true);
    options.verify_emails = Some(true);
    options.apollo_enrichment = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;

    assert!(response.success);
    assert!(response.errors.iter().any(|e| e.service == "neverbounce"));
    let verification = response
        .stages
        .iter()
        .find(|s| s.stage_id == StageId::EmailVerification)
        .unwrap();
    assert_eq!(verification.status, StageStatus::Errored);
    assert!(approx(verification.cost_applied, 0.0));

    assert_eq!(apollo.calls(), 1);
    assert_eq!(response.enriched_data.executive_contacts.len(), 1);
    assert!(approx(response.total_cost, 0.034 + 1.0));
}

#[tokio::test]
async fn test_verified_email_raises_confidence() {
    let hunter = MockProvider::ok(ProviderKind::Hunter, hunter_payload());
    let neverbounce = MockProvider::ok(ProviderKind::NeverBounce, neverbounce_payload());
    let executor = executor(base_registry().with(hunter.clone()).with(neverbounce.clone()));

    let mut options = only("professional");
    options.discover_emails = Some(true);
    options.verify_emails = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;

    let requests = neverbounce.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].emails,
        vec!["owner@sunrisespa.com".to_string(), "info@sunrisespa.com".to_string()]
    );

    let owner = &response.enriched_data.emails[0];
    assert!(owner.verified);
    assert_eq!(owner.verification_result.as_deref(), Some("valid"));
    assert!(!response.enriched_data.emails[1].verified);

    assert_eq!(response.confidence_score, 65);
    assert!(approx(response.total_cost, 0.034 + 0.016));
}

#[tokio::test]
async fn test_combined_pdl_lookup_splits_when_over_budget() {
    let pdl = MockProvider::ok(ProviderKind::PeopleDataLabs, company_payload());
    let executor = executor(base_registry().with(pdl.clone()));

    let mut options = only("enterprise");
    options.include_company_enrichment = Some(true);
    options.include_person_enrichment = Some(true);
    options.max_cost_per_business = Some(0.10);

    let response = enrich(&executor, &spa_record(), &options).await;

    assert_eq!(pdl.calls(), 1);
    assert!(response
        .services_used
        .contains(&"people_data_labs_company".to_string()));
    assert!(response
        .services_skipped
        .contains(&"people_data_labs_person (budget)".to_string()));
    assert!(approx(response.total_cost, 0.05));
    assert!(response.enriched_data.company_info.is_some());
}

#[tokio::test]
async fn test_live_compliance_check_is_not_answered_from_registry_lookup() {
    let cobalt = MockProvider::ok(
        ProviderKind::Cobalt,
        json!({"entity": {"name": "Sunrise Spa & Wellness", "status": "Active"}}),
    );
    let executor = executor(base_registry().with(cobalt.clone()));

    let mut license_only = only("professional");
    license_only.include_business_license = Some(true);
    let mut live = only("professional");
    live.compliance_verification = Some(true);

    enrich(&executor, &spa_record(), &license_only).await;
    let second = enrich(&executor, &spa_record(), &live).await;

    assert_eq!(cobalt.calls(), 2);
    let live_flags: Vec<Option<bool>> = cobalt.requests().iter().map(|r| r.live_data).collect();
    assert_eq!(live_flags, vec![Some(false), Some(true)]);

    let sos = second
        .stages
        .iter()
        .find(|s| s.stage_id == StageId::ComplianceSos)
        .unwrap();
    assert!(!sos.cache_hit);
    assert!(approx(sos.cost_applied, 0.90));
    assert!(second.services_used.contains(&"cobalt_sos".to_string()));

    // A repeated live check is still served from the cache
    let third = enrich(&executor, &spa_record(), &live).await;
    assert_eq!(cobalt.calls(), 2);
    assert!(third
        .services_used
        .contains(&"cobalt_sos (cached)".to_string()));
}

#[tokio::test]
async fn test_person_lookup_criteria_are_part_of_the_cache_key() {
    let pdl = MockProvider::ok(ProviderKind::PeopleDataLabs, company_payload());
    let executor = executor(base_registry().with(pdl.clone()));

    let mut person = only("enterprise");
    person.include_person_enrichment = Some(true);
    let mut owners_only = person.clone();
    owners_only.executive_contacts_only = Some(true);
    let mut stricter = person.clone();
    stricter.min_confidence_score = Some(80);

    enrich(&executor, &spa_record(), &person).await;
    enrich(&executor, &spa_record(), &owners_only).await;
    enrich(&executor, &spa_record(), &stricter).await;
    assert_eq!(pdl.calls(), 3);

    let requests = pdl.requests();
    assert_eq!(
        requests[1].title_keywords.as_deref(),
        Some(&["Owner".to_string(), "Principal".to_string(), "Managing Partner".to_string()][..])
    );
    assert_eq!(requests[2].minimum_likelihood, Some(0.8));

    // Same criteria again: cached
    enrich(&executor, &spa_record(), &owners_only).await;
    assert_eq!(pdl.calls(), 3);
}

#[tokio::test]
async fn test_pdl_without_match_costs_nothing() {
    let pdl = MockProvider::ok(
        ProviderKind::PeopleDataLabs,
        json!({"company": {"enriched": false}, "person": {"enriched": false}}),
    );
    let executor = executor(base_registry().with(pdl.clone()));

    let mut options = only("enterprise");
    options.include_company_enrichment = Some(true);
    options.include_person_enrichment = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;

    assert_eq!(pdl.calls(), 1);
    assert!(response
        .services_skipped
        .contains(&"people_data_labs_company_and_person (no match)".to_string()));
    assert!(approx(response.total_cost, 0.0));
}

#[tokio::test]
async fn test_provider_reported_cost_wins_over_estimate() {
    let hunter = MockProvider::new(
        ProviderKind::Hunter,
        Behavior::Respond(ProviderResponse::ok(hunter_payload()).with_cost(0.02)),
    );
    let executor = executor(base_registry().with(hunter));

    let mut options = only("starter");
    options.discover_emails = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;
    assert!(approx(response.total_cost, 0.02));
    assert_eq!(response.cost_breakdown.get("hunter_io"), Some(&0.02));
}

#[tokio::test]
async fn test_license_without_records_is_no_match() {
    let license = MockProvider::ok(ProviderKind::BusinessLicense, json!({"records": []}));
    let executor = executor(base_registry().with(license.clone()));

    let mut record = BusinessRecord::new("Harbor Tax & Accounting CPA", "200 Pine St, San Diego, CA 92101");
    record.domain = Some("harbortax.com".to_string());
    let mut options = only("professional");
    options.include_business_license = Some(true);

    let response = enrich(&executor, &record, &options).await;

    assert_eq!(license.calls(), 1);
    assert!(response
        .services_skipped
        .contains(&"state_license (no match)".to_string()));
    // Registry lookup is requested alongside the license but has no provider here
    assert!(response
        .services_skipped
        .contains(&"cobalt_sos (not configured)".to_string()));
    assert!(approx(response.total_cost, 0.0));
}

#[tokio::test]
async fn test_missing_domain_skips_discovery() {
    let hunter = MockProvider::ok(ProviderKind::Hunter, hunter_payload());
    let executor = executor(base_registry().with(hunter.clone()));

    let record = BusinessRecord::new("Sunrise Spa & Wellness", "1 Ocean Ave, San Diego, CA 92101");
    let mut options = only("starter");
    options.discover_emails = Some(true);

    let response = enrich(&executor, &record, &options).await;
    assert_eq!(hunter.calls(), 0);
    assert!(response
        .services_skipped
        .contains(&"hunter_io (missing domain)".to_string()));
}

#[tokio::test]
async fn test_low_confidence_record_skips_licensing_by_classification() {
    let license = MockProvider::ok(ProviderKind::BusinessLicense, json!({"records": []}));
    let executor = executor(base_registry().with(license.clone()));

    let record = BusinessRecord::new("Xyz Holdings", "9 Elm St, Austin, TX 78701");
    let mut options = only("professional");
    options.include_business_license = Some(true);

    let response = enrich(&executor, &record, &options).await;
    assert_eq!(license.calls(), 0);
    assert!(response
        .services_skipped
        .contains(&"state_license (classification)".to_string()));
    assert_eq!(response.routing_skips(), 1);
}

#[tokio::test]
async fn test_unimplemented_directory_is_skipped() {
    let executor = executor(base_registry().with(Arc::new(UnavailableProvider::new(
        "chamber",
        ProviderKind::Chamber,
    ))));

    let mut options = only("professional");
    options.chamber_verification = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;
    assert!(response.success);
    assert!(response
        .services_skipped
        .contains(&"chamber_directory (not implemented)".to_string()));
    assert!(response.errors.is_empty());
}

#[tokio::test]
async fn test_timeout_is_a_provider_error() {
    let hunter = MockProvider::new(ProviderKind::Hunter, Behavior::Hang);
    let executor = executor_with_timeout(
        base_registry().with(hunter.clone()),
        Duration::from_millis(50),
    );

    let mut options = only("starter");
    options.discover_emails = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;
    assert!(response.success);
    let error = response
        .errors
        .iter()
        .find(|e| e.service == "hunter_io")
        .unwrap();
    assert!(error.error.contains("did not answer"));
    assert!(approx(response.total_cost, 0.0));
}

#[tokio::test]
async fn test_panic_keeps_partial_results() {
    let hunter = MockProvider::ok(ProviderKind::Hunter, hunter_payload());
    let cobalt = MockProvider::new(ProviderKind::Cobalt, Behavior::Panic);
    let executor = executor(base_registry().with(hunter.clone()).with(cobalt.clone()));

    let mut options = only("compliance");
    options.discover_emails = Some(true);
    options.compliance_verification = Some(true);

    let response = enrich(&executor, &spa_record(), &options).await;

    assert!(!response.success);
    assert!(response.errors.iter().any(|e| e.service == "orchestrator"));
    assert_eq!(response.enriched_data.emails.len(), 2);
    assert!(approx(response.total_cost, 0.034));
}

#[tokio::test]
async fn test_every_requested_stage_is_accounted_for() {
    let executor = executor(
        base_registry()
            .with(MockProvider::ok(ProviderKind::Hunter, hunter_payload()))
            .with(MockProvider::ok(ProviderKind::NeverBounce, neverbounce_payload()))
            .with(MockProvider::failing(
                ProviderKind::Cobalt,
                AppError::ExternalApiError("503".to_string()),
            ))
            .with(MockProvider::ok(ProviderKind::PeopleDataLabs, company_payload()))
            .with(Arc::new(UnavailableProvider::new("chamber", ProviderKind::Chamber)))
            .with(Arc::new(UnavailableProvider::new(
                "trade association",
                ProviderKind::TradeAssociation,
            ))),
    );

    let mut options = only("compliance");
    for flag in [
        &mut options.discover_emails,
        &mut options.verify_emails,
        &mut options.include_business_license,
        &mut options.include_company_enrichment,
        &mut options.include_person_enrichment,
        &mut options.compliance_verification,
        &mut options.apollo_enrichment,
        &mut options.chamber_verification,
        &mut options.trade_associations,
    ] {
        *flag = Some(true);
    }

    let response = enrich(&executor, &spa_record(), &options).await;

    for stage in StageId::CATALOG {
        assert!(
            response.stages.iter().any(|s| s.stage_id == stage),
            "stage {} missing",
            stage
        );
    }

    for outcome in &response.stages {
        let reason = outcome.reason.clone().unwrap_or_default();
        match outcome.status {
            StageStatus::Executed => assert!(response
                .services_used
                .iter()
                .any(|s| s.starts_with(&outcome.service))),
            StageStatus::Skipped => {
                assert!(!reason.ends_with("(not requested)"));
                assert!(response.services_skipped.contains(&reason));
            }
            StageStatus::Errored => {
                assert!(response.errors.iter().any(|e| e.service == outcome.service))
            }
        }
    }

    let sum: f64 = response.stages.iter().map(|s| s.cost_applied).sum();
    assert!(approx(sum, response.total_cost));
    assert!(response.total_cost <= response.budget_cap + 1e-9);
}
