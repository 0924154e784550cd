//! Prospect Enrichment API Library
//!
//! Cost-constrained, progressive enrichment of business records: records are
//! classified, routed by geography, and pushed through a budget-gated
//! waterfall of paid data providers with a shared TTL cache in front.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Pipeline logic (classification, routing, waterfall, scheduling).
//! - `integrations`: Provider adapters.
//! - `budget`: Per-run cost ledger.
//! - `cache`: Shared TTL cache and fingerprints.
//! - `circuit_breaker`: Circuit breaker for gateway providers.
//! - `classification`: Business type classification.
//! - `confidence`: Final confidence score.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `extractors`: Typed provider payload extraction.
//! - `gateway_client`: Provider gateway HTTP client.
//! - `geographic`: Geographic context and provider relevance.
//! - `handlers`: HTTP request handlers.
//! - `models`: Request and response models.
//! - `options`: Tier defaults and option merging.
//! - `providers`: Provider contract and registry.
//! - `scheduler`: Batch scheduling.
//! - `stages`: Stage catalog.
//! - `validation`: Free local validation stage.
//! - `waterfall`: Budget-gated waterfall executor.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod budget;
pub mod cache;
pub mod circuit_breaker;
pub mod classification;
pub mod confidence;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod gateway_client;
pub mod geographic;
pub mod handlers;
pub mod models;
pub mod options;
pub mod providers;
pub mod scheduler;
pub mod stages;
pub mod validation;
pub mod waterfall;
