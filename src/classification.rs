//! Business type classification.
//!
//! Infers the primary business type of a record from keyword patterns and
//! turns it into provider routing recommendations. Classification is a pure
//! function of (name, address, description); [`BusinessClassifier`] only adds
//! a fingerprint-keyed cache in front of it.

use crate::cache::{fingerprint, TtlCache};
use crate::models::BusinessRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Matches needed for a keyword list to count as fully present.
const KEYWORD_SATURATION: f64 = 2.0;
const FULL_TEXT_WEIGHT: f64 = 60.0;
const NAME_WEIGHT: f64 = 30.0;
const NEGATIVE_PENALTY: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessType {
    Spa,
    Beauty,
    Accounting,
    Professional,
    Retail,
    Restaurant,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Spa => "spa",
            BusinessType::Beauty => "beauty",
            BusinessType::Accounting => "accounting",
            BusinessType::Professional => "professional",
            BusinessType::Retail => "retail",
            BusinessType::Restaurant => "restaurant",
        }
    }
}

/// Provider categories whose relevance depends on business type or location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderCategory {
    Chamber,
    SpaAssociation,
    BeautyAssociation,
    CpaLicensing,
    Apollo,
}

impl ProviderCategory {
    pub const ALL: [ProviderCategory; 5] = [
        ProviderCategory::SpaAssociation,
        ProviderCategory::BeautyAssociation,
        ProviderCategory::CpaLicensing,
        ProviderCategory::Apollo,
        ProviderCategory::Chamber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCategory::Chamber => "chamber",
            ProviderCategory::SpaAssociation => "spaAssociation",
            ProviderCategory::BeautyAssociation => "beautyAssociation",
            ProviderCategory::CpaLicensing => "cpaLicensing",
            ProviderCategory::Apollo => "apollo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStrategy {
    Parallel,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeographicScope {
    Local,
    State,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProviders {
    pub high_priority: Vec<ProviderCategory>,
    pub medium_priority: Vec<ProviderCategory>,
    pub skip: Vec<ProviderCategory>,
}

impl RecommendedProviders {
    /// Whether the category is recommended at any priority.
    pub fn recommends(&self, category: ProviderCategory) -> bool {
        self.high_priority.contains(&category) || self.medium_priority.contains(&category)
    }

    pub fn skips(&self, category: ProviderCategory) -> bool {
        self.skip.contains(&category)
    }

    pub fn relevant_count(&self) -> usize {
        self.high_priority.len() + self.medium_priority.len()
    }
}

/// Classification of one business record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub primary_type: Option<BusinessType>,
    pub confidence: ConfidenceLevel,
    pub per_type_scores: BTreeMap<BusinessType, f64>,
    pub recommended_providers: RecommendedProviders,
    pub geographic_scope: GeographicScope,
    pub processing_strategy: ProcessingStrategy,
}

struct TypePattern {
    business_type: BusinessType,
    keywords: &'static [&'static str],
    negative_keywords: &'static [&'static str],
    weight: f64,
    relevant_providers: &'static [ProviderCategory],
    scope: GeographicScope,
}

// Iteration order is the tie-break: the first registered type wins a tie.
static PATTERNS: [TypePattern; 6] = [
    TypePattern {
        business_type: BusinessType::Spa,
        keywords: &["spa", "wellness", "massage", "facial", "relaxation", "therapeutic", "healing", "retreat"],
        negative_keywords: &["car spa", "pet spa", "auto spa"],
        weight: 0.9,
        relevant_providers: &[ProviderCategory::SpaAssociation, ProviderCategory::Chamber],
        scope: GeographicScope::Local,
    },
    TypePattern {
        business_type: BusinessType::Beauty,
        keywords: &["beauty", "salon", "hair", "nail", "cosmetic", "barbershop", "stylist", "lashes"],
        negative_keywords: &["beauty supply", "beauty wholesale"],
        weight: 0.85,
        relevant_providers: &[ProviderCategory::BeautyAssociation, ProviderCategory::Chamber],
        scope: GeographicScope::Local,
    },
    TypePattern {
        business_type: BusinessType::Accounting,
        keywords: &["accounting", "cpa", "tax", "bookkeeping", "financial", "audit", "payroll"],
        negative_keywords: &["account manager", "account executive"],
        weight: 0.95,
        relevant_providers: &[ProviderCategory::CpaLicensing, ProviderCategory::Chamber],
        scope: GeographicScope::State,
    },
    TypePattern {
        business_type: BusinessType::Professional,
        keywords: &["law", "legal", "attorney", "consulting", "architect", "engineer", "medical", "dental"],
        negative_keywords: &["legal aid", "legal clinic"],
        weight: 0.8,
        relevant_providers: &[ProviderCategory::Chamber, ProviderCategory::Apollo],
        scope: GeographicScope::State,
    },
    TypePattern {
        business_type: BusinessType::Retail,
        keywords: &["store", "shop", "retail", "boutique", "market", "outlet"],
        negative_keywords: &["online store", "e commerce"],
        weight: 0.7,
        relevant_providers: &[ProviderCategory::Chamber, ProviderCategory::Apollo],
        scope: GeographicScope::Local,
    },
    TypePattern {
        business_type: BusinessType::Restaurant,
        keywords: &["restaurant", "cafe", "diner", "bistro", "eatery", "food", "kitchen", "grill"],
        negative_keywords: &["food truck", "catering"],
        weight: 0.75,
        relevant_providers: &[ProviderCategory::Chamber],
        scope: GeographicScope::Local,
    },
];

/// Lowercases, replaces punctuation with spaces and pads with single spaces,
/// so keyword checks match whole words (" spa " never matches "space").
fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    format!(" {} ", words.join(" "))
}

fn count_matches(text: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| text.contains(&format!(" {} ", keyword)))
        .count()
}

fn keyword_ratio(text: &str, keywords: &[&str]) -> f64 {
    (count_matches(text, keywords) as f64 / KEYWORD_SATURATION).min(1.0)
}

fn score_type(full_text: &str, name: &str, pattern: &TypePattern) -> f64 {
    let raw = FULL_TEXT_WEIGHT * keyword_ratio(full_text, pattern.keywords)
        + NAME_WEIGHT * keyword_ratio(name, pattern.keywords)
        - NEGATIVE_PENALTY * count_matches(full_text, pattern.negative_keywords) as f64;

    (pattern.weight * raw).clamp(0.0, 100.0)
}

fn confidence_for(best: f64, second_best: f64) -> ConfidenceLevel {
    if best > 70.0 && best - second_best > 20.0 {
        ConfidenceLevel::High
    } else if best > 40.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn recommend_providers(
    primary: Option<&TypePattern>,
    confidence: ConfidenceLevel,
    has_website: bool,
) -> RecommendedProviders {
    let mut recommendations = RecommendedProviders::default();

    let pattern = match primary {
        Some(pattern) if confidence != ConfidenceLevel::Low => pattern,
        _ => {
            // Unclear type: only the universally relevant chamber lookup survives
            recommendations.medium_priority.push(ProviderCategory::Chamber);
            recommendations.skip = vec![
                ProviderCategory::SpaAssociation,
                ProviderCategory::BeautyAssociation,
                ProviderCategory::CpaLicensing,
            ];
            return recommendations;
        }
    };

    let business_type = pattern.business_type;
    match confidence {
        ConfidenceLevel::High => {
            recommendations.high_priority = pattern.relevant_providers.to_vec();
            let wants_apollo = matches!(
                business_type,
                BusinessType::Accounting | BusinessType::Professional
            );
            if wants_apollo
                && has_website
                && !recommendations.high_priority.contains(&ProviderCategory::Apollo)
            {
                recommendations.high_priority.push(ProviderCategory::Apollo);
            }
        }
        ConfidenceLevel::Medium => {
            recommendations.medium_priority = pattern.relevant_providers.to_vec();
            if business_type == BusinessType::Accounting && has_website {
                recommendations.medium_priority.push(ProviderCategory::Apollo);
            }
        }
        ConfidenceLevel::Low => {}
    }

    if !recommendations.recommends(ProviderCategory::Chamber) {
        recommendations.medium_priority.push(ProviderCategory::Chamber);
    }

    recommendations.skip = ProviderCategory::ALL
        .iter()
        .copied()
        .filter(|category| !recommendations.recommends(*category))
        .collect();

    recommendations
}

fn processing_strategy_for(
    confidence: ConfidenceLevel,
    recommendations: &RecommendedProviders,
) -> ProcessingStrategy {
    let total = recommendations.relevant_count();
    if total <= 2 || (confidence == ConfidenceLevel::High && total <= 4) {
        ProcessingStrategy::Parallel
    } else {
        ProcessingStrategy::Sequential
    }
}

/// Highest positive score in catalog order. Only a strictly higher score
/// replaces the current best, so the earlier pattern wins a tie.
fn pick_primary<'a>(scored: &[(&'a TypePattern, f64)]) -> Option<(&'a TypePattern, f64)> {
    let mut best: Option<(&'a TypePattern, f64)> = None;
    for (pattern, score) in scored {
        let current = best.map(|(_, s)| s).unwrap_or(0.0);
        if *score > current {
            best = Some((*pattern, *score));
        }
    }
    best
}

/// Classifies a business record.
///
/// Deterministic: identical (name, address, description) always yield an
/// identical result. A blank name yields no primary type and low confidence.
pub fn classify(record: &BusinessRecord) -> Classification {
    let name = normalize_text(&record.name);
    let full_text = normalize_text(&format!(
        "{} {} {}",
        record.name,
        record.address.as_deref().unwrap_or(""),
        record.description.as_deref().unwrap_or("")
    ));
    let has_website = record
        .website
        .as_deref()
        .is_some_and(|w| !w.trim().is_empty());

    let scored: Vec<(&TypePattern, f64)> = if record.name.trim().is_empty() {
        Vec::new()
    } else {
        PATTERNS
            .iter()
            .map(|pattern| (pattern, score_type(&full_text, &name, pattern)))
            .collect()
    };
    let per_type_scores: BTreeMap<BusinessType, f64> = scored
        .iter()
        .map(|(pattern, score)| (pattern.business_type, *score))
        .collect();
    let (best, best_score) = match pick_primary(&scored) {
        Some((pattern, score)) => (Some(pattern), score),
        None => (None, 0.0),
    };

    let second_best = {
        let mut scores: Vec<f64> = per_type_scores.values().copied().collect();
        scores.sort_by(|a, b| b.total_cmp(a));
        scores.get(1).copied().unwrap_or(0.0)
    };

    let confidence = if best.is_some() {
        confidence_for(best_score, second_best)
    } else {
        ConfidenceLevel::Low
    };

    let recommended_providers = recommend_providers(best, confidence, has_website);
    let processing_strategy = processing_strategy_for(confidence, &recommended_providers);

    Classification {
        primary_type: best.map(|p| p.business_type),
        confidence,
        per_type_scores,
        recommended_providers,
        geographic_scope: best.map(|p| p.scope).unwrap_or(GeographicScope::Local),
        processing_strategy,
    }
}

/// Classifier with a fingerprint-keyed cache in front of [`classify`].
#[derive(Clone)]
pub struct BusinessClassifier {
    cache: TtlCache<Classification>,
    ttl: Duration,
}

impl BusinessClassifier {
    pub fn new(cache: TtlCache<Classification>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Returns the cached classification for this name+address, computing it
    /// on a miss.
    pub async fn classify(&self, record: &BusinessRecord) -> Classification {
        let key = fingerprint(&[
            "classification",
            &record.name,
            record.address.as_deref().unwrap_or(""),
        ]);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Classification cache hit for '{}'", record.name);
            return cached;
        }

        let classification = classify(record);
        tracing::debug!(
            "Classified '{}' as {:?} ({:?} confidence)",
            record.name,
            classification.primary_type,
            classification.confidence
        );
        self.cache.set(key, classification.clone(), self.ttl).await;
        classification
    }
}
