//! Geographic relevance routing.
//!
//! Derives a [`GeographicContext`] from a record's location fields and scores
//! how likely each provider category is to have coverage there. The result is
//! advisory; the waterfall combines it with classification before skipping.

use crate::classification::ProviderCategory;
use crate::models::BusinessRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

const CHAMBER_THRESHOLD: f64 = 0.3;
const APOLLO_THRESHOLD: f64 = 0.4;
const ASSOCIATION_THRESHOLD: f64 = 0.4;

const US_STATES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

const LICENSING_STATES: [&str; 5] = ["CA", "NY", "TX", "FL", "IL"];

const METROPOLITAN_CITIES: [&str; 10] = [
    "New York", "Los Angeles", "Chicago", "Houston", "Phoenix", "Philadelphia", "San Antonio",
    "San Diego", "Dallas", "San Jose",
];
const STATE_CAPITALS: [&str; 5] = ["Sacramento", "Albany", "Austin", "Tallahassee", "Springfield"];
const MAJOR_CITIES: [&str; 8] = [
    "Boston", "Seattle", "Denver", "Atlanta", "Miami", "Las Vegas", "Portland", "Nashville",
];

struct AssociationCoverage {
    strong: &'static [&'static str],
    moderate: &'static [&'static str],
    limited: &'static [&'static str],
}

static SPA_COVERAGE: AssociationCoverage = AssociationCoverage {
    strong: &["CA", "NY", "FL", "TX", "WA", "CO"],
    moderate: &["IL", "MA", "AZ", "NC", "GA"],
    limited: &["WY", "ND", "SD", "MT", "DE"],
};

static BEAUTY_COVERAGE: AssociationCoverage = AssociationCoverage {
    strong: &["CA", "NY", "FL", "TX", "IL", "OH"],
    moderate: &["WA", "OR", "AZ", "NC", "GA", "VA"],
    limited: &["VT", "NH", "ME", "WV", "MS"],
};

static REGIONS: [(Region, &[&str]); 4] = [
    (Region::West, &["CA", "WA", "OR", "NV", "AZ", "UT", "CO", "WY", "MT", "ID"]),
    (
        Region::South,
        &["TX", "FL", "GA", "NC", "SC", "VA", "TN", "KY", "WV", "AL", "MS", "LA", "AR", "OK"],
    ),
    (
        Region::Midwest,
        &["IL", "IN", "OH", "MI", "WI", "MN", "IA", "MO", "ND", "SD", "NE", "KS"],
    ),
    (Region::Northeast, &["NY", "PA", "NJ", "CT", "RI", "MA", "VT", "NH", "ME"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrbanizationLevel {
    Metropolitan,
    MajorCity,
    Suburban,
    SmallTown,
    Unknown,
}

impl UrbanizationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrbanizationLevel::Metropolitan => "metropolitan",
            UrbanizationLevel::MajorCity => "major_city",
            UrbanizationLevel::Suburban => "suburban",
            UrbanizationLevel::SmallTown => "small_town",
            UrbanizationLevel::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    West,
    South,
    Midwest,
    Northeast,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChamberNetworkLevel {
    Metropolitan,
    MajorCities,
    StateCapitals,
    Local,
    Unknown,
}

impl ChamberNetworkLevel {
    fn as_str(&self) -> &'static str {
        match self {
            ChamberNetworkLevel::Metropolitan => "metropolitan",
            ChamberNetworkLevel::MajorCities => "major city",
            ChamberNetworkLevel::StateCapitals => "state capital",
            ChamberNetworkLevel::Local => "local",
            ChamberNetworkLevel::Unknown => "unknown",
        }
    }
}

/// Coarse high/medium/low scale used for density, maturity and coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
        }
    }
}

/// Licensing domains with a known state authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensingAuthorities {
    pub cpa: bool,
    pub medical: bool,
    pub legal: bool,
    pub engineering: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRelevance {
    pub relevant: bool,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicContext {
    pub state: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub urbanization_level: UrbanizationLevel,
    pub region: Region,
    pub chamber_network_level: ChamberNetworkLevel,
    pub business_density: Level,
    pub business_maturity: Level,
    pub licensing: Option<LicensingAuthorities>,
    pub per_category_relevance: BTreeMap<ProviderCategory, CategoryRelevance>,
}

impl GeographicContext {
    /// Categories without an assessment are treated as relevant.
    pub fn is_relevant(&self, category: ProviderCategory) -> bool {
        self.per_category_relevance
            .get(&category)
            .map(|r| r.relevant)
            .unwrap_or(true)
    }

    pub fn location_key(&self) -> String {
        self.city
            .clone()
            .or_else(|| self.state.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn state_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z]{2})\b").expect("state regex"))
}

fn city_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([^,]+),\s*[A-Z]{2}\b").expect("city regex"))
}

fn zip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{5}(?:-\d{4})?)\b").expect("zip regex"))
}

fn is_us_state(code: &str) -> bool {
    US_STATES.contains(&code)
}

/// Picks the last valid state code in the address, so street abbreviations
/// like "NE" in "12 NE Main St, Portland, OR" don't win over the real state.
fn extract_state(record: &BusinessRecord, address: &str) -> Option<String> {
    if let Some(state) = record.state.as_deref() {
        let state = state.trim().to_uppercase();
        if is_us_state(&state) {
            return Some(state);
        }
    }

    state_regex()
        .captures_iter(address)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|code| is_us_state(code))
        .last()
        .map(str::to_string)
}

fn extract_city(address: &str) -> Option<String> {
    city_regex()
        .captures_iter(address)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|city| !city.is_empty())
}

fn extract_zip(address: &str) -> Option<String> {
    zip_regex()
        .captures_iter(address)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn city_in(city: &str, list: &[&str]) -> bool {
    let city = city.to_lowercase();
    list.iter().any(|known| city.contains(&known.to_lowercase()))
}

fn is_high_population_zip(zip: &str) -> bool {
    matches!(zip.chars().next(), Some('0' | '1' | '2' | '9'))
}

fn urbanization_for(city: Option<&str>, zip: Option<&str>) -> UrbanizationLevel {
    // The ZIP only refines a parsed but unlisted city; a ZIP alone stays unknown.
    let Some(city) = city else {
        return UrbanizationLevel::Unknown;
    };

    if city_in(city, &METROPOLITAN_CITIES) {
        UrbanizationLevel::Metropolitan
    } else if city_in(city, &MAJOR_CITIES) {
        UrbanizationLevel::MajorCity
    } else if zip.is_some_and(is_high_population_zip) {
        UrbanizationLevel::Suburban
    } else {
        UrbanizationLevel::SmallTown
    }
}

fn region_for(state: Option<&str>) -> Region {
    state
        .and_then(|state| {
            REGIONS
                .iter()
                .find(|(_, states)| states.contains(&state))
                .map(|(region, _)| *region)
        })
        .unwrap_or(Region::Other)
}

fn chamber_network_for(city: Option<&str>) -> ChamberNetworkLevel {
    match city {
        None => ChamberNetworkLevel::Unknown,
        Some(city) if city_in(city, &METROPOLITAN_CITIES) => ChamberNetworkLevel::Metropolitan,
        Some(city) if city_in(city, &MAJOR_CITIES) => ChamberNetworkLevel::MajorCities,
        Some(city) if city_in(city, &STATE_CAPITALS) => ChamberNetworkLevel::StateCapitals,
        Some(_) => ChamberNetworkLevel::Local,
    }
}

fn density_for(urbanization: UrbanizationLevel) -> Level {
    match urbanization {
        UrbanizationLevel::Metropolitan | UrbanizationLevel::MajorCity => Level::High,
        UrbanizationLevel::Suburban => Level::Medium,
        UrbanizationLevel::SmallTown | UrbanizationLevel::Unknown => Level::Low,
    }
}

fn maturity_for(urbanization: UrbanizationLevel) -> Level {
    match urbanization {
        UrbanizationLevel::Metropolitan => Level::High,
        UrbanizationLevel::SmallTown => Level::Low,
        _ => Level::Medium,
    }
}

fn licensing_for(state: Option<&str>) -> Option<LicensingAuthorities> {
    state
        .filter(|state| LICENSING_STATES.contains(state))
        .map(|_| LicensingAuthorities {
            cpa: true,
            medical: true,
            legal: true,
            engineering: true,
        })
}

fn chamber_relevance(network: ChamberNetworkLevel, density: Level) -> CategoryRelevance {
    let mut confidence: f64 = match network {
        ChamberNetworkLevel::Metropolitan => 0.9,
        ChamberNetworkLevel::MajorCities => 0.8,
        ChamberNetworkLevel::StateCapitals => 0.7,
        _ => 0.5,
    };

    match density {
        Level::High => confidence = (confidence + 0.1).min(0.95),
        Level::Low => confidence = (confidence - 0.2).max(0.2),
        Level::Medium => {}
    }

    CategoryRelevance {
        relevant: confidence > CHAMBER_THRESHOLD,
        confidence,
        reason: format!(
            "{} area with {} business density",
            network.as_str(),
            density.as_str()
        ),
    }
}

fn apollo_relevance(urbanization: UrbanizationLevel, maturity: Level) -> CategoryRelevance {
    let coverage = density_for(urbanization);
    let mut confidence: f64 = match coverage {
        Level::High => 0.9,
        Level::Medium => 0.6,
        Level::Low => 0.3,
    };
    if maturity == Level::High {
        confidence = (confidence + 0.1).min(0.95);
    }

    CategoryRelevance {
        relevant: confidence > APOLLO_THRESHOLD,
        confidence,
        reason: format!(
            "{} premium data coverage in {} area",
            coverage.as_str(),
            urbanization.as_str()
        ),
    }
}

fn association_relevance(state: Option<&str>, coverage: &AssociationCoverage) -> CategoryRelevance {
    let (level, confidence) = match state {
        Some(s) if coverage.strong.contains(&s) => ("strong", 0.9),
        Some(s) if coverage.moderate.contains(&s) => ("moderate", 0.6),
        Some(s) if coverage.limited.contains(&s) => ("limited", 0.3),
        _ => ("unknown", 0.1),
    };

    CategoryRelevance {
        relevant: confidence > ASSOCIATION_THRESHOLD,
        confidence,
        reason: format!(
            "{} association presence in {}",
            level,
            state.unwrap_or("unknown state")
        ),
    }
}

fn licensing_relevance(
    state: Option<&str>,
    licensing: Option<&LicensingAuthorities>,
) -> CategoryRelevance {
    match (state, licensing) {
        (Some(state), Some(_)) => CategoryRelevance {
            relevant: true,
            confidence: 0.9,
            reason: format!("{} has comprehensive professional licensing", state),
        },
        _ => CategoryRelevance {
            relevant: false,
            confidence: 0.0,
            reason: "No state licensing authority data available".to_string(),
        },
    }
}

/// Builds the geographic context for a record.
///
/// Parsing is best-effort: any field that can't be found is `None`, never an error.
pub fn analyze_location(record: &BusinessRecord) -> GeographicContext {
    let address = record.address.as_deref().unwrap_or("");

    let state = extract_state(record, address);
    let city = extract_city(address);
    let zip_code = extract_zip(address);

    let urbanization_level = urbanization_for(city.as_deref(), zip_code.as_deref());
    let region = region_for(state.as_deref());
    let chamber_network_level = chamber_network_for(city.as_deref());
    let business_density = density_for(urbanization_level);
    let business_maturity = maturity_for(urbanization_level);
    let licensing = licensing_for(state.as_deref());

    let mut per_category_relevance = BTreeMap::new();
    per_category_relevance.insert(
        ProviderCategory::Chamber,
        chamber_relevance(chamber_network_level, business_density),
    );
    per_category_relevance.insert(
        ProviderCategory::Apollo,
        apollo_relevance(urbanization_level, business_maturity),
    );
    per_category_relevance.insert(
        ProviderCategory::SpaAssociation,
        association_relevance(state.as_deref(), &SPA_COVERAGE),
    );
    per_category_relevance.insert(
        ProviderCategory::BeautyAssociation,
        association_relevance(state.as_deref(), &BEAUTY_COVERAGE),
    );
    per_category_relevance.insert(
        ProviderCategory::CpaLicensing,
        licensing_relevance(state.as_deref(), licensing.as_ref()),
    );

    GeographicContext {
        state,
        city,
        zip_code,
        urbanization_level,
        region,
        chamber_network_level,
        business_density,
        business_maturity,
        licensing,
        per_category_relevance,
    }
}
