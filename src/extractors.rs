//! Typed extraction of provider payloads.
//!
//! Each provider returns loosely shaped JSON. Every function here probes the
//! fields that provider is known to use and returns a normalized record, or
//! `None` when nothing usable is present. Raw payloads are never merged.

use crate::models::{
    AssociationMembership, BusinessLicenseRecord, CompanyInfo, ComplianceData, ComplianceFinding,
    DiscoveredEmail, ExecutiveContact, PersonContact, SecretaryOfStateRecord,
};
use crate::stages::{NEVERBOUNCE_COST_PER_EMAIL, PDL_COMPANY_COST, PDL_PERSON_COST};
use crate::validation::is_valid_email;
use serde_json::Value;

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| str_field(value, key))
}

/// String field, or the first string of an array field.
fn str_or_first(value: &Value, key: &str) -> Option<String> {
    str_field(value, key).or_else(|| {
        value
            .get(key)
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| value.get(key).and_then(Value::as_array))
}

// ============ Hunter ============

/// Emails from a domain search. Invalid or placeholder addresses are dropped.
pub fn hunter_emails(data: &Value) -> Option<Vec<DiscoveredEmail>> {
    let entries = array(data, &["emails"])?;

    let emails: Vec<DiscoveredEmail> = entries
        .iter()
        .filter_map(|entry| {
            let email = first_str(entry, &["value", "email"])?;
            if !is_valid_email(&email) {
                return None;
            }
            Some(DiscoveredEmail {
                email: email.to_lowercase(),
                confidence: entry
                    .get("confidence")
                    .and_then(Value::as_u64)
                    .map(|c| c.min(100) as u8),
                verified: false,
                verification_result: None,
                kind: str_field(entry, "type"),
                first_name: first_str(entry, &["first_name", "firstName"]),
                last_name: first_str(entry, &["last_name", "lastName"]),
                position: str_field(entry, "position"),
            })
        })
        .collect();

    if emails.is_empty() {
        None
    } else {
        Some(emails)
    }
}

// ============ NeverBounce ============

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub email: String,
    pub result: String,
}

pub fn neverbounce_results(data: &Value) -> Option<Vec<VerificationResult>> {
    let results: Vec<VerificationResult> = array(data, &["results"])?
        .iter()
        .filter_map(|entry| {
            Some(VerificationResult {
                email: str_field(entry, "email")?.to_lowercase(),
                result: str_field(entry, "result")?.to_lowercase(),
            })
        })
        .collect();

    if results.is_empty() {
        None
    } else {
        Some(results)
    }
}

/// Cost implied by the number of verification results returned.
pub fn neverbounce_cost(results: &[VerificationResult]) -> f64 {
    NEVERBOUNCE_COST_PER_EMAIL * results.len() as f64
}

/// Marks discovered emails as verified where the result is `valid`.
pub fn apply_verification(emails: &mut [DiscoveredEmail], results: &[VerificationResult]) {
    for email in emails.iter_mut() {
        if let Some(result) = results
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(&email.email))
        {
            email.verified = result.result == "valid";
            email.verification_result = Some(result.result.clone());
        }
    }
}

// ============ Cobalt SOS ============

pub fn secretary_of_state(
    data: &Value,
    business_name: &str,
    state: Option<&str>,
) -> Option<SecretaryOfStateRecord> {
    let entity = data
        .get("entities")
        .and_then(Value::as_array)
        .and_then(|entities| entities.first())
        .or_else(|| data.get("entity"))
        .filter(|e| e.is_object());

    let status = entity
        .and_then(|e| str_field(e, "status"))
        .or_else(|| str_field(data, "status"));
    let registry_number = entity
        .and_then(|e| first_str(e, &["registrationNumber", "id"]))
        .or_else(|| str_field(data, "registryNumber"));

    if entity.is_none() && status.is_none() && registry_number.is_none() {
        return None;
    }

    let good_standing = entity
        .and_then(|e| e.get("goodStanding"))
        .and_then(Value::as_bool)
        .or_else(|| {
            status
                .as_deref()
                .map(|s| s.to_lowercase().contains("good"))
        });

    Some(SecretaryOfStateRecord {
        entity_name: entity
            .and_then(|e| str_field(e, "name"))
            .unwrap_or_else(|| business_name.to_string()),
        registry_number,
        status,
        state: state.map(str::to_string),
        good_standing,
        source: "cobalt_intelligence".to_string(),
    })
}

pub fn compliance_data(data: &Value) -> Option<ComplianceData> {
    let compliance = data.get("compliance").filter(|c| c.is_object())?;

    let findings = array(compliance, &["findings"])
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(ComplianceFinding {
                        kind: str_field(item, "type")?,
                        description: str_field(item, "description").unwrap_or_default(),
                        severity: str_field(item, "severity")
                            .unwrap_or_else(|| "unknown".to_string()),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(ComplianceData {
        finra_check: compliance.get("finraCheck").and_then(Value::as_bool),
        sanctions_check: compliance.get("sanctionsCheck").and_then(Value::as_bool),
        risk_score: compliance.get("riskScore").and_then(Value::as_f64),
        findings,
    })
}

// ============ State license ============

#[derive(Debug, Clone, PartialEq)]
pub enum LicenseLookup {
    Found(BusinessLicenseRecord),
    NoMatch,
    Failed(String),
}

pub fn business_license(data: &Value) -> LicenseLookup {
    let records = array(data, &["records"]).filter(|r| !r.is_empty());

    let Some(primary) = records.and_then(|r| r.first()) else {
        let errors: Vec<String> = array(data, &["errors"])
            .map(|items| {
                items
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        return if errors.is_empty() {
            LicenseLookup::NoMatch
        } else {
            LicenseLookup::Failed(errors.join("; "))
        };
    };

    let status = str_field(primary, "status");
    let license_number = str_field(primary, "licenseNumber");
    let is_valid = match status.as_deref().map(str::to_lowercase) {
        Some(s) => !s.contains("inactive") && !s.contains("expired") && !s.contains("suspended"),
        None => license_number.is_some(),
    };

    LicenseLookup::Found(BusinessLicenseRecord {
        is_valid,
        license_number,
        status,
        expiration_date: str_field(primary, "expirationDate"),
        professional_type: str_field(primary, "professionalType"),
        source: str_field(primary, "source").unwrap_or_else(|| "state_license".to_string()),
    })
}

// ============ People Data Labs ============

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdlMatch {
    pub company: Option<CompanyInfo>,
    pub person: Option<PersonContact>,
    pub errors: Vec<String>,
}

impl PdlMatch {
    /// Cost implied by what actually matched.
    pub fn applied_cost(&self) -> f64 {
        let company = if self.company.is_some() { PDL_COMPANY_COST } else { 0.0 };
        let person = if self.person.is_some() { PDL_PERSON_COST } else { 0.0 };
        company + person
    }

    pub fn is_empty(&self) -> bool {
        self.company.is_none() && self.person.is_none()
    }
}

/// Section data when the section reports `enriched: true`.
fn enriched_section<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    let section = data.get(key)?;
    if section.get("enriched").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    section.get("data").filter(|d| d.is_object())
}

fn pdl_company(company: &Value, business_name: &str, website: Option<&str>) -> CompanyInfo {
    let industry = str_or_first(company, "industry").or_else(|| str_or_first(company, "naics"));
    let size = str_field(company, "employee_count_range")
        .or_else(|| {
            company
                .get("employee_count")
                .and_then(Value::as_i64)
                .map(|n| n.to_string())
        })
        .or_else(|| str_field(company, "size"));
    let founded = company
        .get("founded")
        .and_then(Value::as_i64)
        .or_else(|| company.get("year_founded").and_then(Value::as_i64));

    CompanyInfo {
        name: str_field(company, "name").unwrap_or_else(|| business_name.to_string()),
        industry,
        size,
        founded,
        revenue: str_or_first(company, "annual_revenue").or_else(|| str_or_first(company, "revenue")),
        website: str_field(company, "website").or_else(|| website.map(str::to_string)),
        description: str_field(company, "summary"),
        source: "people_data_labs".to_string(),
    }
}

fn pdl_person(person: &Value, likelihood: Option<f64>, business_name: &str) -> PersonContact {
    let name = first_str(person, &["full_name", "name"])
        .or_else(|| {
            let first = str_field(person, "first_name")?;
            let last = str_field(person, "last_name")?;
            Some(format!("{} {}", first, last))
        })
        .unwrap_or_else(|| business_name.to_string());

    let email = str_field(person, "work_email").or_else(|| {
        array(person, &["emails"])?
            .iter()
            .find_map(|entry| str_field(entry, "address"))
    });
    let phone = array(person, &["phone_numbers"])
        .and_then(|phones| phones.iter().find_map(|p| str_field(p, "number")));
    let linkedin = str_field(person, "linkedin_url").or_else(|| {
        array(person, &["profiles"])?.iter().find_map(|profile| {
            let network = str_field(profile, "network")?;
            if network.eq_ignore_ascii_case("linkedin") {
                str_field(profile, "url")
            } else {
                None
            }
        })
    });

    let likelihood = likelihood.or_else(|| person.get("likelihood").and_then(Value::as_f64));
    let confidence = likelihood
        .map(|l| (l * 100.0).round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0);

    PersonContact {
        name,
        title: str_field(person, "job_title").unwrap_or_else(|| "Executive".to_string()),
        email,
        phone,
        linkedin,
        confidence,
    }
}

pub fn people_data_labs(data: &Value, business_name: &str, website: Option<&str>) -> PdlMatch {
    let company = enriched_section(data, "company").map(|c| pdl_company(c, business_name, website));
    let likelihood = data
        .get("person")
        .and_then(|p| p.get("likelihood"))
        .and_then(Value::as_f64);
    let person =
        enriched_section(data, "person").map(|p| pdl_person(p, likelihood, business_name));
    let errors = array(data, &["errors"])
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    PdlMatch {
        company,
        person,
        errors,
    }
}

// ============ Apollo ============

pub fn executive_contacts(data: &Value) -> Option<Vec<ExecutiveContact>> {
    let contacts: Vec<ExecutiveContact> = array(data, &["contacts", "people"])?
        .iter()
        .filter_map(|entry| {
            let name = first_str(entry, &["name", "full_name"]).or_else(|| {
                let first = str_field(entry, "first_name")?;
                let last = str_field(entry, "last_name")?;
                Some(format!("{} {}", first, last))
            })?;
            Some(ExecutiveContact {
                name,
                title: str_field(entry, "title").unwrap_or_else(|| "Executive".to_string()),
                email: str_field(entry, "email"),
                phone: first_str(entry, &["phone", "phone_number"]),
                linkedin: first_str(entry, &["linkedin_url", "linkedin"]),
            })
        })
        .collect();

    if contacts.is_empty() {
        None
    } else {
        Some(contacts)
    }
}

// ============ Associations ============

pub fn association_membership(data: &Value, source: &str) -> Option<AssociationMembership> {
    let verified = data.get("verified").and_then(Value::as_bool)?;
    let memberships = array(data, &["chambers", "associations", "memberships"])
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .or_else(|| str_field(item, "name"))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(AssociationMembership {
        verified,
        memberships,
        membership_level: str_field(data, "membershipLevel"),
        source: source.to_string(),
    })
}
