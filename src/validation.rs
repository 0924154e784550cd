//! Free local validation stage.

use crate::errors::AppError;
use crate::models::ValidationSummary;
use crate::providers::{Provider, ProviderResponse, StageRequest};
use crate::stages::ProviderKind;
use async_trait::async_trait;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use std::sync::OnceLock;

const FREE_MAIL_DOMAINS: [&str; 10] = [
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "live.com",
    "msn.com",
    "protonmail.com",
    "comcast.net",
];

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // RFC 5322 simplified: local@domain.tld
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .expect("email regex")
    })
}

/// Validate email address
///
/// Rejects malformed addresses and obvious placeholders (runs of repeated
/// or sequential digits).
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let fake_patterns = ["999999", "111111", "000000", "123456789"];
    if let Some(pattern) = fake_patterns.iter().find(|p| email.contains(*p)) {
        tracing::warn!(
            "❌ Invalid email detected (fake pattern '{}'): {}",
            pattern,
            email
        );
        return false;
    }

    email_regex().is_match(email)
}

/// Validate and normalize a US phone number.
///
/// Returns the E.164 form (+12127365000) when the number is valid.
pub fn validate_us_phone(raw: &str) -> Option<String> {
    if raw.trim().is_empty() || raw.len() < 7 {
        return None;
    }

    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) if phonenumber::is_valid(&number) => {
            let formatted = number.format().mode(Mode::E164).to_string();
            tracing::debug!("✓ Valid US phone: {} → {}", raw, formatted);
            Some(formatted)
        }
        Ok(_) => {
            tracing::warn!("❌ Invalid US phone number: {}", raw);
            None
        }
        Err(e) => {
            tracing::warn!("❌ Failed to parse US phone '{}': {:?}", raw, e);
            None
        }
    }
}

pub fn is_free_mail_domain(domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    FREE_MAIL_DOMAINS.contains(&domain.as_str())
}

/// Normalizes identity fields without any network access.
pub struct BasicValidationProvider;

impl BasicValidationProvider {
    pub fn validate(request: &StageRequest) -> ValidationSummary {
        let mut summary = ValidationSummary::default();

        if let Some(domain) = request.domain.as_deref() {
            summary.free_mail_domain = is_free_mail_domain(domain);
            summary.normalized_domain = Some(domain.to_string());
            summary.checks.push("domain".to_string());
        }

        if let Some(phone) = request.phone.as_deref() {
            let normalized = validate_us_phone(phone);
            summary.phone_valid = Some(normalized.is_some());
            summary.normalized_phone = normalized;
            summary.checks.push("phone".to_string());
        }

        summary
    }
}

#[async_trait]
impl Provider for BasicValidationProvider {
    fn name(&self) -> &str {
        "basic_validation"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Validation
    }

    fn estimate_cost(&self, _request: &StageRequest) -> f64 {
        0.0
    }

    async fn invoke(&self, request: &StageRequest) -> Result<ProviderResponse, AppError> {
        let summary = Self::validate(request);
        let data = serde_json::to_value(&summary)
            .map_err(|e| AppError::InternalError(format!("validation summary: {}", e)))?;
        Ok(ProviderResponse::ok(data).with_cost(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessRecord;
    use crate::stages::StageId;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("owner@sunrisespa.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("1199999999333@gmail.com"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn test_validate_us_phone() {
        assert_eq!(
            validate_us_phone("(212) 736-5000").as_deref(),
            Some("+12127365000")
        );
        assert_eq!(validate_us_phone("12"), None);
    }

    #[test]
    fn test_free_mail_domain() {
        assert!(is_free_mail_domain("Gmail.com"));
        assert!(!is_free_mail_domain("sunrisespa.com"));
    }

    #[tokio::test]
    async fn test_validation_provider_summary() {
        let mut record = BusinessRecord::new("Sunrise Spa", "1 Ocean Ave, San Diego, CA 92101");
        record.website = Some("https://www.sunrisespa.com".to_string());
        record.phone = Some("not a phone".to_string());
        let request = StageRequest::new(StageId::BasicValidation, "basic_validation", &record);

        let response = BasicValidationProvider.invoke(&request).await.unwrap();
        assert!(response.success);
        assert_eq!(response.cost, Some(0.0));

        let summary: ValidationSummary = serde_json::from_value(response.data.unwrap()).unwrap();
        assert_eq!(summary.normalized_domain.as_deref(), Some("sunrisespa.com"));
        assert_eq!(summary.phone_valid, Some(false));
        assert!(!summary.free_mail_domain);
    }
}
