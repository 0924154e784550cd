//! Confidence score for an enriched record.

use crate::models::EnrichedData;

const BASE_SCORE: u32 = 40;

/// Scores the enriched data on a 0-100 scale with fixed additive rules.
///
/// Pure: depends only on which fields are present.
pub fn confidence_score(data: &EnrichedData) -> u8 {
    let mut score = BASE_SCORE;

    if let Some(company) = &data.company_info {
        score += 15;
        if company.industry.is_some() && company.size.is_some() {
            score += 5;
        }
    }

    if !data.emails.is_empty() {
        score += 10;
        if data.emails.iter().any(|e| e.verified) {
            score += 15;
        }
    }

    if !data.executive_contacts.is_empty() {
        score += 5;
    }

    if data.compliance_data.is_some() {
        score += 5;
    }

    if let Some(sos) = &data.secretary_of_state {
        score += 10;
        if sos.good_standing == Some(true) {
            score += 5;
        }
    }

    score.min(100) as u8
}
