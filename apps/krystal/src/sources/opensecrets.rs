//! # OpenSecrets Client
//!
//! Campaign funding and lobbying totals. The key travels as the `apikey`
//! query parameter; responses wrap every record in `@attributes`.

use super::{Auth, ClientOptions, HttpSource, SourceError, degrade};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const OPENSECRETS_BASE_URL: &str = "https://www.opensecrets.org/api";

/// Election cycle used when none is given.
pub const DEFAULT_CYCLE: &str = "2024";

// =============================================================================
// RECORDS
// =============================================================================

/// One contributor to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub amount: u64,
}

/// Money raised by a candidate in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFunding {
    pub candidate_id: String,
    pub cycle: String,
    pub total_raised: u64,
    pub top_contributors: Vec<Contributor>,
}

/// Lobbying and contribution totals of an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub org_id: String,
    pub name: String,
    pub total_lobbying: u64,
    pub total_contributions: u64,
}

// =============================================================================
// CLIENT
// =============================================================================

/// OpenSecrets API client.
#[derive(Debug, Clone)]
pub struct OpenSecretsClient {
    api_key: Option<String>,
    source: HttpSource,
}

impl OpenSecretsClient {
    #[must_use]
    pub fn new(api_key: Option<String>, options: &ClientOptions) -> Self {
        Self::with_base_url(api_key, OPENSECRETS_BASE_URL, options)
    }

    #[must_use]
    pub fn with_base_url(api_key: Option<String>, base_url: &str, options: &ClientOptions) -> Self {
        let auth = Auth::Query("apikey", api_key.clone().unwrap_or_default());
        Self {
            api_key,
            source: HttpSource::new(base_url, auth, options),
        }
    }

    /// Whether calls go to the live service.
    #[must_use]
    pub fn is_api_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Funding of a candidate in an election cycle.
    pub async fn get_candidate_funding(
        &self,
        candidate_id: &str,
        cycle: &str,
    ) -> Option<CandidateFunding> {
        if !self.is_api_available() {
            return Some(fixture_funding(candidate_id, cycle));
        }

        match self.live_funding(candidate_id, cycle).await {
            Ok(funding) => Some(funding),
            Err(e) => {
                degrade("opensecrets", "get_candidate_funding", &e);
                None
            }
        }
    }

    async fn live_funding(
        &self,
        candidate_id: &str,
        cycle: &str,
    ) -> Result<CandidateFunding, SourceError> {
        let summary = self.call("candSummary", candidate_id, cycle).await?;
        let contributors = self.call("candContrib", candidate_id, cycle).await?;
        parse_funding(candidate_id, cycle, &summary, &contributors)
    }

    /// Lobbying and contribution totals of an organization.
    pub async fn get_organization_summary(&self, org_id: &str) -> Option<OrganizationSummary> {
        if !self.is_api_available() {
            return Some(fixture_summary(org_id));
        }

        let params = [
            ("method", "orgSummary".to_string()),
            ("id", org_id.to_string()),
            ("output", "json".to_string()),
        ];
        let result = self
            .source
            .get_json("/", &params)
            .await
            .and_then(|body| parse_organization(org_id, &body));
        match result {
            Ok(summary) => Some(summary),
            Err(e) => {
                degrade("opensecrets", "get_organization_summary", &e);
                None
            }
        }
    }

    async fn call(&self, method: &str, cid: &str, cycle: &str) -> Result<Value, SourceError> {
        let params = [
            ("method", method.to_string()),
            ("cid", cid.to_string()),
            ("cycle", cycle.to_string()),
            ("output", "json".to_string()),
        ];
        self.source.get_json("/", &params).await
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

fn attributes(value: &Value) -> Option<&Value> {
    value.get("@attributes")
}

/// Dollar amounts arrive as numbers or numeric strings.
fn amount(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0).round() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.max(0.0).round() as u64)
            .unwrap_or(0),
        _ => 0,
    }
}

fn missing(what: &str) -> SourceError {
    SourceError::ParseError(format!("missing {}", what))
}

pub(crate) fn parse_funding(
    candidate_id: &str,
    cycle: &str,
    summary: &Value,
    contributors: &Value,
) -> Result<CandidateFunding, SourceError> {
    let summary = summary
        .pointer("/response/summary")
        .and_then(attributes)
        .ok_or_else(|| missing("candidate summary"))?;

    // a single contributor is an object rather than a one-element array
    let records = match contributors.pointer("/response/contributors/contributor") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };
    let top_contributors = records
        .into_iter()
        .filter_map(attributes)
        .map(|attrs| Contributor {
            name: attrs
                .get("org_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            amount: amount(attrs.get("total")),
        })
        .collect();

    Ok(CandidateFunding {
        candidate_id: candidate_id.to_string(),
        cycle: cycle.to_string(),
        total_raised: amount(summary.get("total")),
        top_contributors,
    })
}

pub(crate) fn parse_organization(
    org_id: &str,
    body: &Value,
) -> Result<OrganizationSummary, SourceError> {
    let attrs = body
        .pointer("/response/organization")
        .and_then(attributes)
        .ok_or_else(|| missing("organization"))?;

    Ok(OrganizationSummary {
        org_id: org_id.to_string(),
        name: attrs
            .get("orgname")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        total_lobbying: amount(attrs.get("lobbying")),
        total_contributions: amount(attrs.get("total")),
    })
}

// =============================================================================
// FIXTURES
// =============================================================================

fn fixture_funding(candidate_id: &str, cycle: &str) -> CandidateFunding {
    CandidateFunding {
        candidate_id: candidate_id.to_string(),
        cycle: cycle.to_string(),
        total_raised: 2_500_000,
        top_contributors: vec![
            Contributor {
                name: "Tech Industry".to_string(),
                amount: 500_000,
            },
            Contributor {
                name: "Finance Industry".to_string(),
                amount: 350_000,
            },
        ],
    }
}

fn fixture_summary(org_id: &str) -> OrganizationSummary {
    OrganizationSummary {
        org_id: org_id.to_string(),
        name: "Example Organization".to_string(),
        total_lobbying: 1_500_000,
        total_contributions: 800_000,
    }
}

// =============================================================================
// TESTS
// =============================================================================
