use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderCircuitBreaker};
use crate::errors::AppError;
use crate::providers::{Provider, ProviderResponse, StageRequest};
use crate::stages::ProviderKind;
use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use serde_json::Value;
use std::time::Duration;

/// Edge function backing a provider kind, if it is served by the gateway.
pub fn gateway_function(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::Hunter => Some("enrichment-hunter"),
        ProviderKind::Cobalt => Some("enrichment-cobalt"),
        ProviderKind::BusinessLicense => Some("enrichment-business-license"),
        ProviderKind::PeopleDataLabs => Some("enrichment-pdl"),
        ProviderKind::NeverBounce => Some("enrichment-neverbounce"),
        ProviderKind::Apollo => Some("enrichment-apollo"),
        ProviderKind::Validation | ProviderKind::Chamber | ProviderKind::TradeAssociation => None,
    }
}

fn provider_name(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Hunter => "hunter_io",
        ProviderKind::Cobalt => "cobalt_sos",
        ProviderKind::BusinessLicense => "state_license",
        ProviderKind::PeopleDataLabs => "people_data_labs",
        ProviderKind::NeverBounce => "neverbounce",
        ProviderKind::Apollo => "apollo",
        ProviderKind::Validation => "basic_validation",
        ProviderKind::Chamber => "chamber_directory",
        ProviderKind::TradeAssociation => "trade_association",
    }
}

/// Client for one enrichment edge function behind the provider gateway.
///
/// Every call goes through a per-provider circuit breaker.
#[derive(Clone)]
pub struct GatewayProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
    kind: ProviderKind,
    function: &'static str,
    breaker: ProviderCircuitBreaker,
}

impl GatewayProvider {
    /// Creates a new `GatewayProvider`.
    ///
    /// # Arguments
    ///
    /// * `kind` - Provider served by this client; must map to an edge function.
    /// * `base_url` - The base URL of the provider gateway.
    /// * `token` - Bearer token for the gateway.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        kind: ProviderKind,
        base_url: String,
        token: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let function = gateway_function(kind).ok_or_else(|| {
            AppError::InternalError(format!("{:?} is not served by the provider gateway", kind))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create gateway client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            kind,
            function,
            breaker: create_provider_circuit_breaker(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/functions/v1/{}", self.base_url, self.function)
    }

    async fn post(&self, request: &StageRequest) -> Result<ProviderResponse, AppError> {
        let url = self.endpoint();
        tracing::debug!("Calling {} for '{}': {}", self.function, request.business_name, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(AppError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "{} returned {}: {}",
                self.function, status, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse {} response: {}", self.function, e))
        })?;

        Ok(parse_envelope(body, status.as_u16()))
    }
}

/// Reads the gateway envelope `{success, data, cost, error}`. A body without
/// `data` is itself the payload.
pub fn parse_envelope(body: Value, status: u16) -> ProviderResponse {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
    let cost = body.get("cost").and_then(Value::as_f64);
    let error = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = if body.get("data").is_some() {
        body.get("data").filter(|d| !d.is_null()).cloned()
    } else {
        Some(body)
    };

    ProviderResponse {
        success,
        data,
        cost,
        error,
        status,
    }
}

#[async_trait]
impl Provider for GatewayProvider {
    fn name(&self) -> &str {
        provider_name(self.kind)
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn invoke(&self, request: &StageRequest) -> Result<ProviderResponse, AppError> {
        match self.breaker.call(self.post(request)).await {
            Ok(response) => Ok(response),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("⚠ Circuit open for {}, rejecting call", self.function);
                Err(AppError::ExternalApiError(format!(
                    "{} circuit breaker is open",
                    self.function
                )))
            }
        }
    }
}
