//! Reqwest-based client for the gateway's payment-session (Snap) API.
//!
//! Opening a session returns a token and a redirect URL the buyer is sent to.
//! Settlement itself arrives later through the notification webhook.

use crate::client::{ChargeRequest, PaymentGateway, PaymentSession};
use crate::config::{Secret, TicketgateConfig};
use crate::TicketgateError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SNAP_TRANSACTIONS_PATH: &str = "/snap/v1/transactions";

/// Successful Snap response.
#[derive(Debug, Clone, Deserialize)]
struct SnapSessionResponse {
    token: String,
    redirect_url: String,
}

/// Snap error response.
#[derive(Debug, Clone, Deserialize)]
struct SnapErrorResponse {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Snap HTTP client.
pub struct SnapClient {
    client: Client,
    server_key: Secret,
    base_url: String,
    user_agent: String,
}

impl SnapClient {
    /// Create a Snap client from config.
    pub fn new(config: &TicketgateConfig) -> Result<Self, TicketgateError> {
        Self::with_base_url(config, config.gateway_environment.snap_base_url().to_string())
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(
        config: &TicketgateConfig,
        base_url: String,
    ) -> Result<Self, TicketgateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TicketgateError::GatewayTransport(format!("Failed to create client: {}", e))
            })?;

        Ok(Self {
            client,
            server_key: config.gateway_server_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: build_user_agent(),
        })
    }

    /// Full URL of the session endpoint.
    pub fn sessions_url(&self) -> String {
        format!("{}{}", self.base_url, SNAP_TRANSACTIONS_PATH)
    }
}

#[async_trait]
impl PaymentGateway for SnapClient {
    async fn open_session(
        &self,
        request: &ChargeRequest,
    ) -> Result<PaymentSession, TicketgateError> {
        let response = self
            .client
            .post(self.sessions_url())
            .basic_auth(self.server_key.expose(), None::<&str>)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&build_session_body(request))
            .send()
            .await
            .map_err(|e| TicketgateError::GatewayTransport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TicketgateError::GatewayTransport(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<SnapErrorResponse>(&body)
                .map(|e| e.error_messages.join("; "))
                .unwrap_or_default();
            return Err(TicketgateError::ProtocolError(format!(
                "Snap returned {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: SnapSessionResponse = serde_json::from_slice(&body)
            .map_err(|e| TicketgateError::ProtocolError(format!("Parse error: {}", e)))?;

        tracing::debug!(order_id = %request.order_id, "payment session opened");

        Ok(PaymentSession {
            token: parsed.token,
            redirect_url: parsed.redirect_url,
        })
    }
}

/// Build the Snap session request body.
pub fn build_session_body(request: &ChargeRequest) -> serde_json::Value {
    serde_json::json!({
        "transaction_details": {
            "order_id": request.order_id,
            "gross_amount": request.gross_amount.minor() / 100,
        },
        "customer_details": {
            "first_name": request.customer.full_name,
            "email": request.customer.email,
            "phone": request.customer.phone,
        },
        "enabled_payments": [request.payment_type.as_str()],
    })
}

/// Build a User-Agent string.
///
/// Format: `ticketgate/<version>`
pub fn build_user_agent() -> String {
    format!("ticketgate/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayEnvironment;
    use crate::domain::{Contact, GrossAmount, PaymentType};
    use std::path::PathBuf;

    fn test_config(env: GatewayEnvironment) -> TicketgateConfig {
        TicketgateConfig {
            token_secret: Secret::new("token-secret"),
            token_issuer: "ticketgate".to_string(),
            token_ttl: Duration::from_secs(3600),
            gateway_server_key: Secret::new("SB-Mid-server-key"),
            gateway_environment: env,
            public_base_url: "https://tickets.example.com".to_string(),
            artifact_dir: PathBuf::from("/tmp/ticketgate"),
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    fn charge() -> ChargeRequest {
        ChargeRequest {
            order_id: "TG-123".to_string(),
            gross_amount: GrossAmount::from_units(150_000).unwrap(),
            payment_type: PaymentType::BankTransfer,
            customer: Contact {
                full_name: "Sari Wulandari".to_string(),
                email: "sari@example.com".to_string(),
                phone: Some("+628123456789".to_string()),
            },
        }
    }

    #[test]
    fn sandbox_url_by_default() {
        let client = SnapClient::new(&test_config(GatewayEnvironment::Sandbox)).unwrap();
        assert_eq!(
            client.sessions_url(),
            "https://app.sandbox.midtrans.com/snap/v1/transactions"
        );
    }

    #[test]
    fn production_url_when_configured() {
        let client = SnapClient::new(&test_config(GatewayEnvironment::Production)).unwrap();
        assert_eq!(
            client.sessions_url(),
            "https://app.midtrans.com/snap/v1/transactions"
        );
    }

    #[test]
    fn explicit_base_url_trailing_slash_trimmed() {
        let client = SnapClient::with_base_url(
            &test_config(GatewayEnvironment::Sandbox),
            "http://127.0.0.1:9000/".to_string(),
        )
        .unwrap();
        assert_eq!(client.sessions_url(), "http://127.0.0.1:9000/snap/v1/transactions");
    }

    #[test]
    fn session_body_uses_whole_units() {
        let body = build_session_body(&charge());
        assert_eq!(body["transaction_details"]["order_id"], "TG-123");
        assert_eq!(body["transaction_details"]["gross_amount"], 150_000);
        assert_eq!(body["customer_details"]["email"], "sari@example.com");
        assert_eq!(body["enabled_payments"][0], "bank_transfer");
    }

    #[test]
    fn user_agent_carries_version() {
        assert_eq!(
            build_user_agent(),
            format!("ticketgate/{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
