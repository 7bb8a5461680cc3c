//! Evolution API Client
//!
//! HTTP client for the WhatsApp messaging gateway. Every call carries the
//! `apikey` header from the stored gateway settings; instance names are used
//! as path segments.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{classify, error_from_response, Integration, IntegrationError};
use crate::storage::{GatewayConfig, Instance, InstanceStatus};

const SERVICE: &str = "messaging gateway";

/// Evolution API client
pub struct EvolutionClient {
    client: Client,
    config: GatewayConfig,
}

/// QR/pairing data returned when connecting an instance
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// Rendered QR image as a data URL
    #[serde(default)]
    pub base64: Option<String>,
    /// Raw QR string
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub pairing_code: Option<String>,
}

impl ConnectResponse {
    /// Preferred payload to show the user
    pub fn qr_payload(&self) -> Option<&str> {
        let present = |s: &&str| !s.is_empty();
        self.base64
            .as_deref()
            .filter(present)
            .or_else(|| self.code.as_deref().filter(present))
    }
}

/// Outcome of a sent message
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateInstanceResponse {
    #[serde(default)]
    qrcode: Option<ConnectResponse>,
}

#[derive(Debug, Deserialize)]
struct ConnectionStateResponse {
    instance: ConnectionState,
}

#[derive(Debug, Deserialize)]
struct ConnectionState {
    state: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceRequest<'a> {
    instance_name: &'a str,
    qrcode: bool,
    integration: &'a str,
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    number: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SetWebhookRequest<'a> {
    webhook: WebhookSettings<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookSettings<'a> {
    enabled: bool,
    url: &'a str,
    webhook_by_events: bool,
    events: &'a [&'a str],
}

/// Gateway events the CRM subscribes to
pub const WEBHOOK_EVENTS: &[&str] = &["QRCODE_UPDATED", "CONNECTION_UPDATE"];

impl EvolutionClient {
    /// Create a client sharing an existing HTTP connection pool
    pub fn new(client: Client, config: GatewayConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn instance_url(&self, action: &str, instance: &str) -> String {
        self.url(&format!("{}/{}", action, urlencoding::encode(instance)))
    }

    fn ensure_configured(&self) -> Result<(), IntegrationError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(IntegrationError::NotConfigured("Evolution API"))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, IntegrationError> {
        self.ensure_configured()?;

        let response = request
            .header("apikey", &self.config.api_key)
            .send()
            .await
            .map_err(|e| classify(e, SERVICE))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IntegrationError::InvalidResponse(e.to_string()))
    }

    /// Register a new instance on the gateway, returning its first QR if any
    pub async fn create_instance(&self, name: &str) -> Result<Option<ConnectResponse>, IntegrationError> {
        let body = CreateInstanceRequest {
            instance_name: name,
            qrcode: true,
            integration: "WHATSAPP-BAILEYS",
        };

        let response: CreateInstanceResponse = self
            .send_json(self.client.post(self.url("instance/create")).json(&body))
            .await?;

        tracing::info!(instance = %name, "Gateway instance created");
        Ok(response.qrcode)
    }

    /// Start pairing and fetch the QR code
    pub async fn connect(&self, name: &str) -> Result<ConnectResponse, IntegrationError> {
        self.send_json(self.client.get(self.instance_url("instance/connect", name)))
            .await
    }

    /// Current connection state, mapped onto the CRM's status values
    pub async fn connection_state(&self, name: &str) -> Result<InstanceStatus, IntegrationError> {
        let response: ConnectionStateResponse = self
            .send_json(self.client.get(self.instance_url("instance/connectionState", name)))
            .await?;

        InstanceStatus::from_gateway_state(&response.instance.state).ok_or_else(|| {
            IntegrationError::InvalidResponse(format!(
                "unknown connection state '{}'",
                response.instance.state
            ))
        })
    }

    pub async fn logout(&self, name: &str) -> Result<(), IntegrationError> {
        let _: Value = self
            .send_json(self.client.delete(self.instance_url("instance/logout", name)))
            .await?;
        Ok(())
    }

    pub async fn delete_instance(&self, name: &str) -> Result<(), IntegrationError> {
        let _: Value = self
            .send_json(self.client.delete(self.instance_url("instance/delete", name)))
            .await?;
        Ok(())
    }

    /// Send a plain text message from an instance
    pub async fn send_text(
        &self,
        name: &str,
        number: &str,
        text: &str,
    ) -> Result<SendReceipt, IntegrationError> {
        let body = SendTextRequest { number, text };
        let response: Value = self
            .send_json(
                self.client
                    .post(self.instance_url("message/sendText", name))
                    .json(&body),
            )
            .await?;

        Ok(SendReceipt {
            message_id: response
                .pointer("/key/id")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: response
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Point the instance's event webhook at the CRM
    pub async fn set_webhook(&self, name: &str, url: &str) -> Result<(), IntegrationError> {
        let body = SetWebhookRequest {
            webhook: WebhookSettings {
                enabled: true,
                url,
                webhook_by_events: false,
                events: WEBHOOK_EVENTS,
            },
        };
        let _: Value = self
            .send_json(
                self.client
                    .post(self.instance_url("webhook/set", name))
                    .json(&body),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Integration for EvolutionClient {
    fn name(&self) -> &str {
        "evolution"
    }

    fn description(&self) -> &str {
        "WhatsApp messaging gateway (Evolution API)"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn health_check(&self) -> Result<(), IntegrationError> {
        let _: Value = self.send_json(self.client.get(self.url(""))).await?;
        Ok(())
    }
}

/// Raw webhook body posted by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub instance: String,
    #[serde(default)]
    pub data: Value,
}

/// A gateway event relevant to instance state
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// A new pairing QR code is available
    Qr { instance: String, qr_code: String },
    /// Connection state changed
    Connection {
        instance: String,
        status: InstanceStatus,
        phone_number: Option<String>,
    },
    /// Anything else; acknowledged and ignored
    Ignored { instance: String, event: String },
}

impl WebhookPayload {
    /// Normalized event name: `QRCODE_UPDATED` and `qrcode.updated` match
    fn event_name(&self) -> String {
        self.event.trim().to_lowercase().replace('_', ".")
    }

    pub fn into_event(self) -> GatewayEvent {
        match self.event_name().as_str() {
            "qrcode.updated" => {
                let qr = self
                    .data
                    .pointer("/qrcode/base64")
                    .or_else(|| self.data.pointer("/qrcode/code"))
                    .or_else(|| self.data.get("base64"))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty());

                match qr {
                    Some(qr) => GatewayEvent::Qr {
                        qr_code: qr.to_string(),
                        instance: self.instance,
                    },
                    None => GatewayEvent::Ignored {
                        event: self.event,
                        instance: self.instance,
                    },
                }
            }
            "connection.update" => {
                let status = self
                    .data
                    .get("state")
                    .and_then(Value::as_str)
                    .and_then(InstanceStatus::from_gateway_state);

                let phone_number = self
                    .data
                    .get("wuid")
                    .and_then(Value::as_str)
                    .and_then(|wuid| wuid.split('@').next())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);

                match status {
                    Some(status) => GatewayEvent::Connection {
                        instance: self.instance,
                        status,
                        phone_number,
                    },
                    None => GatewayEvent::Ignored {
                        event: self.event,
                        instance: self.instance,
                    },
                }
            }
            _ => GatewayEvent::Ignored {
                event: self.event,
                instance: self.instance,
            },
        }
    }
}

impl GatewayEvent {
    pub fn instance(&self) -> &str {
        match self {
            GatewayEvent::Qr { instance, .. }
            | GatewayEvent::Connection { instance, .. }
            | GatewayEvent::Ignored { instance, .. } => instance,
        }
    }

    /// Apply the event to the local instance record
    pub fn apply(&self, instance: &mut Instance) {
        match self {
            GatewayEvent::Qr { qr_code, .. } => instance.set_qr(qr_code.clone()),
            GatewayEvent::Connection {
                status,
                phone_number,
                ..
            } => {
                instance.set_status(*status);
                if let Some(phone) = phone_number {
                    instance.set_phone_number(phone.clone());
                }
            }
            GatewayEvent::Ignored { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> WebhookPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_qr_event() {
        let event = payload(
            r#"{"event":"qrcode.updated","instance":"sales","data":{"qrcode":{"base64":"data:image/png;base64,AAA","code":"2@xyz"}}}"#,
        )
        .into_event();

        assert_eq!(
            event,
            GatewayEvent::Qr {
                instance: "sales".to_string(),
                qr_code: "data:image/png;base64,AAA".to_string(),
            }
        );
    }

    #[test]
    fn test_connection_event_uppercase_name() {
        let event = payload(
            r#"{"event":"CONNECTION_UPDATE","instance":"sales","data":{"state":"open","wuid":"5511999990000@s.whatsapp.net"}}"#,
        )
        .into_event();

        assert_eq!(
            event,
            GatewayEvent::Connection {
                instance: "sales".to_string(),
                status: InstanceStatus::Connected,
                phone_number: Some("5511999990000".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_event_ignored() {
        let event =
            payload(r#"{"event":"messages.upsert","instance":"sales","data":{}}"#).into_event();
        assert!(matches!(event, GatewayEvent::Ignored { .. }));
        assert_eq!(event.instance(), "sales");
    }

    #[test]
    fn test_apply_sequence() {
        let mut instance = Instance::new("sales", None).unwrap();

        GatewayEvent::Qr {
            instance: "sales".to_string(),
            qr_code: "QR".to_string(),
        }
        .apply(&mut instance);
        assert_eq!(instance.status, InstanceStatus::QrReady);

        GatewayEvent::Connection {
            instance: "sales".to_string(),
            status: InstanceStatus::Connected,
            phone_number: Some("5511".to_string()),
        }
        .apply(&mut instance);
        assert_eq!(instance.status, InstanceStatus::Connected);
        assert_eq!(instance.qr_code, None);
        assert_eq!(instance.phone_number.as_deref(), Some("5511"));
    }

    #[test]
    fn test_connect_response_payload() {
        let response: ConnectResponse =
            serde_json::from_str(r#"{"pairingCode":"WZYEH1YY","code":"2@abc","count":1}"#).unwrap();
        assert_eq!(response.qr_payload(), Some("2@abc"));
        assert_eq!(response.pairing_code.as_deref(), Some("WZYEH1YY"));
    }

    #[test]
    fn test_empty_image_falls_back_to_code() {
        let response: ConnectResponse =
            serde_json::from_str(r#"{"base64":"","code":"2@abc"}"#).unwrap();
        assert_eq!(response.qr_payload(), Some("2@abc"));

        let response: ConnectResponse =
            serde_json::from_str(r#"{"base64":"data:image/png;base64,AAA","code":"2@abc"}"#)
                .unwrap();
        assert_eq!(response.qr_payload(), Some("data:image/png;base64,AAA"));

        let response: ConnectResponse = serde_json::from_str(r#"{"base64":"","code":""}"#).unwrap();
        assert_eq!(response.qr_payload(), None);
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses_calls() {
        let client = EvolutionClient::new(
            Client::new(),
            GatewayConfig {
                api_key: String::new(),
                ..GatewayConfig::default()
            },
        );
        let result = client.connect("sales").await;
        assert!(matches!(result, Err(IntegrationError::NotConfigured(_))));
    }
}
