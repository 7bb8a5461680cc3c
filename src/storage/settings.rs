//! Settings documents
//!
//! Flat records stored in the document store: notification switches and the
//! messaging-gateway connection settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::StorageError;

/// Document key of the messaging-gateway configuration
pub const GATEWAY_CONFIG_KEY: &str = "evolution-api-config";

/// Document key of the notification switches
pub const NOTIFICATION_SETTINGS_KEY: &str = "notification-settings";

/// Messaging-gateway connection settings as edited on the settings page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    #[serde(default)]
    pub webhook_url: String,
}

fn default_gateway_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_instance_name() -> String {
    "crm-whatsapp".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            api_key: String::new(),
            instance_name: default_instance_name(),
            webhook_url: String::new(),
        }
    }
}

impl GatewayConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Decode a stored document, taking the fields it omits from `base`
    pub fn overlay(base: &GatewayConfig, stored: &str) -> serde_json::Result<Self> {
        let mut merged = serde_json::to_value(base)?;
        let stored: serde_json::Value = serde_json::from_str(stored)?;
        if let (Some(target), serde_json::Value::Object(fields)) = (merged.as_object_mut(), stored) {
            target.extend(fields);
        }
        serde_json::from_value(merged)
    }
}

/// Identifies one notification switch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKey {
    EmailNotifications,
    WhatsappNotifications,
    NewCustomerAlerts,
    WorkflowAlerts,
    PaymentReminders,
    DailyReport,
    WeeklyReport,
}

impl NotificationKey {
    pub fn all() -> &'static [NotificationKey] {
        &[
            NotificationKey::EmailNotifications,
            NotificationKey::WhatsappNotifications,
            NotificationKey::NewCustomerAlerts,
            NotificationKey::WorkflowAlerts,
            NotificationKey::PaymentReminders,
            NotificationKey::DailyReport,
            NotificationKey::WeeklyReport,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKey::EmailNotifications => "email_notifications",
            NotificationKey::WhatsappNotifications => "whatsapp_notifications",
            NotificationKey::NewCustomerAlerts => "new_customer_alerts",
            NotificationKey::WorkflowAlerts => "workflow_alerts",
            NotificationKey::PaymentReminders => "payment_reminders",
            NotificationKey::DailyReport => "daily_report",
            NotificationKey::WeeklyReport => "weekly_report",
        }
    }
}

impl FromStr for NotificationKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKey::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StorageError::UnknownSetting(s.to_string()))
    }
}

/// Notification switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    #[serde(default = "enabled")]
    pub email_notifications: bool,
    #[serde(default = "enabled")]
    pub whatsapp_notifications: bool,
    #[serde(default = "enabled")]
    pub new_customer_alerts: bool,
    #[serde(default = "enabled")]
    pub workflow_alerts: bool,
    #[serde(default)]
    pub payment_reminders: bool,
    #[serde(default)]
    pub daily_report: bool,
    #[serde(default = "enabled")]
    pub weekly_report: bool,
}

fn enabled() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            whatsapp_notifications: true,
            new_customer_alerts: true,
            workflow_alerts: true,
            payment_reminders: false,
            daily_report: false,
            weekly_report: true,
        }
    }
}

impl NotificationSettings {
    fn slot(&mut self, key: NotificationKey) -> &mut bool {
        match key {
            NotificationKey::EmailNotifications => &mut self.email_notifications,
            NotificationKey::WhatsappNotifications => &mut self.whatsapp_notifications,
            NotificationKey::NewCustomerAlerts => &mut self.new_customer_alerts,
            NotificationKey::WorkflowAlerts => &mut self.workflow_alerts,
            NotificationKey::PaymentReminders => &mut self.payment_reminders,
            NotificationKey::DailyReport => &mut self.daily_report,
            NotificationKey::WeeklyReport => &mut self.weekly_report,
        }
    }

    pub fn get(&self, key: NotificationKey) -> bool {
        match key {
            NotificationKey::EmailNotifications => self.email_notifications,
            NotificationKey::WhatsappNotifications => self.whatsapp_notifications,
            NotificationKey::NewCustomerAlerts => self.new_customer_alerts,
            NotificationKey::WorkflowAlerts => self.workflow_alerts,
            NotificationKey::PaymentReminders => self.payment_reminders,
            NotificationKey::DailyReport => self.daily_report,
            NotificationKey::WeeklyReport => self.weekly_report,
        }
    }

    pub fn set(&mut self, key: NotificationKey, value: bool) {
        *self.slot(key) = value;
    }

    /// Flip one switch and return its new value
    pub fn toggle(&mut self, key: NotificationKey) -> bool {
        let slot = self.slot(key);
        *slot = !*slot;
        *slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_only_target() {
        for &key in NotificationKey::all() {
            let before = NotificationSettings::default();
            let mut after = before.clone();
            let new_value = after.toggle(key);

            assert_eq!(new_value, !before.get(key));
            for &other in NotificationKey::all() {
                if other != key {
                    assert_eq!(after.get(other), before.get(other), "{:?} changed", other);
                }
            }
        }
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(
            "daily_report".parse::<NotificationKey>().unwrap(),
            NotificationKey::DailyReport
        );
        assert!(matches!(
            "sms".parse::<NotificationKey>(),
            Err(StorageError::UnknownSetting(_))
        ));
    }

    #[test]
    fn test_gateway_config_camel_case() {
        let config = GatewayConfig {
            base_url: "https://gw.example.com".to_string(),
            api_key: "secret".to_string(),
            instance_name: "sales".to_string(),
            webhook_url: "https://crm.example.com/api/v1/webhooks/evolution".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"baseUrl\""));
        assert!(json.contains("\"instanceName\""));
        assert!(config.is_configured());

        let partial: GatewayConfig = serde_json::from_str(r#"{"apiKey":"k"}"#).unwrap();
        assert_eq!(partial.base_url, "http://localhost:8080");
        assert_eq!(partial.api_key, "k");
    }

    #[test]
    fn test_overlay_keeps_base_for_missing_fields() {
        let base = GatewayConfig {
            base_url: "http://gateway.internal:8080".to_string(),
            api_key: "env-key".to_string(),
            instance_name: "sales".to_string(),
            webhook_url: String::new(),
        };

        let merged = GatewayConfig::overlay(&base, r#"{"apiKey":"stored"}"#).unwrap();
        assert_eq!(merged.base_url, "http://gateway.internal:8080");
        assert_eq!(merged.instance_name, "sales");
        assert_eq!(merged.api_key, "stored");

        assert!(GatewayConfig::overlay(&base, "not json").is_err());
    }
}
