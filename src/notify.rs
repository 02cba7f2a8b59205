//! Down notifications
//!
//! The monitor calls [`Notifier::notify_down`] on a spawned task whenever a
//! target transitions from up to down. Delivery is best-effort: failures are
//! logged and never reach the monitoring loop.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::{Alert, Webhook};
use crate::discord::{DiscordManager, MessageBuilder};
use crate::target::Target;

/// Sink for down notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_down(&self, target: &Target);
}

/// Notifier that drops every notification
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_down(&self, _target: &Target) {}
}

/// Delivers down notifications to Discord or a generic webhook
#[derive(Debug, Clone)]
pub struct AlertManager {
    client: Client,
    alert: Alert,
    discord_manager: DiscordManager,
}

impl AlertManager {
    pub fn new(alert: Alert) -> Self {
        let client = Client::new();
        Self {
            discord_manager: DiscordManager::new(client.clone()),
            client,
            alert,
        }
    }

    fn down_reason(target: &Target) -> String {
        target
            .status_history
            .back()
            .map(|event| event.reason.clone())
            .or_else(|| target.last_response.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn format_down_message(target: &Target, reason: &str) -> String {
        format!(
            "🔴 **Target DOWN**: `{}` is down ({})\nAddress: {}",
            target.name, reason, target.address
        )
    }

    #[instrument(skip(self, webhook, target))]
    async fn send_webhook_alert(&self, webhook: &Webhook, target: &Target, reason: &str) {
        let payload = json!({
            "message": Self::format_down_message(target, reason),
            "target": target.name,
            "address": target.address,
            "status": "down",
            "error": reason,
            "timestamp": Utc::now().to_rfc3339()
        });

        match self.client.post(&webhook.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
            }
        }
    }
}

#[async_trait]
impl Notifier for AlertManager {
    #[instrument(skip_all, fields(target = %target.name))]
    async fn notify_down(&self, target: &Target) {
        let reason = Self::down_reason(target);

        match &self.alert {
            Alert::Discord(discord) => {
                let embed = self.discord_manager.build_down_embed(target, &reason);
                let mut message_builder = MessageBuilder::new().add_embed(embed);
                if let Some(user_id) = &discord.user_id {
                    message_builder =
                        message_builder.content(format!("🔴 `{}` <@{user_id}>", target.name));
                }

                self.discord_manager
                    .send_message(discord, &message_builder.build())
                    .await;
            }
            Alert::Webhook(webhook) => {
                self.send_webhook_alert(webhook, target, &reason).await;
            }
        }
    }
}
