use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::config::Discord;
use crate::target::Target;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscordManager {
    client: Client,
}

impl DiscordManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn build_down_embed(&self, target: &Target, reason: &str) -> Embed {
        let down_since = target
            .last_down_time
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());

        let uptime = target
            .metrics
            .uptime_24h
            .map(|pct| format!("{pct:.2}%"))
            .unwrap_or_else(|| "n/a".to_string());

        Embed {
            title: Some("🔴 Target Down".to_string()),
            description: Some(format!("**{}** stopped responding", target.name)),
            color: Some(15158332), // Red
            fields: vec![
                EmbedField {
                    name: "🌐 Address".to_string(),
                    value: target.address.clone(),
                    inline: true,
                },
                EmbedField {
                    name: "🔎 Check".to_string(),
                    value: target.check.label().to_string(),
                    inline: true,
                },
                EmbedField {
                    name: "⚠️ Reason".to_string(),
                    value: reason.to_string(),
                    inline: false,
                },
                EmbedField {
                    name: "📊 Uptime (24h)".to_string(),
                    value: uptime,
                    inline: true,
                },
            ],
            footer: Some(EmbedFooter {
                text: format!("Down since {down_since}"),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    #[instrument(skip(self, discord, message))]
    pub async fn send_message(&self, discord: &Discord, message: &Message) {
        match self.client.post(&discord.url).json(message).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent Discord message");
                } else {
                    error!("Discord message failed with status: {}", response.status());
                    if let Ok(error_text) = response.text().await {
                        error!("Discord API error response: {}", error_text);
                    }
                }
            }
            Err(e) => {
                error!("Failed to send Discord message: {}", e);
            }
        }
    }
}
