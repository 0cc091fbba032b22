use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::MessageRef;

/// Per-deployment bot configuration record (`/setup`, `/set-error-webhook`,
/// panel/stats message bookkeeping). Persisted apart from the report store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BotSettings {
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Public blacklist channel; `None` until `/setup` has run.
    #[serde(default)]
    pub report_channel_id: Option<String>,
    /// Staff review channel; falls back to the report channel.
    #[serde(default)]
    pub staff_channel_id: Option<String>,
    #[serde(default)]
    pub admin_role_id: Option<String>,
    #[serde(default)]
    pub admin_user_ids: Vec<String>,
    #[serde(default)]
    pub stats_channel_id: Option<String>,
    #[serde(default)]
    pub stats_message_id: Option<MessageRef>,
    #[serde(default)]
    pub panel_channel_id: Option<String>,
    #[serde(default)]
    pub panel_message_id: Option<MessageRef>,
    #[serde(default)]
    pub error_webhook_url: Option<String>,
}

impl BotSettings {
    pub fn is_set_up(&self) -> bool {
        self.report_channel_id.is_some()
    }

    pub fn staff_channel(&self) -> Option<&str> {
        self.staff_channel_id
            .as_deref()
            .or(self.report_channel_id.as_deref())
    }

    pub fn panel_target(&self) -> Option<(&str, &str)> {
        Some((self.panel_channel_id.as_deref()?, self.panel_message_id.as_deref()?))
    }

    pub fn is_admin_role(&self, guild_roles: &[String]) -> bool {
        self.admin_role_id
            .as_deref()
            .is_some_and(|role| guild_roles.iter().any(|r| r == role))
    }

    pub fn is_admin_user(&self, platform_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == platform_id)
    }
}

/// Body of `PUT /admin/setup`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub channel_id: String,
    pub admin_role_id: Option<String>,
    pub staff_channel_id: Option<String>,
    pub stats_channel_id: Option<String>,
    pub guild_id: Option<String>,
}

impl SetupRequest {
    pub fn apply(self, s: &mut BotSettings) {
        s.report_channel_id = Some(self.channel_id);
        if let Some(role) = self.admin_role_id {
            s.admin_role_id = Some(role);
        }
        if let Some(staff) = self.staff_channel_id {
            s.staff_channel_id = Some(staff);
        }
        if let Some(stats) = self.stats_channel_id {
            if s.stats_channel_id.as_deref() != Some(stats.as_str()) {
                s.stats_message_id = None;
            }
            s.stats_channel_id = Some(stats);
        }
        if let Some(guild) = self.guild_id {
            s.guild_id = Some(guild);
        }
    }
}
