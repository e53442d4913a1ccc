//! [`Platform`] over the Discord REST API.

use crate::rest::{classify, components_payload, interaction_response, message_payload, rows_from_value};
use async_trait::async_trait;
use embedg_actions::{InteractionHandle, Platform, PlatformMessage, Reply, RoleHierarchy};
use embedg_core::{ActionRow, ChannelId, GuildId, MessageId, RoleId, UserId};
use embedg_error::{PlatformError, PlatformErrorKind, PlatformResult};
use serenity::http::{Http, HttpError};
use serenity::model::id as discord;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};

const AUDIT_LOG_REASON: &str = "Interactive component action";

/// Discord platform backed by serenity's HTTP client.
pub struct SerenityPlatform {
    http: Arc<Http>,
    bot_id: OnceCell<discord::UserId>,
}

impl std::fmt::Debug for SerenityPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityPlatform")
            .field("bot_id", &self.bot_id.get())
            .finish_non_exhaustive()
    }
}

impl SerenityPlatform {
    /// Platform sharing an existing HTTP client.
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            bot_id: OnceCell::new(),
        }
    }

    /// Platform with its own HTTP client.
    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }

    /// Get the HTTP client.
    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    async fn bot_id(&self) -> PlatformResult<discord::UserId> {
        self.bot_id
            .get_or_try_init(|| async {
                let user = self.http.get_current_user().await.map_err(map_error)?;
                debug!(bot_id = %user.id, "Resolved bot user");
                Ok::<_, PlatformError>(user.id)
            })
            .await
            .copied()
    }
}

/// Convert an id to serenity's non-zero form.
fn snowflake<T: From<NonZeroU64>>(raw: u64, what: &str) -> PlatformResult<T> {
    NonZeroU64::new(raw).map(T::from).ok_or_else(|| {
        PlatformError::new(PlatformErrorKind::Request(format!("{what} id must not be 0")))
    })
}

fn map_error(e: serenity::Error) -> PlatformError {
    let kind = match &e {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => classify(
            response.status_code.as_u16(),
            response.error.code as i64,
            &response.error.message,
        ),
        _ => PlatformErrorKind::Request(e.to_string()),
    };
    PlatformError::new(kind)
}

#[async_trait]
impl Platform for SerenityPlatform {
    #[instrument(skip(self), fields(guild_id = %guild, user_id = %user, role_id = %role))]
    async fn add_member_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        self.http
            .add_member_role(
                snowflake(guild.get(), "guild")?,
                snowflake(user.get(), "user")?,
                snowflake(role.get(), "role")?,
                Some(AUDIT_LOG_REASON),
            )
            .await
            .map_err(map_error)
    }

    #[instrument(skip(self), fields(guild_id = %guild, user_id = %user, role_id = %role))]
    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> PlatformResult<()> {
        self.http
            .remove_member_role(
                snowflake(guild.get(), "guild")?,
                snowflake(user.get(), "user")?,
                snowflake(role.get(), "role")?,
                Some(AUDIT_LOG_REASON),
            )
            .await
            .map_err(map_error)
    }

    #[instrument(skip(self), fields(guild_id = %guild))]
    async fn role_hierarchy(&self, guild: GuildId) -> PlatformResult<RoleHierarchy> {
        let guild_id: discord::GuildId = snowflake(guild.get(), "guild")?;
        let roles = self.http.get_guild_roles(guild_id).await.map_err(|e| {
            error!(error = ?e, "Failed to list guild roles");
            map_error(e)
        })?;
        let positions: HashMap<RoleId, u16> = roles
            .iter()
            .map(|role| (RoleId::new(role.id.get()), role.position))
            .collect();

        let bot = self
            .http
            .get_member(guild_id, self.bot_id().await?)
            .await
            .map_err(map_error)?;
        let bot_top = bot
            .roles
            .iter()
            .filter_map(|role| positions.get(&RoleId::new(role.get())))
            .copied()
            .max()
            .unwrap_or(0);

        debug!(roles = positions.len(), bot_top, "Fetched role hierarchy");
        Ok(RoleHierarchy::new(positions, bot_top))
    }

    #[instrument(skip(self), fields(channel_id = %channel, message_id = %message))]
    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<PlatformMessage> {
        let fetched = self
            .http
            .get_message(snowflake(channel.get(), "channel")?, snowflake(message.get(), "message")?)
            .await
            .map_err(map_error)?;

        let unreadable =
            |e: serde_json::Error| PlatformError::new(PlatformErrorKind::Request(format!("Unreadable message: {e}")));
        let components = serde_json::to_value(&fetched.components)
            .and_then(rows_from_value)
            .map_err(unreadable)?;
        let embeds = fetched
            .embeds
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(unreadable)?;

        Ok(PlatformMessage::new(
            message,
            channel,
            fetched.author.name.clone(),
            fetched.author.avatar_url(),
            fetched.content.clone(),
            embeds,
            components,
        ))
    }

    #[instrument(skip(self, components), fields(channel_id = %channel, message_id = %message))]
    async fn edit_message_components(
        &self,
        channel: ChannelId,
        message: MessageId,
        components: &[ActionRow],
    ) -> PlatformResult<()> {
        self.http
            .edit_message(
                snowflake(channel.get(), "channel")?,
                snowflake(message.get(), "message")?,
                &components_payload(components),
                Vec::new(),
            )
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    #[instrument(skip(self, interaction, reply), fields(interaction_id = %interaction.id()))]
    async fn respond(&self, interaction: &InteractionHandle, reply: &Reply) -> PlatformResult<()> {
        self.http
            .create_interaction_response(
                snowflake(interaction.id().get(), "interaction")?,
                interaction.token(),
                &interaction_response(reply),
                Vec::new(),
            )
            .await
            .map_err(map_error)
    }

    #[instrument(skip(self, interaction, reply), fields(interaction_id = %interaction.id()))]
    async fn follow_up(&self, interaction: &InteractionHandle, reply: &Reply) -> PlatformResult<()> {
        self.http
            .create_followup_message(interaction.token(), &message_payload(reply), Vec::new())
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    fn platform_name(&self) -> &str {
        "discord"
    }
}
