//! Recording platform fake.

use async_trait::async_trait;
use embedg_actions::{InteractionHandle, Platform, PlatformMessage, Reply, RoleHierarchy};
use embedg_core::{ActionRow, ChannelId, GuildId, MessageId, RoleId, UserId};
use embedg_error::{PlatformError, PlatformErrorKind, PlatformResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// A call made against the platform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    AddRole(RoleId),
    RemoveRole(RoleId),
    RoleHierarchy(GuildId),
    FetchMessage(MessageId),
    EditComponents(MessageId),
    Respond(Reply),
    FollowUp(Reply),
}

impl PlatformCall {
    pub fn is_role_change(&self) -> bool {
        matches!(self, Self::AddRole(_) | Self::RemoveRole(_))
    }
}

/// Platform fake that records calls and fails on request.
#[derive(Debug)]
pub struct MockPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    failing_roles: Mutex<HashMap<RoleId, PlatformErrorKind>>,
    hierarchy: Mutex<RoleHierarchy>,
    messages: Mutex<HashMap<MessageId, PlatformMessage>>,
    respond_error: Mutex<Option<PlatformErrorKind>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        // Roles 1..=50 sit at their own id; the bot's top role is at 50.
        let positions = (1..=50u16).map(|p| (RoleId::new(u64::from(p)), p)).collect();
        Self {
            calls: Mutex::new(Vec::new()),
            failing_roles: Mutex::new(HashMap::new()),
            hierarchy: Mutex::new(RoleHierarchy::new(positions, 50)),
            messages: Mutex::new(HashMap::new()),
            respond_error: Mutex::new(None),
        }
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every change of `role` fail with `kind`.
    pub fn fail_role(&self, role: RoleId, kind: PlatformErrorKind) {
        self.failing_roles.lock().unwrap().insert(role, kind);
    }

    /// Make interaction responses fail with `kind`.
    pub fn fail_responses(&self, kind: PlatformErrorKind) {
        *self.respond_error.lock().unwrap() = Some(kind);
    }

    pub fn set_hierarchy(&self, hierarchy: RoleHierarchy) {
        *self.hierarchy.lock().unwrap() = hierarchy;
    }

    pub fn insert_message(&self, message: PlatformMessage) {
        self.messages.lock().unwrap().insert(*message.id(), message);
    }

    pub fn message(&self, id: MessageId) -> Option<PlatformMessage> {
        self.messages.lock().unwrap().get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn role_calls(&self) -> Vec<PlatformCall> {
        self.calls().into_iter().filter(PlatformCall::is_role_change).collect()
    }

    /// Every reply sent, initial response first.
    pub fn replies(&self) -> Vec<Reply> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::Respond(reply) | PlatformCall::FollowUp(reply) => Some(reply),
                _ => None,
            })
            .collect()
    }

    /// Content of the initial response.
    pub fn response_text(&self) -> Option<String> {
        self.calls().into_iter().find_map(|call| match call {
            PlatformCall::Respond(reply) => reply.content().clone(),
            _ => None,
        })
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn role_result(&self, role: RoleId) -> PlatformResult<()> {
        match self.failing_roles.lock().unwrap().get(&role) {
            Some(kind) => Err(PlatformError::new(kind.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn add_member_role(&self, _guild: GuildId, _user: UserId, role: RoleId) -> PlatformResult<()> {
        self.record(PlatformCall::AddRole(role));
        self.role_result(role)
    }

    async fn remove_member_role(&self, _guild: GuildId, _user: UserId, role: RoleId) -> PlatformResult<()> {
        self.record(PlatformCall::RemoveRole(role));
        self.role_result(role)
    }

    async fn role_hierarchy(&self, guild: GuildId) -> PlatformResult<RoleHierarchy> {
        self.record(PlatformCall::RoleHierarchy(guild));
        Ok(self.hierarchy.lock().unwrap().clone())
    }

    async fn fetch_message(&self, _channel: ChannelId, message: MessageId) -> PlatformResult<PlatformMessage> {
        self.record(PlatformCall::FetchMessage(message));
        self.message(message)
            .ok_or_else(|| PlatformError::new(PlatformErrorKind::UnknownMessage(message.to_string())))
    }

    async fn edit_message_components(
        &self,
        _channel: ChannelId,
        message: MessageId,
        components: &[ActionRow],
    ) -> PlatformResult<()> {
        self.record(PlatformCall::EditComponents(message));
        let mut messages = self.messages.lock().unwrap();
        let stored = messages
            .get_mut(&message)
            .ok_or_else(|| PlatformError::new(PlatformErrorKind::UnknownMessage(message.to_string())))?;
        *stored = PlatformMessage::new(
            *stored.id(),
            *stored.channel_id(),
            stored.username().clone(),
            stored.avatar_url().clone(),
            stored.content().clone(),
            stored.embeds().clone(),
            components.to_vec(),
        );
        Ok(())
    }

    async fn respond(&self, _interaction: &InteractionHandle, reply: &Reply) -> PlatformResult<()> {
        self.record(PlatformCall::Respond(reply.clone()));
        match self.respond_error.lock().unwrap().clone() {
            Some(kind) => Err(PlatformError::new(kind)),
            None => Ok(()),
        }
    }

    async fn follow_up(&self, _interaction: &InteractionHandle, reply: &Reply) -> PlatformResult<()> {
        self.record(PlatformCall::FollowUp(reply.clone()));
        Ok(())
    }

    fn platform_name(&self) -> &str {
        "mock"
    }
}
