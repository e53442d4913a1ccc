//! Execution dispatcher.
//!
//! A component interaction moves through five steps:
//!
//! 1. decode the component identifier (and selected option values),
//! 2. resolve the referenced action sets from the store,
//! 3. authorize role changes and apply the cooldown, before any side effect,
//! 4. execute every action in declared order, isolating failures,
//! 5. report the outcome to the user and consume one-shot components.
//!
//! [`Dispatcher::dispatch`] runs steps 1 to 4 and returns the outcome.
//! [`Dispatcher::handle`] runs the whole machine and never fails.

use crate::{
    ActionResult, ActionSetStore, ActionStatus, ComponentEvent, CooldownTracker, DispatchSettings,
    ExecutionOutcome, FailureReason, InteractionHandle, Platform, Reply, RoleGuard,
};
use embedg_core::{
    Action, ActionKind, ActionSet, ComponentFlags, ComponentReference, GuildId, RoleId, SetId,
    UserId, codec, rewrite_identifier,
};
use embedg_error::{
    DispatchError, DispatchErrorKind, EmbedgError, EmbedgErrorKind, EmbedgResult, PlatformError,
    StoreErrorKind,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Reply for identifiers that cannot be decoded.
pub const NOT_RECOGNIZED_TEXT: &str = "This button is not recognized.";
/// Reply for references whose action set is gone.
pub const NO_LONGER_EXISTS_TEXT: &str = "This action no longer exists.";
/// Reply for consumed one-shot components.
pub const ALREADY_USED_TEXT: &str = "This button has already been used.";
/// Reply for infrastructure failures.
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong while running this action.";

/// Default response when actions produce nothing to say.
pub const DEFAULT_SUCCESS_TEXT: &str = "Done!";

/// Locates, authorizes and executes the action sets behind a component.
pub struct Dispatcher {
    store: ActionSetStore,
    platform: Arc<dyn Platform>,
    guard: RoleGuard,
    cooldowns: CooldownTracker,
    success_text: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("platform", &self.platform.platform_name())
            .field("guard", &self.guard)
            .field("cooldown", &self.cooldowns.window())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher with default settings.
    pub fn new(store: ActionSetStore, platform: Arc<dyn Platform>) -> Self {
        Self::from_settings(store, platform, &DispatchSettings::default())
    }

    /// Dispatcher configured from the `[dispatch]` section.
    pub fn from_settings(
        store: ActionSetStore,
        platform: Arc<dyn Platform>,
        settings: &DispatchSettings,
    ) -> Self {
        Self {
            store,
            platform,
            guard: RoleGuard::new(settings.protected_roles().clone()),
            cooldowns: CooldownTracker::new(settings.cooldown()),
            success_text: settings.success_text().clone(),
        }
    }

    /// The action set store.
    pub fn store(&self) -> &ActionSetStore {
        &self.store
    }

    /// Decode, resolve, authorize and execute without replying.
    ///
    /// # Errors
    ///
    /// * codec errors when the identifier is not ours or has an unknown version,
    /// * [`StoreErrorKind::NotFound`] when a referenced set is gone,
    /// * [`DispatchErrorKind`] when the component is consumed, cooling down or
    ///   not authorized,
    /// * platform or store backend errors raised before execution.
    ///
    /// Failures of individual actions are recorded in the outcome instead.
    pub async fn dispatch(&self, event: &ComponentEvent) -> EmbedgResult<ExecutionOutcome> {
        self.run(event).await.map(|(_, outcome)| outcome)
    }

    /// Run the full machine, replying to the interaction.
    ///
    /// Never fails: errors become ephemeral replies and logs.
    #[instrument(
        skip(self, event),
        fields(
            message_id = %event.message_id(),
            user_id = %event.user_id(),
            custom_id = %event.custom_id()
        )
    )]
    pub async fn handle(&self, event: &ComponentEvent) {
        match self.run(event).await {
            Ok((references, outcome)) => {
                info!(
                    successes = outcome.successes(),
                    failures = outcome.failures(),
                    "Dispatched component"
                );
                self.report(event.interaction(), &outcome).await;
                self.consume_one_shots(event, &references, &outcome).await;
            }
            Err(e) => {
                let reply = Reply::ephemeral_text(refusal_text(&e));
                self.send(event.interaction(), &reply, true).await;
            }
        }
    }

    async fn run(
        &self,
        event: &ComponentEvent,
    ) -> EmbedgResult<(Vec<ComponentReference>, ExecutionOutcome)> {
        let references = self.decode(event)?;
        let sets = self.resolve(event, &references).await?;
        self.authorize(event, &references, &sets).await?;
        let outcome = self.execute(event, sets).await;
        Ok((references, outcome))
    }

    #[instrument(skip_all, fields(select = event.is_select()))]
    fn decode(&self, event: &ComponentEvent) -> EmbedgResult<Vec<ComponentReference>> {
        let component = codec::decode(event.custom_id())?;
        let references = if event.is_select() {
            let mut references = Vec::with_capacity(event.values().len());
            for value in event.values() {
                references.push(codec::decode(value)?);
            }
            if component.is_triggered() {
                return Err(DispatchError::new(DispatchErrorKind::AlreadyTriggered).into());
            }
            references
        } else {
            vec![component]
        };

        if references.iter().any(ComponentReference::is_triggered) {
            debug!("Component already triggered");
            return Err(DispatchError::new(DispatchErrorKind::AlreadyTriggered).into());
        }
        debug!(references = references.len(), "Decoded component");
        Ok(references)
    }

    async fn resolve(
        &self,
        event: &ComponentEvent,
        references: &[ComponentReference],
    ) -> EmbedgResult<Vec<ActionSet>> {
        let mut sets = Vec::with_capacity(references.len());
        for reference in references {
            sets.push(self.store.load(*event.message_id(), reference.set_id()).await?);
        }
        Ok(sets)
    }

    async fn authorize(
        &self,
        event: &ComponentEvent,
        references: &[ComponentReference],
        sets: &[ActionSet],
    ) -> EmbedgResult<()> {
        let targets: BTreeSet<RoleId> = sets
            .iter()
            .flat_map(|set| set.actions().iter())
            .filter_map(|action| action.kind().role_id())
            .collect();

        if !targets.is_empty() {
            let guild = self.guard.require_guild(*event.guild_id())?;
            for role_id in &targets {
                self.guard.check_role_protected(*role_id)?;
            }
            let hierarchy = self.platform.role_hierarchy(guild).await?;
            self.guard
                .check_hierarchy(&hierarchy, event.member_roles(), &targets)?;
        }

        let cooling: Vec<&SetId> = references
            .iter()
            .filter(|r| r.flags().contains(ComponentFlags::COOLDOWN))
            .map(ComponentReference::set_id)
            .collect();
        if !cooling.is_empty() {
            self.cooldowns
                .check_and_record(*event.message_id(), &cooling, *event.user_id())?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(sets = sets.len()))]
    async fn execute(&self, event: &ComponentEvent, sets: Vec<ActionSet>) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::new(*event.message_id());
        let mut roles = event.member_roles().clone();
        let target = Target {
            guild: *event.guild_id(),
            user: *event.user_id(),
        };

        for set in sets {
            let set_id = set.set_id().clone();
            for (index, action) in set.into_actions().into_iter().enumerate() {
                let status = self.execute_action(&target, &mut roles, &action).await;
                if let ActionStatus::Failed { reason, detail } = &status {
                    warn!(set_id = %set_id, index, kind = action.kind().label(), %reason, detail, "Action failed");
                } else {
                    debug!(set_id = %set_id, index, kind = action.kind().label(), "Action executed");
                }
                outcome.push(ActionResult::new(
                    set_id.clone(),
                    index,
                    action.kind().label(),
                    status,
                ));
            }
        }
        outcome
    }

    async fn execute_action(
        &self,
        target: &Target,
        roles: &mut BTreeSet<RoleId>,
        action: &Action,
    ) -> ActionStatus {
        let public = action.is_public();
        match action.kind() {
            ActionKind::GiveRole { role_id } => self.add_role(target, roles, *role_id).await,
            ActionKind::RemoveRole { role_id } => self.remove_role(target, roles, *role_id).await,
            ActionKind::ToggleRole { role_id } => {
                if roles.contains(role_id) {
                    self.remove_role(target, roles, *role_id).await
                } else {
                    self.add_role(target, roles, *role_id).await
                }
            }
            ActionKind::SendText { text } => ActionStatus::Succeeded {
                note: None,
                reply: Some(Reply::ephemeral_text(text.clone()).with_ephemeral(!public)),
            },
            ActionKind::SendEmbed { embed } => ActionStatus::Succeeded {
                note: None,
                reply: Some(Reply::embed(embed.clone(), !public)),
            },
            ActionKind::OpenUrl { .. } => ActionStatus::Succeeded {
                note: None,
                reply: None,
            },
        }
    }

    async fn add_role(
        &self,
        target: &Target,
        roles: &mut BTreeSet<RoleId>,
        role_id: RoleId,
    ) -> ActionStatus {
        let Some(guild) = target.guild else {
            return missing_guild();
        };
        match self
            .platform
            .add_member_role(guild, target.user, role_id)
            .await
        {
            Ok(()) => {
                roles.insert(role_id);
                ActionStatus::Succeeded {
                    note: Some(format!("Added role <@&{role_id}>")),
                    reply: None,
                }
            }
            Err(e) => platform_failure(&e),
        }
    }

    async fn remove_role(
        &self,
        target: &Target,
        roles: &mut BTreeSet<RoleId>,
        role_id: RoleId,
    ) -> ActionStatus {
        let Some(guild) = target.guild else {
            return missing_guild();
        };
        match self
            .platform
            .remove_member_role(guild, target.user, role_id)
            .await
        {
            Ok(()) => {
                roles.remove(&role_id);
                ActionStatus::Succeeded {
                    note: Some(format!("Removed role <@&{role_id}>")),
                    reply: None,
                }
            }
            Err(e) => platform_failure(&e),
        }
    }

    async fn report(&self, interaction: &InteractionHandle, outcome: &ExecutionOutcome) {
        let report = outcome.render(&self.success_text);
        if !self.send(interaction, report.initial(), true).await {
            return;
        }
        for follow_up in report.follow_ups() {
            self.send(interaction, follow_up, false).await;
        }
    }

    /// Deliver a reply, logging failures. Returns whether it was delivered.
    async fn send(&self, interaction: &InteractionHandle, reply: &Reply, initial: bool) -> bool {
        let result = if initial {
            self.platform.respond(interaction, reply).await
        } else {
            self.platform.follow_up(interaction, reply).await
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(interaction_id = %interaction.id(), initial, error = %e, "Failed to deliver reply");
                false
            }
        }
    }

    async fn consume_one_shots(
        &self,
        event: &ComponentEvent,
        references: &[ComponentReference],
        outcome: &ExecutionOutcome,
    ) {
        let rewrites: Vec<(String, String)> = references
            .iter()
            .filter(|r| r.flags().contains(ComponentFlags::ONE_SHOT))
            .filter(|r| outcome.succeeded_for(r.set_id()))
            .map(|r| (r.identifier(), r.with_flags(ComponentFlags::TRIGGERED).identifier()))
            .collect();
        if rewrites.is_empty() {
            return;
        }

        if let Err(e) = self.rewrite_components(event, &rewrites).await {
            warn!(error = %e, "Failed to mark one-shot component as used");
        }
    }

    #[instrument(skip_all, fields(channel_id = %event.channel_id(), rewrites = rewrites.len()))]
    async fn rewrite_components(
        &self,
        event: &ComponentEvent,
        rewrites: &[(String, String)],
    ) -> Result<(), PlatformError> {
        let message = self
            .platform
            .fetch_message(*event.channel_id(), *event.message_id())
            .await?;
        let mut rows = message.components().clone();
        let mut changed = false;
        for (from, to) in rewrites {
            changed |= rewrite_identifier(&mut rows, from, to);
        }
        if !changed {
            debug!("One-shot identifier not found on message");
            return Ok(());
        }
        self.platform
            .edit_message_components(*event.channel_id(), *event.message_id(), &rows)
            .await?;
        info!("Marked one-shot component as used");
        Ok(())
    }
}

struct Target {
    guild: Option<GuildId>,
    user: UserId,
}

fn missing_guild() -> ActionStatus {
    ActionStatus::Failed {
        reason: FailureReason::MissingGuild,
        detail: "role action outside a guild".to_string(),
    }
}

fn platform_failure(e: &PlatformError) -> ActionStatus {
    ActionStatus::Failed {
        reason: FailureReason::from(e.kind()),
        detail: e.to_string(),
    }
}

/// User-facing text for a dispatch that stopped before execution.
pub fn refusal_text(e: &EmbedgError) -> String {
    match e.kind() {
        EmbedgErrorKind::Codec(e) => {
            debug!(error = %e, "Unrecognized component");
            NOT_RECOGNIZED_TEXT.to_string()
        }
        EmbedgErrorKind::Store(e) if e.is_not_found() => NO_LONGER_EXISTS_TEXT.to_string(),
        EmbedgErrorKind::Store(e) => {
            if matches!(e.kind(), StoreErrorKind::Backend(_)) {
                error!(error = %e, "Action store unavailable");
            } else {
                warn!(error = %e, "Unreadable action set");
            }
            GENERIC_FAILURE_TEXT.to_string()
        }
        EmbedgErrorKind::Dispatch(e) => match e.kind() {
            DispatchErrorKind::AlreadyTriggered => ALREADY_USED_TEXT.to_string(),
            DispatchErrorKind::CoolingDown { retry_after_secs } => {
                let unit = if *retry_after_secs == 1 { "second" } else { "seconds" };
                format!("Please wait {retry_after_secs} {unit} before using this again.")
            }
            DispatchErrorKind::AuthorizationDenied(requirement) => {
                format!("This action can't be run: {requirement}.")
            }
        },
        EmbedgErrorKind::Platform(e) => {
            error!(error = %e, "Platform failure before execution");
            GENERIC_FAILURE_TEXT.to_string()
        }
        EmbedgErrorKind::Config(e) => {
            error!(error = %e, "Configuration failure during dispatch");
            GENERIC_FAILURE_TEXT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedg_error::{CodecError, CodecErrorKind, StoreError};

    #[test]
    fn test_refusal_texts() {
        let codec: EmbedgError =
            CodecError::new(CodecErrorKind::MalformedIdentifier("x".into())).into();
        assert_eq!(refusal_text(&codec), NOT_RECOGNIZED_TEXT);

        let missing: EmbedgError = StoreError::new(StoreErrorKind::NotFound {
            message_id: "1".into(),
            set_id: "a".into(),
        })
        .into();
        assert_eq!(refusal_text(&missing), NO_LONGER_EXISTS_TEXT);

        let used: EmbedgError = DispatchError::new(DispatchErrorKind::AlreadyTriggered).into();
        assert_eq!(refusal_text(&used), ALREADY_USED_TEXT);

        let waiting: EmbedgError =
            DispatchError::new(DispatchErrorKind::CoolingDown { retry_after_secs: 3 }).into();
        assert_eq!(
            refusal_text(&waiting),
            "Please wait 3 seconds before using this again."
        );

        let denied: EmbedgError = DispatchError::new(DispatchErrorKind::AuthorizationDenied(
            "role 5 is protected and cannot be assigned".into(),
        ))
        .into();
        assert!(refusal_text(&denied).contains("role 5 is protected"));
    }
}
