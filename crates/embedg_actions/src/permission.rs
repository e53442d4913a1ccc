//! Authorization of role-changing actions.
//!
//! Checks run before any side effect so a denied dispatch changes nothing.
//! Deny rules take precedence: a protected role is refused regardless of the
//! role hierarchy.

use crate::RoleHierarchy;
use embedg_core::{GuildId, RoleId};
use embedg_error::{DispatchError, DispatchErrorKind, DispatchResult};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument};

/// Guard for actions that add or remove member roles.
#[derive(Debug, Clone, Default, derive_getters::Getters, derive_new::new)]
pub struct RoleGuard {
    /// Roles that actions may never grant or revoke
    protected_roles: HashSet<RoleId>,
}

impl RoleGuard {
    /// Require that the interaction happened inside a guild.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchErrorKind::AuthorizationDenied`] outside guilds.
    pub fn require_guild(&self, guild: Option<GuildId>) -> DispatchResult<GuildId> {
        guild.ok_or_else(|| deny("role actions only work inside a server"))
    }

    /// Check if a role is protected.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchErrorKind::AuthorizationDenied`] for protected roles.
    #[instrument(skip(self), fields(role_id = %role_id))]
    pub fn check_role_protected(&self, role_id: RoleId) -> DispatchResult<()> {
        if self.protected_roles.contains(&role_id) {
            debug!("Role is protected");
            return Err(deny(format!("role {role_id} is protected and cannot be assigned")));
        }
        Ok(())
    }

    /// Check every target role against the guild hierarchy.
    ///
    /// The bot must outrank each target role, and the invoking member's
    /// highest role must sit below the bot's highest role. Roles missing from
    /// the hierarchy are left to fail at execution time.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchErrorKind::AuthorizationDenied`] naming the first
    /// requirement that is not met.
    #[instrument(skip_all, fields(bot_top = hierarchy.bot_top(), targets = targets.len()))]
    pub fn check_hierarchy(
        &self,
        hierarchy: &RoleHierarchy,
        member_roles: &BTreeSet<RoleId>,
        targets: &BTreeSet<RoleId>,
    ) -> DispatchResult<()> {
        for role_id in targets {
            self.check_role_protected(*role_id)?;
            match hierarchy.position(*role_id) {
                Some(position) if !hierarchy.bot_outranks(position) => {
                    debug!(role_id = %role_id, position, "Target role not below bot");
                    return Err(deny(format!(
                        "the bot's highest role must be above role {role_id}"
                    )));
                }
                Some(_) => {}
                None => debug!(role_id = %role_id, "Target role not in hierarchy"),
            }
        }

        let member_top = hierarchy.highest(member_roles);
        if !hierarchy.bot_outranks(member_top) && member_top > 0 {
            debug!(member_top, "Member outranks bot");
            return Err(deny(
                "your highest role must be below the bot's highest role",
            ));
        }

        debug!("Role changes permitted");
        Ok(())
    }
}

#[track_caller]
fn deny(requirement: impl Into<String>) -> DispatchError {
    DispatchError::new(DispatchErrorKind::AuthorizationDenied(requirement.into()))
}
