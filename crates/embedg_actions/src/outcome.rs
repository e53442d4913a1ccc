//! Per-action execution results and the interaction report built from them.

use crate::Reply;
use embedg_core::{ActionEmbed, MessageId, SetId};
use embedg_error::PlatformErrorKind;

/// Why a single action failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum FailureReason {
    /// The bot lacks a permission
    MissingPermission,
    /// The role does not exist
    UnknownRole,
    /// The member left the guild
    UnknownMember,
    /// Role action outside a guild
    MissingGuild,
    /// Discord rate limited the call
    RateLimited,
    /// Any other platform failure
    PlatformError,
}

impl FailureReason {
    /// Text shown to the user in the report.
    pub fn describe(self) -> &'static str {
        match self {
            Self::MissingPermission => "the bot is missing permissions",
            Self::UnknownRole => "the role no longer exists",
            Self::UnknownMember => "you are no longer a member of this server",
            Self::MissingGuild => "this only works inside a server",
            Self::RateLimited => "Discord is rate limiting the bot, try again later",
            Self::PlatformError => "Discord returned an error",
        }
    }
}

impl From<&PlatformErrorKind> for FailureReason {
    fn from(kind: &PlatformErrorKind) -> Self {
        match kind {
            PlatformErrorKind::Forbidden(_) => Self::MissingPermission,
            PlatformErrorKind::UnknownRole(_) => Self::UnknownRole,
            PlatformErrorKind::UnknownMember(_) => Self::UnknownMember,
            PlatformErrorKind::RateLimited(_) => Self::RateLimited,
            PlatformErrorKind::UnknownMessage(_)
            | PlatformErrorKind::InteractionExpired
            | PlatformErrorKind::Request(_) => Self::PlatformError,
        }
    }
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// The action ran.
    Succeeded {
        /// Short ephemeral note such as a role change
        note: Option<String>,
        /// Message the action asked to send
        reply: Option<Reply>,
    },
    /// The action failed; later actions still ran.
    Failed {
        /// Failure category
        reason: FailureReason,
        /// Underlying error, for logs
        detail: String,
    },
}

/// One entry of an [`ExecutionOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_new::new)]
pub struct ActionResult {
    /// Set the action belongs to
    set_id: SetId,
    /// Position of the action inside its set
    index: usize,
    /// Action kind label
    kind: &'static str,
    /// What happened
    status: ActionStatus,
}

impl ActionResult {
    /// Whether the action ran.
    pub fn is_success(&self) -> bool {
        matches!(self.status, ActionStatus::Succeeded { .. })
    }
}

/// Interaction response plus follow-ups rendered from an outcome.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct Report {
    /// Initial interaction response
    initial: Reply,
    /// Messages sent after the initial response, in order
    follow_ups: Vec<Reply>,
}

/// Ordered results of every action executed for one interaction.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct ExecutionOutcome {
    /// Message whose component was used
    message_id: MessageId,
    /// Results in execution order
    results: Vec<ActionResult>,
}

impl ExecutionOutcome {
    /// Empty outcome for `message_id`.
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            results: Vec::new(),
        }
    }

    /// Append a result.
    pub fn push(&mut self, result: ActionResult) {
        self.results.push(result);
    }

    /// Number of successful actions.
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed actions.
    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }

    /// Whether at least one action of `set_id` ran.
    pub fn succeeded_for(&self, set_id: &SetId) -> bool {
        self.results
            .iter()
            .any(|r| r.set_id() == set_id && r.is_success())
    }

    /// Render the user-facing report.
    ///
    /// Role notes, ephemeral replies and failures are merged into one
    /// ephemeral response. Public replies become follow-ups, except when
    /// nothing ephemeral needs saying: then the first public reply is the
    /// response itself. An outcome with nothing to say answers with
    /// `success_text`.
    pub fn render(&self, success_text: &str) -> Report {
        let mut lines: Vec<String> = Vec::new();
        let mut embeds: Vec<ActionEmbed> = Vec::new();
        let mut public: Vec<Reply> = Vec::new();

        for result in &self.results {
            match result.status() {
                ActionStatus::Succeeded { note, reply } => {
                    if let Some(note) = note {
                        lines.push(note.clone());
                    }
                    match reply {
                        Some(reply) if reply.is_empty() => {}
                        Some(reply) if *reply.ephemeral() => {
                            lines.extend(reply.content().iter().filter(|c| !c.is_empty()).cloned());
                            embeds.extend(reply.embeds().iter().cloned());
                        }
                        Some(reply) => public.push(reply.clone()),
                        None => {}
                    }
                }
                ActionStatus::Failed { reason, .. } => lines.push(format!(
                    "Action {} ({}) failed: {}",
                    result.index() + 1,
                    result.kind,
                    reason.describe()
                )),
            }
        }

        let mut public = public.into_iter().map(Reply::truncated);
        let initial = if lines.is_empty() && embeds.is_empty() {
            public
                .next()
                .unwrap_or_else(|| Reply::ephemeral_text(success_text))
        } else {
            let mut reply = Reply::default().with_embeds(embeds).with_ephemeral(true);
            if !lines.is_empty() {
                reply = reply.with_content(lines.join("\n"));
            }
            reply
        };

        Report {
            initial: initial.truncated(),
            follow_ups: public.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_id() -> SetId {
        SetId::new("s").unwrap()
    }

    fn success(index: usize, note: Option<&str>, reply: Option<Reply>) -> ActionResult {
        ActionResult::new(
            set_id(),
            index,
            "send_text",
            ActionStatus::Succeeded {
                note: note.map(str::to_string),
                reply,
            },
        )
    }

    fn failure(index: usize) -> ActionResult {
        ActionResult::new(
            set_id(),
            index,
            "give_role",
            ActionStatus::Failed {
                reason: FailureReason::MissingPermission,
                detail: "403".to_string(),
            },
        )
    }

    #[test]
    fn test_empty_outcome_uses_success_text() {
        let report = ExecutionOutcome::new(MessageId::new(1)).render("Done!");
        assert_eq!(report.initial(), &Reply::ephemeral_text("Done!"));
        assert!(report.follow_ups().is_empty());
    }

    #[test]
    fn test_public_only_replies_inline() {
        let mut outcome = ExecutionOutcome::new(MessageId::new(1));
        outcome.push(success(0, None, Some(Reply::public_text("hello"))));
        outcome.push(success(1, None, Some(Reply::public_text("world"))));

        let report = outcome.render("Done!");
        assert_eq!(report.initial(), &Reply::public_text("hello"));
        assert_eq!(report.follow_ups(), &vec![Reply::public_text("world")]);
    }

    #[test]
    fn test_failures_and_notes_are_aggregated() {
        let mut outcome = ExecutionOutcome::new(MessageId::new(1));
        outcome.push(success(0, Some("Added role"), None));
        outcome.push(failure(1));
        outcome.push(success(2, None, Some(Reply::public_text("hi"))));

        let report = outcome.render("Done!");
        assert!(*report.initial().ephemeral());
        assert_eq!(
            report.initial().content().as_deref(),
            Some("Added role\nAction 2 (give_role) failed: the bot is missing permissions")
        );
        assert_eq!(report.follow_ups(), &vec![Reply::public_text("hi")]);
        assert_eq!(outcome.successes(), 2);
        assert_eq!(outcome.failures(), 1);
        assert!(outcome.succeeded_for(&set_id()));
    }

    #[test]
    fn test_ephemeral_embeds_collected() {
        let mut outcome = ExecutionOutcome::new(MessageId::new(1));
        outcome.push(success(0, None, Some(Reply::embed(ActionEmbed::new().with_title("a"), true))));

        let report = outcome.render("Done!");
        assert_eq!(report.initial().content(), &None);
        assert_eq!(report.initial().embeds().len(), 1);
    }

    #[test]
    fn test_every_reason_has_text() {
        use strum::IntoEnumIterator;
        for reason in FailureReason::iter() {
            assert!(!reason.describe().is_empty());
        }
    }
}
