//! Component unparser.
//!
//! Turns a live component tree back into an editor-readable form by decoding
//! every identifier and loading the action set it points at. A single bad
//! component never fails the traversal: it is recorded as foreign or orphaned
//! and passed through. Only a store backend failure aborts.

use crate::ActionSetStore;
use embedg_core::{
    Action, ActionRow, Button, Component, ComponentReference, MessageId, SelectMenu,
    SelectMenuOption, codec,
};
use embedg_error::StoreResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// What a component identifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "binding", rename_all = "snake_case")]
pub enum Binding {
    /// No identifier, such as a link button
    Unbound,
    /// Identifier produced by another application or an unknown scheme version
    Foreign,
    /// Reference whose action set was found
    Resolved {
        /// Decoded reference
        reference: ComponentReference,
        /// Actions of the set, in order
        actions: Vec<Action>,
    },
    /// Reference whose action set is missing or unreadable
    Orphaned {
        /// Decoded reference
        reference: ComponentReference,
    },
    /// Identifier of an authored select menu; its options carry the actions
    Menu {
        /// Decoded menu reference
        reference: ComponentReference,
    },
}

/// Select option with its binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct UnparsedOption {
    /// The option as found on the message
    option: SelectMenuOption,
    /// What its value resolved to
    binding: Binding,
}

/// Component with its binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum UnparsedComponent {
    /// Button
    Button {
        /// The button as found on the message
        button: Button,
        /// What its identifier resolved to
        binding: Binding,
    },
    /// Select menu
    SelectMenu {
        /// The menu as found on the message
        menu: SelectMenu,
        /// What the menu identifier resolved to
        binding: Binding,
        /// Options in display order
        options: Vec<UnparsedOption>,
    },
    /// Component kind without action semantics, kept verbatim
    Raw {
        /// Raw component JSON
        raw: serde_json::Value,
    },
}

/// One row of unparsed components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct UnparsedRow {
    /// Components in display order
    components: Vec<UnparsedComponent>,
}

/// Count of bindings by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnparseSummary {
    /// Components and options whose set was found
    pub resolved: usize,
    /// Components and options whose set was missing or unreadable
    pub orphaned: usize,
    /// Components and options with identifiers we do not own
    pub foreign: usize,
    /// Components without identifiers
    pub unbound: usize,
}

impl UnparseSummary {
    fn count(&mut self, binding: &Binding) {
        match binding {
            Binding::Unbound => self.unbound += 1,
            Binding::Foreign => self.foreign += 1,
            Binding::Resolved { .. } => self.resolved += 1,
            Binding::Orphaned { .. } => self.orphaned += 1,
            Binding::Menu { .. } => {}
        }
    }
}

/// Unparsed component tree of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct UnparsedMessage {
    /// Message the components came from
    message_id: MessageId,
    /// Rows in display order
    rows: Vec<UnparsedRow>,
}

impl UnparsedMessage {
    /// Tally bindings across every component and option.
    pub fn summary(&self) -> UnparseSummary {
        let mut summary = UnparseSummary::default();
        for component in self.rows.iter().flat_map(|row| row.components.iter()) {
            match component {
                UnparsedComponent::Button { binding, .. } => summary.count(binding),
                UnparsedComponent::SelectMenu {
                    binding, options, ..
                } => {
                    summary.count(binding);
                    for option in options {
                        summary.count(&option.binding);
                    }
                }
                UnparsedComponent::Raw { .. } => {}
            }
        }
        summary
    }
}

/// Rebuilds the editor view of a message's components.
#[derive(Debug, Clone, derive_new::new)]
pub struct ComponentUnparser {
    store: ActionSetStore,
}

impl ComponentUnparser {
    /// Unparse the component rows of `message_id`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the backend fails. Missing or unreadable
    /// sets are reported as [`Binding::Orphaned`] instead.
    #[instrument(skip(self, rows), fields(message_id = %message_id, rows = rows.len()))]
    pub async fn unparse(&self, message_id: MessageId, rows: &[ActionRow]) -> StoreResult<UnparsedMessage> {
        let mut unparsed_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut components = Vec::with_capacity(row.components.len());
            for component in &row.components {
                components.push(self.unparse_component(message_id, component).await?);
            }
            unparsed_rows.push(UnparsedRow { components });
        }

        let message = UnparsedMessage {
            message_id,
            rows: unparsed_rows,
        };
        let summary = message.summary();
        info!(
            resolved = summary.resolved,
            orphaned = summary.orphaned,
            foreign = summary.foreign,
            unbound = summary.unbound,
            "Unparsed components"
        );
        Ok(message)
    }

    async fn unparse_component(
        &self,
        message_id: MessageId,
        component: &Component,
    ) -> StoreResult<UnparsedComponent> {
        Ok(match component {
            Component::Button(button) => {
                let binding = match button.custom_id.as_deref() {
                    None => Binding::Unbound,
                    Some(identifier) => self.resolve(message_id, identifier).await?,
                };
                UnparsedComponent::Button {
                    button: button.clone(),
                    binding,
                }
            }
            Component::SelectMenu(menu) => match codec::decode(&menu.custom_id) {
                Err(e) => {
                    debug!(custom_id = %menu.custom_id, error = %e, "Foreign select menu");
                    UnparsedComponent::SelectMenu {
                        menu: menu.clone(),
                        binding: Binding::Foreign,
                        options: menu
                            .options
                            .iter()
                            .map(|option| UnparsedOption {
                                option: option.clone(),
                                binding: Binding::Foreign,
                            })
                            .collect(),
                    }
                }
                Ok(reference) => {
                    let mut options = Vec::with_capacity(menu.options.len());
                    for option in &menu.options {
                        options.push(UnparsedOption {
                            option: option.clone(),
                            binding: self.resolve(message_id, &option.value).await?,
                        });
                    }
                    UnparsedComponent::SelectMenu {
                        menu: menu.clone(),
                        binding: Binding::Menu { reference },
                        options,
                    }
                }
            },
            Component::Other(raw) => UnparsedComponent::Raw { raw: raw.clone() },
        })
    }

    async fn resolve(&self, message_id: MessageId, identifier: &str) -> StoreResult<Binding> {
        let reference = match codec::decode(identifier) {
            Ok(reference) => reference,
            Err(e) => {
                debug!(identifier, error = %e, "Foreign identifier");
                return Ok(Binding::Foreign);
            }
        };

        match self.store.load(message_id, reference.set_id()).await {
            Ok(set) => Ok(Binding::Resolved {
                reference,
                actions: set.into_actions(),
            }),
            Err(e) if e.is_not_found() => {
                debug!(set_id = %reference.set_id(), "Orphaned reference");
                Ok(Binding::Orphaned { reference })
            }
            Err(e) if e.is_unreadable() => {
                warn!(set_id = %reference.set_id(), error = %e, "Unreadable action set");
                Ok(Binding::Orphaned { reference })
            }
            Err(e) => Err(e),
        }
    }
}
