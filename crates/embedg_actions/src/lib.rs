//! Runtime for interactive message components.
//!
//! This crate stores the action sets behind buttons and select options,
//! rebuilds editor documents from live messages, and executes action sets
//! when a user interacts with a component:
//!
//! - [`ActionSetStore`]: action set persistence over any [`KeyValueStore`],
//!   with [`MemoryStore`] and [`FileStore`] backends, opened from settings
//!   by [`open_action_sets`]
//! - [`ComponentUnparser`]: live component tree to editor view
//! - [`Dispatcher`]: decode, resolve, authorize, execute and report
//! - [`MessageExporter`] and [`SharedMessageStore`]: restore links
//!
//! Discord is reached only through the [`Platform`] trait.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backend;
mod config;
mod cooldown;
mod dispatch;
mod event;
mod export;
mod file_store;
mod outcome;
mod permission;
mod platform;
mod store;
mod unparse;

pub use backend::{StoreHandle, open_action_sets};
pub use config::{
    AppSettings, DispatchSettings, EmbedgConfig, StoreBackend, StoreSettings, load_seed_file,
};
pub use cooldown::CooldownTracker;
pub use dispatch::{
    ALREADY_USED_TEXT, DEFAULT_SUCCESS_TEXT, Dispatcher, GENERIC_FAILURE_TEXT,
    NO_LONGER_EXISTS_TEXT, NOT_RECOGNIZED_TEXT, refusal_text,
};
pub use event::{ComponentEvent, ComponentEventBuilder, ComponentEventBuilderError, ComponentKind};
pub use export::{
    MessageExport, MessageExporter, MessageReference, SharedMessage, SharedMessageStore,
    parse_message_reference,
};
pub use file_store::FileStore;
pub use outcome::{ActionResult, ActionStatus, ExecutionOutcome, FailureReason, Report};
pub use permission::RoleGuard;
pub use platform::{
    InteractionHandle, MAX_CONTENT_LEN, MAX_EMBEDS, Platform, PlatformMessage, Reply, RoleHierarchy,
};
pub use store::{
    ActionSetDocument, ActionSetStore, DOCUMENT_VERSION, KeyValueStore, MemoryStore, index_key,
    set_key,
};
pub use unparse::{
    Binding, ComponentUnparser, UnparseSummary, UnparsedComponent, UnparsedMessage, UnparsedOption,
    UnparsedRow,
};
