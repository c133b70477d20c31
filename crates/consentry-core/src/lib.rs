//! Consentry Core - Consent state, element gating, and geo detection.
//!
//! This crate is the engine behind the Consentry consent widget. It handles:
//!
//! - The five-category consent decision and its derived views
//! - Persisted-record normalization and legacy-schema migration
//! - Decision orchestration (persist, gate, consumer callbacks)
//! - Script/iframe gating driven by category expressions
//! - Best-effort region detection for choosing a default consent mode
//!
//! Presentation (dialogs, buttons, theming) and the concrete storage
//! backends live elsewhere; this crate talks to them through the
//! [`HostDocument`] and [`ConsentStore`] seams.

pub mod categories;
pub mod gating;
pub mod geo;
pub mod manager;
pub mod state;

pub use categories::{
    Category, CategoryOverrides, ConsentCategories, ConsentSnapshot, ConsentStatus, ConsentView,
    LegacySnapshot,
};
pub use gating::{
    FrameHandle, FrameStatus, GatingExpression, HostDocument, InsertedNodes, InsertionCallback,
    ManagedFrameInfo, ManagedScriptInfo, ScriptGate, ScriptHandle, ScriptSource, ScriptStatus,
    SubscriptionId,
};
pub use geo::{ConsentMode, GeoDetector, GeoHints};
pub use manager::{
    ConsentError, ConsentHooks, ConsentManager, ConsentOptions, ConsentStore, HookFuture,
};
pub use state::{ConsentState, StoredConsent, SCHEMA_VERSION};
