//! Consent decision management.
//!
//! [`ConsentManager`] is the single authority over the current five-category
//! decision. It mediates between the storage seam ([`ConsentStore`]), the
//! gating engine, and the consumer's accept/reject/save callbacks.
//!
//! Within one decision operation the order is fixed: state mutation, then
//! persistence, then gating re-evaluation, then callback. The operation
//! does not complete until the callback future has settled.
//!
//! ## Usage
//!
//! ```
//! use std::sync::{Arc, RwLock};
//!
//! use consentry_core::{
//!     Category, CategoryOverrides, ConsentManager, ConsentState, ConsentStatus, ConsentStore,
//!     StoredConsent,
//! };
//!
//! #[derive(Default)]
//! struct MemoryStore(RwLock<Option<ConsentState>>);
//!
//! impl ConsentStore for MemoryStore {
//!     fn save(&self, state: &ConsentState) -> bool {
//!         *self.0.write().unwrap() = Some(state.clone());
//!         true
//!     }
//!     fn load(&self) -> Option<StoredConsent> {
//!         self.0.read().unwrap().as_ref().map(StoredConsent::from)
//!     }
//!     fn clear(&self) {
//!         *self.0.write().unwrap() = None;
//!     }
//! }
//!
//! let manager = ConsentManager::new(Arc::new(MemoryStore::default()));
//! assert!(!manager.is_allowed(Category::Analytics));
//!
//! futures::executor::block_on(async {
//!     let overrides = CategoryOverrides::new().with_analytics(true);
//!     manager.save_preferences(overrides).await.unwrap();
//! });
//!
//! assert!(manager.is_allowed(Category::Analytics));
//! assert_eq!(manager.status(), ConsentStatus::Partial);
//! ```

use std::future::Future;
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::categories::{
    Category, CategoryOverrides, ConsentCategories, ConsentSnapshot, ConsentStatus, ConsentView,
};
use crate::gating::ScriptGate;
use crate::state::{ConsentState, StoredConsent, SCHEMA_VERSION};

/// Consent operation errors.
#[derive(Debug, Error)]
pub enum ConsentError {
    /// A consumer-supplied callback failed. Storage failures never surface
    /// here; they degrade to a no-op inside the store.
    #[error("consent callback failed: {0}")]
    Hook(#[source] anyhow::Error),
}

/// Result type for consent operations.
pub type Result<T> = std::result::Result<T, ConsentError>;

/// The persistence seam the manager writes through.
///
/// Implementations absorb their own backend failures: `save` reports success
/// as a plain bool, `load` answers `None` for absent or unreadable records,
/// and `clear` is idempotent. None of the methods may panic or error.
pub trait ConsentStore: Send + Sync {
    /// Persists a complete record. Returns false when the backend write
    /// failed (and was logged); never propagates.
    fn save(&self, state: &ConsentState) -> bool;

    /// Reads whatever record the backend holds, unnormalized.
    fn load(&self) -> Option<StoredConsent>;

    /// Removes the record. Calling with nothing stored is a no-op.
    fn clear(&self);
}

/// Future type returned by consent callbacks.
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

type ConsentHook = Box<dyn Fn(ConsentView) -> HookFuture + Send + Sync>;

/// Consumer callbacks for the three decision outcomes.
///
/// Each callback receives the categories view (full or legacy-shaped,
/// depending on [`ConsentOptions::legacy_callbacks`]) and may return any
/// future; the triggering operation awaits it.
#[derive(Default)]
pub struct ConsentHooks {
    accept: Option<ConsentHook>,
    reject: Option<ConsentHook>,
    save: Option<ConsentHook>,
}

impl ConsentHooks {
    /// Creates an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the accept-all callback.
    pub fn on_accept<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ConsentView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.accept = Some(Box::new(move |view| -> HookFuture { Box::pin(hook(view)) }));
        self
    }

    /// Sets the reject-all callback.
    pub fn on_reject<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ConsentView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.reject = Some(Box::new(move |view| -> HookFuture { Box::pin(hook(view)) }));
        self
    }

    /// Sets the save-preferences callback.
    pub fn on_save<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ConsentView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.save = Some(Box::new(move |view| -> HookFuture { Box::pin(hook(view)) }));
        self
    }
}

/// Manager configuration. Every field has a concrete default; construction
/// is plain struct update, not option-bag merging.
#[derive(Debug, Clone, Copy)]
pub struct ConsentOptions {
    /// Generate a stable v4 consent id on the first successful persist.
    pub enable_consent_id: bool,
    /// Hand callbacks the collapsed three-category legacy view instead of
    /// the full five-category one. Storage is unaffected.
    pub legacy_callbacks: bool,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            enable_consent_id: true,
            legacy_callbacks: false,
        }
    }
}

#[derive(Debug, Default)]
struct ManagerData {
    categories: ConsentCategories,
    consent_id: Option<Uuid>,
    decided: bool,
}

enum Decision {
    Accept,
    Reject,
    Save,
}

/// Single authority over the current consent decision.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConsentManager {
    data: Arc<RwLock<ManagerData>>,
    store: Arc<dyn ConsentStore>,
    hooks: Arc<ConsentHooks>,
    gate: Option<ScriptGate>,
    options: ConsentOptions,
}

impl ConsentManager {
    /// Creates a manager over the given store with default options, no
    /// hooks, and no gate.
    pub fn new(store: Arc<dyn ConsentStore>) -> Self {
        Self {
            data: Arc::new(RwLock::new(ManagerData::default())),
            store,
            hooks: Arc::new(ConsentHooks::default()),
            gate: None,
            options: ConsentOptions::default(),
        }
    }

    /// Sets the manager options.
    pub fn with_options(mut self, options: ConsentOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the consumer callbacks.
    pub fn with_hooks(mut self, hooks: ConsentHooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Attaches a gating engine; decision operations re-evaluate it after
    /// persisting.
    pub fn with_gate(mut self, gate: ScriptGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The attached gating engine, if any.
    pub fn gate(&self) -> Option<&ScriptGate> {
        self.gate.as_ref()
    }

    /// Loads the stored decision, if any.
    ///
    /// Absent or unreadable records leave the manager untouched and return
    /// `None`. A legacy record (no version tag) is migrated (`necessary`,
    /// `analytics` and `marketing` carried over, `functional` and
    /// `preferences` defaulted false, version stamped) and the migrated
    /// record is persisted immediately, preserving its original timestamp.
    pub fn load(&self) -> Option<ConsentState> {
        let stored = self.store.load()?;
        let legacy = stored.is_legacy();
        let state = stored.normalize();

        {
            let mut data = self.data.write().unwrap();
            data.categories = state.categories();
            data.consent_id = state.consent_id;
            data.decided = true;
        }
        if legacy {
            debug!("migrating legacy consent record to schema {SCHEMA_VERSION}");
            self.store.save(&state);
        }
        self.sync_gate();
        Some(state)
    }

    /// Grants every category, persists, re-evaluates gating, and awaits the
    /// accept callback.
    pub async fn accept_all(&self) -> Result<ConsentState> {
        let state = {
            let mut data = self.data.write().unwrap();
            data.categories = ConsentCategories::all_granted();
            self.persist(&mut data)
        };
        self.sync_gate();
        self.run_hook(Decision::Accept, state.categories()).await?;
        Ok(state)
    }

    /// Grants only `necessary`, persists, re-evaluates gating, and awaits
    /// the reject callback.
    pub async fn reject_all(&self) -> Result<ConsentState> {
        let state = {
            let mut data = self.data.write().unwrap();
            data.categories = ConsentCategories::none();
            self.persist(&mut data)
        };
        self.sync_gate();
        self.run_hook(Decision::Reject, state.categories()).await?;
        Ok(state)
    }

    /// Merges the supplied overrides into the current decision, persists,
    /// re-evaluates gating, and awaits the save callback. Omitted categories
    /// keep their previous value; `necessary` cannot be overridden.
    pub async fn save_preferences(&self, overrides: CategoryOverrides) -> Result<ConsentState> {
        let state = {
            let mut data = self.data.write().unwrap();
            data.categories.apply(&overrides);
            self.persist(&mut data)
        };
        self.sync_gate();
        self.run_hook(Decision::Save, state.categories()).await?;
        Ok(state)
    }

    /// Erases the stored record and returns the manager to the undecided
    /// state: nothing optional granted, consent id dropped. Re-applies the
    /// cleared grant set to the gate. Invokes no callback.
    pub fn reset(&self) {
        self.store.clear();
        {
            let mut data = self.data.write().unwrap();
            *data = ManagerData::default();
        }
        self.sync_gate();
    }

    /// Defensive copy of the current grant set.
    pub fn categories(&self) -> ConsentSnapshot {
        self.data.read().unwrap().categories.snapshot()
    }

    /// Whether the given category is currently granted. Pure in-memory
    /// lookup; storage is not consulted.
    pub fn is_allowed(&self, category: Category) -> bool {
        self.data.read().unwrap().categories.is_granted(category)
    }

    /// Classifies the current decision by its four optional categories.
    pub fn status(&self) -> ConsentStatus {
        self.data.read().unwrap().categories.status()
    }

    /// The stable consent identifier, once one has been persisted.
    pub fn consent_id(&self) -> Option<Uuid> {
        self.data.read().unwrap().consent_id
    }

    /// Whether a decision has been made (loaded or taken) this session.
    pub fn has_decision(&self) -> bool {
        self.data.read().unwrap().decided
    }

    fn persist(&self, data: &mut ManagerData) -> ConsentState {
        let minted = if self.options.enable_consent_id && data.consent_id.is_none() {
            data.consent_id = Some(Uuid::new_v4());
            true
        } else {
            false
        };

        let mut state = ConsentState::new(data.categories, data.consent_id);
        if !self.store.save(&state) && minted {
            // The id counts as assigned only once a persist succeeds; roll
            // the candidate back so the next persist tries again.
            data.consent_id = None;
            state.consent_id = None;
        }
        data.decided = true;
        state
    }

    fn sync_gate(&self) {
        if let Some(gate) = &self.gate {
            let categories = self.data.read().unwrap().categories;
            gate.apply_consent(categories);
        }
    }

    async fn run_hook(&self, decision: Decision, categories: ConsentCategories) -> Result<()> {
        let hook = match decision {
            Decision::Accept => &self.hooks.accept,
            Decision::Reject => &self.hooks.reject,
            Decision::Save => &self.hooks.save,
        };
        if let Some(hook) = hook {
            let view = if self.options.legacy_callbacks {
                ConsentView::Legacy(categories.legacy_snapshot())
            } else {
                ConsentView::Full(categories.snapshot())
            };
            hook(view).await.map_err(ConsentError::Hook)?;
        }
        Ok(())
    }
}
