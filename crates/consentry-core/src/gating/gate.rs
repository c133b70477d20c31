//! Script and iframe gating.
//!
//! [`ScriptGate`] tracks gated elements discovered by scans or reported by
//! the host's insertion callback, evaluates each element's expression
//! against the current grant set, and flips elements between blocked and
//! active states.
//!
//! Scripts and frames deliberately behave differently once allowed: a
//! released script has executed and is never re-blocked (code cannot be
//! unexecuted), while a frame cycles freely between blocked and allowed as
//! consent changes.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::debug;

use crate::categories::ConsentCategories;
use crate::gating::expression::GatingExpression;
use crate::gating::host::{
    FrameHandle, HostDocument, InsertedNodes, ScriptHandle, ScriptSource, SubscriptionId,
};

/// Lifecycle state of a managed script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    /// Discovered but not yet evaluated.
    Pending,
    /// Evaluated false; executable source stripped.
    Blocked,
    /// Evaluated true; replacement element substituted and executed.
    /// Terminal.
    Released,
}

impl ScriptStatus {
    /// Returns the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStatus::Pending => "pending",
            ScriptStatus::Blocked => "blocked",
            ScriptStatus::Released => "released",
        }
    }
}

impl std::fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a managed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Discovered but not yet evaluated.
    Pending,
    /// Source removed, frame hidden.
    Blocked,
    /// Source live, frame shown.
    Allowed,
}

impl FrameStatus {
    /// Returns the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameStatus::Pending => "pending",
            FrameStatus::Blocked => "blocked",
            FrameStatus::Allowed => "allowed",
        }
    }
}

impl std::fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only summary of a managed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedScriptInfo {
    /// Source URL, or `[inline]`.
    pub source: String,
    /// Raw gating expression text.
    pub rules: String,
    /// Current lifecycle state.
    pub status: ScriptStatus,
}

/// Read-only summary of a managed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedFrameInfo {
    /// Source URL, or `[inline]` when the frame carries none.
    pub source: String,
    /// Raw gating expression text.
    pub rules: String,
    /// Current lifecycle state.
    pub status: FrameStatus,
}

struct ManagedScript {
    handle: Box<dyn ScriptHandle>,
    expression: GatingExpression,
    source: Option<ScriptSource>,
    status: ScriptStatus,
}

impl ManagedScript {
    fn register(handle: Box<dyn ScriptHandle>) -> Self {
        let expression = GatingExpression::parse(&handle.gating_rules().unwrap_or_default());
        let source = handle.source();
        Self {
            handle,
            expression,
            source,
            status: ScriptStatus::Pending,
        }
    }

    fn info(&self) -> ManagedScriptInfo {
        ManagedScriptInfo {
            source: self
                .source
                .as_ref()
                .map(ScriptSource::describe)
                .unwrap_or_else(|| "[inline]".to_string()),
            rules: self.expression.raw().to_string(),
            status: self.status,
        }
    }
}

struct ManagedFrame {
    handle: Box<dyn FrameHandle>,
    expression: GatingExpression,
    source: Option<String>,
    status: FrameStatus,
}

impl ManagedFrame {
    fn register(mut handle: Box<dyn FrameHandle>) -> Self {
        let expression = GatingExpression::parse(&handle.gating_rules().unwrap_or_default());
        let source = handle.src();
        // Frames are deduplicated across scans by the processed marker.
        handle.mark_processed();
        Self {
            handle,
            expression,
            source,
            status: FrameStatus::Pending,
        }
    }

    fn info(&self) -> ManagedFrameInfo {
        ManagedFrameInfo {
            source: self
                .source
                .clone()
                .unwrap_or_else(|| "[inline]".to_string()),
            rules: self.expression.raw().to_string(),
            status: self.status,
        }
    }
}

#[derive(Default)]
struct GateData {
    consent: ConsentCategories,
    scripts: Vec<ManagedScript>,
    frames: Vec<ManagedFrame>,
    subscription: Option<SubscriptionId>,
}

/// Gating engine over the host document.
///
/// Cheap to clone; clones share state, which is how the insertion callback
/// reaches the same registries as the owning handle.
#[derive(Clone, Default)]
pub struct ScriptGate {
    data: Arc<RwLock<GateData>>,
}

impl ScriptGate {
    /// Creates an empty gate with nothing optional granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grant set the gate currently evaluates against.
    pub fn consent(&self) -> ConsentCategories {
        self.data.read().unwrap().consent
    }

    /// Stores a new grant set and re-evaluates every tracked element.
    ///
    /// Returns the number of state transitions performed.
    pub fn apply_consent(&self, consent: ConsentCategories) -> usize {
        let mut data = self.data.write().unwrap();
        data.consent = consent;
        Self::settle_all(&mut data)
    }

    /// Re-evaluates every tracked element against the current grant set.
    ///
    /// Idempotent: a second call with no consent change performs no further
    /// transitions. Returns the number of transitions performed.
    pub fn evaluate(&self) -> usize {
        let mut data = self.data.write().unwrap();
        Self::settle_all(&mut data)
    }

    /// Pure grammar evaluation of an expression against the current grant
    /// set, independent of any tracked element.
    pub fn should_allow(&self, expression: &str) -> bool {
        let consent = self.data.read().unwrap().consent;
        GatingExpression::parse(expression).allows_categories(&consent)
    }

    /// Full-document scan for gated scripts.
    ///
    /// Replaces any prior scan results; elements already carrying the
    /// processed marker are skipped. Returns the number of tracked scripts.
    pub fn scan_scripts(&self, doc: &dyn HostDocument) -> usize {
        let handles = doc.gated_scripts();
        let mut data = self.data.write().unwrap();
        data.scripts = handles
            .into_iter()
            .filter(|handle| !handle.is_processed())
            .map(ManagedScript::register)
            .collect();
        debug!("tracking {} gated scripts", data.scripts.len());
        data.scripts.len()
    }

    /// Full-document scan for gated frames.
    ///
    /// Frames accumulate across scans; the processed marker set at
    /// registration prevents duplicate tracking. Returns the number of
    /// tracked frames.
    pub fn scan_frames(&self, doc: &dyn HostDocument) -> usize {
        let handles = doc.gated_frames();
        let mut data = self.data.write().unwrap();
        for handle in handles {
            if handle.is_processed() {
                continue;
            }
            data.frames.push(ManagedFrame::register(handle));
        }
        debug!("tracking {} gated frames", data.frames.len());
        data.frames.len()
    }

    /// Registers the insertion callback with the host document.
    ///
    /// Inserted elements are registered and evaluated synchronously within
    /// the host's mutation-processing step, so newly added content never has
    /// an unblocked window. Calling twice without `destroy` is a no-op.
    pub fn init_observer(&self, doc: &dyn HostDocument) {
        if self.data.read().unwrap().subscription.is_some() {
            return;
        }
        let gate = self.clone();
        let id = doc.subscribe(Box::new(move |inserted| gate.process_inserted(inserted)));
        self.data.write().unwrap().subscription = Some(id);
    }

    /// Removes the insertion callback. Tracked elements are kept.
    pub fn destroy(&self, doc: &dyn HostDocument) {
        let id = self.data.write().unwrap().subscription.take();
        if let Some(id) = id {
            doc.unsubscribe(id);
        }
    }

    /// Read-only summaries of tracked scripts.
    pub fn managed_scripts(&self) -> Vec<ManagedScriptInfo> {
        let data = self.data.read().unwrap();
        data.scripts.iter().map(ManagedScript::info).collect()
    }

    /// Read-only summaries of tracked frames.
    pub fn managed_frames(&self) -> Vec<ManagedFrameInfo> {
        let data = self.data.read().unwrap();
        data.frames.iter().map(ManagedFrame::info).collect()
    }

    fn process_inserted(&self, inserted: InsertedNodes) {
        let mut data = self.data.write().unwrap();
        let consent = data.consent;
        for handle in inserted.scripts {
            if handle.is_processed() {
                continue;
            }
            let mut script = ManagedScript::register(handle);
            Self::settle_script(&mut script, &consent);
            data.scripts.push(script);
        }
        for handle in inserted.frames {
            if handle.is_processed() {
                continue;
            }
            let mut frame = ManagedFrame::register(handle);
            Self::settle_frame(&mut frame, &consent);
            data.frames.push(frame);
        }
    }

    fn settle_all(data: &mut GateData) -> usize {
        let consent = data.consent;
        let mut transitions = 0;
        for script in &mut data.scripts {
            if Self::settle_script(script, &consent) {
                transitions += 1;
            }
        }
        for frame in &mut data.frames {
            if Self::settle_frame(frame, &consent) {
                transitions += 1;
            }
        }
        transitions
    }

    fn settle_script(script: &mut ManagedScript, consent: &ConsentCategories) -> bool {
        if script.status == ScriptStatus::Released {
            // Executed code cannot be unexecuted.
            return false;
        }
        let allowed = script.expression.allows_categories(consent);
        match (script.status, allowed) {
            (_, true) => {
                match &script.source {
                    Some(source) => script.handle.release(source),
                    None => script.handle.mark_processed(),
                }
                debug!(
                    "released gated script ({})",
                    script
                        .source
                        .as_ref()
                        .map(ScriptSource::describe)
                        .unwrap_or_else(|| "[inline]".to_string())
                );
                script.status = ScriptStatus::Released;
                true
            }
            (ScriptStatus::Pending, false) => {
                script.handle.neutralize();
                script.status = ScriptStatus::Blocked;
                true
            }
            (_, false) => false,
        }
    }

    fn settle_frame(frame: &mut ManagedFrame, consent: &ConsentCategories) -> bool {
        let allowed = frame.expression.allows_categories(consent);
        match (frame.status, allowed) {
            (FrameStatus::Allowed, true) | (FrameStatus::Blocked, false) => false,
            (_, false) => {
                frame.handle.block();
                frame.status = FrameStatus::Blocked;
                true
            }
            (_, true) => {
                frame.handle.allow(frame.source.as_deref());
                frame.status = FrameStatus::Allowed;
                true
            }
        }
    }
}
