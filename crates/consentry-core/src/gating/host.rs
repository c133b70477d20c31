//! Host-document seam.
//!
//! The gating engine never touches a real document model. It drives boxed
//! element handles behind [`ScriptHandle`] and [`FrameHandle`], and learns
//! about dynamically inserted content through a callback registered with
//! [`HostDocument::subscribe`], the host's native subtree-insertion
//! notification mechanism, whatever that is.

/// Captured source of a gated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// External source URL.
    External(String),
    /// Inline payload text.
    Inline(String),
}

impl ScriptSource {
    /// Display form used in summaries: the URL, or `[inline]`.
    pub fn describe(&self) -> String {
        match self {
            ScriptSource::External(url) => url.clone(),
            ScriptSource::Inline(_) => "[inline]".to_string(),
        }
    }
}

impl std::fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// A gated script element in the host document.
///
/// Gated scripts must be inert as authored (the usual pattern is a
/// non-executable type plus the gating attribute); the gate decides whether
/// they ever run.
pub trait ScriptHandle: Send + Sync {
    /// Raw gating attribute value, if present.
    fn gating_rules(&self) -> Option<String>;

    /// The script's source, external or inline.
    fn source(&self) -> Option<ScriptSource>;

    /// Whether the element carries the processed marker.
    fn is_processed(&self) -> bool;

    /// Tags the element so rescans skip it.
    fn mark_processed(&mut self);

    /// Strips the executable source/markup so the host cannot run it.
    ///
    /// The handle must keep reporting the original payload from [`source`]
    /// (hosts typically stash it in a data attribute) so a later release can
    /// still happen after a rescan.
    ///
    /// [`source`]: ScriptHandle::source
    fn neutralize(&mut self);

    /// Substitutes a fresh executable element carrying the given source in
    /// place of this one, tagged processed so it is not re-scanned. The host
    /// executes or loads it as a consequence.
    fn release(&mut self, source: &ScriptSource);
}

/// A gated iframe element in the host document.
///
/// [`src`] must report the frame's intended source whether it is live or
/// deferred in the markup (e.g. held in a data attribute).
///
/// [`src`]: FrameHandle::src
pub trait FrameHandle: Send + Sync {
    /// Raw gating attribute value, if present.
    fn gating_rules(&self) -> Option<String>;

    /// The frame's intended source URL.
    fn src(&self) -> Option<String>;

    /// Whether the element carries the processed marker.
    fn is_processed(&self) -> bool;

    /// Tags the element so rescans skip it.
    fn mark_processed(&mut self);

    /// Removes the live source and hides the frame so nothing loads.
    fn block(&mut self);

    /// Restores the given source (if any), shows the frame and drops any
    /// placeholder.
    fn allow(&mut self, src: Option<&str>);
}

/// Identifier for an insertion subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Gated elements discovered in a newly inserted subtree.
pub struct InsertedNodes {
    /// Gated scripts, including the inserted node itself when it qualifies.
    pub scripts: Vec<Box<dyn ScriptHandle>>,
    /// Gated frames, likewise.
    pub frames: Vec<Box<dyn FrameHandle>>,
}

/// Callback invoked by the host for every newly inserted subtree.
pub type InsertionCallback = Box<dyn Fn(InsertedNodes) + Send + Sync>;

/// The document model as seen by the gating engine.
pub trait HostDocument {
    /// All elements carrying the gating attribute, processed or not; the
    /// gate filters by the processed marker itself.
    fn gated_scripts(&self) -> Vec<Box<dyn ScriptHandle>>;

    /// All gated frames, processed or not.
    fn gated_frames(&self) -> Vec<Box<dyn FrameHandle>>;

    /// Registers an insertion callback. The host must invoke it
    /// synchronously within its own mutation-processing step for every
    /// inserted subtree containing gated descendants.
    ///
    /// Mutations caused by the gate itself (releasing a script substitutes a
    /// node) must be queued for the host's next mutation-processing turn,
    /// never delivered reentrantly from inside a handle operation.
    fn subscribe(&self, callback: InsertionCallback) -> SubscriptionId;

    /// Removes a previously registered callback. Unknown ids are a no-op.
    fn unsubscribe(&self, id: SubscriptionId);
}
