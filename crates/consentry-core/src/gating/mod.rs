//! Element gating: expression grammar, host-document seam, and the gate.

mod expression;
mod gate;
mod host;

pub use expression::GatingExpression;
pub use gate::{FrameStatus, ManagedFrameInfo, ManagedScriptInfo, ScriptGate, ScriptStatus};
pub use host::{
    FrameHandle, HostDocument, InsertedNodes, InsertionCallback, ScriptHandle, ScriptSource,
    SubscriptionId,
};
