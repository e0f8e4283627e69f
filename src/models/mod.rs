pub mod activation;
pub mod context;
pub mod distraction;
pub mod objective;

pub use activation::ActivationEvent;
pub use context::{ContextEdge, ContextNode, ContextType, EdgeType};
pub use distraction::{DistractionEvent, DistractionOutcome};
pub use objective::{EndReason, Objective};
