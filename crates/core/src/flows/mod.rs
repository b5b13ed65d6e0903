pub mod engine;
pub mod states;

pub use engine::{BookingFlow, FlowDefinition, PromptTemplates, TurnEngine, TurnError};
pub use states::{FlowKind, TurnOutcome, TurnStep};
