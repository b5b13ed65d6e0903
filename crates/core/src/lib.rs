pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod validation;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use domain::{ActivityKind, Confirmation, ConversationRecord, RecordField};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    BookingFlow, FlowDefinition, FlowKind, TurnEngine, TurnError, TurnOutcome, TurnStep,
};
pub use validation::{validator_from_config, AcceptAll, AllowList, CodeValidator, RejectAll};
