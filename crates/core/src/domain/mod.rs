pub mod record;

pub use record::{ActivityKind, Confirmation, ConversationRecord, RecordField};
