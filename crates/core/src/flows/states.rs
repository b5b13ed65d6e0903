use serde::{Deserialize, Serialize};

use crate::domain::{ActivityKind, ConversationRecord, RecordField};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Vacation,
    SickDay,
}

impl FlowKind {
    pub fn activity(&self) -> ActivityKind {
        match self {
            Self::Vacation => ActivityKind::Vacation,
            Self::SickDay => ActivityKind::SickDay,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::SickDay => "sick_day",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStep {
    AskName,
    AskCode,
    ValidateCode,
    AskActivity,
    AskDuration,
    AskConfirmation,
    Finalized,
}

impl TurnStep {
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::AskName => Some(Self::AskCode),
            Self::AskCode => Some(Self::ValidateCode),
            Self::ValidateCode => Some(Self::AskActivity),
            Self::AskActivity => Some(Self::AskDuration),
            Self::AskDuration => Some(Self::AskConfirmation),
            Self::AskConfirmation => Some(Self::Finalized),
            Self::Finalized => None,
        }
    }

    /// The record field this step is responsible for populating.
    pub fn target(&self) -> Option<RecordField> {
        match self {
            Self::AskName => Some(RecordField::Name),
            Self::AskCode => Some(RecordField::EmployeeCode),
            Self::ValidateCode => Some(RecordField::Validation),
            Self::AskActivity => Some(RecordField::ActivityKind),
            Self::AskDuration => Some(RecordField::Duration),
            Self::AskConfirmation => Some(RecordField::Confirmed),
            Self::Finalized => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

/// Result of advancing a booking flow by one turn.
///
/// `prompts` is ordered and is sent as-is before the next reply is awaited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub flow: FlowKind,
    pub from: TurnStep,
    pub to: TurnStep,
    pub prompts: Vec<String>,
    pub record: ConversationRecord,
    pub terminal: bool,
}
