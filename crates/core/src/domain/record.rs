use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Vacation,
    SickDay,
}

impl ActivityKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::SickDay => "sick",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Yes,
    No,
    Unset,
}

impl Confirmation {
    /// Maps a free-form reply onto a confirmation answer. Anything that is not
    /// a recognizable yes or no is `Unset`.
    pub fn parse(reply: &str) -> Self {
        let normalized = reply.trim().trim_end_matches(['.', '!']).to_ascii_lowercase();
        match normalized.as_str() {
            "yes" | "y" | "yeah" | "yep" | "sure" | "ok" | "okay" | "confirm" => Self::Yes,
            "no" | "n" | "nope" => Self::No,
            _ => Self::Unset,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Yes | Self::No)
    }
}

/// Fields of a [`ConversationRecord`] in the order they must be populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Name,
    EmployeeCode,
    Validation,
    ActivityKind,
    Duration,
    Confirmed,
}

impl RecordField {
    pub const ORDER: [RecordField; 6] = [
        Self::Name,
        Self::EmployeeCode,
        Self::Validation,
        Self::ActivityKind,
        Self::Duration,
        Self::Confirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::EmployeeCode => "employee_code",
            Self::Validation => "is_validated",
            Self::ActivityKind => "activity_kind",
            Self::Duration => "duration",
            Self::Confirmed => "confirmed",
        }
    }
}

/// Session-scoped state collected by a booking flow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub name: Option<String>,
    pub employee_code: Option<String>,
    pub is_validated: bool,
    pub activity_kind: Option<ActivityKind>,
    pub duration: Option<String>,
    pub confirmed: Option<Confirmation>,
}

impl ConversationRecord {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn is_populated(&self, field: RecordField) -> bool {
        match field {
            RecordField::Name => self.name.is_some(),
            RecordField::EmployeeCode => self.employee_code.is_some(),
            RecordField::Validation => self.is_validated,
            RecordField::ActivityKind => self.activity_kind.is_some(),
            RecordField::Duration => self.duration.is_some(),
            RecordField::Confirmed => self.confirmed.is_some(),
        }
    }

    /// Returns the first populated field that has an unpopulated predecessor,
    /// paired with that predecessor.
    pub fn ordering_violation(&self) -> Option<(RecordField, RecordField)> {
        let mut first_gap = None;
        for field in RecordField::ORDER {
            let populated = self.is_populated(field);
            match first_gap {
                None if !populated => first_gap = Some(field),
                Some(gap) if populated => return Some((field, gap)),
                _ => {}
            }
        }
        None
    }

    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or("there")
    }

    pub fn activity_label(&self) -> &'static str {
        self.activity_kind.map(|kind| kind.label()).unwrap_or("time off")
    }

    pub fn duration_or_default(&self) -> &str {
        self.duration.as_deref().unwrap_or("an unspecified period")
    }
}
