use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::{ValidationConfig, ValidationMode};
use crate::domain::ConversationRecord;

/// Decides whether an employee code belongs to the employee in `record`.
///
/// The turn engine stores the verdict in `ConversationRecord::is_validated`
/// and never raises that flag on its own.
pub trait CodeValidator: Send + Sync {
    fn validate(&self, record: &ConversationRecord, code: &str) -> bool;
}

/// Rejects every code. A flow driven by this validator re-prompts for the
/// code indefinitely.
#[derive(Clone, Debug, Default)]
pub struct RejectAll;

impl CodeValidator for RejectAll {
    fn validate(&self, _record: &ConversationRecord, _code: &str) -> bool {
        false
    }
}

#[derive(Clone, Debug, Default)]
pub struct AcceptAll;

impl CodeValidator for AcceptAll {
    fn validate(&self, _record: &ConversationRecord, code: &str) -> bool {
        !code.trim().is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct AllowList {
    codes: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|code| normalize_code(&code.into()))
                .filter(|code| !code.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl CodeValidator for AllowList {
    fn validate(&self, _record: &ConversationRecord, code: &str) -> bool {
        self.codes.contains(&normalize_code(code))
    }
}

/// Accepts a code only once it has been offered `attempts` times. Useful for
/// driving the re-prompt path deterministically.
#[derive(Debug)]
pub struct AcceptAfterAttempts {
    attempts: usize,
    seen: AtomicUsize,
}

impl AcceptAfterAttempts {
    pub fn new(attempts: usize) -> Self {
        Self { attempts, seen: AtomicUsize::new(0) }
    }
}

impl CodeValidator for AcceptAfterAttempts {
    fn validate(&self, _record: &ConversationRecord, _code: &str) -> bool {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        seen >= self.attempts
    }
}

pub fn validator_from_config(config: &ValidationConfig) -> Arc<dyn CodeValidator> {
    match config.mode {
        ValidationMode::AcceptAll => Arc::new(AcceptAll),
        ValidationMode::RejectAll => Arc::new(RejectAll),
        ValidationMode::AllowList => Arc::new(AllowList::new(config.codes.iter().cloned())),
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
