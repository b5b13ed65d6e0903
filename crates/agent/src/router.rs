use anyhow::Result;
use hrdesk_core::config::DispatchPolicy;
use hrdesk_core::domain::ConversationRecord;
use hrdesk_core::flows::FlowKind;
use tracing::{debug, info};

use crate::nlu::{Classification, IntentRecognizer, BOOK_SICK_DAY, BOOK_VACATION, GIVE_MY_NAME};

pub const WELCOME_PROMPT: &str =
    "Welcome to HR Management Program, Lets start with knowing who you are, please enter your name ?";
pub const RESTART_PROMPT: &str = "Lets start over, please enter your name";
pub const WHAT_ELSE_PROMPT: &str = "So what else I can do for you ?";
pub const INVALID_NAME_MESSAGE: &str = "the name you entered is not valid.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepromptReason {
    InvalidName,
    UnsupportedIntent,
}

impl RepromptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::UnsupportedIntent => "unsupported_intent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterDecision {
    /// Stay at the router's initial state after sending `messages`.
    Reprompt { reason: RepromptReason, messages: Vec<String> },
    /// Hand the session to a booking flow seeded with `record`.
    StartFlow { flow: FlowKind, record: ConversationRecord },
}

/// Classifies the opening utterance of a session and picks a booking flow.
pub struct DialogRouter<R> {
    recognizer: R,
    dispatch: DispatchPolicy,
}

impl<R> DialogRouter<R>
where
    R: IntentRecognizer,
{
    pub fn new(recognizer: R, dispatch: DispatchPolicy) -> Self {
        Self { recognizer, dispatch }
    }

    /// The prompt that opens the router's initial state. `restart` replaces
    /// the welcome text when the router loops back.
    pub fn intro_prompt(&self, restart: Option<&str>) -> String {
        restart.unwrap_or(WELCOME_PROMPT).to_owned()
    }

    pub async fn route(&self, raw_text: &str) -> Result<RouterDecision> {
        let classification = self.recognizer.classify(raw_text).await?;
        debug!(
            event_name = "router.classified",
            intent = %classification.intent,
            has_name = classification.name().is_some(),
            "utterance classified"
        );

        let Some(flow) = self.flow_for_intent(&classification.intent) else {
            info!(
                event_name = "router.intent_unsupported",
                intent = %classification.intent,
                "unsupported intent, restarting router"
            );
            return Ok(RouterDecision::Reprompt {
                reason: RepromptReason::UnsupportedIntent,
                messages: vec![
                    format!(
                        "Sorry, I didn't get that. Please try asking in a different way (intent was {})",
                        classification.intent
                    ),
                    self.intro_prompt(Some(RESTART_PROMPT)),
                ],
            });
        };

        Ok(self.start_or_reject(flow, &classification))
    }

    /// Acknowledges a finished flow and loops back to the initial state.
    pub fn complete(&self, record: &ConversationRecord) -> Vec<String> {
        vec![
            format!("I have you as a valid employee in my list {}", record.name_or_default()),
            self.intro_prompt(Some(WHAT_ELSE_PROMPT)),
        ]
    }

    fn flow_for_intent(&self, intent: &str) -> Option<FlowKind> {
        match (self.dispatch, intent) {
            (_, GIVE_MY_NAME) => Some(FlowKind::Vacation),
            (DispatchPolicy::ByIntent, BOOK_VACATION) => Some(FlowKind::Vacation),
            (DispatchPolicy::ByIntent, BOOK_SICK_DAY) => Some(FlowKind::SickDay),
            _ => None,
        }
    }

    fn start_or_reject(&self, flow: FlowKind, classification: &Classification) -> RouterDecision {
        match classification.name() {
            Some(name) => {
                info!(event_name = "router.flow_started", flow = flow.as_str(), "starting flow");
                RouterDecision::StartFlow { flow, record: ConversationRecord::with_name(name) }
            }
            None => {
                info!(event_name = "router.name_invalid", "name slot empty, restarting router");
                RouterDecision::Reprompt {
                    reason: RepromptReason::InvalidName,
                    messages: vec![
                        INVALID_NAME_MESSAGE.to_owned(),
                        self.intro_prompt(Some(RESTART_PROMPT)),
                    ],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use hrdesk_core::config::DispatchPolicy;
    use hrdesk_core::domain::ConversationRecord;
    use hrdesk_core::flows::FlowKind;

    use super::{DialogRouter, RepromptReason, RouterDecision, INVALID_NAME_MESSAGE};
    use crate::nlu::{
        Classification, IntentRecognizer, KeywordRecognizer, BOOK_SICK_DAY, GIVE_MY_NAME,
    };

    /// Returns canned classifications keyed by exact utterance.
    struct CannedRecognizer {
        answers: HashMap<&'static str, Classification>,
    }

    #[async_trait]
    impl IntentRecognizer for CannedRecognizer {
        async fn classify(&self, text: &str) -> Result<Classification> {
            self.answers.get(text).cloned().ok_or_else(|| anyhow!("no canned answer for `{text}`"))
        }
    }

    fn canned(entries: &[(&'static str, Classification)]) -> CannedRecognizer {
        CannedRecognizer { answers: entries.iter().cloned().collect() }
    }

    #[tokio::test]
    async fn empty_name_slot_reprompts_without_record() {
        let router = DialogRouter::new(
            canned(&[("   ", Classification::new(GIVE_MY_NAME, Some(String::new())))]),
            DispatchPolicy::VacationOnly,
        );

        let decision = router.route("   ").await.expect("route");

        match decision {
            RouterDecision::Reprompt { reason, messages } => {
                assert_eq!(reason, RepromptReason::InvalidName);
                assert_eq!(messages[0], INVALID_NAME_MESSAGE);
                assert!(messages[1].contains("start over"));
            }
            RouterDecision::StartFlow { .. } => panic!("no record may be created"),
        }
    }

    #[tokio::test]
    async fn recognized_name_starts_vacation_flow() {
        let router = DialogRouter::new(KeywordRecognizer::default(), DispatchPolicy::VacationOnly);

        let decision = router.route("my name is Alice").await.expect("route");

        assert_eq!(
            decision,
            RouterDecision::StartFlow {
                flow: FlowKind::Vacation,
                record: ConversationRecord::with_name("Alice"),
            }
        );
    }

    #[tokio::test]
    async fn vacation_only_ignores_sick_day_intent() {
        let router = DialogRouter::new(
            canned(&[
                ("sick", Classification::new(BOOK_SICK_DAY, Some("Bob".to_owned()))),
                ("bob", Classification::new(GIVE_MY_NAME, Some("Bob".to_owned()))),
            ]),
            DispatchPolicy::VacationOnly,
        );

        let sick = router.route("sick").await.expect("route");
        assert!(matches!(
            sick,
            RouterDecision::Reprompt { reason: RepromptReason::UnsupportedIntent, .. }
        ));

        let named = router.route("bob").await.expect("route");
        assert!(matches!(named, RouterDecision::StartFlow { flow: FlowKind::Vacation, .. }));
    }

    #[tokio::test]
    async fn by_intent_dispatches_sick_day_flow() {
        let router = DialogRouter::new(
            KeywordRecognizer::default().with_booking_intents(true),
            DispatchPolicy::ByIntent,
        );

        let decision = router.route("I'm Bob and I feel sick").await.expect("route");

        assert!(matches!(decision, RouterDecision::StartFlow { flow: FlowKind::SickDay, .. }));
    }

    #[tokio::test]
    async fn unsupported_intent_names_the_intent() {
        let router = DialogRouter::new(KeywordRecognizer::default(), DispatchPolicy::VacationOnly);

        let decision = router.route("what is the weather").await.expect("route");

        let RouterDecision::Reprompt { reason, messages } = decision else {
            panic!("expected a reprompt");
        };
        assert_eq!(reason, RepromptReason::UnsupportedIntent);
        assert!(messages[0].contains("intent was None"));
    }

    #[tokio::test]
    async fn recognizer_errors_propagate() {
        let router = DialogRouter::new(canned(&[]), DispatchPolicy::VacationOnly);

        assert!(router.route("anything").await.is_err());
    }

    #[test]
    fn completion_acknowledges_and_loops_back() {
        let router = DialogRouter::new(KeywordRecognizer::default(), DispatchPolicy::VacationOnly);

        let messages = router.complete(&ConversationRecord::with_name("Alice"));

        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("Alice"));
        assert_eq!(messages[1], "So what else I can do for you ?");
    }
}
