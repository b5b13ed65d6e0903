use std::collections::HashMap;
use std::sync::Arc;

use hrdesk_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use hrdesk_core::config::{AppConfig, DispatchPolicy, NluProvider};
use hrdesk_core::domain::ConversationRecord;
use hrdesk_core::errors::ApplicationError;
use hrdesk_core::flows::{BookingFlow, FlowKind, TurnEngine, TurnStep};
use hrdesk_core::validation::{validator_from_config, CodeValidator};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interrupts::{InterruptDecision, InterruptPolicy};
use crate::nlu::{IntentRecognizer, KeywordRecognizer};
use crate::router::{DialogRouter, RouterDecision, RESTART_PROMPT};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the utterance the router classifies.
    AwaitingIntro,
    InFlow { flow: FlowKind, step: TurnStep, record: ConversationRecord },
    /// The flow finalized; the next reply closes it out.
    Finished { flow: FlowKind, record: ConversationRecord },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    AwaitingIntro,
    InFlow,
    Finished,
}

impl SessionPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::AwaitingIntro => PhaseKind::AwaitingIntro,
            Self::InFlow { .. } => PhaseKind::InFlow,
            Self::Finished { .. } => PhaseKind::Finished,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatSession {
    id: String,
    phase: SessionPhase,
    turns: u64,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), phase: SessionPhase::AwaitingIntro, turns: 0 }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }
}

/// Everything sent back for one user message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    pub session_id: String,
    pub correlation_id: String,
    pub messages: Vec<String>,
    pub phase: PhaseKind,
    pub flow: Option<FlowKind>,
    pub step: Option<TurnStep>,
    pub record: Option<ConversationRecord>,
}

impl TurnReply {
    fn new(session: &ChatSession, correlation_id: String, messages: Vec<String>) -> Self {
        let (flow, step, record) = match &session.phase {
            SessionPhase::AwaitingIntro => (None, None, None),
            SessionPhase::InFlow { flow, step, record } => {
                (Some(*flow), Some(*step), Some(record.clone()))
            }
            SessionPhase::Finished { flow, record } => {
                (Some(*flow), Some(TurnStep::Finalized), Some(record.clone()))
            }
        };
        Self {
            session_id: session.id.clone(),
            correlation_id,
            messages,
            phase: session.phase.kind(),
            flow,
            step,
            record,
        }
    }
}

/// Routes messages for many sessions. Each session is locked on its own, so
/// turns of different sessions never wait on each other.
pub struct AgentRuntime<R> {
    router: DialogRouter<R>,
    vacation: TurnEngine<BookingFlow>,
    sick_day: TurnEngine<BookingFlow>,
    interrupts: InterruptPolicy,
    audit: Arc<dyn AuditSink>,
    sessions: Mutex<HashMap<String, Arc<Mutex<ChatSession>>>>,
}

impl AgentRuntime<KeywordRecognizer> {
    pub fn from_config(config: &AppConfig) -> Self {
        let recognizer = match config.nlu.provider {
            NluProvider::Keyword => KeywordRecognizer::new(config.nlu.max_name_words)
                .with_booking_intents(config.router.dispatch == DispatchPolicy::ByIntent),
        };
        Self::new(
            DialogRouter::new(recognizer, config.router.dispatch),
            validator_from_config(&config.validation),
        )
    }
}

impl<R> AgentRuntime<R>
where
    R: IntentRecognizer,
{
    pub fn new(router: DialogRouter<R>, validator: Arc<dyn CodeValidator>) -> Self {
        Self {
            router,
            vacation: TurnEngine::for_kind(FlowKind::Vacation, validator.clone()),
            sick_day: TurnEngine::for_kind(FlowKind::SickDay, validator),
            interrupts: InterruptPolicy::default(),
            audit: Arc::new(NoopAuditSink),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Creates the session if needed and returns the greeting to show first.
    pub async fn open_session(&self, session_id: &str) -> Vec<String> {
        let _ = self.session(session_id).await;
        vec![self.router.intro_prompt(None)]
    }

    pub async fn end_session(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<ChatSession> {
        let session = self.sessions.lock().await.get(session_id).cloned()?;
        let session = session.lock().await;
        Some(session.clone())
    }

    /// Handles one user message. Recognizer and engine failures are answered
    /// in the reply and reset the session, so every message gets a reply.
    pub async fn handle_message(&self, session_id: &str, text: &str) -> TurnReply {
        let session = self.session(session_id).await;
        let mut session = session.lock().await;
        let correlation_id = Uuid::new_v4().to_string();

        session.turns += 1;
        let messages = self.process(&mut session, text, &correlation_id).await;

        info!(
            event_name = "session.turn_handled",
            session_id = %session.id,
            correlation_id = %correlation_id,
            turn = session.turns,
            phase = ?session.phase.kind(),
            messages = messages.len(),
            "turn handled"
        );

        TurnReply::new(&session, correlation_id, messages)
    }

    async fn session(&self, session_id: &str) -> Arc<Mutex<ChatSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ChatSession::new(session_id))))
            .clone()
    }

    fn engine(&self, flow: FlowKind) -> &TurnEngine<BookingFlow> {
        match flow {
            FlowKind::Vacation => &self.vacation,
            FlowKind::SickDay => &self.sick_day,
        }
    }

    async fn process(
        &self,
        session: &mut ChatSession,
        text: &str,
        correlation_id: &str,
    ) -> Vec<String> {
        let audit = AuditContext::new(Some(session.id.clone()), correlation_id, "agent-runtime");

        match session.phase.clone() {
            SessionPhase::AwaitingIntro => self.route(session, text, &audit).await,
            SessionPhase::InFlow { flow, step, record } => {
                match self.interrupts.evaluate(text) {
                    InterruptDecision::Continue => {
                        self.advance(session, flow, step, &record, Some(text), &audit)
                    }
                    InterruptDecision::Help { user_message } => {
                        let mut messages = vec![user_message];
                        match self.engine(flow).advance(step, &record, None) {
                            Ok(outcome) => messages.extend(outcome.prompts),
                            Err(error) => return self.reset(session, error.into(), &audit),
                        }
                        messages
                    }
                    InterruptDecision::Cancel { user_message } => {
                        self.cancel(session, flow, user_message)
                    }
                }
            }
            SessionPhase::Finished { flow, record } => match self.interrupts.evaluate(text) {
                InterruptDecision::Cancel { user_message } => {
                    self.cancel(session, flow, user_message)
                }
                _ => {
                    session.phase = SessionPhase::AwaitingIntro;
                    self.router.complete(&record)
                }
            },
        }
    }

    async fn route(
        &self,
        session: &mut ChatSession,
        text: &str,
        audit: &AuditContext,
    ) -> Vec<String> {
        match self.router.route(text).await {
            Ok(RouterDecision::Reprompt { reason, messages }) => {
                info!(
                    event_name = "session.router_reprompt",
                    session_id = %session.id,
                    reason = reason.as_str(),
                    "router re-prompted"
                );
                self.audit.emit(
                    routing_event(audit, "router.reprompted", AuditOutcome::Rejected)
                        .with_metadata("reason", reason.as_str()),
                );
                messages
            }
            Ok(RouterDecision::StartFlow { flow, record }) => {
                self.audit.emit(
                    routing_event(audit, "router.flow_started", AuditOutcome::Success)
                        .with_metadata("flow", flow.as_str()),
                );
                let step = self.engine(flow).initial_step();
                self.advance(session, flow, step, &record, None, audit)
            }
            Err(error) => {
                warn!(
                    event_name = "session.recognizer_failed",
                    session_id = %session.id,
                    error = %error,
                    "intent recognizer failed"
                );
                self.audit.emit(
                    routing_event(audit, "router.recognizer_failed", AuditOutcome::Failed)
                        .with_metadata("error", error.to_string()),
                );
                self.reset(session, ApplicationError::Recognizer(error.to_string()), audit)
            }
        }
    }

    fn advance(
        &self,
        session: &mut ChatSession,
        flow: FlowKind,
        step: TurnStep,
        record: &ConversationRecord,
        reply: Option<&str>,
        audit: &AuditContext,
    ) -> Vec<String> {
        let engine = self.engine(flow);
        match engine.advance_with_audit(step, record, reply, &self.audit, audit) {
            Ok(outcome) => {
                session.phase = if outcome.terminal {
                    info!(
                        event_name = "session.flow_finalized",
                        session_id = %session.id,
                        flow = flow.as_str(),
                        "booking flow finalized"
                    );
                    SessionPhase::Finished { flow, record: outcome.record }
                } else {
                    SessionPhase::InFlow { flow, step: outcome.to, record: outcome.record }
                };
                outcome.prompts
            }
            Err(error) => self.reset(session, error.into(), audit),
        }
    }

    fn cancel(&self, session: &mut ChatSession, flow: FlowKind, user_message: String) -> Vec<String> {
        info!(
            event_name = "session.flow_cancelled",
            session_id = %session.id,
            flow = flow.as_str(),
            "booking flow cancelled by user"
        );
        session.phase = SessionPhase::AwaitingIntro;
        vec![user_message, self.router.intro_prompt(None)]
    }

    fn reset(
        &self,
        session: &mut ChatSession,
        error: ApplicationError,
        audit: &AuditContext,
    ) -> Vec<String> {
        let interface = error.into_interface(audit.correlation_id.clone());
        warn!(
            event_name = "session.reset",
            session_id = %session.id,
            correlation_id = %interface.correlation_id(),
            error = %interface,
            "session reset after error"
        );
        session.phase = SessionPhase::AwaitingIntro;
        vec![interface.user_message().to_string(), self.router.intro_prompt(Some(RESTART_PROMPT))]
    }
}

fn routing_event(audit: &AuditContext, event_type: &str, outcome: AuditOutcome) -> AuditEvent {
    AuditEvent::new(
        audit.session_id.clone(),
        audit.correlation_id.clone(),
        event_type,
        AuditCategory::Routing,
        audit.actor.clone(),
        outcome,
    )
}
