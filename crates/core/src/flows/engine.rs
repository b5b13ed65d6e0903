use std::sync::Arc;

use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::{ActivityKind, Confirmation, ConversationRecord, RecordField};
use crate::flows::states::{FlowKind, TurnOutcome, TurnStep};
use crate::validation::CodeValidator;

/// Text a booking flow sends at each step. Templates may reference
/// `{name}`, `{activity}` and `{duration}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplates {
    pub ask_name: String,
    pub ask_code: String,
    pub code_rejected: String,
    pub ask_activity: String,
    pub ask_duration: String,
    pub ask_confirmation: String,
    pub confirmation_unclear: String,
    pub booked: String,
    pub cancelled: String,
    pub follow_up: String,
}

impl PromptTemplates {
    fn standard(activity_phrase: &str) -> Self {
        Self {
            ask_name: "Please provide your name".to_owned(),
            ask_code: "Thanks for providing your name {name}. Next we would like to validate \
                       your account by your employee number. Please enter your employee code?"
                .to_owned(),
            code_rejected: "We checked the database, the code you provided is not valid for \
                            {name}. Please enter your employee number. Thanks"
                .to_owned(),
            ask_activity: "Thanks, awesome, now you are validated. So tell us as your HR \
                           manager, how can we assist you today?"
                .to_owned(),
            ask_duration: format!(
                "So for how many days do you want to go {activity_phrase}, {{name}}?"
            ),
            ask_confirmation: format!(
                "So just to confirm, you [{{name}}] are going {activity_phrase} for [{{duration}}]. \
                 Please type yes for confirmation or no to cancel the request"
            ),
            confirmation_unclear: "Sorry {name}, I need a yes or a no. Please type yes to \
                                   confirm your {activity} for [{duration}] or no to cancel it"
                .to_owned(),
            booked: "Done. All set [{name}]. You booked {activity} for [{duration}]. Please stay \
                     safe. Thanks for being patient."
                .to_owned(),
            cancelled: "No problem [{name}], your {activity} request for [{duration}] has been \
                        cancelled."
                .to_owned(),
            follow_up: "Anything else I can do for your day [{name}]?".to_owned(),
        }
    }

    pub fn render(template: &str, record: &ConversationRecord) -> String {
        template
            .replace("{name}", record.name_or_default())
            .replace("{activity}", record.activity_label())
            .replace("{duration}", record.duration_or_default())
    }
}

pub trait FlowDefinition {
    fn flow_kind(&self) -> FlowKind;

    fn initial_step(&self) -> TurnStep {
        TurnStep::AskName
    }

    /// Whether the activity step waits for a reply or fills the label itself.
    fn asks_for_activity(&self) -> bool;

    /// Whether finalizing sends the follow-up prompt right after the closing
    /// summary, in the same turn.
    fn follow_up_on_finalize(&self) -> bool;

    fn templates(&self) -> &PromptTemplates;

    fn activity(&self) -> ActivityKind {
        self.flow_kind().activity()
    }
}

#[derive(Clone, Debug)]
pub struct BookingFlow {
    kind: FlowKind,
    asks_for_activity: bool,
    follow_up_on_finalize: bool,
    templates: PromptTemplates,
}

impl BookingFlow {
    pub fn vacation() -> Self {
        Self {
            kind: FlowKind::Vacation,
            asks_for_activity: true,
            follow_up_on_finalize: true,
            templates: PromptTemplates::standard("for vacation"),
        }
    }

    pub fn sick_day() -> Self {
        Self {
            kind: FlowKind::SickDay,
            asks_for_activity: false,
            follow_up_on_finalize: false,
            templates: PromptTemplates::standard("on sick leave"),
        }
    }

    pub fn for_kind(kind: FlowKind) -> Self {
        match kind {
            FlowKind::Vacation => Self::vacation(),
            FlowKind::SickDay => Self::sick_day(),
        }
    }
}

impl FlowDefinition for BookingFlow {
    fn flow_kind(&self) -> FlowKind {
        self.kind
    }

    fn asks_for_activity(&self) -> bool {
        self.asks_for_activity
    }

    fn follow_up_on_finalize(&self) -> bool {
        self.follow_up_on_finalize
    }

    fn templates(&self) -> &PromptTemplates {
        &self.templates
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("record field `{}` is populated before `{}`", field.as_str(), missing.as_str())]
    OutOfOrder { field: RecordField, missing: RecordField },
    #[error("cannot resume at {step:?}: record field `{}` is still empty", missing.as_str())]
    CursorAhead { step: TurnStep, missing: RecordField },
}

enum Evaluation {
    Await(Vec<String>),
    Satisfied,
}

/// Drives one booking flow a turn at a time.
pub struct TurnEngine<F> {
    flow: F,
    validator: Arc<dyn CodeValidator>,
}

impl TurnEngine<BookingFlow> {
    pub fn for_kind(kind: FlowKind, validator: Arc<dyn CodeValidator>) -> Self {
        Self::new(BookingFlow::for_kind(kind), validator)
    }
}

impl<F> TurnEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F, validator: Arc<dyn CodeValidator>) -> Self {
        Self { flow, validator }
    }

    pub fn flow_kind(&self) -> FlowKind {
        self.flow.flow_kind()
    }

    pub fn initial_step(&self) -> TurnStep {
        self.flow.initial_step()
    }

    /// Consumes `reply` as the answer to the outstanding `step`, then walks
    /// forward until a step still needs input or the flow finalizes.
    ///
    /// A missing or blank reply consumes nothing, so calling this again with
    /// the same record re-emits the outstanding prompt.
    pub fn advance(
        &self,
        step: TurnStep,
        record: &ConversationRecord,
        reply: Option<&str>,
    ) -> Result<TurnOutcome, TurnError> {
        check_record(step, record)?;

        let mut record = record.clone();
        if step.is_terminal() {
            let follow_up = self.render(&self.flow.templates().follow_up, &record);
            return Ok(self.outcome(step, step, vec![follow_up], record));
        }

        // The reply answers the first step still waiting for input, which may
        // lie past `step` when the record was completed elsewhere.
        let mut current = self.outstanding(step, &mut record);
        if let Some(reply) = reply.map(str::trim).filter(|reply| !reply.is_empty()) {
            self.absorb(current, reply, &mut record);
            if let Some((field, missing)) = record.ordering_violation() {
                return Err(TurnError::OutOfOrder { field, missing });
            }
        }

        loop {
            match self.evaluate(current, &mut record) {
                Evaluation::Await(prompts) => {
                    return Ok(self.outcome(step, current, prompts, record));
                }
                Evaluation::Satisfied => match current.next() {
                    Some(next) => current = next,
                    None => return Ok(self.outcome(step, current, Vec::new(), record)),
                },
            }
        }
    }

    pub fn advance_with_audit<S>(
        &self,
        step: TurnStep,
        record: &ConversationRecord,
        reply: Option<&str>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TurnOutcome, TurnError>
    where
        S: AuditSink,
    {
        let result = self.advance(step, record, reply);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "turn.advanced",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("flow", outcome.flow.as_str())
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("terminal", outcome.terminal.to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "turn.rejected",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("flow", self.flow_kind().as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    /// First step from `step` onward that still awaits input. Finalized when
    /// every field is already filled.
    fn outstanding(&self, step: TurnStep, record: &mut ConversationRecord) -> TurnStep {
        let mut current = step;
        while let Evaluation::Satisfied = self.evaluate(current, record) {
            match current.next() {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn absorb(&self, step: TurnStep, reply: &str, record: &mut ConversationRecord) {
        match step {
            TurnStep::AskName => record.name = Some(reply.to_owned()),
            TurnStep::AskCode | TurnStep::ValidateCode => {
                record.employee_code = Some(reply.to_owned());
                record.is_validated = self.validator.validate(record, reply);
            }
            TurnStep::AskActivity => record.activity_kind = Some(self.flow.activity()),
            TurnStep::AskDuration => record.duration = Some(reply.to_owned()),
            TurnStep::AskConfirmation => record.confirmed = Some(Confirmation::parse(reply)),
            TurnStep::Finalized => {}
        }
    }

    fn evaluate(&self, step: TurnStep, record: &mut ConversationRecord) -> Evaluation {
        let templates = self.flow.templates();
        let template = match step {
            TurnStep::AskName if record.name.is_none() => &templates.ask_name,
            TurnStep::AskCode if record.employee_code.is_none() => &templates.ask_code,
            TurnStep::ValidateCode if !record.is_validated => &templates.code_rejected,
            TurnStep::AskActivity if record.activity_kind.is_none() => {
                if !self.flow.asks_for_activity() {
                    record.activity_kind = Some(self.flow.activity());
                    return Evaluation::Satisfied;
                }
                &templates.ask_activity
            }
            TurnStep::AskDuration if record.duration.is_none() => &templates.ask_duration,
            TurnStep::AskConfirmation => match record.confirmed {
                None => &templates.ask_confirmation,
                Some(Confirmation::Unset) => &templates.confirmation_unclear,
                Some(Confirmation::Yes) | Some(Confirmation::No) => return Evaluation::Satisfied,
            },
            TurnStep::Finalized => return Evaluation::Await(self.closing(record)),
            _ => return Evaluation::Satisfied,
        };
        Evaluation::Await(vec![self.render(template, record)])
    }

    fn closing(&self, record: &ConversationRecord) -> Vec<String> {
        let templates = self.flow.templates();
        let summary = match record.confirmed {
            Some(Confirmation::No) => &templates.cancelled,
            _ => &templates.booked,
        };

        let mut prompts = vec![self.render(summary, record)];
        if self.flow.follow_up_on_finalize() {
            prompts.push(self.render(&templates.follow_up, record));
        }
        prompts
    }

    fn render(&self, template: &str, record: &ConversationRecord) -> String {
        PromptTemplates::render(template, record)
    }

    fn outcome(
        &self,
        from: TurnStep,
        to: TurnStep,
        prompts: Vec<String>,
        record: ConversationRecord,
    ) -> TurnOutcome {
        TurnOutcome {
            flow: self.flow.flow_kind(),
            from,
            to,
            prompts,
            record,
            terminal: to.is_terminal(),
        }
    }
}

fn check_record(step: TurnStep, record: &ConversationRecord) -> Result<(), TurnError> {
    if let Some((field, missing)) = record.ordering_violation() {
        return Err(TurnError::OutOfOrder { field, missing });
    }

    let resumes_after = match step.target() {
        Some(target) => RecordField::ORDER.iter().take_while(|field| **field != target).count(),
        None => RecordField::ORDER.len(),
    };
    if let Some(missing) =
        RecordField::ORDER[..resumes_after].iter().find(|field| !record.is_populated(**field))
    {
        return Err(TurnError::CursorAhead { step, missing: *missing });
    }

    if step.is_terminal() && !record.confirmed.is_some_and(|answer| answer.is_answered()) {
        return Err(TurnError::CursorAhead { step, missing: RecordField::Confirmed });
    }

    Ok(())
}
