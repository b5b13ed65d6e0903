#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterruptDecision {
    Continue,
    Help { user_message: String },
    Cancel { user_message: String },
}

/// Keywords that interrupt a running booking flow instead of answering it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptPolicy {
    pub help_keywords: Vec<String>,
    pub cancel_keywords: Vec<String>,
}

impl Default for InterruptPolicy {
    fn default() -> Self {
        Self {
            help_keywords: vec!["help".to_string(), "?".to_string()],
            cancel_keywords: vec!["cancel".to_string(), "quit".to_string()],
        }
    }
}

impl InterruptPolicy {
    pub fn evaluate(&self, text: &str) -> InterruptDecision {
        let normalized = text.trim().to_ascii_lowercase();
        if self.help_keywords.iter().any(|keyword| *keyword == normalized) {
            return InterruptDecision::Help {
                user_message: "I can book vacation or sick days for you. Answer each question \
                               as it comes, or type cancel to start over."
                    .to_string(),
            };
        }
        if self.cancel_keywords.iter().any(|keyword| *keyword == normalized) {
            return InterruptDecision::Cancel { user_message: "Cancelling...".to_string() };
        }
        InterruptDecision::Continue
    }
}
