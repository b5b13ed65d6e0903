//! Dialog runtime for the HR desk bot.
//!
//! A session starts at the dialog router, which asks the intent recognizer
//! who is talking and hands the conversation to a booking flow. The turn
//! engine in `hrdesk-core` then drives the flow one reply at a time.
//!
//! # Modules
//!
//! - `nlu` - `IntentRecognizer` seam plus the offline `KeywordRecognizer`
//! - `router` - picks a flow from the recognized intent and name
//! - `interrupts` - help and cancel keywords honored mid-flow
//! - `runtime` - per-session state and the message loop tying it together

pub mod interrupts;
pub mod nlu;
pub mod router;
pub mod runtime;

pub use nlu::{Classification, IntentRecognizer, KeywordRecognizer};
pub use router::{DialogRouter, RouterDecision};
pub use runtime::{AgentRuntime, ChatSession, PhaseKind, SessionPhase, TurnReply};
