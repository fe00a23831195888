//! # Vitae Core - Digital Twin Interview Engine
//!
//! Drives a stateless, turn-based interview against a language model, parses the
//! hybrid prose + JSON replies into a cumulative professional profile, and turns
//! the finished interview into a persona that visitors can chat with.
//!
//! ## Turn pipeline
//!
//! ```text
//! history ─→ filter ─→ model ─→ extractor ─→ completion ─→ tracker ─→ TurnResponse
//!              │                    │             │
//!         turn 0: canned      fence / braces   safety valve
//!           opening           + prose rules    (closing phrase)
//! ```

pub mod blob;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod history;
pub mod interview;
pub mod model;
pub mod persona;
pub mod portfolio;
pub mod profile;
pub mod store;
pub mod tracker;
pub mod turn;
pub mod voice;

pub use blob::{BlobStore, LocalBlobStore, PlaceholderBlobStore, StoredBlob};
pub use completion::CriteriaReport;
pub use config::{GatewayConfig, LlmMode, Secrets};
pub use engine::{InterviewEngine, TurnRequest, TurnResponse};
pub use error::{PayloadParseError, VitaeError, VitaeResult};
pub use extractor::{extract_reply, ParsedReply};
pub use history::{filter_history, HistoryPlan};
pub use interview::InterviewSpec;
pub use model::{AnthropicGenerator, OpenRouterGenerator, PlaceholderGenerator, TextGenerator};
pub use persona::{PersonaDraft, PersonaSynthesizer, TwinChat};
pub use portfolio::{create_portfolio, NewPortfolio, PortfolioRecord, PortfolioSummary};
pub use profile::{ProfilePayload, StructuredProfile};
pub use store::PortfolioStore;
pub use tracker::{InterviewState, MergePolicy};
pub use turn::{Role, Turn};
pub use voice::{
    clone_or_default, speak_with_fallback, ElevenLabsVoice, PlaceholderVoice, VoiceCapability,
    VoiceClone, VoiceSample,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
