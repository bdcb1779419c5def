pub mod config;
pub mod error;
pub mod finder;
pub mod llm;
pub mod patterns;
pub mod transcript;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use finder::{format_candidate_for_review, Candidate, ClipFinder, FinalSelection};
pub use llm::Completion;
pub use patterns::PatternCatalog;
pub use transcript::{Transcript, TranscriptSegment};
