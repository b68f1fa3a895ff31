//! Coach feedback adapters.
//!
//! Feedback is generated after a submission is committed. Callers wrap
//! [`FeedbackAdapter::generate`] in a timeout and treat any failure as
//! "no feedback".

mod canned;
mod openai;

pub use canned::CannedFeedbackAdapter;
pub use openai::OpenAiFeedbackAdapter;

use async_trait::async_trait;
use medcards_core::types::{AIFeedback, ClinicalCase, Interaction};
use medcards_core::EngineError;

#[async_trait]
pub trait FeedbackAdapter: Send + Sync {
    /// Model identifier recorded in feedback metadata.
    fn model(&self) -> &str;

    /// Produce feedback for a scored interaction. Errors are
    /// `AdapterError` or `AdapterTimeout`.
    async fn generate(
        &self,
        case: &ClinicalCase,
        interaction: &Interaction,
    ) -> Result<AIFeedback, EngineError>;
}
