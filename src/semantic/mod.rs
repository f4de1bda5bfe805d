use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::SemanticError;

mod openai;
pub use openai::OpenAiExtractor;

/// Field key → natural-language instruction for the fields still missing.
pub type FieldManifest = BTreeMap<String, String>;

/// A service that reads free text and answers a manifest of field questions.
#[async_trait]
pub trait SemanticExtractor: Send + Sync {
    /// Flat `field → value` answers. Absent or `null` entries mean "not found".
    async fn extract(&self, text: &str, manifest: &FieldManifest) -> Result<HashMap<String, Value>, SemanticError>;

    /// Short human summary of a failure report.
    async fn explain_failure(&self, report: &str) -> String {
        report.to_string()
    }
}
