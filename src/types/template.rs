//! Prompt template definition.

use serde::{Deserialize, Serialize};

use super::request::RequestType;

/// A keyed, parameterised prompt.
///
/// `body` contains `{{name}}` placeholders. `variables` declares the names
/// the body is expected to use; it feeds validation only and is not
/// enforced when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub request_type: RequestType,
    pub language: String,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl PromptTemplate {
    pub fn new(
        id: impl Into<String>,
        request_type: RequestType,
        language: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            request_type,
            language: language.into(),
            body: body.into(),
            variables: Vec::new(),
        }
    }

    /// Declare the expected variable names.
    pub fn variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = names.into_iter().map(Into::into).collect();
        self
    }
}
