//! Generation profiles per request category.

use serde::{Deserialize, Serialize};

/// Generation parameters and backend model id for one request category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model: String,
    pub temperature: f32,
    /// Maximum number of tokens to generate (`num_predict`).
    pub max_tokens: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    /// Context window size (`num_ctx`).
    pub context_window: u32,
}

impl ModelProfile {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.8,
            max_tokens: 500,
            top_p: 0.9,
            repeat_penalty: 1.1,
            context_window: 4096,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn repeat_penalty(mut self, penalty: f32) -> Self {
        self.repeat_penalty = penalty;
        self
    }

    pub fn context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    /// Apply caller overrides. Caller values win.
    pub fn merged(mut self, overrides: &ProfileOverrides) -> Self {
        if let Some(ref model) = overrides.model {
            self.model = model.clone();
        }
        if let Some(t) = overrides.temperature {
            self.temperature = t;
        }
        if let Some(n) = overrides.max_tokens {
            self.max_tokens = n;
        }
        if let Some(p) = overrides.top_p {
            self.top_p = p;
        }
        if let Some(p) = overrides.repeat_penalty {
            self.repeat_penalty = p;
        }
        if let Some(n) = overrides.context_window {
            self.context_window = n;
        }
        self
    }
}

/// Per-call overrides for a [`ModelProfile`]. Unset fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
}

impl ProfileOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn repeat_penalty(mut self, penalty: f32) -> Self {
        self.repeat_penalty = Some(penalty);
        self
    }

    pub fn context_window(mut self, tokens: u32) -> Self {
        self.context_window = Some(tokens);
        self
    }
}
