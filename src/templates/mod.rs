//! Prompt template registry.
//!
//! Holds keyed, parameterised prompts and renders them against a variable
//! bag. The registry is read-mostly: readers load an immutable snapshot of
//! the whole template map, and every mutation publishes a fresh map through
//! [`ArcSwap`], so a reader never observes a half-applied change.
//!
//! # Rendering
//!
//! Every `{{name}}` token is replaced with the string form of
//! `variables[name]`. A token with no matching variable renders as the empty
//! string; rendering never fails on missing variables. This silently drops
//! data when a caller forgets a variable, so [`TemplateRegistry::validate`]
//! exists to catch undeclared placeholders up front.

mod defaults;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::types::{PromptTemplate, RequestType};
use crate::{Result, SkaldError};

pub use defaults::{DEFAULT_LANGUAGE, default_templates};

/// Template variable bag: placeholder name → value.
pub type Variables = BTreeMap<String, Value>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// A problem found by [`TemplateRegistry::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateIssue {
    MissingId,
    MissingBody,
    MissingLanguage,
    /// Placeholder used in the body but absent from `variables`.
    UndeclaredPlaceholder(String),
}

impl TemplateIssue {
    /// Whether the template is unusable (as opposed to merely suspicious).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TemplateIssue::UndeclaredPlaceholder(_))
    }
}

impl std::fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateIssue::MissingId => f.write_str("missing id"),
            TemplateIssue::MissingBody => f.write_str("missing body"),
            TemplateIssue::MissingLanguage => f.write_str("missing language"),
            TemplateIssue::UndeclaredPlaceholder(name) => {
                write!(f, "placeholder '{name}' is not declared")
            }
        }
    }
}

/// Process-wide store of prompt templates, keyed on template id.
pub struct TemplateRegistry {
    templates: ArcSwap<HashMap<String, Arc<PromptTemplate>>>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            templates: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Create a registry holding the built-in template for every request type.
    pub fn with_defaults() -> Self {
        let map = default_templates()
            .into_iter()
            .map(|t| (t.id.clone(), Arc::new(t)))
            .collect::<HashMap<_, _>>();
        Self {
            templates: ArcSwap::from_pointee(map),
        }
    }

    /// Look up the template for a request type in a language.
    pub fn get(&self, request_type: RequestType, language: &str) -> Result<Arc<PromptTemplate>> {
        let snapshot = self.templates.load();
        let mut candidates = snapshot
            .values()
            .filter(|t| t.request_type == request_type && t.language == language)
            .collect::<Vec<_>>();
        // lowest id wins when several templates share a slot
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        candidates
            .first()
            .map(|t| Arc::clone(t))
            .ok_or_else(|| SkaldError::TemplateNotFound {
                request_type,
                language: language.to_string(),
            })
    }

    /// Look up a template by id.
    pub fn get_by_id(&self, id: &str) -> Option<Arc<PromptTemplate>> {
        self.templates.load().get(id).cloned()
    }

    /// Render a stored template.
    ///
    /// Fails only when `template_id` is unknown; missing variables render empty.
    pub fn render(&self, template_id: &str, variables: &Variables) -> Result<String> {
        let template = self
            .get_by_id(template_id)
            .ok_or_else(|| SkaldError::Template(format!("unknown template id '{template_id}'")))?;
        Ok(render_body(&template.body, variables))
    }

    /// Check a template for missing fields and undeclared placeholders.
    pub fn validate(template: &PromptTemplate) -> Vec<TemplateIssue> {
        let mut issues = Vec::new();
        if template.id.trim().is_empty() {
            issues.push(TemplateIssue::MissingId);
        }
        if template.body.trim().is_empty() {
            issues.push(TemplateIssue::MissingBody);
        }
        if template.language.trim().is_empty() {
            issues.push(TemplateIssue::MissingLanguage);
        }

        let declared = template.variables.iter().map(String::as_str).collect::<BTreeSet<_>>();
        let mut reported = BTreeSet::new();
        for name in placeholders(&template.body) {
            if !declared.contains(name) && reported.insert(name) {
                issues.push(TemplateIssue::UndeclaredPlaceholder(name.to_string()));
            }
        }
        issues
    }

    /// Insert a new template.
    ///
    /// Rejects duplicate ids and templates with fatal validation issues.
    pub fn add(&self, template: PromptTemplate) -> Result<()> {
        check_fatal(&template)?;
        let id = template.id.clone();
        let template = Arc::new(template);
        let previous = self.templates.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.entry(id.clone()).or_insert_with(|| Arc::clone(&template));
            next
        });
        if previous.contains_key(&id) {
            return Err(SkaldError::Template(format!("template '{id}' already exists")));
        }
        debug!(template = %id, "template added");
        Ok(())
    }

    /// Replace an existing template, returning the previous version.
    pub fn update(&self, template: PromptTemplate) -> Result<Arc<PromptTemplate>> {
        check_fatal(&template)?;
        let id = template.id.clone();
        let template = Arc::new(template);
        let previous = self.templates.rcu(|current| {
            let mut next = HashMap::clone(current);
            if let Some(slot) = next.get_mut(&id) {
                *slot = Arc::clone(&template);
            }
            next
        });
        let old = previous
            .get(&id)
            .cloned()
            .ok_or_else(|| SkaldError::Template(format!("unknown template id '{id}'")))?;
        debug!(template = %id, "template replaced");
        Ok(old)
    }

    /// Remove a template, returning it if it existed.
    pub fn remove(&self, id: &str) -> Option<Arc<PromptTemplate>> {
        let previous = self.templates.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(id);
            next
        });
        previous.get(id).cloned()
    }

    /// All templates, sorted by id.
    pub fn list(&self) -> Vec<Arc<PromptTemplate>> {
        let mut all = self.templates.load().values().cloned().collect::<Vec<_>>();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.templates.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn check_fatal(template: &PromptTemplate) -> Result<()> {
    let fatal = TemplateRegistry::validate(template)
        .into_iter()
        .filter(TemplateIssue::is_fatal)
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>();
    if fatal.is_empty() {
        Ok(())
    } else {
        Err(SkaldError::Template(format!(
            "invalid template '{}': {}",
            template.id,
            fatal.join(", ")
        )))
    }
}

/// Placeholder names used in a template body, in order of appearance.
pub fn placeholders(body: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Substitute `{{name}}` tokens in `body`.
pub fn render_body(body: &str, variables: &Variables) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &Captures<'_>| {
            variables
                .get(&caps[1])
                .map(value_to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

/// String form of a variable: strings raw, null empty, anything else as JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
