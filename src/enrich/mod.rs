//! Heuristic post-processing of generated narration.
//!
//! Enrichment is text in, [`Annotations`] out, behind the [`Enricher`]
//! trait so a better classifier can replace the default without touching
//! orchestration. The default [`HeuristicEnricher`] runs three independent
//! passes:
//!
//! - [`dice`]: requested rolls ("roll Dexterity against 15", "Perception
//!   check DC 12", "roll a d20")
//! - [`suggestions`]: a proposal phrase plus domain keywords, mapped to
//!   skill check / attack / dialogue
//! - [`scene`]: movement phrases and time-of-day words
//!
//! These are keyword and pattern heuristics, not a grammar. They miss
//! phrasings they were not written for and occasionally match prose that
//! was not meant as an instruction.
//!
//! Enrichment is never fatal: [`enrich_guarded`] converts errors and panics
//! into [`SkaldError::Enrichment`], and the engine returns the response
//! unannotated when that happens.

pub mod dice;
pub mod scene;
pub mod suggestions;

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::types::Annotations;
use crate::{Result, SkaldError};

/// Extracts structured hints from generated text.
pub trait Enricher: Send + Sync {
    /// Name for logging/debugging.
    fn name(&self) -> &str;

    fn enrich(&self, content: &str) -> Result<Annotations>;
}

/// Default regex and keyword based enricher.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEnricher;

impl Enricher for HeuristicEnricher {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn enrich(&self, content: &str) -> Result<Annotations> {
        Ok(Annotations {
            dice_rolls: dice::extract(content),
            suggestions: suggestions::extract(content),
            scene_updates: scene::extract(content).into_iter().collect(),
        })
    }
}

/// Run an enricher, turning panics into [`SkaldError::Enrichment`].
pub fn enrich_guarded(enricher: &dyn Enricher, content: &str) -> Result<Annotations> {
    match catch_unwind(AssertUnwindSafe(|| enricher.enrich(content))) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "enricher panicked".to_string());
            Err(SkaldError::Enrichment(format!(
                "{} panicked: {message}",
                enricher.name()
            )))
        }
    }
}

/// Whether `needle` occurs in `haystack` on word boundaries.
///
/// Both arguments are expected lowercase.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    find_word(haystack, needle).is_some()
}

/// Byte offset of the first word-bounded occurrence of `needle`.
pub(crate) fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
