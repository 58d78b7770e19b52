//! Dice requirement extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DiceRequirement, DiceRollKind};

/// "roll Dexterity against 15", "roll a Wisdom saving throw vs DC 14"
static ABILITY_CHECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\broll(?:\s+(?:a|an|for|your))?\s+([a-z]+)(?:\s+(?:check|save|saving\s+throw))?\s+(?:against|versus|vs\.?)\s+(?:a\s+)?(?:dc\s*)?(\d+)",
    )
    .expect("ability check pattern is valid")
});

/// "Perception check DC 12", "Strength save (DC 14)"
static SKILL_CHECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]+)\s+(?:check|save)\s*[(,]?\s*dc\s*(\d+)")
        .expect("skill check pattern is valid")
});

/// "check Perception DC 12"
static CHECK_SKILL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcheck\s+(?:your\s+)?([a-z]+)\s*[(,]?\s*dc\s*(\d+)")
        .expect("check skill pattern is valid")
});

/// "roll a d20", "roll 2d6"
static DIE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\broll(?:\s+(?:a|an|one))?\s+(\d*)d(\d+)\b").expect("die pattern is valid")
});

/// Words the check patterns capture that are not what is being checked.
const NOT_A_SKILL: &[&str] = &["a", "an", "the", "your", "this", "that", "another"];

/// Extract requested rolls, in order of pattern then position, without duplicates.
pub fn extract(content: &str) -> Vec<DiceRequirement> {
    let mut found: Vec<DiceRequirement> = Vec::new();
    let mut push = |req: DiceRequirement| {
        if !found.contains(&req) {
            found.push(req);
        }
    };

    for caps in ABILITY_CHECK.captures_iter(content) {
        push(DiceRequirement {
            kind: DiceRollKind::AbilityCheck,
            purpose: capitalize(&caps[1]),
            difficulty: caps[2].parse().ok(),
        });
    }

    for caps in SKILL_CHECK
        .captures_iter(content)
        .chain(CHECK_SKILL.captures_iter(content))
    {
        let skill = &caps[1];
        if NOT_A_SKILL.contains(&skill.to_lowercase().as_str()) {
            continue;
        }
        push(DiceRequirement {
            kind: DiceRollKind::SkillCheck,
            purpose: capitalize(skill),
            difficulty: caps[2].parse().ok(),
        });
    }

    for caps in DIE.captures_iter(content) {
        let count = caps[1].parse::<u32>().unwrap_or(1).max(1);
        push(DiceRequirement {
            kind: DiceRollKind::Die,
            purpose: format!("{count}d{}", &caps[2]),
            difficulty: None,
        });
    }

    found
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
