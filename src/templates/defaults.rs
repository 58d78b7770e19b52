//! Built-in English templates, one per request type.

use crate::types::{PromptTemplate, RequestType};

/// Language of the built-in templates.
pub const DEFAULT_LANGUAGE: &str = "en";

const GAME_MASTER_PREAMBLE: &str = "You are the Game Master of a tabletop role-playing session. \
Narrate in second person, stay consistent with established facts, and never decide the \
player's actions for them.";

const SCENE_VARIABLES: &[&str] = &[
    "characterName",
    "characterRace",
    "characterClass",
    "characterLevel",
    "locationName",
    "timeOfDay",
    "weather",
    "activeQuests",
    "presentNpcs",
    "recentActions",
    "previousResponses",
    "tone",
    "maxLength",
    "diceInstruction",
];

fn template(
    request_type: RequestType,
    extra_variables: &[&str],
    instructions: &str,
) -> PromptTemplate {
    let body = format!(
        "{GAME_MASTER_PREAMBLE}\n\n\
         Character: {{{{characterName}}}}, a level {{{{characterLevel}}}} {{{{characterRace}}}} {{{{characterClass}}}}.\n\
         Location: {{{{locationName}}}} ({{{{timeOfDay}}}}, {{{{weather}}}}).\n\
         Active quests: {{{{activeQuests}}}}\n\
         Present NPCs: {{{{presentNpcs}}}}\n\
         Recent actions: {{{{recentActions}}}}\n\
         Story so far: {{{{previousResponses}}}}\n\n\
         {instructions}\n\n\
         Keep the tone {{{{tone}}}} and the reply under {{{{maxLength}}}} words. {{{{diceInstruction}}}}"
    );
    PromptTemplate::new(
        format!("{}_{DEFAULT_LANGUAGE}", request_type.as_str()),
        request_type,
        DEFAULT_LANGUAGE,
        body,
    )
    .variables(SCENE_VARIABLES.iter().chain(extra_variables).copied())
}

/// The built-in template set.
pub fn default_templates() -> Vec<PromptTemplate> {
    vec![
        template(
            RequestType::NarrativeResponse,
            &["playerAction"],
            "The player does the following: {{playerAction}}\n\
             Describe what happens as a result.",
        ),
        template(
            RequestType::SceneDescription,
            &[],
            "Describe the current scene: what the character sees, hears and smells. \
             End with something that invites the player to act.",
        ),
        template(
            RequestType::NpcDialogue,
            &["npcName", "npcPersonality", "playerAction"],
            "Speak as {{npcName}}, who is {{npcPersonality}}. \
             The player says or does: {{playerAction}}\n\
             Reply in character, in the NPC's own voice.",
        ),
        template(
            RequestType::CombatNarration,
            &["enemies", "playerAction"],
            "Combat is under way against {{enemies}}. The player attempts: {{playerAction}}\n\
             Narrate the exchange vividly without deciding its mechanical outcome.",
        ),
        template(
            RequestType::QuestGeneration,
            &["questTheme"],
            "Create a new quest hook themed around {{questTheme}}. \
             Give it a goal, a complication, and a reward that fit the setting.",
        ),
        template(
            RequestType::StoryProgression,
            &["playerAction"],
            "Advance the story one beat, building on the latest action: {{playerAction}}\n\
             Introduce a development that raises the stakes.",
        ),
        template(
            RequestType::WorldBuilding,
            &["worldElement"],
            "Flesh out this part of the world: {{worldElement}}. \
             Add history, notable people and one secret.",
        ),
        template(
            RequestType::RandomEncounter,
            &["terrain"],
            "Describe a random encounter suited to {{terrain}} terrain and the character's level. \
             It may be hostile, neutral or friendly.",
        ),
        template(
            RequestType::ConsequenceAnalysis,
            &["playerAction"],
            "Consider the consequences of this action: {{playerAction}}\n\
             Describe the immediate fallout and what it may lead to later.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateRegistry;

    #[test]
    fn one_default_per_request_type() {
        let templates = default_templates();
        for t in RequestType::ALL {
            assert_eq!(
                templates.iter().filter(|tpl| tpl.request_type == t).count(),
                1,
                "{t}"
            );
        }
    }

    #[test]
    fn defaults_declare_every_placeholder() {
        for t in default_templates() {
            assert!(TemplateRegistry::validate(&t).is_empty(), "{}", t.id);
        }
    }
}
