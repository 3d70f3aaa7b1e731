//! CLI `new-character` command — create the three memory records for characters.

use anyhow::Result;

use taleweave::config::TaleweaveConfig;
use taleweave::memory::{CharacterKey, CharacterProfile, MemoryStore, Tier};
use taleweave::operator::{ConsoleOperator, Operator};
use taleweave::Error;

pub fn new_character(config: &TaleweaveConfig) -> Result<()> {
    let store = super::open_memory(config)?;
    let created = create_characters(&store, &mut ConsoleOperator)?;
    if created.is_empty() {
        println!("No characters created.");
    }
    Ok(())
}

/// Create characters until the operator declines another or input closes.
///
/// A name that is already taken is reported and asked for again; nothing is
/// overwritten.
fn create_characters(store: &MemoryStore, op: &mut dyn Operator) -> Result<Vec<CharacterKey>> {
    op.say("=== CREATE NEW CHARACTER ===");
    let mut created = Vec::new();

    loop {
        let Some(name) = op.ask("\nCharacter name: ") else {
            break;
        };
        let Some(key) = CharacterKey::parse(&name) else {
            op.say("A character name is required.");
            continue;
        };
        if store.character_exists(&key)? {
            op.say(&taken(&key));
            continue;
        }

        let Some(profile) = ask_profile(op) else {
            break;
        };

        match store.create_character(&name, &profile) {
            Ok(key) => {
                op.say(&format!("\nCreated records for {}:", key.display_name()));
                for tier in Tier::ALL {
                    op.say(&format!("  {}", key.record_name(tier)));
                }
                created.push(key);
            }
            Err(Error::AlreadyExists { .. }) => {
                op.say(&taken(&key));
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if !op.confirm("\nCreate another character? (y/n): ") {
            break;
        }
    }

    Ok(created)
}

/// `None` if input closed partway through.
fn ask_profile(op: &mut dyn Operator) -> Option<CharacterProfile> {
    let role = op.ask("Role/title: ")?;
    let summary = op.ask_block("\nPhysical description (empty line when done):")?;
    let traits = op.ask_block("\nPersonality core, one point per line (empty line when done):")?;
    let history = op.ask_block("\nBackstory before the story began (empty line when done):")?;
    let skills = op.ask("\nSkills/capabilities: ")?;
    let relationships =
        op.ask_block("\nStarting relationships with other characters (empty line when done):")?;

    Some(CharacterProfile {
        summary: summary.trim().to_string(),
        role: filled(role),
        traits: filled(traits),
        history: filled(history),
        skills: filled(skills),
        relationships: filled(relationships),
    })
}

fn filled(answer: String) -> Option<String> {
    let answer = answer.trim();
    (!answer.is_empty()).then(|| answer.to_string())
}

fn taken(key: &CharacterKey) -> String {
    format!(
        "A character named {} already exists. Choose another name.",
        key.display_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taleweave::clock::{Clock, SystemClock};
    use taleweave::memory::BackupService;
    use taleweave::operator::ScriptedOperator;
    use taleweave::store::InMemoryRecordStore;

    fn memory() -> MemoryStore {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        MemoryStore::new(
            Box::new(InMemoryRecordStore::new()),
            Box::new(InMemoryRecordStore::new()),
            BackupService::new(Box::new(InMemoryRecordStore::new()), clock.clone()),
            clock,
            "story_recent",
        )
    }

    /// Answers for one profile: role, description, traits, empty backstory,
    /// skills, relationships.
    fn profile_lines<'a>(role: &'a str, description: &'a str) -> Vec<&'a str> {
        vec![
            role,
            description,
            "",
            "- wary",
            "- loyal to crew",
            "",
            "",
            "Knife work",
            "Owes Marcus a favour.",
            "",
        ]
    }

    #[test]
    fn loops_until_operator_declines() {
        let store = memory();
        let mut lines = vec!["Sera"];
        lines.extend(profile_lines("Smuggler", "Short, scarred."));
        lines.push("y");
        lines.push("Marcus");
        lines.extend(profile_lines("Gate guard", "Tall."));
        lines.push("n");
        let mut op = ScriptedOperator::new(lines);

        let created = create_characters(&store, &mut op).unwrap();

        let names: Vec<_> = created.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["sera", "marcus"]);
        assert_eq!(op.remaining(), 0);

        let background = store
            .load(&created[0], Tier::Background)
            .unwrap()
            .unwrap();
        assert!(background.contains("ROLE: Smuggler\n"));
        assert!(background.contains("TRAITS:\n- wary\n- loyal to crew\n"));
        assert!(!background.contains("HISTORY"));
        assert!(background.contains("RELATIONSHIPS: Owes Marcus a favour.\n"));
        assert!(background.contains("Short, scarred."));
    }

    #[test]
    fn taken_name_is_asked_again_without_aborting() {
        let store = memory();
        store
            .create_character("Marcus", &CharacterProfile::new("A guard."))
            .unwrap();
        let mut lines = vec!["marcus", "Old Tom"];
        lines.extend(profile_lines("Fisherman", "Weathered."));
        lines.push("n");
        let mut op = ScriptedOperator::new(lines);

        let created = create_characters(&store, &mut op).unwrap();

        assert!(op.saw("A character named Marcus already exists."));
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].as_str(), "old_tom");
        assert!(store
            .load(&CharacterKey::parse("Marcus").unwrap(), Tier::Background)
            .unwrap()
            .unwrap()
            .contains("A guard."));
    }

    #[test]
    fn closed_input_mid_profile_writes_nothing() {
        let store = memory();
        let mut op = ScriptedOperator::new(["Sera", "Smuggler", "Short."]);

        let created = create_characters(&store, &mut op).unwrap();

        assert!(created.is_empty());
        assert!(!store
            .character_exists(&CharacterKey::parse("Sera").unwrap())
            .unwrap());
    }

    #[test]
    fn blank_name_is_asked_again() {
        let store = memory();
        let mut lines = vec!["   ", "Sera"];
        lines.extend(profile_lines("Smuggler", "Short."));
        lines.push("n");
        let mut op = ScriptedOperator::new(lines);

        let created = create_characters(&store, &mut op).unwrap();

        assert!(op.saw("A character name is required."));
        assert_eq!(created.len(), 1);
    }
}
