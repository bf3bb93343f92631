//! Interactive character creation. The flow is a line-driven state machine
//! owned by the session: each input line advances one step, `quit` cancels
//! anywhere, and the finished product is a `NewCharacter` ready for the
//! insert.

use std::collections::HashMap;

use ashenmoor_core::constants::{RESPAWN_ROOM_ID, STARTING_SPIRITUAL_TETHER};
use ashenmoor_core::dice;
use ashenmoor_core::stats::{modifier, Stat, StatBlock};
use ashenmoor_core::text;

use crate::db::characters::NewCharacter;
use crate::skills;
use crate::world::World;

/// Trait questions in preferred ask-order; races pick a subset.
const TRAIT_ORDER: &[&str] = &[
    "Height",
    "Build",
    "Skin Tone",
    "Skin Pattern",
    "Shell Color",
    "Head Shape",
    "Hair Style",
    "Hair Color",
    "Eye Color",
    "Ear Shape",
    "Nose Type",
    "Beard Style",
];

fn trait_options(trait_key: &str) -> &'static [&'static str] {
    match trait_key {
        "Height" => &["short", "average-height", "tall", "towering"],
        "Build" => &["slight", "lean", "sturdy", "broad", "massive"],
        "Skin Tone" => &["pale", "fair", "tanned", "olive", "dark", "ebony"],
        "Skin Pattern" => &["plain-scaled", "banded", "speckled", "striped"],
        "Shell Color" => &["sand-colored", "moss-green", "slate-grey", "obsidian"],
        "Head Shape" => &["narrow", "wedge-shaped", "broad", "crested"],
        "Hair Style" => &["cropped", "braided", "flowing", "wild", "shaven"],
        "Hair Color" => &["black", "brown", "auburn", "blond", "grey", "white"],
        "Eye Color" => &["brown", "hazel", "green", "blue", "grey", "amber"],
        "Ear Shape" => &["gently-pointed", "sharply-pointed", "sweeping"],
        "Nose Type" => &["button", "straight", "aquiline", "crooked"],
        "Beard Style" => &["clean-shaven", "stubbled", "short-bearded", "long-bearded", "plaited"],
        _ => &[],
    }
}

/// Which trait questions each race walks, in `TRAIT_ORDER` order.
fn traits_for_race(race_name: &str) -> Vec<&'static str> {
    let picks: &[&str] = match race_name.to_ascii_lowercase().as_str() {
        "human" => &["Height", "Build", "Skin Tone", "Hair Style", "Hair Color", "Eye Color", "Nose Type", "Beard Style"],
        "dwarf" => &["Height", "Build", "Skin Tone", "Hair Color", "Eye Color", "Beard Style"],
        "elf" => &["Height", "Build", "Skin Tone", "Hair Style", "Hair Color", "Eye Color", "Ear Shape"],
        "saurian" => &["Height", "Build", "Skin Pattern", "Shell Color", "Head Shape", "Eye Color"],
        _ => &["Height", "Build"],
    };
    TRAIT_ORDER
        .iter()
        .copied()
        .filter(|key| picks.contains(key))
        .collect()
}

/// Racial attribute adjustments, clamped to keep every stat at 1 or above.
fn racial_modifiers(race_name: &str) -> Vec<(Stat, i64)> {
    match race_name.to_ascii_lowercase().as_str() {
        "dwarf" => vec![(Stat::Vitality, 10), (Stat::Persona, -5), (Stat::Agility, -5)],
        "elf" => vec![(Stat::Intellect, 5), (Stat::Vitality, -5)],
        "saurian" => vec![(Stat::Aura, 5), (Stat::Agility, -5)],
        _ => Vec::new(),
    }
}

/// Class grants at creation: skill bonuses, spells, abilities.
fn class_starting_skills(class_name: &str) -> Vec<(&'static str, i64)> {
    match class_name.to_ascii_lowercase().as_str() {
        "warrior" => vec![
            ("bladed weapons", 5),
            ("bludgeon weapons", 5),
            ("piercing weapons", 5),
            ("shield usage", 5),
            ("armor training", 5),
            ("athletics", 3),
            ("swimming", 3),
        ],
        "mage" => vec![
            ("spellcraft", 5),
            ("magical devices", 5),
            ("concentration", 5),
            ("bladed weapons", 1),
            ("perception", 3),
            ("runecrafting", 3),
        ],
        "cleric" => vec![
            ("piety", 5),
            ("bludgeon weapons", 3),
            ("shield usage", 3),
            ("armor training", 2),
            ("first aid", 5),
            ("concentration", 5),
        ],
        "rogue" => vec![
            ("stealth", 5),
            ("pickpocket", 5),
            ("lockpicking", 5),
            ("disable device", 3),
            ("piercing weapons", 3),
            ("acrobatics", 3),
            ("climbing", 3),
        ],
        _ => Vec::new(),
    }
}

fn class_starting_spells(class_name: &str) -> Vec<&'static str> {
    match class_name.to_ascii_lowercase().as_str() {
        "mage" => vec!["magic missile", "mage armor", "flame bolt"],
        "cleric" => vec!["minor heal", "smite"],
        _ => Vec::new(),
    }
}

fn class_starting_abilities(class_name: &str) -> Vec<&'static str> {
    match class_name.to_ascii_lowercase().as_str() {
        "warrior" => vec!["power strike", "shield bash"],
        "rogue" => vec!["backstab"],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    FirstName,
    LastName,
    Sex,
    Race,
    Class,
    ConfirmStats,
    AssignStats,
    Traits,
}

/// What one input line did to the flow.
pub enum CreationEvent {
    /// Keep going; the caller prints `messages` then `prompt`.
    Continue,
    /// The player typed quit; no character is created.
    Cancelled,
    /// All steps done; insert this row.
    Finished(Box<NewCharacter>),
}

pub struct CreationFlow {
    player_id: i64,
    step: Step,
    first_name: String,
    last_name: String,
    sex: String,
    race_id: i64,
    race_name: String,
    class_id: i64,
    class_name: String,
    rolled: Vec<i64>,
    available: Vec<i64>,
    assigned: StatBlock,
    assign_index: usize,
    trait_keys: Vec<&'static str>,
    trait_index: usize,
    traits: HashMap<&'static str, String>,
    /// Output queued for the session to print.
    pub messages: Vec<String>,
}

impl CreationFlow {
    pub fn new(player_id: i64) -> CreationFlow {
        let mut flow = CreationFlow {
            player_id,
            step: Step::FirstName,
            first_name: String::new(),
            last_name: String::new(),
            sex: "They/Them".into(),
            race_id: 0,
            race_name: String::new(),
            class_id: 0,
            class_name: String::new(),
            rolled: Vec::new(),
            available: Vec::new(),
            assigned: StatBlock::default(),
            assign_index: 0,
            trait_keys: Vec::new(),
            trait_index: 0,
            traits: HashMap::new(),
            messages: Vec::new(),
        };
        flow.messages.push("\r\n{W--- Character Creation ---{x (type 'quit' at any time to cancel)".into());
        flow
    }

    /// Prompt line for the current step.
    pub fn prompt(&self, world: &World) -> String {
        match self.step {
            Step::FirstName => "Enter a first name (1-15 letters): ".into(),
            Step::LastName => "Enter a last name (1-15 letters): ".into(),
            Step::Sex => "Select sex - [M]ale, [F]emale, [T]hey/Them: ".into(),
            Step::Race => {
                let mut lines = vec!["\r\n--- Select a Race ---".to_string()];
                for (index, race) in sorted_races(world) {
                    lines.push(format!(" {index}. {} - {}", race.1, race.2));
                }
                lines.push("Enter the number of your choice: ".into());
                lines.join("\r\n")
            }
            Step::Class => {
                let mut lines = vec!["\r\n--- Select a Class ---".to_string()];
                for (index, class) in sorted_classes(world) {
                    lines.push(format!(" {index}. {} - {}", class.1, class.2));
                }
                lines.push("Enter the number of your choice: ".into());
                lines.join("\r\n")
            }
            Step::ConfirmStats => format!(
                "Your rolls: {}. [K]eep or [R]eroll? ",
                self.rolled.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
            ),
            Step::AssignStats => {
                let stat = Stat::ALL[self.assign_index];
                format!(
                    "Assign a value to {} (available: {}): ",
                    text::capitalize(stat.key()),
                    self.available.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
                )
            }
            Step::Traits => {
                let key = self.trait_keys[self.trait_index];
                format!("{key}? ({}): ", trait_options(key).join(", "))
            }
        }
    }

    /// Advance by one input line.
    pub fn handle_line(&mut self, world: &mut World, line: &str) -> CreationEvent {
        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") {
            return CreationEvent::Cancelled;
        }

        match self.step {
            Step::FirstName | Step::LastName => self.handle_name(input),
            Step::Sex => self.handle_sex(input),
            Step::Race => self.handle_race(world, input),
            Step::Class => self.handle_class(world, input),
            Step::ConfirmStats => self.handle_confirm(world, input),
            Step::AssignStats => self.handle_assign(input),
            Step::Traits => self.handle_trait(input),
        }
    }

    fn handle_name(&mut self, input: &str) -> CreationEvent {
        if input.is_empty() || input.len() > 15 || !input.chars().all(|c| c.is_ascii_alphabetic()) {
            self.messages.push("Invalid name. Use 1-15 letters only.".into());
            return CreationEvent::Continue;
        }
        let name = text::capitalize(&input.to_ascii_lowercase());
        if self.step == Step::FirstName {
            self.first_name = name;
            self.step = Step::LastName;
        } else {
            self.last_name = name;
            self.step = Step::Sex;
        }
        CreationEvent::Continue
    }

    fn handle_sex(&mut self, input: &str) -> CreationEvent {
        let sex = match input.to_ascii_lowercase().as_str() {
            "m" | "male" => "Male",
            "f" | "female" => "Female",
            "t" | "they/them" => "They/Them",
            _ => {
                self.messages.push("Please choose M, F, or T.".into());
                return CreationEvent::Continue;
            }
        };
        self.sex = sex.into();
        self.step = Step::Race;
        CreationEvent::Continue
    }

    fn handle_race(&mut self, world: &mut World, input: &str) -> CreationEvent {
        let Ok(pick) = input.parse::<usize>() else {
            self.messages.push("Please enter a number.".into());
            return CreationEvent::Continue;
        };
        let Some((_, (id, name, _))) = sorted_races(world).into_iter().find(|(i, _)| *i == pick)
        else {
            self.messages.push("Invalid selection.".into());
            return CreationEvent::Continue;
        };
        self.race_id = id;
        self.race_name = name;

        let mods = racial_modifiers(&self.race_name);
        if mods.is_empty() {
            self.messages.push(format!(
                "As a {}, you have no inherent attribute adjustments.",
                self.race_name
            ));
        } else {
            let rendered: Vec<String> = mods
                .iter()
                .map(|(stat, delta)| format!("{}{} {}", if *delta > 0 { "+" } else { "" }, delta, text::capitalize(stat.key())))
                .collect();
            self.messages.push(format!(
                "As a {}, your attributes shift: {}.",
                self.race_name,
                rendered.join(", ")
            ));
        }
        self.step = Step::Class;
        CreationEvent::Continue
    }

    fn handle_class(&mut self, world: &mut World, input: &str) -> CreationEvent {
        let Ok(pick) = input.parse::<usize>() else {
            self.messages.push("Please enter a number.".into());
            return CreationEvent::Continue;
        };
        let Some((_, (id, name, _))) = sorted_classes(world).into_iter().find(|(i, _)| *i == pick)
        else {
            self.messages.push("Invalid selection.".into());
            return CreationEvent::Continue;
        };
        self.class_id = id;
        self.class_name = name;
        self.roll_stats(world);
        self.step = Step::ConfirmStats;
        CreationEvent::Continue
    }

    fn roll_stats(&mut self, world: &mut World) {
        self.rolled = dice::roll_stat_set(&mut world.rng).to_vec();
    }

    fn handle_confirm(&mut self, world: &mut World, input: &str) -> CreationEvent {
        match input.to_ascii_lowercase().as_str() {
            "k" | "keep" => {
                self.available = self.rolled.clone();
                self.assign_index = 0;
                self.step = Step::AssignStats;
            }
            "r" | "reroll" => {
                self.roll_stats(world);
            }
            _ => self.messages.push("Please choose K or R.".into()),
        }
        CreationEvent::Continue
    }

    fn handle_assign(&mut self, input: &str) -> CreationEvent {
        let Ok(value) = input.parse::<i64>() else {
            self.messages.push("Pick one of the available values.".into());
            return CreationEvent::Continue;
        };
        let Some(position) = self.available.iter().position(|&v| v == value) else {
            self.messages.push("That value isn't available.".into());
            return CreationEvent::Continue;
        };
        self.available.remove(position);
        let stat = Stat::ALL[self.assign_index];
        self.assigned.set(stat, value);
        self.assign_index += 1;

        if self.assign_index >= Stat::ALL.len() {
            // Racial adjustments land after assignment, clamped upward.
            for (stat, delta) in racial_modifiers(&self.race_name) {
                let adjusted = (self.assigned.get(stat) + delta).max(1);
                self.assigned.set(stat, adjusted);
            }
            self.trait_keys = traits_for_race(&self.race_name);
            self.trait_index = 0;
            self.step = Step::Traits;
        }
        CreationEvent::Continue
    }

    fn handle_trait(&mut self, input: &str) -> CreationEvent {
        let key = self.trait_keys[self.trait_index];
        let options = trait_options(key);
        let lower = input.to_ascii_lowercase();
        let Some(choice) = options.iter().find(|o| **o == lower) else {
            self.messages.push(format!("Choose one of: {}.", options.join(", ")));
            return CreationEvent::Continue;
        };
        self.traits.insert(key, choice.to_string());
        self.trait_index += 1;

        if self.trait_index >= self.trait_keys.len() {
            return CreationEvent::Finished(Box::new(self.finalize()));
        }
        CreationEvent::Continue
    }

    /// Compose the finished row: description, vitals from class dice,
    /// starting skills/spells/abilities, initial skill points.
    fn finalize(&self) -> NewCharacter {
        let description = self.compose_description();

        let vit_mod = modifier(self.assigned.vitality);
        let aura_mod = modifier(self.assigned.aura);
        let pers_mod = modifier(self.assigned.persona);
        let int_mod = modifier(self.assigned.intellect);

        // Level-1 vitals: one class die plus the relevant modifiers.
        let (hp_die, essence_die) = (self.hp_die(), self.essence_die());
        let max_hp = (hp_die + vit_mod).max(1) as f64;
        let max_essence = (essence_die + aura_mod + pers_mod).max(0) as f64;

        let mut skill_ranks: HashMap<String, i64> = skills::INITIAL_SKILLS
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for (skill, bonus) in class_starting_skills(&self.class_name) {
            *skill_ranks.entry(skill.to_string()).or_insert(0) += bonus;
        }

        let mut initial_points = 5 + int_mod;
        if self.race_name.eq_ignore_ascii_case("human") {
            initial_points += 5;
        }

        let spells: Vec<String> = class_starting_spells(&self.class_name)
            .into_iter()
            .map(String::from)
            .collect();
        let abilities: Vec<String> = class_starting_abilities(&self.class_name)
            .into_iter()
            .map(String::from)
            .collect();

        NewCharacter {
            player_id: self.player_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            sex: self.sex.clone(),
            race_id: self.race_id,
            class_id: self.class_id,
            max_hp,
            max_essence,
            description,
            stats_json: serde_json::to_string(&self.assigned).unwrap_or_else(|_| "{}".into()),
            skills_json: serde_json::to_string(&skill_ranks).unwrap_or_else(|_| "{}".into()),
            known_spells_json: serde_json::to_string(&spells).unwrap_or_else(|_| "[]".into()),
            known_abilities_json: serde_json::to_string(&abilities).unwrap_or_else(|_| "[]".into()),
            unspent_skill_points: initial_points.max(0),
            location_id: RESPAWN_ROOM_ID,
            spiritual_tether: STARTING_SPIRITUAL_TETHER,
        }
    }

    fn hp_die(&self) -> i64 {
        match self.class_name.to_ascii_lowercase().as_str() {
            "warrior" => 10,
            "cleric" => 8,
            "rogue" => 6,
            "mage" => 4,
            _ => 6,
        }
    }

    fn essence_die(&self) -> i64 {
        match self.class_name.to_ascii_lowercase().as_str() {
            "mage" => 10,
            "cleric" => 6,
            "rogue" => 4,
            "warrior" => 4,
            _ => 6,
        }
    }

    fn compose_description(&self) -> String {
        let get = |key: &str| self.traits.get(key).cloned();
        let mut parts: Vec<String> = Vec::new();

        let frame = [get("Height"), get("Build")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if frame.is_empty() {
            parts.push(format!("A {} of unremarkable frame.", self.race_name));
        } else {
            parts.push(format!("{} {frame} {}.", text::capitalize(text::article(&frame)), self.race_name));
        }

        if let Some(tone) = get("Skin Tone") {
            parts.push(format!("Their skin is {tone}."));
        }
        if let Some(pattern) = get("Skin Pattern") {
            parts.push(format!("Their scales run {pattern}."));
        }
        if let Some(shell) = get("Shell Color") {
            parts.push(format!("Their shell is {shell}."));
        }
        if let Some(shape) = get("Head Shape") {
            parts.push(format!("Their head is {shape}."));
        }
        match (get("Hair Style"), get("Hair Color")) {
            (Some(style), Some(color)) => parts.push(format!("Their {color} hair is {style}.")),
            (Some(style), None) => parts.push(format!("Their hair is {style}.")),
            (None, Some(color)) => parts.push(format!("Their hair is {color}.")),
            (None, None) => {}
        }
        if let Some(eyes) = get("Eye Color") {
            parts.push(format!("Their eyes are {eyes}."));
        }
        if let Some(ears) = get("Ear Shape") {
            parts.push(format!("Their ears are {ears}."));
        }
        if let Some(nose) = get("Nose Type") {
            parts.push(format!("Their nose is {nose}."));
        }
        if let Some(beard) = get("Beard Style") {
            if beard != "clean-shaven" {
                parts.push(format!("They are {beard}."));
            }
        }
        parts.join(" ")
    }
}

/// Races as (menu index, (id, name, description)) in id order.
fn sorted_races(world: &World) -> Vec<(usize, (i64, String, String))> {
    let mut races: Vec<_> = world.races.values().collect();
    races.sort_by_key(|r| r.id);
    races
        .into_iter()
        .enumerate()
        .map(|(i, r)| (i + 1, (r.id, r.name.clone(), r.description.clone())))
        .collect()
}

fn sorted_classes(world: &World) -> Vec<(usize, (i64, String, String))> {
    let mut classes: Vec<_> = world.classes.values().collect();
    classes.sort_by_key(|c| c.id);
    classes
        .into_iter()
        .enumerate()
        .map(|(i, c)| (i + 1, (c.id, c.name.clone(), c.description.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::build_world;

    /// Drive a whole creation dialogue and return the finished row.
    async fn run_flow(lines: &[&str]) -> Option<NewCharacter> {
        let mut world = build_world().await;
        let mut flow = CreationFlow::new(1);
        for line in lines {
            match flow.handle_line(&mut world, line) {
                CreationEvent::Finished(new) => return Some(*new),
                CreationEvent::Cancelled => return None,
                CreationEvent::Continue => {}
            }
        }
        panic!("flow did not finish; stuck at prompt {:?}", flow.prompt(&world));
    }

    #[tokio::test]
    async fn full_mage_creation_produces_a_row() {
        // Names, sex, race 1 (Human), class 2 (Mage), keep rolls, assign the
        // six values high-to-low, then walk the human trait list.
        let mut world = build_world().await;
        let mut flow = CreationFlow::new(7);
        for line in ["Vex", "Duskwalker", "f", "1", "2", "k"] {
            assert!(matches!(flow.handle_line(&mut world, line), CreationEvent::Continue));
        }
        // Assign whatever was rolled, in rolled order.
        let values = flow.rolled.clone();
        let mut result = None;
        let mut inputs: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        inputs.extend(
            ["average-height", "lean", "pale", "flowing", "black", "green", "straight", "clean-shaven"]
                .iter()
                .map(|s| s.to_string()),
        );
        for line in inputs {
            match flow.handle_line(&mut world, &line) {
                CreationEvent::Finished(new) => {
                    result = Some(*new);
                    break;
                }
                CreationEvent::Cancelled => panic!("unexpected cancel"),
                CreationEvent::Continue => {}
            }
        }
        let new = result.expect("creation finished");
        assert_eq!(new.player_id, 7);
        assert_eq!(new.first_name, "Vex");
        assert_eq!(new.location_id, RESPAWN_ROOM_ID);
        assert!(new.max_hp >= 1.0);

        let spells: Vec<String> = serde_json::from_str(&new.known_spells_json).unwrap();
        assert!(spells.contains(&"magic missile".to_string()));
        let skills_map: HashMap<String, i64> = serde_json::from_str(&new.skills_json).unwrap();
        assert_eq!(skills_map["spellcraft"], 5);
        assert!(!new.description.is_empty());
    }

    #[tokio::test]
    async fn quit_cancels_anywhere() {
        assert!(run_flow(&["Vex", "quit"]).await.is_none());
        assert!(run_flow(&["quit"]).await.is_none());
    }

    #[tokio::test]
    async fn invalid_names_are_rejected_and_retried() {
        let mut world = build_world().await;
        let mut flow = CreationFlow::new(1);
        flow.handle_line(&mut world, "x99");
        assert!(flow.prompt(&world).contains("first name"), "still on first name");
        flow.handle_line(&mut world, "Vex");
        assert!(flow.prompt(&world).contains("last name"));
    }

    #[tokio::test]
    async fn racial_modifiers_clamp_to_one() {
        // A dwarf assigning a 3 to agility (-5 racial) must land at 1.
        let mut world = build_world().await;
        let mut flow = CreationFlow::new(1);
        for line in ["Brakk", "Stonejaw", "m", "2", "1", "k"] {
            flow.handle_line(&mut world, line);
        }
        // Force a known set so the assignment below is deterministic.
        flow.rolled = vec![16, 14, 12, 10, 8, 3];
        flow.available = flow.rolled.clone();
        flow.assign_index = 0;
        for value in ["16", "14", "3", "12", "10", "8"] {
            flow.handle_line(&mut world, value);
        }
        // might 16, vit 14+10, agi 3-5 -> 1, int 12, aura 10, pers 8-5.
        assert_eq!(flow.assigned.might, 16);
        assert_eq!(flow.assigned.vitality, 24);
        assert_eq!(flow.assigned.agility, 1);
        assert_eq!(flow.assigned.persona, 3);
    }
}
