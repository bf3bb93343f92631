//! Skill catalog: the trainable skill names and the attribute governing
//! each check.

use ashenmoor_core::stats::Stat;

/// Every skill a character sheet carries, in display order.
pub const INITIAL_SKILLS: &[&str] = &[
    "acrobatics",
    "armor training",
    "athletics",
    "bartering",
    "bladed weapons",
    "bludgeon weapons",
    "climbing",
    "concentration",
    "disable device",
    "dodge",
    "first aid",
    "lockpicking",
    "magical devices",
    "martial arts",
    "parrying",
    "perception",
    "pickpocket",
    "piercing weapons",
    "piety",
    "projectile weapons",
    "runecrafting",
    "shield usage",
    "spellcraft",
    "stealth",
    "swimming",
];

/// Attribute whose modifier rides on checks with the skill.
pub fn attribute_for_skill(skill: &str) -> Option<Stat> {
    let stat = match skill.to_ascii_lowercase().as_str() {
        "acrobatics" => Stat::Agility,
        "athletics" => Stat::Might,
        "armor training" => Stat::Vitality,
        "bartering" => Stat::Persona,
        "bladed weapons" => Stat::Agility,
        "bludgeon weapons" => Stat::Might,
        "climbing" => Stat::Might,
        "concentration" => Stat::Intellect,
        "disable device" => Stat::Intellect,
        "dodge" => Stat::Agility,
        "first aid" => Stat::Intellect,
        "lockpicking" => Stat::Agility,
        "magical devices" => Stat::Intellect,
        "martial arts" => Stat::Agility,
        "parrying" => Stat::Agility,
        "perception" => Stat::Intellect,
        "pickpocket" => Stat::Agility,
        "piercing weapons" => Stat::Agility,
        "piety" => Stat::Aura,
        "projectile weapons" => Stat::Agility,
        "runecrafting" => Stat::Intellect,
        "shield usage" => Stat::Might,
        "spellcraft" => Stat::Intellect,
        "stealth" => Stat::Agility,
        "swimming" => Stat::Vitality,
        _ => return None,
    };
    Some(stat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_initial_skill_has_a_governing_attribute() {
        for skill in INITIAL_SKILLS {
            assert!(
                attribute_for_skill(skill).is_some(),
                "{skill} has no governing attribute"
            );
        }
    }

    #[test]
    fn unknown_skills_have_none() {
        assert_eq!(attribute_for_skill("basket weaving"), None);
    }
}
