//! Rooms: topology nodes plus runtime occupancy. The exits column is
//! JSON-shaped — a bare destination id or a descriptor with skill checks,
//! locks and traps — and hydrates into typed records here.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use ashenmoor_core::flags::RoomFlags;
use ashenmoor_core::text;
use ashenmoor_core::weather::WeatherCondition;

use crate::db::world::{RoomObjectRow, RoomRow};
use crate::item::TrapState;
use crate::world::World;
use crate::{CharacterId, ItemId, MobId, RoomId};

/// Skill gate on an exit: d20 + rank + attribute mod vs dc.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillCheck {
    pub skill: String,
    #[serde(default = "default_dc")]
    pub dc: i64,
    pub fail_msg: Option<String>,
    pub success_msg: Option<String>,
    #[serde(default)]
    pub fail_damage: i64,
}

fn default_dc() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExitLock {
    #[serde(default)]
    pub locked: bool,
    pub key_id: Option<i64>,
    pub lockpick_dc: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Exit {
    pub to: RoomId,
    pub skill_check: Option<SkillCheck>,
    pub lock: Option<ExitLock>,
    pub trap: Option<TrapState>,
}

/// Wire shape of one exits-table value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExitSpec {
    Simple(i64),
    Detailed {
        target: i64,
        #[serde(default)]
        skill_check: Option<SkillCheck>,
        #[serde(default)]
        lock: Option<ExitLock>,
        #[serde(default)]
        trap: Option<TrapState>,
    },
}

/// Scenery: keyword-addressable, purely descriptive.
#[derive(Debug, Clone)]
pub struct RoomObject {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
}

impl RoomObject {
    pub fn from_row(row: &RoomObjectRow) -> RoomObject {
        let keywords: Vec<String> = serde_json::from_str(&row.keywords).unwrap_or_default();
        RoomObject {
            name: row.name.clone(),
            description: row.description.clone(),
            keywords: keywords.iter().map(|k| k.to_ascii_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnerInfo {
    #[serde(default = "default_max_present")]
    pub max_present: usize,
}

fn default_max_present() -> usize {
    1
}

/// Shop buy filter entry: an item type name or a specific template id.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BuyFilterEntry {
    Template(i64),
    Type(String),
}

#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub area_id: i64,
    pub name: String,
    pub description: String,
    pub exits: HashMap<String, Exit>,
    pub flags: RoomFlags,
    pub spawners: HashMap<i64, SpawnerInfo>,
    pub coinage: i64,
    pub objects: Vec<RoomObject>,
    pub shop_buy_filter: Option<Vec<BuyFilterEntry>>,
    pub shop_sell_modifier: f64,
    pub weather: WeatherCondition,
    // Runtime occupancy, id-centric.
    pub characters: HashSet<CharacterId>,
    pub mobs: HashSet<MobId>,
    pub items: Vec<ItemId>,
    pub dirty: bool,
}

impl Room {
    pub fn from_row(row: &RoomRow) -> Room {
        let mut exits = HashMap::new();
        match serde_json::from_str::<HashMap<String, ExitSpec>>(&row.exits) {
            Ok(specs) => {
                for (token, spec) in specs {
                    let exit = match spec {
                        ExitSpec::Simple(target) => Exit {
                            to: target,
                            skill_check: None,
                            lock: None,
                            trap: None,
                        },
                        ExitSpec::Detailed { target, skill_check, lock, trap } => Exit {
                            to: target,
                            skill_check,
                            lock,
                            trap,
                        },
                    };
                    exits.insert(token.to_ascii_lowercase(), exit);
                }
            }
            Err(e) => log::error!("Room {} has bad exits JSON: {e}", row.id),
        }

        let flag_names: Vec<String> = serde_json::from_str(&row.flags).unwrap_or_default();
        let flags = RoomFlags::from_names(flag_names.iter().map(String::as_str));

        let spawners: HashMap<i64, SpawnerInfo> =
            match serde_json::from_str::<HashMap<String, SpawnerInfo>>(&row.spawners) {
                Ok(map) => map
                    .into_iter()
                    .filter_map(|(k, v)| match k.parse::<i64>() {
                        Ok(id) => Some((id, v)),
                        Err(_) => {
                            log::warn!("Room {} spawner key {k:?} is not a template id", row.id);
                            None
                        }
                    })
                    .collect(),
                Err(e) => {
                    log::error!("Room {} has bad spawners JSON: {e}", row.id);
                    HashMap::new()
                }
            };

        let shop_buy_filter = row
            .shop_buy_filter
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<BuyFilterEntry>>(raw).ok());

        Room {
            id: row.id,
            area_id: row.area_id,
            name: row.name.clone(),
            description: row.description.clone(),
            exits,
            flags,
            spawners,
            coinage: row.coinage.max(0),
            objects: Vec::new(),
            shop_buy_filter,
            shop_sell_modifier: row.shop_sell_modifier,
            weather: WeatherCondition::Clear,
            characters: HashSet::new(),
            mobs: HashSet::new(),
            items: Vec::new(),
            dirty: false,
        }
    }

    pub fn is_node(&self) -> bool {
        self.flags.contains(RoomFlags::NODE)
    }

    pub fn object_by_keyword(&self, keyword: &str) -> Option<&RoomObject> {
        let k = keyword.to_ascii_lowercase();
        self.objects.iter().find(|o| o.keywords.iter().any(|kw| kw == &k))
    }

    /// Formatted room appearance for one looker.
    pub fn look_string(&self, world: &World, looker: CharacterId) -> String {
        let area_name = world
            .area(self.area_id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| format!("Area {}", self.area_id));

        let can_see = world
            .character(looker)
            .map(|c| c.can_see(world))
            .unwrap_or(true);
        if !can_see {
            return "It is pitch black...".to_string();
        }

        let mut exit_names: Vec<&str> = self.exits.keys().map(String::as_str).collect();
        exit_names.sort_unstable();
        let exits_line = if exit_names.is_empty() {
            "none".to_string()
        } else {
            exit_names.join(", ")
        };

        let mut lines = vec![
            format!("{{c[{}, {}]{{x", self.name, area_name),
            self.description.clone(),
            format!("[Exits: {exits_line}]"),
        ];

        let mut other_names: Vec<String> = self
            .characters
            .iter()
            .filter(|&&id| id != looker)
            .filter_map(|&id| world.character(id))
            .filter(|c| !c.hidden)
            .map(|c| c.name.clone())
            .collect();
        other_names.sort_unstable();
        if !other_names.is_empty() {
            lines.push(format!("Also here: {}.", other_names.join(", ")));
        }

        let mut mob_counts: HashMap<String, usize> = HashMap::new();
        for &mob_id in &self.mobs {
            if let Some(mob) = world.mob(mob_id) {
                if mob.is_alive() && !mob.hidden {
                    *mob_counts.entry(mob.name.clone()).or_default() += 1;
                }
            }
        }
        if !mob_counts.is_empty() {
            let mut entries: Vec<(String, usize)> = mob_counts.into_iter().collect();
            entries.sort_unstable();
            let rendered: Vec<String> = entries
                .into_iter()
                .map(|(name, count)| {
                    let cap = text::capitalize(&name);
                    if count > 1 {
                        format!("{cap} (x{count})")
                    } else {
                        cap
                    }
                })
                .collect();
            lines.push(format!("Visible creatures: {}.", rendered.join(", ")));
        }

        if !self.objects.is_empty() {
            let mut names: Vec<&str> = self.objects.iter().map(|o| o.name.as_str()).collect();
            names.sort_unstable();
            lines.push(format!("Objects of interest: {}.", names.join(", ")));
        }

        lines.join("\r\n")
    }

    /// "You also see here: ..." — ground items and loose coinage.
    pub fn ground_contents_line(&self, world: &World) -> Option<String> {
        let mut entries: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for &item_id in &self.items {
            if let Some(template) = world.template_of(item_id) {
                *counts.entry(template.name.clone()).or_default() += 1;
            }
        }
        let mut named: Vec<(String, usize)> = counts.into_iter().collect();
        named.sort_unstable();
        for (name, count) in named {
            if count > 1 {
                entries.push(format!("{name} (x{count})"));
            } else {
                entries.push(name);
            }
        }
        if self.coinage > 0 {
            entries.push(text::format_coinage(self.coinage));
        }
        if entries.is_empty() {
            None
        } else {
            Some(format!("You also see here: {}.", entries.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(exits: &str) -> RoomRow {
        RoomRow {
            id: 10,
            area_id: 1,
            name: "A Test Chamber".into(),
            description: "Bare stone.".into(),
            exits: exits.into(),
            flags: r#"["INDOORS"]"#.into(),
            spawners: r#"{"7": {"max_present": 2}}"#.into(),
            coinage: 5,
            shop_buy_filter: None,
            shop_sell_modifier: 0.5,
        }
    }

    #[test]
    fn simple_and_detailed_exits_hydrate() {
        let room = Room::from_row(&row(
            r#"{"north": 11,
                "up": {"target": 12,
                        "skill_check": {"skill": "climbing", "dc": 15,
                                         "fail_msg": "You slip.", "fail_damage": 4}}}"#,
        ));
        assert_eq!(room.exits["north"].to, 11);
        assert!(room.exits["north"].skill_check.is_none());

        let up = &room.exits["up"];
        assert_eq!(up.to, 12);
        let check = up.skill_check.as_ref().unwrap();
        assert_eq!(check.skill, "climbing");
        assert_eq!(check.dc, 15);
        assert_eq!(check.fail_damage, 4);
    }

    #[test]
    fn bad_exits_json_leaves_room_sealed() {
        let room = Room::from_row(&row("not json"));
        assert!(room.exits.is_empty());
    }

    #[test]
    fn spawners_key_on_template_ids() {
        let room = Room::from_row(&row("{}"));
        assert_eq!(room.spawners[&7].max_present, 2);
    }

    #[test]
    fn flags_hydrate() {
        let room = Room::from_row(&row("{}"));
        assert!(room.flags.contains(RoomFlags::INDOORS));
        assert!(!room.is_node());
    }
}
