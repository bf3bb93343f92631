//! The world registry: canonical owner of every room, template, active
//! character, mob, live item and group. Runtime objects reference each other
//! by id and resolve through here, so moving an entity can never leave a
//! stale pointer behind.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ashenmoor_core::colors::colorize;
use ashenmoor_core::weather::{Climate, WeatherCondition};

use crate::abilities::Ability;
use crate::character::Character;
use crate::db::Db;
use crate::item::{ItemInstance, ItemTemplate};
use crate::mob::{Mob, MobTemplate};
use crate::net::Outbox;
use crate::room::{Room, RoomObject};
use crate::{CharacterId, GroupId, ItemId, MobId, RoomId};
use crate::group::Group;

/// A combat participant: either an active character or a spawned mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    Char(CharacterId),
    Mob(MobId),
}

#[derive(Debug, Clone)]
pub struct Area {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub climate: Climate,
    pub weather: WeatherCondition,
}

#[derive(Debug, Clone)]
pub struct Race {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub hp_die: i64,
    pub essence_die: i64,
}

/// One stock line of a shop room. Quantity -1 is infinite.
#[derive(Debug, Clone)]
pub struct ShopStock {
    pub row_id: i64,
    pub item_template_id: i64,
    pub stock_quantity: i64,
    pub buy_price_modifier: f64,
    pub sell_price_modifier: f64,
}

pub struct World {
    pub db: Db,
    started: Instant,
    clock_skew: f64,
    pub rng: StdRng,

    pub areas: HashMap<i64, Area>,
    pub rooms: HashMap<RoomId, Room>,
    pub races: HashMap<i64, Race>,
    pub classes: HashMap<i64, ClassDef>,
    pub item_templates: HashMap<i64, ItemTemplate>,
    pub mob_templates: HashMap<i64, MobTemplate>,
    pub abilities: HashMap<String, Ability>,
    pub shops: HashMap<RoomId, Vec<ShopStock>>,

    pub characters: HashMap<CharacterId, Character>,
    pub mobs: HashMap<MobId, Mob>,
    pub items: HashMap<ItemId, ItemInstance>,
    pub groups: HashMap<GroupId, Group>,
    outboxes: HashMap<CharacterId, Outbox>,

    next_mob_id: MobId,
    next_group_id: GroupId,
}

impl World {
    /// Load all catalogs and topology and spawn the initial mob population.
    /// The default room 1 missing is fatal: there would be nowhere to put
    /// anyone.
    pub async fn build(db: Db) -> anyhow::Result<World> {
        log::info!("Building world state from database...");

        let mut world = World {
            db: db.clone(),
            started: Instant::now(),
            clock_skew: 0.0,
            rng: StdRng::from_entropy(),
            areas: HashMap::new(),
            rooms: HashMap::new(),
            races: HashMap::new(),
            classes: HashMap::new(),
            item_templates: HashMap::new(),
            mob_templates: HashMap::new(),
            abilities: HashMap::new(),
            shops: HashMap::new(),
            characters: HashMap::new(),
            mobs: HashMap::new(),
            items: HashMap::new(),
            groups: HashMap::new(),
            outboxes: HashMap::new(),
            next_mob_id: 1,
            next_group_id: 1,
        };

        for row in db.load_all_areas().await.context("loading areas")? {
            let climate = Climate::parse(&row.climate).unwrap_or_else(|| {
                log::warn!("Area {} has unknown climate {:?}", row.id, row.climate);
                Climate::default()
            });
            world.areas.insert(
                row.id,
                Area {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    climate,
                    weather: WeatherCondition::Clear,
                },
            );
        }
        for row in db.load_all_races().await.context("loading races")? {
            world.races.insert(row.id, Race { id: row.id, name: row.name, description: row.description });
        }
        for row in db.load_all_classes().await.context("loading classes")? {
            world.classes.insert(
                row.id,
                ClassDef {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    hp_die: row.hp_die,
                    essence_die: row.essence_die,
                },
            );
        }
        for row in db.load_all_item_templates().await.context("loading item templates")? {
            world.item_templates.insert(row.id, ItemTemplate::from_row(&row));
        }
        for row in db.load_all_mob_templates().await.context("loading mob templates")? {
            world.mob_templates.insert(row.id, MobTemplate::from_row(&row));
        }
        for row in db.load_all_abilities().await.context("loading abilities")? {
            if let Some(ability) = Ability::from_row(&row) {
                world.abilities.insert(ability.key.clone(), ability);
            }
        }
        log::info!(
            "Loaded {} areas, {} races, {} classes, {} item templates, {} mob templates, {} abilities.",
            world.areas.len(),
            world.races.len(),
            world.classes.len(),
            world.item_templates.len(),
            world.mob_templates.len(),
            world.abilities.len()
        );

        for row in db.load_all_rooms().await.context("loading rooms")? {
            world.rooms.insert(row.id, Room::from_row(&row));
        }
        anyhow::ensure!(
            world.rooms.contains_key(&ashenmoor_core::constants::RESPAWN_ROOM_ID),
            "default room {} not found; cannot boot",
            ashenmoor_core::constants::RESPAWN_ROOM_ID
        );

        for row in db.load_all_room_objects().await.context("loading room objects")? {
            match world.rooms.get_mut(&row.room_id) {
                Some(room) => room.objects.push(RoomObject::from_row(&row)),
                None => log::warn!("Room object {} references missing room {}", row.id, row.room_id),
            }
        }

        for row in db.load_all_shop_inventories().await.context("loading shops")? {
            world.shops.entry(row.room_id).or_default().push(ShopStock {
                row_id: row.id,
                item_template_id: row.item_template_id,
                stock_quantity: row.stock_quantity,
                buy_price_modifier: row.buy_price_modifier,
                sell_price_modifier: row.sell_price_modifier,
            });
        }

        // Ground items first, then container contents linked by owner rows.
        let instance_rows = db
            .load_world_item_instances()
            .await
            .context("loading world item instances")?;
        for row in &instance_rows {
            world.items.insert(row.id, ItemInstance::from_row(row));
        }
        for row in &instance_rows {
            if let Some(room_id) = row.room_id {
                match world.rooms.get_mut(&room_id) {
                    Some(room) => room.items.push(row.id),
                    None => log::warn!("Item {} rests in missing room {room_id}", row.id),
                }
            } else if let Some(container_id) = row.container_id {
                match world.items.get_mut(&container_id) {
                    Some(container) => container.contents.push(row.id),
                    None => log::warn!("Item {} sits in missing container {container_id}", row.id),
                }
            }
        }
        log::info!("Loaded {} rooms and {} loose item instances.", world.rooms.len(), world.items.len());

        world.spawn_initial_mobs();
        log::info!("World build complete.");
        Ok(world)
    }

    fn spawn_initial_mobs(&mut self) {
        let mut plan: Vec<(RoomId, i64, usize)> = Vec::new();
        for room in self.rooms.values() {
            for (&template_id, info) in &room.spawners {
                plan.push((room.id, template_id, info.max_present));
            }
        }

        let mut spawned = 0usize;
        for (room_id, template_id, count) in plan {
            if !self.mob_templates.contains_key(&template_id) {
                log::warn!("Room {room_id} spawner references missing mob template {template_id}");
                continue;
            }
            for _ in 0..count {
                if self.spawn_mob(template_id, room_id).is_some() {
                    spawned += 1;
                }
            }
        }
        log::info!("Spawned {spawned} initial mobs.");
    }

    pub fn spawn_mob(&mut self, template_id: i64, room_id: RoomId) -> Option<MobId> {
        let template = self.mob_templates.get(&template_id)?;
        if !self.rooms.contains_key(&room_id) {
            return None;
        }
        let id = self.next_mob_id;
        self.next_mob_id += 1;
        let mob = Mob::spawn(id, template, room_id, &mut self.rng);
        self.mobs.insert(id, mob);
        self.rooms.get_mut(&room_id).map(|room| room.mobs.insert(id));
        Some(id)
    }

    // --- Clock ---

    /// Monotonic seconds since boot. Every deadline in the world uses this
    /// scale.
    pub fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64() + self.clock_skew
    }

    /// Jump the clock forward; tests drive expirations with this.
    #[cfg(test)]
    pub fn advance_clock(&mut self, seconds: f64) {
        self.clock_skew += seconds;
    }

    // --- Getters ---

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn area(&self, id: i64) -> Option<&Area> {
        self.areas.get(&id)
    }

    pub fn race_name(&self, id: i64) -> String {
        self.races.get(&id).map(|r| r.name.clone()).unwrap_or_else(|| "Unknown".into())
    }

    pub fn class_name(&self, id: i64) -> String {
        self.classes.get(&id).map(|c| c.name.clone()).unwrap_or_else(|| "Unknown".into())
    }

    pub fn class_def(&self, id: i64) -> Option<&ClassDef> {
        self.classes.get(&id)
    }

    pub fn item_template(&self, id: i64) -> Option<&ItemTemplate> {
        self.item_templates.get(&id)
    }

    pub fn mob_template(&self, id: i64) -> Option<&MobTemplate> {
        self.mob_templates.get(&id)
    }

    pub fn ability(&self, key: &str) -> Option<&Ability> {
        self.abilities.get(&key.to_ascii_lowercase())
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn mob(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(&id)
    }

    pub fn mob_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.mobs.get_mut(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemInstance> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut ItemInstance> {
        self.items.get_mut(&id)
    }

    /// Template behind a live instance.
    pub fn template_of(&self, item_id: ItemId) -> Option<&ItemTemplate> {
        let instance = self.items.get(&item_id)?;
        self.item_templates.get(&instance.template_id)
    }

    pub fn item_name(&self, item_id: ItemId) -> String {
        self.template_of(item_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("item #{item_id}"))
    }

    // --- Active characters ---

    pub fn add_active_character(&mut self, character: Character, outbox: Outbox) {
        self.outboxes.insert(character.id, outbox);
        self.characters.insert(character.id, character);
    }

    pub fn remove_active_character(&mut self, id: CharacterId) -> Option<Character> {
        self.outboxes.remove(&id);
        self.characters.remove(&id)
    }

    /// First-name lookup among everyone online.
    pub fn find_online_by_name(&self, name: &str) -> Option<CharacterId> {
        let lower = name.to_ascii_lowercase();
        self.characters
            .values()
            .find(|c| c.first_name.to_ascii_lowercase() == lower)
            .map(|c| c.id)
    }

    /// First-name lookup within one room.
    pub fn find_character_in_room(&self, room_id: RoomId, name: &str) -> Option<CharacterId> {
        let lower = name.to_ascii_lowercase();
        let room = self.room(room_id)?;
        room.characters
            .iter()
            .filter_map(|&id| self.character(id))
            .find(|c| c.first_name.to_ascii_lowercase() == lower)
            .map(|c| c.id)
    }

    /// Partial-name lookup for a living mob within one room.
    pub fn find_mob_in_room(&self, room_id: RoomId, name: &str) -> Option<MobId> {
        let lower = name.to_ascii_lowercase();
        let room = self.room(room_id)?;
        let mut ids: Vec<MobId> = room.mobs.iter().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.mob(id))
            .find(|m| m.is_alive() && m.name.to_ascii_lowercase().contains(&lower))
            .map(|m| m.id)
    }

    /// Partial-name lookup among ground items in one room.
    pub fn find_item_in_room(&self, room_id: RoomId, name: &str) -> Option<ItemId> {
        let lower = name.to_ascii_lowercase();
        let room = self.room(room_id)?;
        room.items
            .iter()
            .copied()
            .find(|&id| {
                self.template_of(id)
                    .map_or(false, |t| t.name.to_ascii_lowercase().contains(&lower))
            })
    }

    /// Partial-name lookup in a character's hands.
    pub fn find_item_in_inventory(&self, character: CharacterId, name: &str) -> Option<ItemId> {
        let lower = name.to_ascii_lowercase();
        let c = self.character(character)?;
        c.inventory.iter().copied().find(|&id| {
            self.template_of(id)
                .map_or(false, |t| t.name.to_ascii_lowercase().contains(&lower))
        })
    }

    /// Partial-name lookup across a character's equipment.
    pub fn find_item_in_equipment(
        &self,
        character: CharacterId,
        name: &str,
    ) -> Option<(ashenmoor_core::slots::WearSlot, ItemId)> {
        let lower = name.to_ascii_lowercase();
        let c = self.character(character)?;
        for slot in ashenmoor_core::slots::WearSlot::ALL {
            if let Some(&item_id) = c.equipment.get(&slot) {
                if self
                    .template_of(item_id)
                    .map_or(false, |t| t.name.to_ascii_lowercase().contains(&lower))
                {
                    return Some((slot, item_id));
                }
            }
        }
        None
    }

    // --- Groups ---

    pub fn create_group(&mut self, leader: CharacterId) -> GroupId {
        let id = self.next_group_id;
        self.next_group_id += 1;
        self.groups.insert(id, Group::new(id, leader));
        if let Some(c) = self.character_mut(leader) {
            c.group_id = Some(id);
        }
        id
    }

    /// Living group mates present in the same room, the member included.
    pub fn present_group_members(&self, character: CharacterId) -> Vec<CharacterId> {
        let Some(c) = self.character(character) else { return vec![character] };
        let Some(group_id) = c.group_id else { return vec![character] };
        let Some(group) = self.groups.get(&group_id) else { return vec![character] };
        group
            .members
            .iter()
            .copied()
            .filter(|&id| {
                self.character(id)
                    .map_or(false, |m| m.location_id == c.location_id && m.is_alive())
            })
            .collect()
    }

    // --- Messaging ---

    /// Queue a line for one character. Rendering to ANSI happens here, at
    /// the edge; a broken channel only flags the session for teardown.
    pub fn send_to_char(&self, id: CharacterId, message: &str) {
        let Some(outbox) = self.outboxes.get(&id) else { return };
        let mut rendered = colorize(message);
        if !rendered.ends_with('\n') {
            rendered.push_str("\r\n");
        }
        if outbox.send(rendered).is_err() {
            log::debug!("Outbox for character {id} is closed");
        }
    }

    /// Queue text without a trailing newline (prompts).
    pub fn send_raw_to_char(&self, id: CharacterId, text: &str) {
        if let Some(outbox) = self.outboxes.get(&id) {
            let _ = outbox.send(colorize(text));
        }
    }

    /// Send to every character in a room except the listed ones. Enqueues
    /// only; never blocks on a slow client.
    pub fn broadcast_room(&self, room_id: RoomId, message: &str, exclude: &[CharacterId]) {
        let Some(room) = self.room(room_id) else { return };
        for &id in &room.characters {
            if !exclude.contains(&id) {
                self.send_to_char(id, message);
            }
        }
    }

    /// Send to every member of a group, wherever they are.
    pub fn broadcast_group(&self, group_id: GroupId, message: &str, exclude: &[CharacterId]) {
        let Some(group) = self.groups.get(&group_id) else { return };
        for &id in &group.members {
            if !exclude.contains(&id) {
                self.send_to_char(id, message);
            }
        }
    }

    pub fn mark_room_dirty(&mut self, room_id: RoomId) {
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.dirty = true;
        }
    }

    // --- Actor helpers ---

    pub fn actor_name(&self, actor: Actor) -> String {
        match actor {
            Actor::Char(id) => self
                .character(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "someone".into()),
            Actor::Mob(id) => self
                .mob(id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| "something".into()),
        }
    }

    pub fn actor_room(&self, actor: Actor) -> Option<RoomId> {
        match actor {
            Actor::Char(id) => self.character(id).map(|c| c.location_id),
            Actor::Mob(id) => self.mob(id).map(|m| m.room_id),
        }
    }

    pub fn actor_is_alive(&self, actor: Actor) -> bool {
        match actor {
            Actor::Char(id) => self.character(id).map_or(false, |c| c.is_alive()),
            Actor::Mob(id) => self.mob(id).map_or(false, |m| m.is_alive()),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! Shared scaffolding for tests that need a live world without the
    //! network: an in-memory database, a world built from the seeds, and
    //! a few helpers to conjure characters and content.

    use super::*;
    use crate::character::Character;
    use crate::db::characters::CharacterRow;

    /// Build a world over a fresh in-memory database.
    pub async fn build_world() -> World {
        let db = Db::connect_in_memory().await.expect("in-memory db");
        let mut world = World::build(db).await.expect("world build");
        world.rng = StdRng::seed_from_u64(0xA5_1234);
        world
    }

    pub fn blank_character_row(id: CharacterId) -> CharacterRow {
        CharacterRow {
            id,
            player_id: 1,
            first_name: format!("Test{id}"),
            last_name: "Subject".into(),
            sex: "They/Them".into(),
            race_id: Some(1),
            class_id: Some(1),
            level: 1,
            hp: 20.0,
            max_hp: 20.0,
            essence: 10.0,
            max_essence: 10.0,
            xp_pool: 0.0,
            xp_total: 0.0,
            unspent_skill_points: 0,
            unspent_attribute_points: 0,
            spiritual_tether: 10,
            description: String::new(),
            coinage: 0,
            location_id: 1,
            status: "ALIVE".into(),
            stance: "Standing".into(),
            stats: "{}".into(),
            skills: "{}".into(),
            known_spells: "[]".into(),
            known_abilities: "[]".into(),
            hunger: 100.0,
            thirst: 100.0,
            total_playtime_seconds: 0,
        }
    }

    /// Insert an active character into room 1 (or the given room) with a
    /// throwaway outbox.
    pub fn add_test_character(world: &mut World, id: CharacterId, room_id: RoomId) -> CharacterId {
        let row = blank_character_row(id);
        let mut character = Character::from_row(&row, false);
        character.location_id = room_id;
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        // The receiver is dropped on purpose; sends are best-effort in tests.
        drop(rx);
        world.add_active_character(character, tx);
        if let Some(room) = world.room_mut(room_id) {
            room.characters.insert(id);
        }
        id
    }

    /// Register an item template directly in the registry.
    pub fn add_template(world: &mut World, id: i64, item_type: &str, stats_json: &str) {
        let row = crate::db::world::ItemTemplateRow {
            id,
            name: format!("a test item {id}"),
            description: String::new(),
            item_type: item_type.into(),
            damage_type: Some("slash".into()),
            flags: "[]".into(),
            stats: stats_json.into(),
        };
        world.item_templates.insert(id, crate::item::ItemTemplate::from_row(&row));
    }

    /// Like `add_test_character`, keeping the receiving end so the test can
    /// read what the character was told.
    pub fn add_observed_character(
        world: &mut World,
        id: CharacterId,
        room_id: RoomId,
    ) -> tokio::sync::mpsc::UnboundedReceiver<String> {
        let row = blank_character_row(id);
        let mut character = Character::from_row(&row, false);
        character.location_id = room_id;
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        world.add_active_character(character, tx);
        if let Some(room) = world.room_mut(room_id) {
            room.characters.insert(id);
        }
        rx
    }

    /// Everything queued on an observed character's outbox, concatenated.
    pub fn drain_output(rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> String {
        let mut out = String::new();
        while let Ok(chunk) = rx.try_recv() {
            out.push_str(&chunk);
        }
        out
    }

    /// Register a live item instance without touching the database.
    pub fn add_instance(world: &mut World, id: ItemId, template_id: i64) {
        world.items.insert(
            id,
            crate::item::ItemInstance {
                id,
                template_id,
                condition: 100,
                stats: Default::default(),
                contents: Vec::new(),
            },
        );
    }

    /// Register a mob template and spawn one instance into a room.
    pub fn add_test_mob(
        world: &mut World,
        template_id: i64,
        room_id: RoomId,
        flags: &str,
    ) -> MobId {
        let row = crate::db::world::MobTemplateRow {
            id: template_id,
            name: "a giant rat".into(),
            description: "Mangy and bold.".into(),
            level: 1,
            max_hp: 20,
            stats: r#"{"might": 9, "agility": 9}"#.into(),
            attacks: r#"[{"name": "a bite", "damage_base": 2, "damage_rng": 3, "speed": 2.0}]"#.into(),
            loot: r#"{"coinage_max": 10, "items": []}"#.into(),
            flags: flags.into(),
            resistances: "{}".into(),
            respawn_delay_seconds: 30,
        };
        world
            .mob_templates
            .insert(template_id, crate::mob::MobTemplate::from_row(&row));
        world.spawn_mob(template_id, room_id).expect("mob spawns")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn build_loads_seeded_catalogs() {
        let world = build_world().await;
        assert!(world.rooms.contains_key(&1));
        assert_eq!(world.races.len(), 4);
        assert_eq!(world.classes.len(), 4);
        assert!(world.ability("magic missile").is_some());
        assert!(world.ability("MAGIC MISSILE").is_some(), "ability lookup is case-insensitive");
    }

    #[tokio::test]
    async fn active_character_round_trip() {
        let mut world = build_world().await;
        add_test_character(&mut world, 50, 1);

        assert!(world.character(50).is_some());
        assert_eq!(world.find_online_by_name("test50"), Some(50));
        assert_eq!(world.find_character_in_room(1, "Test50"), Some(50));

        let removed = world.remove_active_character(50).unwrap();
        assert_eq!(removed.id, 50);
        assert!(world.character(50).is_none());
    }

    #[tokio::test]
    async fn clock_advances_with_skew() {
        let mut world = build_world().await;
        let before = world.now();
        world.advance_clock(500.0);
        assert!(world.now() >= before + 500.0);
    }
}
