//! Item manipulation: hands, equipment, containers, consumables, repair.
//! Every ownership change writes the database first and mutates memory only
//! after the row moved, so a failed write never leaves a phantom item.

use ashenmoor_core::flags::{ItemFlags, RoomFlags};
use ashenmoor_core::text;
use ashenmoor_core::types::{DamageType, ItemType, Status};

use crate::combat::damage::DamageInfo;
use crate::combat::outcome::handle_defeat;
use crate::db::items::ItemOwner;
use crate::item::ItemInstance;
use crate::world::{Actor, World};
use crate::{CharacterId, ItemId};

pub async fn cmd_inventory(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    let mut lines = vec!["{W--- You are carrying ---{x".to_string()];
    if c.inventory.is_empty() {
        lines.push("  nothing in your hands".to_string());
    } else {
        for &item_id in &c.inventory {
            lines.push(format!("  {}", world.item_name(item_id)));
        }
    }
    lines.push(format!(
        "Coinage: {}.  Burden: {}/{}.",
        text::format_coinage(c.coinage),
        c.current_weight(world),
        c.max_weight()
    ));
    world.send_to_char(cn, &lines.join("\r\n"));
    true
}

/// Detach an item from whatever in-memory owner currently holds it.
fn detach_everywhere(world: &mut World, item_id: ItemId) {
    let holders: Vec<ItemId> = world
        .items
        .iter()
        .filter(|(_, i)| i.contents.contains(&item_id))
        .map(|(&id, _)| id)
        .collect();
    for holder in holders {
        if let Some(container) = world.item_mut(holder) {
            container.contents.retain(|&id| id != item_id);
        }
    }
    let rooms_holding: Vec<crate::RoomId> = world
        .rooms
        .iter()
        .filter(|(_, r)| r.items.contains(&item_id))
        .map(|(&id, _)| id)
        .collect();
    for room_id in rooms_holding {
        if let Some(room) = world.room_mut(room_id) {
            room.items.retain(|&id| id != item_id);
        }
    }
    let chars_holding: Vec<CharacterId> = world
        .characters
        .iter()
        .filter(|(_, c)| c.inventory.contains(&item_id) || c.equipment.values().any(|&v| v == item_id))
        .map(|(&id, _)| id)
        .collect();
    for char_id in chars_holding {
        if let Some(c) = world.character_mut(char_id) {
            c.inventory.retain(|&id| id != item_id);
            c.equipment.retain(|_, &mut v| v != item_id);
            c.dirty = true;
        }
    }
}

pub async fn cmd_get(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    let room_id = c.location_id;
    if args.trim().is_empty() {
        world.send_to_char(cn, "Get what?");
        return true;
    }
    if c.hands_are_full() {
        world.send_to_char(cn, "Your hands are full.");
        return true;
    }

    let lower = args.to_ascii_lowercase();
    let (item_name, container_name) = match lower.split_once(" from ") {
        Some((item, container)) => (item.trim().to_string(), Some(container.trim().to_string())),
        None => (lower.trim().to_string(), None),
    };

    let item_id = match &container_name {
        Some(container_name) => {
            let Some(container_id) = find_container(world, cn, room_id, container_name) else {
                world.send_to_char(cn, &format!("You see no '{container_name}' here."));
                return true;
            };
            if !world.item(container_id).map_or(false, |i| i.stats.open) {
                world.send_to_char(cn, &format!("The {} is closed.", short_name(world, container_id)));
                return true;
            }
            let contents = world
                .item(container_id)
                .map(|i| i.contents.clone())
                .unwrap_or_default();
            contents.into_iter().find(|&id| {
                world
                    .template_of(id)
                    .map_or(false, |t| t.name.to_ascii_lowercase().contains(&item_name))
            })
        }
        None => world.find_item_in_room(room_id, &item_name),
    };

    let Some(item_id) = item_id else {
        world.send_to_char(cn, &format!("You see no '{item_name}' here to take."));
        return true;
    };

    let weight = world.template_of(item_id).map_or(1, |t| t.stats.weight);
    let Some(c) = world.character(cn) else { return true };
    if c.current_weight(world) + weight > c.max_weight() {
        world.send_to_char(cn, "That is too heavy for you to carry.");
        return true;
    }

    if let Err(e) = world.db.move_item(item_id, ItemOwner::Inventory(cn)).await {
        log::error!("Moving item {item_id} into hands of {cn} failed: {e}");
        world.send_to_char(cn, "An error occurred; the item stays where it is.");
        return true;
    }
    detach_everywhere(world, item_id);
    if let Some(c) = world.character_mut(cn) {
        c.inventory.push(item_id);
        c.dirty = true;
    }

    let name = world.item_name(item_id);
    let char_name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    world.send_to_char(cn, &format!("You pick up {name}."));
    world.broadcast_room(room_id, &format!("\r\n{char_name} picks up {name}."), &[cn]);
    true
}

pub async fn cmd_drop(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Drop what?");
        return true;
    }
    let Some(item_id) = world.find_item_in_inventory(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    if world
        .template_of(item_id)
        .map_or(false, |t| t.flags.contains(ItemFlags::NO_DROP))
    {
        world.send_to_char(cn, "You can't seem to let go of it.");
        return true;
    }
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();

    if let Err(e) = world.db.move_item(item_id, ItemOwner::Room(room_id)).await {
        log::error!("Dropping item {item_id} in room {room_id} failed: {e}");
        world.send_to_char(cn, "An error occurred; you keep hold of it.");
        return true;
    }
    detach_everywhere(world, item_id);
    if let Some(room) = world.room_mut(room_id) {
        room.items.push(item_id);
    }

    let name = world.item_name(item_id);
    let char_name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    world.send_to_char(cn, &format!("You drop {name}."));
    world.broadcast_room(room_id, &format!("\r\n{char_name} drops {name}."), &[cn]);
    true
}

/// Find a container by name in hands, equipment, or on the ground.
fn find_container(
    world: &World,
    cn: CharacterId,
    room_id: crate::RoomId,
    name: &str,
) -> Option<ItemId> {
    let candidate = world
        .find_item_in_inventory(cn, name)
        .or_else(|| world.find_item_in_equipment(cn, name).map(|(_, id)| id))
        .or_else(|| world.find_item_in_room(room_id, name))?;
    let item_type = world.template_of(candidate)?.item_type;
    matches!(item_type, ItemType::Container | ItemType::Quiver).then_some(candidate)
}

fn short_name(world: &World, item_id: ItemId) -> String {
    text::strip_article(&world.item_name(item_id)).to_string()
}

pub async fn cmd_put(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let lower = args.to_ascii_lowercase();
    let Some((item_name, container_name)) = lower.split_once(" in ") else {
        world.send_to_char(cn, "Put what in what? (e.g. put sword in chest)");
        return true;
    };
    let (item_name, container_name) = (item_name.trim(), container_name.trim());

    let Some(item_id) = world.find_item_in_inventory(cn, item_name) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(container_id) = find_container(world, cn, room_id, container_name) else {
        world.send_to_char(cn, &format!("You see no '{container_name}' here."));
        return true;
    };
    if container_id == item_id {
        world.send_to_char(cn, "You can't put something inside itself.");
        return true;
    }
    if !world.item(container_id).map_or(false, |i| i.stats.open) {
        world.send_to_char(cn, &format!("The {} is closed.", short_name(world, container_id)));
        return true;
    }

    // Capacity: total contained weight may not exceed the capacity stat.
    let capacity = world.template_of(container_id).map_or(0, |t| t.stats.capacity);
    let contained_weight: i64 = world
        .item(container_id)
        .map(|i| {
            i.contents
                .iter()
                .filter_map(|&id| world.template_of(id))
                .map(|t| t.stats.weight)
                .sum()
        })
        .unwrap_or(0);
    let item_weight = world.template_of(item_id).map_or(1, |t| t.stats.weight);
    if capacity > 0 && contained_weight + item_weight > capacity {
        world.send_to_char(cn, &format!("The {} cannot hold that much.", short_name(world, container_id)));
        return true;
    }

    if let Err(e) = world.db.move_item(item_id, ItemOwner::Container(container_id)).await {
        log::error!("Putting item {item_id} into {container_id} failed: {e}");
        world.send_to_char(cn, "An error occurred; you keep hold of it.");
        return true;
    }
    detach_everywhere(world, item_id);
    if let Some(container) = world.item_mut(container_id) {
        container.contents.push(item_id);
    }

    let name = world.item_name(item_id);
    world.send_to_char(cn, &format!("You put {name} in the {}.", short_name(world, container_id)));
    true
}

pub async fn cmd_wear(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Wear or wield what?");
        return true;
    }
    let Some(item_id) = world.find_item_in_inventory(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let Some(template) = world.template_of(item_id) else { return true };
    let slots = template.wear_slots();
    let verb = if template.item_type.is_weapon() || template.item_type == ItemType::RangedWeapon {
        "wield"
    } else {
        "wear"
    };
    if slots.is_empty() {
        world.send_to_char(cn, "That isn't something you can wear or wield.");
        return true;
    }

    let Some(c) = world.character(cn) else { return true };
    for slot in &slots {
        if c.equipment.contains_key(slot) {
            world.send_to_char(cn, &format!("You already have something on your {}.", slot.label()));
            return true;
        }
    }

    let primary_slot = slots[0];
    if let Err(e) = world
        .db
        .move_item(item_id, ItemOwner::Equipped(cn, primary_slot))
        .await
    {
        log::error!("Equipping item {item_id} on {cn} failed: {e}");
        world.send_to_char(cn, "An error occurred; nothing happens.");
        return true;
    }
    if let Some(c) = world.character_mut(cn) {
        c.inventory.retain(|&id| id != item_id);
        // A two-handed weapon registers the same instance in both hands.
        for slot in &slots {
            c.equipment.insert(*slot, item_id);
        }
        c.dirty = true;
    }

    let name = world.item_name(item_id);
    let char_name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    world.send_to_char(cn, &format!("You {verb} {name}."));
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    world.broadcast_room(room_id, &format!("\r\n{char_name} {verb}s {name}."), &[cn]);
    true
}

pub async fn cmd_remove(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Remove what?");
        return true;
    }
    let Some((_, item_id)) = world.find_item_in_equipment(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't wearing that.");
        return true;
    };
    if world.character(cn).map_or(true, |c| c.hands_are_full()) {
        world.send_to_char(cn, "Your hands are full; you have nowhere to put it.");
        return true;
    }

    if let Err(e) = world.db.move_item(item_id, ItemOwner::Inventory(cn)).await {
        log::error!("Unequipping item {item_id} from {cn} failed: {e}");
        world.send_to_char(cn, "An error occurred; nothing happens.");
        return true;
    }
    if let Some(c) = world.character_mut(cn) {
        c.equipment.retain(|_, &mut v| v != item_id);
        c.inventory.push(item_id);
        c.dirty = true;
    }
    let name = world.item_name(item_id);
    world.send_to_char(cn, &format!("You remove {name}."));
    true
}

pub async fn cmd_examine(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Examine what?");
        return true;
    }
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let found = world
        .find_item_in_inventory(cn, args.trim())
        .or_else(|| world.find_item_in_equipment(cn, args.trim()).map(|(_, id)| id))
        .or_else(|| world.find_item_in_room(room_id, args.trim()));
    let Some(item_id) = found else {
        world.send_to_char(cn, &format!("You see no '{}' here.", args.trim()));
        return true;
    };
    let (Some(template), Some(instance)) = (world.template_of(item_id), world.item(item_id)) else {
        return true;
    };

    let mut lines = vec![template.name.clone(), template.description.clone()];
    lines.push(format!(
        "Weight: {}.  Value: {}.",
        template.stats.weight,
        text::format_coinage(template.stats.value)
    ));
    if template.item_type.is_weapon() || template.item_type == ItemType::RangedWeapon {
        lines.push(format!(
            "Damage {}+1d{}, speed {:.1}s.",
            template.stats.damage_base, template.stats.damage_rng, template.stats.speed
        ));
    }
    if matches!(template.item_type, ItemType::Armor | ItemType::Shield) {
        lines.push(format!("Armor value: {}.", template.stats.armor));
    }
    if matches!(template.item_type, ItemType::Container | ItemType::Quiver) {
        let state = if instance.stats.open { "open" } else { "closed" };
        lines.push(format!("It is {state}."));
        if instance.stats.open {
            if instance.contents.is_empty() {
                lines.push("It is empty.".to_string());
            } else {
                let names: Vec<String> =
                    instance.contents.iter().map(|&id| world.item_name(id)).collect();
                lines.push(format!("Inside you see: {}.", names.join(", ")));
            }
        }
    }
    // A spotted trap is worth mentioning.
    if world
        .character(cn)
        .map_or(false, |c| c.detected_traps.contains(&item_id))
    {
        lines.push("{rYou notice a trap mechanism on it!{x".to_string());
    }
    lines.push(text::condition_desc(instance.condition).to_string());
    world.send_to_char(cn, &lines.join("\r\n"));
    true
}

pub async fn cmd_open(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(container_id) = find_container(world, cn, room_id, args.trim()) else {
        world.send_to_char(cn, &format!("You see no '{}' to open.", args.trim()));
        return true;
    };
    let name = short_name(world, container_id);

    let Some(instance) = world.item(container_id) else { return true };
    if instance.stats.open {
        world.send_to_char(cn, &format!("The {name} is already open."));
        return true;
    }
    if instance.stats.locked {
        world.send_to_char(cn, &format!("The {name} is locked."));
        return true;
    }

    // An armed trap fires through the magical direct-damage pipeline, then
    // is consumed.
    let trap = world.item(container_id).and_then(|i| i.stats.trap.clone());
    if let Some(trap) = trap {
        if trap.active {
            if let Some(i) = world.item_mut(container_id) {
                if let Some(t) = i.stats.trap.as_mut() {
                    t.active = false;
                }
            }
            world.send_to_char(cn, "{rA hidden mechanism clicks as you lift the lid!{x");
            let info = DamageInfo {
                pre_mitigation: trap.damage,
                damage_type: DamageType::Pierce,
                is_crit: false,
                attack_name: "the trap".into(),
            };
            let final_damage = crate::combat::damage::mitigate_magical(world, Actor::Char(cn), &info);
            let hp = crate::combat::outcome::apply_damage(world, Actor::Char(cn), final_damage);
            world.send_to_char(
                cn,
                &format!("{{rThe trap tears into you for {final_damage} damage!{{x"),
            );
            if hp <= 0.0 && world.character(cn).map_or(false, |c| c.status == Status::Alive) {
                handle_defeat(world, None, Actor::Char(cn)).await;
            }
        }
    }

    // First open materializes the attached loot.
    let should_roll = world
        .item(container_id)
        .map_or(false, |i| !i.stats.loot_rolled)
        && world
            .template_of(container_id)
            .map_or(false, |t| t.stats.loot.is_some());
    if should_roll {
        roll_container_loot(world, cn, container_id).await;
    }

    if let Some(i) = world.item_mut(container_id) {
        i.stats.open = true;
        i.stats.loot_rolled = true;
    }
    persist_instance_stats(world, container_id).await;

    world.send_to_char(cn, &format!("You open the {name}."));
    true
}

async fn roll_container_loot(world: &mut World, cn: CharacterId, container_id: ItemId) {
    use rand::Rng;

    let Some(loot) = world.template_of(container_id).and_then(|t| t.stats.loot.clone()) else {
        return;
    };

    if loot.coinage_max > 0 {
        let coins = world.rng.gen_range(0..=loot.coinage_max);
        if coins > 0 {
            if let Some(c) = world.character_mut(cn) {
                c.coinage += coins;
                c.dirty = true;
            }
            world.send_to_char(
                cn,
                &format!("You find {} tucked inside!", text::format_coinage(coins)),
            );
        }
    }

    for rule in &loot.items {
        let roll: f64 = world.rng.gen_range(0.0..1.0);
        if roll >= rule.chance {
            continue;
        }
        match world
            .db
            .create_item_instance(rule.template_id, ItemOwner::Container(container_id))
            .await
        {
            Ok(row) => {
                let instance = ItemInstance::from_row(&row);
                world.items.insert(instance.id, instance);
                if let Some(container) = world.item_mut(container_id) {
                    container.contents.push(row.id);
                }
            }
            Err(e) => log::error!(
                "Creating container loot from template {} failed: {e}",
                rule.template_id
            ),
        }
    }
}

async fn persist_instance_stats(world: &mut World, item_id: ItemId) {
    let Some(json) = world.item(item_id).map(|i| i.stats_json()) else { return };
    if let Err(e) = world.db.update_instance_stats(item_id, &json).await {
        log::error!("Persisting instance stats of item {item_id} failed: {e}");
    }
}

pub async fn cmd_close(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(container_id) = find_container(world, cn, room_id, args.trim()) else {
        world.send_to_char(cn, &format!("You see no '{}' to close.", args.trim()));
        return true;
    };
    let name = short_name(world, container_id);
    let Some(instance) = world.item_mut(container_id) else { return true };
    if !instance.stats.open {
        world.send_to_char(cn, &format!("The {name} is already closed."));
        return true;
    }
    instance.stats.open = false;
    persist_instance_stats(world, container_id).await;
    world.send_to_char(cn, &format!("You close the {name}."));
    true
}

/// Key in hand whose unlocks list carries the container's lock id.
fn matching_key(world: &World, cn: CharacterId, lock_id: i64) -> Option<ItemId> {
    let character = world.character(cn)?;
    character.inventory.iter().copied().find(|&id| {
        world
            .template_of(id)
            .map_or(false, |t| t.item_type == ItemType::Key && t.stats.unlocks.contains(&lock_id))
    })
}

async fn toggle_lock(world: &mut World, cn: CharacterId, args: &str, lock: bool) -> bool {
    let verb = if lock { "lock" } else { "unlock" };
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(container_id) = find_container(world, cn, room_id, args.trim()) else {
        world.send_to_char(cn, &format!("You see no '{}' to {verb}.", args.trim()));
        return true;
    };
    let name = short_name(world, container_id);

    let Some(lock_id) = world.template_of(container_id).and_then(|t| t.stats.lock_id) else {
        world.send_to_char(cn, &format!("The {name} has no lock."));
        return true;
    };
    let already = world.item(container_id).map_or(false, |i| i.stats.locked);
    if already == lock {
        world.send_to_char(cn, &format!("The {name} is already {verb}ed."));
        return true;
    }
    if matching_key(world, cn, lock_id).is_none() {
        world.send_to_char(cn, "You don't have the right key.");
        return true;
    }
    if let Some(i) = world.item_mut(container_id) {
        i.stats.locked = lock;
        if lock {
            i.stats.open = false;
        }
    }
    persist_instance_stats(world, container_id).await;
    world.send_to_char(cn, &format!("You {verb} the {name}."));
    true
}

pub async fn cmd_lock(world: &mut World, cn: CharacterId, args: &str) -> bool {
    toggle_lock(world, cn, args, true).await
}

pub async fn cmd_unlock(world: &mut World, cn: CharacterId, args: &str) -> bool {
    toggle_lock(world, cn, args, false).await
}

/// Consume an item from the hands: delete the row, forget the instance.
async fn destroy_consumable(world: &mut World, cn: CharacterId, item_id: ItemId) {
    detach_everywhere(world, item_id);
    world.items.remove(&item_id);
    if let Err(e) = world.db.delete_item_instance(item_id).await {
        log::error!("Deleting consumed item {item_id} failed: {e}");
    }
    if let Some(c) = world.character_mut(cn) {
        c.dirty = true;
    }
}

pub async fn cmd_eat(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Eat what?");
        return true;
    }
    let Some(item_id) = world.find_item_in_inventory(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let Some(template) = world.template_of(item_id) else { return true };
    if template.item_type != ItemType::Food {
        world.send_to_char(cn, "That is not food.");
        return true;
    }
    let amount = if template.stats.amount > 0.0 { template.stats.amount } else { 25.0 };
    let name = template.name.clone();

    if let Some(c) = world.character_mut(cn) {
        c.hunger = (c.hunger + amount).min(ashenmoor_core::constants::HUNGER_MAX);
    }
    destroy_consumable(world, cn, item_id).await;
    world.send_to_char(cn, &format!("You eat {name}. That hit the spot."));
    true
}

pub async fn cmd_drink(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Drink what?");
        return true;
    }
    let Some(item_id) = world.find_item_in_inventory(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let Some(template) = world.template_of(item_id) else { return true };
    let name = template.name.clone();

    // Healing draughts are drinkable regardless of their item type.
    if template.stats.effect.as_deref() == Some("heal_hp") {
        let amount = template.stats.amount.max(1.0);
        let healed = {
            let Some(c) = world.character_mut(cn) else { return true };
            let healed = amount.min(c.max_hp - c.hp);
            c.hp += healed;
            healed
        };
        destroy_consumable(world, cn, item_id).await;
        world.send_to_char(
            cn,
            &format!("You drain {name}. Warmth knits {} points of your wounds.", healed as i64),
        );
        return true;
    }

    if template.item_type != ItemType::Drink {
        world.send_to_char(cn, "You can't drink that.");
        return true;
    }
    let amount = if template.stats.amount > 0.0 { template.stats.amount } else { 25.0 };
    if let Some(c) = world.character_mut(cn) {
        c.thirst = (c.thirst + amount).min(ashenmoor_core::constants::THIRST_MAX);
    }
    destroy_consumable(world, cn, item_id).await;
    world.send_to_char(cn, &format!("You drink {name}. Refreshing."));
    true
}

pub async fn cmd_repair(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    let room_id = c.location_id;
    if !world
        .room(room_id)
        .map_or(false, |r| r.flags.contains(RoomFlags::REPAIRER))
    {
        world.send_to_char(cn, "There is no smith here to repair anything.");
        return true;
    }
    if args.trim().is_empty() {
        world.send_to_char(cn, "Repair what?");
        return true;
    }
    let found = world
        .find_item_in_inventory(cn, args.trim())
        .or_else(|| world.find_item_in_equipment(cn, args.trim()).map(|(_, id)| id));
    let Some(item_id) = found else {
        world.send_to_char(cn, "You aren't carrying that.");
        return true;
    };

    let condition = world.item(item_id).map_or(100, |i| i.condition);
    if condition >= 100 {
        world.send_to_char(cn, "It is already in perfect repair.");
        return true;
    }
    let value = world.template_of(item_id).map_or(0, |t| t.stats.value);
    let fee = (((100 - condition) * value) / 200).max(1);

    if world.character(cn).map_or(0, |c| c.coinage) < fee {
        world.send_to_char(
            cn,
            &format!("The smith asks {} for the work; you can't afford it.", text::format_coinage(fee)),
        );
        return true;
    }

    if let Err(e) = world.db.update_item_condition(item_id, 100).await {
        log::error!("Persisting repair of item {item_id} failed: {e}");
        world.send_to_char(cn, "An error occurred; nothing happens.");
        return true;
    }
    if let Some(i) = world.item_mut(item_id) {
        i.condition = 100;
    }
    if let Some(c) = world.character_mut(cn) {
        c.coinage -= fee;
        c.dirty = true;
    }
    let name = world.item_name(item_id);
    world.send_to_char(
        cn,
        &format!("The smith hammers out {name} for {}.", text::format_coinage(fee)),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use ashenmoor_core::slots::WearSlot;

    #[tokio::test]
    async fn two_handed_weapons_fill_both_hands_with_one_instance() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_template(
            &mut world,
            800,
            "TWO_HANDED_WEAPON",
            r#"{"damage_base": 8, "damage_rng": 6, "speed": 3.0,
                "wear_location": ["main_hand", "off_hand"]}"#,
        );
        add_instance(&mut world, 800, 800);
        world.character_mut(1).unwrap().inventory.push(800);

        cmd_wear(&mut world, 1, "test item").await;
        let c = world.character(1).unwrap();
        assert!(c.inventory.is_empty());
        assert_eq!(c.equipment.get(&WearSlot::MainHand), Some(&800));
        assert_eq!(c.equipment.get(&WearSlot::OffHand), Some(&800));
        assert_eq!(c.unique_equipped(), vec![800], "one instance, two slots");

        world.character_mut(1).unwrap().roundtime = 0.0;
        cmd_remove(&mut world, 1, "test item").await;
        let c = world.character(1).unwrap();
        assert!(c.equipment.is_empty(), "both hand slots cleared together");
        assert_eq!(c.inventory, vec![800]);
    }

    #[tokio::test]
    async fn wearing_into_an_occupied_slot_is_refused() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_template(&mut world, 801, "ARMOR", r#"{"armor": 3, "wear_location": "torso"}"#);
        add_instance(&mut world, 801, 801);
        add_instance(&mut world, 802, 801);
        {
            let c = world.character_mut(1).unwrap();
            c.inventory.push(801);
            c.equipment.insert(WearSlot::Torso, 802);
        }

        cmd_wear(&mut world, 1, "test item").await;
        let c = world.character(1).unwrap();
        assert_eq!(c.inventory, vec![801], "still in hand");
        assert_eq!(c.equipment.get(&WearSlot::Torso), Some(&802));
    }

    #[tokio::test]
    async fn consumables_vanish_after_use() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_template(&mut world, 803, "FOOD", r#"{"amount": 30}"#);
        add_instance(&mut world, 803, 803);
        {
            let c = world.character_mut(1).unwrap();
            c.inventory.push(803);
            c.hunger = 50.0;
        }

        cmd_eat(&mut world, 1, "test item").await;
        let c = world.character(1).unwrap();
        assert!(c.inventory.is_empty());
        assert_eq!(c.hunger, 80.0);
        assert!(world.item(803).is_none(), "instance deleted outright");
    }

    #[tokio::test]
    async fn closed_and_locked_containers_guard_their_contents() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_template(&mut world, 804, "CONTAINER", r#"{"capacity": 50, "lock_id": 9}"#);
        add_instance(&mut world, 804, 804);
        world.room_mut(1).unwrap().items.push(804);
        world.item_mut(804).unwrap().stats.locked = true;

        cmd_open(&mut world, 1, "test item").await;
        assert!(!world.item(804).unwrap().stats.open, "locked stays shut");

        // The right key turns the lock; then it opens.
        add_template(&mut world, 805, "KEY", r#"{"unlocks": [9]}"#);
        add_instance(&mut world, 805, 805);
        world.character_mut(1).unwrap().inventory.push(805);
        cmd_unlock(&mut world, 1, "test item 804").await;
        assert!(!world.item(804).unwrap().stats.locked);

        cmd_open(&mut world, 1, "test item 804").await;
        assert!(world.item(804).unwrap().stats.open);
    }
}
