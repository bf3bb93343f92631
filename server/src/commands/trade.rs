//! Shops, person-to-person gives, and the bank.

use ashenmoor_core::constants::BANK_ITEM_FEE_RATE;
use ashenmoor_core::flags::RoomFlags;
use ashenmoor_core::text;
use ashenmoor_core::types::ItemType;

use crate::character::GiveOffer;
use crate::db::items::ItemOwner;
use crate::item::ItemInstance;
use crate::room::BuyFilterEntry;
use crate::world::World;
use crate::CharacterId;

/// Bartering shaves (or adds) one percent per 25 ranks.
fn bartering_percent(world: &World, cn: CharacterId) -> i64 {
    world.character(cn).map_or(0, |c| c.skill_rank("bartering") / 25)
}

fn in_shop(world: &World, cn: CharacterId) -> bool {
    world
        .character(cn)
        .and_then(|c| world.room(c.location_id))
        .map_or(false, |r| r.flags.contains(RoomFlags::SHOP))
}

fn in_bank(world: &World, cn: CharacterId) -> bool {
    world
        .character(cn)
        .and_then(|c| world.room(c.location_id))
        .map_or(false, |r| r.flags.contains(RoomFlags::BANK))
}

pub async fn cmd_list(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    if !in_shop(world, cn) {
        world.send_to_char(cn, "This is not a shop.");
        return true;
    }
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(stock) = world.shops.get(&room_id) else {
        world.send_to_char(cn, "This shop has nothing for sale.");
        return true;
    };
    let discount = bartering_percent(world, cn);

    let mut lines = vec!["{W--- For Sale ---{x".to_string()];
    for entry in stock {
        if entry.stock_quantity == 0 {
            continue;
        }
        let Some(template) = world.item_template(entry.item_template_id) else { continue };
        let mut price = (template.stats.value as f64 * entry.buy_price_modifier) as i64;
        if discount > 0 {
            price = (price as f64 * (1.0 - discount as f64 / 100.0)) as i64;
        }
        let quantity = if entry.stock_quantity < 0 {
            "--".to_string()
        } else {
            entry.stock_quantity.to_string()
        };
        lines.push(format!(
            "  {:<28} {:>6}  (stock: {quantity})",
            template.name,
            text::format_coinage(price)
        ));
    }
    if lines.len() == 1 {
        lines.push("  (nothing at all)".to_string());
    }
    world.send_to_char(cn, &lines.join("\r\n"));
    true
}

pub async fn cmd_buy(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Buy what?");
        return true;
    }
    if !in_shop(world, cn) {
        world.send_to_char(cn, "This is not a shop.");
        return true;
    }
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();

    let lower = args.trim().to_ascii_lowercase();
    let pick = world.shops.get(&room_id).and_then(|stock| {
        stock
            .iter()
            .find(|entry| {
                world
                    .item_template(entry.item_template_id)
                    .map_or(false, |t| t.name.to_ascii_lowercase().contains(&lower))
            })
            .map(|entry| (entry.row_id, entry.item_template_id, entry.stock_quantity, entry.buy_price_modifier))
    });
    let Some((row_id, template_id, stock_quantity, buy_modifier)) = pick else {
        world.send_to_char(cn, "That item is not for sale here.");
        return true;
    };
    if stock_quantity == 0 {
        world.send_to_char(cn, "That item is out of stock.");
        return true;
    }

    let base_value = world.item_template(template_id).map_or(0, |t| t.stats.value);
    let mut price = (base_value as f64 * buy_modifier) as i64;
    let discount = bartering_percent(world, cn);
    if discount > 0 {
        price = (price as f64 * (1.0 - discount as f64 / 100.0)) as i64;
    }

    let Some(c) = world.character(cn) else { return true };
    if c.coinage < price {
        world.send_to_char(cn, "You can't afford that.");
        return true;
    }
    if c.hands_are_full() {
        world.send_to_char(cn, "Your hands are full. Put something away first.");
        return true;
    }

    // One transaction covers the new instance and the stock decrement;
    // nothing in memory moves until it commits.
    let stock_row = (stock_quantity > 0).then_some(row_id);
    let row = match world
        .db
        .purchase_item_instance(template_id, cn, stock_row)
        .await
    {
        Ok(row) => row,
        Err(e) => {
            log::error!("Purchase of template {template_id} for {cn} failed: {e}");
            world.send_to_char(cn, "An error occurred with your purchase.");
            return true;
        }
    };
    if stock_row.is_some() {
        if let Some(stock) = world.shops.get_mut(&room_id) {
            if let Some(entry) = stock.iter_mut().find(|s| s.row_id == row_id) {
                entry.stock_quantity -= 1;
            }
        }
    }

    let instance = ItemInstance::from_row(&row);
    let item_id = instance.id;
    world.items.insert(item_id, instance);
    if let Some(c) = world.character_mut(cn) {
        c.coinage -= price;
        c.inventory.push(item_id);
        c.dirty = true;
    }

    let name = world.item_name(item_id);
    world.send_to_char(cn, &format!("You buy {name} for {}.", text::format_coinage(price)));
    true
}

fn filter_accepts(filter: &[BuyFilterEntry], item_type: ItemType, template_id: i64) -> bool {
    filter.iter().any(|entry| match entry {
        BuyFilterEntry::Template(id) => *id == template_id,
        BuyFilterEntry::Type(name) => ItemType::parse(name) == Some(item_type),
    })
}

pub async fn cmd_sell(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Sell what?");
        return true;
    }
    if !in_shop(world, cn) {
        world.send_to_char(cn, "This is not a shop.");
        return true;
    }
    let Some(item_id) = world.find_item_in_inventory(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();

    let (accepted, sell_modifier) = {
        let Some(room) = world.room(room_id) else { return true };
        let Some(template) = world.template_of(item_id) else { return true };
        let accepted = room
            .shop_buy_filter
            .as_ref()
            .map_or(false, |f| filter_accepts(f, template.item_type, template.id));
        (accepted, room.shop_sell_modifier)
    };
    if !accepted {
        world.send_to_char(cn, "The shopkeeper has no interest in that.");
        return true;
    }

    let base_value = world.template_of(item_id).map_or(0, |t| t.stats.value);
    let mut price = (base_value as f64 * sell_modifier) as i64;
    let bonus = bartering_percent(world, cn);
    if bonus > 0 {
        price = (price as f64 * (1.0 + bonus as f64 / 100.0)) as i64;
    }

    let name = world.item_name(item_id);
    if let Err(e) = world.db.delete_item_instance(item_id).await {
        log::error!("Deleting sold item {item_id} failed: {e}");
        world.send_to_char(cn, "An error occurred with the sale.");
        return true;
    }
    world.items.remove(&item_id);
    if let Some(c) = world.character_mut(cn) {
        c.inventory.retain(|&id| id != item_id);
        c.coinage += price;
        c.dirty = true;
    }
    world.send_to_char(cn, &format!("You sell {name} for {}.", text::format_coinage(price)));
    true
}

pub async fn cmd_give(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let mut parts = args.trim().rsplitn(2, ' ');
    let target_name = parts.next().unwrap_or_default();
    let item_name = parts.next().unwrap_or_default();
    if item_name.is_empty() || target_name.is_empty() {
        world.send_to_char(cn, "Give what to whom? (e.g. give sword gimli)");
        return true;
    }

    let Some(item_id) = world.find_item_in_inventory(cn, item_name) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(target_id) = world.find_character_in_room(room_id, target_name) else {
        world.send_to_char(cn, &format!("You see no '{target_name}' here."));
        return true;
    };
    if target_id == cn {
        world.send_to_char(cn, "You shuffle the item from one hand to the other.");
        return true;
    }
    if world
        .character(target_id)
        .map_or(false, |c| c.pending_give.is_some())
    {
        world.send_to_char(cn, "They are already considering another offer.");
        return true;
    }

    let giver_name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    let item_display = world.item_name(item_id);
    if let Some(t) = world.character_mut(target_id) {
        t.pending_give = Some(GiveOffer { from: cn, item: item_id });
    }
    world.send_to_char(cn, &format!("You offer {item_display} to them."));
    world.send_to_char(
        target_id,
        &format!("{giver_name} offers you {item_display}. Type 'accept' or 'decline'."),
    );
    true
}

pub async fn cmd_accept(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(offer) = world.character(cn).and_then(|c| c.pending_give.clone()) else {
        world.send_to_char(cn, "No one has offered you anything.");
        return true;
    };

    // The offer may have gone stale: giver left, item moved on.
    let still_valid = world
        .character(offer.from)
        .map_or(false, |giver| giver.inventory.contains(&offer.item))
        && world
            .character(cn)
            .zip(world.character(offer.from))
            .map_or(false, |(a, b)| a.location_id == b.location_id);
    if !still_valid {
        if let Some(c) = world.character_mut(cn) {
            c.pending_give = None;
        }
        world.send_to_char(cn, "The offer is no longer good.");
        return true;
    }
    if world.character(cn).map_or(true, |c| c.hands_are_full()) {
        world.send_to_char(cn, "Your hands are full.");
        return true;
    }

    if let Err(e) = world.db.move_item(offer.item, ItemOwner::Inventory(cn)).await {
        log::error!("Transferring gift {} failed: {e}", offer.item);
        world.send_to_char(cn, "An error occurred; the exchange fizzles.");
        return true;
    }
    if let Some(giver) = world.character_mut(offer.from) {
        giver.inventory.retain(|&id| id != offer.item);
        giver.dirty = true;
    }
    if let Some(taker) = world.character_mut(cn) {
        taker.pending_give = None;
        taker.inventory.push(offer.item);
        taker.dirty = true;
    }

    let item_display = world.item_name(offer.item);
    let taker_name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    world.send_to_char(cn, &format!("You accept {item_display}."));
    world.send_to_char(offer.from, &format!("{taker_name} accepts your {}.", text::strip_article(&item_display)));
    true
}

pub async fn cmd_decline(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(offer) = world.character(cn).and_then(|c| c.pending_give.clone()) else {
        world.send_to_char(cn, "No one has offered you anything.");
        return true;
    };
    if let Some(c) = world.character_mut(cn) {
        c.pending_give = None;
    }
    let decliner = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    world.send_to_char(cn, "You decline the offer.");
    world.send_to_char(offer.from, &format!("{decliner} declines your offer."));
    true
}

pub async fn cmd_balance(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    if !in_bank(world, cn) {
        world.send_to_char(cn, "You must be in a bank to check your balance.");
        return true;
    }
    match world.db.bank_balance(cn).await {
        Ok(balance) => {
            world.send_to_char(
                cn,
                &format!("Your current balance is {}.", text::format_coinage(balance)),
            );
            let banked = world.db.load_banked_items(cn).await.unwrap_or_default();
            if !banked.is_empty() {
                let names: Vec<String> = banked
                    .iter()
                    .map(|row| {
                        world
                            .item_template(row.template_id)
                            .map(|t| t.name.clone())
                            .unwrap_or_else(|| format!("item #{}", row.id))
                    })
                    .collect();
                world.send_to_char(cn, &format!("Stored items: {}.", names.join(", ")));
            }
        }
        Err(e) => {
            log::error!("Reading bank balance for {cn} failed: {e}");
            world.send_to_char(cn, "The clerk shuffles papers apologetically. Try again.");
        }
    }
    true
}

pub async fn cmd_deposit(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Deposit what? (e.g. deposit 100, or deposit sword)");
        return true;
    }
    if !in_bank(world, cn) {
        world.send_to_char(cn, "You must be in a bank to make a deposit.");
        return true;
    }

    // Coinage first.
    if let Ok(amount) = args.trim().parse::<i64>() {
        if amount <= 0 {
            world.send_to_char(cn, "You must deposit a positive amount.");
            return true;
        }
        if world.character(cn).map_or(0, |c| c.coinage) < amount {
            world.send_to_char(cn, "You aren't carrying that much.");
            return true;
        }
        if let Err(e) = world.db.adjust_bank_balance(cn, amount).await {
            log::error!("Bank deposit for {cn} failed: {e}");
            world.send_to_char(cn, "The clerk frowns at the ledger. Try again.");
            return true;
        }
        if let Some(c) = world.character_mut(cn) {
            c.coinage -= amount;
            c.dirty = true;
        }
        world.send_to_char(cn, &format!("You deposit {}.", text::format_coinage(amount)));
        return true;
    }

    // Otherwise an item, with the storage fee.
    let Some(item_id) = world.find_item_in_inventory(cn, args.trim()) else {
        world.send_to_char(cn, "You aren't holding that.");
        return true;
    };
    let value = world.template_of(item_id).map_or(0, |t| t.stats.value);
    let fee = (value as f64 * BANK_ITEM_FEE_RATE) as i64;
    if world.character(cn).map_or(0, |c| c.coinage) < fee {
        world.send_to_char(
            cn,
            &format!("You can't afford the {} storage fee.", text::format_coinage(fee)),
        );
        return true;
    }

    if let Err(e) = world.db.bank_item(cn, item_id).await {
        log::error!("Banking item {item_id} for {cn} failed: {e}");
        world.send_to_char(cn, "The clerk cannot take that right now.");
        return true;
    }
    let name = world.item_name(item_id);
    world.items.remove(&item_id);
    if let Some(c) = world.character_mut(cn) {
        c.inventory.retain(|&id| id != item_id);
        c.coinage -= fee;
        c.dirty = true;
    }
    let fee_note = if fee > 0 {
        format!(", paying a fee of {}", text::format_coinage(fee))
    } else {
        String::new()
    };
    world.send_to_char(cn, &format!("You deposit {name}{fee_note}."));
    true
}

pub async fn cmd_withdraw(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Withdraw what? (e.g. withdraw 100, or withdraw sword)");
        return true;
    }
    if !in_bank(world, cn) {
        world.send_to_char(cn, "You must be in a bank to make a withdrawal.");
        return true;
    }

    if let Ok(amount) = args.trim().parse::<i64>() {
        if amount <= 0 {
            world.send_to_char(cn, "You must withdraw a positive amount.");
            return true;
        }
        let balance = world.db.bank_balance(cn).await.unwrap_or(0);
        if balance < amount {
            world.send_to_char(cn, "You don't have that much stored.");
            return true;
        }
        if let Err(e) = world.db.adjust_bank_balance(cn, -amount).await {
            log::error!("Bank withdrawal for {cn} failed: {e}");
            world.send_to_char(cn, "The clerk frowns at the ledger. Try again.");
            return true;
        }
        if let Some(c) = world.character_mut(cn) {
            c.coinage += amount;
            c.dirty = true;
        }
        world.send_to_char(cn, &format!("You withdraw {}.", text::format_coinage(amount)));
        return true;
    }

    if world.character(cn).map_or(true, |c| c.hands_are_full()) {
        world.send_to_char(cn, "Your hands are full.");
        return true;
    }
    let lower = args.trim().to_ascii_lowercase();
    let banked = world.db.load_banked_items(cn).await.unwrap_or_default();
    let row = banked.into_iter().find(|row| {
        world
            .item_template(row.template_id)
            .map_or(false, |t| t.name.to_ascii_lowercase().contains(&lower))
    });
    let Some(row) = row else {
        world.send_to_char(cn, "You have nothing like that stored.");
        return true;
    };

    if let Err(e) = world.db.unbank_item(cn, row.id).await {
        log::error!("Unbanking item {} for {cn} failed: {e}", row.id);
        world.send_to_char(cn, "The clerk cannot find it right now.");
        return true;
    }
    let instance = ItemInstance::from_row(&row);
    let item_id = instance.id;
    world.items.insert(item_id, instance);
    if let Some(c) = world.character_mut(cn) {
        c.inventory.push(item_id);
        c.dirty = true;
    }
    world.send_to_char(cn, &format!("You withdraw {}.", world.item_name(item_id)));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use crate::room::Room;
    use crate::world::ShopStock;

    /// Shop fixture with real database rows behind it, so purchases can
    /// create instances without tripping foreign keys.
    async fn seed_shop_world() -> (World, crate::CharacterId) {
        let mut world = build_world().await;

        let player = world.db.create_account("trader", "h", "t@example.com").await.unwrap();
        let character_id = sqlx::query(
            "INSERT INTO characters (player_id, first_name, last_name, coinage) VALUES (?, 'Moss', 'Peddler', 1000)",
        )
        .bind(player)
        .execute(world.db.pool())
        .await
        .unwrap()
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO item_templates (id, name, type, damage_type, stats) VALUES (700, 'a rusty sword', 'WEAPON', 'slash', ?)",
        )
        .bind(r#"{"damage_base": 5, "damage_rng": 3, "speed": 2.0, "value": 100, "wear_location": "main_hand"}"#)
        .execute(world.db.pool())
        .await
        .unwrap();
        add_template(&mut world, 700, "WEAPON", r#"{"damage_base": 5, "damage_rng": 3, "speed": 2.0, "value": 100, "wear_location": "main_hand"}"#);
        // The registry copy carries the shop-facing name.
        if let Some(t) = world.item_templates.get_mut(&700) {
            t.name = "a rusty sword".into();
        }

        let shop_room = Room::from_row(&crate::db::world::RoomRow {
            id: 40,
            area_id: 1,
            name: "The Bent Talon".into(),
            description: "Wares on every wall.".into(),
            exits: "{}".into(),
            flags: r#"["SHOP", "INDOORS"]"#.into(),
            spawners: "{}".into(),
            coinage: 0,
            shop_buy_filter: Some(r#"["WEAPON"]"#.into()),
            shop_sell_modifier: 0.5,
        });
        world.rooms.insert(40, shop_room);
        world.shops.insert(
            40,
            vec![ShopStock {
                row_id: 1,
                item_template_id: 700,
                stock_quantity: -1,
                buy_price_modifier: 1.5,
                sell_price_modifier: 0.5,
            }],
        );

        add_test_character(&mut world, character_id, 40);
        world.character_mut(character_id).unwrap().coinage = 1000;
        (world, character_id)
    }

    #[tokio::test]
    async fn buy_then_sell_back_costs_exactly_the_spread() {
        let (mut world, cn) = seed_shop_world().await;

        cmd_buy(&mut world, cn, "rusty sword").await;
        {
            let c = world.character(cn).unwrap();
            assert_eq!(c.coinage, 850, "value 100 at 1.5x buy modifier");
            assert_eq!(c.inventory.len(), 1);
        }

        cmd_sell(&mut world, cn, "rusty sword").await;
        let c = world.character(cn).unwrap();
        assert!(c.inventory.is_empty());
        // Round trip against infinite stock: down by buy - sell = 150 - 50.
        assert_eq!(c.coinage, 900);
    }

    #[tokio::test]
    async fn selling_outside_the_buy_filter_is_refused() {
        let (mut world, cn) = seed_shop_world().await;
        // Shop only buys WEAPONs; hand the character some armor.
        sqlx::query(
            "INSERT INTO item_templates (id, name, type, stats) VALUES (701, 'a dented helm', 'ARMOR', '{\"value\": 50, \"armor\": 2}')",
        )
        .execute(world.db.pool())
        .await
        .unwrap();
        add_template(&mut world, 701, "ARMOR", r#"{"value": 50, "armor": 2}"#);
        let row = world
            .db
            .create_item_instance(701, crate::db::items::ItemOwner::Inventory(cn))
            .await
            .unwrap();
        let item = crate::item::ItemInstance::from_row(&row);
        let item_id = item.id;
        world.items.insert(item_id, item);
        world.character_mut(cn).unwrap().inventory.push(item_id);

        cmd_sell(&mut world, cn, "test item").await;
        let c = world.character(cn).unwrap();
        assert_eq!(c.coinage, 1000, "no sale happened");
        assert_eq!(c.inventory.len(), 1);
    }

    #[tokio::test]
    async fn bank_deposit_and_withdraw_round_trip() {
        let (mut world, cn) = seed_shop_world().await;
        // Make the shop double as a bank for the fixture.
        if let Some(room) = world.room_mut(40) {
            room.flags |= ashenmoor_core::flags::RoomFlags::BANK;
        }

        cmd_deposit(&mut world, cn, "400").await;
        assert_eq!(world.character(cn).unwrap().coinage, 600);
        assert_eq!(world.db.bank_balance(cn).await.unwrap(), 400);

        cmd_withdraw(&mut world, cn, "150").await;
        assert_eq!(world.character(cn).unwrap().coinage, 750);
        assert_eq!(world.db.bank_balance(cn).await.unwrap(), 250);

        // Overdrafts bounce.
        cmd_withdraw(&mut world, cn, "9999").await;
        assert_eq!(world.character(cn).unwrap().coinage, 750);
    }

    #[tokio::test]
    async fn finite_stock_decrements_atomically_with_the_purchase() {
        let (mut world, cn) = seed_shop_world().await;
        // One real stock row with a single sword on the shelf.
        let stock_row_id = sqlx::query(
            "INSERT INTO shop_inventories (room_id, item_template_id, stock_quantity,
                                           buy_price_modifier, sell_price_modifier)
             VALUES (40, 700, 1, 1.5, 0.5)",
        )
        .execute(world.db.pool())
        .await
        .unwrap()
        .last_insert_rowid();
        if let Some(stock) = world.shops.get_mut(&40) {
            stock[0] = ShopStock {
                row_id: stock_row_id,
                item_template_id: 700,
                stock_quantity: 1,
                buy_price_modifier: 1.5,
                sell_price_modifier: 0.5,
            };
        }

        cmd_buy(&mut world, cn, "rusty sword").await;
        {
            let c = world.character(cn).unwrap();
            assert_eq!(c.inventory.len(), 1);
            assert_eq!(c.coinage, 850);
        }
        assert_eq!(world.shops[&40][0].stock_quantity, 0);
        let db_stock: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM shop_inventories WHERE id = ?")
                .bind(stock_row_id)
                .fetch_one(world.db.pool())
                .await
                .unwrap();
        assert_eq!(db_stock, 0, "row decremented in the same transaction");

        // The shelf is bare: no second sale, no second charge, no orphaned
        // instance row from a half-done purchase.
        cmd_buy(&mut world, cn, "rusty sword").await;
        let c = world.character(cn).unwrap();
        assert_eq!(c.inventory.len(), 1);
        assert_eq!(c.coinage, 850);
        let instances: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM item_instances WHERE owner_char_id = ?")
                .bind(cn)
                .fetch_one(world.db.pool())
                .await
                .unwrap();
        assert_eq!(instances, 1);
    }

    #[tokio::test]
    async fn item_deposit_charges_the_storage_fee() {
        let (mut world, cn) = seed_shop_world().await;
        if let Some(room) = world.room_mut(40) {
            room.flags |= ashenmoor_core::flags::RoomFlags::BANK;
        }
        cmd_buy(&mut world, cn, "rusty sword").await;
        let after_buy = world.character(cn).unwrap().coinage;

        cmd_deposit(&mut world, cn, "rusty sword").await;
        let c = world.character(cn).unwrap();
        assert!(c.inventory.is_empty());
        // Fee is floor(value * 0.10) = 10 talons.
        assert_eq!(c.coinage, after_buy - 10);
        assert_eq!(world.db.load_banked_items(cn).await.unwrap().len(), 1);

        cmd_withdraw(&mut world, cn, "rusty sword").await;
        assert_eq!(world.character(cn).unwrap().inventory.len(), 1);
        assert!(world.db.load_banked_items(cn).await.unwrap().is_empty());
    }
}
