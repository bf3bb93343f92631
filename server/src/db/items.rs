//! Item instance rows and ownership moves. An instance belongs to exactly
//! one owner; every move rewrites the full owner column set inside one
//! statement (or one transaction when coinage changes ride along) so a crash
//! can never leave an item with two homes.

use sqlx::FromRow;

use super::Db;
use crate::{CharacterId, ItemId, RoomId};

#[derive(Debug, Clone, FromRow)]
pub struct ItemInstanceRow {
    pub id: i64,
    pub template_id: i64,
    pub condition: i64,
    pub instance_stats: String,
    pub owner_char_id: Option<i64>,
    pub equipped_slot: Option<String>,
    pub room_id: Option<i64>,
    pub container_id: Option<i64>,
}

/// Where an instance lives. Mirrors the owner columns of `item_instances`
/// plus the `banked_items` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOwner {
    Inventory(CharacterId),
    Equipped(CharacterId, ashenmoor_core::slots::WearSlot),
    Room(RoomId),
    Container(ItemId),
}

const SELECT_INSTANCE: &str = "SELECT id, template_id, condition, instance_stats,
    owner_char_id, equipped_slot, room_id, container_id FROM item_instances";

impl Db {
    pub async fn create_item_instance(
        &self,
        template_id: i64,
        owner: ItemOwner,
    ) -> Result<ItemInstanceRow, sqlx::Error> {
        let (char_id, slot, room_id, container_id) = owner_columns(owner);
        let result = sqlx::query(
            "INSERT INTO item_instances
             (template_id, owner_char_id, equipped_slot, room_id, container_id)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(template_id)
        .bind(char_id)
        .bind(slot)
        .bind(room_id)
        .bind(container_id)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        let row = sqlx::query_as::<_, ItemInstanceRow>(&format!("{SELECT_INSTANCE} WHERE id = ?"))
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn load_items_for_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<ItemInstanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ItemInstanceRow>(&format!(
            "{SELECT_INSTANCE} WHERE owner_char_id = ?"
        ))
        .bind(character_id)
        .fetch_all(self.pool())
        .await
    }

    pub async fn load_items_for_room(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<ItemInstanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ItemInstanceRow>(&format!("{SELECT_INSTANCE} WHERE room_id = ?"))
            .bind(room_id)
            .fetch_all(self.pool())
            .await
    }

    pub async fn load_items_in_container(
        &self,
        container_id: ItemId,
    ) -> Result<Vec<ItemInstanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ItemInstanceRow>(&format!(
            "{SELECT_INSTANCE} WHERE container_id = ?"
        ))
        .bind(container_id)
        .fetch_all(self.pool())
        .await
    }

    /// A shop purchase: create the buyer's new instance and decrement the
    /// stock row (when one is named) inside one transaction, so paying and
    /// stocking can never come apart. Returns the created row.
    pub async fn purchase_item_instance(
        &self,
        template_id: i64,
        buyer: CharacterId,
        stock_row_id: Option<i64>,
    ) -> Result<ItemInstanceRow, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO item_instances (template_id, owner_char_id) VALUES (?, ?)",
        )
        .bind(template_id)
        .bind(buyer)
        .execute(&mut *tx)
        .await?;
        let id = inserted.last_insert_rowid();

        if let Some(row_id) = stock_row_id {
            let decremented = sqlx::query(
                "UPDATE shop_inventories SET stock_quantity = stock_quantity - 1
                 WHERE id = ? AND stock_quantity > 0",
            )
            .bind(row_id)
            .execute(&mut *tx)
            .await?;
            if decremented.rows_affected() == 0 {
                // Someone else took the last one mid-flight.
                return Err(sqlx::Error::RowNotFound);
            }
        }

        let row = sqlx::query_as::<_, ItemInstanceRow>(&format!("{SELECT_INSTANCE} WHERE id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Every instance resting in a room or inside a container; the boot
    /// pass uses one query instead of one per room.
    pub async fn load_world_item_instances(&self) -> Result<Vec<ItemInstanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ItemInstanceRow>(&format!(
            "{SELECT_INSTANCE} WHERE room_id IS NOT NULL OR container_id IS NOT NULL"
        ))
        .fetch_all(self.pool())
        .await
    }

    pub async fn load_banked_items(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<ItemInstanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ItemInstanceRow>(
            "SELECT i.id, i.template_id, i.condition, i.instance_stats,
                    i.owner_char_id, i.equipped_slot, i.room_id, i.container_id
             FROM item_instances i
             JOIN banked_items b ON b.item_instance_id = i.id
             WHERE b.character_id = ?",
        )
        .bind(character_id)
        .fetch_all(self.pool())
        .await
    }

    /// Reassign an instance to a new owner.
    pub async fn move_item(&self, item_id: ItemId, owner: ItemOwner) -> Result<(), sqlx::Error> {
        let (char_id, slot, room_id, container_id) = owner_columns(owner);
        sqlx::query(
            "UPDATE item_instances
             SET owner_char_id = ?, equipped_slot = ?, room_id = ?, container_id = ?
             WHERE id = ?",
        )
        .bind(char_id)
        .bind(slot)
        .bind(room_id)
        .bind(container_id)
        .bind(item_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn update_item_condition(
        &self,
        item_id: ItemId,
        condition: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE item_instances SET condition = ? WHERE id = ?")
            .bind(condition)
            .bind(item_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn update_instance_stats(
        &self,
        item_id: ItemId,
        instance_stats_json: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE item_instances SET instance_stats = ? WHERE id = ?")
            .bind(instance_stats_json)
            .bind(item_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn delete_item_instance(&self, item_id: ItemId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM banked_items WHERE item_instance_id = ?")
            .bind(item_id)
            .execute(self.pool())
            .await?;
        sqlx::query("DELETE FROM item_instances WHERE id = ?")
            .bind(item_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    // --- Bank ---

    pub async fn bank_balance(&self, character_id: CharacterId) -> Result<i64, sqlx::Error> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM bank_accounts WHERE character_id = ?")
                .bind(character_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(balance.unwrap_or(0))
    }

    pub async fn adjust_bank_balance(
        &self,
        character_id: CharacterId,
        delta: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO bank_accounts (character_id, balance) VALUES (?, MAX(0, ?))
             ON CONFLICT(character_id) DO UPDATE SET balance = MAX(0, balance + ?)",
        )
        .bind(character_id)
        .bind(delta)
        .bind(delta)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Move an item from a character's hands into their bank box. One
    /// transaction: detach from every owner column and record the banked row.
    pub async fn bank_item(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "UPDATE item_instances
             SET owner_char_id = NULL, equipped_slot = NULL, room_id = NULL, container_id = NULL
             WHERE id = ?",
        )
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO banked_items (character_id, item_instance_id) VALUES (?, ?)")
            .bind(character_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Reverse of [`Db::bank_item`].
    pub async fn unbank_item(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        let removed = sqlx::query(
            "DELETE FROM banked_items WHERE character_id = ? AND item_instance_id = ?",
        )
        .bind(character_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        sqlx::query("UPDATE item_instances SET owner_char_id = ? WHERE id = ?")
            .bind(character_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    // --- Room / shop state ---

    pub async fn update_room_coinage(
        &self,
        room_id: RoomId,
        coinage: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE rooms SET coinage = MAX(0, ?) WHERE id = ?")
            .bind(coinage)
            .bind(room_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

}

fn owner_columns(
    owner: ItemOwner,
) -> (Option<i64>, Option<&'static str>, Option<i64>, Option<i64>) {
    match owner {
        ItemOwner::Inventory(char_id) => (Some(char_id), None, None, None),
        ItemOwner::Equipped(char_id, slot) => (Some(char_id), Some(slot.key()), None, None),
        ItemOwner::Room(room_id) => (None, None, Some(room_id), None),
        ItemOwner::Container(item_id) => (None, None, None, Some(item_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashenmoor_core::slots::WearSlot;

    async fn seed_template(db: &Db) -> i64 {
        sqlx::query("INSERT INTO item_templates (name, type, stats) VALUES (?, 'WEAPON', ?)")
            .bind("a rusty sword")
            .bind(r#"{"damage_base": 5, "damage_rng": 3, "speed": 2.0, "value": 120, "wear_location": ["main_hand"]}"#)
            .execute(db.pool())
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn seed_character(db: &Db) -> i64 {
        let player = db.create_account("smith", "h", "s@example.com").await.unwrap();
        sqlx::query(
            "INSERT INTO characters (player_id, first_name, last_name) VALUES (?, 'Test', 'Subject')",
        )
        .bind(player)
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn item_has_exactly_one_owner_after_moves() {
        let db = Db::connect_in_memory().await.unwrap();
        let template = seed_template(&db).await;
        let character = seed_character(&db).await;

        let row = db
            .create_item_instance(template, ItemOwner::Room(1))
            .await
            .unwrap();
        assert_eq!(row.room_id, Some(1));
        assert_eq!(row.owner_char_id, None);

        db.move_item(row.id, ItemOwner::Inventory(character)).await.unwrap();
        let held = db.load_items_for_character(character).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].room_id, None);
        assert_eq!(held[0].owner_char_id, Some(character));

        db.move_item(row.id, ItemOwner::Equipped(character, WearSlot::MainHand))
            .await
            .unwrap();
        let held = db.load_items_for_character(character).await.unwrap();
        assert_eq!(held[0].equipped_slot.as_deref(), Some("main_hand"));
    }

    #[tokio::test]
    async fn bank_round_trip() {
        let db = Db::connect_in_memory().await.unwrap();
        let template = seed_template(&db).await;
        let character = seed_character(&db).await;
        let row = db
            .create_item_instance(template, ItemOwner::Inventory(character))
            .await
            .unwrap();

        db.bank_item(character, row.id).await.unwrap();
        assert!(db.load_items_for_character(character).await.unwrap().is_empty());
        assert_eq!(db.load_banked_items(character).await.unwrap().len(), 1);

        db.unbank_item(character, row.id).await.unwrap();
        assert_eq!(db.load_items_for_character(character).await.unwrap().len(), 1);
        assert!(db.load_banked_items(character).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bank_balance_never_goes_negative() {
        let db = Db::connect_in_memory().await.unwrap();
        let character = seed_character(&db).await;
        db.adjust_bank_balance(character, 100).await.unwrap();
        db.adjust_bank_balance(character, -500).await.unwrap();
        assert_eq!(db.bank_balance(character).await.unwrap(), 0);
    }
}
