//! Bulk catalog and topology loads used once at boot.

use sqlx::FromRow;

use super::Db;

#[derive(Debug, Clone, FromRow)]
pub struct AreaRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub climate: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    pub id: i64,
    pub area_id: i64,
    pub name: String,
    pub description: String,
    pub exits: String,
    pub flags: String,
    pub spawners: String,
    pub coinage: i64,
    pub shop_buy_filter: Option<String>,
    pub shop_sell_modifier: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RoomObjectRow {
    pub id: i64,
    pub room_id: i64,
    pub name: String,
    pub description: String,
    pub keywords: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RaceRow {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClassRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub hp_die: i64,
    pub essence_die: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemTemplateRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(rename = "type")]
    pub item_type: String,
    pub damage_type: Option<String>,
    pub flags: String,
    pub stats: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct MobTemplateRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: i64,
    pub max_hp: i64,
    pub stats: String,
    pub attacks: String,
    pub loot: String,
    pub flags: String,
    pub resistances: String,
    pub respawn_delay_seconds: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ShopStockRow {
    pub id: i64,
    pub room_id: i64,
    pub item_template_id: i64,
    pub stock_quantity: i64,
    pub buy_price_modifier: f64,
    pub sell_price_modifier: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AbilityRow {
    pub id: i64,
    pub internal_name: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub class_req: String,
    pub level_req: i64,
    pub cost: f64,
    pub target_type: String,
    pub cast_time: f64,
    pub roundtime: f64,
    pub effect_type: String,
    pub effect_details: String,
    pub messages: String,
    pub description: String,
}

impl Db {
    pub async fn load_all_areas(&self) -> Result<Vec<AreaRow>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, description, climate FROM areas ORDER BY id")
            .fetch_all(self.pool())
            .await
    }

    pub async fn load_all_rooms(&self) -> Result<Vec<RoomRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, area_id, name, description, exits, flags, spawners, coinage,
                    shop_buy_filter, shop_sell_modifier
             FROM rooms ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn load_all_room_objects(&self) -> Result<Vec<RoomObjectRow>, sqlx::Error> {
        sqlx::query_as("SELECT id, room_id, name, description, keywords FROM room_objects")
            .fetch_all(self.pool())
            .await
    }

    pub async fn load_all_races(&self) -> Result<Vec<RaceRow>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, description FROM races ORDER BY id")
            .fetch_all(self.pool())
            .await
    }

    pub async fn load_all_classes(&self) -> Result<Vec<ClassRow>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, description, hp_die, essence_die FROM classes ORDER BY id")
            .fetch_all(self.pool())
            .await
    }

    pub async fn load_all_item_templates(&self) -> Result<Vec<ItemTemplateRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, description, type, damage_type, flags, stats FROM item_templates",
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn load_all_mob_templates(&self) -> Result<Vec<MobTemplateRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, description, level, max_hp, stats, attacks, loot, flags,
                    resistances, respawn_delay_seconds
             FROM mob_templates",
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn load_all_shop_inventories(&self) -> Result<Vec<ShopStockRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, room_id, item_template_id, stock_quantity,
                    buy_price_modifier, sell_price_modifier
             FROM shop_inventories ORDER BY room_id, id",
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn load_all_abilities(&self) -> Result<Vec<AbilityRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, internal_name, name, type, class_req, level_req, cost, target_type,
                    cast_time, roundtime, effect_type, effect_details, messages, description
             FROM ability_templates",
        )
        .fetch_all(self.pool())
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Db;

    #[tokio::test]
    async fn bootstrap_seeds_are_loadable() {
        let db = Db::connect_in_memory().await.unwrap();

        let areas = db.load_all_areas().await.unwrap();
        assert!(areas.iter().any(|a| a.id == 1));

        let rooms = db.load_all_rooms().await.unwrap();
        assert!(rooms.iter().any(|r| r.id == 1), "default room 1 must exist");

        assert_eq!(db.load_all_races().await.unwrap().len(), 4);
        assert_eq!(db.load_all_classes().await.unwrap().len(), 4);
        assert!(!db.load_all_abilities().await.unwrap().is_empty());
    }
}
