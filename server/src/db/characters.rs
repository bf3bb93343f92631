//! Durable character state. Loading returns the raw row (JSON columns still
//! as text); the `Character` constructor owns the parsing, mirroring how
//! templates hydrate elsewhere.

use sqlx::FromRow;

use super::Db;
use crate::character::Character;
use crate::CharacterId;

#[derive(Debug, Clone, FromRow)]
pub struct CharacterRow {
    pub id: i64,
    pub player_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub race_id: Option<i64>,
    pub class_id: Option<i64>,
    pub level: i64,
    pub hp: f64,
    pub max_hp: f64,
    pub essence: f64,
    pub max_essence: f64,
    pub xp_pool: f64,
    pub xp_total: f64,
    pub unspent_skill_points: i64,
    pub unspent_attribute_points: i64,
    pub spiritual_tether: i64,
    pub description: String,
    pub coinage: i64,
    pub location_id: i64,
    pub status: String,
    pub stance: String,
    pub stats: String,
    pub skills: String,
    pub known_spells: String,
    pub known_abilities: String,
    pub hunger: f64,
    pub thirst: f64,
    pub total_playtime_seconds: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CharacterSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub race_id: Option<i64>,
    pub class_id: Option<i64>,
    pub level: i64,
}

/// Field bundle for inserting a freshly created character.
#[derive(Debug, Clone)]
pub struct NewCharacter {
    pub player_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub race_id: i64,
    pub class_id: i64,
    pub max_hp: f64,
    pub max_essence: f64,
    pub description: String,
    pub stats_json: String,
    pub skills_json: String,
    pub known_spells_json: String,
    pub known_abilities_json: String,
    pub unspent_skill_points: i64,
    pub location_id: i64,
    pub spiritual_tether: i64,
}

const SELECT_CHARACTER: &str = "SELECT id, player_id, first_name, last_name, sex, race_id,
    class_id, level, hp, max_hp, essence, max_essence, xp_pool, xp_total,
    unspent_skill_points, unspent_attribute_points, spiritual_tether, description,
    coinage, location_id, status, stance, stats, skills, known_spells,
    known_abilities, hunger, thirst, total_playtime_seconds FROM characters";

impl Db {
    pub async fn load_character(
        &self,
        id: CharacterId,
    ) -> Result<Option<CharacterRow>, sqlx::Error> {
        sqlx::query_as::<_, CharacterRow>(&format!("{SELECT_CHARACTER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn list_characters_for_account(
        &self,
        player_id: i64,
    ) -> Result<Vec<CharacterSummary>, sqlx::Error> {
        sqlx::query_as::<_, CharacterSummary>(
            "SELECT id, first_name, last_name, race_id, class_id, level
             FROM characters WHERE player_id = ? ORDER BY id",
        )
        .bind(player_id)
        .fetch_all(self.pool())
        .await
    }

    pub async fn create_character(&self, new: &NewCharacter) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO characters
             (player_id, first_name, last_name, sex, race_id, class_id,
              hp, max_hp, essence, max_essence, description,
              stats, skills, known_spells, known_abilities,
              unspent_skill_points, location_id, spiritual_tether)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.player_id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.sex)
        .bind(new.race_id)
        .bind(new.class_id)
        .bind(new.max_hp)
        .bind(new.max_hp)
        .bind(new.max_essence)
        .bind(new.max_essence)
        .bind(&new.description)
        .bind(&new.stats_json)
        .bind(&new.skills_json)
        .bind(&new.known_spells_json)
        .bind(&new.known_abilities_json)
        .bind(new.unspent_skill_points)
        .bind(new.location_id)
        .bind(new.spiritual_tether)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Persist every durable field of an active character.
    pub async fn save_character(&self, character: &Character) -> Result<u64, sqlx::Error> {
        let stats = serde_json::to_string(&character.stats).unwrap_or_else(|_| "{}".into());
        let skills = serde_json::to_string(&character.skills).unwrap_or_else(|_| "{}".into());
        let spells =
            serde_json::to_string(&character.known_spells).unwrap_or_else(|_| "[]".into());
        let abilities =
            serde_json::to_string(&character.known_abilities).unwrap_or_else(|_| "[]".into());

        let result = sqlx::query(
            "UPDATE characters SET
               level = ?, hp = ?, max_hp = ?, essence = ?, max_essence = ?,
               xp_pool = ?, xp_total = ?, unspent_skill_points = ?,
               unspent_attribute_points = ?, spiritual_tether = ?, coinage = ?,
               location_id = ?, status = ?, stance = ?, stats = ?, skills = ?,
               known_spells = ?, known_abilities = ?, hunger = ?, thirst = ?,
               total_playtime_seconds = ?, last_saved = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(character.level as i64)
        .bind(character.hp)
        .bind(character.max_hp)
        .bind(character.essence)
        .bind(character.max_essence)
        .bind(character.xp_pool)
        .bind(character.xp_total)
        .bind(character.unspent_skill_points)
        .bind(character.unspent_attribute_points)
        .bind(character.spiritual_tether)
        .bind(character.coinage)
        .bind(character.location_id)
        .bind(character.status.as_str())
        .bind(character.stance.as_str())
        .bind(stats)
        .bind(skills)
        .bind(spells)
        .bind(abilities)
        .bind(character.hunger)
        .bind(character.thirst)
        .bind(character.total_playtime_seconds)
        .bind(character.id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::db::Db;
    use ashenmoor_core::types::{Stance, Status};

    fn sample_new_character(player_id: i64) -> NewCharacter {
        NewCharacter {
            player_id,
            first_name: "Gimli".into(),
            last_name: "Sonofgloin".into(),
            sex: "Male".into(),
            race_id: 2,
            class_id: 1,
            max_hp: 24.0,
            max_essence: 8.0,
            description: "A sturdy dwarf.".into(),
            stats_json: r#"{"might": 15, "vitality": 16, "agility": 9, "intellect": 10, "aura": 8, "persona": 9}"#.into(),
            skills_json: r#"{"bladed weapons": 5, "shield usage": 5}"#.into(),
            known_spells_json: "[]".into(),
            known_abilities_json: r#"["power strike"]"#.into(),
            unspent_skill_points: 8,
            location_id: 1,
            spiritual_tether: 10,
        }
    }

    #[tokio::test]
    async fn save_then_load_reproduces_every_persisted_field() {
        let db = Db::connect_in_memory().await.unwrap();
        let player = db.create_account("gimli", "hash", "g@example.com").await.unwrap();
        let id = db.create_character(&sample_new_character(player)).await.unwrap();

        let row = db.load_character(id).await.unwrap().unwrap();
        let mut character = Character::from_row(&row, false);
        assert_eq!(character.name, "Gimli Sonofgloin");
        assert_eq!(character.hp, 24.0, "fresh characters start at full vitals");

        // Play a little: wounds, progress, money, travel, new skill ranks.
        character.hp = 11.5;
        character.essence = 3.0;
        character.xp_pool = 120.0;
        character.xp_total = 640.0;
        character.level = 2;
        character.coinage = 345;
        character.location_id = 1;
        character.status = Status::Alive;
        character.stance = Stance::Sitting;
        character.skills.insert("bartering".into(), 7);
        character.known_spells.insert("minor heal".into());
        character.stats.might = 16;
        character.spiritual_tether = 9;
        character.hunger = 80.0;
        character.thirst = 61.5;
        character.total_playtime_seconds = 4200;
        assert_eq!(db.save_character(&character).await.unwrap(), 1);

        let reloaded_row = db.load_character(id).await.unwrap().unwrap();
        let reloaded = Character::from_row(&reloaded_row, false);

        assert_eq!(reloaded.hp, 11.5);
        assert_eq!(reloaded.essence, 3.0);
        assert_eq!(reloaded.xp_pool, 120.0);
        assert_eq!(reloaded.xp_total, 640.0);
        assert_eq!(reloaded.level, 2);
        assert_eq!(reloaded.coinage, 345);
        assert_eq!(reloaded.location_id, 1);
        assert_eq!(reloaded.status, Status::Alive);
        assert_eq!(reloaded.stance, Stance::Sitting);
        assert_eq!(reloaded.skills.get("bartering"), Some(&7));
        assert_eq!(reloaded.skills.get("bladed weapons"), Some(&5));
        assert!(reloaded.knows_spell("minor heal"));
        assert!(reloaded.knows_ability("power strike"));
        assert_eq!(reloaded.stats.might, 16);
        assert_eq!(reloaded.spiritual_tether, 9);
        assert_eq!(reloaded.hunger, 80.0);
        assert_eq!(reloaded.thirst, 61.5);
        assert_eq!(reloaded.total_playtime_seconds, 4200);
    }

    #[tokio::test]
    async fn characters_saved_mid_death_load_as_dead() {
        let db = Db::connect_in_memory().await.unwrap();
        let player = db.create_account("ghost", "hash", "g2@example.com").await.unwrap();
        let id = db.create_character(&sample_new_character(player)).await.unwrap();

        let row = db.load_character(id).await.unwrap().unwrap();
        let mut character = Character::from_row(&row, false);
        character.hp = 0.0;
        character.status = Status::Dying;
        db.save_character(&character).await.unwrap();

        let reloaded = Character::from_row(&db.load_character(id).await.unwrap().unwrap(), false);
        assert_eq!(reloaded.status, Status::Dead, "a saved DYING resolves to DEAD on load");
        assert_eq!(reloaded.hp, 0.0);
    }

    #[tokio::test]
    async fn listing_shows_only_the_accounts_characters() {
        let db = Db::connect_in_memory().await.unwrap();
        let a = db.create_account("alpha", "h", "a@example.com").await.unwrap();
        let b = db.create_account("beta", "h", "b@example.com").await.unwrap();
        db.create_character(&sample_new_character(a)).await.unwrap();

        assert_eq!(db.list_characters_for_account(a).await.unwrap().len(), 1);
        assert!(db.list_characters_for_account(b).await.unwrap().is_empty());
    }
}
