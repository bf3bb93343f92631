//! Schema bootstrap. Creates any missing tables and seeds the minimum
//! content the runtime cannot live without: the default area, the fallback
//! room 1, the race and class catalogs, and the stock ability templates.
//! Real content is authored through the world editor; these seeds only make
//! a fresh database bootable.

use sqlx::SqlitePool;

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS players (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        hashed_password TEXT NOT NULL,
        email TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        last_login TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS areas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        description TEXT NOT NULL DEFAULT 'An undescribed area.',
        climate TEXT NOT NULL DEFAULT 'temperate'
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        area_id INTEGER NOT NULL REFERENCES areas(id) ON DELETE RESTRICT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT 'You see nothing special.',
        exits TEXT NOT NULL DEFAULT '{}',
        flags TEXT NOT NULL DEFAULT '[]',
        spawners TEXT NOT NULL DEFAULT '{}',
        coinage INTEGER NOT NULL DEFAULT 0,
        shop_buy_filter TEXT,
        shop_sell_modifier REAL NOT NULL DEFAULT 0.5
    )",
    "CREATE TABLE IF NOT EXISTS room_objects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        keywords TEXT NOT NULL DEFAULT '[]'
    )",
    "CREATE TABLE IF NOT EXISTS races (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS classes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        hp_die INTEGER NOT NULL DEFAULT 6,
        essence_die INTEGER NOT NULL DEFAULT 6
    )",
    "CREATE TABLE IF NOT EXISTS characters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        sex TEXT NOT NULL DEFAULT 'They/Them',
        race_id INTEGER REFERENCES races(id),
        class_id INTEGER REFERENCES classes(id),
        level INTEGER NOT NULL DEFAULT 1,
        hp REAL NOT NULL DEFAULT 10,
        max_hp REAL NOT NULL DEFAULT 10,
        essence REAL NOT NULL DEFAULT 10,
        max_essence REAL NOT NULL DEFAULT 10,
        xp_pool REAL NOT NULL DEFAULT 0,
        xp_total REAL NOT NULL DEFAULT 0,
        unspent_skill_points INTEGER NOT NULL DEFAULT 0,
        unspent_attribute_points INTEGER NOT NULL DEFAULT 0,
        spiritual_tether INTEGER NOT NULL DEFAULT 10,
        description TEXT NOT NULL DEFAULT '',
        coinage INTEGER NOT NULL DEFAULT 0,
        location_id INTEGER NOT NULL DEFAULT 1,
        status TEXT NOT NULL DEFAULT 'ALIVE',
        stance TEXT NOT NULL DEFAULT 'Standing',
        stats TEXT NOT NULL DEFAULT '{}',
        skills TEXT NOT NULL DEFAULT '{}',
        known_spells TEXT NOT NULL DEFAULT '[]',
        known_abilities TEXT NOT NULL DEFAULT '[]',
        hunger REAL NOT NULL DEFAULT 100,
        thirst REAL NOT NULL DEFAULT 100,
        total_playtime_seconds INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        last_saved TIMESTAMP,
        UNIQUE (player_id, first_name, last_name)
    )",
    "CREATE TABLE IF NOT EXISTS item_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        type TEXT NOT NULL DEFAULT 'GENERAL',
        damage_type TEXT,
        flags TEXT NOT NULL DEFAULT '[]',
        stats TEXT NOT NULL DEFAULT '{}'
    )",
    "CREATE TABLE IF NOT EXISTS item_instances (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id INTEGER NOT NULL REFERENCES item_templates(id) ON DELETE CASCADE,
        condition INTEGER NOT NULL DEFAULT 100,
        instance_stats TEXT NOT NULL DEFAULT '{}',
        owner_char_id INTEGER REFERENCES characters(id) ON DELETE CASCADE,
        equipped_slot TEXT,
        room_id INTEGER REFERENCES rooms(id) ON DELETE SET NULL,
        container_id INTEGER REFERENCES item_instances(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS mob_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        level INTEGER NOT NULL DEFAULT 1,
        max_hp INTEGER NOT NULL DEFAULT 10,
        stats TEXT NOT NULL DEFAULT '{}',
        attacks TEXT NOT NULL DEFAULT '[]',
        loot TEXT NOT NULL DEFAULT '{}',
        flags TEXT NOT NULL DEFAULT '[]',
        resistances TEXT NOT NULL DEFAULT '{}',
        respawn_delay_seconds INTEGER NOT NULL DEFAULT 60
    )",
    "CREATE TABLE IF NOT EXISTS shop_inventories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
        item_template_id INTEGER NOT NULL REFERENCES item_templates(id) ON DELETE CASCADE,
        stock_quantity INTEGER NOT NULL DEFAULT -1,
        buy_price_modifier REAL NOT NULL DEFAULT 1.5,
        sell_price_modifier REAL NOT NULL DEFAULT 0.5
    )",
    "CREATE TABLE IF NOT EXISTS bank_accounts (
        character_id INTEGER PRIMARY KEY REFERENCES characters(id) ON DELETE CASCADE,
        balance INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS banked_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        character_id INTEGER NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
        item_instance_id INTEGER UNIQUE NOT NULL REFERENCES item_instances(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS ability_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        internal_name TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL DEFAULT 'ABILITY',
        class_req TEXT NOT NULL DEFAULT '[]',
        level_req INTEGER NOT NULL DEFAULT 1,
        cost REAL NOT NULL DEFAULT 0,
        target_type TEXT NOT NULL DEFAULT 'NONE',
        cast_time REAL NOT NULL DEFAULT 0,
        roundtime REAL NOT NULL DEFAULT 1.0,
        effect_type TEXT NOT NULL DEFAULT 'BUFF',
        effect_details TEXT NOT NULL DEFAULT '{}',
        messages TEXT NOT NULL DEFAULT '{}',
        description TEXT NOT NULL DEFAULT ''
    )",
];

struct AbilitySeed {
    internal_name: &'static str,
    name: &'static str,
    kind: &'static str,
    class_req: &'static str,
    level_req: i64,
    cost: f64,
    target_type: &'static str,
    cast_time: f64,
    roundtime: f64,
    effect_type: &'static str,
    effect_details: &'static str,
    messages: &'static str,
    description: &'static str,
}

const ABILITY_SEEDS: &[AbilitySeed] = &[
    AbilitySeed {
        internal_name: "magic missile",
        name: "Magic Missile",
        kind: "SPELL",
        class_req: r#"["mage"]"#,
        level_req: 1,
        cost: 1.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 1.5,
        roundtime: 1.0,
        effect_type: "DAMAGE",
        effect_details: r#"{"damage_base": 2, "damage_rng": 4, "damage_type": "arcane", "school": "Arcane", "always_hits": true}"#,
        messages: r#"{"caster_self_complete": "A shimmering bolt of arcane energy flies from your fingertips!", "room_complete": "{caster_name} launches a shimmering bolt of arcane energy!"}"#,
        description: "A missile of pure arcane energy unerringly strikes your target.",
    },
    AbilitySeed {
        internal_name: "mage armor",
        name: "Mage Armor",
        kind: "SPELL",
        class_req: r#"["mage"]"#,
        level_req: 1,
        cost: 5.0,
        target_type: "SELF",
        cast_time: 2.0,
        roundtime: 1.0,
        effect_type: "BUFF",
        effect_details: r#"{"name": "MageArmorBuff", "kind": "buff", "stat_affected": "barrier_value", "amount": 15, "duration": 180.0}"#,
        messages: r#"{"apply_msg_self": "{WA shimmering barrier surrounds you!{x", "apply_msg_room": "{W{caster_name} is suddenly surrounded by a shimmering barrier.{x", "expire_msg_self": "{WThe shimmering barrier around you dissipates.{x", "expire_msg_room": "{WThe shimmering barrier surrounding {target_name} dissipates.{x"}"#,
        description: "Surrounds you with a shimmering field that turns aside blows.",
    },
    AbilitySeed {
        internal_name: "flame bolt",
        name: "Flame Bolt",
        kind: "SPELL",
        class_req: r#"["mage"]"#,
        level_req: 3,
        cost: 6.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 2.0,
        roundtime: 1.5,
        effect_type: "DAMAGE",
        effect_details: r#"{"damage_base": 5, "damage_rng": 6, "damage_type": "fire", "school": "Arcane"}"#,
        messages: r#"{"caster_self_complete": "{RA lance of fire leaps from your palm!{x", "room_complete": "{R{caster_name} hurls a lance of fire!{x"}"#,
        description: "Hurls a bolt of fire at your target.",
    },
    AbilitySeed {
        internal_name: "chill touch",
        name: "Chill Touch",
        kind: "SPELL",
        class_req: r#"["mage"]"#,
        level_req: 6,
        cost: 8.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 2.0,
        roundtime: 1.5,
        effect_type: "DAMAGE",
        effect_details: r#"{"damage_base": 4, "damage_rng": 4, "damage_type": "cold", "school": "Arcane", "applies_effect": {"name": "Chilled", "kind": "debuff", "stat_affected": "agility", "amount": -5, "duration": 12.0}}"#,
        messages: r#"{"caster_self_complete": "{CFrigid energy coalesces around your hand!{x", "apply_msg_target": "{CYou feel a deep chill seep into your bones, slowing your movements.{x"}"#,
        description: "A freezing grasp that slows the target's movements.",
    },
    AbilitySeed {
        internal_name: "minor heal",
        name: "Minor Heal",
        kind: "SPELL",
        class_req: r#"["cleric"]"#,
        level_req: 1,
        cost: 5.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 1.5,
        roundtime: 1.0,
        effect_type: "HEAL",
        effect_details: r#"{"heal_base": 6, "heal_rng": 6, "school": "Divine"}"#,
        messages: r#"{"caster_self_complete": "{WA soft radiance gathers around your hands.{x"}"#,
        description: "Channels divine power to close wounds.",
    },
    AbilitySeed {
        internal_name: "smite",
        name: "Smite",
        kind: "SPELL",
        class_req: r#"["cleric"]"#,
        level_req: 2,
        cost: 6.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 1.5,
        roundtime: 1.5,
        effect_type: "DAMAGE",
        effect_details: r#"{"damage_base": 4, "damage_rng": 5, "damage_type": "divine", "school": "Divine"}"#,
        messages: r#"{"caster_self_complete": "{YHoly light streaks toward your foe!{x", "room_complete": "{Y{caster_name} calls down holy light!{x"}"#,
        description: "Strikes the target with holy light.",
    },
    AbilitySeed {
        internal_name: "power strike",
        name: "Power Strike",
        kind: "ABILITY",
        class_req: r#"["warrior"]"#,
        level_req: 1,
        cost: 10.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 0.0,
        roundtime: 0.0,
        effect_type: "MODIFIED_ATTACK",
        effect_details: r#"{"damage_multiplier": 1.5}"#,
        messages: r#"{"caster_self_complete": "{RYou gather your strength for a powerful strike!{x", "room_complete": "{R{caster_name} gathers their strength for a powerful strike!{x"}"#,
        description: "A mighty blow dealing half again normal damage.",
    },
    AbilitySeed {
        internal_name: "shield bash",
        name: "Shield Bash",
        kind: "ABILITY",
        class_req: r#"["warrior", "cleric"]"#,
        level_req: 3,
        cost: 5.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 0.0,
        roundtime: 2.5,
        effect_type: "STUN_ATTEMPT",
        effect_details: r#"{"mar_modifier_mult": 0.8, "stun_chance": 0.25, "stun_duration": 3.0, "requires_shield": true}"#,
        messages: r#"{"caster_self_complete": "You slam your shield forward!"}"#,
        description: "Slams your shield into the target, possibly stunning it.",
    },
    AbilitySeed {
        internal_name: "cleave",
        name: "Cleave",
        kind: "ABILITY",
        class_req: r#"["warrior"]"#,
        level_req: 12,
        cost: 20.0,
        target_type: "MOB",
        cast_time: 0.0,
        roundtime: 4.0,
        effect_type: "MODIFIED_ATTACK",
        effect_details: r#"{"is_cleave": true, "max_cleave_targets": 3, "damage_multiplier": 0.75}"#,
        messages: r#"{"caster_self_complete": "You swing your weapon in a wide arc!", "room_complete": "{caster_name} swings their weapon in a wide arc!"}"#,
        description: "A sweeping strike that carries into nearby foes.",
    },
    AbilitySeed {
        internal_name: "backstab",
        name: "Backstab",
        kind: "ABILITY",
        class_req: r#"["rogue"]"#,
        level_req: 1,
        cost: 8.0,
        target_type: "CHAR_OR_MOB",
        cast_time: 0.0,
        roundtime: 0.0,
        effect_type: "MODIFIED_ATTACK",
        effect_details: r#"{"damage_multiplier": 2.0, "bonus_hit": 4, "requires_stealth_or_flank": true}"#,
        messages: r#"{"caster_self_complete": "You slip behind your target, blade first."}"#,
        description: "A devastating strike from hiding or against an engaged foe.",
    },
    AbilitySeed {
        internal_name: "rage",
        name: "Rage",
        kind: "ABILITY",
        class_req: r#"["warrior"]"#,
        level_req: 6,
        cost: 12.0,
        target_type: "SELF",
        cast_time: 0.0,
        roundtime: 1.0,
        effect_type: "BUFF",
        effect_details: r#"{"name": "Rage", "kind": "buff", "stat_affected": "might", "amount": 6, "duration": 30.0, "effects_to_apply": [{"name": "RageRecklessness", "kind": "debuff", "stat_affected": "dodge_value", "amount": -4, "duration": 30.0}]}"#,
        messages: r#"{"apply_msg_self": "{RA red haze descends over your vision!{x", "apply_msg_room": "{R{caster_name} flies into a frothing rage!{x", "expire_msg_self": "The red haze lifts and your pulse steadies.", "expire_msg_room": "{target_name} calms down."}"#,
        description: "Trades caution for fury: might up, dodge down.",
    },
];

/// Create missing tables and seed baseline content. Idempotent; called on
/// every boot.
pub async fn initialize(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    for ddl in CREATE_TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }

    seed_defaults(pool).await?;
    Ok(())
}

async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let area_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM areas WHERE id = 1")
        .fetch_one(pool)
        .await?;
    if area_count == 0 {
        log::info!("Seeding default area #1.");
        sqlx::query("INSERT INTO areas (id, name, description, climate) VALUES (1, ?, ?, 'temperate')")
            .bind("The Hollow Vale")
            .bind("A quiet valley where lost souls find their footing.")
            .execute(pool)
            .await?;
    }

    let room_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms WHERE id = 1")
        .fetch_one(pool)
        .await?;
    if room_count == 0 {
        log::info!("Seeding default room #1.");
        sqlx::query(
            "INSERT INTO rooms (id, area_id, name, description, exits, flags)
             VALUES (1, 1, ?, ?, '{}', ?)",
        )
        .bind("The Waystone Circle")
        .bind(
            "Weathered standing stones ring a mossy clearing. A faint hum in the \
             air makes the ground feel safer than it has any right to be.",
        )
        .bind(r#"["NODE", "OUTDOORS"]"#)
        .execute(pool)
        .await?;
    }

    let race_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM races")
        .fetch_one(pool)
        .await?;
    if race_count == 0 {
        log::info!("Seeding race catalog.");
        for (name, description) in [
            ("Human", "Adaptable folk found in every corner of the vale."),
            ("Dwarf", "Stout delvers, hardy but gruff."),
            ("Elf", "Long-lived and keen-minded, though frail."),
            ("Saurian", "Shelled reptilian wanderers attuned to the unseen."),
        ] {
            sqlx::query("INSERT INTO races (name, description) VALUES (?, ?)")
                .bind(name)
                .bind(description)
                .execute(pool)
                .await?;
        }
    }

    let class_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes")
        .fetch_one(pool)
        .await?;
    if class_count == 0 {
        log::info!("Seeding class catalog.");
        for (name, description, hp_die, essence_die) in [
            ("Warrior", "Front-line fighters who live by steel.", 10i64, 4i64),
            ("Mage", "Students of the arcane weave.", 4, 10),
            ("Cleric", "Vessels of divine will.", 8, 6),
            ("Rogue", "Knives in the dark, hands in your pockets.", 6, 4),
        ] {
            sqlx::query(
                "INSERT INTO classes (name, description, hp_die, essence_die) VALUES (?, ?, ?, ?)",
            )
            .bind(name)
            .bind(description)
            .bind(hp_die)
            .bind(essence_die)
            .execute(pool)
            .await?;
        }
    }

    let ability_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ability_templates")
        .fetch_one(pool)
        .await?;
    if ability_count == 0 {
        log::info!("Seeding {} ability templates.", ABILITY_SEEDS.len());
        for seed in ABILITY_SEEDS {
            sqlx::query(
                "INSERT INTO ability_templates
                 (internal_name, name, type, class_req, level_req, cost, target_type,
                  cast_time, roundtime, effect_type, effect_details, messages, description)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(seed.internal_name)
            .bind(seed.name)
            .bind(seed.kind)
            .bind(seed.class_req)
            .bind(seed.level_req)
            .bind(seed.cost)
            .bind(seed.target_type)
            .bind(seed.cast_time)
            .bind(seed.roundtime)
            .bind(seed.effect_type)
            .bind(seed.effect_details)
            .bind(seed.messages)
            .bind(seed.description)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}
