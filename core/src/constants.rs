//! Process-level tuning constants. These are compile-time knobs; runtime
//! settings (bind address, database URL, tick interval) come from the
//! server's environment config.

/// Default listen address for the telnet-style listener.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 4000;
/// Default SQLite database URL. `mode=rwc` creates the file on first boot.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://ashenmoor.db?mode=rwc";
/// Default world tick interval in seconds.
pub const DEFAULT_TICK_SECS: f64 = 1.0;

// --- Leveling & experience ---

/// Maximum attainable character level.
pub const MAX_LEVEL: u32 = 100;
/// XP required for level 2; the base of the curve.
pub const XP_BASE: f64 = 1000.0;
/// Exponent of the level curve. Higher is steeper.
pub const XP_EXPONENT: f64 = 2.5;
/// Every 10 levels the curve picks up another +0.5x tier multiplier.
pub const XP_TIER_STEP: f64 = 0.5;
/// XP pool drained into total per second while resting in a NODE room.
pub const XP_ABSORB_RATE_PER_SEC: f64 = 1.0;
/// XP pool capacity per point of intellect.
pub const XP_POOL_CAP_PER_INTELLECT: f64 = 100.0;
/// Skill points granted at each new level.
pub const SKILL_POINTS_PER_LEVEL: i64 = 5;

// --- Regeneration ---

pub const HP_REGEN_BASE_PER_SEC: f64 = 0.5;
pub const HP_REGEN_VIT_MULTIPLIER: f64 = 0.25;
pub const ESSENCE_REGEN_BASE_PER_SEC: f64 = 0.5;
pub const ESSENCE_REGEN_AURA_MULTIPLIER: f64 = 0.25;
/// Essence regen multiplier while meditating.
pub const MEDITATE_REGEN_MULTIPLIER: f64 = 3.0;
/// HP and essence regen multiplier inside NODE rooms.
pub const NODE_REGEN_MULTIPLIER: f64 = 2.0;

// --- Hunger & thirst ---

pub const HUNGER_MAX: f64 = 100.0;
pub const THIRST_MAX: f64 = 100.0;
/// Gauge points lost per second of play.
pub const HUNGER_DECAY_PER_SEC: f64 = 0.01;
pub const THIRST_DECAY_PER_SEC: f64 = 0.015;

// --- Combat ---

/// Chance per landed hit that the attacker's weapon loses a condition point,
/// and independently that one worn armor piece of the defender does.
pub const DURABILITY_LOSS_CHANCE: f64 = 0.10;
/// An exploding damage die may chain at most this many times.
pub const MAX_DIE_EXPLOSIONS: u32 = 10;
/// Hard ceiling on parry chance.
pub const PARRY_CHANCE_CAP: f64 = 0.5;
/// Parry chance gained per rank of the parrying skill.
pub const PARRY_CHANCE_PER_RANK: f64 = 0.005;
/// Roundtime penalty per point of worn armor value, in seconds.
pub const ROUNDTIME_PER_AV: f64 = 0.05;
/// Base roundtime for an attack that misses outright.
pub const MISS_ROUNDTIME: f64 = 1.0;
/// Unarmed strikes: damage base/range and swing speed.
pub const UNARMED_DAMAGE_BASE: i64 = 1;
pub const UNARMED_DAMAGE_RNG: i64 = 2;
pub const UNARMED_SPEED: f64 = 2.0;

// --- Sessions & characters ---

/// Failed password entries tolerated before the connection is dropped.
pub const MAX_PASSWORD_ATTEMPTS: u32 = 3;
/// A character carries at most this many top-level items (their hands).
pub const HANDS_CAPACITY: usize = 2;
/// Party size cap, leader included.
pub const MAX_GROUP_SIZE: usize = 4;
/// A freshly created character starts with this many tether points.
pub const STARTING_SPIRITUAL_TETHER: i64 = 10;
/// Room every lost soul is pulled back to.
pub const RESPAWN_ROOM_ID: i64 = 1;

// --- Economy ---

/// Storage fee charged when banking an item, as a fraction of its value.
pub const BANK_ITEM_FEE_RATE: f64 = 0.10;
/// Fraction of carried coinage spilled on the floor when a character falls.
pub const DEATH_COINAGE_DROP_RATE: f64 = 0.10;
/// Fraction of progress into the current level drained on death.
pub const DEATH_XP_PENALTY_RATE: f64 = 0.10;
/// Group kills pay out at this fraction of the solo reward.
pub const GROUP_XP_MULTIPLIER: f64 = 0.80;

// --- Weather ---

/// Seconds between area weather re-rolls.
pub const WEATHER_CYCLE_SECS: f64 = 300.0;
