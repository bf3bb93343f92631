pub mod abilities;
pub mod character;
pub mod combat;
pub mod commands;
pub mod config;
pub mod creation;
pub mod credential;
pub mod db;
pub mod effect;
pub mod game;
pub mod group;
pub mod item;
pub mod mob;
pub mod net;
pub mod room;
pub mod session;
pub mod skills;
pub mod ticker;
pub mod world;

/// Database id of a character row; doubles as the runtime handle.
pub type CharacterId = i64;
/// Database id of a room row.
pub type RoomId = i64;
/// Database id of an item instance row.
pub type ItemId = i64;
/// Runtime-only id of a spawned mob instance.
pub type MobId = i64;
/// Runtime-only id of a live connection.
pub type SessionId = u64;
/// Runtime-only id of an adventuring group.
pub type GroupId = u64;
