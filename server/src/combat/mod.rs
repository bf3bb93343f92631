//! Combat resolution, split by phase: `hit` (phase A and the block/parry
//! gate), `damage` (phase C and mitigation), `outcome` (post-damage
//! consequences and defeat), and `resolver` (the coordinator the command
//! handlers and the ticker call into).

pub mod damage;
pub mod hit;
pub mod outcome;
pub mod resolver;

use ashenmoor_core::types::{DamageType, School, Status};

use crate::mob::MobAttack;
use crate::world::{Actor, World};
use crate::ItemId;

/// What is actually swinging: a wielded weapon instance, a mob's natural
/// attack, or bare fists.
#[derive(Debug, Clone)]
pub enum AttackSource {
    Weapon(ItemId),
    Natural(MobAttack),
    Unarmed,
}

/// Read-side actor accessors used across the pipeline. Everything returns
/// owned values so callers never hold borrows across mutations.
impl World {
    pub fn actor_hp(&self, actor: Actor) -> f64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0.0, |c| c.hp),
            Actor::Mob(id) => self.mob(id).map_or(0.0, |m| m.hp),
        }
    }

    pub fn actor_max_hp(&self, actor: Actor) -> f64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0.0, |c| c.max_hp),
            Actor::Mob(id) => self.mob(id).map_or(0.0, |m| m.max_hp),
        }
    }

    pub fn actor_mar(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.mar(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.mar(self.now())),
        }
    }

    pub fn actor_rar(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.rar(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.rar(self.now())),
        }
    }

    /// APR or DPR, chosen by school.
    pub fn actor_power_rating(&self, actor: Actor, school: School) -> i64 {
        match (actor, school) {
            (Actor::Char(id), School::Arcane) => self.character(id).map_or(0, |c| c.apr(self)),
            (Actor::Char(id), School::Divine) => self.character(id).map_or(0, |c| c.dpr(self)),
            (Actor::Mob(id), School::Arcane) => self.mob(id).map_or(0, |m| m.apr(self.now())),
            (Actor::Mob(id), School::Divine) => self.mob(id).map_or(0, |m| m.dpr(self.now())),
        }
    }

    pub fn actor_dv(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.dv(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.dv(self.now())),
        }
    }

    pub fn actor_pds(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.pds(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.pds(self.now())),
        }
    }

    pub fn actor_sds(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.sds(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.sds(self.now())),
        }
    }

    pub fn actor_total_av(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.total_av(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.total_av(self.now())),
        }
    }

    pub fn actor_barrier_value(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0, |c| c.barrier_value(self)),
            Actor::Mob(id) => self.mob(id).map_or(0, |m| m.barrier_value(self.now())),
        }
    }

    pub fn actor_resistance(&self, actor: Actor, damage_type: DamageType) -> f64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0.0, |c| c.resistance(damage_type)),
            Actor::Mob(id) => self
                .mob(id)
                .and_then(|m| {
                    self.mob_template(m.template_id)
                        .map(|t| t.resistances.get(&damage_type).copied().unwrap_or(0.0))
                })
                .unwrap_or(0.0),
        }
    }

    pub fn actor_slow_penalty(&self, actor: Actor) -> f64 {
        match actor {
            Actor::Char(id) => self.character(id).map_or(0.0, |c| c.slow_penalty(self)),
            Actor::Mob(id) => self.mob(id).map_or(0.0, |m| m.slow_penalty(self.now())),
        }
    }

    pub fn actor_can_see(&self, actor: Actor) -> bool {
        match actor {
            Actor::Char(id) => self.character(id).map_or(true, |c| c.can_see(self)),
            // Mobs are assumed to have darkvision.
            Actor::Mob(_) => true,
        }
    }

    pub fn actor_is_hidden(&self, actor: Actor) -> bool {
        match actor {
            Actor::Char(id) => self.character(id).map_or(false, |c| c.hidden),
            Actor::Mob(id) => self.mob(id).map_or(false, |m| m.hidden),
        }
    }

    pub fn actor_is_meditating(&self, actor: Actor) -> bool {
        match actor {
            Actor::Char(id) => self
                .character(id)
                .map_or(false, |c| c.status == Status::Meditating),
            Actor::Mob(_) => false,
        }
    }

    /// Attack acts SET roundtime; stuns elsewhere add to it.
    pub fn actor_set_roundtime(&mut self, actor: Actor, seconds: f64) {
        match actor {
            Actor::Char(id) => {
                if let Some(c) = self.character_mut(id) {
                    c.roundtime = seconds.max(0.0);
                }
            }
            Actor::Mob(id) => {
                if let Some(m) = self.mob_mut(id) {
                    m.roundtime = seconds.max(0.0);
                }
            }
        }
    }

    pub fn actor_add_roundtime(&mut self, actor: Actor, seconds: f64) {
        match actor {
            Actor::Char(id) => {
                if let Some(c) = self.character_mut(id) {
                    c.roundtime += seconds.max(0.0);
                }
            }
            Actor::Mob(id) => {
                if let Some(m) = self.mob_mut(id) {
                    m.roundtime += seconds.max(0.0);
                }
            }
        }
    }

    pub fn actor_clear_hidden(&mut self, actor: Actor) {
        match actor {
            Actor::Char(id) => {
                if let Some(c) = self.character_mut(id) {
                    c.hidden = false;
                }
            }
            Actor::Mob(id) => {
                if let Some(m) = self.mob_mut(id) {
                    m.hidden = false;
                }
            }
        }
    }

    /// Send a line when the actor is a connected character; mobs drop it.
    pub fn send_to_actor(&self, actor: Actor, message: &str) {
        if let Actor::Char(id) = actor {
            self.send_to_char(id, message);
        }
    }
}
