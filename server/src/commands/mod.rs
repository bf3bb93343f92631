//! Command dispatch: parse a raw line into verb and arguments, run the
//! pre-action gates in order, and route to a handler. Handlers return
//! `true` to keep the session alive; only `quit` returns `false`.

pub mod admin;
pub mod combat;
pub mod general;
pub mod item;
pub mod movement;
pub mod rogue;
pub mod skill;
pub mod social;
pub mod trade;

use ashenmoor_core::direction::Direction;
use ashenmoor_core::types::Status;

use crate::world::World;
use crate::CharacterId;

/// Split raw input into a lowercase verb and the untouched argument tail.
pub fn parse_input(raw: &str) -> (String, String) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (String::new(), String::new());
    }
    match trimmed.split_once(' ') {
        Some((verb, rest)) => (verb.to_ascii_lowercase(), rest.trim().to_string()),
        None => (trimmed.to_ascii_lowercase(), String::new()),
    }
}

/// Commands a meditating character may run without breaking trance.
const MEDITATION_ALLOWED: &[&str] = &["look", "l", "score", "stats", "skills", "quit", "help", "who", "tell"];

/// Process one line for a playing character. Returns false when the session
/// should end.
pub async fn dispatch(world: &mut World, cn: CharacterId, raw: &str) -> bool {
    let (verb, args) = parse_input(raw);
    if verb.is_empty() {
        return true;
    }

    let Some(character) = world.character(cn) else {
        log::error!("Dispatch for unknown character {cn}");
        return false;
    };
    let status = character.status;
    let roundtime = character.roundtime;
    let is_admin = character.is_admin;
    let name = character.name.clone();

    // Gates, in contract order.
    if status == Status::Dying && verb != "quit" {
        world.send_to_char(cn, "You are dying and cannot act!");
        return true;
    }
    if status == Status::Dead && verb != "quit" && verb != "release" {
        world.send_to_char(cn, "You are dead and cannot do that. (Type 'release' to let go.)");
        return true;
    }
    if status == Status::Meditating && !MEDITATION_ALLOWED.contains(&verb.as_str()) {
        if let Some(c) = world.character_mut(cn) {
            c.status = Status::Alive;
        }
        world.send_to_char(cn, "You stop meditating as you act.");
    }

    if verb.starts_with('@') && !is_admin {
        world.send_to_char(cn, "Huh? (Type 'help' for available commands.)");
        return true;
    }
    if roundtime > 0.0 && !verb.starts_with('@') {
        world.send_to_char(cn, &format!("You are still recovering for {roundtime:.1} seconds."));
        return true;
    }

    log::debug!("Executing {verb:?} for {name} (args: {args:?})");

    // Directional verbs are a closed set bound to the move handler.
    if let Some(direction) = Direction::parse(&verb) {
        return movement::cmd_move(world, cn, direction).await;
    }

    match verb.as_str() {
        "look" | "l" => general::cmd_look(world, cn, &args).await,
        "say" | "'" => general::cmd_say(world, cn, &args).await,
        "tell" => general::cmd_tell(world, cn, &args).await,
        "emote" | ":" => general::cmd_emote(world, cn, &args).await,
        "who" => general::cmd_who(world, cn, &args).await,
        "help" => general::cmd_help(world, cn, &args).await,
        "score" | "stats" => general::cmd_score(world, cn, &args).await,
        "skills" => general::cmd_skills(world, cn, &args).await,
        "quit" => general::cmd_quit(world, cn, &args).await,
        "meditate" => general::cmd_meditate(world, cn, &args).await,
        "sit" => general::cmd_sit(world, cn, &args).await,
        "stand" => general::cmd_stand(world, cn, &args).await,
        "lie" => general::cmd_lie(world, cn, &args).await,
        "release" => general::cmd_release(world, cn, &args).await,

        "go" => movement::cmd_go(world, cn, &args).await,

        "attack" | "a" | "kill" => combat::cmd_attack(world, cn, &args).await,
        "cast" => combat::cmd_cast(world, cn, &args).await,
        "use" => combat::cmd_use(world, cn, &args).await,

        "inventory" | "inv" | "i" => item::cmd_inventory(world, cn, &args).await,
        "get" | "take" => item::cmd_get(world, cn, &args).await,
        "drop" => item::cmd_drop(world, cn, &args).await,
        "put" => item::cmd_put(world, cn, &args).await,
        "wear" | "wield" => item::cmd_wear(world, cn, &args).await,
        "remove" | "rem" => item::cmd_remove(world, cn, &args).await,
        "examine" | "exa" => item::cmd_examine(world, cn, &args).await,
        "open" => item::cmd_open(world, cn, &args).await,
        "close" => item::cmd_close(world, cn, &args).await,
        "lock" => item::cmd_lock(world, cn, &args).await,
        "unlock" => item::cmd_unlock(world, cn, &args).await,
        "eat" => item::cmd_eat(world, cn, &args).await,
        "drink" | "quaff" => item::cmd_drink(world, cn, &args).await,
        "repair" => item::cmd_repair(world, cn, &args).await,

        "list" => trade::cmd_list(world, cn, &args).await,
        "buy" => trade::cmd_buy(world, cn, &args).await,
        "sell" => trade::cmd_sell(world, cn, &args).await,
        "give" => trade::cmd_give(world, cn, &args).await,
        "accept" => trade::cmd_accept(world, cn, &args).await,
        "decline" => trade::cmd_decline(world, cn, &args).await,
        "balance" => trade::cmd_balance(world, cn, &args).await,
        "deposit" => trade::cmd_deposit(world, cn, &args).await,
        "withdraw" => trade::cmd_withdraw(world, cn, &args).await,

        "group" => social::cmd_group(world, cn, &args).await,
        "disband" => social::cmd_disband(world, cn, &args).await,
        "kick" => social::cmd_kick(world, cn, &args).await,
        "leave" => social::cmd_leave(world, cn, &args).await,

        "spend" | "invest" => skill::cmd_spend(world, cn, &args).await,
        "improve" => skill::cmd_improve(world, cn, &args).await,
        "advance" | "level" => skill::cmd_advance(world, cn, &args).await,

        "hide" => rogue::cmd_hide(world, cn, &args).await,
        "search" => rogue::cmd_search(world, cn, &args).await,
        "disarm" => rogue::cmd_disarm(world, cn, &args).await,

        "@teleport" => admin::cmd_teleport(world, cn, &args).await,
        "@examine" => admin::cmd_examine(world, cn, &args).await,
        "@setstat" => admin::cmd_setstat(world, cn, &args).await,
        "@roomstat" => admin::cmd_roomstat(world, cn, &args).await,

        _ => {
            world.send_to_char(cn, "Huh? (Type 'help' for available commands.)");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use ashenmoor_core::types::Stance;

    #[test]
    fn parse_splits_verb_and_args() {
        assert_eq!(parse_input("look"), ("look".into(), "".into()));
        assert_eq!(parse_input("  ATTACK giant rat  "), ("attack".into(), "giant rat".into()));
        assert_eq!(parse_input(""), ("".into(), "".into()));
        assert_eq!(parse_input("   "), ("".into(), "".into()));
    }

    #[tokio::test]
    async fn dying_characters_can_only_quit() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().status = Status::Dying;
        world.character_mut(1).unwrap().hp = 0.0;

        assert!(dispatch(&mut world, 1, "look").await);
        // Still dying, nothing changed.
        assert_eq!(world.character(1).unwrap().status, Status::Dying);
        assert!(!dispatch(&mut world, 1, "quit").await);
    }

    #[tokio::test]
    async fn dead_characters_may_release() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.status = Status::Dead;
            c.hp = 0.0;
            c.spiritual_tether = 5;
        }

        assert!(dispatch(&mut world, 1, "north").await);
        assert_eq!(world.character(1).unwrap().status, Status::Dead);

        assert!(dispatch(&mut world, 1, "release").await);
        let c = world.character(1).unwrap();
        assert_eq!(c.status, Status::Alive);
        assert_eq!(c.location_id, 1);
        assert_eq!(c.hp, c.max_hp);
        assert_eq!(c.spiritual_tether, 4, "release costs a tether point");
    }

    #[tokio::test]
    async fn meditation_breaks_on_disallowed_commands() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().status = Status::Meditating;

        // Allowed command leaves the trance alone.
        assert!(dispatch(&mut world, 1, "score").await);
        assert_eq!(world.character(1).unwrap().status, Status::Meditating);

        // Anything else snaps out first, then executes.
        assert!(dispatch(&mut world, 1, "sit").await);
        let c = world.character(1).unwrap();
        assert_eq!(c.status, Status::Alive);
        assert_eq!(c.stance, Stance::Sitting);
    }

    #[tokio::test]
    async fn roundtime_blocks_commands_but_not_admin_verbs() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().roundtime = 3.0;

        assert!(dispatch(&mut world, 1, "sit").await);
        assert_eq!(world.character(1).unwrap().stance, Stance::Standing, "blocked by roundtime");

        world.character_mut(1).unwrap().is_admin = true;
        assert!(dispatch(&mut world, 1, "@roomstat").await);
    }

    #[tokio::test]
    async fn admin_verbs_read_as_unknown_for_mortals() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        // Not a permission error: the verb simply does not exist for them.
        assert!(dispatch(&mut world, 1, "@teleport 2").await);
        assert_eq!(world.character(1).unwrap().location_id, 1);
    }

    #[tokio::test]
    async fn unknown_verbs_keep_the_session() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        assert!(dispatch(&mut world, 1, "frobnicate the widget").await);
    }
}
