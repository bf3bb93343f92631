//! Compass directions. The set of directional movement verbs is closed and
//! fixed; named exits ("portal", "hole") go through `go <name>` instead.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
    ];

    /// Long token, the key used in a room's exits table.
    pub fn key(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Northeast => "northeast",
            Direction::Northwest => "northwest",
            Direction::Southeast => "southeast",
            Direction::Southwest => "southwest",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::South => "s",
            Direction::East => "e",
            Direction::West => "w",
            Direction::Up => "u",
            Direction::Down => "d",
            Direction::Northeast => "ne",
            Direction::Northwest => "nw",
            Direction::Southeast => "se",
            Direction::Southwest => "sw",
        }
    }

    /// Accepts both long and short tokens.
    pub fn parse(token: &str) -> Option<Direction> {
        let t = token.trim().to_ascii_lowercase();
        Direction::ALL
            .iter()
            .copied()
            .find(|d| d.key() == t || d.short() == t)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Northeast => Direction::Southwest,
            Direction::Northwest => Direction::Southeast,
            Direction::Southeast => Direction::Northwest,
            Direction::Southwest => Direction::Northeast,
        }
    }
}

/// "leaves north" for compass exits, "leaves through the portal" for named
/// ones.
pub fn departure_phrase(exit_name: &str) -> String {
    match Direction::parse(exit_name) {
        Some(dir) => format!("leaves {}", dir.key()),
        None => format!("leaves through the {}", exit_name.to_ascii_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_token_forms() {
        assert_eq!(Direction::parse("ne"), Some(Direction::Northeast));
        assert_eq!(Direction::parse("northeast"), Some(Direction::Northeast));
        assert_eq!(Direction::parse("N"), Some(Direction::North));
        assert_eq!(Direction::parse("portal"), None);
    }

    #[test]
    fn opposites_are_involutions() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn departure_phrases() {
        assert_eq!(departure_phrase("north"), "leaves north");
        assert_eq!(departure_phrase("sw"), "leaves southwest");
        assert_eq!(departure_phrase("portal"), "leaves through the portal");
    }
}
