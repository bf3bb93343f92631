//! Small text-formatting helpers shared by command output.

/// Format a talon total as Crowns / Orbs / Shards / Talons
/// (1 Crown = 10 Orbs = 100 Shards = 1000 Talons).
pub fn format_coinage(total_talons: i64) -> String {
    if total_talons < 0 {
        return "{rInvalid Amount{x".to_string();
    }
    if total_talons == 0 {
        return "0 Talons".to_string();
    }

    let talons = total_talons % 10;
    let total_shards = total_talons / 10;
    let shards = total_shards % 10;
    let total_orbs = total_shards / 10;
    let orbs = total_orbs % 10;
    let crowns = total_orbs / 10;

    let mut parts = Vec::new();
    for (count, singular, plural) in [
        (crowns, "Crown", "Crowns"),
        (orbs, "Orb", "Orbs"),
        (shards, "Shard", "Shards"),
        (talons, "Talon", "Talons"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {}", if count == 1 { singular } else { plural }));
        }
    }
    parts.join(", ")
}

/// "an" before vowel sounds, "a" otherwise.
pub fn article(word: &str) -> &'static str {
    match word.chars().next() {
        Some(c) if "aeiouAEIOU".contains(c) => "an",
        _ => "a",
    }
}

/// Remove a leading "a " or "an " from an item name.
pub fn strip_article(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("a ") {
        &name[2..]
    } else if lower.starts_with("an ") {
        &name[3..]
    } else {
        name
    }
}

/// Capitalize the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Descriptive string for an item's condition level (0..=100).
pub fn condition_desc(condition: i64) -> &'static str {
    match condition {
        c if c >= 100 => "It is in perfect condition.",
        c if c >= 90 => "It shows signs of light use.",
        c if c >= 70 => "It is moderately worn.",
        c if c >= 50 => "It is heavily worn and battered.",
        c if c >= 30 => "It is in poor condition, with visible wear and tear.",
        c if c >= 10 => "It is on the verge of disrepair.",
        c if c >= 1 => "It looks like it could fall apart at any moment.",
        _ => "It is completely broken.",
    }
}

/// Health summary shown when looking at someone, keyed off an HP percentage.
pub fn health_phrase(percent: f64) -> &'static str {
    match percent {
        p if p >= 100.0 => "is in perfect health",
        p if p >= 90.0 => "has a few scratches",
        p if p >= 70.0 => "has some minor wounds",
        p if p >= 50.0 => "is noticeably injured",
        p if p >= 30.0 => "is bleeding and badly wounded",
        p if p >= 10.0 => "is in critical condition",
        _ => "is on the verge of death",
    }
}

/// Compact "1d 4h 12m" rendering of a playtime total.
pub fn format_playtime(total_seconds: i64) -> String {
    if total_seconds < 60 {
        return format!("{total_seconds}s");
    }
    let minutes = total_seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours % 24 > 0 {
        parts.push(format!("{}h", hours % 24));
    }
    if minutes % 60 > 0 {
        parts.push(format!("{}m", minutes % 60));
    }
    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinage_denominations() {
        assert_eq!(format_coinage(0), "0 Talons");
        assert_eq!(format_coinage(7), "7 Talons");
        assert_eq!(format_coinage(10), "1 Shard");
        assert_eq!(format_coinage(1234), "1 Crown, 2 Orbs, 3 Shards, 4 Talons");
        assert_eq!(format_coinage(1000), "1 Crown");
    }

    #[test]
    fn articles() {
        assert_eq!(article("apple"), "an");
        assert_eq!(article("sword"), "a");
        assert_eq!(article(""), "a");
    }

    #[test]
    fn strip_article_variants() {
        assert_eq!(strip_article("a rusty sword"), "rusty sword");
        assert_eq!(strip_article("an apple"), "apple");
        assert_eq!(strip_article("the crown"), "the crown");
    }

    #[test]
    fn playtime_rendering() {
        assert_eq!(format_playtime(42), "42s");
        assert_eq!(format_playtime(60), "1m");
        assert_eq!(format_playtime(3 * 86_400 + 2 * 3600 + 60), "3d 2h 1m");
    }
}
