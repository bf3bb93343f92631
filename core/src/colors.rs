//! Inline color markup. Game text carries `{X` tokens (with `{x` as the
//! reset sentinel); this module is the thin renderer that maps them to ANSI
//! escapes just before transmission, and the scrubber that removes them for
//! logs and tests.

/// ANSI sequence for a markup code, `None` if the code is unknown.
fn ansi_for(code: char) -> Option<&'static str> {
    Some(match code {
        'x' => "\x1b[0m",
        // Plain foregrounds.
        'k' => "\x1b[0;30m",
        'R' => "\x1b[0;31m",
        'G' => "\x1b[0;32m",
        'Y' => "\x1b[0;33m",
        'B' => "\x1b[0;34m",
        'M' => "\x1b[0;35m",
        'C' => "\x1b[0;36m",
        'W' => "\x1b[0;37m",
        // Bright foregrounds.
        'K' => "\x1b[1;30m",
        'r' => "\x1b[1;31m",
        'g' => "\x1b[1;32m",
        'y' => "\x1b[1;33m",
        'b' => "\x1b[1;34m",
        'm' => "\x1b[1;35m",
        'c' => "\x1b[1;36m",
        'w' => "\x1b[1;37m",
        _ => return None,
    })
}

/// Replace `{X` markup with ANSI escapes. Unknown codes pass through
/// untouched so stray braces in ordinary prose survive.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '{' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some(code) => match ansi_for(code) {
                Some(seq) => {
                    chars.next();
                    out.push_str(seq);
                }
                None => out.push('{'),
            },
            None => out.push('{'),
        }
    }
    out
}

/// Strip all recognized markup codes without inserting escapes.
pub fn strip_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '{' {
            if let Some(code) = chars.peek().copied() {
                if ansi_for(code).is_some() {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_translates_known_codes() {
        let rendered = colorize("{RDanger{x ahead");
        assert_eq!(rendered, "\x1b[0;31mDanger\x1b[0m ahead");
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(colorize("set {1, 2}"), "set {1, 2}");
        assert_eq!(colorize("trailing {"), "trailing {");
    }

    #[test]
    fn strip_removes_markup_only() {
        assert_eq!(strip_codes("{g+15{x barrier"), "+15 barrier");
        assert_eq!(strip_codes("set {1, 2}"), "set {1, 2}");
    }

    #[test]
    fn strip_of_colorized_plain_text_is_identity() {
        let plain = "You miss the giant rat.";
        assert_eq!(strip_codes(plain), plain);
    }
}
