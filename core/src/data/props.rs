//! Properties codec for the persisted inventory.
//!
//! The inventory file is a flat `key=value` properties document:
//!
//! ```text
//! # managed files
//! app.conf=http://repo/app.conf
//! legacy.txt=unknown
//! ```
//!
//! Parsing accepts `=` or `:` as separator with optional surrounding
//! whitespace, skips blank lines and `#`/`!` comments, and honours
//! backslash escapes. Rendering always writes `key=value` lines sorted by
//! key, escaping separators and leading whitespace so that every name
//! round-trips. Line continuations are not supported.

use std::collections::BTreeMap;

/// Parse a properties document. Later duplicates of a key win.
pub fn parse(content: &str) -> Result<BTreeMap<String, String>, String> {
    let mut out = BTreeMap::new();

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim_start();

        // Skip blank lines and comments
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let (raw_key, raw_value) = split_entry(line);
        let key = unescape(trim_key_end(raw_key))
            .map_err(|e| format!("line {}: {}", idx + 1, e))?;
        if key.is_empty() {
            return Err(format!("line {}: empty key", idx + 1));
        }
        let value = unescape(raw_value.trim_start())
            .map_err(|e| format!("line {}: {}", idx + 1, e))?;
        out.insert(key, value);
    }

    Ok(out)
}

/// Render entries as a properties document, one `key=value` per line.
pub fn render(entries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

/// Split at the first unescaped `=` or `:`. A line without separator is a
/// key with an empty value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], &line[i + 1..]),
            _ => {}
        }
    }
    (line, "")
}

/// Drop the whitespace between key and separator, but not whitespace that
/// an odd run of backslashes escapes.
fn trim_key_end(raw: &str) -> &str {
    let trimmed = raw.trim_end();
    let backslashes = trimmed.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 0 {
        return trimmed;
    }
    let escaped = raw[trimmed.len()..].chars().next().map_or(0, char::len_utf8);
    &raw[..trimmed.len() + escaped]
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => return Err("dangling escape at end of line".to_string()),
        }
    }
    Ok(out)
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '#' | '!' if is_key && i == 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_simple_entries() {
        let text = "f1=http://x/f1\nf2 = http://x/f2\nf3:unknown\n";
        let parsed = parse(text).unwrap();
        assert_eq!(
            parsed,
            map(&[("f1", "http://x/f1"), ("f2", "http://x/f2"), ("f3", "unknown")])
        );
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let text = "# header\n\n! bang comment\n   \nf1=a\n";
        assert_eq!(parse(text).unwrap(), map(&[("f1", "a")]));
    }

    #[test]
    fn value_keeps_later_separators() {
        // Only the first separator splits; URLs keep their colons.
        let parsed = parse("f1=https://host:8080/path?a=b\n").unwrap();
        assert_eq!(parsed["f1"], "https://host:8080/path?a=b");
    }

    #[test]
    fn key_without_value() {
        assert_eq!(parse("lonely\n").unwrap(), map(&[("lonely", "")]));
    }

    #[test]
    fn later_duplicate_wins() {
        assert_eq!(parse("f1=a\nf1=b\n").unwrap(), map(&[("f1", "b")]));
    }

    #[test]
    fn escaped_key_characters() {
        let parsed = parse("my\\ file\\=v1.txt=x\n").unwrap();
        assert_eq!(parsed, map(&[("my file=v1.txt", "x")]));
    }

    #[test]
    fn escaped_trailing_space_stays_in_key() {
        let parsed = parse("notes\\  = a\nplain  = b\n").unwrap();
        assert_eq!(parsed, map(&[("notes ", "a"), ("plain", "b")]));
    }

    #[test]
    fn dangling_escape_is_error() {
        let err = parse("f1=abc\\").unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn render_sorted_lines() {
        let text = render(&map(&[("b", "2"), ("a", "1")]));
        assert_eq!(text, "a=1\nb=2\n");
    }

    #[test]
    fn render_empty() {
        assert_eq!(render(&BTreeMap::new()), "");
    }

    #[test]
    fn awkward_names_survive_rewrite() {
        let entries = map(&[
            ("with space.txt", "http://x/a b"),
            ("a=b:c", "v"),
            ("#hash", " leading"),
            ("back\\slash", "tab\there"),
            ("notes ", "unknown"),
            ("two  ", "x"),
            ("ends\\", "y"),
        ]);
        assert_eq!(parse(&render(&entries)).unwrap(), entries);
    }
}
