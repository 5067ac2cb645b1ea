//! Station name cleanup.
//!
//! Feed stop names describe platforms ("Embarcadero Platform 2", "Main St
//! Northbound"). [`NameCleaner`] turns them back into the name of the station.

use regex::Regex;

/// Turns a raw stop label into a human station name.
///
/// Implementations must be pure: the same inputs always give the same name.
/// Deduplication only cleans the platform that creates a station and skips
/// the duplicates. Implementations must not depend on geometry or operator
/// identity beyond the operator's display name.
pub trait NameCleaner {
    fn clean(&self, raw_name: &str, operator_name: &str) -> String;
}

impl<F> NameCleaner for F
where
    F: Fn(&str, &str) -> String,
{
    fn clean(&self, raw_name: &str, operator_name: &str) -> String {
        self(raw_name, operator_name)
    }
}

/// Default cleaner that strips direction, platform and transfer suffixes and
/// a trailing operator name.
pub struct StandardNameCleaner {
    suffix: Regex,
    whitespace: Regex,
}

impl StandardNameCleaner {
    pub fn new() -> Self {
        // Anchored at the end; applied repeatedly so stacked suffixes
        // ("Main St Platform 2 Northbound") all come off.
        let suffix = Regex::new(
            r"(?ix)
            [\s,/-]*
            (?:
                \(?\b(?:north|south|east|west|in|out)bound\b\)?
              | \(?\b(?-i:NB|SB|EB|WB)\b\)?
              | \b(?:platform|track|bay|gate)\s*(?:\d+[a-z]?|[a-z]\d*)
              | \(transfer\)
              | \btransfer\s+point
            )
            \s*$",
        )
        .expect("suffix pattern is valid");
        let whitespace = Regex::new(r"\s+").expect("whitespace pattern is valid");

        Self { suffix, whitespace }
    }

    fn strip_operator<'a>(name: &'a str, operator_name: &str) -> &'a str {
        let operator_name = operator_name.trim();
        if operator_name.is_empty() {
            return name;
        }

        let parenthesized = format!("({operator_name})");
        for suffix in [parenthesized.as_str(), operator_name] {
            if let Some(raw_head) = strip_suffix_ignore_ascii_case(name, suffix) {
                let separated = suffix.starts_with('(')
                    || raw_head.ends_with(|c: char| c.is_whitespace() || c == '-');
                let head = raw_head.trim_end_matches(|c: char| c.is_whitespace() || c == '-');
                // "BART" on its own stays "BART".
                if separated && !head.is_empty() {
                    return head;
                }
            }
        }
        name
    }
}

impl Default for StandardNameCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCleaner for StandardNameCleaner {
    fn clean(&self, raw_name: &str, operator_name: &str) -> String {
        let collapsed = self.whitespace.replace_all(raw_name.trim(), " ");
        let mut name: &str = &collapsed;

        loop {
            let before = name.len();
            if let Some(m) = self.suffix.find(name) {
                if m.start() > 0 {
                    name = name[..m.start()].trim_end();
                }
            }
            name = Self::strip_operator(name, operator_name);
            if name.len() == before {
                break;
            }
        }

        if name.is_empty() {
            collapsed.into_owned()
        } else {
            name.to_string()
        }
    }
}

fn strip_suffix_ignore_ascii_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() < suffix.len() {
        return None;
    }
    let split = s.len() - suffix.len();
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Display name for a multi-operator hub seeded by a station named `seed_name`.
pub fn hub_name(seed_name: &str) -> String {
    let base = seed_name.trim();
    let base = strip_suffix_ignore_ascii_case(base, "station")
        .filter(|head| head.is_empty() || head.ends_with(char::is_whitespace))
        .map(str::trim_end)
        .unwrap_or(base);
    if base.is_empty() {
        "Transit Center".to_string()
    } else {
        format!("{base} Transit Center")
    }
}
