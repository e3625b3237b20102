/*
harvest: Generate a changes report and a release announcement from issue trackers.
Copyright (C) 2022  Marek Suchánek  <msuchane@redhat.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Ordering of free-form project versions, such as `1.0.0-alpha`, `3.0`, or `4`.
//!
//! Trackers don't enforce semantic versioning, so the versions are compared
//! item by item, the way Java build tools order artifact versions.

use std::cmp::Ordering;

/// The suffix that marks a version under development.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Remove the `-SNAPSHOT` suffix from the end of a version, if it's there.
pub fn strip_snapshot(version: &str) -> &str {
    version.strip_suffix(SNAPSHOT_SUFFIX).unwrap_or(version)
}

#[derive(Debug, PartialEq, Eq)]
enum Item {
    Number(u64),
    Qualifier(String),
}

/// Qualifiers that sort in a known order. Unknown qualifiers sort after all of them.
const KNOWN_QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];

fn qualifier_rank(qualifier: &str) -> (usize, &str) {
    let normalized = match qualifier {
        "a" => "alpha",
        "b" => "beta",
        "m" => "milestone",
        "cr" => "rc",
        "ga" | "final" | "release" => "",
        other => other,
    };

    match KNOWN_QUALIFIERS.iter().position(|q| *q == normalized) {
        Some(position) => (position, ""),
        None => (KNOWN_QUALIFIERS.len(), normalized),
    }
}

/// Split a version into numeric and textual items.
/// Separators are `.` and `-`, as well as every switch between digits and letters.
fn items(version: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, items: &mut Vec<Item>| {
        if current.is_empty() {
            return;
        }
        let item = match current.parse::<u64>() {
            Ok(number) => Item::Number(number),
            Err(_) => Item::Qualifier(current.to_lowercase()),
        };
        items.push(item);
        current.clear();
    };

    for c in version.trim().chars() {
        if c == '.' || c == '-' || c == '_' {
            flush(&mut current, &mut items);
            continue;
        }
        let switches_kind = current
            .chars()
            .last()
            .map_or(false, |last| last.is_ascii_digit() != c.is_ascii_digit());
        if switches_kind {
            flush(&mut current, &mut items);
        }
        current.push(c);
    }
    flush(&mut current, &mut items);

    items
}

fn compare_items(left: Option<&Item>, right: Option<&Item>) -> Ordering {
    match (left, right) {
        (Some(Item::Number(l)), Some(Item::Number(r))) => l.cmp(r),
        // A number is always newer than a qualifier: 1.0.1 > 1.0-beta
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(l)), Some(Item::Qualifier(r))) => {
            qualifier_rank(l).cmp(&qualifier_rank(r))
        }
        // A missing item acts as `0` against numbers and as a plain release against qualifiers.
        (Some(Item::Number(l)), None) => l.cmp(&0),
        (None, Some(Item::Number(r))) => 0.cmp(r),
        (Some(Item::Qualifier(l)), None) => qualifier_rank(l).cmp(&qualifier_rank("")),
        (None, Some(Item::Qualifier(r))) => qualifier_rank("").cmp(&qualifier_rank(r)),
        (None, None) => Ordering::Equal,
    }
}

/// Compare two versions. `1.0` and `1` are equal; `1.0-alpha` is older than `1.0`.
pub fn compare(left: &str, right: &str) -> Ordering {
    let left = items(left);
    let right = items(right);
    let length = left.len().max(right.len());

    (0..length)
        .map(|index| compare_items(left.get(index), right.get(index)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_items_compare_as_numbers() {
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("4", "3.0"), Ordering::Greater);
        assert_eq!(compare("1.0", "1"), Ordering::Equal);
        assert_eq!(compare("0.1.1", "1.0.0-alpha"), Ordering::Less);
    }

    #[test]
    fn qualifiers_precede_the_release() {
        assert_eq!(compare("1.0-alpha", "1.0"), Ordering::Less);
        assert_eq!(compare("1.0-alpha-2", "1.0-beta-1"), Ordering::Less);
        assert_eq!(compare("1.0-RC1", "1.0-beta"), Ordering::Greater);
        assert_eq!(compare("1.0-SNAPSHOT", "1.0"), Ordering::Less);
        assert_eq!(compare("1.0-sp1", "1.0"), Ordering::Greater);
        assert_eq!(compare("1.0-final", "1.0"), Ordering::Equal);
    }

    #[test]
    fn snapshot_suffix_is_stripped() {
        assert_eq!(strip_snapshot("2.1-SNAPSHOT"), "2.1");
        assert_eq!(strip_snapshot("2.1"), "2.1");
    }
}
