//! Change detection between two snapshots of the same resource.
//!
//! Checks, in order:
//! 1. status code differs → changed
//! 2. both content types present and different → changed
//! 3. content present on one side only → changed
//! 4. content compared as sorted lists (order-insensitive, duplicate-count-sensitive)
//!
//! Only additions are reported: items of `current` missing from `previous`.

use serde::{Deserialize, Serialize};

use crate::models::Snapshot;

/// Outcome of comparing a fresh snapshot against the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Unchanged,
    Changed { added: Vec<String> },
}

impl Verdict {
    pub fn is_changed(&self) -> bool {
        matches!(self, Verdict::Changed { .. })
    }
}

/// Compare `current` against `previous`.
pub fn compare(previous: &Snapshot, current: &Snapshot) -> Verdict {
    if is_same(previous, current) {
        Verdict::Unchanged
    } else {
        Verdict::Changed {
            added: added_items(previous.content.as_deref(), current.content.as_deref()),
        }
    }
}

/// Symmetric equality check used for the verdict.
pub fn is_same(a: &Snapshot, b: &Snapshot) -> bool {
    if a.status_code != b.status_code {
        return false;
    }
    if let (Some(a_type), Some(b_type)) = (&a.content_type, &b.content_type) {
        if a_type != b_type {
            return false;
        }
    }
    match (&a.content, &b.content) {
        (None, None) => true,
        (Some(a_items), Some(b_items)) => same_items(a_items, b_items),
        _ => false,
    }
}

fn same_items(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Items of `current` that do not occur anywhere in `previous`.
///
/// Repeated new items are reported once per occurrence, in `current` order.
pub fn added_items(previous: Option<&[String]>, current: Option<&[String]>) -> Vec<String> {
    let previous = previous.unwrap_or_default();
    current
        .unwrap_or_default()
        .iter()
        .filter(|item| !previous.contains(item))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snap(status: u16, content_type: Option<&str>, content: Option<&[&str]>) -> Snapshot {
        Snapshot::new(
            "http://example.com",
            content.map(|items| items.iter().map(|s| s.to_string()).collect()),
            content_type.map(str::to_string),
            status,
            Utc.timestamp_opt(0, 0).unwrap(),
        )
    }

    fn html(items: &[&str]) -> Snapshot {
        snap(200, Some("text/html"), Some(items))
    }

    #[test]
    fn test_reordered_content_unchanged() {
        let verdict = compare(&html(&["A", "B"]), &html(&["B", "A"]));
        assert_eq!(verdict, Verdict::Unchanged);
    }

    #[test]
    fn test_addition_reported() {
        let verdict = compare(&html(&["A"]), &html(&["A", "B"]));
        assert_eq!(
            verdict,
            Verdict::Changed {
                added: vec!["B".into()]
            }
        );
    }

    #[test]
    fn test_status_change_with_same_content() {
        let previous = snap(200, Some("text/html"), Some(&["A"]));
        let current = snap(404, Some("text/html"), Some(&["A"]));
        assert_eq!(
            compare(&previous, &current),
            Verdict::Changed { added: vec![] }
        );
    }

    #[test]
    fn test_content_type_change() {
        let previous = snap(200, Some("text/html"), Some(&["A"]));
        let current = snap(200, Some("application/xhtml+xml"), Some(&["A"]));
        assert!(compare(&previous, &current).is_changed());
    }

    #[test]
    fn test_one_sided_null_content_type_ignored() {
        let previous = snap(200, None, Some(&["A", "B"]));
        let current = snap(200, Some("text/html"), Some(&["B", "A"]));
        assert_eq!(compare(&previous, &current), Verdict::Unchanged);
        assert_eq!(compare(&current, &previous), Verdict::Unchanged);
    }

    #[test]
    fn test_one_sided_null_content_changed() {
        let previous = snap(200, Some("text/html"), None);
        let current = html(&["A"]);
        assert_eq!(
            compare(&previous, &current),
            Verdict::Changed {
                added: vec!["A".into()]
            }
        );
        assert_eq!(
            compare(&current, &previous),
            Verdict::Changed { added: vec![] }
        );
    }

    #[test]
    fn test_both_null_content_unchanged() {
        let a = snap(200, Some("application/json"), None);
        let b = snap(200, Some("application/json"), None);
        assert_eq!(compare(&a, &b), Verdict::Unchanged);
    }

    #[test]
    fn test_duplicate_counts_matter() {
        // Same set, different multiplicity
        let verdict = compare(&html(&["A", "A", "B"]), &html(&["A", "B", "B"]));
        assert_eq!(verdict, Verdict::Changed { added: vec![] });
    }

    #[test]
    fn test_removal_only_reports_nothing_added() {
        let verdict = compare(&html(&["A", "B", "C"]), &html(&["A"]));
        assert_eq!(verdict, Verdict::Changed { added: vec![] });
    }

    #[test]
    fn test_repeated_new_item_reported_per_occurrence() {
        let verdict = compare(&html(&["A"]), &html(&["C", "A", "C"]));
        assert_eq!(
            verdict,
            Verdict::Changed {
                added: vec!["C".into(), "C".into()]
            }
        );
    }

    #[test]
    fn test_verdict_symmetric_added_items_not() {
        let pairs = [
            (html(&["A"]), html(&["A", "B"])),
            (html(&["A", "B"]), html(&["B", "A"])),
            (snap(200, None, Some(&["A"])), snap(500, None, Some(&["A"]))),
            (snap(200, None, None), html(&["X"])),
            (html(&["A", "A"]), html(&["A"])),
        ];

        for (a, b) in &pairs {
            assert_eq!(
                compare(a, b).is_changed(),
                compare(b, a).is_changed(),
                "verdict must not depend on argument order"
            );
        }

        assert_eq!(
            compare(&pairs[0].0, &pairs[0].1),
            Verdict::Changed {
                added: vec!["B".into()]
            }
        );
        assert_eq!(
            compare(&pairs[0].1, &pairs[0].0),
            Verdict::Changed { added: vec![] }
        );
    }

    #[test]
    fn test_empty_to_full() {
        let verdict = compare(&html(&[]), &html(&["First"]));
        assert_eq!(
            verdict,
            Verdict::Changed {
                added: vec!["First".into()]
            }
        );
    }
}
