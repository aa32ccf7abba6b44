use depot_fs::{FailedByPolicy, Removal};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Truncate a string to `max_chars` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Byte count rendered with a binary unit, e.g. `1.5 MiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Deletion result keyed by policy id string, sorted for stable output.
pub fn failures_report(failed: &FailedByPolicy) -> BTreeMap<String, Vec<String>> {
    failed
        .iter()
        .map(|(policy_id, locators)| (policy_id.to_string(), locators.clone()))
        .collect()
}

/// What `depot delete` prints.
#[derive(Debug, Serialize)]
pub struct RemovalReport {
    pub removed: Vec<Uuid>,
    pub failed: BTreeMap<String, Vec<String>>,
}

pub fn removal_report(removal: &Removal) -> RemovalReport {
    RemovalReport {
        removed: removal.removed.clone(),
        failed: failures_report(&removal.failed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_string_keeps_short_input() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn truncate_string_counts_characters() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("ééééé", 4), "é...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(2 << 20), "2.0 MiB");
    }

    #[test]
    fn failures_report_is_sorted_by_policy() {
        let (a, b) = (Uuid::from_u128(2), Uuid::from_u128(1));
        let failed: FailedByPolicy = [(a, vec!["x".to_string()]), (b, Vec::new())]
            .into_iter()
            .collect();

        let report = failures_report(&failed);
        let keys: Vec<&String> = report.keys().collect();
        assert_eq!(keys, vec![&b.to_string(), &a.to_string()]);
    }

    #[test]
    fn removal_report_lists_removed_and_failed() {
        let policy = Uuid::from_u128(7);
        let removal = Removal {
            removed: vec![Uuid::from_u128(1)],
            failed: [(policy, vec!["u/b.bin".to_string()])].into_iter().collect(),
        };

        let json = serde_json::to_value(removal_report(&removal)).unwrap();
        assert_eq!(json["removed"][0], Uuid::from_u128(1).to_string());
        assert_eq!(json["failed"][policy.to_string()][0], "u/b.bin");
    }
}
