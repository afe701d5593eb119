use xxhash_rust::xxh3::xxh3_64;

use crate::ics::scan::ContentLine;

/// Checksum value of a calendar that has never been parsed successfully.
pub const NEVER_LOADED: u64 = 0;

/// Content checksum used to decide whether a re-fetched calendar changed.
///
/// Volatile lines (LAST-MODIFIED) are left out so a re-export that only
/// bumps those stamps keeps the same checksum. If nothing is left to hash,
/// the whole normalized document is hashed instead.
pub fn checksum(normalized: &str, lines: &[ContentLine]) -> u64 {
    let stable: Vec<&str> = lines
        .iter()
        .filter(|l| !l.key.is_volatile())
        .map(|l| l.raw.as_str())
        .collect();

    let sum = if stable.is_empty() {
        NEVER_LOADED
    } else {
        xxh3_64(stable.join("\n").as_bytes())
    };

    let sum = if sum == NEVER_LOADED {
        xxh3_64(normalized.as_bytes())
    } else {
        sum
    };

    // 0 stays reserved for "never loaded"
    sum.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::scan::{normalize, scan};

    fn sum_of(doc: &str) -> u64 {
        let text = normalize(doc);
        checksum(&text, &scan(&text))
    }

    #[test]
    fn ignores_last_modified() {
        let a = "BEGIN:VCALENDAR\nSUMMARY:A\nLAST-MODIFIED:20250101T000000Z\n";
        let b = "BEGIN:VCALENDAR\nSUMMARY:A\nLAST-MODIFIED:20250202T101010Z\n";
        assert_eq!(sum_of(a), sum_of(b));
    }

    #[test]
    fn ignores_line_endings() {
        assert_eq!(
            sum_of("BEGIN:VCALENDAR\r\nSUMMARY:A\r\n"),
            sum_of("BEGIN:VCALENDAR\nSUMMARY:A\n")
        );
    }

    #[test]
    fn content_changes_change_the_sum() {
        assert_ne!(
            sum_of("BEGIN:VCALENDAR\nSUMMARY:A\n"),
            sum_of("BEGIN:VCALENDAR\nSUMMARY:B\n")
        );
    }

    #[test]
    fn only_volatile_lines_falls_back_to_full_document() {
        let a = sum_of("LAST-MODIFIED:20250101T000000Z\n");
        let b = sum_of("LAST-MODIFIED:20250202T000000Z\n");
        assert_ne!(a, NEVER_LOADED);
        assert_ne!(a, b);
    }
}
