use chrono::Duration;

use crate::ics::scan::ContentLine;

/// Parse a TRIGGER line into the offset before the appointment start.
///
/// Accepts `-P<n>W<n>D<n>H<n>M<n>S` with every component optional and an
/// optional `T` separator, so both `-P1D0H0M` and `-P1DT2H` work. Seconds
/// are accepted but do not move the reminder off its minute. Triggers that
/// are not "before start" (no leading `-`, `RELATED=END`, absolute
/// DATE-TIME values) yield `None`.
pub fn parse_trigger(line: &ContentLine) -> Option<Duration> {
    if line
        .param("RELATED")
        .is_some_and(|r| r.eq_ignore_ascii_case("END"))
        || line
            .param("VALUE")
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE-TIME"))
    {
        return None;
    }

    let rest = line.value.trim().strip_prefix('-')?.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut seen_component = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' if digits.is_empty() => {}
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                let part = match c {
                    'W' => Duration::try_weeks(n)?,
                    'D' => Duration::try_days(n)?,
                    'H' => Duration::try_hours(n)?,
                    'M' => Duration::try_minutes(n)?,
                    _ => Duration::zero(),
                };
                total = total.checked_add(&part)?;
                seen_component = true;
            }
            _ => return None,
        }
    }

    if !digits.is_empty() || !seen_component {
        return None;
    }

    Some(total)
}
