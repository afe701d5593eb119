//! Line-oriented scanner for the ICS subset.
//!
//! Turns a document into unfolded content lines, each split into a
//! property key, its parameters and its value.

/// The properties icswatch cares about. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Begin,
    End,
    CalendarName,
    DtStart,
    DtEnd,
    Summary,
    Trigger,
    LastModified,
    Other,
}

impl FieldKey {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "BEGIN" => FieldKey::Begin,
            "END" => FieldKey::End,
            "X-WR-CALNAME" => FieldKey::CalendarName,
            "DTSTART" => FieldKey::DtStart,
            "DTEND" => FieldKey::DtEnd,
            "SUMMARY" => FieldKey::Summary,
            "TRIGGER" => FieldKey::Trigger,
            "LAST-MODIFIED" => FieldKey::LastModified,
            _ => FieldKey::Other,
        }
    }

    /// Fields whose value changes on every export without the calendar
    /// content changing.
    pub fn is_volatile(&self) -> bool {
        matches!(self, FieldKey::LastModified)
    }
}

/// One unfolded line of an ICS document.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentLine {
    pub key: FieldKey,
    pub params: Vec<(String, String)>,
    pub value: String,
    /// The unfolded line as it appeared in the document.
    pub raw: String,
}

impl ContentLine {
    pub fn parse(raw: &str) -> Self {
        let (name_part, value) = match split_at_value(raw) {
            Some(i) => (&raw[..i], &raw[i + 1..]),
            None => (raw, ""),
        };

        let mut parts = name_part.split(';');
        let key = FieldKey::from_name(parts.next().unwrap_or_default().trim());
        let params = parts
            .filter_map(|p| {
                let (k, v) = p.split_once('=')?;
                Some((k.trim().to_ascii_uppercase(), v.trim_matches('"').to_string()))
            })
            .collect();

        ContentLine {
            key,
            params,
            value: value.to_string(),
            raw: raw.to_string(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `BEGIN:<component>` check, case-insensitive on the component name.
    pub fn begins(&self, component: &str) -> bool {
        self.key == FieldKey::Begin && self.value.trim().eq_ignore_ascii_case(component)
    }

    pub fn ends(&self, component: &str) -> bool {
        self.key == FieldKey::End && self.value.trim().eq_ignore_ascii_case(component)
    }
}

/// Position of the first `:` outside a quoted parameter value.
fn split_at_value(line: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

/// Strip carriage returns so CRLF and LF documents scan identically.
pub fn normalize(raw: &str) -> String {
    raw.replace('\r', "")
}

/// Join folded continuation lines (leading space or tab) onto the line
/// before them. Blank lines are dropped.
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for line in text.split('\n') {
        if let Some(rest) = line.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    lines
}

/// Scan normalized document text into content lines.
pub fn scan(text: &str) -> Vec<ContentLine> {
    unfold(text).iter().map(|l| ContentLine::parse(l)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_key_params_and_value() {
        let line = ContentLine::parse("DTSTART;VALUE=DATE:20250301");
        assert_eq!(line.key, FieldKey::DtStart);
        assert_eq!(line.param("value"), Some("DATE"));
        assert_eq!(line.value, "20250301");
    }

    #[test]
    fn colon_inside_quoted_param_is_not_the_separator() {
        let line = ContentLine::parse("DTSTART;TZID=\"Europe/Brussels:x\":20250301T090000");
        assert_eq!(line.param("TZID"), Some("Europe/Brussels:x"));
        assert_eq!(line.value, "20250301T090000");
    }

    #[test]
    fn value_may_contain_colons() {
        let line = ContentLine::parse("SUMMARY:Call: budget");
        assert_eq!(line.key, FieldKey::Summary);
        assert_eq!(line.value, "Call: budget");
    }

    #[test]
    fn unknown_keys_are_other() {
        assert_eq!(ContentLine::parse("UID:abc").key, FieldKey::Other);
        assert_eq!(ContentLine::parse("garbage").key, FieldKey::Other);
    }

    #[test]
    fn unfolds_continuation_lines() {
        let lines = unfold("SUMMARY:Long\n  title\n\t continued\nUID:1\n");
        assert_eq!(lines, vec!["SUMMARY:Long title continued", "UID:1"]);
    }

    #[test]
    fn normalize_removes_carriage_returns() {
        assert_eq!(normalize("A:1\r\nB:2\r\n"), "A:1\nB:2\n");
    }

    #[test]
    fn begin_and_end_match_components() {
        let begin = ContentLine::parse("BEGIN:VEVENT");
        assert!(begin.begins("VEVENT"));
        assert!(!begin.begins("VALARM"));
        assert!(ContentLine::parse("END:vevent").ends("VEVENT"));
    }
}
