//! Text fields that only ever hold a number.

use crate::transform::Axis;

/// Which transform field a numeric text box edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Position(Axis),
    Rotation(Axis),
}

impl FieldId {
    pub fn label(self) -> String {
        match self {
            FieldId::Position(axis) => format!("Position {}", axis.label()),
            FieldId::Rotation(axis) => format!("Rotation {}", axis.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Accepted,
    Rejected,
    /// Enter was pressed; the host should drop focus, which commits the field.
    EndEditing,
}

/// Entry-time keystroke filter: digits, control characters and a single decimal point.
pub fn filter_key(current_text: &str, key: char) -> KeyOutcome {
    if key == '\r' || key == '\n' {
        return KeyOutcome::EndEditing;
    }
    if key.is_control() || key.is_ascii_digit() {
        return KeyOutcome::Accepted;
    }
    if key == '.' && !current_text.contains('.') {
        return KeyOutcome::Accepted;
    }
    KeyOutcome::Rejected
}

/// Parses committed text. Unparseable or non-finite input becomes `0.0`.
pub fn parse_committed(text: &str) -> f32 {
    match text.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Canonical text for a committed field.
pub fn commit_text(text: &str) -> String {
    format_number(parse_committed(text))
}

pub fn format_number(value: f32) -> String {
    if value == 0.0 || !value.is_finite() {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Editing state of one numeric text box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericField {
    text: String,
    focused: bool,
}

impl NumericField {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), focused: false }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Replaces the text, e.g. after a refresh. Ignored while the user is typing.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if !self.focused {
            self.text = text.into();
        }
    }

    pub fn key_press(&mut self, key: char) -> KeyOutcome {
        let outcome = filter_key(&self.text, key);
        if outcome == KeyOutcome::Accepted {
            if key == '\u{8}' {
                self.text.pop();
            } else if !key.is_control() {
                self.text.push(key);
            }
        }
        outcome
    }

    /// Drops focus and canonicalizes the text, returning the committed value.
    pub fn commit(&mut self) -> f32 {
        let value = parse_committed(&self.text);
        self.text = format_number(value);
        self.focused = false;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_letters_signs_and_second_decimal_point() {
        assert_eq!(filter_key("", '7'), KeyOutcome::Accepted);
        assert_eq!(filter_key("", 'a'), KeyOutcome::Rejected);
        assert_eq!(filter_key("", '-'), KeyOutcome::Rejected);
        assert_eq!(filter_key("1", '.'), KeyOutcome::Accepted);
        assert_eq!(filter_key("1.5", '.'), KeyOutcome::Rejected);
        assert_eq!(filter_key("1.5", '\u{8}'), KeyOutcome::Accepted);
        assert_eq!(filter_key("1.5", '\r'), KeyOutcome::EndEditing);
    }

    #[test]
    fn field_labels_name_the_axis() {
        assert_eq!(FieldId::Position(Axis::X).label(), "Position X");
        assert_eq!(FieldId::Rotation(Axis::Z).label(), "Rotation Z");
    }

    #[test]
    fn invalid_commits_become_zero() {
        for text in ["abc", "", ".", "1.2.3", "NaN", "inf", "1e39"] {
            assert_eq!(commit_text(text), "0", "input {text:?}");
        }
    }

    #[test]
    fn commits_are_canonical_and_finite() {
        assert_eq!(commit_text("007.50"), "7.5");
        assert_eq!(commit_text("3."), "3");
        assert_eq!(commit_text(" 12 "), "12");
        for text in ["007.50", "3.", "0.1", "abc", "99999999"] {
            let committed = commit_text(text);
            let reparsed: f32 = committed.parse().expect("committed text parses");
            assert!(reparsed.is_finite());
        }
    }

    #[test]
    fn field_typing_and_commit() {
        let mut field = NumericField::new("0");
        field.focus();
        field.set_text("ignored while focused");
        assert_eq!(field.text(), "0");
        for key in ['.', '5', 'x', '.', '\u{8}', '2'] {
            field.key_press(key);
        }
        assert_eq!(field.text(), "0.2");
        assert_eq!(field.key_press('\r'), KeyOutcome::EndEditing);
        let value = field.commit();
        assert!((value - 0.2).abs() < 1e-6);
        assert_eq!(field.text(), "0.2");
        assert!(!field.is_focused());
    }
}
