//! Syntax repair for almost-JSON written by a language model.
//!
//! The repairer re-emits its input as strict JSON while walking it once:
//! single-quoted strings become double-quoted, commas are rewritten (so
//! trailing, doubled and missing commas all come out right), bare keys and
//! bare words are quoted, comments are dropped, and containers still open at
//! the end of input are closed. Keys and values are never invented; the only
//! value it ever writes on its own is `null` for a key that has none.

/// Deeper input is rejected rather than walked.
const MAX_DEPTH: usize = 128;

/// Repair `input` into strict JSON text. `None` when no value could be read
/// or the input nests deeper than [`MAX_DEPTH`].
pub(crate) fn repair_json(input: &str) -> Option<String> {
    let mut repairer = Repairer {
        chars: input.chars().collect(),
        pos: 0,
        out: String::with_capacity(input.len() + 16),
        open: Vec::new(),
        too_deep: false,
    };
    repairer.skip_insignificant();
    if !repairer.value() || repairer.too_deep {
        return None;
    }
    Some(repairer.out)
}

struct Repairer {
    chars: Vec<char>,
    pos: usize,
    out: String,
    /// Opening brackets of the containers being written, innermost last.
    open: Vec<char>,
    too_deep: bool,
}

impl Repairer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Whether a container of kind `bracket` is open outside the innermost one.
    fn open_outside(&self, bracket: char) -> bool {
        let outer = self.open.len().saturating_sub(1);
        self.open[..outer].contains(&bracket)
    }

    fn skip_insignificant(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    while let Some(c) = self.bump() {
                        if c == '*' && self.peek() == Some('/') {
                            self.pos += 1;
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Write one value. Returns false, having written nothing, when no value
    /// starts at the current position.
    fn value(&mut self) -> bool {
        self.skip_insignificant();
        match self.peek() {
            Some('{') => self.container('{'),
            Some('[') => self.container('['),
            Some(c) if is_quote(c) => {
                let body = self.string();
                self.write_string(&body);
                true
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if is_word_char(c) => self.bare_word(),
            _ => false,
        }
    }

    fn container(&mut self, bracket: char) -> bool {
        if self.open.len() >= MAX_DEPTH {
            self.too_deep = true;
            self.pos = self.chars.len();
            return true;
        }
        self.pos += 1;
        self.open.push(bracket);
        if bracket == '{' {
            self.object_body();
        } else {
            self.array_body();
        }
        self.open.pop();
        true
    }

    fn object_body(&mut self) {
        self.out.push('{');
        let mut first = true;
        loop {
            self.skip_insignificant();
            match self.peek() {
                None => break,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                // Mismatched closer: end this object and let the array take it.
                Some(']') if self.open_outside('[') => break,
                Some(',' | ':' | ']') => self.pos += 1,
                Some(_) => {
                    let Some(key) = self.key() else {
                        self.pos += 1;
                        continue;
                    };
                    if !first {
                        self.out.push(',');
                    }
                    first = false;
                    self.write_string(&key);
                    self.out.push(':');
                    self.skip_insignificant();
                    if self.peek() == Some(':') {
                        self.pos += 1;
                    }
                    if !self.value() {
                        self.out.push_str("null");
                    }
                }
            }
        }
        self.out.push('}');
    }

    fn array_body(&mut self) {
        self.out.push('[');
        let mut first = true;
        loop {
            self.skip_insignificant();
            match self.peek() {
                None => break,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some('}') if self.open_outside('{') => break,
                Some(',' | ':' | '}') => self.pos += 1,
                Some(_) => {
                    let mark = self.out.len();
                    if !first {
                        self.out.push(',');
                    }
                    if self.value() {
                        first = false;
                    } else {
                        self.out.truncate(mark);
                        self.pos += 1;
                    }
                }
            }
        }
        self.out.push(']');
    }

    /// Read an object key: a quoted string or a run of identifier characters.
    fn key(&mut self) -> Option<String> {
        match self.peek()? {
            c if is_quote(c) => Some(self.string()),
            c if is_word_char(c) => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if is_word_char(c)) {
                    self.pos += 1;
                }
                Some(self.chars[start..self.pos].iter().collect())
            }
            _ => None,
        }
    }

    /// Read a quoted string starting at its opening quote and return the body
    /// escaped for a double-quoted JSON string. An unterminated string runs to
    /// the end of input.
    fn string(&mut self) -> String {
        let Some(open) = self.bump() else {
            return String::new();
        };
        let close = closing_quote(open);
        let mut body = String::new();
        while let Some(c) = self.bump() {
            if c == close && (!matches!(close, '\'' | '\u{2019}') || self.apostrophe_closes()) {
                return body;
            }
            if c != '\\' {
                push_escaped(&mut body, c);
                continue;
            }
            match self.bump() {
                Some(e @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')) => {
                    body.push('\\');
                    body.push(e);
                }
                Some('u') if self.hex_digits_follow(4) => body.push_str("\\u"),
                Some('\'') => body.push('\''),
                Some(other) => {
                    body.push_str("\\\\");
                    push_escaped(&mut body, other);
                }
                None => body.push_str("\\\\"),
            }
        }
        body
    }

    /// Whether a single quote just read ends its string. One followed on the
    /// same line by more text (`'Don't panic'`) is an apostrophe.
    fn apostrophe_closes(&self) -> bool {
        let mut offset = 0;
        while matches!(self.peek_at(offset), Some(' ' | '\t')) {
            offset += 1;
        }
        !matches!(self.peek_at(offset), Some(c) if c.is_alphanumeric() || c == '_')
    }

    fn hex_digits_follow(&self, count: usize) -> bool {
        (0..count).all(|i| matches!(self.peek_at(i), Some(c) if c.is_ascii_hexdigit()))
    }

    fn number(&mut self) -> bool {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')
        ) {
            self.pos += 1;
        }
        // Text glued to the digits (`5min`, `0/5 * * * *`) is a bare word.
        if !self.at_value_end() {
            self.pos = start;
            return self.bare_word();
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        match normalize_number(&raw) {
            Some(number) => self.out.push_str(&number),
            None => self.write_string(&raw),
        }
        true
    }

    fn at_value_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(c) if c.is_whitespace() || matches!(c, ',' | '}' | ']' | ':') => true,
            Some('/') => matches!(self.peek_at(1), Some('/' | '*')),
            _ => false,
        }
    }

    /// An unquoted value running to the next delimiter or line end.
    fn bare_word(&mut self) -> bool {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '{' | '}' | '[' | ']' | '"' | '\n' | '\r') {
                break;
            }
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let word = word.trim_end();
        if word.is_empty() {
            self.pos = start;
            return false;
        }
        match word {
            "true" | "True" | "TRUE" => self.out.push_str("true"),
            "false" | "False" | "FALSE" => self.out.push_str("false"),
            "null" | "None" | "NULL" | "undefined" | "nil" => self.out.push_str("null"),
            _ => {
                let mut body = String::with_capacity(word.len());
                for c in word.chars() {
                    push_escaped(&mut body, c);
                }
                self.write_string(&body);
            }
        }
        true
    }

    fn write_string(&mut self, escaped_body: &str) {
        self.out.push('"');
        self.out.push_str(escaped_body);
        self.out.push('"');
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '\u{201c}' | '\u{2018}')
}

fn closing_quote(open: char) -> char {
    match open {
        '\u{201c}' => '\u{201d}',
        '\u{2018}' => '\u{2019}',
        other => other,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-' | '.')
}

fn push_escaped(body: &mut String, c: char) {
    match c {
        '"' => body.push_str("\\\""),
        '\\' => body.push_str("\\\\"),
        '\n' => body.push_str("\\n"),
        '\r' => body.push_str("\\r"),
        '\t' => body.push_str("\\t"),
        c if (c as u32) < 0x20 => body.push_str(&format!("\\u{:04x}", c as u32)),
        c => body.push(c),
    }
}

/// Coerce a numeric-looking token into JSON number syntax, if it is a number.
fn normalize_number(raw: &str) -> Option<String> {
    let mut number = raw.strip_prefix('+').unwrap_or(raw).to_string();
    if number.starts_with('.') {
        number.insert(0, '0');
    } else if number.starts_with("-.") {
        number.insert(1, '0');
    }
    if number.ends_with('.') {
        number.push('0');
    }
    serde_json::from_str::<serde_json::Number>(&number)
        .ok()
        .map(|_| number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn repaired(input: &str) -> Value {
        let text = repair_json(input).unwrap();
        serde_json::from_str(&text).unwrap_or_else(|e| panic!("{}: {}", text, e))
    }

    #[test]
    fn test_valid_json_is_unchanged_in_meaning() {
        let input = r#"{"a": [1, 2.5, -3e2, true, null], "b": {"c": "d\"e\n"}, "u": "\u00e9"}"#;
        let expected: Value = serde_json::from_str(input).unwrap();
        assert_eq!(repaired(input), expected);
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(
            repaired(r#"{"a": 1, "b": [1, 2, ], }"#),
            json!({"a": 1, "b": [1, 2]})
        );
    }

    #[test]
    fn test_single_quotes() {
        assert_eq!(
            repaired(r#"{'type': 'SCHEDULE', 'settings': {'cron': '0/5 * * * *'}}"#),
            json!({"type": "SCHEDULE", "settings": {"cron": "0/5 * * * *"}})
        );
    }

    #[test]
    fn test_apostrophe_inside_double_quotes_survives() {
        assert_eq!(
            repaired(r#"{"displayName": "Don't panic",}"#),
            json!({"displayName": "Don't panic"})
        );
    }

    #[test]
    fn test_apostrophe_inside_single_quotes_survives() {
        assert_eq!(
            repaired(r#"{'displayName': 'Don't panic', 'note': 'the users' inbox'}"#),
            json!({"displayName": "Don't panic", "note": "the users' inbox"})
        );
        assert_eq!(
            repaired("{'it's': 'ok'}"),
            json!({"it's": "ok"})
        );
        assert_eq!(
            repaired("{'a': 'x'\n'b': 'y'}"),
            json!({"a": "x", "b": "y"})
        );
    }

    #[test]
    fn test_double_quote_inside_single_quotes_is_escaped() {
        assert_eq!(
            repaired(r#"{'say': 'he said "hi"'}"#),
            json!({"say": "he said \"hi\""})
        );
    }

    #[test]
    fn test_unquoted_keys_and_bare_words() {
        assert_eq!(
            repaired(r#"{type: PIECE, valid: False, next: None, cron: 0/5 * * * *}"#),
            json!({"type": "PIECE", "valid": false, "next": null, "cron": "0/5 * * * *"})
        );
    }

    #[test]
    fn test_missing_commas() {
        assert_eq!(
            repaired("{\"a\": 1\n\"b\": [1 2 3]\n\"c\": {}}"),
            json!({"a": 1, "b": [1, 2, 3], "c": {}})
        );
    }

    #[test]
    fn test_unbalanced_brackets_are_closed() {
        assert_eq!(
            repaired(r#"{"trigger": {"type": "WEBHOOK", "nextAction": {"type": "CODE""#),
            json!({"trigger": {"type": "WEBHOOK", "nextAction": {"type": "CODE"}}})
        );
        assert_eq!(repaired(r#"{"a": [1, 2"#), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_mismatched_closer_ends_inner_container() {
        assert_eq!(
            repaired(r#"{"a": [{"b": 1], "c": 2}"#),
            json!({"a": [{"b": 1}], "c": 2})
        );
    }

    #[test]
    fn test_stray_closer_without_matching_container_is_dropped() {
        assert_eq!(
            repaired(r#"{"a": 1], "b": 2}"#),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_comments_are_stripped() {
        assert_eq!(
            repaired("{\n  // the trigger\n  \"a\": 1, /* inline */ \"b\": 2\n}"),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_missing_value_becomes_null() {
        assert_eq!(repaired(r#"{"a": , "b": 1}"#), json!({"a": null, "b": 1}));
        assert_eq!(repaired(r#"{"a":"#), json!({"a": null}));
    }

    #[test]
    fn test_unterminated_string_is_closed() {
        assert_eq!(repaired(r#"{"a": "hello"#), json!({"a": "hello"}));
    }

    #[test]
    fn test_invalid_escapes_and_control_chars() {
        assert_eq!(
            repaired("{\"path\": \"C:\\temp\\x\", \"multi\": \"line1\nline2\"}"),
            json!({"path": "C:\temp\\x", "multi": "line1\nline2"})
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(
            repaired(r#"{"a": +1, "b": .5, "c": 2., "d": 007, "e": 5min}"#),
            json!({"a": 1, "b": 0.5, "c": 2.0, "d": "007", "e": "5min"})
        );
    }

    #[test]
    fn test_content_after_first_value_is_ignored() {
        assert_eq!(repaired(r#"{"a": 1} trailing {"b": 2}"#), json!({"a": 1}));
    }

    #[test]
    fn test_smart_quotes() {
        assert_eq!(
            repaired("{\u{201c}a\u{201d}: \u{201c}b\u{201d}}"),
            json!({"a": "b"})
        );
    }

    #[test]
    fn test_nothing_to_repair() {
        assert!(repair_json("").is_none());
        assert!(repair_json("   ").is_none());
        assert!(repair_json("@@@").is_none());
    }

    #[test]
    fn test_rejects_excessive_nesting() {
        let deep = "[".repeat(MAX_DEPTH + 10);
        assert!(repair_json(&deep).is_none());
        let ok = format!("{}{}", "[".repeat(10), "]".repeat(10));
        assert!(repair_json(&ok).is_some());
    }
}
