//! Validity predicates over generated text.
//!
//! A [`Constraint`] looks at a piece of generated text and reports whether
//! it is acceptable and whether it is finished. The full-text retry loop
//! calls [`Constraint::check`] once per completion; the token-by-token
//! decoder calls [`Constraint::check_prefix`] on every candidate preview,
//! where `valid` means the text can still grow into an accepted one.

use std::collections::HashSet;

use serde_json::Value;

use crate::function::{required_fields, FunctionSchema};

/// Reply of the function selector when no offered function applies.
pub const NO_FUNCTION: &str = "no_need_to_call_any_known_function";

/// Outcome of checking text against a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Verdict {
    pub valid: bool,
    pub complete: bool,
}

impl Verdict {
    #[must_use]
    pub const fn new(valid: bool, complete: bool) -> Self {
        Self { valid, complete }
    }

    /// Valid and complete: the text can be returned as-is.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        self.valid && self.complete
    }
}

impl From<(bool, bool)> for Verdict {
    fn from((valid, complete): (bool, bool)) -> Self {
        Self { valid, complete }
    }
}

/// A pure predicate over generated text.
///
/// Any `Fn(&str) -> (bool, bool)` closure is a constraint; closures judge
/// prefixes and full texts alike.
pub trait Constraint {
    /// Judge a finished text.
    fn check(&self, text: &str) -> Verdict;

    /// Judge text that may still grow: `valid` is false only once no
    /// continuation can be accepted.
    fn check_prefix(&self, text: &str) -> Verdict {
        self.check(text)
    }
}

impl<F> Constraint for F
where
    F: Fn(&str) -> (bool, bool),
{
    fn check(&self, text: &str) -> Verdict {
        self(text).into()
    }
}

/// Exact match (after trimming) against a fixed set of values.
#[derive(Debug, Clone)]
pub struct EnumConstraint {
    values: HashSet<String>,
}

impl EnumConstraint {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl EnumConstraint {
    /// Whether `item` (leading whitespace already removed) can grow into a
    /// value. Trailing whitespace closes the item.
    fn open_item(values: &HashSet<String>, item: &str) -> bool {
        let core = item.trim_end();
        if core.len() < item.len() {
            core.is_empty() || values.contains(core)
        } else {
            values.iter().any(|v| v.starts_with(core))
        }
    }
}

impl Constraint for EnumConstraint {
    fn check(&self, text: &str) -> Verdict {
        Verdict::new(self.values.contains(text.trim()), true)
    }

    fn check_prefix(&self, text: &str) -> Verdict {
        let item = text.trim_start();
        Verdict::new(
            Self::open_item(&self.values, item),
            self.values.contains(item.trim_end()),
        )
    }
}

/// A comma-separated subset of a fixed set, or the [`NO_FUNCTION`] sentinel.
///
/// Empty text is neither valid nor complete.
#[derive(Debug, Clone)]
pub struct MultiEnumConstraint {
    values: HashSet<String>,
}

impl MultiEnumConstraint {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Accept any subset of the offered function names.
    #[must_use]
    pub fn for_functions(functions: &[FunctionSchema]) -> Self {
        Self::new(functions.iter().map(|f| f.name.clone()))
    }
}

impl Constraint for MultiEnumConstraint {
    fn check(&self, text: &str) -> Verdict {
        let text = text.trim();
        if text.is_empty() {
            return Verdict::new(false, false);
        }
        if text == NO_FUNCTION {
            return Verdict::new(true, true);
        }
        let valid = text
            .split(',')
            .all(|item| self.values.contains(item.trim()));
        Verdict::new(valid, true)
    }

    fn check_prefix(&self, text: &str) -> Verdict {
        let text = text.trim_start();
        let sentinel = (!text.contains(char::is_whitespace) && NO_FUNCTION.starts_with(text))
            || text.trim_end() == NO_FUNCTION;
        let mut items = text.split(',').peekable();
        let mut listed = true;
        while let Some(item) = items.next() {
            listed &= if items.peek().is_some() {
                self.values.contains(item.trim())
            } else {
                EnumConstraint::open_item(&self.values, item.trim_start())
            };
        }
        Verdict::new(sentinel || listed, self.check(text).is_accepted())
    }
}

/// Parses as JSON and carries every key the schema marks `required`.
///
/// Text that does not parse is reported as neither valid nor complete,
/// since it may be a truncated object.
#[derive(Debug, Clone)]
pub struct JsonSchemaConstraint {
    required: Vec<String>,
}

impl JsonSchemaConstraint {
    /// Build from a JSON schema object.
    #[must_use]
    pub fn new(schema: &Value) -> Self {
        Self::from_required(required_fields(schema))
    }

    /// Build from a function's parameter schema.
    #[must_use]
    pub fn for_function(function: &FunctionSchema) -> Self {
        Self::from_required(function.required())
    }

    fn from_required(required: Vec<&str>) -> Self {
        Self {
            required: required.into_iter().map(str::to_string).collect(),
        }
    }
}

impl Constraint for JsonSchemaConstraint {
    fn check(&self, text: &str) -> Verdict {
        let Ok(data) = serde_json::from_str::<Value>(text) else {
            return Verdict::new(false, false);
        };
        let valid = match data.as_object() {
            Some(object) => self.required.iter().all(|k| object.contains_key(k)),
            None => self.required.is_empty(),
        };
        Verdict::new(valid, true)
    }

    fn check_prefix(&self, text: &str) -> Verdict {
        let full = self.check(text);
        if full.complete {
            full
        } else {
            Verdict::new(is_json_prefix(text), false)
        }
    }
}

// ---------------------------------------------------------------------------
// JSON prefix scanning
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    FirstItem,
    FirstKey,
    Key,
    Colon,
    Next,
    Done,
}

enum Scan {
    Closed(usize),
    Open,
    Invalid,
}

fn after_value(stack: &[Frame]) -> Expect {
    if stack.is_empty() {
        Expect::Done
    } else {
        Expect::Next
    }
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
}

/// Scan a string body starting after its opening quote.
fn scan_string(chars: &[char], start: usize) -> Scan {
    let mut i = start;
    while let Some(&c) = chars.get(i) {
        match c {
            '"' => return Scan::Closed(i + 1),
            '\\' => match chars.get(i + 1) {
                None => return Scan::Open,
                Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => i += 2,
                Some('u') => {
                    for k in 0..4 {
                        match chars.get(i + 2 + k) {
                            None => return Scan::Open,
                            Some(h) if h.is_ascii_hexdigit() => {}
                            Some(_) => return Scan::Invalid,
                        }
                    }
                    i += 6;
                }
                Some(_) => return Scan::Invalid,
            },
            c if c < '\u{20}' => return Scan::Invalid,
            _ => i += 1,
        }
    }
    Scan::Open
}

/// Whether `text` is the beginning of some JSON document.
pub(crate) fn is_json_prefix(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut stack = Vec::new();
    let mut expect = Expect::Value;
    let mut i = 0;
    while let Some(&c) = chars.get(i) {
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            i += 1;
            continue;
        }
        match expect {
            Expect::Done => return false,
            Expect::Colon => {
                if c != ':' {
                    return false;
                }
                expect = Expect::Value;
                i += 1;
            }
            Expect::FirstKey if c == '}' => {
                stack.pop();
                expect = after_value(&stack);
                i += 1;
            }
            Expect::FirstKey | Expect::Key => {
                if c != '"' {
                    return false;
                }
                match scan_string(&chars, i + 1) {
                    Scan::Closed(end) => i = end,
                    Scan::Open => return true,
                    Scan::Invalid => return false,
                }
                expect = Expect::Colon;
            }
            Expect::Next => {
                match (c, stack.last()) {
                    (',', Some(Frame::Object)) => expect = Expect::Key,
                    (',', Some(Frame::Array)) => expect = Expect::Value,
                    ('}', Some(Frame::Object)) | (']', Some(Frame::Array)) => {
                        stack.pop();
                        expect = after_value(&stack);
                    }
                    _ => return false,
                }
                i += 1;
            }
            Expect::FirstItem if c == ']' => {
                stack.pop();
                expect = after_value(&stack);
                i += 1;
            }
            Expect::Value | Expect::FirstItem => match c {
                '{' => {
                    stack.push(Frame::Object);
                    expect = Expect::FirstKey;
                    i += 1;
                }
                '[' => {
                    stack.push(Frame::Array);
                    expect = Expect::FirstItem;
                    i += 1;
                }
                '"' => {
                    match scan_string(&chars, i + 1) {
                        Scan::Closed(end) => i = end,
                        Scan::Open => return true,
                        Scan::Invalid => return false,
                    }
                    expect = after_value(&stack);
                }
                't' | 'f' | 'n' => {
                    let word = match c {
                        't' => "true",
                        'f' => "false",
                        _ => "null",
                    };
                    let seen: String = chars[i..].iter().take(word.len()).collect();
                    if !word.starts_with(&seen) {
                        return false;
                    }
                    if seen.len() < word.len() {
                        return true;
                    }
                    i += word.len();
                    expect = after_value(&stack);
                }
                '-' | '0'..='9' => {
                    let end = chars[i..]
                        .iter()
                        .position(|&c| !is_number_char(c))
                        .map_or(chars.len(), |n| i + n);
                    if end == chars.len() {
                        return true;
                    }
                    let number: String = chars[i..end].iter().collect();
                    if serde_json::from_str::<serde_json::Number>(&number).is_err() {
                        return false;
                    }
                    i = end;
                    expect = after_value(&stack);
                }
                _ => return false,
            },
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_exact_match() {
        let c = EnumConstraint::new(["get_weather", "get_stock_price"]);
        assert_eq!(c.check(" get_weather\n"), Verdict::new(true, true));
        assert_eq!(c.check("get_weather,get_stock_price"), Verdict::new(false, true));
        assert_eq!(c.check(""), Verdict::new(false, true));
    }

    #[test]
    fn multi_enum_subset() {
        let c = MultiEnumConstraint::new(["get_weather", "get_stock_price"]);
        assert_eq!(
            c.check("get_weather,get_stock_price"),
            Verdict::new(true, true)
        );
        assert_eq!(
            c.check("get_stock_price , get_weather"),
            Verdict::new(true, true)
        );
        assert_eq!(c.check("get_unknown"), Verdict::new(false, true));
        assert_eq!(c.check("get_weather,"), Verdict::new(false, true));
        assert_eq!(c.check("   "), Verdict::new(false, false));
    }

    #[test]
    fn multi_enum_sentinel_ignores_valid_set() {
        let c = MultiEnumConstraint::new(Vec::<String>::new());
        assert_eq!(c.check(NO_FUNCTION), Verdict::new(true, true));
        let c = MultiEnumConstraint::new(["get_weather"]);
        assert_eq!(
            c.check(&format!(" {NO_FUNCTION} ")),
            Verdict::new(true, true)
        );
    }

    #[test]
    fn json_schema_required_keys() {
        let c = JsonSchemaConstraint::new(&json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        }));
        assert_eq!(c.check(r#"{"location":"Paris"}"#), Verdict::new(true, true));
        assert_eq!(c.check(r#"{"loc":"Paris"}"#), Verdict::new(false, true));
        assert_eq!(c.check(r#"{"location":"#), Verdict::new(false, false));
        assert_eq!(c.check("[1, 2]"), Verdict::new(false, true));
    }

    #[test]
    fn json_schema_without_required_accepts_any_json() {
        let c = JsonSchemaConstraint::new(&json!({"type": "object"}));
        assert_eq!(c.check("{}"), Verdict::new(true, true));
        assert_eq!(c.check("not json"), Verdict::new(false, false));
    }

    #[test]
    fn enum_prefixes_stay_open() {
        let c = EnumConstraint::new(["get_weather", "get_stock_price"]);
        assert_eq!(c.check_prefix(""), Verdict::new(true, false));
        assert_eq!(c.check_prefix(" get_st"), Verdict::new(true, false));
        assert_eq!(c.check_prefix("get_weather"), Verdict::new(true, true));
        assert_eq!(c.check_prefix("get_weather\n"), Verdict::new(true, true));
        assert_eq!(c.check_prefix("get_x"), Verdict::new(false, false));
        assert_eq!(c.check_prefix("get_ "), Verdict::new(false, false));
    }

    #[test]
    fn multi_enum_prefixes_stay_open() {
        let c = MultiEnumConstraint::new(["get_weather", "get_stock_price"]);
        assert_eq!(c.check_prefix("get_w"), Verdict::new(true, false));
        assert_eq!(c.check_prefix("get_weather,"), Verdict::new(true, false));
        assert_eq!(
            c.check_prefix("get_weather, get_stock"),
            Verdict::new(true, false)
        );
        assert_eq!(
            c.check_prefix("get_weather,get_stock_price"),
            Verdict::new(true, true)
        );
        assert_eq!(c.check_prefix("no_need_to"), Verdict::new(true, false));
        assert_eq!(c.check_prefix(NO_FUNCTION), Verdict::new(true, true));
        assert_eq!(c.check_prefix("get_unknown,"), Verdict::new(false, false));
        assert_eq!(c.check_prefix("no_need x"), Verdict::new(false, false));
    }

    #[test]
    fn json_schema_for_function_reads_required() {
        let f = FunctionSchema::new(
            "get_weather",
            "Get weather",
            json!({"type": "object", "required": ["location"]}),
        );
        let c = JsonSchemaConstraint::for_function(&f);
        assert_eq!(c.check(r#"{"location": "Oslo"}"#), Verdict::new(true, true));
        assert_eq!(c.check("{}"), Verdict::new(false, true));
    }

    #[test]
    fn json_prefixes_stay_open_until_closed() {
        let c = JsonSchemaConstraint::new(&json!({"required": ["location"]}));
        for open in ["", " ", "{", r#"{"loc"#, r#"{"location":"#, r#"{"location": "Par"#] {
            assert_eq!(c.check_prefix(open), Verdict::new(true, false), "{open:?}");
        }
        assert_eq!(
            c.check_prefix(r#"{"location":"Paris"}"#),
            Verdict::new(true, true)
        );
        assert_eq!(c.check_prefix("{}"), Verdict::new(false, true));
        assert_eq!(c.check_prefix("x"), Verdict::new(false, false));
        assert_eq!(c.check_prefix(r#"{"a" 1"#), Verdict::new(false, false));
    }

    #[test]
    fn json_prefix_scanner() {
        for ok in [
            r#"[1, -2.5e3, true, nul"#,
            r#"{"a": [], "b": {}, "c": "\u00e"#,
            r#"{"a": "x\"y", "b": fa"#,
            r#"[[], {"k": null}]  "#,
        ] {
            assert!(is_json_prefix(ok), "{ok:?}");
        }
        for bad in [
            "[1,]",
            r#"{"a": 1]"#,
            "[1 2]",
            r#""\x""#,
            "[tru]",
            "[1.2.3]",
            "{} {}",
            "{1: 2}",
        ] {
            assert!(!is_json_prefix(bad), "{bad:?}");
        }
    }

    #[test]
    fn closures_are_constraints() {
        let short = |text: &str| (text.len() < 4, text.ends_with('.'));
        assert_eq!(short.check("ok."), Verdict::new(true, true));
        assert_eq!(short.check("longer"), Verdict::new(false, false));
        assert!(Verdict::from((true, true)).is_accepted());
    }
}
