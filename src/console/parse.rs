// Console argument parsing
//
// - split_args:   quote-aware splitting for show/destroy/update arguments
// - parse_param:  create's key=value parameters
// - parse_call:   the `<Class>.<verb>(<args>)` form

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

static CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\.(\w+)\((.*)\)$").expect("call pattern is valid"));

/// One argument; `quoted` is set when any part of it was inside double quotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub text: String,
    pub quoted: bool,
}

impl Arg {
    /// Typed value for an assignment: quoted text stays a string,
    /// bare text becomes an integer or a float when it parses as one
    pub fn to_value(&self) -> Value {
        if !self.quoted {
            if let Ok(i) = self.text.parse::<i64>() {
                return Value::from(i);
            }
            if let Some(n) = self
                .text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
            {
                return Value::Number(n);
            }
        }
        Value::String(self.text.clone())
    }
}

/// Split on whitespace, or on commas when `commas` is set. Double quotes
/// group text and are removed; `\` escapes the next character inside them.
pub fn split_args(input: &str, commas: bool) -> Vec<Arg> {
    let mut args = Vec::new();
    let mut text = String::new();
    let mut quoted = false;
    let mut in_quote = false;
    let mut chars = input.chars();

    let mut flush = |text: &mut String, quoted: &mut bool| {
        if !text.is_empty() || *quoted {
            args.push(Arg {
                text: std::mem::take(text),
                quoted: *quoted,
            });
        }
        *quoted = false;
    };

    while let Some(c) = chars.next() {
        if in_quote {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        text.push(next);
                    }
                }
                '"' => in_quote = false,
                _ => text.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quote = true;
                quoted = true;
            }
            ',' if commas => flush(&mut text, &mut quoted),
            c if c.is_whitespace() => {
                if !commas {
                    flush(&mut text, &mut quoted);
                }
            }
            _ => text.push(c),
        }
    }
    flush(&mut text, &mut quoted);

    args
}

/// `key=value` from `create`. Strings are double-quoted with `_` standing
/// for a space and `\"` for a quote; bare values are integers, or floats
/// when they contain a dot. Anything else is None.
pub fn parse_param(token: &str) -> Option<(String, Value)> {
    let (key, raw) = token.split_once('=')?;
    if key.is_empty() {
        return None;
    }

    let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let inner = &raw[1..raw.len() - 1];
        // An unescaped quote inside the value is malformed
        if inner.replace("\\\"", "").contains('"') {
            return None;
        }
        Value::String(inner.replace('_', " ").replace("\\\"", "\""))
    } else if raw.contains('.') {
        Value::Number(Number::from_f64(raw.parse::<f64>().ok()?)?)
    } else {
        Value::from(raw.parse::<i64>().ok()?)
    };

    Some((key.to_string(), value))
}

/// `<Class>.<verb>(<args>)` pieces
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub class: String,
    pub verb: String,
    pub args: Vec<Arg>,
    /// Attribute dictionary of `update(<id>, {...})`
    pub dict: Option<Map<String, Value>>,
}

/// None when the line is not a call or its dictionary does not parse
pub fn parse_call(line: &str) -> Option<Call> {
    let caps = CALL_RE.captures(line)?;
    let class = caps[1].to_string();
    let verb = caps[2].to_string();
    let inner = caps[3].trim();

    if let Some(brace) = inner.find('{') {
        let args = split_args(&inner[..brace], true);
        let dict = parse_dict(&inner[brace..])?;
        return Some(Call {
            class,
            verb,
            args,
            dict: Some(dict),
        });
    }

    Some(Call {
        class,
        verb,
        args: split_args(inner, true),
        dict: None,
    })
}

/// `{'first_name': 'John', "age": 89}`, single or double quoted
fn parse_dict(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(&single_to_double_quotes(raw.trim())) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Rewrite `'...'` string literals as JSON strings. Quotes inside a literal
/// (an apostrophe in a double-quoted one, or `"` in a single-quoted one)
/// are content, not delimiters.
fn single_to_double_quotes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut delimiter: Option<char> = None;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match (delimiter, c) {
            (None, '\'' | '"') => {
                delimiter = Some(c);
                out.push('"');
            }
            (None, _) => out.push(c),
            (Some(_), '\\') => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            (Some(d), _) if c == d => {
                delimiter = None;
                out.push('"');
            }
            (Some(_), '"') => out.push_str("\\\""),
            (Some(_), _) => out.push(c),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
