//! Query components: parse a Zoekt query into filter atoms and free text,
//! mutate it, and build it back into a query string.
//!
//! ```
//! use zoekt_client::QueryComponents;
//!
//! let mut components = QueryComponents::parse("repo:myorg -repo:test error handling");
//! components.set_language("rust");
//! assert_eq!(
//!     components.build(),
//!     "repo:myorg -repo:test lang:rust error handling"
//! );
//! ```

use std::convert::Infallible;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// A single filter instance, e.g. the `test` in `-repo:test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterValue {
    pub value: String,
    pub negated: bool,
}

impl FilterValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            negated: false,
        }
    }

    pub fn negated(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            negated: true,
        }
    }

    /// Interpret a leading `-` as negation (`"-test"` → negated `test`).
    pub fn from_prefixed(value: &str) -> Self {
        match value.strip_prefix('-') {
            Some(rest) => Self::negated(rest),
            None => Self::new(value),
        }
    }

    /// The dash-prefixed form, `"-test"` for a negated `test`.
    pub fn to_prefixed(&self) -> String {
        if self.negated {
            format!("-{}", self.value)
        } else {
            self.value.clone()
        }
    }
}

/// A parsed query: ordered filter keys, each with ordered values, plus free text.
///
/// Free text is kept apart from the filters and is always emitted last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryComponents {
    filters: Vec<(String, Vec<FilterValue>)>,
    text: Vec<String>,
}

impl QueryComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(query: &str) -> Self {
        parse_query_components(query)
    }

    pub fn build(&self) -> String {
        build_query(self)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.text.is_empty()
    }

    /// Values recorded for `key`, in order of appearance.
    pub fn get(&self, key: &str) -> Option<&[FilterValue]> {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Filter keys with their values, in insertion order.
    pub fn filters(&self) -> impl Iterator<Item = (&str, &[FilterValue])> {
        self.filters
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    /// Append a value under `key`, creating the key at the end if absent.
    pub fn push(&mut self, key: &str, value: FilterValue) {
        match self.filters.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.filters.push((key.to_string(), vec![value])),
        }
    }

    /// Replace every value under `key`. An existing key keeps its position.
    pub fn set(&mut self, key: &str, values: Vec<FilterValue>) {
        match self.filters.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = values,
            None => self.filters.push((key.to_string(), values)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<FilterValue>> {
        let index = self.filters.iter().position(|(k, _)| k == key)?;
        Some(self.filters.remove(index).1)
    }

    /// Append a free-text term. It is emitted verbatim, so multi-word
    /// phrases must be quoted by the caller.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.text.push(text.into());
    }

    /// Restrict to a single language, replacing any `lang:` filters.
    pub fn set_language(&mut self, language: &str) {
        self.set("lang", vec![FilterValue::new(language)]);
    }

    pub fn add_file_pattern(&mut self, pattern: &str) {
        self.push("file", FilterValue::new(pattern));
    }

    pub fn add_repo_pattern(&mut self, pattern: &str) {
        self.push("repo", FilterValue::new(pattern));
    }

    pub fn set_case_sensitive(&mut self) {
        self.set("case", vec![FilterValue::new("yes")]);
    }

    /// Turn the query into a symbol search. Without a kind this emits a bare `sym:`.
    pub fn set_symbol(&mut self, kind: Option<&str>) {
        let value = kind.filter(|k| !k.is_empty()).unwrap_or_default();
        self.set("sym", vec![FilterValue::new(value)]);
    }
}

impl fmt::Display for QueryComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build_query(self))
    }
}

impl FromStr for QueryComponents {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_query_components(s))
    }
}

fn atom_regex() -> &'static Regex {
    static ATOM: OnceLock<Regex> = OnceLock::new();
    ATOM.get_or_init(|| Regex::new(r#"(\w+):("(?:[^"\\]|\\.)*"|\S+)"#).expect("valid regex"))
}

/// One `key:value` occurrence and the byte span it covers in the input.
struct Atom<'a> {
    key: &'a str,
    value: FilterValue,
    span: Range<usize>,
}

fn lex_atoms(query: &str) -> Vec<Atom<'_>> {
    atom_regex()
        .captures_iter(query)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?.as_str();
            let raw = caps.get(2)?.as_str();

            // Only the outer quotes go; `\"` inside stays as written.
            let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                &raw[1..raw.len() - 1]
            } else {
                raw
            };

            let mut start = whole.start();
            let negated = is_negation_prefix(query, start);
            if negated {
                start -= 1;
            }

            Some(Atom {
                key,
                value: FilterValue {
                    value: value.to_string(),
                    negated,
                },
                span: start..whole.end(),
            })
        })
        .collect()
}

/// A `-` right before the atom negates it when the dash starts a token.
fn is_negation_prefix(query: &str, atom_start: usize) -> bool {
    let Some(before) = query[..atom_start].strip_suffix('-') else {
        return false;
    };
    before.chars().next_back().map_or(true, char::is_whitespace)
}

/// Parse a Zoekt query string into filter atoms and free text.
///
/// `"repo:abc file:*.py case:yes text"` yields `repo=[abc]`, `file=[*.py]`,
/// `case=[yes]` and the text `["text"]`. Never fails: anything that is not a
/// `key:value` atom ends up as text.
pub fn parse_query_components(query: &str) -> QueryComponents {
    let atoms = lex_atoms(query);
    let mut components = QueryComponents::new();

    if atoms.is_empty() {
        let trimmed = query.trim();
        if !trimmed.is_empty() {
            components.push_text(trimmed);
        }
        return components;
    }

    let mut last_end = 0;
    for atom in &atoms {
        if atom.span.start > last_end {
            push_gap(&mut components, &query[last_end..atom.span.start]);
        }
        last_end = atom.span.end;
    }
    if last_end < query.len() {
        push_gap(&mut components, &query[last_end..]);
    }

    for atom in atoms {
        components.push(atom.key, atom.value);
    }
    components
}

fn push_gap(components: &mut QueryComponents, gap: &str) {
    let gap = gap.trim();
    if !gap.is_empty() {
        components.push_text(gap);
    }
}

/// Build a query string from components: filters first, then free text.
///
/// Values containing whitespace are quoted and negated values render as
/// `-key:value`. Text entries are appended verbatim.
pub fn build_query(components: &QueryComponents) -> String {
    let mut parts = Vec::new();

    for (key, values) in components.filters() {
        for value in values {
            let rendered = if value.value.contains(char::is_whitespace) {
                format!("\"{}\"", value.value)
            } else {
                value.value.clone()
            };
            let dash = if value.negated { "-" } else { "" };
            parts.push(format!("{dash}{key}:{rendered}"));
        }
    }

    parts.extend(components.text.iter().cloned());
    parts.join(" ")
}
