//! Named-parameter text templates.
//!
//! Templates contain `[name]` placeholders. A [`Params`] record is built once
//! per emission step and rendered in one call; placeholders without a value
//! are left untouched. Options that do not apply render as
//! [`REMOVE_LINE_TAG`], and [`remove_tagged_lines`] drops every line carrying
//! it once a file is complete.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Sentinel marking a generated line for removal.
pub const REMOVE_LINE_TAG: &str = "REMOVE_LINE_TAG";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z][A-Za-z0-9_.]*)\]").expect("placeholder pattern"));

/// Parameter values for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<&'static str, String>,
}

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value or the removal tag when `None`.
    pub fn with_opt(self, name: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self.with(name, REMOVE_LINE_TAG),
        }
    }
}

/// Substitute every known `[name]` placeholder of `template`.
pub fn render(template: &str, params: &Params) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match params.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Drop every line that contains [`REMOVE_LINE_TAG`].
pub fn remove_tagged_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if !line.contains(REMOVE_LINE_TAG) {
            out.push_str(line);
        }
    }
    out
}

/// Format strings as a FASTBuild array literal.
///
/// Empty input yields [`REMOVE_LINE_TAG`]; a single item is written inline.
/// `indent` is the column the closing brace is aligned to.
pub fn format_list<S: AsRef<str>>(items: &[S], indent: usize) -> String {
    match items {
        [] => REMOVE_LINE_TAG.to_string(),
        [single] => format!("{{ '{}' }}", single.as_ref()),
        _ => {
            let pad = " ".repeat(indent);
            let body = items
                .iter()
                .map(|item| format!("{}    '{}'", pad, item.as_ref()))
                .collect::<Vec<_>>()
                .join(",\n");
            format!("{{\n{}\n{}}}", body, pad)
        }
    }
}
