//! Strings with `{{ env.NAME }}` placeholders, expanded from the process environment
//! when parsed or deserialized.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([[:alpha:]_][[:alnum:]_]*)\.([[:alpha:]_][[:alnum:]_]*)\s*\}\}")
        .expect("placeholder pattern should be valid")
});

/// A value whose string form had its placeholders expanded before parsing into `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicString<T>(T);

impl<T> DynamicString<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn as_inner(&self) -> &T {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    MissingVariable(String),
    UnsupportedNamespace(String),
    Parse(String),
}

impl fmt::Display for ExpansionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionError::MissingVariable(name) => write!(f, "environment variable not found: `{name}`"),
            ExpansionError::UnsupportedNamespace(namespace) => {
                write!(f, "right now only variables scoped with 'env.' are supported: `{namespace}`")
            }
            ExpansionError::Parse(reason) => write!(f, "failed to parse expanded value: {reason}"),
        }
    }
}

impl std::error::Error for ExpansionError {}

/// Expands every placeholder of `input` using `lookup` for the variable values.
pub fn expand_with<F>(input: &str, lookup: F) -> Result<String, ExpansionError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut error = None;

    let expanded = PLACEHOLDER.replace_all(input, |captures: &Captures<'_>| {
        let namespace = &captures[1];
        let name = &captures[2];

        if namespace != "env" {
            error.get_or_insert_with(|| ExpansionError::UnsupportedNamespace(namespace.to_string()));
            return String::new();
        }

        match lookup(name) {
            Some(value) => value,
            None => {
                error.get_or_insert_with(|| ExpansionError::MissingVariable(name.to_string()));
                String::new()
            }
        }
    });

    match error {
        Some(error) => Err(error),
        None => Ok(expanded.into_owned()),
    }
}

impl<T> FromStr for DynamicString<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Err = ExpansionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expanded = expand_with(s, |name| std::env::var(name).ok())?;

        expanded
            .parse()
            .map(DynamicString)
            .map_err(|err: T::Err| ExpansionError::Parse(err.to_string()))
    }
}

impl<'de, T> Deserialize<'de> for DynamicString<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
