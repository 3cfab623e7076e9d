//! Common shape shared by every entity shown in a list view.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

/// A typed value read from a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Missing,
}

impl<'a> FieldValue<'a> {
    /// Wrap an optional string, treating blank text as missing.
    pub fn text(value: Option<&'a str>) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => Self::Text(s),
            _ => Self::Missing,
        }
    }

    /// Wrap an optional integer.
    pub fn integer(value: Option<i64>) -> Self {
        value.map_or(Self::Missing, Self::Integer)
    }

    /// Case-insensitive substring match; `needle` must already be lowercase.
    pub fn contains_folded(&self, needle: &str) -> bool {
        match self {
            Self::Text(s) => s.to_lowercase().contains(needle),
            Self::Integer(n) => n.to_string().contains(needle),
            Self::Missing => false,
        }
    }

    /// Whole-value match ignoring case. Missing values match nothing.
    pub fn equals_folded(&self, value: &str) -> bool {
        match self {
            Self::Text(s) => s.to_lowercase() == value.to_lowercase(),
            Self::Integer(n) => n.to_string() == value.trim(),
            Self::Missing => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Text(_) => 1,
            Self::Missing => 2,
        }
    }
}

/// Integers order numerically, text lexicographically. Integers come before
/// text and missing values come last.
impl Ord for FieldValue<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldValue<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Missing => f.write_str("N/A"),
        }
    }
}

/// An entity that can be cached, searched, sorted and paged.
pub trait Record: Clone + Send + Sync + 'static {
    /// Type tag the cache is keyed by (e.g. IIT/NIT for colleges).
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Columns of this entity.
    type Field: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> &str;

    fn kind(&self) -> Self::Kind;

    fn value(&self, field: Self::Field) -> FieldValue<'_>;
}
