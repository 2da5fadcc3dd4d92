//! Human-readable sequential identifiers: `AP-24092601`, `AG-...`, `TK-...`.
//!
//! An identifier is `{prefix}-{YYMMDD}{NN}` where the prefix is fixed per
//! [`Category`], the date stamp is the allocation day in a fixed calendar and
//! `NN` is the two-digit, zero-padded daily sequence (`01..=99`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::error::ValidationError;

/// Largest sequence that fits the fixed two-digit suffix.
pub const MAX_SEQUENCE: u32 = 99;

/// The allocator namespace a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Application,
    Agent,
    Ticket,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Application, Category::Agent, Category::Ticket];

    pub fn prefix(self) -> &'static str {
        match self {
            Category::Application => "AP",
            Category::Agent => "AG",
            Category::Ticket => "TK",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Application => "application",
            Category::Agent => "agent",
            Category::Ticket => "ticket",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.prefix() == prefix)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// A calendar day rendered as `YYMMDD`.
///
/// Field order gives chronological ordering within a century, which is also
/// the lexicographic order of the rendered form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateStamp {
    yy: u8,
    mm: u8,
    dd: u8,
}

impl DateStamp {
    pub fn from_date(date: Date) -> Self {
        DateStamp {
            yy: date.year().rem_euclid(100) as u8,
            mm: u8::from(date.month()),
            dd: date.day(),
        }
    }

    /// Date stamp of `now` as seen in the calendar at `offset`.
    pub fn from_datetime(now: OffsetDateTime, offset: UtcOffset) -> Self {
        Self::from_date(now.to_offset(offset).date())
    }

    /// Parse the six `YYMMDD` digits. Years are read as 20YY for validation.
    pub fn parse_digits(digits: &str) -> Option<Self> {
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let yy: u8 = digits[0..2].parse().ok()?;
        let mm: u8 = digits[2..4].parse().ok()?;
        let dd: u8 = digits[4..6].parse().ok()?;
        let month = Month::try_from(mm).ok()?;
        Date::from_calendar_date(2000 + i32::from(yy), month, dd).ok()?;
        Some(DateStamp { yy, mm, dd })
    }
}

impl fmt::Display for DateStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}", self.yy, self.mm, self.dd)
    }
}

/// `(category, dateStamp)`: the key of one daily sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey {
    pub category: Category,
    pub date: DateStamp,
}

impl SequenceKey {
    pub fn new(category: Category, date: DateStamp) -> Self {
        SequenceKey { category, date }
    }

    /// `"{prefix}-{YYMMDD}"`, the prefix every identifier of this key shares.
    pub fn base_id(&self) -> String {
        format!("{}-{}", self.category.prefix(), self.date)
    }

    /// Build the identifier for `sequence`, or `None` if it does not fit in
    /// two digits (or is zero).
    pub fn identifier(self, sequence: u32) -> Option<Identifier> {
        if (1..=MAX_SEQUENCE).contains(&sequence) {
            Some(Identifier {
                key: self,
                sequence,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_id())
    }
}

/// An allocated identifier. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    key: SequenceKey,
    sequence: u32,
}

impl Identifier {
    pub fn key(&self) -> SequenceKey {
        self.key
    }

    pub fn category(&self) -> Category {
        self.key.category
    }

    pub fn date(&self) -> DateStamp {
        self.key.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.key.base_id(), self.sequence)
    }
}

// Same order as the rendered strings.
impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.key.category.prefix(), self.key.date, self.sequence).cmp(&(
            other.key.category.prefix(),
            other.key.date,
            other.sequence,
        ))
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Identifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedIdentifier(s.to_string());

        let (prefix, rest) = s.split_once('-').ok_or_else(malformed)?;
        let category = Category::from_prefix(prefix).ok_or_else(malformed)?;
        if rest.len() != 8 || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let date = DateStamp::parse_digits(&rest[..6]).ok_or_else(malformed)?;
        let sequence: u32 = rest[6..].parse().map_err(|_| malformed())?;

        SequenceKey::new(category, date)
            .identifier(sequence)
            .ok_or_else(malformed)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
