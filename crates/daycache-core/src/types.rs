//! Core data types for day-keyed caching.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Entity`] - Subject key of a cached series (e.g. a ticker symbol)
//! - [`Day`] - Calendar date used as the cache partition key
//! - [`DayRange`] - Validated inclusive range of days
//! - [`Item`] - One day-stamped item returned by a remote source
//! - [`Record`] - Cached payload sequence for one (entity, day)
//! - [`FetchRequest`] - Description of one remote call

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{DataError, Result};

/// A calendar date with no time component.
pub type Day = NaiveDate;

/// Parses a `YYYY-MM-DD` day.
///
/// # Errors
/// Returns [`DataError::InvalidDay`] if the value is not a valid date.
pub fn parse_day(s: &str) -> Result<Day> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| DataError::InvalidDay(format!("{s:?}: {e}")))
}

/// Subject key of a cached series.
///
/// Entities are case-sensitive and never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Entity(String);

impl Entity {
    /// Creates a new entity, rejecting empty or whitespace-only keys.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] for a blank key.
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(DataError::InvalidParameter(
                "entity must not be empty".to_string(),
            ));
        }
        Ok(Self(s))
    }

    /// Returns the entity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Entity {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Entity {
    type Error = DataError;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Entity {
    type Error = DataError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Entity> for String {
    fn from(entity: Entity) -> Self {
        entity.0
    }
}

/// Inclusive range of days, guaranteed to have `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DayRange {
    start: Day,
    end: Day,
}

impl DayRange {
    /// Creates a new range covering `start..=end`.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidRange`] if `start` is after `end`.
    pub fn new(start: Day, end: Day) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range covering a single day.
    #[must_use]
    pub const fn single(day: Day) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Parses both endpoints as `YYYY-MM-DD` and validates the range.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidDay`] or [`DataError::InvalidRange`].
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    /// First day of the range.
    #[must_use]
    pub const fn start(&self) -> Day {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end(&self) -> Day {
        self.end
    }

    /// Number of days in the range (always at least 1).
    #[must_use]
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Always false; a range contains at least one day.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if `day` falls inside the range.
    #[must_use]
    pub fn contains(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Iterates every day in the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// One item returned by a remote source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Day the item belongs to.
    pub day: Day,
    /// Opaque payload.
    pub payload: Value,
}

impl Item {
    /// Creates a new item.
    #[must_use]
    pub const fn new(day: Day, payload: Value) -> Self {
        Self { day, payload }
    }
}

/// Cached payload sequence for one (entity, day).
///
/// An empty record means "fetched, nothing found", which is distinct from
/// having no record at all.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<Value>);

impl Record {
    /// Creates a record from its payloads, preserving order.
    #[must_use]
    pub const fn new(items: Vec<Value>) -> Self {
        Self(items)
    }

    /// Creates an empty record.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns the payloads in order.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.0
    }

    /// Consumes the record and returns its payloads.
    #[must_use]
    pub fn into_items(self) -> Vec<Value> {
        self.0
    }

    /// Number of payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the day was fetched but had nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes the record for storage.
    ///
    /// # Errors
    /// Returns [`DataError::Codec`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| DataError::Codec(e.to_string()))
    }

    /// Deserializes a stored record.
    ///
    /// # Errors
    /// Returns [`DataError::Codec`] if the bytes are not a record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| DataError::Codec(e.to_string()))
    }
}

impl From<Vec<Value>> for Record {
    fn from(items: Vec<Value>) -> Self {
        Self(items)
    }
}

/// Description of one remote call: an entity over a day range.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    /// Entity to fetch.
    pub entity: Entity,
    /// Days to fetch.
    pub range: DayRange,
}

impl FetchRequest {
    /// Creates a new request.
    #[must_use]
    pub const fn new(entity: Entity, range: DayRange) -> Self {
        Self { entity, range }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> Day {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_entity_is_case_sensitive() {
        let lower = Entity::new("acme").unwrap();
        let upper = Entity::new("ACME").unwrap();
        assert_ne!(lower, upper);
        assert_eq!(lower.as_str(), "acme");
    }

    #[test]
    fn test_entity_rejects_blank() {
        assert!(matches!(
            Entity::new(""),
            Err(DataError::InvalidParameter(_))
        ));
        assert!("   ".parse::<Entity>().is_err());
        assert!(serde_json::from_str::<Entity>("\"\"").is_err());
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2024-02-29").unwrap(), day(2024, 2, 29));
        assert!(matches!(
            parse_day("2023-02-29"),
            Err(DataError::InvalidDay(_))
        ));
        assert!(parse_day("01/02/2024").is_err());
    }

    #[test]
    fn test_day_range_validation() {
        let err = DayRange::new(day(2024, 1, 3), day(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, DataError::InvalidRange { .. }));

        let range = DayRange::new(day(2024, 1, 1), day(2024, 1, 1)).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range, DayRange::single(day(2024, 1, 1)));
    }

    #[test]
    fn test_day_range_iterates_inclusively_across_month_end() {
        let range = DayRange::parse("2024-01-30", "2024-02-02").unwrap();
        let days: Vec<Day> = range.days().collect();

        assert_eq!(
            days,
            vec![
                day(2024, 1, 30),
                day(2024, 1, 31),
                day(2024, 2, 1),
                day(2024, 2, 2)
            ]
        );
        assert_eq!(range.len(), 4);
        assert!(range.contains(day(2024, 1, 31)));
        assert!(!range.contains(day(2024, 2, 3)));
    }

    #[test]
    fn test_empty_record_is_not_absent() {
        let empty = Record::empty();
        let bytes = empty.to_bytes().unwrap();
        assert_eq!(bytes, b"[]");

        let decoded = Record::from_bytes(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_record_preserves_item_order() {
        let record = Record::new(vec![json!({"title": "b"}), json!({"title": "a"})]);
        let decoded = Record::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.items()[0]["title"], "b");
    }

    #[test]
    fn test_record_rejects_garbage() {
        assert!(matches!(
            Record::from_bytes(b"{not json"),
            Err(DataError::Codec(_))
        ));
    }
}
