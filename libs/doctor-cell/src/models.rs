// libs/doctor-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// ==============================================================================
// SLOT KEY VALUE TYPES
// ==============================================================================

/// Calendar-day key of a doctor's slot map.
///
/// The stored form is `"{day}_{month}_{year}"` with unpadded decimals and a
/// 1-based month (`"5_3_2025"` for March 5, 2025). That exact shape is what
/// existing doctor records carry, so it must survive round-trips bit for bit;
/// in memory the key is a plain value type so equality never depends on how a
/// string was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotDate {
    year: i32,
    month: u32,
    day: u32,
}

impl SlotDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, SlotKeyError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|_| Self { year, month, day })
            .ok_or_else(|| SlotKeyError(format!("not a calendar date: {}-{}-{}", year, month, day)))
    }
}

impl From<NaiveDate> for SlotDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for SlotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.day, self.month, self.year)
    }
}

impl FromStr for SlotDate {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('_');
        let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(d), Some(m), Some(y), None) => (d, m, y),
            _ => return Err(SlotKeyError(format!("malformed date key: {:?}", s))),
        };

        let day: u32 = day
            .parse()
            .map_err(|_| SlotKeyError(format!("malformed day in date key: {:?}", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| SlotKeyError(format!("malformed month in date key: {:?}", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| SlotKeyError(format!("malformed year in date key: {:?}", s)))?;

        Self::new(year, month, day)
    }
}

impl Serialize for SlotDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-hour slot label, stored as zero-padded 12-hour `"HH:MM AM/PM"`
/// (`"02:30 PM"`), locale independent. Ordering follows the time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_hms(hour: u32, minute: u32) -> Result<Self, SlotKeyError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| SlotKeyError(format!("not a time of day: {}:{}", hour, minute)))
    }
}

impl From<NaiveTime> for SlotTime {
    fn from(time: NaiveTime) -> Self {
        // Seconds never appear in the stored form; drop them on the way in.
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap())
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%I:%M %p"))
    }
}

impl FromStr for SlotTime {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%I:%M %p")
            .map(Self)
            .map_err(|_| SlotKeyError(format!("malformed time label: {:?}", s)))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SlotKeyError(pub String);

// ==============================================================================
// SLOT MAP
// ==============================================================================

/// A doctor's booked slots, keyed by day. Serializes to the stored JSON shape
/// `{"5_3_2025": ["10:00 AM", "02:30 PM"]}`.
///
/// Mutation happens only on the booking path: `reserve` on commit, `release`
/// on cancellation. A day whose last entry is released keeps its (empty) key;
/// membership tests are unaffected and existing records look the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotMap(HashMap<SlotDate, Vec<SlotTime>>);

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_booked(&self, date: &SlotDate, time: &SlotTime) -> bool {
        self.0
            .get(date)
            .map(|times| times.contains(time))
            .unwrap_or(false)
    }

    /// Record a booking. Returns false (and leaves the map untouched) when
    /// the slot is already taken.
    pub fn reserve(&mut self, date: SlotDate, time: SlotTime) -> bool {
        let times = self.0.entry(date).or_default();
        if times.contains(&time) {
            return false;
        }
        times.push(time);
        true
    }

    /// Drop a booking. Releasing a slot that was never reserved is a no-op.
    pub fn release(&mut self, date: &SlotDate, time: &SlotTime) {
        if let Some(times) = self.0.get_mut(date) {
            times.retain(|t| t != time);
        }
    }

    pub fn times_for(&self, date: &SlotDate) -> &[SlotTime] {
        self.0.get(date).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub line1: String,
    pub line2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    /// Consultation fee in minor currency units.
    pub fees: i64,
    /// Whether the doctor is accepting bookings at all.
    pub available: bool,
    pub address: Address,
    pub image_url: Option<String>,
    pub slots_booked: SlotMap,
    /// Monotonic token for conditional slot-map writes; the store rejects a
    /// write whose observed version is stale.
    pub slots_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDoctorRequest {
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: i64,
    pub address: Address,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub fees: Option<i64>,
    pub about: Option<String>,
    pub address: Option<Address>,
    pub available: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeAvailabilityRequest {
    pub available: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Appointment slot already booked")]
    SlotTaken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
