//! Time slot parsing and validation.
//!
//! Slots are written in 24-hour HHMM integer notation: `800` is 08:00,
//! `[800, 900]` is any time between 08:00 and 09:00. A slot string such as
//! `"800,[1200,1300],2000"` is split by an explicit tokenizer; nothing is
//! ever evaluated.
//!
//! Ranges must not cross midnight: `[2350, 10]` is rejected rather than
//! treated as a wrap-around interval.

use std::fmt;

use chrono::NaiveTime;
use qs_domain::types::{RawSlot, SlotSpec};

use crate::error::ScheduleError;

/// Largest valid HHMM value.
pub const MAX_HHMM: i64 = 2359;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Clock time
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A wall-clock time of day stored as HHMM (`830` = 08:30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Validate an HHMM integer: `0..=2359` with a minute part below 60.
    pub fn from_hhmm(value: i64) -> Result<Self, ScheduleError> {
        if !(0..=MAX_HHMM).contains(&value) {
            return Err(ScheduleError::Format(format!(
                "time {value} is outside 0..={MAX_HHMM}"
            )));
        }
        if value % 100 >= 60 {
            return Err(ScheduleError::Format(format!(
                "time {value} has a minute component of {}",
                value % 100
            )));
        }
        Ok(Self(value as u16))
    }

    pub fn hhmm(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 100)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.0 % 100)
    }

    pub fn minutes_of_day(&self) -> u32 {
        self.hour() * 60 + self.minute()
    }

    /// Real-valued hours with the minute part interpolated (`830` → 8.5).
    pub fn as_hours(&self) -> f64 {
        f64::from(self.hour()) + f64::from(self.minute()) / 60.0
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slots
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One recipient scheduling preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSlot {
    /// Send at exactly this time.
    Point(ClockTime),
    /// Send at a random time in `[start, end]`; `start < end` always holds.
    Range { start: ClockTime, end: ClockTime },
}

impl TimeSlot {
    pub fn point(hhmm: i64) -> Result<Self, ScheduleError> {
        Ok(Self::Point(ClockTime::from_hhmm(hhmm)?))
    }

    pub fn range(start: i64, end: i64) -> Result<Self, ScheduleError> {
        let start = ClockTime::from_hhmm(start)?;
        let end = ClockTime::from_hhmm(end)?;
        if start >= end {
            return Err(ScheduleError::Format(format!(
                "range [{}, {}] must end after it starts (ranges may not cross midnight)",
                start.hhmm(),
                end.hhmm()
            )));
        }
        Ok(Self::Range { start, end })
    }

    /// Convert one loosely typed value, rejecting anything that is not a
    /// point or a two-element range of points.
    pub fn from_raw(raw: &RawSlot) -> Result<Self, ScheduleError> {
        match raw {
            RawSlot::Number(n) => Self::point(*n),
            RawSlot::List(items) => match items.as_slice() {
                [RawSlot::Number(start), RawSlot::Number(end)] => Self::range(*start, *end),
                _ => Err(ScheduleError::Format(format!(
                    "range {raw} must contain exactly two HHMM integers"
                ))),
            },
            RawSlot::Text(text) => Err(ScheduleError::Format(format!(
                "{text:?} is not an HHMM integer"
            ))),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(t) => write!(f, "{}", t.hhmm()),
            Self::Range { start, end } => write!(f, "[{},{}]", start.hhmm(), end.hhmm()),
        }
    }
}

/// Ordered, non-empty sequence of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlotSet(Vec<TimeSlot>);

impl TimeSlotSet {
    pub fn new(slots: Vec<TimeSlot>) -> Result<Self, ScheduleError> {
        if slots.is_empty() {
            return Err(ScheduleError::Format("no time slots given".into()));
        }
        Ok(Self(slots))
    }

    /// Convert a list of raw values, failing on the first invalid element.
    pub fn from_raw(raw: &[RawSlot]) -> Result<Self, ScheduleError> {
        let slots = raw
            .iter()
            .map(TimeSlot::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(slots)
    }

    /// Resolve the config form (string or list).
    pub fn from_spec(spec: &SlotSpec) -> Result<Self, ScheduleError> {
        match spec {
            SlotSpec::Text(text) => parse(text),
            SlotSpec::List(items) => Self::from_raw(items),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeSlot> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TimeSlot] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a TimeSlotSet {
    type Item = &'a TimeSlot;
    type IntoIter = std::slice::Iter<'a, TimeSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TimeSlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{slot}")?;
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsing & validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a slot string such as `"800,1200"` or `"[800,900],[1200,1300]"`.
pub fn parse(raw: &str) -> Result<TimeSlotSet, ScheduleError> {
    let tokens = tokenize(raw)?;
    TimeSlotSet::from_raw(&tokens)
}

/// `true` iff `slots` is non-empty and every element is a valid point or
/// range.
pub fn validate(slots: &[RawSlot]) -> bool {
    !slots.is_empty() && slots.iter().all(|s| TimeSlot::from_raw(s).is_ok())
}

/// Split a slot string on top-level commas, keeping bracketed ranges
/// together. Non-integer tokens come back as [`RawSlot::Text`] so the
/// error names the offending token.
pub fn tokenize(raw: &str) -> Result<Vec<RawSlot>, ScheduleError> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_range = false;

    for ch in raw.chars() {
        match ch {
            '[' if in_range => {
                return Err(ScheduleError::Format(format!(
                    "nested '[' in time slots {raw:?}"
                )));
            }
            '[' => {
                if !current.trim().is_empty() {
                    return Err(ScheduleError::Format(format!(
                        "unexpected '[' after {:?} in time slots {raw:?}",
                        current.trim()
                    )));
                }
                in_range = true;
                current.push(ch);
            }
            ']' if !in_range => {
                return Err(ScheduleError::Format(format!(
                    "unbalanced ']' in time slots {raw:?}"
                )));
            }
            ']' => {
                in_range = false;
                current.push(ch);
            }
            ',' if !in_range => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if in_range {
        return Err(ScheduleError::Format(format!(
            "unbalanced '[' in time slots {raw:?}"
        )));
    }
    items.push(current);

    if items.len() == 1 && items[0].trim().is_empty() {
        return Err(ScheduleError::Format("no time slots given".into()));
    }

    items.iter().map(|item| token_to_raw(item, raw)).collect()
}

fn token_to_raw(item: &str, raw: &str) -> Result<RawSlot, ScheduleError> {
    let item = item.trim();
    if item.is_empty() {
        return Err(ScheduleError::Format(format!(
            "empty entry in time slots {raw:?}"
        )));
    }
    if let Some(inner) = item.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(|| {
            ScheduleError::Format(format!("trailing text after range in {item:?}"))
        })?;
        let parts = inner
            .split(',')
            .map(|part| number_or_text(part.trim()))
            .collect();
        return Ok(RawSlot::List(parts));
    }
    Ok(number_or_text(item))
}

fn number_or_text(token: &str) -> RawSlot {
    match token.parse::<i64>() {
        Ok(n) => RawSlot::Number(n),
        Err(_) => RawSlot::Text(token.to_owned()),
    }
}

/// Slot set of a contact's embedded data: the `TimeSlots` string when it is
/// present and non-blank, otherwise the numbered `TimeX` fields.
pub fn contact_time_slots<'a, I>(fields: I) -> Result<TimeSlotSet, ScheduleError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let fields: Vec<(&str, &str)> = fields.into_iter().collect();
    match fields.iter().find(|(key, _)| *key == "TimeSlots") {
        Some((_, raw)) if !raw.trim().is_empty() => parse(raw),
        _ => slots_from_numbered_fields(fields),
    }
}

/// Collect point slots from numbered contact fields (`Time1`, `Time2`, …)
/// for contacts that carry no `TimeSlots` field. Keys are taken in sorted
/// order; `TimeZone` and `TimeSlots` are not slots.
pub fn slots_from_numbered_fields<'a, I>(fields: I) -> Result<TimeSlotSet, ScheduleError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut numbered: Vec<(&str, &str)> = fields
        .into_iter()
        .filter(|(key, _)| {
            key.starts_with("Time") && !key.contains("TimeZone") && *key != "TimeSlots"
        })
        .collect();
    numbered.sort_by(|a, b| a.0.cmp(b.0));

    let raw: Vec<RawSlot> = numbered
        .iter()
        .map(|(_, value)| number_or_text(value.trim()))
        .collect();
    TimeSlotSet::from_raw(&raw)
}
