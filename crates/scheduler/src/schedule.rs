//! Expansion of time slots × days into absolute UTC send/expire pairs.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;
use serde::Serialize;

use qs_domain::config::EmbeddedDataConfig;
use qs_domain::trace::TraceEvent;
use qs_domain::types::parse_timezone;

use crate::error::ScheduleError;
use crate::format::serialize_vendor;
use crate::slots::{TimeSlot, TimeSlotSet};

/// Default survey link lifetime.
pub const DEFAULT_EXPIRE_MINUTES: u32 = 60;

/// How far back the gap resolver searches for the pre-transition offset.
const GAP_PROBE_STEP_MINUTES: i64 = 30;
const GAP_PROBE_LIMIT: i64 = 48;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / result types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything needed to expand one recipient's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    /// First local calendar day.
    pub start_date: NaiveDate,
    pub time_slots: TimeSlotSet,
    /// Number of consecutive days; must be at least 1.
    pub num_days: u32,
    /// IANA zone the slots are expressed in.
    pub time_zone: String,
    pub expire_minutes: u32,
}

impl ScheduleRequest {
    pub fn new(
        start_date: NaiveDate,
        time_slots: TimeSlotSet,
        num_days: u32,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            start_date,
            time_slots,
            num_days,
            time_zone: time_zone.into(),
            expire_minutes: DEFAULT_EXPIRE_MINUTES,
        }
    }

    pub fn with_expire_minutes(mut self, minutes: u32) -> Self {
        self.expire_minutes = minutes;
        self
    }

    /// Build a request from the `embedded_data` config section.
    ///
    /// `fallback_tz` is used when the section carries no `TimeZone`.
    pub fn from_embedded(
        embedded: &EmbeddedDataConfig,
        fallback_tz: Option<&str>,
    ) -> Result<Self, ScheduleError> {
        let start_date = embedded
            .start_date
            .ok_or_else(|| ScheduleError::InvalidSchedule("StartDate is not set".into()))?;
        let spec = embedded
            .time_slots
            .as_ref()
            .ok_or_else(|| ScheduleError::InvalidSchedule("TimeSlots is not set".into()))?;
        let time_slots = TimeSlotSet::from_spec(spec)
            .map_err(|e| ScheduleError::InvalidSchedule(e.to_string()))?;
        let num_days = embedded
            .num_days
            .ok_or_else(|| ScheduleError::InvalidSchedule("NumDays is not set".into()))?;
        let time_zone = embedded
            .time_zone
            .as_deref()
            .or(fallback_tz)
            .ok_or_else(|| ScheduleError::InvalidSchedule("TimeZone is not set".into()))?;

        Ok(Self::new(start_date, time_slots, num_days, time_zone)
            .with_expire_minutes(embedded.expire_minutes))
    }
}

/// One concrete send, both instants in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledSend {
    #[serde(rename = "sendDate", serialize_with = "serialize_vendor")]
    pub send_time_utc: DateTime<Utc>,
    #[serde(rename = "expirationDate", serialize_with = "serialize_vendor")]
    pub expire_time_utc: DateTime<Utc>,
}

impl ScheduledSend {
    /// Whether the send is still strictly ahead of `now`.
    pub fn is_future(&self, now: DateTime<Utc>) -> bool {
        self.send_time_utc > now
    }
}

/// Sends that have not happened yet, order preserved.
pub fn pending_after(sends: &[ScheduledSend], now: DateTime<Utc>) -> Vec<ScheduledSend> {
    sends.iter().copied().filter(|s| s.is_future(now)).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Expand `request` using the thread-local RNG for range jitter.
pub fn schedule(request: &ScheduleRequest) -> Result<Vec<ScheduledSend>, ScheduleError> {
    schedule_with_rng(request, &mut rand::thread_rng())
}

/// Expand `request` into `num_days * |time_slots|` sends, day-major then
/// slot order. Range slots draw a clock time from `rng`.
///
/// Either every send is produced or an error is returned.
pub fn schedule_with_rng<R: Rng + ?Sized>(
    request: &ScheduleRequest,
    rng: &mut R,
) -> Result<Vec<ScheduledSend>, ScheduleError> {
    if request.num_days == 0 {
        return Err(ScheduleError::InvalidSchedule(
            "number of days must be at least 1".into(),
        ));
    }
    if request.time_slots.is_empty() {
        return Err(ScheduleError::InvalidSchedule("no time slots given".into()));
    }
    let tz = parse_timezone(&request.time_zone).map_err(ScheduleError::InvalidSchedule)?;
    let expire = Duration::minutes(i64::from(request.expire_minutes));

    let total = request.num_days as usize * request.time_slots.len();
    let mut sends = Vec::with_capacity(total);

    for day in 0..request.num_days {
        let date = request
            .start_date
            .checked_add_days(Days::new(u64::from(day)))
            .ok_or_else(|| {
                ScheduleError::InvalidSchedule(format!(
                    "{} + {day} days is out of range",
                    request.start_date
                ))
            })?;

        for slot in &request.time_slots {
            let clock = resolve_clock_time(slot, rng)?;
            let send_time_utc = local_to_utc(tz, date.and_time(clock))?;
            tracing::debug!(
                %date,
                %slot,
                local = %clock,
                send = %send_time_utc,
                "resolved send time"
            );
            sends.push(ScheduledSend {
                send_time_utc,
                expire_time_utc: send_time_utc + expire,
            });
        }
    }

    TraceEvent::SendsScheduled {
        time_zone: request.time_zone.clone(),
        num_days: request.num_days,
        slots: request.time_slots.len(),
        sends: sends.len(),
    }
    .emit();

    Ok(sends)
}

/// Pick the wall-clock time for one slot.
///
/// Ranges draw uniformly over real-valued hours, truncated to whole minutes
/// and kept inside `[start, end]`.
fn resolve_clock_time<R: Rng + ?Sized>(
    slot: &TimeSlot,
    rng: &mut R,
) -> Result<NaiveTime, ScheduleError> {
    let minutes = match slot {
        TimeSlot::Point(t) => t.minutes_of_day(),
        TimeSlot::Range { start, end } => {
            let hours = rng.gen_range(start.as_hours()..=end.as_hours());
            let drawn = (hours * 60.0).floor() as u32;
            drawn.clamp(start.minutes_of_day(), end.minutes_of_day())
        }
    };
    NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)
        .ok_or_else(|| ScheduleError::InvalidSchedule(format!("slot {slot} has no clock time")))
}

/// Convert a local wall-clock time to UTC.
///
/// - Fall-back overlaps: the earliest (pre-transition) mapping is chosen.
/// - Spring-forward gaps: the offset in force before the gap is applied, so
///   02:30 on a US/Eastern spring-forward day becomes 07:30 UTC.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, ScheduleError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            // Walk back to the last local time that exists, then carry the
            // walked distance forward under that offset.
            for step in 1..=GAP_PROBE_LIMIT {
                let back = Duration::minutes(GAP_PROBE_STEP_MINUTES * step);
                if let Some(before) = tz.from_local_datetime(&(local - back)).earliest() {
                    return Ok(before.with_timezone(&Utc) + back);
                }
            }
            Err(ScheduleError::InvalidSchedule(format!(
                "local time {local} does not exist in {tz}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::parse;
    use chrono::Timelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(slots: &str, days: u32, tz: &str) -> ScheduleRequest {
        ScheduleRequest::new(date(2024, 6, 3), parse(slots).unwrap(), days, tz)
    }

    #[test]
    fn chicago_points_convert_to_utc() {
        let sends = schedule(&request("800,1200", 1, "America/Chicago")).unwrap();
        assert_eq!(sends.len(), 2);
        // CDT is UTC-5
        assert_eq!(sends[0].send_time_utc, Utc.with_ymd_and_hms(2024, 6, 3, 13, 0, 0).unwrap());
        assert_eq!(sends[1].send_time_utc, Utc.with_ymd_and_hms(2024, 6, 3, 17, 0, 0).unwrap());
    }

    #[test]
    fn expiry_offset_follows_request() {
        let req = request("930", 2, "UTC").with_expire_minutes(45);
        for send in schedule(&req).unwrap() {
            assert_eq!(send.expire_time_utc - send.send_time_utc, Duration::minutes(45));
        }
    }

    #[test]
    fn zero_days_is_rejected() {
        let err = schedule(&request("800", 0, "UTC")).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidSchedule(_)));
    }

    #[test]
    fn unknown_zone_is_rejected_not_defaulted() {
        let err = schedule(&request("800", 1, "Mars/Olympus")).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidSchedule(msg) if msg.contains("Mars/Olympus")));
    }

    #[test]
    fn range_draw_stays_inside_slot() {
        let mut rng = StdRng::seed_from_u64(7);
        let req = request("[830,845]", 50, "UTC");
        for send in schedule_with_rng(&req, &mut rng).unwrap() {
            let minutes = send.send_time_utc.hour() * 60 + send.send_time_utc.minute();
            assert!((510..=525).contains(&minutes), "{minutes}");
            assert_eq!(send.send_time_utc.second(), 0);
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let req = request("[800,900],[1300,1700]", 3, "Europe/London");
        let a = schedule_with_rng(&req, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = schedule_with_rng(&req, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn spring_forward_gap_uses_pre_transition_offset() {
        let tz = parse_timezone("US/Eastern").unwrap();
        let local = date(2024, 3, 10).and_hms_opt(2, 30, 0).unwrap();
        assert_eq!(
            local_to_utc(tz, local).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap()
        );
    }

    #[test]
    fn fall_back_overlap_uses_earliest_instant() {
        let tz = parse_timezone("US/Eastern").unwrap();
        let local = date(2024, 11, 3).and_hms_opt(1, 30, 0).unwrap();
        // 01:30 EDT
        assert_eq!(
            local_to_utc(tz, local).unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()
        );
    }

    #[test]
    fn pending_after_drops_past_sends() {
        let sends = schedule(&request("800,1200,1600", 1, "UTC")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let pending = pending_after(&sends, now);
        assert_eq!(pending, vec![sends[2]]);
    }

    #[test]
    fn scheduled_send_serializes_in_vendor_format() {
        let sends = schedule(&request("800", 1, "UTC")).unwrap();
        let json = serde_json::to_value(sends[0]).unwrap();
        assert_eq!(json["sendDate"], "2024-06-03T08:00:00Z");
        assert_eq!(json["expirationDate"], "2024-06-03T09:00:00Z");
    }

    #[test]
    fn from_embedded_requires_fields_and_uses_fallback_zone() {
        let mut embedded = EmbeddedDataConfig::default();
        assert!(ScheduleRequest::from_embedded(&embedded, Some("UTC")).is_err());

        embedded.start_date = Some(date(2025, 1, 6));
        embedded.time_slots = Some(qs_domain::types::SlotSpec::Text("800,[1200,1300]".into()));
        embedded.num_days = Some(2);
        let req = ScheduleRequest::from_embedded(&embedded, Some("America/Chicago")).unwrap();
        assert_eq!(req.time_zone, "America/Chicago");
        assert_eq!(req.expire_minutes, DEFAULT_EXPIRE_MINUTES);
        assert_eq!(req.time_slots.len(), 2);

        assert!(ScheduleRequest::from_embedded(&embedded, None).is_err());
    }
}
