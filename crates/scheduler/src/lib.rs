//! Survey send-time scheduling.
//!
//! [`slots`] turns the HHMM slot notation into typed [`TimeSlot`]s;
//! [`schedule`] expands a slot set over consecutive days into absolute UTC
//! send/expire pairs, drawing a random minute for range slots.

pub mod error;
pub mod format;
pub mod schedule;
pub mod slots;

pub use error::ScheduleError;
pub use format::format_vendor_timestamp;
pub use schedule::{
    local_to_utc, pending_after, schedule, schedule_with_rng, ScheduleRequest, ScheduledSend,
};
pub use slots::{
    contact_time_slots, parse, slots_from_numbered_fields, validate, ClockTime, TimeSlot, TimeSlotSet,
};
