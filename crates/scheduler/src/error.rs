/// Errors raised while parsing time slots or expanding a schedule.
///
/// Neither variant is retried internally. A `Format` error means the caller
/// should fix the slot text; an `InvalidSchedule` error rejects the whole
/// request and no sends are produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time slot format: {0}")]
    Format(String),

    #[error("invalid schedule request: {0}")]
    InvalidSchedule(String),
}
