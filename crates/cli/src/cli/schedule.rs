use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use qs_domain::config::Config;
use qs_scheduler::{
    contact_time_slots, format_vendor_timestamp, parse, pending_after, schedule, ScheduleRequest,
    ScheduledSend, TimeSlotSet,
};

use super::ScheduleArgs;

/// One contact's embedded data with scalar values rendered as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields(BTreeMap<String, String>);

impl ContactFields {
    /// Parse a YAML (or JSON) mapping. Non-scalar values are ignored.
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let map: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(raw)?;
        Ok(Self(
            map.into_iter()
                .filter_map(|(key, value)| scalar(value).map(|v| (key, v)))
                .collect(),
        ))
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading contact fields {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("parsing contact fields {}", path.display()))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn start_date(&self) -> anyhow::Result<Option<NaiveDate>> {
        self.get("StartDate")
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("contact StartDate {raw:?} is not YYYY-MM-DD"))
            })
            .transpose()
    }

    fn num_days(&self) -> anyhow::Result<Option<u32>> {
        self.get("NumDays")
            .map(|raw| {
                raw.parse::<u32>()
                    .with_context(|| format!("contact NumDays {raw:?} is not a day count"))
            })
            .transpose()
    }

    /// `None` when the contact carries neither `TimeSlots` nor `TimeX` fields.
    fn time_slots(&self) -> Option<anyhow::Result<TimeSlotSet>> {
        let carries_slots = self
            .0
            .keys()
            .any(|key| key.starts_with("Time") && key != "TimeZone");
        carries_slots.then(|| {
            contact_time_slots(self.0.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .map_err(anyhow::Error::from)
        })
    }
}

fn scalar(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Merge command-line overrides, the contact's fields and the
/// `embedded_data` defaults, in that order of precedence.
pub fn build_request(
    config: &Config,
    contact: Option<&ContactFields>,
    args: &ScheduleArgs,
) -> anyhow::Result<ScheduleRequest> {
    let embedded = &config.embedded_data;
    let contact_start = contact.map(ContactFields::start_date).transpose()?.flatten();
    let contact_days = contact.map(ContactFields::num_days).transpose()?.flatten();
    let contact_slots = contact.and_then(ContactFields::time_slots).transpose()?;
    let contact_tz = contact.and_then(|c| c.get("TimeZone"));

    let start_date = args
        .start_date
        .or(contact_start)
        .or(embedded.start_date)
        .context("no start date: pass --start-date or set embedded_data.StartDate")?;
    let time_slots = match (&args.slots, contact_slots, &embedded.time_slots) {
        (Some(raw), _, _) => parse(raw)?,
        (None, Some(set), _) => set,
        (None, None, Some(spec)) => TimeSlotSet::from_spec(spec)?,
        (None, None, None) => {
            anyhow::bail!("no time slots: pass --slots or set embedded_data.TimeSlots")
        }
    };
    let num_days = args
        .days
        .or(contact_days)
        .or(embedded.num_days)
        .context("no day count: pass --days or set embedded_data.NumDays")?;
    let time_zone = args
        .tz
        .as_deref()
        .or(contact_tz)
        .or(config.default_time_zone())
        .context("no timezone: pass --tz or set embedded_data.TimeZone")?;

    Ok(
        ScheduleRequest::new(start_date, time_slots, num_days, time_zone)
            .with_expire_minutes(args.expire_minutes.unwrap_or(embedded.expire_minutes)),
    )
}

pub fn run(config: &Config, args: &ScheduleArgs) -> anyhow::Result<()> {
    let contact = args
        .contact
        .as_deref()
        .map(ContactFields::from_path)
        .transpose()?;
    let request = build_request(config, contact.as_ref(), args)?;
    let mut sends = schedule(&request)?;
    if args.future_only {
        sends = pending_after(&sends, Utc::now());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sends)?);
        return Ok(());
    }

    let tz = qs_domain::types::parse_timezone(&request.time_zone).map_err(anyhow::Error::msg)?;
    println!(
        "{} send(s), {} day(s) from {} in {} (slots {})",
        sends.len(),
        request.num_days,
        request.start_date,
        request.time_zone,
        request.time_slots
    );
    for (i, send) in sends.iter().enumerate() {
        println!("{:>4}  {}", i + 1, row(send, tz));
    }
    Ok(())
}

fn row(send: &ScheduledSend, tz: chrono_tz::Tz) -> String {
    format!(
        "{}  {}  (local {})",
        format_vendor_timestamp(send.send_time_utc),
        format_vendor_timestamp(send.expire_time_utc),
        send.send_time_utc.with_timezone(&tz).format("%a %Y-%m-%d %H:%M %Z")
    )
}
