//! When the next run is due.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::{Result, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
	/// Every `minutes`, starting immediately.
	Interval { minutes: u32 },
	/// At each listed minute past the hour, on the wall clock.
	ClockMinutes(BTreeSet<u8>),
}

impl TriggerSpec {
	pub fn interval(minutes: u32) -> Self {
		TriggerSpec::Interval { minutes }
	}

	/// `:00` and `:30`.
	pub fn half_hourly() -> Self {
		TriggerSpec::ClockMinutes([0, 30].into_iter().collect())
	}

	/// `:00`, `:15`, `:30` and `:45`.
	pub fn quarterly() -> Self {
		TriggerSpec::ClockMinutes([0, 15, 30, 45].into_iter().collect())
	}

	pub fn validate(&self) -> Result<()> {
		match self {
			TriggerSpec::Interval { minutes: 0 } => Err(RuntimeError::InvalidTrigger("interval of zero minutes".into())),
			TriggerSpec::ClockMinutes(minutes) if minutes.is_empty() => {
				Err(RuntimeError::InvalidTrigger("no clock minutes".into()))
			}
			TriggerSpec::ClockMinutes(minutes) => match minutes.iter().find(|m| **m >= 60) {
				Some(bad) => Err(RuntimeError::InvalidTrigger(format!("minute {bad} is past the hour"))),
				None => Ok(()),
			},
			TriggerSpec::Interval { .. } => Ok(()),
		}
	}

	/// Whether a run happens as soon as the trigger is armed.
	pub fn fires_immediately(&self) -> bool {
		matches!(self, TriggerSpec::Interval { .. })
	}

	/// Time from `now` until the next run, strictly after `now`.
	pub fn next_delay(&self, now: NaiveDateTime) -> Duration {
		match self {
			TriggerSpec::Interval { minutes } => Duration::from_secs(u64::from(*minutes) * 60),
			TriggerSpec::ClockMinutes(minutes) => {
				let Some(start) = now.with_second(0).and_then(|t| t.with_nanosecond(0)) else {
					return Duration::from_secs(60);
				};
				(1..=60)
					.map(|step| start + TimeDelta::minutes(step))
					.find(|candidate| minutes.contains(&(candidate.minute() as u8)))
					.and_then(|next| (next - now).to_std().ok())
					.unwrap_or(Duration::from_secs(60))
			}
		}
	}
}

impl fmt::Display for TriggerSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TriggerSpec::Interval { minutes } => write!(f, "every {minutes} min"),
			TriggerSpec::ClockMinutes(minutes) => {
				let list: Vec<String> = minutes.iter().map(|m| format!(":{m:02}")).collect();
				write!(f, "at {}", list.join(", "))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use super::*;

	fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
		NaiveDate::from_ymd_opt(2026, 1, 30)
			.unwrap()
			.and_hms_opt(hour, minute, second)
			.unwrap()
	}

	#[test]
	fn half_hourly_waits_for_next_mark() {
		let spec = TriggerSpec::half_hourly();
		assert_eq!(spec.next_delay(at(14, 10, 0)), Duration::from_secs(20 * 60));
		assert_eq!(spec.next_delay(at(14, 45, 0)), Duration::from_secs(15 * 60));
	}

	#[test]
	fn clock_minutes_count_seconds_and_skip_current_mark() {
		let spec = TriggerSpec::quarterly();
		assert_eq!(spec.next_delay(at(9, 14, 30)), Duration::from_secs(30));
		assert_eq!(spec.next_delay(at(9, 15, 0)), Duration::from_secs(15 * 60));
		assert_eq!(spec.next_delay(at(23, 50, 0)), Duration::from_secs(10 * 60));
	}

	#[test]
	fn interval_is_fixed_and_fires_immediately() {
		let spec = TriggerSpec::interval(30);
		assert_eq!(spec.next_delay(at(14, 10, 0)), Duration::from_secs(1800));
		assert!(spec.fires_immediately());
		assert!(!TriggerSpec::half_hourly().fires_immediately());
	}

	#[test]
	fn rejects_empty_or_out_of_range() {
		assert!(TriggerSpec::interval(0).validate().is_err());
		assert!(TriggerSpec::ClockMinutes(BTreeSet::new()).validate().is_err());
		assert!(TriggerSpec::ClockMinutes([61].into_iter().collect()).validate().is_err());
		assert!(TriggerSpec::quarterly().validate().is_ok());
	}

	#[test]
	fn displays_schedule() {
		assert_eq!(TriggerSpec::half_hourly().to_string(), "at :00, :30");
		assert_eq!(TriggerSpec::interval(5).to_string(), "every 5 min");
	}
}
