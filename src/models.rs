use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

use crate::errors::{SmokeError, SmokeResult};

pub const SUNRISE_SUNSET: &str = "sunrise-sunset";
pub const PVWATTS: &str = "pvwatts";

pub fn default_data_types() -> Vec<String> {
	vec![SUNRISE_SUNSET.to_string(), PVWATTS.to_string()]
}

/// Solar installation config as accepted by `POST /config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarConfig {
	pub panel_count: u32,
	pub panel_output_watts: u32,
	pub system_capacity_kw: f64,
	pub panel_tilt: u32,
	pub panel_azimuth: u32,
	pub latitude: f64,
	pub longitude: f64,
}

impl SolarConfig {
	/// The fixture written during the round-trip check.
	pub fn sample() -> Self {
		Self {
			panel_count: 20,
			panel_output_watts: 400,
			system_capacity_kw: 8.0,
			panel_tilt: 20,
			panel_azimuth: 180,
			latitude: 37.7749,
			longitude: -122.4194,
		}
	}
}

/// The subset of a stored config the backfill check needs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
	pub latitude: f64,
	pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
	pub start: Date,
	pub end: Date,
}

impl DateRange {
	/// Window ending on `end` and starting `days` earlier, both inclusive.
	pub fn trailing(end: Date, days: u32) -> SmokeResult<Self> {
		let start = end
			.checked_sub(Duration::days(i64::from(days)))
			.ok_or_else(|| SmokeError::DateRange(format!("{} days before {} is out of range", days, end)))?;
		Ok(Self { start, end })
	}

	pub fn ending_today(days: u32) -> SmokeResult<Self> {
		Self::trailing(OffsetDateTime::now_utc().date(), days)
	}

	pub fn days_inclusive(&self) -> i64 {
		(self.end - self.start).whole_days() + 1
	}

	pub fn start_param(&self) -> SmokeResult<String> {
		iso_date(self.start)
	}

	pub fn end_param(&self) -> SmokeResult<String> {
		iso_date(self.end)
	}
}

fn iso_date(date: Date) -> SmokeResult<String> {
	Ok(date.format(format_description!("[year]-[month]-[day]"))?)
}
