use std::fmt;

use reqwest::StatusCode;
use serde::{Serialize, Serializer};

use crate::client::{Reply, WorkerClient};
use crate::config::SmokeConfig;
use crate::errors::{excerpt, SmokeError, SmokeResult};
use crate::models::{Coordinates, DateRange, SolarConfig};
use crate::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
	AdminAuth,
	ConfigRoundTrip,
	DataStatus,
	Backfill,
	RefreshOtherData,
	OpenApi,
}

impl Check {
	pub fn slug(&self) -> &'static str {
		match self {
			Check::AdminAuth => "admin-auth",
			Check::ConfigRoundTrip => "config-round-trip",
			Check::DataStatus => "data-status",
			Check::Backfill => "backfill",
			Check::RefreshOtherData => "refresh-other-data",
			Check::OpenApi => "openapi",
		}
	}

	pub fn title(&self) -> &'static str {
		match self {
			Check::AdminAuth => "admin login",
			Check::ConfigRoundTrip => "/config endpoints",
			Check::DataStatus => "/data-status endpoints",
			Check::Backfill => "backfill endpoints",
			Check::RefreshOtherData => "/refresh/other-data",
			Check::OpenApi => "/openapi.json",
		}
	}

	/// Checks in run order. The OpenAPI probe is opt-in and always last.
	pub fn battery(probe_openapi: bool) -> Vec<Check> {
		let mut checks = vec![
			Check::AdminAuth,
			Check::ConfigRoundTrip,
			Check::DataStatus,
			Check::Backfill,
			Check::RefreshOtherData,
		];
		if probe_openapi {
			checks.push(Check::OpenApi);
		}
		checks
	}
}

impl fmt::Display for Check {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.slug())
	}
}

impl Serialize for Check {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.slug())
	}
}

fn expect_status(check: Check, reply: &Reply, expected: &[StatusCode]) -> SmokeResult<()> {
	if expected.contains(&reply.status) {
		return Ok(());
	}
	let expected = expected.iter().map(|s| s.as_u16().to_string()).collect::<Vec<_>>().join(" or ");
	Err(SmokeError::UnexpectedStatus {
		check,
		request: reply.request.clone(),
		expected,
		actual: reply.status.as_u16(),
		body: excerpt(&reply.body),
	})
}

fn expect_same_number(check: Check, field: &'static str, found: Option<&serde_json::Value>, expected: f64) -> SmokeResult<()> {
	// 20 and 20.0 are the same panel count.
	match found.and_then(|v| v.as_f64()) {
		Some(actual) if actual == expected => Ok(()),
		_ => Err(SmokeError::FieldMismatch {
			check,
			field,
			expected: expected.to_string(),
			actual: found.map(|v| v.to_string()).unwrap_or_else(|| "missing".into()),
		}),
	}
}

fn number_field(check: Check, stored: &serde_json::Value, field: &'static str) -> SmokeResult<f64> {
	let found = stored.get(field);
	found.and_then(|v| v.as_f64()).ok_or_else(|| SmokeError::FieldMismatch {
		check,
		field,
		expected: "a number".into(),
		actual: found.map(|v| v.to_string()).unwrap_or_else(|| "missing".into()),
	})
}

/// Runs the battery against one worker, stopping at the first failure.
pub struct Suite {
	client: WorkerClient,
	config: SmokeConfig,
	fixture: SolarConfig,
	window: DateRange,
}

impl Suite {
	pub fn new(config: SmokeConfig) -> SmokeResult<Self> {
		let window = DateRange::ending_today(config.backfill_days)?;
		Self::with_window(config, window)
	}

	pub fn with_window(config: SmokeConfig, window: DateRange) -> SmokeResult<Self> {
		let client = WorkerClient::new(&config)?;
		Ok(Self { client, config, fixture: SolarConfig::sample(), window })
	}

	pub fn base_url(&self) -> &str {
		self.client.base_url()
	}

	/// Runs every check in order. The report keeps the passed steps even when this returns an error.
	pub async fn run(&self, report: &mut Report) -> SmokeResult<()> {
		let outcome = self.run_all(report).await;
		if let Err(err) = &outcome {
			report.fail(err);
		}
		outcome
	}

	async fn run_all(&self, report: &mut Report) -> SmokeResult<()> {
		for check in Check::battery(self.config.probe_openapi) {
			report.begin(check);
			self.run_check(check, report).await?;
		}
		Ok(())
	}

	pub async fn run_check(&self, check: Check, report: &mut Report) -> SmokeResult<()> {
		match check {
			Check::AdminAuth => self.admin_auth(report).await,
			Check::ConfigRoundTrip => self.config_round_trip(report).await,
			Check::DataStatus => self.data_status(report).await,
			Check::Backfill => self.backfill(report).await,
			Check::RefreshOtherData => self.refresh_other_data(report).await,
			Check::OpenApi => self.openapi(report).await,
		}
	}

	async fn admin_auth(&self, report: &mut Report) -> SmokeResult<()> {
		let check = Check::AdminAuth;
		let reply = self.client.post_config_anonymous(&serde_json::json!({})).await?;
		expect_status(check, &reply, &[StatusCode::UNAUTHORIZED])?;
		report.pass(check, "Admin login required as expected.");

		// 404 only means no config has been stored yet.
		let reply = self.client.get_config().await?;
		expect_status(check, &reply, &[StatusCode::OK, StatusCode::NOT_FOUND])?;
		report.pass(check, "Admin login successful.");
		Ok(())
	}

	async fn config_round_trip(&self, report: &mut Report) -> SmokeResult<()> {
		let check = Check::ConfigRoundTrip;
		let reply = self.client.post_config(&self.fixture).await?;
		expect_status(check, &reply, &[StatusCode::OK])?;
		report.pass(check, "POST /config successful.");

		let reply = self.client.get_config().await?;
		expect_status(check, &reply, &[StatusCode::OK])?;
		let stored: serde_json::Value = reply.json()?;
		expect_same_number(check, "panelCount", stored.get("panelCount"), f64::from(self.fixture.panel_count))?;
		report.pass(check, "GET /config verified.");
		Ok(())
	}

	async fn data_status(&self, report: &mut Report) -> SmokeResult<()> {
		let check = Check::DataStatus;
		for data_type in &self.config.data_types {
			let reply = self.client.data_status(data_type).await?;
			expect_status(check, &reply, &[StatusCode::OK])?;
			report.pass(check, format!("GET /data-status/{} successful: {}", data_type, reply.display_body()));
		}
		Ok(())
	}

	async fn backfill(&self, report: &mut Report) -> SmokeResult<()> {
		let check = Check::Backfill;
		let reply = self.client.get_config().await?;
		expect_status(check, &reply, &[StatusCode::OK])?;
		let stored: serde_json::Value = reply.json()?;
		let at = Coordinates {
			latitude: number_field(check, &stored, "latitude")?,
			longitude: number_field(check, &stored, "longitude")?,
		};

		let reply = self.client.backfill_pvwatts(&self.window).await?;
		expect_status(check, &reply, &[StatusCode::OK])?;
		report.pass(check, format!("POST /backfill/pvwatts successful: {}", reply.display_body()));

		let reply = self.client.backfill_sunrise_sunset(&self.window, at).await?;
		expect_status(check, &reply, &[StatusCode::OK])?;
		report.pass(check, format!("POST /backfill/sunrise_sunset successful: {}", reply.display_body()));
		Ok(())
	}

	async fn refresh_other_data(&self, report: &mut Report) -> SmokeResult<()> {
		let check = Check::RefreshOtherData;
		let reply = self.client.refresh_other_data().await?;
		expect_status(check, &reply, &[StatusCode::NOT_IMPLEMENTED])?;
		report.pass(check, "POST /refresh/other-data returned 501 as expected.");
		Ok(())
	}

	async fn openapi(&self, report: &mut Report) -> SmokeResult<()> {
		let check = Check::OpenApi;
		let reply = self.client.openapi().await?;
		expect_status(check, &reply, &[StatusCode::OK])?;
		let doc: serde_json::Value = reply.json()?;
		if !doc.is_object() {
			return Err(SmokeError::FieldMismatch {
				check,
				field: "openapi document",
				expected: "a JSON object".into(),
				actual: excerpt(&doc.to_string()),
			});
		}
		report.pass(check, "GET /openapi.json served a JSON document.");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn reply(status: u16) -> Reply {
		Reply {
			request: "GET /config".into(),
			status: StatusCode::from_u16(status).unwrap(),
			body: "{\"error\":\"Solar configuration not found\"}".into(),
		}
	}

	#[test]
	fn battery_order_is_fixed() {
		assert_eq!(
			Check::battery(false),
			vec![Check::AdminAuth, Check::ConfigRoundTrip, Check::DataStatus, Check::Backfill, Check::RefreshOtherData]
		);
		assert_eq!(Check::battery(true).last(), Some(&Check::OpenApi));
	}

	#[test]
	fn display_matches_serialized_name() {
		for check in Check::battery(true) {
			assert_eq!(serde_json::to_value(check).unwrap(), json!(check.to_string()));
		}
	}

	#[test]
	fn status_expectation_accepts_any_listed_code() {
		assert!(expect_status(Check::AdminAuth, &reply(404), &[StatusCode::OK, StatusCode::NOT_FOUND]).is_ok());
		let err = expect_status(Check::AdminAuth, &reply(500), &[StatusCode::OK, StatusCode::NOT_FOUND]).unwrap_err();
		assert_eq!(
			err.to_string(),
			"[admin-auth] GET /config: expected 200 or 404, got 500: {\"error\":\"Solar configuration not found\"}"
		);
	}

	#[test]
	fn coordinates_must_be_numbers() {
		let stored = json!({"latitude": 37.7749, "longitude": null});
		assert_eq!(number_field(Check::Backfill, &stored, "latitude").unwrap(), 37.7749);
		let err = number_field(Check::Backfill, &stored, "longitude").unwrap_err();
		assert_eq!(err.to_string(), "[backfill] longitude mismatch: expected a number, got null");
		let err = number_field(Check::Backfill, &json!({}), "latitude").unwrap_err();
		assert_eq!(err.check(), Some(Check::Backfill));
		assert!(err.to_string().ends_with("got missing"));
	}

	#[test]
	fn panel_count_compares_numerically() {
		assert!(expect_same_number(Check::ConfigRoundTrip, "panelCount", Some(&json!(20)), 20.0).is_ok());
		assert!(expect_same_number(Check::ConfigRoundTrip, "panelCount", Some(&json!(20.0)), 20.0).is_ok());
		let err = expect_same_number(Check::ConfigRoundTrip, "panelCount", Some(&json!(12)), 20.0).unwrap_err();
		assert_eq!(err.to_string(), "[config-round-trip] panelCount mismatch: expected 20, got 12");
		let err = expect_same_number(Check::ConfigRoundTrip, "panelCount", None, 20.0).unwrap_err();
		assert!(err.to_string().ends_with("got missing"));
		assert!(expect_same_number(Check::ConfigRoundTrip, "panelCount", Some(&json!("20")), 20.0).is_err());
	}
}
