use serde::Serialize;
use uuid::Uuid;

use crate::checks::Check;

#[derive(Debug, Clone, Serialize)]
pub struct Step {
	pub check: Check,
	pub message: String,
}

/// What one run established, in order, up to the first failure.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
	pub run_id: Uuid,
	pub base_url: String,
	pub steps: Vec<Step>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failure: Option<String>,
	#[serde(skip)]
	echo: bool,
}

impl Report {
	pub fn new(base_url: &str, echo: bool) -> Self {
		Self { run_id: Uuid::new_v4(), base_url: base_url.to_string(), steps: Vec::new(), failure: None, echo }
	}

	pub fn begin(&self, check: Check) {
		tracing::info!(%check, "running check");
		if self.echo {
			println!("\nTesting {}...", check.title());
		}
	}

	pub fn pass(&mut self, check: Check, message: impl Into<String>) {
		let message = message.into();
		tracing::info!(%check, %message, "step passed");
		if self.echo {
			println!("✅ {}", message);
		}
		self.steps.push(Step { check, message });
	}

	pub fn fail(&mut self, error: &dyn std::error::Error) {
		tracing::warn!(error = %error, "smoke run aborted");
		self.failure = Some(error.to_string());
	}

	pub fn passed(&self) -> bool {
		self.failure.is_none()
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_omits_failure_when_clean() {
		let mut report = Report::new("http://127.0.0.1:8787", false);
		report.pass(Check::AdminAuth, "Admin login required as expected.");
		let v: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
		assert_eq!(v["base_url"], "http://127.0.0.1:8787");
		assert_eq!(v["steps"][0]["check"], "admin-auth");
		assert!(v.get("failure").is_none());
		assert!(v.get("echo").is_none());
		assert!(report.passed());
	}

	#[test]
	fn failure_is_recorded() {
		let mut report = Report::new("http://w", false);
		let err = crate::errors::SmokeError::MissingConfig("WORKER_URL");
		report.fail(&err);
		assert!(!report.passed());
		assert_eq!(report.failure.as_deref(), Some("missing configuration: set WORKER_URL"));
	}
}
