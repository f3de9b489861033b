use std::fmt;
use std::time::Duration;

use dialoguer::Password;
use reqwest::Url;

use crate::errors::{SmokeError, SmokeResult};
use crate::models::default_data_types;

pub const BASE_URL_VAR: &str = "WORKER_URL";
pub const ADMIN_PASSWORD_VAR: &str = "ADMIN_PASSWORD";
pub const TIMEOUT_VAR: &str = "SMOKE_TIMEOUT_SECS";
pub const BACKFILL_DAYS_VAR: &str = "SMOKE_BACKFILL_DAYS";
pub const DATA_TYPES_VAR: &str = "SMOKE_DATA_TYPES";

pub const DEFAULT_BACKFILL_DAYS: u32 = 5;

/// Resolved, validated settings for one run.
#[derive(Clone)]
pub struct SmokeConfig {
	pub base_url: String,
	pub admin_password: String,
	pub timeout: Option<Duration>,
	pub backfill_days: u32,
	pub data_types: Vec<String>,
	pub probe_openapi: bool,
}

impl fmt::Debug for SmokeConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SmokeConfig")
			.field("base_url", &self.base_url)
			.field("admin_password", &"<redacted>")
			.field("timeout", &self.timeout)
			.field("backfill_days", &self.backfill_days)
			.field("data_types", &self.data_types)
			.field("probe_openapi", &self.probe_openapi)
			.finish()
	}
}

impl SmokeConfig {
	pub fn new(base_url: &str, admin_password: &str) -> SmokeResult<Self> {
		ConfigSource {
			base_url: Some(base_url.to_string()),
			admin_password: Some(admin_password.to_string()),
			..Default::default()
		}
		.build()
	}
}

/// Partially known settings, layered env-then-CLI before validation.
#[derive(Clone, Default)]
pub struct ConfigSource {
	pub base_url: Option<String>,
	pub admin_password: Option<String>,
	pub timeout_secs: Option<u64>,
	pub backfill_days: Option<u32>,
	pub data_types: Vec<String>,
	pub probe_openapi: bool,
}

impl fmt::Debug for ConfigSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConfigSource")
			.field("base_url", &self.base_url)
			.field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
			.field("timeout_secs", &self.timeout_secs)
			.field("backfill_days", &self.backfill_days)
			.field("data_types", &self.data_types)
			.field("probe_openapi", &self.probe_openapi)
			.finish()
	}
}

impl ConfigSource {
	pub fn from_env() -> SmokeResult<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> SmokeResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
		let timeout_secs = get(TIMEOUT_VAR)
			.map(|v| v.parse::<u64>().map_err(|_| SmokeError::InvalidConfig(format!("{} must be whole seconds, got {:?}", TIMEOUT_VAR, v))))
			.transpose()?;
		let backfill_days = get(BACKFILL_DAYS_VAR)
			.map(|v| v.parse::<u32>().map_err(|_| SmokeError::InvalidConfig(format!("{} must be a non-negative integer, got {:?}", BACKFILL_DAYS_VAR, v))))
			.transpose()?;
		let data_types = get(DATA_TYPES_VAR)
			.map(|s| s.split(',').map(|x| x.trim().to_string()).filter(|x| !x.is_empty()).collect())
			.unwrap_or_default();
		Ok(Self {
			base_url: get(BASE_URL_VAR),
			// The password is taken verbatim; surrounding whitespace may be part of the secret.
			admin_password: lookup(ADMIN_PASSWORD_VAR).filter(|v| !v.is_empty()),
			timeout_secs,
			backfill_days,
			data_types,
			probe_openapi: false,
		})
	}

	/// Asks on the terminal when no password came from the environment or flags.
	pub fn prompt_password_if_missing(&mut self) -> SmokeResult<()> {
		if self.admin_password.is_none() {
			let entered = Password::new().with_prompt("Admin password").interact()?;
			self.admin_password = Some(entered).filter(|v| !v.is_empty());
		}
		Ok(())
	}

	/// Values present in `overrides` win.
	pub fn merge(self, overrides: ConfigSource) -> Self {
		Self {
			base_url: overrides.base_url.or(self.base_url),
			admin_password: overrides.admin_password.or(self.admin_password),
			timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
			backfill_days: overrides.backfill_days.or(self.backfill_days),
			data_types: if overrides.data_types.is_empty() { self.data_types } else { overrides.data_types },
			probe_openapi: overrides.probe_openapi || self.probe_openapi,
		}
	}

	pub fn build(self) -> SmokeResult<SmokeConfig> {
		let base_url = self.base_url.ok_or(SmokeError::MissingConfig(BASE_URL_VAR))?;
		let base_url = validate_base_url(&base_url)?;
		let admin_password = self.admin_password.ok_or(SmokeError::MissingConfig(ADMIN_PASSWORD_VAR))?;
		let timeout = match self.timeout_secs {
			Some(0) => return Err(SmokeError::InvalidConfig("timeout must be at least one second".into())),
			Some(secs) => Some(Duration::from_secs(secs)),
			None => None,
		};
		let data_types = if self.data_types.is_empty() { default_data_types() } else { self.data_types };
		Ok(SmokeConfig {
			base_url,
			admin_password,
			timeout,
			backfill_days: self.backfill_days.unwrap_or(DEFAULT_BACKFILL_DAYS),
			data_types,
			probe_openapi: self.probe_openapi,
		})
	}
}

fn validate_base_url(raw: &str) -> SmokeResult<String> {
	let trimmed = raw.trim().trim_end_matches('/');
	let url = Url::parse(trimmed).map_err(|e| SmokeError::InvalidConfig(format!("{} {:?}: {}", BASE_URL_VAR, raw, e)))?;
	if url.scheme() != "http" && url.scheme() != "https" {
		return Err(SmokeError::InvalidConfig(format!("{} must be http or https, got {}", BASE_URL_VAR, url.scheme())));
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(SmokeError::InvalidConfig(format!("{} must not carry a query or fragment", BASE_URL_VAR)));
	}
	Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn builds_from_env_with_defaults() {
		let cfg = ConfigSource::from_lookup(lookup(&[(BASE_URL_VAR, "https://worker.example.dev/"), (ADMIN_PASSWORD_VAR, "s3cret")]))
			.unwrap()
			.build()
			.unwrap();
		assert_eq!(cfg.base_url, "https://worker.example.dev");
		assert_eq!(cfg.admin_password, "s3cret");
		assert_eq!(cfg.timeout, None);
		assert_eq!(cfg.backfill_days, DEFAULT_BACKFILL_DAYS);
		assert_eq!(cfg.data_types, vec!["sunrise-sunset", "pvwatts"]);
		assert!(!cfg.probe_openapi);
	}

	#[test]
	fn missing_password_is_an_error_not_a_default() {
		let err = ConfigSource::from_lookup(lookup(&[(BASE_URL_VAR, "http://127.0.0.1:8787")])).unwrap().build().unwrap_err();
		assert!(matches!(err, SmokeError::MissingConfig(ADMIN_PASSWORD_VAR)));
	}

	#[test]
	fn missing_url_is_an_error_not_a_default() {
		let err = ConfigSource::from_lookup(lookup(&[(ADMIN_PASSWORD_VAR, "pw"), (BASE_URL_VAR, "   ")])).unwrap().build().unwrap_err();
		assert!(matches!(err, SmokeError::MissingConfig(BASE_URL_VAR)));
	}

	#[test]
	fn cli_overrides_env() {
		let env = ConfigSource::from_lookup(lookup(&[
			(BASE_URL_VAR, "http://env.local"),
			(ADMIN_PASSWORD_VAR, "env-pw"),
			(BACKFILL_DAYS_VAR, "3"),
			(DATA_TYPES_VAR, "pvwatts, sunrise-sunset ,"),
		]))
		.unwrap();
		assert_eq!(env.data_types, vec!["pvwatts", "sunrise-sunset"]);
		let cli = ConfigSource { base_url: Some("http://cli.local".into()), timeout_secs: Some(10), probe_openapi: true, ..Default::default() };
		let cfg = env.merge(cli).build().unwrap();
		assert_eq!(cfg.base_url, "http://cli.local");
		assert_eq!(cfg.admin_password, "env-pw");
		assert_eq!(cfg.backfill_days, 3);
		assert_eq!(cfg.timeout, Some(Duration::from_secs(10)));
		assert_eq!(cfg.data_types, vec!["pvwatts", "sunrise-sunset"]);
		assert!(cfg.probe_openapi);
	}

	#[test]
	fn rejects_bad_numbers_and_urls() {
		assert!(matches!(ConfigSource::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")])).unwrap_err(), SmokeError::InvalidConfig(_)));
		assert!(matches!(ConfigSource::from_lookup(lookup(&[(BACKFILL_DAYS_VAR, "-1")])).unwrap_err(), SmokeError::InvalidConfig(_)));
		assert!(matches!(SmokeConfig::new("ftp://worker", "pw").unwrap_err(), SmokeError::InvalidConfig(_)));
		assert!(matches!(SmokeConfig::new("not a url", "pw").unwrap_err(), SmokeError::InvalidConfig(_)));
		assert!(matches!(SmokeConfig::new("http://w/?x=1", "pw").unwrap_err(), SmokeError::InvalidConfig(_)));
		let zero = ConfigSource { base_url: Some("http://w".into()), admin_password: Some("pw".into()), timeout_secs: Some(0), ..Default::default() };
		assert!(matches!(zero.build().unwrap_err(), SmokeError::InvalidConfig(_)));
	}

	#[test]
	fn debug_redacts_password() {
		let cfg = SmokeConfig::new("http://127.0.0.1:8787", "hunter2").unwrap();
		let dbg = format!("{:?}", cfg);
		assert!(!dbg.contains("hunter2"));
		assert!(dbg.contains("<redacted>"));
	}
}
