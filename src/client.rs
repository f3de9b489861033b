use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SmokeConfig;
use crate::errors::{SmokeError, SmokeResult};
use crate::models::{Coordinates, DateRange, SolarConfig};

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

// Everything outside RFC 3986 pchar; unreserved `-`, `_`, `.`, `~` stay literal.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'/')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'[')
	.add(b'\\')
	.add(b']')
	.add(b'^')
	.add(b'`')
	.add(b'{')
	.add(b'|')
	.add(b'}');

pub fn encode_segment(segment: &str) -> String {
	utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Status and raw body of one exchange with the worker.
#[derive(Debug, Clone)]
pub struct Reply {
	pub request: String,
	pub status: StatusCode,
	pub body: String,
}

impl Reply {
	pub fn json<T: DeserializeOwned>(&self) -> SmokeResult<T> {
		Ok(serde_json::from_str(&self.body)?)
	}

	/// Compact JSON when the body parses, the trimmed text otherwise.
	pub fn display_body(&self) -> String {
		match serde_json::from_str::<serde_json::Value>(&self.body) {
			Ok(v) => v.to_string(),
			Err(_) => self.body.trim().to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
	Admin,
	Anonymous,
}

/// Thin client over the solar analyzer worker's HTTP surface.
pub struct WorkerClient {
	http: reqwest::Client,
	base: String,
	admin: HeaderValue,
}

impl WorkerClient {
	pub fn new(config: &SmokeConfig) -> SmokeResult<Self> {
		let mut admin = HeaderValue::from_str(&config.admin_password)
			.map_err(|_| SmokeError::InvalidConfig("admin password contains characters not allowed in a header".into()))?;
		admin.set_sensitive(true);
		let mut default_headers = HeaderMap::new();
		default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		let mut builder = reqwest::Client::builder()
			.user_agent(concat!("solar-smoke/", env!("CARGO_PKG_VERSION")))
			.default_headers(default_headers);
		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}
		Ok(Self { http: builder.build()?, base: config.base_url.clone(), admin })
	}

	pub fn base_url(&self) -> &str {
		&self.base
	}

	/// `POST /config` without the admin header.
	pub async fn post_config_anonymous<B: Serialize + ?Sized>(&self, body: &B) -> SmokeResult<Reply> {
		let req = self.request(Method::POST, "/config", Auth::Anonymous).json(body);
		self.send(req, "POST /config (anonymous)").await
	}

	pub async fn post_config(&self, config: &SolarConfig) -> SmokeResult<Reply> {
		let req = self.request(Method::POST, "/config", Auth::Admin).json(config);
		self.send(req, "POST /config").await
	}

	pub async fn get_config(&self) -> SmokeResult<Reply> {
		let req = self.request(Method::GET, "/config", Auth::Admin);
		self.send(req, "GET /config").await
	}

	pub async fn data_status(&self, data_type: &str) -> SmokeResult<Reply> {
		let path = format!("/data-status/{}", encode_segment(data_type));
		let req = self.request(Method::GET, &path, Auth::Admin);
		self.send(req, &format!("GET {}", path)).await
	}

	pub async fn backfill_pvwatts(&self, range: &DateRange) -> SmokeResult<Reply> {
		let query = [("startDate", range.start_param()?), ("endDate", range.end_param()?)];
		let req = self.request(Method::POST, "/backfill/pvwatts", Auth::Admin).query(&query);
		self.send(req, "POST /backfill/pvwatts").await
	}

	pub async fn backfill_sunrise_sunset(&self, range: &DateRange, at: Coordinates) -> SmokeResult<Reply> {
		let query = [
			("startDate", range.start_param()?),
			("endDate", range.end_param()?),
			("lat", at.latitude.to_string()),
			("lon", at.longitude.to_string()),
		];
		let req = self.request(Method::POST, "/backfill/sunrise_sunset", Auth::Admin).query(&query);
		self.send(req, "POST /backfill/sunrise_sunset").await
	}

	pub async fn refresh_other_data(&self) -> SmokeResult<Reply> {
		let req = self.request(Method::POST, "/refresh/other-data", Auth::Admin);
		self.send(req, "POST /refresh/other-data").await
	}

	pub async fn openapi(&self) -> SmokeResult<Reply> {
		let req = self.request(Method::GET, "/openapi.json", Auth::Anonymous);
		self.send(req, "GET /openapi.json").await
	}

	fn request(&self, method: Method, path: &str, auth: Auth) -> RequestBuilder {
		let req = self.http.request(method, format!("{}{}", self.base, path));
		match auth {
			Auth::Admin => req.header(HeaderName::from_static(ADMIN_PASSWORD_HEADER), self.admin.clone()),
			Auth::Anonymous => req,
		}
	}

	async fn send(&self, req: RequestBuilder, label: &str) -> SmokeResult<Reply> {
		let resp = req.send().await?;
		let status = resp.status();
		tracing::debug!(request = label, url = %resp.url(), status = status.as_u16(), "worker replied");
		let body = resp.text().await?;
		Ok(Reply { request: label.to_string(), status, body })
	}
}
