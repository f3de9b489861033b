use clap::{ArgAction, Parser, ValueEnum};
use dotenvy::dotenv;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solar_smoke::{ConfigSource, Report, Suite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
	Text,
	Json,
}

#[derive(Parser, Debug)]
#[command(name = "solar_smoke", version)]
#[command(about = "Smoke test for the solar analyzer worker endpoints", long_about = None)]
struct Opts {
	/// Worker base URL (overrides WORKER_URL)
	#[arg(long)]
	base: Option<String>,
	/// Admin password (overrides ADMIN_PASSWORD)
	#[arg(long)]
	admin_password: Option<String>,
	/// Ask for the admin password when none is configured
	#[arg(long)]
	prompt_password: bool,
	/// Per-request timeout in seconds (overrides SMOKE_TIMEOUT_SECS)
	#[arg(long)]
	timeout_secs: Option<u64>,
	/// Backfill window starts this many days before today (overrides SMOKE_BACKFILL_DAYS)
	#[arg(long)]
	backfill_days: Option<u32>,
	/// Data type to probe on /data-status; repeatable (overrides SMOKE_DATA_TYPES)
	#[arg(long = "data-type")]
	data_types: Vec<String>,
	/// Also check that /openapi.json is served
	#[arg(long)]
	probe_openapi: bool,
	#[arg(long, value_enum, default_value_t = Format::Text)]
	format: Format,
	/// -v for info logs, -vv for debug
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

impl Opts {
	fn overrides(&self) -> ConfigSource {
		ConfigSource {
			base_url: self.base.clone(),
			admin_password: self.admin_password.clone(),
			timeout_secs: self.timeout_secs,
			backfill_days: self.backfill_days,
			data_types: self.data_types.clone(),
			probe_openapi: self.probe_openapi,
		}
	}
}

fn init_tracing(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.into());
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::new(env_filter))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init()
		.ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let opts = Opts::parse();
	// Local .env first so RUST_LOG from it is honored.
	dotenv().ok();
	init_tracing(opts.verbose);

	let mut source = ConfigSource::from_env()?.merge(opts.overrides());
	if opts.prompt_password {
		source.prompt_password_if_missing()?;
	}
	let config = source.build()?;
	tracing::debug!(?config, "resolved configuration");

	let suite = Suite::new(config)?;
	let text = opts.format == Format::Text;
	let mut report = Report::new(suite.base_url(), text);
	let span = tracing::info_span!("smoke", run_id = %report.run_id, base = %report.base_url);
	let outcome = suite.run(&mut report).instrument(span).await;

	if !text {
		println!("{}", report.to_json()?);
	}
	outcome?;
	if text {
		println!("\n🎉 All endpoint checks passed.");
	}
	Ok(())
}
