//! Logging setup driven by environment variables.
//!
//! - `LOG_MODE`: "stdout" (default) or "file"
//! - `LOG_LEVEL`: "trace", "debug", "info" (default), "warn" or "error"
//! - `LOG_DATA_DIR`: directory for log files, default "logs/"
//! - `LOG_MAX_SIZE`: size in bytes after which a new file index is started, default 1GB
//! - `IN_DOCKER`: when "true", files always go to "logs/"

pub mod error;

use chrono::Utc;
use std::{
	env,
	fs::{create_dir_all, metadata},
	path::Path,
};
use tracing::{info, Subscriber};
use tracing_subscriber::{
	filter::EnvFilter,
	fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
	prelude::*,
	registry::LookupSpan,
};

const DEFAULT_LOG_MAX_SIZE: u64 = 1_073_741_824;
const LOG_FILE_NAME: &str = "ingest.log";

/// Formatter wrapper that removes ANSI colour codes, used for file output
struct StripAnsiFormatter<T> {
	inner: T,
	pattern: regex::Regex,
}

impl<T> StripAnsiFormatter<T> {
	fn new(inner: T) -> Result<Self, regex::Error> {
		Ok(Self {
			inner,
			pattern: regex::Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]")?,
		})
	}
}

impl<S, N, T> FormatEvent<S, N> for StripAnsiFormatter<T>
where
	S: Subscriber + for<'a> LookupSpan<'a>,
	N: for<'a> FormatFields<'a> + 'static,
	T: FormatEvent<S, N>,
{
	fn format_event(
		&self,
		ctx: &FmtContext<'_, S, N>,
		mut writer: Writer<'_>,
		event: &tracing::Event<'_>,
	) -> std::fmt::Result {
		let mut buf = String::new();
		self.inner.format_event(ctx, Writer::new(&mut buf), event)?;
		write!(writer, "{}", self.pattern.replace_all(&buf, ""))
	}
}

/// Builds `<base>-<date>.<index>.log` from `<base>.log`.
pub fn compute_rolled_file_path(base_file_path: &str, date_str: &str, index: u32) -> String {
	let trimmed = base_file_path
		.strip_suffix(".log")
		.unwrap_or(base_file_path);
	format!("{}-{}.{}.log", trimmed, date_str, index)
}

/// Returns the first rolled path for `date_str` whose file is missing or below `max_size`.
pub fn space_based_rolling(
	file_path: &str,
	base_file_path: &str,
	date_str: &str,
	max_size: u64,
) -> String {
	let mut final_path = file_path.to_string();
	let mut index = 1;
	while let Ok(meta) = metadata(&final_path) {
		if meta.len() <= max_size {
			break;
		}
		index += 1;
		final_path = compute_rolled_file_path(base_file_path, date_str, index);
	}
	final_path
}

fn create_log_format(with_ansi: bool) -> fmt::format::Format<fmt::format::Compact> {
	fmt::format()
		.with_level(true)
		.with_target(true)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_ansi(with_ansi)
		.compact()
}

fn parse_level(raw: &str) -> tracing::Level {
	match raw.to_lowercase().as_str() {
		"trace" => tracing::Level::TRACE,
		"debug" => tracing::Level::DEBUG,
		"warn" => tracing::Level::WARN,
		"error" => tracing::Level::ERROR,
		_ => tracing::Level::INFO,
	}
}

fn parse_log_max_size() -> Result<u64, std::num::ParseIntError> {
	match env::var("LOG_MAX_SIZE") {
		Ok(raw) => raw.parse::<u64>(),
		Err(_) => Ok(DEFAULT_LOG_MAX_SIZE),
	}
}

fn resolve_log_dir() -> String {
	let in_docker = env::var("IN_DOCKER").map(|v| v == "true").unwrap_or(false);
	let dir = if in_docker {
		"logs/".to_string()
	} else {
		env::var("LOG_DATA_DIR").unwrap_or_else(|_| "logs/".to_string())
	};
	format!("{}/", dir.trim_end_matches('/'))
}

/// Installs the global tracing subscriber.
pub fn setup_logging() -> Result<(), Box<dyn std::error::Error>> {
	let log_mode = env::var("LOG_MODE")
		.unwrap_or_else(|_| "stdout".to_string())
		.to_lowercase();
	let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

	let to_file = log_mode == "file";
	let format = create_log_format(!to_file);
	let subscriber =
		tracing_subscriber::registry().with(EnvFilter::new(parse_level(&log_level).to_string()));

	if to_file {
		let base_file_path = format!("{}{}", resolve_log_dir(), LOG_FILE_NAME);
		let date_str = Utc::now().format("%Y-%m-%d").to_string();
		let dated_path = compute_rolled_file_path(&base_file_path, &date_str, 1);

		if let Some(parent) = Path::new(&dated_path).parent() {
			create_dir_all(parent)?;
		}

		let final_path =
			space_based_rolling(&dated_path, &base_file_path, &date_str, parse_log_max_size()?);
		let final_path = Path::new(&final_path);
		let file_appender = tracing_appender::rolling::never(
			final_path.parent().unwrap_or(Path::new(".")),
			final_path.file_name().unwrap_or_default(),
		);

		subscriber
			.with(
				fmt::layer()
					.event_format(StripAnsiFormatter::new(format)?)
					.with_writer(file_appender)
					.fmt_fields(fmt::format::PrettyFields::new()),
			)
			.try_init()?;
	} else {
		subscriber
			.with(
				fmt::layer()
					.event_format(format)
					.fmt_fields(fmt::format::PrettyFields::new()),
			)
			.try_init()?;
	}

	info!(mode = %log_mode, level = %log_level, "Logging configured");
	Ok(())
}
