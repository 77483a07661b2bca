use chrono::Local;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
	filter::LevelFilter,
	fmt::{self},
	layer::SubscriberExt,
	util::SubscriberInitExt,
	Layer,
};

fn level(verbosity: u8) -> LevelFilter {
	match verbosity {
		0 => LevelFilter::WARN,
		1 => LevelFilter::INFO,
		2 => LevelFilter::DEBUG,
		_ => LevelFilter::TRACE,
	}
}

/// Installs the global subscriber.
///
/// The terminal layer follows `verbosity`. When `log_dir` is given, every event down to
/// TRACE also goes to a per-run file in that folder; the returned guard flushes it and
/// must be held until the program exits.
pub fn init(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
	let stderr_layer = fmt::layer()
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_filter(level(verbosity));

	let (file_layer, guard) = match log_dir {
		Some(dir) => {
			let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S%.3f");
			let file_appender = tracing_appender::rolling::never(dir, format!("{timestamp}.log"));
			let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
			let layer = fmt::layer()
				.with_writer(non_blocking_writer)
				.with_ansi(false)
				.pretty()
				.with_filter(LevelFilter::TRACE);
			(Some(layer), Some(guard))
		}
		None => (None, None),
	};

	tracing_subscriber::registry().with(stderr_layer).with(file_layer).init();

	if let Some(dir) = log_dir {
		tracing::debug!("writing logs to {}", dir.display());
	}
	guard
}
