use console::{style, Emoji};
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use simrunner_core::{BatchReport, Concurrency, Job, JobStatus};
use std::sync::Arc;

/// Terminal output for the `simrunner` binary: one progress bar for the batch and styled
/// status lines printed above it.
pub struct CliUi {
	multi_progress: MultiProgress,
}

impl CliUi {
	/// With `verbosity` above 1 every job is logged on its own line, so the bar is hidden
	/// instead of being redrawn between log lines.
	pub fn new(verbosity: u8) -> Arc<Self> {
		let target = if verbosity > 1 {
			ProgressDrawTarget::hidden()
		} else {
			ProgressDrawTarget::stderr()
		};
		Arc::new(Self {
			multi_progress: MultiProgress::with_draw_target(target),
		})
	}

	pub fn progress(&self, jobs: usize) -> anyhow::Result<ProgressBar> {
		let bar = self.multi_progress.add(ProgressBar::new(jobs as u64));
		bar.set_style(
			ProgressStyle::with_template("{spinner:.blue} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed}) {wide_msg}")?
				.progress_chars("=>-"),
		);
		Ok(bar)
	}

	fn println(&self, line: String) {
		self.multi_progress.suspend(|| println!("{line}"));
	}

	pub fn success(&self, message: &str) {
		self.println(format!("{} {}", style(Emoji("✔", "✓")).green(), message));
	}

	pub fn info(&self, message: &str) {
		self.println(format!("{} {}", style(Emoji("ℹ", "i")).blue(), message));
	}

	pub fn warning(&self, message: &str) {
		self.println(format!("{} {}", style(Emoji("⚠", "!")).yellow(), message));
	}

	pub fn error(&self, message: &str, hint: Option<&str>) {
		self.println(format!("{} {}", style("Error:").red().bold(), style(message).red()));
		if let Some(hint) = hint {
			self.println(format!("  {} {}", style("Hint:").cyan(), hint));
		}
	}

	pub fn jobs(&self, jobs: &[Job]) {
		for job in jobs {
			self.println(format!("  {} {}", style(format!("{:>3}", job.ordinal())).dim(), job.input().display()));
		}
	}

	pub fn summary(&self, report: &BatchReport) {
		let mode = match report.concurrency {
			Concurrency::Sequential => "sequential".to_string(),
			Concurrency::Parallel { workers } => format!("{workers} workers"),
		};
		let headline = format!(
			"batch {} ran {} jobs in {} ({mode})",
			style(&report.batch).bold(),
			report.total(),
			HumanDuration(report.elapsed),
		);

		if report.failed() == 0 {
			self.success(&headline);
		} else {
			self.warning(&headline);
		}

		if report.abnormal() > 0 {
			self.warning(&format!("{} simulations exited abnormally", report.abnormal()));
		}

		for job in &report.jobs {
			if let JobStatus::Failed { reason } = &job.status {
				self.error(&format!("{}: {}", job.job.input().display(), reason), None);
			}
		}
		if report.failed() > 0 {
			self.info("rerun with -vv or --log-dir to see the simulator output");
		}
	}
}
