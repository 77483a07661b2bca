use crate::cmd::{check::Check, run::Run};
use clap::{Parser, Subcommand};

mod args;
mod check;
mod logs;
mod run;

#[derive(Subcommand)]
enum Command {
	/// Validate the batch, run every job and harvest the results
	Run(Run),
	/// Run the preflight checks and list the jobs without running anything
	Check(Check),
}

#[derive(Parser)]
#[command(about, author, version)]
pub struct App {
	#[command(subcommand)]
	command: Command,
}

pub trait Cmd {
	fn run(self) -> anyhow::Result<()>;
}

impl Cmd for App {
	fn run(self) -> anyhow::Result<()> {
		match self.command {
			Command::Run(cmd) => cmd.run(),
			Command::Check(cmd) => cmd.run(),
		}
	}
}
