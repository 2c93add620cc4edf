//! CLI entry point (§6). Dispatches to one of the subcommands in
//! [`zielen_core::cli`], maps [`zielen_core::ZielenError`] onto an exit
//! code, and installs the tracing subscriber requested by `--debug`.

use clap::Parser;

use zielen_core::cli::{config_home, Cli, CliCommand};
use zielen_core::logging;
use zielen_core::ZielenError;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	if cli.debug {
		logging::init_tracing_debug();
	} else if !cli.quiet {
		logging::init_tracing();
	}

	let config_home = config_home();
	let result = dispatch(cli.command, &config_home).await;

	if let Err(err) = result {
		if !cli.quiet {
			eprintln!("Error: {}", err);
		}
		std::process::exit(exit_code(&err));
	}
}

async fn dispatch(
	command: CliCommand,
	config_home: &std::path::Path,
) -> Result<(), ZielenError> {
	match command {
		CliCommand::Init(args) => zielen_core::cli::init::run(args, config_home),
		CliCommand::Sync(args) => zielen_core::cli::sync::run(args, config_home).await,
		CliCommand::Reset(args) => zielen_core::cli::reset::run(args, config_home).await,
		CliCommand::List(args) => zielen_core::cli::list::run(args, config_home),
		CliCommand::EmptyTrash(args) => zielen_core::cli::empty_trash::run(args, config_home),
	}
}

/// §7 exit codes: 0 success, 1 operational error, 2 bad usage.
fn exit_code(err: &ZielenError) -> i32 {
	match err {
		ZielenError::Input { .. } => 2,
		_ => 1,
	}
}

// vim: ts=4
