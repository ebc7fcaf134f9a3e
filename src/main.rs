//! clustenv binary entry point

use clap::Parser;
use clustenv::{
    cli::{ClustenvCli, ClustenvCliExecutor},
    logging::{init_logging, LogConfig},
    ProvisionSettings, Result,
};
use tracing::{debug, error};

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = ClustenvCli::parse();

    let log_config = LogConfig::from_env().with_verbosity(cli.verbose);
    init_logging(&log_config)?;

    let paths = cli.server_paths();
    debug!(
        repo_root = %paths.repo_root.display(),
        data_root = %paths.data_root.display(),
        "Resolved cluster paths"
    );

    let mut executor = ClustenvCliExecutor::new(paths, ProvisionSettings::from_env(), cli.json);
    executor.execute(cli.command)
}
