use std::process::ExitCode;

use katatrack::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> ExitCode {
    let result = single_thread_runtime().and_then(|runtime| runtime.block_on(run_cli()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error running cli {e:?}");
            eprintln!("{}: {e:#}", env!("CARGO_PKG_NAME"));
            ExitCode::FAILURE
        }
    }
}
