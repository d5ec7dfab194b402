use blockstats::{Args, MainError};
use clap::Parser;
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let output = blockstats::block_stats(&args)
        .and_then(|report| serde_json::to_string_pretty(&report).map_err(MainError::from));
    match output {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
