mod cli;
mod logging;

use clap::Parser;

use cli::args::Cli;
use cli::commands::{dispatch, exit_code};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guards = logging::init_logging(cli.global.debug, cli.global.log_file.as_deref());

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code(&e)
        }
    };
    // exit skips destructors; flush pending log lines first
    drop(guards);
    std::process::exit(code);
}
