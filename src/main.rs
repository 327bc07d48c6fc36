// src/main.rs

use plugin_sdk::{cli, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("li: failed to initialise logging: {err}");
    }

    if let Err(err) = run(args).await {
        eprintln!("li error: {err}");
        std::process::exit(err.exit_code());
    }
}
