//! Term-gateway binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use term_gateway::api::{serve_with_state, AppState};
use term_gateway::{cli, logging, Config, SessionRegistry};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("try 'term-gateway --help' for more information");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_filter(config.log_filter());

    info!("term-gateway v{}", env!("CARGO_PKG_VERSION"));

    let pump_mode = match config.pump_mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState {
        registry: Arc::new(SessionRegistry::with_mode(pump_mode)),
        defaults: config.to_session_defaults(),
    };

    if let Err(e) = serve_with_state(server_config, state).await {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
