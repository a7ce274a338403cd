//! Main entry point for the minitar CLI app

fn main() -> std::process::ExitCode {
    if let Err(e) = minitar::cli_runner::run_cli_app() {
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("Error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
