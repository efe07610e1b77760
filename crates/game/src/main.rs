use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    app::bootstrap::init_tracing();
    match app::bootstrap::build_app() {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            tracing::error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
