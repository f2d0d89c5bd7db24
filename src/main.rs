use fresh_checks::app;
use fresh_checks::config::Config;

/// Main entry point for the check-in gate server
///
/// Initializes logging, loads configuration from the environment, and runs
/// the web server. Sheet connectivity is probed inside `app::run`; a failure
/// there is logged and the server keeps serving.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::load();
    app::run(config).await
}
