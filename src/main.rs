use anyhow::Result;
use clap::Parser;
use deb_updater::cli::Cli;
use deb_updater::core::user_friendly_error;
use deb_updater::utils::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let startup_logging = cli.startup_logging();

    let invocation = match cli.prepare().await {
        Ok(invocation) => invocation,
        Err(e) => {
            // The configuration never loaded, so log with what the flags say
            if let Err(init_error) = init_logging(&startup_logging) {
                tracing::debug!("Logging already initialized: {init_error:#}");
            }
            let error_ctx = user_friendly_error(e);
            tracing::error!("{error_ctx}");
            if !startup_logging.silent {
                error_ctx.display();
            }
            std::process::exit(1);
        }
    };

    let silent = invocation.is_silent();
    match invocation.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            tracing::error!("{error_ctx}");
            if !silent {
                error_ctx.display();
            }
            std::process::exit(1);
        }
    }
}
