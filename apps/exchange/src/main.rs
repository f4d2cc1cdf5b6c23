use anyhow::Result;
use clap::Parser;
use mqx_exchange::{Cli, Console, ExchangeRunner};

// Errors before an outcome exists (telemetry install) exit with status 1,
// the "no outcome" status.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mqx_telemetry::install(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;

    let config = cli.into_config();
    tracing::debug!(provider = ?config.provider, "configuration resolved");
    let factory = config.provider.factory();

    let mut console = Console::new(std::io::stdout().lock());
    let outcome = ExchangeRunner::new(&config, factory.as_ref())
        .run(&mut console)
        .await;
    console.flush();

    std::process::exit(outcome.exit_code());
}
