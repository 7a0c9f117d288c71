use clap::Parser;
use crpt_api::utils::{logger, validation::Validate};
use crpt_api::{BatchSubmitter, Cli, CrptApi, CrptError};
use std::sync::Arc;

fn exit_with(e: &CrptError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        exit_with(&e);
    }

    let toml = cli.load_toml().unwrap_or_else(|e| exit_with(&e));

    let verbose = cli.verbose || toml.logging.verbose;
    if cli.json_logs || toml.logging.json {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting crpt-api");
    tracing::debug!("CLI args: {:?}", cli);

    let config = cli.resolve(&toml).unwrap_or_else(|e| exit_with(&e));
    let document = cli.load_document().unwrap_or_else(|e| exit_with(&e));
    if let Err(e) = document.validate() {
        exit_with(&e);
    }

    tracing::info!(
        "Endpoint: {}{} | quota: {} per {:?} ({})",
        config.base_url,
        config.create_documents_path,
        config.bandwidth.capacity,
        config.bandwidth.refill_period,
        config.bandwidth.strategy.as_str()
    );

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be sent");
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let api = Arc::new(CrptApi::from_config(&config).unwrap_or_else(|e| exit_with(&e)));
    let submitter = BatchSubmitter::new_with_monitoring(api, cli.monitor);
    let report = submitter.run(cli.submissions(document)).await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(response) => println!(
                "[{}] {} -> {} {}",
                outcome.index, outcome.signature, response.status, response.body
            ),
            Err(e) => println!("[{}] {} -> error: {}", outcome.index, outcome.signature, e),
        }
    }
    println!(
        "✅ {} succeeded, ❌ {} failed in {:?}",
        report.succeeded(),
        report.failed(),
        report.elapsed
    );

    if let Some(e) = report
        .outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err())
        .max_by_key(|e| e.severity())
    {
        exit_with(e);
    }
    if report.failed() > 0 {
        std::process::exit(1);
    }

    Ok(())
}
