use anyhow::Context;
use clap::Parser;
use geo_etl::utils::error::ErrorSeverity;
use geo_etl::utils::{logger, validation::Validate};
use geo_etl::{run_job, CliArgs, EtlConfig, EtlError, LocalStorage, PostgresConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Loading configuration from {}", args.config);

    let config = EtlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::debug!("Configuration: {:?}", config);

    let jobs = match &args.job {
        Some(name) => vec![config
            .job(name)
            .cloned()
            .with_context(|| format!("No job named '{}' in {}", name, args.config))?],
        None => config.jobs.clone(),
    };

    let storage = LocalStorage::new(config.storage.base_path.clone());
    let connector = PostgresConnector::new(config.postgres_config());

    tracing::info!("Pipeline '{}': {} job(s)", config.pipeline.name, jobs.len());

    for job in jobs {
        let name = job.name.clone();
        match run_job(storage.clone(), connector.clone(), job).await {
            Ok(report) => {
                println!(
                    "{}: {} rows loaded into {} ({} total)",
                    name, report.inserted, report.table, report.table_rows
                );
            }
            Err(e) => fail(&name, e),
        }
    }

    tracing::info!("All jobs completed");
    Ok(())
}

fn fail(job: &str, e: EtlError) -> ! {
    tracing::error!(
        "Job '{}' failed: {} (Category: {:?}, Severity: {:?})",
        job,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("{}: {}", job, e.user_friendly_message());
    eprintln!("Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
