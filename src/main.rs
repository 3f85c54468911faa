//! nl2sql-eval - accuracy evaluation for natural-language-to-SQL generators.

use nl2sql_eval::cli::Cli;
use nl2sql_eval::config::Config;
use nl2sql_eval::db::SqliteExecutor;
use nl2sql_eval::error::{EvalError, Result};
use nl2sql_eval::eval::{self, EvalContext, LlmEquivalenceOracle, LlmQueryGenerator};
use nl2sql_eval::llm::create_client;
use nl2sql_eval::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config)?;

    let examples = eval::load_dataset(&cli.dataset)?;
    info!(
        "Loaded {} examples from {}",
        examples.len(),
        cli.dataset.display()
    );

    let provider = config.llm.provider()?;
    let generation = config.llm.generation_options()?;
    let judging = config.llm.judge_options()?;
    info!(
        "Using {} (generator: {}, judge: {})",
        provider, generation.model, judging.model
    );

    let generator = LlmQueryGenerator::new(create_client(provider, None, &generation)?);
    let oracle = LlmEquivalenceOracle::new(create_client(provider, None, &judging)?)
        .with_numeric_tolerance(config.eval.numeric_tolerance);
    let executor = SqliteExecutor::with_timeout(config.query_timeout());

    let ctx = EvalContext::new(Box::new(executor), Box::new(generator), Box::new(oracle))
        .with_settings(config.eval_settings(cli.strict_only));

    let database = cli.database.to_string_lossy();
    let report = eval::evaluate(&ctx, &database, &examples).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| EvalError::internal(format!("Failed to serialize report: {e}")))?;
        println!("{json}");
    } else {
        println!("{report}");
    }

    Ok(())
}
