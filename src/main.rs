//! Job filter: shortlist scraped job postings that fit a CV

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use job_filter::cli::{self, Cli, Commands, ConfigAction};
use job_filter::config::{Config, OutputFormat, QueryStrategyKind};
use job_filter::input::InputManager;
use job_filter::llm::client::{LanguageModelClient, OllamaClient};
use job_filter::llm::company_size::{enrich_company_sizes, LlmSizeResolver};
use job_filter::output::formatter::{save_report_to_file, suggest_filename, ReportGenerator};
use job_filter::output::report::MatchReport;
use job_filter::output::sink::{DirectorySink, ResultSink};
use job_filter::pipeline::query::{QueryBuilder, QueryStrategy};
use job_filter::pipeline::{MatchPipeline, PipelineConfig};
use job_filter::JobFilterError;
use log::{error, info, warn};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config.as_deref()).await {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("reading configuration from {}", path.display())),
        None => Ok(Config::load()?),
    }
}

fn language_model(config: &Config, model: Option<&str>) -> anyhow::Result<Arc<dyn LanguageModelClient>> {
    let model = model.unwrap_or(&config.llm.model);
    let client = OllamaClient::new(
        &config.llm.base_url,
        model,
        Duration::from_secs(config.llm.timeout_secs),
    )?;
    Ok(Arc::new(client))
}

async fn run_command(command: Commands, mut config: Config, config_path: Option<&Path>) -> anyhow::Result<()> {
    match command {
        Commands::Match {
            resume,
            postings,
            llm,
            top_k,
            max_accepted,
            concurrency,
            query,
            enrich_sizes,
            detailed,
            output,
            save,
            output_dir,
        } => {
            cli::validate_file_extension(&resume, &["pdf", "txt", "md"])
                .map_err(|e| JobFilterError::InvalidInput(format!("CV file: {}", e)))?;
            cli::validate_file_extension(&postings, &["json", "csv"])
                .map_err(|e| JobFilterError::InvalidInput(format!("Postings file: {}", e)))?;
            let output_format = cli::parse_output_format(&output).map_err(JobFilterError::InvalidInput)?;

            if top_k.is_some() {
                config.retrieval.top_k = top_k;
            }
            if let Some(concurrency) = concurrency {
                config.llm.max_concurrency = concurrency;
            }
            if let Some(query) = query {
                config.query.fixed = Some(query);
                config.query.strategy = QueryStrategyKind::Fixed;
            }
            let target_dir = output_dir.unwrap_or_else(|| config.output.directory.clone());

            let client = language_model(&config, llm.as_deref())?;
            let mut input_manager = InputManager::new();

            let profile = input_manager
                .load_profile(&resume)
                .await
                .with_context(|| format!("loading CV {}", resume.display()))?;
            let mut corpus = input_manager
                .load_postings(&postings)
                .await
                .with_context(|| format!("loading postings {}", postings.display()))?;

            if enrich_sizes {
                let resolver = LlmSizeResolver::new(
                    Arc::clone(&client),
                    Duration::from_secs(config.llm.timeout_secs),
                );
                let spinner = spinner("Looking up company sizes...");
                let enriched = enrich_company_sizes(&mut corpus, &resolver).await;
                spinner.finish_and_clear();
                info!("Filled in company size for {} postings", enriched);
            }

            let mut pipeline_config = PipelineConfig::from_config(&config, client);
            pipeline_config.max_accepted = max_accepted;
            let pipeline = MatchPipeline::new(pipeline_config)?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, finishing with the results so far");
                    on_interrupt.cancel();
                }
            });

            let expected = config
                .retrieval
                .top_k
                .map_or(corpus.len(), |k| k.min(corpus.len()));
            let progress = progress_bar(expected as u64, "Judging postings");
            let mut accepted_so_far = 0;
            let run = pipeline
                .run_with_progress(&profile, &corpus, cancel, |result| {
                    progress.inc(1);
                    if result.accepted {
                        accepted_so_far += 1;
                        progress.set_message(format!("Judging postings ({} accepted)", accepted_so_far));
                    }
                })
                .await;
            progress.finish_and_clear();

            let mut sink = DirectorySink::new(&target_dir);
            let written = sink.write_all(&run.accepted)?;

            let report = MatchReport::from_run(
                &run,
                &corpus,
                &resume.to_string_lossy(),
                &postings.to_string_lossy(),
            );
            let generator = ReportGenerator::with_options(
                config.output.color_output && save.is_none(),
                detailed || config.output.detailed,
                true,
                true,
            );
            let rendered = generator.generate_report(&report, &output_format)?;

            match save {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(suggest_filename(&output_format, &resume.to_string_lossy(), true))
                    } else {
                        path
                    };
                    save_report_to_file(&rendered, &path)?;
                    println!("{} Report saved to {}", "✔".green(), path.display());
                }
                None => println!("{}", rendered),
            }

            if output_format == OutputFormat::Console {
                println!(
                    "{} {} accepted postings written to {}",
                    "✔".green(),
                    written,
                    target_dir.display()
                );
            }
        }

        Commands::Query { resume } => {
            cli::validate_file_extension(&resume, &["pdf", "txt", "md"])
                .map_err(|e| JobFilterError::InvalidInput(format!("CV file: {}", e)))?;

            let client = language_model(&config, None)?;
            let profile = InputManager::new().load_profile(&resume).await?;
            let pipeline_config = PipelineConfig::from_config(&config, Arc::clone(&client));
            let builder = QueryBuilder::new(
                QueryStrategy::from(&config.query),
                client,
                pipeline_config.judge_options.completion,
                pipeline_config.judge_options.timeout,
            );

            println!("{}", builder.build(&profile).await);
        }

        Commands::Config { action } => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_path);

            match action {
                Some(ConfigAction::Show) | None => {
                    println!("{}\n", "Current Configuration".bold());
                    print!("{}", config.to_toml()?);
                }

                Some(ConfigAction::Reset) => {
                    Config::default().save_to(&path)?;
                    println!("{} Configuration reset: {}", "✔".green(), path.display());
                }

                Some(ConfigAction::Path) => {
                    println!("{}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress bar template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("Invalid progress bar template")
            .progress_chars("=> "),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
