//! Quill command line driver
//!
//! Runs one article task interactively: prints each checkpoint prompt and
//! reads feedback from stdin until the report is accepted.

mod config;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::{CliConfig, LogFormat, ProviderKind, ResearchSettings, LLM_API_KEY_VAR, TAVILY_API_KEY_VAR};
use quill_core::{PendingFeedback, Progress, Task, WorkflowEngine, WorkflowError};
use quill_llm::LlmClient;
use quill_providers::{DuckDuckGoSearch, HttpScraper, OpenAiCompatibleLlm, TavilySearch};
use quill_research::{DocumentCache, Researcher, ResearcherConfig, SearchProvider, WebLoader};
use quill_types::models;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("quill")
        .version(quill_core::VERSION)
        .about("Research and write long-form articles with human review")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("write")
                .about("Write an article interactively")
                .arg(Arg::new("topic").required(true).help("Article topic"))
                .arg(
                    Arg::new("requirements")
                        .long("requirements")
                        .short('r')
                        .required(true)
                        .help("What the article must cover"),
                )
                .arg(
                    Arg::new("max-sections")
                        .long("max-sections")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Upper bound on planned sections"),
                )
                .arg(
                    Arg::new("guidelines")
                        .long("guidelines")
                        .help("Writing style guidelines"),
                )
                .arg(
                    Arg::new("model")
                        .long("model")
                        .help("Model display name from the registry (see `quill models`)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the accepted article here instead of stdout"),
                ),
        )
        .subcommand(Command::new("models").about("List known models"))
        .subcommand(Command::new("config").about("Print the default configuration"))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if matches.get_flag("json-logs") {
        config.log_format = LogFormat::Json;
    }
    init_tracing(config.log_format);

    match matches.subcommand() {
        Some(("write", args)) => write(config, args).await,
        Some(("models", _)) => {
            for spec in models::all() {
                println!("{:<24} {}", spec.display_name, spec.invocation_id());
            }
            Ok(())
        }
        Some(("config", _)) => {
            print!("{}", CliConfig::default_toml()?);
            Ok(())
        }
        _ => bail!("unknown command"),
    }
}

async fn write(mut config: CliConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let topic = args.get_one::<String>("topic").context("topic is required")?;
    let requirements = args
        .get_one::<String>("requirements")
        .context("requirements are required")?;
    let max_sections = args.get_one::<usize>("max-sections").copied().unwrap_or(5);

    let mut task = Task::new(topic, requirements).with_max_sections(max_sections);
    if let Some(guidelines) = args.get_one::<String>("guidelines") {
        task = task.with_guidelines(guidelines);
    }
    if let Some(name) = args.get_one::<String>("model") {
        let spec = models::by_display_name(name)?;
        config.llm = config.llm.with_model(spec.invocation_id());
    }

    let engine = build_engine(&config)?;
    let output = args.get_one::<PathBuf>("output").cloned();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let mut pending = match engine.start(task).await {
        Ok(pending) => pending,
        Err(err) => recover(&engine, err, &mut input).await?,
    };

    loop {
        println!("\n{}", pending.prompt);
        let Some(line) = input.next_line().await? else {
            bail!("input closed before the article was accepted");
        };
        let feedback = line.trim();
        if feedback.is_empty() {
            continue;
        }

        let progress = match engine.resume(pending.task_id, feedback).await {
            Ok(progress) => progress,
            Err(err @ (WorkflowError::Validation(_) | WorkflowError::InvalidTransition { .. })) => {
                eprintln!("error: {err}");
                continue;
            }
            Err(err) => Progress::Pending(recover(&engine, err, &mut input).await?),
        };
        match progress {
            Progress::Pending(next) => pending = next,
            Progress::Completed(done) => {
                info!(
                    task_id = %done.task_id,
                    input_tokens = done.usage.input_tokens,
                    output_tokens = done.usage.output_tokens,
                    calls = done.usage.calls,
                    "article accepted"
                );
                match output {
                    Some(path) => std::fs::write(&path, &done.report)
                        .with_context(|| format!("writing {}", path.display()))?,
                    None => println!("{}", done.report),
                }
                return Ok(());
            }
        }
    }
}

/// Get back to a checkpoint after a stage failure
///
/// Retryable failures are retried on enter. A final failure that left the
/// task at a checkpoint returns that checkpoint so the user can try
/// different feedback.
async fn recover(
    engine: &WorkflowEngine,
    mut err: WorkflowError,
    input: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<PendingFeedback> {
    loop {
        let WorkflowError::FatalOrchestration { task_id, .. } = err else {
            return Err(err.into());
        };
        eprintln!("error: {err}");

        if !err.is_retryable() {
            let state = engine.get_state(task_id).await?;
            if !state.stage.is_suspend_point() {
                return Err(err.into());
            }
            return Ok(PendingFeedback {
                task_id,
                stage: state.stage,
                prompt: state.pending_feedback_prompt.clone().unwrap_or_default(),
                snapshot: state,
            });
        }

        eprintln!("press enter to retry");
        if input.next_line().await?.is_none() {
            return Err(err.into());
        }
        match engine.advance(task_id).await {
            Ok(Progress::Pending(pending)) => return Ok(pending),
            Ok(Progress::Completed(_)) => bail!("task {task_id} finished without review"),
            Err(next) => err = next,
        }
    }
}

fn search_providers(settings: &ResearchSettings) -> anyhow::Result<Vec<Arc<dyn SearchProvider>>> {
    settings
        .providers
        .iter()
        .map(|kind| -> anyhow::Result<Arc<dyn SearchProvider>> {
            match kind {
                ProviderKind::Tavily => {
                    let key = std::env::var(TAVILY_API_KEY_VAR)
                        .with_context(|| format!("{TAVILY_API_KEY_VAR} must be set for tavily"))?;
                    Ok(Arc::new(TavilySearch::new(key)?))
                }
                ProviderKind::DuckDuckGo => Ok(Arc::new(DuckDuckGoSearch::new()?)),
            }
        })
        .collect()
}

fn build_engine(config: &CliConfig) -> anyhow::Result<WorkflowEngine> {
    let llm_key = std::env::var(LLM_API_KEY_VAR).ok();

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiCompatibleLlm::new(config.llm.clone(), llm_key)?);
    let providers = search_providers(&config.research)?;
    let cache = DocumentCache::new(config.research.cache_ttl())?;
    let loader = WebLoader::new(
        cache,
        Arc::new(HttpScraper::new()?),
        config.research.loader_config(),
    )?;

    let researcher = Researcher::new(
        providers,
        Arc::new(loader),
        Arc::clone(&llm),
        ResearcherConfig::default()
            .with_provider_retry(config.research.provider_retry.clone())
            .with_llm_retry(config.workflow.llm_retry.clone()),
    )?;

    info!(model = %config.llm.model, endpoint = %config.llm.endpoint, "engine ready");
    Ok(WorkflowEngine::new(
        config.workflow.clone(),
        Arc::new(researcher),
        llm,
    ))
}
