//! unlocker CLI
//!
//! ストアはスナップショットファイル（`--state`）を読み込んだインメモリ実装。
//! 実行後に書き戻すので、Deferred のリンクは次回の `solve` で再開される。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncWriteExt;

use unlocker_core::app::{App, AppBuilder, SolveTaskRequest, StreamRequest};
use unlocker_core::config::Settings;
use unlocker_core::domain::{Link, LinkInput, TaskId, TaskRecord};
use unlocker_core::impls::{ChannelEventSink, HttpResolver, InMemoryTaskStore, StoreSnapshot};
use unlocker_core::ports::{Clock, SystemClock};

#[derive(Debug, Parser)]
#[command(name = "unlocker", about = "Resolve hosting links into final download URLs")]
pub struct Cli {
    /// YAML settings file (env `UNLOCKER__*` still applies on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store snapshot, loaded before and saved after each command
    #[arg(long, global = true, default_value = "unlocker-state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create (or replace) a pending task from a links file
    Add(AddArgs),
    /// Resolve a task's pending links and print the summary
    Solve(SolveArgs),
    /// Resolve links and print progress events as NDJSON
    Stream(StreamArgs),
    /// Print a task with its stored results merged in
    Show(TaskArgs),
    /// Delete a task and its result records
    Remove(TaskArgs),
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    task: String,
    /// JSON array of `{id, name, link}`
    #[arg(long)]
    links: PathBuf,
}

#[derive(Debug, Args)]
struct SolveArgs {
    #[arg(long)]
    task: String,
    /// Optional explicit link list instead of the stored one
    #[arg(long)]
    links: Option<PathBuf>,
    #[arg(long)]
    extracted_by: Option<String>,
}

#[derive(Debug, Args)]
struct StreamArgs {
    #[arg(long)]
    links: PathBuf,
    #[arg(long)]
    task: Option<String>,
    #[arg(long)]
    extracted_by: Option<String>,
}

#[derive(Debug, Args)]
struct TaskArgs {
    #[arg(long)]
    task: String,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = Settings::load(self.config.as_deref()).context("loading settings")?;
        init_tracing(&settings.log_level);

        let store = load_state(&self.state).await?;

        match self.command {
            Command::Add(args) => {
                let links = read_links(&args.links).await?;
                let links = links
                    .into_iter()
                    .map(|l| Link::new(l.link).with_id(l.id).with_name(l.name))
                    .collect();
                store
                    .insert_task(TaskRecord::new(args.task.as_str(), links, SystemClock.now()))
                    .await;
                tracing::info!(task_id = %args.task, "task added");
            }
            Command::Solve(args) => {
                let app = build_app(&settings, &store)?;
                let mut req = SolveTaskRequest::new(args.task.as_str());
                if let Some(path) = &args.links {
                    req = req.with_links(read_links(path).await?);
                }
                req.extracted_by = args.extracted_by;

                let summary = app.solve_task(req).await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Command::Stream(args) => {
                let app = build_app(&settings, &store)?;
                let mut req = StreamRequest::new(read_links(&args.links).await?);
                req.task_id = args.task.map(TaskId::new);
                req.extracted_by = args.extracted_by;
                stream_to_stdout(&app, req).await?;
            }
            Command::Show(args) => {
                let app = build_app(&settings, &store)?;
                let task = app.task_view(&TaskId::new(args.task)).await?;
                println!("{}", serde_json::to_string_pretty(&task)?);
            }
            Command::Remove(args) => {
                let app = build_app(&settings, &store)?;
                if !app.remove_task(&TaskId::new(args.task.as_str())).await? {
                    anyhow::bail!("no such task: {}", args.task);
                }
            }
        }

        save_state(&self.state, &store).await
    }
}

fn init_tracing(fallback_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries the command's output only
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_app(settings: &Settings, store: &InMemoryTaskStore) -> anyhow::Result<App> {
    let mut builder = AppBuilder::new(settings.clone()).with_store(Arc::new(store.clone()));
    for (capability, endpoint) in settings.resolvers.entries() {
        let resolver = HttpResolver::new(endpoint, &settings.http)
            .with_context(|| format!("building resolver '{capability}'"))?;
        builder = builder.register(capability, Arc::new(resolver))?;
    }
    Ok(builder.build()?)
}

async fn stream_to_stdout(app: &App, req: StreamRequest) -> anyhow::Result<()> {
    let (sink, mut rx) = ChannelEventSink::channel();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = rx.recv().await {
            let line = event.to_ndjson()?;
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    let result = app.stream_solve(req, Arc::new(sink)).await;
    // every sender is gone once stream_solve returns, so the writer drains and stops
    writer.await.context("event writer panicked")??;
    Ok(result?)
}

async fn read_links(path: &Path) -> anyhow::Result<Vec<LinkInput>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn load_state(path: &Path) -> anyhow::Result<InMemoryTaskStore> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(InMemoryTaskStore::new());
    }
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let snapshot: StoreSnapshot =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(InMemoryTaskStore::from_snapshot(snapshot))
}

async fn save_state(path: &Path, store: &InMemoryTaskStore) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(&store.snapshot().await)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
