use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chatkeeper::channels::TelegramChannel;
use chatkeeper::db::{self, LoggedMessage, MessageDirection, MessageLogRepo, SettingsRepo, SourceRepo};
use chatkeeper::delivery::DirectorySink;
use chatkeeper::export::{DeliverySink, LogSurface, ProgressSurface};
use chatkeeper::sources::load_jsonl;
use chatkeeper::{Config, DbPool, ExportEngine, ExportOutcome};

/// Chatkeeper - personal messaging agent with cancellable chat exports
#[derive(Parser)]
#[command(name = "chatkeeper", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a chat's history to a zipped HTML transcript
    Export {
        /// Chat to export
        #[arg(long, allow_hyphen_values = true)]
        chat: i64,
        /// JSON-lines history dump to read messages from
        #[arg(long)]
        history: PathBuf,
        /// Message count or DD.MM.YYYY-DD.MM.YYYY range
        range: Option<String>,
        /// Directory that receives the archive
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Deliver to the configured Telegram chat instead of --out
        #[arg(long)]
        telegram: bool,
    },
    /// Set the forwarding destination chat ("off" disables forwarding);
    /// without a target, show the current one
    SetDest {
        #[arg(allow_hyphen_values = true)]
        target: Option<String>,
    },
    /// Watch a channel for forwarding
    AddSource {
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,
        /// Display title
        title: Option<String>,
    },
    /// Stop watching a channel
    DelSource {
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,
    },
    /// List watched channels
    ListSources,
    /// Show message log statistics
    Stats {
        /// Only count messages from this chat
        #[arg(long, allow_hyphen_values = true)]
        chat: Option<i64>,
    },
    /// Append a history dump to the message log
    Ingest {
        /// Chat the dump belongs to
        #[arg(long, allow_hyphen_values = true)]
        chat: i64,
        /// JSON-lines history dump
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,chatkeeper=info",
        1 => "info,chatkeeper=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Export {
            chat,
            history,
            range,
            out,
            telegram,
        } => return cmd_export(config, chat, &history, range.as_deref(), out, telegram).await,
        Command::SetDest { target } => {
            let settings = SettingsRepo::new(open_db(&config)?);
            match target {
                Some(target) => set_dest(&settings, &target)?,
                None => match settings.dest_channel()? {
                    Some(chat_id) => println!("Forwarding to {chat_id}"),
                    None => println!("Forwarding disabled"),
                },
            }
        }
        Command::AddSource { chat_id, title } => {
            let title = title.unwrap_or_else(|| chat_id.to_string());
            let sources = SourceRepo::new(open_db(&config)?);
            let known = sources.ids()?.contains(&chat_id);
            sources.add(chat_id, &title)?;
            if known {
                println!("Renamed {chat_id} to {title}");
            } else {
                println!("Added {title} ({chat_id})");
            }
        }
        Command::DelSource { chat_id } => {
            if SourceRepo::new(open_db(&config)?).remove(chat_id)? {
                println!("Removed {chat_id}");
            } else {
                println!("{chat_id} was not a source");
            }
        }
        Command::ListSources => list_sources(&SourceRepo::new(open_db(&config)?))?,
        Command::Stats { chat } => {
            let log = MessageLogRepo::new(open_db(&config)?);
            match chat {
                Some(chat_id) => {
                    let count = log.count_for_chat(chat_id)?;
                    println!("Logged messages for {chat_id}: {count}");
                }
                None => println!("Logged messages: {}", log.count()?),
            }
        }
        Command::Ingest { chat, file } => {
            ingest(&MessageLogRepo::new(open_db(&config)?), chat, &file)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_db(config: &Config) -> anyhow::Result<DbPool> {
    Ok(db::init(config.db_path())?)
}

async fn cmd_export(
    config: Config,
    chat_id: i64,
    history: &Path,
    range: Option<&str>,
    out: PathBuf,
    telegram: bool,
) -> anyhow::Result<ExitCode> {
    let source = load_jsonl(history)?;
    tracing::info!(messages = source.len(), path = %history.display(), "history loaded");

    let (sink, surface): (Arc<dyn DeliverySink>, Arc<dyn ProgressSurface>) = if telegram {
        let token = config
            .telegram
            .bot_token
            .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN is not set"))?;
        let delivery_chat = config
            .telegram
            .delivery_chat
            .ok_or_else(|| anyhow::anyhow!("CHATKEEPER_DELIVERY_CHAT is not set"))?;

        let mut channel = TelegramChannel::new(token);
        if let Some(base) = config.telegram.api_base {
            channel = channel.with_api_base(base);
        }
        let me = channel.get_me().await?;
        tracing::info!(bot_id = me.id, username = ?me.username, "telegram bot ready");

        let status = channel.open_status(delivery_chat, "⏳ Preparing backup...").await?;
        let (status_chat, status_message) = status.handle();
        tracing::debug!(status_chat, status_message, "status message posted");
        (Arc::new(channel.delivery(delivery_chat)), Arc::new(status))
    } else {
        (Arc::new(DirectorySink::new(out)), Arc::new(LogSurface))
    };

    let engine = ExportEngine::new(Arc::new(source), sink, config.export);
    let started = engine.start_export(chat_id, range, surface)?;
    let mut handle = started.handle;

    let report = tokio::select! {
        report = &mut handle => report?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(chat_id, "interrupt received, stopping export");
            engine.request_stop(chat_id);
            handle.await?
        }
    };

    Ok(match report.outcome {
        ExportOutcome::Failed(_) => ExitCode::FAILURE,
        ExportOutcome::Delivered { .. } | ExportOutcome::NothingFound | ExportOutcome::Stopped { .. } => {
            ExitCode::SUCCESS
        }
    })
}

fn set_dest(settings: &SettingsRepo, target: &str) -> anyhow::Result<()> {
    if target.eq_ignore_ascii_case("off") {
        settings.set_dest_channel(None)?;
        println!("Forwarding disabled");
        return Ok(());
    }

    let chat_id: i64 = target
        .parse()
        .map_err(|_| anyhow::anyhow!("expected a chat ID or \"off\", got {target:?}"))?;
    settings.set_dest_channel(Some(chat_id))?;
    println!("Forwarding to {chat_id}");
    Ok(())
}

fn list_sources(sources: &SourceRepo) -> anyhow::Result<()> {
    let all = sources.list()?;
    if all.is_empty() {
        println!("No sources");
        return Ok(());
    }

    println!("Sources:");
    for source in all {
        println!("  • {} ({})", source.title, source.chat_id);
    }
    Ok(())
}

fn ingest(log: &MessageLogRepo, chat_id: i64, file: &Path) -> anyhow::Result<()> {
    let dump = load_jsonl(file)?;

    // Oldest first so the log reads chronologically
    for message in dump.messages().iter().rev() {
        log.log(&LoggedMessage {
            date: message.timestamp,
            chat_id,
            sender_id: message.sender.as_ref().map_or(0, |s| s.id),
            text: message.text.clone().unwrap_or_else(|| "[Media]".to_string()),
            direction: if message.is_self_authored {
                MessageDirection::Outgoing
            } else {
                MessageDirection::Incoming
            },
        })?;
    }

    println!("Ingested {} messages", dump.len());
    Ok(())
}
