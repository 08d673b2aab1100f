//! leadstream: terminal client for a lead's activity stream.
//!
//! Reads `leadstream.toml` (or `--config`) for the server address, token and
//! viewer identity, then runs one command against a lead:
//!
//!   leadstream lead-1 feed --replies
//!   leadstream lead-1 reply <comment-id> "On it" --quote
//!   leadstream lead-1 set status Qualified
//!   leadstream lead-1 watch

mod config;
mod console;
mod render;
mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use leadstream_client::{ActivityTreeStore, HttpLeadApi, ReplyMode};
use leadstream_core::{Activity, ActivityFilter, LeadField};

use config::Config;
use console::ConsoleNotifier;

#[derive(Parser)]
#[command(name = "leadstream")]
#[command(about = "Browse and update a lead's activity stream")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "LEADSTREAM_CONFIG", default_value = "leadstream.toml")]
    config: PathBuf,

    /// Server base URL (overrides config file)
    #[arg(long, env = "LEADSTREAM_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token (overrides config file)
    #[arg(long, env = "LEADSTREAM_TOKEN")]
    token: Option<String>,

    /// Lead to operate on
    lead: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the lead and its top-level activity
    Feed {
        #[arg(short, long, default_value = "all")]
        filter: ActivityFilter,
        /// Also load and print every reply thread
        #[arg(short, long)]
        replies: bool,
    },
    /// Show the replies under a comment
    Replies { comment: String },
    /// Post a new top-level comment
    Comment { text: String },
    /// Reply to a comment or to one of its replies
    Reply {
        comment: String,
        text: String,
        /// Embed a quote of the target instead of nesting under its thread
        #[arg(short, long)]
        quote: bool,
    },
    /// Toggle your like on an entry
    Like { comment: String },
    /// Replace a comment's text
    Edit {
        comment: String,
        text: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    Delete { comment: String },
    Pin { comment: String },
    Important { comment: String },
    /// Show the edit history of a comment
    History { comment: String },
    /// Search comments and replies on this lead
    Search { query: String },
    /// Update one lead field
    Set { field: LeadField, value: String },
    /// Follow the feed and the email queue until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("leadstream=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }

    let api = HttpLeadApi::new(config.api()).context("building HTTP client")?;
    let store = Arc::new(ActivityTreeStore::new(
        cli.lead.as_str(),
        Arc::new(api),
        Arc::new(ConsoleNotifier),
        config.store(),
    ));
    if let Some(user) = config.current_user() {
        store.set_current_user(user);
    }

    store.load_feed(false).await?;
    run(&store, &config, cli.command).await
}

async fn run(
    store: &Arc<ActivityTreeStore>,
    config: &Config,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Feed { filter, replies } => {
            store.set_filter(filter);
            print_feed(store, replies).await?;
        }
        Command::Replies { comment } => {
            store.fetch_replies(&comment).await?;
            for reply in store.reply_bucket(&comment).unwrap_or_default() {
                println!("{}", render::activity_line(&reply, Some(store.permissions(&reply))));
            }
        }
        Command::Comment { text } => store.add_comment(&text).await?,
        Command::Reply { comment, text, quote } => {
            let target = locate(store, &comment).await?;
            let mode = if quote { ReplyMode::Quote } else { ReplyMode::Nested };
            store.submit_reply(&target, &text, mode).await?;
        }
        Command::Like { comment } => {
            store.toggle_like(&comment).await?;
            if let Some(activity) = store.activity(&comment) {
                println!("{} likes", activity.likes.len());
            }
        }
        Command::Edit { comment, text, reason } => {
            store.edit_comment(&comment, &text, reason.as_deref()).await?;
        }
        Command::Delete { comment } => store.delete_comment(&comment).await?,
        Command::Pin { comment } => store.toggle_pin(&comment).await?,
        Command::Important { comment } => store.toggle_important(&comment).await?,
        Command::History { comment } => {
            let history = store.view_history(&comment).await?;
            if history.is_empty() {
                println!("no edits");
            }
            for entry in &history {
                println!("{}", render::history_line(entry));
            }
        }
        Command::Search { query } => {
            let count = store.search_comments(&query).await?;
            println!("{} matches for {:?}", count, query);
            for activity in store.visible_feed() {
                println!("{}", render::activity_line(&activity, None));
            }
        }
        Command::Set { field, value } => {
            store.begin_edit(field);
            store.set_field_value(field, value);
            store.save_field(field).await?;
        }
        Command::Watch => watch::run(store, config).await?,
    }
    Ok(())
}

pub(crate) async fn print_feed(store: &ActivityTreeStore, with_replies: bool) -> anyhow::Result<()> {
    if let Some(lead) = store.lead() {
        println!("{}", render::lead_summary(&lead));
    }
    println!(
        "{} activities, filter: {}\n",
        store.total_activities(),
        store.filter()
    );
    for activity in store.visible_feed() {
        println!("{}", render::activity_line(&activity, Some(store.permissions(&activity))));
        if with_replies && !activity.replies.is_empty() {
            store.toggle_expand(&activity.id).await?;
            for reply in store.reply_bucket(&activity.id).unwrap_or_default() {
                let line = render::activity_line(&reply, Some(store.permissions(&reply)));
                println!("    {}", line.replace('\n', "\n    "));
            }
        }
    }
    Ok(())
}

/// Find an entry by id, loading the reply bucket that holds it if needed.
async fn locate(store: &ActivityTreeStore, id: &str) -> anyhow::Result<Activity> {
    if let Some(activity) = store.activity(id) {
        return Ok(activity);
    }
    let parent = store
        .activities()
        .into_iter()
        .find(|a| a.replies.iter().any(|r| r.id() == id));
    if let Some(parent) = parent {
        store.fetch_replies(&parent.id).await?;
        if let Some(activity) = store.activity(id) {
            return Ok(activity);
        }
    }
    bail!("no activity {} on lead {}", id, store.lead_id())
}
