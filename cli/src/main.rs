use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anonpoll_cli::api::PollApi;
use anonpoll_cli::error::ClientError;
use anonpoll_cli::identity::{self, FileStore, IdentityStore, MemoryStore};
use anonpoll_cli::session::{self, PollSession};
use anonpoll_cli::view::TerminalView;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "anonpoll", about = "Create, vote on, and watch anonymous polls")]
struct Cli {
    #[arg(long, env = "ANONPOLL_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Where the anonymous id is kept (defaults to the platform data dir).
    #[arg(long, env = "ANONPOLL_IDENTITY_FILE")]
    identity_file: Option<PathBuf>,

    /// Use a throwaway identity for this invocation only.
    #[arg(long, conflicts_with = "identity_file")]
    ephemeral_identity: bool,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a poll and show it.
    Create {
        #[arg(long)]
        question: String,
        /// One per option; repeat the flag.
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Keep watching live results after creating.
        #[arg(long)]
        watch: bool,
    },
    /// Show a poll's current results.
    Show { poll_id: String },
    /// Vote for one option.
    Vote { poll_id: String, option: String },
    /// Close a poll you created.
    Close { poll_id: String },
    /// Follow live results until interrupted.
    Watch { poll_id: String },
    /// Print the share link for a poll.
    Link { poll_id: String },
    /// Print (or replace) the stored anonymous id.
    Identity {
        #[arg(long)]
        reset: bool,
        /// Replace it with an id minted by the server.
        #[arg(long, conflicts_with = "reset")]
        remote: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, ClientError> {
    let Cli { base_url, identity_file, ephemeral_identity, verbose, command } = Cli::parse();
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    let api = PollApi::new(&base_url)?;
    let identity_file = identity_file.as_deref();

    let ok = match command {
        Command::Identity { reset, remote } => {
            return run_identity(identity_file, ephemeral_identity, &api, reset, remote).await;
        }
        Command::Link { poll_id } => match session::normalize_poll_id(&poll_id) {
            Some(poll_id) => {
                println!("{}", api.share_link(&poll_id));
                true
            }
            None => {
                eprintln!("! {}", session::MSG_INVALID_POLL_ID);
                false
            }
        },
        Command::Create { question, options, watch } => {
            let mut session = open_session(api, identity_file, ephemeral_identity, watch)?;
            let created = session.create_poll(&question, &options.join("\n")).await.is_some();
            if created && watch {
                watch_until_interrupted(&mut session).await;
            }
            created
        }
        Command::Show { poll_id } => {
            let mut session = open_session(api, identity_file, ephemeral_identity, false)?;
            session.load_from_input(&poll_id).await
        }
        Command::Vote { poll_id, option } => {
            let mut session = open_session(api, identity_file, ephemeral_identity, false)?;
            session.load_from_input(&poll_id).await && session.vote(&option).await
        }
        Command::Close { poll_id } => {
            let mut session = open_session(api, identity_file, ephemeral_identity, false)?;
            session.load_from_input(&poll_id).await && session.close_poll().await
        }
        Command::Watch { poll_id } => {
            let mut session = open_session(api, identity_file, ephemeral_identity, true)?;
            let loaded = session.load_from_input(&poll_id).await;
            if loaded {
                watch_until_interrupted(&mut session).await;
            }
            loaded
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn open_session(
    api: PollApi,
    identity_file: Option<&Path>,
    ephemeral: bool,
    live: bool,
) -> Result<PollSession<TerminalView>, ClientError> {
    let anon_id = resolve_identity(identity_file, ephemeral)?;
    Ok(PollSession::new(api, anon_id, TerminalView::new(true)).with_live_updates(live))
}

async fn watch_until_interrupted(session: &mut PollSession<TerminalView>) {
    tokio::select! {
        () = session.run_live() => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("stopped watching");
        }
    }
    session.stop_live();
}

fn file_store(identity_file: Option<&Path>) -> Result<FileStore, ClientError> {
    Ok(match identity_file {
        Some(path) => FileStore::new(path),
        None => FileStore::default_location()?,
    })
}

fn resolve_identity(identity_file: Option<&Path>, ephemeral: bool) -> Result<String, ClientError> {
    if ephemeral {
        return Ok(identity::load_or_create(&MemoryStore::new())?);
    }
    Ok(identity::load_or_create(&file_store(identity_file)?)?)
}

async fn run_identity(
    identity_file: Option<&Path>,
    ephemeral: bool,
    api: &PollApi,
    reset: bool,
    remote: bool,
) -> Result<ExitCode, ClientError> {
    if ephemeral {
        println!("{}", identity::generate_anon_id());
        return Ok(ExitCode::SUCCESS);
    }
    let store = file_store(identity_file)?;
    let anon_id = if remote {
        let anon_id = api.anonymous_id().await?;
        store.save(&anon_id)?;
        anon_id
    } else if reset {
        identity::reset(&store)?
    } else {
        identity::load_or_create(&store)?
    };
    println!("{anon_id}");
    Ok(ExitCode::SUCCESS)
}
