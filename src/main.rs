//! Lurk - a terminal imageboard reader that watches threads for new replies
#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lurk::content::styled;
use lurk::{
    Board, Config, ContentProvider, Database, FourChanClient, ImageboardApi, Post, Thread,
    ThreadWatcher, WatchList, WatchStore,
};

/// Width used when wrapping post bodies
const WRAP_WIDTH: usize = 80;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match parse_args()? {
        Command::Boards => list_boards().await,
        Command::Catalog { board } => show_catalog(&board).await,
        Command::Thread { board, thread } => show_thread(&board, thread).await,
        Command::Watch { board, thread } => watch_thread(&board, thread).await,
        Command::Unwatch { board, thread } => unwatch_thread(&board, thread),
        Command::Ack { board, thread } => acknowledge_thread(&board, thread),
        Command::Watched => list_watched(),
        Command::Poll { once } => poll(once).await,
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Boards,
    Catalog { board: String },
    Thread { board: String, thread: u64 },
    Watch { board: String, thread: u64 },
    Unwatch { board: String, thread: u64 },
    Ack { board: String, thread: u64 },
    Watched,
    Poll { once: bool },
    Help,
    Version,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    let Some(command) = args.get(1) else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "boards" => Ok(Command::Boards),

        "catalog" => {
            let board = board_arg(&args)?;
            Ok(Command::Catalog { board })
        }

        "thread" | "t" => {
            let (board, thread) = thread_args(&args)?;
            Ok(Command::Thread { board, thread })
        }

        "watch" | "w" => {
            let (board, thread) = thread_args(&args)?;
            Ok(Command::Watch { board, thread })
        }

        "unwatch" => {
            let (board, thread) = thread_args(&args)?;
            Ok(Command::Unwatch { board, thread })
        }

        "ack" => {
            let (board, thread) = thread_args(&args)?;
            Ok(Command::Ack { board, thread })
        }

        "watched" | "ls" => Ok(Command::Watched),

        "poll" => {
            let once = args.iter().skip(2).any(|a| a == "--once");
            Ok(Command::Poll { once })
        }

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'lurk --help' for usage"
        )),
    }
}

/// Board argument, accepting both `g` and `/g/`
fn board_arg(args: &[String]) -> Result<String> {
    let board = args
        .get(2)
        .map(|b| b.trim_matches('/'))
        .filter(|b| !b.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing board (e.g. g)"))?;
    Ok(board.to_string())
}

fn thread_args(args: &[String]) -> Result<(String, u64)> {
    let board = board_arg(args)?;
    let thread = args
        .get(3)
        .ok_or_else(|| anyhow::anyhow!("Missing thread number"))?;
    let thread = thread
        .parse()
        .with_context(|| format!("Invalid thread number: {thread}"))?;
    Ok((board, thread))
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());
    let themes = lurk::Theme::all()
        .iter()
        .map(|t| lurk::Theme::from(*t).slug())
        .collect::<Vec<_>>()
        .join(", ");

    println!(
        r#"Lurk - a terminal imageboard reader

USAGE:
    lurk [COMMAND]

COMMANDS:
    boards                             List boards
    catalog <board>                    List active threads of a board
    thread <board> <no>                Show a thread
    watch <board> <no>                 Watch a thread for new replies
    unwatch <board> <no>               Stop watching a thread
    ack <board> <no>                   Mark a watched thread as read
    watched                            List watched threads
    poll [--once]                      Poll watched threads until Ctrl-C
      Examples:
        lurk catalog g
        lurk watch g 12345678
        lurk poll --once

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}

THEMES:
    {}
"#,
        config_path, themes
    );
}

fn print_version() {
    println!("lurk {}", lurk::VERSION);
}

async fn list_boards() -> Result<()> {
    let config = Config::load()?;
    let api = FourChanClient::from_config(&config)?;

    for board in api.list_boards().await? {
        let mut flags = Vec::new();
        if board.supports_code() {
            flags.push("code");
        }
        if !board.worksafe {
            flags.push("nsfw");
        }

        if flags.is_empty() {
            println!("{board}");
        } else {
            println!("{board} [{}]", flags.join(", "));
        }
    }

    Ok(())
}

async fn show_catalog(board: &str) -> Result<()> {
    let config = Config::load()?;
    let api = FourChanClient::from_config(&config)?;

    let threads = api
        .fetch_catalog(board)
        .await
        .with_context(|| format!("Failed to load catalog of /{board}/"))?;

    for thread in threads {
        let marker = if thread.sticky { "📌 " } else { "" };
        println!("{marker}No.{} {}", thread.id, thread.title(60));

        if config.show_thread_stats {
            let stats = &thread.stats;
            let page = stats.page.map_or_else(String::new, |p| format!(" · page {p}"));
            println!("    R: {} / I: {}{page}", stats.replies, stats.images);
        }
    }

    Ok(())
}

/// Look up a board's capabilities, falling back to defaults
async fn find_board(api: &FourChanClient, id: &str) -> Board {
    match api.list_boards().await {
        Ok(boards) => boards
            .into_iter()
            .find(|b| b.id == id)
            .unwrap_or_else(|| Board::new(id, id)),
        Err(e) => {
            tracing::warn!("Failed to load boards, assuming defaults for /{id}/: {e}");
            Board::new(id, id)
        }
    }
}

async fn show_thread(board: &str, thread: u64) -> Result<()> {
    let config = Config::load()?;
    let api = FourChanClient::from_config(&config)?;

    let board = find_board(&api, board).await;
    let posts = api
        .fetch_posts(&Thread::new(&board.id, thread))
        .await
        .with_context(|| format!("Failed to load /{}/{thread}", board.id))?;

    let provider = ContentProvider::new(config.theme.colors().content_styles());
    let posts = provider.process_posts(&posts, &board);

    if let Some(root) = posts.first() {
        println!("{} {}", board.path(), root.to_thread().title(WRAP_WIDTH));
        println!("{}", "─".repeat(WRAP_WIDTH));
    }

    for post in &posts {
        print_post(post, &config);
    }

    Ok(())
}

fn print_post(post: &Post, config: &Config) {
    let trip = post.tripcode.as_deref().unwrap_or_default();
    let op = if post.is_root { " [OP]" } else { "" };
    println!(
        "\n{}{} No.{} · {}{op}",
        post.author,
        trip,
        post.id,
        post.relative_time()
    );

    if let Some(attachment) = &post.attachment {
        println!(
            "File: {} ({}x{}) {}",
            attachment.display_name(),
            attachment.width,
            attachment.height,
            attachment.url(&config.media_url, &post.board)
        );
    }

    for line in styled::to_plain(&post.body).lines() {
        for wrapped in textwrap::wrap(line, WRAP_WIDTH) {
            println!("{wrapped}");
        }
    }

    if !post.replies.is_empty() {
        let replies = post
            .replies
            .iter()
            .map(|id| format!(">>{id}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("Replies: {replies}");
    }
}

/// Load the persisted watch-list; a broken store starts empty
fn load_store(db: &Database) -> WatchStore {
    match db.load_watch_list() {
        Ok(threads) => WatchStore::new(threads),
        Err(e) => {
            tracing::warn!("Failed to load watch-list, starting empty: {e}");
            WatchStore::default()
        }
    }
}

async fn watch_thread(board: &str, thread: u64) -> Result<()> {
    let config = Config::load()?;
    let api = FourChanClient::from_config(&config)?;
    let mut db = Database::open()?;
    let store = load_store(&db);

    let posts = api
        .fetch_posts(&Thread::new(board, thread))
        .await
        .with_context(|| format!("Failed to load /{board}/{thread}"))?;
    let (Some(root), Some(last)) = (posts.first(), posts.last()) else {
        anyhow::bail!("/{board}/{thread} has no posts");
    };

    let snapshot = root.to_thread();
    let title = snapshot.title(60);
    if !store.watch(snapshot, last.id) {
        println!("Already watching /{board}/{thread}");
        return Ok(());
    }

    db.save_watch_list(&store.snapshot().threads)?;
    println!("✓ Watching /{board}/{thread}: {title}");
    Ok(())
}

fn unwatch_thread(board: &str, thread: u64) -> Result<()> {
    let mut db = Database::open()?;
    let store = load_store(&db);

    if !store.unwatch(board, thread) {
        println!("Not watching /{board}/{thread}");
        return Ok(());
    }

    db.save_watch_list(&store.snapshot().threads)?;
    println!("✓ Unwatched /{board}/{thread}");
    Ok(())
}

fn acknowledge_thread(board: &str, thread: u64) -> Result<()> {
    let mut db = Database::open()?;
    let store = load_store(&db);

    if store.snapshot().get(board, thread).is_none() {
        anyhow::bail!("Not watching /{board}/{thread}");
    }

    if store.acknowledge(board, thread) {
        db.save_watch_list(&store.snapshot().threads)?;
    }
    println!("✓ /{board}/{thread} marked as read");
    Ok(())
}

fn list_watched() -> Result<()> {
    let db = Database::open()?;
    let list = load_store(&db).snapshot();

    if list.is_empty() {
        println!("No watched threads.");
        println!("\nWatch a thread with:");
        println!("  lurk watch <board> <no>");
        return Ok(());
    }

    print_watch_list(&list);
    Ok(())
}

fn print_watch_list(list: &WatchList) {
    for watched in &list.threads {
        let mut status = Vec::new();
        if watched.has_unread() {
            status.push(format!("{} new", watched.total_new_posts));
        }
        if watched.now_archived {
            status.push("archived".to_string());
        }
        if watched.now_deleted {
            status.push("deleted".to_string());
        }

        let status = if status.is_empty() {
            String::new()
        } else {
            format!(" [{}]", status.join(", "))
        };
        println!(
            "/{}/{} {}{status}",
            watched.board(),
            watched.thread_id(),
            watched.thread.title(60)
        );
    }

    let unread = list.total_unread();
    if unread > 0 {
        println!("\n{unread} unread posts");
    }
}

fn save_snapshot(db: &mut Database, list: &WatchList) {
    if let Err(e) = db.save_watch_list(&list.threads) {
        tracing::warn!("Failed to save watch-list: {e}");
    }
}

async fn poll(once: bool) -> Result<()> {
    let config = Config::load()?;
    let api = Arc::new(FourChanClient::from_config(&config)?);
    let mut db = Database::open()?;
    let store = Arc::new(load_store(&db));

    if store.snapshot().is_empty() {
        println!("No watched threads.");
        return Ok(());
    }

    let watcher = ThreadWatcher::new(api, Arc::clone(&store), config.watch_interval());

    if once {
        let report = watcher.poll_once().await;
        if report.committed {
            save_snapshot(&mut db, &store.snapshot());
        }
        if report.failed > 0 {
            println!("{} threads could not be polled", report.failed);
        }
        print_watch_list(&store.snapshot());
        return Ok(());
    }

    let mut activity = watcher.subscribe();
    let mut changes = store.subscribe();
    watcher.start();

    println!(
        "Watching {} threads every {}s (Ctrl-C to stop)",
        store.snapshot().len(),
        watcher.interval().as_secs()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = activity.recv() => match event {
                Ok(_) => {
                    println!("\nNew replies:");
                    print_watch_list(&store.snapshot());
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            Ok(()) = changes.changed() => {
                let list = changes.borrow_and_update().clone();
                tracing::debug!("Saving watch-list revision {}", list.revision);
                save_snapshot(&mut db, &list);
            }
        }
    }

    save_snapshot(&mut db, &store.snapshot());
    Ok(())
}
