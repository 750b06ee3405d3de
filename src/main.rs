mod app;
mod backend;
mod config;
mod error;
mod ui;

use app::{App, Focus};
use backend::bookmarks::BookmarkStore;
use backend::mangadex::{CatalogClient, Completion, HttpTransport};
use config::Config;
use ui::ui::{Screen, ui};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{error::Error, fs, io};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env();
    init_logging(&config);

    let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Completion>();
    let transport = HttpTransport::new(&config, completion_tx)?;
    let client = CatalogClient::new(&config, Box::new(transport));

    if let Some(dir) = config.database_path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let (store, store_error) = match BookmarkStore::open(&config.database_path).await {
        Ok(store) => (Some(store), None),
        Err(err) => (None, Some(err)),
    };
    let has_store = store.is_some();

    let mut app = App::new(client, store);
    if let Some(err) = store_error {
        app.report(err);
    }
    if has_store {
        if let Err(err) = app.reload_bookmarks().await {
            app.report(err);
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut screen = Screen::new();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &mut screen, &mut completion_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err}");
    }
    Ok(())
}

fn init_logging(config: &Config) {
    if let Some(dir) = config.log_path.parent() {
        fs::create_dir_all(dir).ok();
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // stderr belongs to the terminal UI, so logs go to a file or nowhere.
    match fs::File::create(&config.log_path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    screen: &mut Screen,
    completions: &mut mpsc::UnboundedReceiver<Completion>,
) -> io::Result<()> {
    let mut event_stream = EventStream::new();

    loop {
        terminal.draw(|f| ui(f, app, screen))?;

        tokio::select! {
            // Handle keyboard events
            Some(Ok(event)) = event_stream.next() => {
                if let Event::Key(key) = event {
                    if key.kind == KeyEventKind::Press && handle_key(app, key).await {
                        return Ok(());
                    }
                }
            }

            // Handle finished requests
            Some(completion) = completions.recv() => {
                if let Err(err) = app.handle_completion(completion) {
                    app.report(err);
                }
            }

            else => return Ok(()),
        }
    }
}

/// Returns true when the user asked to quit.
async fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    // Modals swallow the key that closes them.
    if app.notice().is_some() {
        app.dismiss_notice();
        return false;
    }
    if app.pending_delete.is_some() {
        let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
        if let Err(err) = app.confirm_delete(confirmed).await {
            app.report(err);
        }
        return false;
    }

    match key.code {
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return false;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return false;
        }
        _ => {}
    }

    if app.focus == Focus::Search {
        handle_search_input(app, key.code);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('/') => app.focus = Focus::Search,
        KeyCode::Up => app.move_selection(-1),
        KeyCode::Down => app.move_selection(1),
        KeyCode::Enter => match app.focus {
            Focus::Manga => app.open_selected_manga(),
            Focus::Chapters => app.select_chapter(),
            Focus::Bookmarks => app.open_selected_bookmark(),
            Focus::Search => {}
        },
        KeyCode::Char('m') => {
            if let Err(err) = app.mark_last_read().await {
                app.report(err);
            }
        }
        KeyCode::Char('d') if app.focus == Focus::Bookmarks => {
            if let Err(err) = app.request_delete() {
                app.report(err);
            }
        }
        _ => {}
    }
    false
}

fn handle_search_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char(c) => app.search_query.push(c),
        KeyCode::Backspace => {
            app.search_query.pop();
        }
        KeyCode::Enter => match app.search() {
            Ok(()) => app.focus = Focus::Manga,
            Err(err) => app.report(err),
        },
        KeyCode::Esc => app.focus = Focus::Manga,
        _ => {}
    }
}
