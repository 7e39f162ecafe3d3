//! Terminal UI for building trash and recycling calendar subscription URLs.

mod app;
mod clipboard;
mod config;
mod input;
mod logging;
mod ui;

use std::{io, sync::Arc, time::Duration as StdDuration};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tracing::{debug, info};
use trashcal_core::{ApiError, Completion, PendingRequest, ResolverPort, VersionResponse};

use crate::app::{App, Screen};
use crate::clipboard::TerminalClipboard;
use crate::config::Settings;
use crate::input::Action;

/// Results delivered from background requests.
enum AppEvent {
    Completed(Completion),
    Version {
        town: String,
        result: Result<VersionResponse, ApiError>,
    },
    Streets {
        town: String,
        result: Result<Vec<String>, ApiError>,
    },
}

/// Background requests belonging to the open town page.
struct Tasks {
    handles: Vec<JoinHandle<()>>,
    tx: UnboundedSender<AppEvent>,
}

impl Tasks {
    fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        let tx = self.tx.clone();
        self.handles.push(tokio::spawn(async move {
            if tx.send(work.await).is_err() {
                debug!("ui closed before request finished");
            }
        }));
    }

    fn request(&mut self, port: Arc<dyn ResolverPort>, pending: PendingRequest) {
        debug!(request = ?pending.id(), "spawning request");
        self.spawn(async move { AppEvent::Completed(pending.run(port.as_ref()).await) });
    }

    fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;
    let settings = Settings::from_env()?;

    // HTTP + app setup
    let client = Client::builder().user_agent("trashcal/0.1").build()?;
    let mut app = App::new(client, settings.towns, settings.api_base_override);
    let open_on_start = match settings.start_town.as_deref() {
        Some(slug) => {
            app.select_town(slug)?;
            true
        }
        None => false,
    };
    info!(towns = app.towns.towns().len(), "starting trashcal");

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app, open_on_start).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    open_on_start: bool,
) -> Result<()> {
    let (tx, mut rx): (UnboundedSender<AppEvent>, UnboundedReceiver<AppEvent>) =
        unbounded_channel();
    let mut tasks = Tasks {
        handles: Vec::new(),
        tx,
    };
    if open_on_start {
        open_town(&mut app, &mut tasks);
    }

    loop {
        // Fold in finished background requests
        while let Ok(event) = rx.try_recv() {
            apply_event(&mut app, event);
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::OpenTown => open_town(&mut app, &mut tasks),
                Action::LeaveTown => {
                    tasks.abort_all();
                    app.leave_town();
                }
                Action::SubmitDirect => {
                    if let Some(session) = app.session.as_mut()
                        && let Some(pending) = session.begin_direct()
                    {
                        tasks.request(session.port(), pending);
                    }
                }
                Action::SubmitResolve => {
                    if let Some(session) = app.session.as_mut()
                        && let Some(pending) = session.begin_resolve()
                    {
                        tasks.request(session.port(), pending);
                    }
                }
                Action::AcceptSuggestion(street) => {
                    if let Some(session) = app.session.as_mut()
                        && let Some(pending) = session.begin_suggestion(&street)
                    {
                        tasks.request(session.port(), pending);
                    }
                }
                Action::CopyUrl => {
                    if let Some(session) = app.session.as_mut() {
                        session.copy_subscription_url(&mut TerminalClipboard);
                    }
                }
            }
            app.sync_suggestions();
        }
    }

    tasks.abort_all();
    Ok(())
}

/// Open the highlighted town and start its version and street lookups.
fn open_town(app: &mut App, tasks: &mut Tasks) {
    tasks.abort_all();
    if let Err(err) = app.open_current_town() {
        app.error_message = Some(format!("Cannot open town: {err}"));
        return;
    }
    let Some(session) = app.session.as_ref() else {
        return;
    };

    let town = session.town().id.clone();
    let port = session.port();
    let streets_port = Arc::clone(&port);
    let streets_town = town.clone();
    tasks.spawn(async move {
        AppEvent::Version {
            town,
            result: port.fetch_version().await,
        }
    });
    tasks.spawn(async move {
        AppEvent::Streets {
            town: streets_town,
            result: streets_port.fetch_streets().await,
        }
    });
}

fn apply_event(app: &mut App, event: AppEvent) {
    let Some(session) = app.session.as_mut() else {
        return;
    };
    if app.screen != Screen::Planner {
        return;
    }

    match event {
        AppEvent::Completed(completion) => {
            if session.apply(completion) {
                app.suggestion_index = 0;
            }
        }
        AppEvent::Version { town, result } if town == session.town().id => {
            session.apply_version(result);
        }
        AppEvent::Streets { town, result } if town == session.town().id => {
            session.apply_streets(result);
        }
        AppEvent::Version { .. } | AppEvent::Streets { .. } => {}
    }
    app.sync_suggestions();
}
