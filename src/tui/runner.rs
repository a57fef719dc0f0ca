//! Picker runner: terminal setup plus the main loop.
//!
//! One loop turn handles exactly one event (a key or a fetch completion)
//! and then redraws. Terminal events come from a single blocking reader
//! that forwards everything it reads, so a completion winning the race
//! never swallows a key press.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::input;
use super::layout;
use super::session::{Persist, Session};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the interactive picker until the session finishes.
pub async fn run_picker<P: Persist>(session: &mut Session<P>) -> anyhow::Result<()> {
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let reader = tokio::task::spawn_blocking(move || pump_events(&tx, poll_terminal));

    let result = event_loop(&mut terminal, session, rx).await;
    // The reader notices the closed channel on its next poll.
    let _ = reader.await;

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    result
}

/// One bounded wait for a terminal event.
fn poll_terminal() -> io::Result<Option<Event>> {
    if event::poll(POLL_INTERVAL)? {
        event::read().map(Some)
    } else {
        Ok(None)
    }
}

/// Forward events from `next` until the receiver goes away or reading fails.
fn pump_events<F>(tx: &UnboundedSender<Event>, mut next: F) -> io::Result<()>
where
    F: FnMut() -> io::Result<Option<Event>>,
{
    while !tx.is_closed() {
        if let Some(ev) = next()? {
            if tx.send(ev).is_err() {
                break;
            }
        }
    }
    Ok(())
}

async fn event_loop<P: Persist>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session<P>,
    mut events: UnboundedReceiver<Event>,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| layout::draw(f, &session.state))?;
        if session.state.finished {
            return Ok(());
        }

        tokio::select! {
            Some(msg) = session.recv() => {
                session.dispatch(msg);
            }
            ev = events.recv() => match ev {
                Some(Event::Key(key)) => {
                    if let Some(action) = input::action_for(&session.state, key) {
                        session.dispatch(action);
                    }
                }
                Some(_) => {}
                None => anyhow::bail!("terminal input closed"),
            },
        }
    }
}
