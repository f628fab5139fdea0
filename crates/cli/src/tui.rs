//! # Terminal Lifecycle and Event Loop

use crate::{
    app::{App, Focus},
    ui::ui,
};
use anyhow::Result;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    Terminal,
};
use std::{
    io::{self, Stdout},
    time::Duration,
};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Greeting animation speed.
const TICK: Duration = Duration::from_millis(50);

fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stdout()))?)
}

fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Takes over the terminal until the user quits. The terminal is restored on
/// every exit path.
pub async fn run(app: &mut App) -> Result<()> {
    let mut terminal = init()?;
    let result = event_loop(&mut terminal, app).await;
    restore()?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|frame| ui(frame, app))?;

        if !event::poll(TICK)? {
            app.tick();
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => app.quit(),
            KeyCode::Char('c') if ctrl => app.quit(),
            KeyCode::Char('s') if ctrl => app.submit_examples(),
            KeyCode::Tab => app.toggle_focus(),
            KeyCode::F(2) => app.toggle_answer_mode(),
            KeyCode::PageUp => app.increase_tokens(),
            KeyCode::PageDown => app.decrease_tokens(),
            KeyCode::Enter => match app.focus {
                Focus::Question => {
                    app.busy = true;
                    app.status = "Generating...".to_string();
                    terminal.draw(|frame| ui(frame, app))?;
                    app.submit_question().await;
                    app.busy = false;
                }
                Focus::Examples => app.push_char('\n'),
            },
            KeyCode::Backspace => app.pop_char(),
            KeyCode::Char(c) => app.push_char(c),
            _ => {}
        }
    }
    Ok(())
}
