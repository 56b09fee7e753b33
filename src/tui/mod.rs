mod app;
mod event;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::auth::Caller;
use crate::page::PagerStatus;
use crate::store::Store;
use crate::subscribe::{self, QueryKey};
use crate::watch;
use app::{App, Mode};

pub fn run(db_path: &str, store: &Store, caller: Caller) -> Result<()> {
    let owner = caller.require()?;
    let mut app = App::new(store, caller)?;

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, db_path, store, owner);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db_path: &str,
    store: &Store,
    owner: i64,
) -> Result<()> {
    let rx_list = store.subscribe(QueryKey::AllTasks { owner });
    let rx_search = store.subscribe(QueryKey::Search { owner });
    let _watcher = watch::watch_store(db_path, store.subscriptions())?;

    loop {
        terminal.draw(|frame| render(frame, app))?;

        if ct_event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press && event::handle_key(app, key) {
                    return Ok(());
                }
            }
        }

        // Live updates: both in-process writes and external ones arrive here
        if subscribe::changed(&rx_list) || subscribe::changed(&rx_search) {
            subscribe::drain(&rx_list);
            subscribe::drain(&rx_search);
            app.refresh();
        }
    }
}

fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(2),
    ])
    .split(frame.area());

    let mut header = vec![Span::styled("taskbook", Style::new().bold())];
    if !app.query.is_empty() {
        header.push(Span::raw(format!("  search: {}", app.query)));
    }
    if let Some(filters) = app.filter_summary() {
        header.push(Span::raw(format!("  filter: {filters}")));
    }
    frame.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    let mut lines: Vec<Line> = Vec::new();
    for (i, task) in app.pager.rows.iter().enumerate() {
        let priority = task
            .priority
            .map(|p| format!(" [{p}]"))
            .unwrap_or_default();
        let text = format!("{} #{} {}{}", task.status.icon(), task.id, task.name, priority);
        let style = if i == app.cursor {
            Style::new().reversed()
        } else {
            Style::new()
        };
        lines.push(Line::styled(text, style));
    }
    frame.render_widget(Paragraph::new(lines), chunks[1]);

    let footer = match app.mode {
        Mode::Search => format!("/{}", app.input),
        Mode::Normal => {
            let paging = match app.pager.status() {
                PagerStatus::LoadingFirstPage | PagerStatus::LoadingMore => "loading...",
                PagerStatus::CanLoadMore => "n: load more",
                PagerStatus::Exhausted => "end of list",
            };
            match app.error() {
                Some(err) => format!("error: {err}"),
                None => format!(
                    "{paging}  |  j/k move  / search  f/p filter  c complete  d delete  q quit"
                ),
            }
        }
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}
