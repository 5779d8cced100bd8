//! TUI module using ratatui.
//!
//! Component-based layout: language selector and error banner on top, search
//! input and results on the left, upload input and summary on the right, key
//! help and the loading indicator in the footer.
//!
//! Network jobs run as spawned tokio tasks and report back over a channel. The
//! store discards completions that a newer request has superseded. Terminal
//! input is read on a blocking thread and forwarded the same way.

use crate::backend::ACCEPTED_EXTENSIONS;
use crate::client::{SearchJob, SummarizerClient, SummaryJob};
use crate::config::Config;
use crate::export;
use crate::state::{Action, ErrorDomain};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

const TICK: Duration = Duration::from_millis(50);
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Search,
    Results,
    Upload,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Search => Focus::Results,
            Focus::Results => Focus::Upload,
            Focus::Upload => Focus::Search,
        }
    }
}

struct App {
    client: SummarizerClient,
    config: Config,
    focus: Focus,
    search_input: String,
    upload_input: String,
    selected: usize,
    status: Option<String>,
    tick: usize,
    tx: UnboundedSender<Action>,
    quit: bool,
}

/// Run the TUI until the user quits
pub async fn run(config: Config) -> anyhow::Result<()> {
    let client = SummarizerClient::from_config(&config)?;
    let (tx, mut rx) = unbounded_channel();
    let mut app = App {
        client,
        config,
        focus: Focus::Search,
        search_input: String::new(),
        upload_input: String::new(),
        selected: 0,
        status: None,
        tick: 0,
        tx,
        quit: false,
    };

    let mut terminal = ratatui::init();
    let result = app.event_loop(&mut terminal, &mut rx).await;
    ratatui::restore();
    result
}

/// Forward key presses until the receiver goes away or the terminal fails.
fn read_keys(tx: UnboundedSender<std::io::Result<KeyEvent>>) {
    while !tx.is_closed() {
        let key = match event::poll(TICK) {
            Ok(false) => continue,
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Ok(key),
                Ok(_) => continue,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        let failed = key.is_err();
        if tx.send(key).is_err() || failed {
            break;
        }
    }
}

impl App {
    async fn event_loop(
        &mut self,
        terminal: &mut DefaultTerminal,
        rx: &mut UnboundedReceiver<Action>,
    ) -> anyhow::Result<()> {
        let (key_tx, mut keys) = unbounded_channel();
        let input = tokio::task::spawn_blocking(move || read_keys(key_tx));
        let mut ticker = tokio::time::interval(TICK);

        while !self.quit {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                Some(action) = rx.recv() => {
                    self.client.apply(action);
                    self.clamp_selection();
                }
                key = keys.recv() => match key {
                    Some(key) => self.handle_key(key?),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.tick = self.tick.wrapping_add(1);
                }
            }
        }

        drop(keys);
        input.await?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        self.status = None;
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.quit = true;
            return;
        }
        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return;
            }
            KeyCode::F(2) => {
                self.cycle_language();
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Search => match key.code {
                KeyCode::Enter => self.submit_search(),
                KeyCode::Backspace => {
                    self.search_input.pop();
                    self.client.set_query(self.search_input.clone());
                }
                KeyCode::Char(c) => {
                    self.search_input.push(c);
                    self.client.set_query(self.search_input.clone());
                }
                _ => {}
            },
            Focus::Upload => match key.code {
                KeyCode::Enter => self.submit_upload(),
                KeyCode::Backspace => {
                    self.upload_input.pop();
                }
                KeyCode::Char(c) => self.upload_input.push(c),
                _ => {}
            },
            Focus::Results => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.selected = self.selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.selected += 1;
                    self.clamp_selection();
                }
                KeyCode::Enter => self.summarize_selected(),
                KeyCode::Char('l') => self.cycle_language(),
                KeyCode::Char('r') => self.retry(),
                KeyCode::Char('s') => self.save_summary(),
                KeyCode::Char('a') => self.save_audio(),
                KeyCode::Char('p') => self.play_audio(),
                KeyCode::Char('q') => self.quit = true,
                _ => {}
            },
        }
    }

    fn cycle_language(&mut self) {
        let next = self.client.store().language().next();
        self.client.set_language(next);
    }

    fn submit_search(&mut self) {
        let query = self.search_input.clone();
        if let Some(job) = self.client.start_search(&query) {
            self.selected = 0;
            self.spawn_search(job);
        }
    }

    fn summarize_selected(&mut self) {
        if self.client.store().is_loading() {
            return;
        }
        let Some(key) = self
            .client
            .store()
            .search()
            .results
            .get(self.selected)
            .map(|r| r.key.clone())
        else {
            return;
        };
        let job = self.client.start_book(key);
        self.spawn_summary(job);
    }

    fn submit_upload(&mut self) {
        let path = self.upload_input.trim();
        if path.is_empty() || self.client.store().is_loading() {
            return;
        }
        let job = self.client.start_upload(path.to_string());
        self.spawn_summary(job);
    }

    fn retry(&mut self) {
        if let Some(job) = self.client.start_retry() {
            self.spawn_summary(job);
        }
    }

    fn spawn_search(&self, job: SearchJob) {
        let catalog = self.client.catalog();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let action = job.run(catalog.as_ref()).await;
            let _ = tx.send(action);
        });
    }

    fn spawn_summary(&self, job: SummaryJob) {
        let backend = self.client.backend();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let action = job.run(backend.as_ref()).await;
            let _ = tx.send(action);
        });
    }

    fn save_summary(&mut self) {
        let Some(text) = self.client.store().summary_text() else {
            return;
        };
        self.status = Some(match export::save_summary(&self.config.session.download_dir, text) {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => e.to_string(),
        });
    }

    fn save_audio(&mut self) {
        let Some(handle) = self.client.store().audio() else {
            return;
        };
        self.status = Some(
            match export::save_audio(&self.config.session.download_dir, handle.clip()) {
                Ok(path) => format!("Saved {}", path.display()),
                Err(e) => e.to_string(),
            },
        );
    }

    fn play_audio(&mut self) {
        let Some(handle) = self.client.store().audio() else {
            return;
        };
        let Some(player) = self.config.session.player.as_deref() else {
            self.status = Some("No player configured; set session.player in tomecast.toml".into());
            return;
        };
        // the player keeps the file even if a new summary replaces the handle
        let lease = handle.lease();
        let spawned = tokio::process::Command::new(player)
            .arg(lease.path())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        self.status = Some(match spawned {
            Ok(mut child) => {
                info!(player, path = %lease.path().display(), "playing narration");
                tokio::spawn(async move {
                    let status = child.wait().await;
                    debug!(?status, path = %lease.path().display(), "player exited");
                });
                format!("Playing with {player}")
            }
            Err(e) => {
                error!(player, error = %e, "failed to start player");
                format!("Could not start {player}: {e}")
            }
        });
    }

    fn clamp_selection(&mut self) {
        let len = self.client.store().search().results.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn render(&self, frame: &mut Frame) {
        let [header, banner, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(if self.client.store().visible_error().is_some() { 3 } else { 0 }),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_header(frame, header);
        self.render_error(frame, banner);

        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
        let [search, results] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(left);
        let [upload, summary] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(right);

        self.render_input(frame, search, "Search Free Books", &self.search_input, Focus::Search);
        self.render_results(frame, results);
        self.render_input(frame, upload, "Upload PDF or Text (path)", &self.upload_input, Focus::Upload);
        self.render_summary(frame, summary);
        self.render_footer(frame, footer);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let language = self.client.store().language();
        let line = Line::from(vec![
            " Book & Document Summarizer ".bold().reversed(),
            Span::raw("  Language: "),
            Span::styled(
                format!("{} ({})", language.display_name(), language.code()),
                Style::new().fg(Color::Cyan),
            ),
            Span::raw("  [F2] change"),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_error(&self, frame: &mut Frame, area: Rect) {
        let store = self.client.store();
        let Some(error) = store.visible_error() else {
            return;
        };
        let mut spans = vec![Span::raw(error.message.clone())];
        if store.retry_available() {
            spans.push(Span::styled("  [r] Retry", Style::new().add_modifier(Modifier::BOLD)));
        }
        let others = store.errors().len() - 1;
        if others > 0 {
            spans.push(Span::raw(format!("  (+{others} more)")));
        }
        let title = match error.domain {
            ErrorDomain::Search => "Search error",
            ErrorDomain::Audio => "Audio error",
            _ => "Error",
        };
        frame.render_widget(
            Paragraph::new(Line::from(spans))
                .style(Style::new().fg(Color::Red))
                .block(Block::bordered().title(title)),
            area,
        );
    }

    fn render_input(&self, frame: &mut Frame, area: Rect, title: &str, value: &str, focus: Focus) {
        let style = if self.focus == focus {
            Style::new().fg(Color::Yellow)
        } else {
            Style::new()
        };
        let placeholder = match focus {
            Focus::Upload => format!("path to .{} file", ACCEPTED_EXTENSIONS.join(" or .")),
            _ => "Search by book title...".to_string(),
        };
        let text = if value.is_empty() {
            Span::styled(placeholder, Style::new().fg(Color::DarkGray))
        } else {
            Span::raw(value.to_string())
        };
        frame.render_widget(
            Paragraph::new(text).block(Block::bordered().title(title).border_style(style)),
            area,
        );
    }

    fn render_results(&self, frame: &mut Frame, area: Rect) {
        let store = self.client.store();
        let search = store.search();
        let border = if self.focus == Focus::Results {
            Style::new().fg(Color::Yellow)
        } else {
            Style::new()
        };
        let block = Block::bordered().title("Results").border_style(border);

        if search.results.is_empty() {
            let message = if store.is_searching() {
                "Searching...".to_string()
            } else if !search.query.trim().is_empty() {
                format!("No books found for \"{}\".", search.query)
            } else {
                String::new()
            };
            frame.render_widget(Paragraph::new(message).block(block), area);
            return;
        }

        let items: Vec<ListItem> = search
            .results
            .iter()
            .map(|result| {
                let cover = if result.cover_id.is_some() { "[cover]   " } else { "[No Cover]" };
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(cover, Style::new().fg(Color::DarkGray)),
                        Span::raw(" "),
                        Span::styled(
                            result.title.clone(),
                            Style::new().add_modifier(Modifier::BOLD),
                        ),
                    ]),
                    Line::from(format!("           by {}", result.author)),
                ])
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(self.selected));
        let highlight = if store.is_loading() {
            Style::new().fg(Color::DarkGray)
        } else {
            Style::new().bg(Color::Blue)
        };
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight)
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect) {
        let store = self.client.store();
        let dim = Style::new().fg(Color::DarkGray);
        let mut lines: Vec<Line> = Vec::new();

        if store.is_loading() {
            let spin = SPINNER[self.tick / 4 % SPINNER.len()];
            lines.push(Line::from(format!("{spin} Processing, please wait...")));
        } else if let Some(text) = store.summary_text() {
            lines.extend(text.lines().map(|l| Line::from(l.to_string())));
            lines.push(Line::default());
            match store.audio() {
                Some(handle) => lines.push(Line::styled(
                    format!(
                        "Audio: {} KiB {}  [p] play  [a] save audio",
                        handle.clip().len().div_ceil(1024),
                        handle.clip().mime()
                    ),
                    Style::new().fg(Color::Green),
                )),
                None => lines.push(Line::styled("Audio: unavailable", dim)),
            }
            lines.push(Line::styled("[s] save summary", dim));
        } else if let Some(result) = store.search().results.get(self.selected) {
            let cover = result
                .cover_url(&self.config.catalog.cover_url)
                .unwrap_or_else(|| "No Cover".to_string());
            lines.push(Line::from(format!("{} by {}", result.title, result.author)));
            lines.push(Line::styled(format!("Key: {}", result.key), dim));
            lines.push(Line::styled(format!("Cover: {cover}"), dim));
        }

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title("Summary")),
            area,
        );
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let text = match &self.status {
            Some(status) => status.clone(),
            None => "Tab focus  Enter submit/summarise  j/k move  l language  r retry  s/a save  p play  Esc quit"
                .to_string(),
        };
        frame.render_widget(Paragraph::new(text).style(Style::new().fg(Color::DarkGray)), area);
    }
}
