use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{Local, NaiveDate};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use crate::calendar::{upcoming, CalendarModel, MonthGrid, UpcomingEntry, GRID_ROWS, WEEKDAY_HEADER};
use crate::cards::{card_title, CardRegistry, PointerOutcome, CARDS};
use crate::config::Config;
use crate::events::{date_key, EventStore};
use crate::layout::{card_size, Card, LayoutStore};
use crate::memo::Memo;
use crate::storage::KeyValueStore;

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const GRABBED_PANEL_BORDER_COLOR: Color = Color::LightGreen;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

/// Width of one day cell in the calendar grid: two digits plus the event
/// marker column. Click routing divides by this to find the weekday column.
const DAY_CELL_WIDTH: u16 = 3;

/// Row offset of the first grid row inside the calendar card body: the nav
/// header and the weekday header come first.
const GRID_TOP_ROW: u16 = 2;

pub fn run_dashboard(store: &mut dyn KeyValueStore, config: &Config) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, store, config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    store: &mut dyn KeyValueStore,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let mut app = App::default();
    let mut registry = CardRegistry::new(LayoutStore::load(store));
    let mut events = EventStore::load(store);
    let mut memo = Memo::load(store);
    let mut calendar = CalendarModel::for_today(Local::now().date_naive());

    loop {
        if let Some(warning) = registry.take_warning().or_else(|| events.take_warning()) {
            app.status = format!("warning: {warning}");
        }

        let today = Local::now().date_naive();
        let view = build_view(&calendar, &events, &memo, today, config.upcoming_limit);
        let mut container = Rect::default();
        terminal.draw(|frame| {
            container = cards_area(frame.area());
            draw_dashboard(frame, &app, &registry, &view);
        })?;

        if !event::poll(StdDuration::from_millis(config.poll_ms))? {
            continue;
        }

        match event::read()? {
            CEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                let should_quit = match &app.mode {
                    InputMode::Prompt(_) => {
                        handle_prompt_key(&mut app, key.code, store, &mut events, &mut memo)
                    }
                    InputMode::Panel(_) => {
                        handle_panel_key(&mut app, key.code, store, &mut registry)
                    }
                    InputMode::Normal => handle_normal_key(
                        &mut app,
                        key.code,
                        store,
                        &mut registry,
                        &events,
                        &mut calendar,
                        container,
                        today,
                    ),
                };

                if should_quit {
                    break;
                }
            }
            CEvent::Mouse(mouse) => handle_mouse(
                &mut app,
                mouse,
                store,
                &mut registry,
                &events,
                &mut calendar,
                &memo,
                &view,
                container,
            ),
            _ => {}
        }
    }

    Ok(())
}

/// Everything above the footer belongs to the cards; pointer coordinates are
/// measured against this rect.
fn cards_area(area: Rect) -> Rect {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(5)])
        .split(area)[0]
}

fn draw_dashboard(frame: &mut Frame, app: &App, registry: &CardRegistry, view: &ViewModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(5)])
        .split(frame.area());

    // Back-to-front: the last card painted wins overlaps, and the registry
    // keeps a live drag at the end of that order.
    for (id, card) in registry.visible_cards() {
        render_card(frame, chunks[0], app, registry, view, id, card);
    }

    render_footer(frame, chunks[1], app);

    if let InputMode::Panel(panel) = &app.mode {
        render_panel_popup(frame, panel, registry);
    }
}

fn render_card(
    frame: &mut Frame,
    container: Rect,
    app: &App,
    registry: &CardRegistry,
    view: &ViewModel,
    id: &str,
    card: &Card,
) {
    let (width, height) = card_size(card, (container.width, container.height));
    let area = Rect {
        x: container.x.saturating_add(card.x.max(0) as u16),
        y: container.y.saturating_add(card.y.max(0) as u16),
        width,
        height,
    }
    .intersection(container);
    if area.width < 2 || area.height < 2 {
        return;
    }

    let grabbed = registry.dragging() == Some(id);
    let focused = CARDS.get(app.focus).map(|meta| meta.id) == Some(id);
    let style = if grabbed {
        Style::default()
            .fg(GRABBED_PANEL_BORDER_COLOR)
            .add_modifier(Modifier::BOLD)
    } else {
        border_style(focused)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(card_title(id))
        .title_top(Line::from("x").right_aligned())
        .border_style(style);
    let body = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    match id {
        "card-memo" => render_memo_body(frame, body, view),
        "card-calendar" => render_calendar_body(frame, body, view),
        "card-events" => render_upcoming_body(frame, body, view),
        _ => render_placeholder_body(frame, body),
    }
}

fn render_memo_body(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let text = if view.memo.is_empty() {
        "(click to write a memo)"
    } else {
        view.memo.as_str()
    };
    let memo = Paragraph::new(text).wrap(Wrap { trim: false });
    frame.render_widget(memo, area);
}

fn render_calendar_body(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let mut lines = Vec::new();
    lines.push(Line::from(nav_header(&view.month_title, area.width)));
    lines.push(Line::from(WEEKDAY_HEADER.join(" ")));

    for row in view.grid.rows() {
        let mut spans = Vec::new();
        for cell in row {
            match cell {
                None => spans.push(Span::raw("   ")),
                Some(cell) => {
                    let mut style = Style::default();
                    if cell.is_today {
                        style = style
                            .fg(Color::Black)
                            .bg(Color::Yellow)
                            .add_modifier(Modifier::BOLD);
                    } else if cell.has_event {
                        style = style.fg(Color::LightYellow).add_modifier(Modifier::BOLD);
                    }
                    let marker = if cell.has_event { '*' } else { ' ' };
                    spans.push(Span::styled(format!("{:>2}{marker}", cell.day), style));
                }
            }
        }
        lines.push(Line::from(spans));
    }

    if let Some(title) = view
        .grid
        .cells
        .iter()
        .flatten()
        .find(|cell| cell.is_today)
        .and_then(|cell| cell.first_title.as_deref())
    {
        lines.push(Line::from(format!("today: {title}")));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_upcoming_body(frame: &mut Frame, area: Rect, view: &ViewModel) {
    // One entry per row, no wrapping, so a click row maps straight back to
    // an entry index.
    let lines = if view.upcoming.is_empty() {
        vec![Line::from("(no upcoming events)")]
    } else {
        view.upcoming
            .iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        entry.date.format("%d %b").to_string(),
                        Style::default().fg(Color::LightYellow),
                    ),
                    Span::raw(format!(" {}", entry.title)),
                ])
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_placeholder_body(frame: &mut Frame, area: Rect) {
    let placeholder = Paragraph::new("(content arrives from an external data source)")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(placeholder, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let footer_lines = match &app.mode {
        InputMode::Normal => vec![
            Line::from("drag a card by its top edge | x hides | click a day or upcoming row to edit"),
            Line::from("q quit | n/p month | e edit today | m manage cards | Tab focus | h/j/k/l move | H/J/K/L resize"),
            Line::from(app.status.clone()),
        ],
        InputMode::Prompt(prompt) => vec![
            Line::from(prompt.title.clone()),
            Line::from(format!("> {}", prompt.input)),
            Line::from("Enter submit | Esc cancel"),
        ],
        InputMode::Panel(_) => vec![
            Line::from("Manage cards"),
            Line::from("j/k move | space toggle | r reset layout | Esc close"),
            Line::from(app.status.clone()),
        ],
    };

    let footer = Paragraph::new(footer_lines)
        .block(Block::default().borders(Borders::ALL).title("Shortcuts"));
    frame.render_widget(footer, area);
}

fn render_panel_popup(frame: &mut Frame, panel: &PanelState, registry: &CardRegistry) {
    let area = centered_rect(36, 45, frame.area());
    frame.render_widget(Clear, area);

    // The checkmarks come straight off the layout store each frame, so the
    // toggle UI cannot drift from the persisted flags.
    let items = CARDS
        .iter()
        .map(|meta| {
            let visible = registry
                .layout()
                .card(meta.id)
                .map(|card| card.visible())
                .unwrap_or(false);
            ListItem::new(format!("[{}] {}", if visible { "x" } else { " " }, meta.title))
        })
        .collect::<Vec<_>>();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Cards"))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

    let mut state = ListState::default();
    state.select(Some(panel.selected.min(CARDS.len() - 1)));
    frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// `<` at the first body column, `>` at the last, title centered between.
/// The click router matches those two columns for month navigation.
fn nav_header(title: &str, width: u16) -> String {
    let width = width as usize;
    if width < title.len() + 4 {
        return format!("< {title} >");
    }
    let inner = width - 2;
    let pad_left = (inner - title.len()) / 2;
    let pad_right = inner - title.len() - pad_left;
    format!("<{}{}{}>", " ".repeat(pad_left), title, " ".repeat(pad_right))
}

fn handle_normal_key(
    app: &mut App,
    code: KeyCode,
    store: &mut dyn KeyValueStore,
    registry: &mut CardRegistry,
    events: &EventStore,
    calendar: &mut CalendarModel,
    container: Rect,
    today: NaiveDate,
) -> bool {
    let extent = (container.width, container.height);
    let focused = CARDS.get(app.focus).map(|meta| meta.id).unwrap_or(CARDS[0].id);

    match code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => app.cycle_focus(registry, 1),
        KeyCode::BackTab => app.cycle_focus(registry, -1),
        KeyCode::Char('n') => {
            calendar.next();
            app.status = calendar.title();
        }
        KeyCode::Char('p') => {
            calendar.previous();
            app.status = calendar.title();
        }
        KeyCode::Char('e') => open_event_prompt(app, events, date_key(today)),
        KeyCode::Char('m') => app.mode = InputMode::Panel(PanelState { selected: 0 }),
        // Horizontal steps are doubled: terminal cells are about twice as
        // tall as they are wide.
        KeyCode::Left | KeyCode::Char('h') => registry.move_card(store, focused, (-2, 0), extent),
        KeyCode::Right | KeyCode::Char('l') => registry.move_card(store, focused, (2, 0), extent),
        KeyCode::Up | KeyCode::Char('k') => registry.move_card(store, focused, (0, -1), extent),
        KeyCode::Down | KeyCode::Char('j') => registry.move_card(store, focused, (0, 1), extent),
        KeyCode::Char('H') => registry.resize_card(store, focused, (-2, 0), extent),
        KeyCode::Char('L') => registry.resize_card(store, focused, (2, 0), extent),
        KeyCode::Char('K') => registry.resize_card(store, focused, (0, -1), extent),
        KeyCode::Char('J') => registry.resize_card(store, focused, (0, 1), extent),
        _ => {}
    }

    false
}

fn handle_prompt_key(
    app: &mut App,
    code: KeyCode,
    store: &mut dyn KeyValueStore,
    events: &mut EventStore,
    memo: &mut Memo,
) -> bool {
    match code {
        KeyCode::Esc => {
            app.mode = InputMode::Normal;
            app.status = "Input cancelled".to_string();
        }
        KeyCode::Backspace => {
            if let InputMode::Prompt(prompt) = &mut app.mode {
                prompt.input.pop();
            }
        }
        KeyCode::Char(value) => {
            if let InputMode::Prompt(prompt) = &mut app.mode {
                prompt.input.push(value);
            }
        }
        KeyCode::Enter => {
            let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
                InputMode::Prompt(prompt) => prompt,
                other => {
                    app.mode = other;
                    return false;
                }
            };

            match prompt.kind {
                PromptKind::EditEvent { date_key } => {
                    let removed = prompt.input.trim().is_empty();
                    events.edit(store, &date_key, Some(prompt.input.as_str()));
                    app.status = if removed {
                        format!("removed event for {date_key}")
                    } else {
                        format!("saved event for {date_key}")
                    };
                }
                PromptKind::EditMemo => match memo.save(store, prompt.input) {
                    Ok(message) | Err(message) => app.status = message,
                },
            }
        }
        _ => {}
    }

    false
}

fn handle_panel_key(
    app: &mut App,
    code: KeyCode,
    store: &mut dyn KeyValueStore,
    registry: &mut CardRegistry,
) -> bool {
    match code {
        KeyCode::Esc | KeyCode::Char('m') => {
            app.mode = InputMode::Normal;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if let InputMode::Panel(panel) = &mut app.mode {
                panel.selected = panel.selected.saturating_sub(1);
            }
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if let InputMode::Panel(panel) = &mut app.mode {
                panel.selected = (panel.selected + 1).min(CARDS.len() - 1);
            }
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let InputMode::Panel(panel) = &app.mode {
                let meta = CARDS[panel.selected.min(CARDS.len() - 1)];
                let visible = registry
                    .layout()
                    .card(meta.id)
                    .map(|card| card.visible())
                    .unwrap_or(false);
                registry.set_visible(store, meta.id, !visible);
                app.status = format!(
                    "{} {}",
                    meta.title,
                    if visible { "hidden" } else { "shown" }
                );
            }
        }
        KeyCode::Char('r') => {
            registry.reset_layout(store);
            app.status = "layout reset to defaults".to_string();
        }
        _ => {}
    }

    false
}

fn handle_mouse(
    app: &mut App,
    mouse: MouseEvent,
    store: &mut dyn KeyValueStore,
    registry: &mut CardRegistry,
    events: &EventStore,
    calendar: &mut CalendarModel,
    memo: &Memo,
    view: &ViewModel,
    container: Rect,
) {
    if !matches!(app.mode, InputMode::Normal) {
        return;
    }

    let pointer = (
        i32::from(mouse.column) - i32::from(container.x),
        i32::from(mouse.row) - i32::from(container.y),
    );
    let extent = (container.width, container.height);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            match registry.pointer_down(store, pointer, extent) {
                PointerOutcome::DragStarted { card_id } => {
                    app.status = format!("moving {}", card_title(&card_id));
                }
                PointerOutcome::CardClosed { card_id } => {
                    app.status = format!("{} hidden, press m to restore", card_title(&card_id));
                }
                PointerOutcome::Clicked {
                    card_id,
                    content: Some(content),
                } => route_card_click(app, &card_id, content, registry, events, calendar, memo, view, extent),
                PointerOutcome::Clicked { .. } | PointerOutcome::Miss => {}
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => registry.pointer_moved(pointer, extent),
        MouseEventKind::Up(MouseButton::Left) => {
            if let Some(card_id) = registry.pointer_up(store) {
                app.status = format!("{} placed", card_title(&card_id));
            }
        }
        _ => {}
    }
}

/// Body clicks route by card: day cells and upcoming rows open the event
/// prompt for their date, the memo body opens the memo prompt, and the
/// calendar nav arrows move the month cursor.
fn route_card_click(
    app: &mut App,
    card_id: &str,
    content: (u16, u16),
    registry: &CardRegistry,
    events: &EventStore,
    calendar: &mut CalendarModel,
    memo: &Memo,
    view: &ViewModel,
    extent: (u16, u16),
) {
    let (column, row) = content;
    match card_id {
        "card-calendar" => {
            let Some(card) = registry.layout().card(card_id) else {
                return;
            };
            let body_width = card_size(card, extent).0.saturating_sub(2);

            if row == 0 {
                if column == 0 {
                    calendar.previous();
                    app.status = calendar.title();
                } else if body_width > 0 && column == body_width - 1 {
                    calendar.next();
                    app.status = calendar.title();
                }
                return;
            }

            if row >= GRID_TOP_ROW && row < GRID_TOP_ROW + GRID_ROWS as u16 {
                let grid_row = (row - GRID_TOP_ROW) as usize;
                let grid_column = (column / DAY_CELL_WIDTH) as usize;
                if let Some(cell) = view.grid.cell(grid_row, grid_column) {
                    open_event_prompt(app, events, cell.date_key.clone());
                }
            }
        }
        "card-events" => {
            if let Some(entry) = view.upcoming.get(row as usize) {
                open_event_prompt(app, events, entry.date_key.clone());
            }
        }
        "card-memo" => {
            app.mode = InputMode::Prompt(PromptState {
                title: "Memo".to_string(),
                input: memo.text().to_string(),
                kind: PromptKind::EditMemo,
            });
        }
        _ => {}
    }
}

/// Pre-fills the prompt with the existing title so submitting unchanged is a
/// no-op and clearing the input removes the event.
fn open_event_prompt(app: &mut App, events: &EventStore, date_key: String) {
    let existing = events.first_title(&date_key).unwrap_or_default().to_string();
    let title = if existing.is_empty() {
        format!("Add event for {date_key}")
    } else {
        format!("Edit event for {date_key} (empty input removes it)")
    };
    app.mode = InputMode::Prompt(PromptState {
        title,
        input: existing,
        kind: PromptKind::EditEvent { date_key },
    });
}

fn build_view(
    calendar: &CalendarModel,
    events: &EventStore,
    memo: &Memo,
    today: NaiveDate,
    upcoming_limit: usize,
) -> ViewModel {
    ViewModel {
        month_title: calendar.title(),
        grid: calendar.build_grid(events, today),
        upcoming: upcoming(events, today, upcoming_limit),
        memo: memo.text().to_string(),
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(FOCUSED_PANEL_BORDER_COLOR)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
    }
}

#[derive(Debug, Clone)]
struct PromptState {
    title: String,
    input: String,
    kind: PromptKind,
}

#[derive(Debug, Clone)]
enum PromptKind {
    EditEvent { date_key: String },
    EditMemo,
}

#[derive(Debug, Clone, Copy)]
struct PanelState {
    selected: usize,
}

#[derive(Debug, Clone)]
enum InputMode {
    Normal,
    Prompt(PromptState),
    Panel(PanelState),
}

struct App {
    focus: usize,
    mode: InputMode,
    status: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            focus: 0,
            mode: InputMode::Normal,
            status: "Ready".to_string(),
        }
    }
}

impl App {
    fn cycle_focus(&mut self, registry: &CardRegistry, step: i32) {
        let count = CARDS.len() as i32;
        for offset in 1..=count {
            let index = (self.focus as i32 + step * offset).rem_euclid(count) as usize;
            let visible = registry
                .layout()
                .card(CARDS[index].id)
                .map(|card| card.visible())
                .unwrap_or(false);
            if visible {
                self.focus = index;
                return;
            }
        }
    }
}

struct ViewModel {
    month_title: String,
    grid: MonthGrid,
    upcoming: Vec<UpcomingEntry>,
    memo: String,
}
