use crate::config::{MAX_LIMIT_GB, MIN_LIMIT_GB};
use crate::context::AppContext;
use crate::error::StartError;
use crate::monitor::{MonitorEvent, MonitoringController, MonitoringState};
use crate::presence::{MenuEvent, PresenceState, TrayMenu, TOOLTIP};
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear as ClearTerminal, ClearType,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{io, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Longest text the size field accepts
const MAX_INPUT_LEN: usize = 8;

/// A modal message over the panel, dismissed with Enter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// What the UI loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Start,
    /// The native close affordance: hide the window
    Close,
    Menu(MenuEvent),
}

/// State of the control panel: one input field and one start button
pub struct ControlPanel {
    pub input: String,
    pub button_enabled: bool,
    pub notice: Option<Notice>,
    pub status_message: String,
    pub last_size_gb: Option<u64>,
    pub purges: u64,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            button_enabled: true,
            notice: None,
            status_message: "ENTER Start | ESC Hide | CTRL+C Exit".to_string(),
            last_size_gb: None,
            purges: 0,
        }
    }

    /// Map a key press in the visible window to an action
    pub fn handle_key(&mut self, key: KeyEvent) -> PanelAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return PanelAction::Menu(MenuEvent::Exit);
        }

        match key.code {
            KeyCode::Esc => PanelAction::Close,
            KeyCode::Enter => {
                if self.notice.take().is_some() {
                    PanelAction::None
                } else if self.button_enabled {
                    PanelAction::Start
                } else {
                    PanelAction::None
                }
            }
            _ if self.notice.is_some() => PanelAction::None,
            KeyCode::Backspace => {
                if self.button_enabled {
                    self.input.pop();
                }
                PanelAction::None
            }
            KeyCode::Char(c) => {
                if self.button_enabled && self.input.len() < MAX_INPUT_LEN && !c.is_control() {
                    self.input.push(c);
                }
                PanelAction::None
            }
            _ => PanelAction::None,
        }
    }

    /// Press the start button.
    ///
    /// The button is disabled before the controller sees the input and is
    /// re-enabled only when the input is rejected.
    pub fn submit(&mut self, controller: &mut MonitoringController) {
        if !self.button_enabled {
            return;
        }
        self.button_enabled = false;

        match controller.start(&self.input) {
            Ok(config) => {
                self.status_message =
                    format!("Monitoring: the bin is emptied at {} GB", config.size_limit_gb);
            }
            Err(StartError::Invalid(e)) => {
                self.button_enabled = true;
                self.notice = Some(Notice {
                    title: "Invalid input".to_string(),
                    message: e.to_string(),
                });
            }
            Err(StartError::AlreadyRunning) => {
                self.status_message = "Monitoring is already running".to_string();
            }
        }
    }

    pub fn apply_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::CycleCompleted { size_gb, purged } => {
                self.last_size_gb = Some(size_gb);
                if purged {
                    self.purges += 1;
                    self.status_message = format!("Emptied the bin at {} GB", size_gb);
                }
            }
            MonitorEvent::QueryFailed { message } => {
                self.notice = Some(Notice {
                    title: "Error".to_string(),
                    message,
                });
            }
            MonitorEvent::PurgeFailed { message } => {
                self.status_message = format!("Could not empty the bin: {}", message);
            }
            MonitorEvent::Stopped => {
                self.status_message = "Monitoring stopped".to_string();
            }
        }
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the control panel until the status presence asks to exit
pub fn run_tui(ctx: &mut AppContext, tray: TrayMenu, initial_limit: Option<&str>) -> io::Result<()> {
    let events = ctx
        .take_events()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "monitor events already taken"))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut panel = ControlPanel::new();
    if let Some(raw) = initial_limit {
        panel.input = raw.to_string();
        panel.submit(&mut ctx.controller);
    }

    let res = run_app(&mut terminal, ctx, &mut panel, &tray, events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend + io::Write>(
    terminal: &mut Terminal<B>,
    ctx: &mut AppContext,
    panel: &mut ControlPanel,
    tray: &TrayMenu,
    mut events: mpsc::UnboundedReceiver<MonitorEvent>,
) -> io::Result<()> {
    let mut shown = PresenceState::Visible;

    loop {
        if ctx.shutdown.is_requested() {
            info!("Control panel closing");
            return Ok(());
        }

        while let Ok(event) = events.try_recv() {
            debug!("Monitor event: {:?}", event);
            panel.apply_event(event);
        }

        let wanted = ctx.window.state();
        if wanted != shown {
            switch_presence(terminal, wanted)?;
            shown = wanted;
        }

        if shown == PresenceState::Visible {
            let state = ctx.controller.state();
            terminal.draw(|f| ui(f, panel, state))?;
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let action = match shown {
            PresenceState::Visible => panel.handle_key(key),
            PresenceState::Hidden => hidden_key(key),
        };

        match action {
            PanelAction::None => {}
            PanelAction::Start => panel.submit(&mut ctx.controller),
            PanelAction::Close => ctx.window.hide(),
            PanelAction::Menu(item) => tray.dispatch(item),
        }
    }
}

/// While hidden, the terminal line stands in for the status-area menu
fn hidden_key(key: KeyEvent) -> PanelAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return PanelAction::Menu(MenuEvent::Exit);
    }
    match key.code {
        KeyCode::Char('s') | KeyCode::Char('S') => PanelAction::Menu(MenuEvent::Show),
        KeyCode::Char('e') | KeyCode::Char('E') => PanelAction::Menu(MenuEvent::Exit),
        _ => PanelAction::None,
    }
}

fn tray_line() -> String {
    let items: Vec<String> = MenuEvent::ALL
        .iter()
        .map(|item| {
            let (key, rest) = item.label().split_at(1);
            format!("[{}]{}", key, rest)
        })
        .collect();
    format!("♻ {} is running  {}", TOOLTIP, items.join("  "))
}

fn switch_presence<B: Backend + io::Write>(
    terminal: &mut Terminal<B>,
    state: PresenceState,
) -> io::Result<()> {
    match state {
        PresenceState::Hidden => {
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                MoveToColumn(0),
                ClearTerminal(ClearType::CurrentLine),
                Print(tray_line())
            )?;
        }
        PresenceState::Visible => {
            execute!(
                terminal.backend_mut(),
                MoveToColumn(0),
                ClearTerminal(ClearType::CurrentLine),
                EnterAlternateScreen
            )?;
            terminal.clear()?;
        }
    }
    Ok(())
}

fn ui(f: &mut Frame<'_>, panel: &ControlPanel, state: MonitoringState) {
    let header_color = Color::Rgb(0, 120, 215);
    let success_color = Color::Rgb(76, 175, 80);
    let muted_color = Color::Rgb(148, 163, 184);
    let bg_color = Color::Rgb(46, 46, 46);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4), // Title
            Constraint::Length(3), // Size field
            Constraint::Length(3), // Start button
            Constraint::Min(3),    // Session info
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    f.render_widget(Block::default().style(Style::default().bg(bg_color)), f.size());

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "Set Recycle Bin Size Limit",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("({}-{} GB)", MIN_LIMIT_GB, MAX_LIMIT_GB),
            Style::default().fg(muted_color),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(header_color))
            .title(format!(" ♻ {} ", TOOLTIP))
            .title_style(Style::default().fg(header_color).add_modifier(Modifier::BOLD)),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let field_style = if panel.button_enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(muted_color)
    };
    let field = Paragraph::new(panel.input.as_str())
        .style(field_style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" GB "));
    f.render_widget(field, centered(chunks[1], 20));

    let button_style = if panel.button_enabled {
        Style::default()
            .fg(Color::White)
            .bg(success_color)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(muted_color)
    };
    let button = Paragraph::new("Start Monitoring")
        .style(button_style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, centered(chunks[2], 24));

    let session = match state {
        MonitoringState::Idle => vec![Line::from(Span::styled(
            "Not monitoring",
            Style::default().fg(muted_color),
        ))],
        MonitoringState::Running(config) => {
            let size = panel
                .last_size_gb
                .map_or_else(|| "-".to_string(), |gb| format!("{} GB", gb));
            vec![
                Line::from(vec![
                    Span::styled("✓ Monitoring ", Style::default().fg(success_color)),
                    Span::styled(
                        format!("limit {} GB", config.size_limit_gb),
                        Style::default().fg(Color::White),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("Current size: {}  |  Emptied: {} times", size, panel.purges),
                    Style::default().fg(muted_color),
                )),
            ]
        }
    };
    f.render_widget(
        Paragraph::new(session)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        chunks[3],
    );

    let status = Paragraph::new(Line::from(Span::styled(
        panel.status_message.as_str(),
        Style::default().fg(Color::White),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(header_color)),
    )
    .alignment(Alignment::Center);
    f.render_widget(status, chunks[4]);

    if let Some(notice) = &panel.notice {
        let area = f.size();
        let popup_area = Rect {
            x: area.width / 6,
            y: area.height.saturating_sub(7) / 2,
            width: area.width - area.width / 3,
            height: 7.min(area.height),
        };
        let popup = Paragraph::new(vec![
            Line::from(notice.message.as_str()),
            Line::from(""),
            Line::from(Span::styled("[ OK ]", Style::default().add_modifier(Modifier::BOLD))),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", notice.title))
                .border_style(Style::default().fg(Color::Rgb(245, 158, 11))),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(Clear, popup_area);
        f.render_widget(popup, popup_area);
    }
}

fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}
