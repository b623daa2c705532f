use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use aiterm_types::{ConnectionStatus, Executor, HistoryEntry};

use crate::app::App;

pub mod components;
pub mod spinner;

const PLACEHOLDER: &str = "Type a command in natural language... (e.g., 'show all python files')";

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_status_bar(f, app, chunks[1]);
    draw_transcript(f, app, chunks[2]);
    draw_input(f, app, chunks[3]);
    draw_hints(f, chunks[4]);

    if let Some(alert) = &app.alert {
        draw_alert(f, alert);
    }
}

fn badge(label: &str, on: bool, on_color: Color) -> Span<'static> {
    let (marker, color) = if on {
        ("●", on_color)
    } else {
        ("○", Color::DarkGray)
    };
    Span::styled(
        format!(" {marker} {label} "),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let status = app.store.system_status();
    let (conn_color, conn_label) = match app.store.connection_status() {
        ConnectionStatus::Connected => (Color::Green, "Connected".to_string()),
        ConnectionStatus::Connecting => (Color::Yellow, "Connecting".to_string()),
        ConnectionStatus::Reconnecting { attempt } => {
            (Color::Yellow, format!("Reconnecting ({attempt})"))
        }
        ConnectionStatus::Disconnected | ConnectionStatus::GaveUp => {
            (Color::Red, "Disconnected".to_string())
        }
    };

    let badges = Line::from(vec![
        badge("Gemini AI", status.gemini_available, Color::Magenta),
        badge("Mini Bash", status.mini_bash_available, Color::Cyan),
        Span::styled(
            format!(" ● {conn_label} "),
            Style::default().fg(conn_color).add_modifier(Modifier::BOLD),
        ),
    ])
    .alignment(Alignment::Right);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " AI Terminal ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
    f.render_widget(Paragraph::new(badges).block(block), area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let home = dirs::home_dir().map(|h| h.display().to_string());
    let dir = display_directory(app.store.current_directory(), home.as_deref());

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(18)])
        .split(area);

    let left = Paragraph::new(Line::from(vec![
        Span::raw(" 📁 "),
        Span::styled(dir, Style::default().fg(Color::Cyan)),
    ]));
    f.render_widget(left, halves[0]);

    if app.store.is_processing() {
        let right = Paragraph::new(format!(
            "{} Processing... ",
            spinner::frame_for_tick(app.tick_count)
        ))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Right);
        f.render_widget(right, halves[1]);
    }
}

fn draw_transcript(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let lines = if app.store.history().is_empty() {
        welcome_lines(app.example_prompts())
    } else {
        let mut lines: Vec<Line<'static>> =
            app.store.history().iter().flat_map(entry_lines).collect();
        if app.store.is_processing() {
            lines.push(Line::from(Span::styled(
                format!(
                    "{} Processing your request...",
                    spinner::frame_for_tick(app.tick_count)
                ),
                Style::default().fg(Color::Yellow),
            )));
        }
        lines
    };

    // Row count comes from the same word wrapper the widget renders with.
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let total = paragraph.line_count(inner.width);
    let max_scroll = total.saturating_sub(inner.height as usize);
    let from_top = max_scroll.saturating_sub(app.scroll_from_bottom.min(max_scroll));

    f.render_widget(block, area);
    f.render_widget(
        paragraph.scroll((from_top.min(u16::MAX as usize) as u16, 0)),
        inner,
    );
}

fn welcome_lines(examples: &[&str]) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Welcome to AI-Powered Terminal!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        Line::from("Start by typing a command in natural language or use your voice.")
            .alignment(Alignment::Center),
        Line::from(""),
        Line::from(Span::styled(
            "Try these examples:",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
    ];
    for (i, example) in examples.iter().enumerate() {
        lines.push(
            Line::from(vec![
                Span::styled(format!("[{}] ", i + 1), Style::default().fg(Color::Yellow)),
                Span::raw(format!("\"{example}\"")),
            ])
            .alignment(Alignment::Center),
        );
    }
    lines
}

fn entry_lines(entry: &HistoryEntry) -> Vec<Line<'static>> {
    let time = entry
        .timestamp()
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();

    match entry {
        HistoryEntry::Input {
            content,
            is_voice,
            directory,
            ..
        } => {
            let mut spans = vec![
                Span::styled("➜ ", Style::default().fg(Color::Green)),
                Span::styled(
                    prompt_dir(directory).to_string(),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(" $ ", Style::default().fg(Color::DarkGray)),
            ];
            if *is_voice {
                spans.push(Span::raw("🎤 "));
            }
            spans.push(Span::styled(
                content.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!("  {time}"),
                Style::default().fg(Color::DarkGray),
            ));
            vec![Line::from(spans)]
        }
        HistoryEntry::Output {
            content,
            success,
            command,
            ai_interpretation,
            executor,
            ..
        } => {
            let mut lines = Vec::new();
            if let Some(ai) = ai_interpretation {
                lines.push(Line::from(vec![
                    Span::styled("🤖 AI: ", Style::default().fg(Color::Magenta)),
                    Span::raw(command.clone().unwrap_or_default()),
                    Span::styled(
                        format!(" ({}% confident)", ai.confidence_percent()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]));
            }
            let color = if *success { Color::Gray } else { Color::Red };
            lines.extend(
                content
                    .lines()
                    .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(color)))),
            );
            if let Some(executor) = executor {
                let name = executor
                    .parse::<Executor>()
                    .map(|e| e.label().to_string())
                    .unwrap_or_else(|_| executor.clone());
                lines.push(Line::from(vec![
                    Span::styled("Executed by: ", Style::default().fg(Color::DarkGray)),
                    Span::styled(name, Style::default().fg(Color::Cyan)),
                ]));
            }
            lines.push(Line::from(""));
            lines
        }
        HistoryEntry::Error { content, .. } => vec![
            Line::from(vec![
                Span::styled("✖ ", Style::default().fg(Color::Red)),
                Span::styled(content.clone(), Style::default().fg(Color::Red)),
            ]),
            Line::from(""),
        ],
    }
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let executor_title = Line::from(Span::styled(
        format!(" [Tab] {} ", app.executor.label()),
        Style::default().fg(Color::Cyan),
    ))
    .alignment(Alignment::Right);

    let recording = app.voice.is_recording();
    let border = if recording {
        Color::Red
    } else if app.store.is_processing() {
        Color::DarkGray
    } else {
        Color::Green
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" $ {} ", prompt_dir(app.store.current_directory())))
        .title_top(executor_title);
    let inner = block.inner(area);

    let (text, cursor_col) = app.composer.visible(inner.width as usize);
    let body = if recording {
        Line::from(Span::styled(
            "🎤 Listening... (F2 to stop)",
            Style::default().fg(Color::Red),
        ))
    } else if text.is_empty() {
        Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(text)
    };
    f.render_widget(Paragraph::new(body).block(block), area);

    if !app.input_locked() && app.alert.is_none() {
        f.set_cursor_position((inner.x.saturating_add(cursor_col), inner.y));
    }
}

fn draw_hints(f: &mut Frame, area: Rect) {
    let hints = Paragraph::new(
        " Enter run · Tab executor · F2/Ctrl+R voice · 1-5 examples · PgUp/PgDn scroll · Ctrl+C quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, area);
}

fn draw_alert(f: &mut Frame, message: &str) {
    let popup = centered_fixed_rect(64, 7, f.area());
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Notice ");
    let body = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter or Esc to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(body, popup);
}

/// Replace a leading home directory with `~`.
pub fn display_directory(dir: &str, home: Option<&str>) -> String {
    match home.filter(|h| !h.is_empty()) {
        Some(home) if dir == home => "~".to_string(),
        Some(home) => match dir.strip_prefix(home) {
            Some(rest) if rest.starts_with('/') => format!("~{rest}"),
            _ => dir.to_string(),
        },
        None => dir.to_string(),
    }
}

/// Last path component, or `~` for an empty or root-less path.
pub fn prompt_dir(dir: &str) -> &str {
    dir.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("~")
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width.max(1));
    let h = height.min(area.height.max(1));
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
