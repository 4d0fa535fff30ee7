use crate::app::{command_key, App, Focus};
use crate::theme::{console_theme, ConsoleTheme};
use cold_core::{group_thousands, ClusterSnapshot, SolverSummary};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let theme = console_theme();
    frame.render_widget(Block::default().style(Style::new().bg(theme.bg)), size);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Length(14),
            Constraint::Length(1),
        ])
        .split(size);

    match app.state.snapshot() {
        Some(snapshot) => {
            frame.render_widget(render_header(app, snapshot, theme), layout[0]);
            frame.render_widget(render_workers(snapshot, theme), layout[1]);
        }
        None => {
            frame.render_widget(render_connecting(app, theme), layout[0]);
            frame.render_widget(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.border_style(false))
                    .title(Span::styled("Workers", theme.title_style())),
                layout[1],
            );
        }
    }

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(layout[2]);
    render_solver_pane(frame, app, theme, bottom[0]);
    frame.render_widget(render_solutions(app, theme), bottom[1]);
    frame.render_widget(render_notice(app, theme), layout[3]);

    if app.focus == Focus::Picker {
        render_picker(frame, app, theme);
    }
    if app.help_open {
        render_help_overlay(frame, theme);
    }
}

fn panel<'a>(title: impl Into<String>, theme: ConsoleTheme, focused: bool) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(focused))
        .style(Style::new().bg(theme.surface))
        .title(Span::styled(title.into(), theme.title_style()))
}

fn render_connecting(app: &App, theme: ConsoleTheme) -> Paragraph<'static> {
    let failures = app.state.consecutive_failures();
    let mut lines = vec![Line::from(Span::styled(
        "connecting..",
        Style::new().fg(theme.warn).add_modifier(Modifier::BOLD),
    ))];
    if failures > 0 {
        lines.push(Line::from(Span::styled(
            format!("{failures} attempt(s) failed; retrying every tick"),
            Style::new().fg(theme.muted),
        )));
    }
    Paragraph::new(Text::from(lines))
        .style(Style::new().fg(theme.text))
        .block(panel("Cluster", theme, false))
}

fn render_header(app: &App, snapshot: &ClusterSnapshot, theme: ConsoleTheme) -> Paragraph<'static> {
    let state = &app.state;
    let mut status_line = vec![
        Span::styled("Status: ", Style::new().fg(theme.muted)),
        Span::styled(
            snapshot.status.to_string(),
            Style::new()
                .fg(theme.status_color(&snapshot.status))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    for command in state.offered_commands() {
        status_line.push(Span::raw("  "));
        status_line.push(Span::styled(
            format!("[{}]", command_key(command)),
            theme.key_style(),
        ));
        status_line.push(Span::styled(
            format!(" {command}"),
            Style::new().fg(theme.text),
        ));
    }
    if state.is_stale() {
        status_line.push(Span::raw("  "));
        status_line.push(Span::styled(
            format!("STALE ({} failed)", state.consecutive_failures()),
            Style::new().fg(theme.critical).add_modifier(Modifier::BOLD),
        ));
    }

    let mut lines = vec![Line::from(status_line)];
    if let Some(progress) = state.progress() {
        let rate = progress.rate_label();
        let completion = progress
            .completion_percent()
            .map(|pct| format!(" ({pct:.1}%)"))
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!(
                "Rate: {}  Programs run: {}  Solved: {}  Unsolved: {}{}",
                if rate.is_empty() { "-" } else { rate.as_str() },
                progress.programs_run_label(),
                progress.solved,
                progress.unsolved,
                completion,
            ),
            Style::new().fg(theme.text),
        )));
        lines.push(Line::from(Span::styled(
            format!(
                "Workers: {}  Cores: {}  Solutions: {}  Vocabulary: {}",
                progress.workers,
                progress.cores,
                progress.solutions,
                state.vocabulary().as_str(),
            ),
            Style::new().fg(theme.muted),
        )));
    }
    let mut detail = Vec::new();
    if let Some(solver) = snapshot.solver.as_deref() {
        detail.push(format!("Controller solver: {}", first_line(solver)));
    }
    if let Some(at) = state.last_snapshot_at() {
        detail.push(format!("Updated {}", at.format("%H:%M:%S")));
    }
    if !detail.is_empty() {
        lines.push(Line::from(Span::styled(
            detail.join("  "),
            Style::new().fg(theme.muted),
        )));
    }

    Paragraph::new(Text::from(lines))
        .style(Style::new().fg(theme.text))
        .block(panel("Cluster", theme, false))
}

fn render_workers(snapshot: &ClusterSnapshot, theme: ConsoleTheme) -> Table<'static> {
    let header = Row::new(
        ["Worker", "Cores", "Rate", "Programs run", "Combinations", "Status"]
            .into_iter()
            .map(|label| Cell::from(label).style(theme.title_style())),
    );
    let rows = snapshot.workers.iter().map(|worker| {
        Row::new(vec![
            Cell::from(worker.worker_id.clone()),
            Cell::from(worker.cores.to_string()),
            Cell::from(worker.rate_label()),
            Cell::from(worker.programs_run_label()),
            Cell::from(group_thousands(worker.combinations_completed)),
            Cell::from(worker.status.clone()).style(Style::new().fg(theme.muted)),
        ])
        .style(Style::new().fg(theme.text))
    });
    Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(panel(
        format!("Workers ({})", snapshot.workers.len()),
        theme,
        false,
    ))
}

fn render_solver_pane(frame: &mut Frame, app: &App, theme: ConsoleTheme, area: Rect) {
    let selector = app.state.selector();
    let name = selector.selected().unwrap_or("untitled");
    let title = if selector.is_edited() {
        format!("Solver: {name} (edited)")
    } else {
        format!("Solver: {name}")
    };
    let focused = app.focus == Focus::Editor;
    let block = panel(title, theme, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);
    frame.render_widget(
        Paragraph::new(summary_lines(&SolverSummary::parse(selector.staged_text()), theme)),
        split[0],
    );

    let mut text = selector.staged_text().to_string();
    if focused {
        text.push('_');
    }
    let lines = text.lines().count() as u16;
    let overflow = lines.saturating_sub(split[1].height);
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::new().fg(theme.text))
            .scroll((if focused { overflow } else { 0 }, 0)),
        split[1],
    );
}

fn summary_lines(summary: &SolverSummary, theme: ConsoleTheme) -> Vec<Line<'static>> {
    let units = match summary.unit_count() {
        Some(count) => group_thousands(count),
        None => "?".to_string(),
    };
    let mut first = format!(
        "depth {}  {} pattern(s)  {} units",
        summary
            .depth
            .map(|depth| depth.to_string())
            .unwrap_or_else(|| "?".to_string()),
        summary.patterns.len(),
        units,
    );
    if let Some(precision) = &summary.precision {
        first.push_str(&format!("  precision {precision}"));
    }
    let second = format!(
        "{} input(s)  {} constant(s)  {} case(s)",
        summary.inputs.len(),
        summary.constants,
        summary.cases,
    );
    let mut lines = vec![Line::from(Span::styled(first, Style::new().fg(theme.accent)))];
    let mut tail = vec![Span::styled(second, Style::new().fg(theme.muted))];
    if summary.unrecognized > 0 {
        tail.push(Span::styled(
            format!("  {} unrecognized line(s)", summary.unrecognized),
            Style::new().fg(theme.warn),
        ));
    }
    lines.push(Line::from(tail));
    lines
}

fn render_solutions(app: &App, theme: ConsoleTheme) -> Paragraph<'static> {
    let solutions = app
        .state
        .snapshot()
        .map(|snapshot| snapshot.solutions.as_slice())
        .unwrap_or_default();
    let lines: Vec<Line<'static>> = if solutions.is_empty() {
        vec![Line::from(Span::styled(
            "no solutions yet",
            Style::new().fg(theme.muted),
        ))]
    } else {
        solutions
            .iter()
            .enumerate()
            .map(|(idx, solution)| {
                Line::from(vec![
                    Span::styled(format!("{:>3} ", idx + 1), Style::new().fg(theme.muted)),
                    Span::styled(solution.clone(), Style::new().fg(theme.ok)),
                ])
            })
            .collect()
    };
    Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0))
        .block(panel(format!("Solutions ({})", solutions.len()), theme, false))
}

fn render_notice(app: &App, theme: ConsoleTheme) -> Paragraph<'static> {
    let line = match app.state.notice() {
        Some(notice) => Line::from(vec![
            Span::styled(
                format!("{} ", notice.at.format("%H:%M:%S")),
                Style::new().fg(theme.muted),
            ),
            Span::styled(
                notice.message.clone(),
                Style::new().fg(theme.notice_color(notice.level)),
            ),
        ]),
        None => Line::from(Span::styled(
            "? help  q quit",
            Style::new().fg(theme.muted),
        )),
    };
    Paragraph::new(line).style(Style::new().bg(theme.bg))
}

fn render_picker(frame: &mut Frame, app: &App, theme: ConsoleTheme) {
    let area = centered_rect(50, 50, frame.size());
    let selector = app.state.selector();
    let items: Vec<ListItem> = selector
        .catalog()
        .specs()
        .iter()
        .map(|spec| {
            let marker = if selector.selected() == Some(spec.name.as_str()) {
                "* "
            } else {
                "  "
            };
            ListItem::new(format!("{marker}{}", spec.name))
        })
        .collect();
    let list = List::new(items)
        .style(Style::new().fg(theme.text))
        .highlight_style(
            Style::new()
                .fg(theme.bg)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .block(panel("Load solver (Enter pick, Esc cancel)", theme, true));
    let mut state = app.picker.clone();
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_help_overlay(frame: &mut Frame, theme: ConsoleTheme) {
    let area = centered_rect(70, 70, frame.size());
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::new().fg(theme.accent).add_modifier(Modifier::BOLD),
        ))
    };
    let lines = vec![
        heading("Cluster"),
        Line::from("  g run   s stop   p pause   u unpause"),
        Line::from("  a arm   d disarm   R reset with staged solver"),
        Line::from("  .       refresh now"),
        Line::from("  only commands shown in the status line are sent"),
        Line::from(""),
        heading("Solver"),
        Line::from("  e       edit staged solver (Esc to leave)"),
        Line::from("  Ctrl-U  clear staged solver while editing"),
        Line::from("  l       load a solver from the catalog"),
        Line::from(""),
        heading("View"),
        Line::from("  j/k     scroll solutions"),
        Line::from("  ? or F1 toggle this help"),
        Line::from("  q       quit"),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::new().fg(theme.text).bg(theme.surface))
            .block(panel("Help", theme, false))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}
