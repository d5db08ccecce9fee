//! UI rendering for the looper remote

use crate::tui::app::{LogEntry, TuiApp};
use crate::tui::layout::create_layout;
use log::Level;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use retroctl_core::{LoopInfo, LoopState, MetronomeState};

/// Render the entire UI
pub fn render_ui(frame: &mut Frame, app: &mut TuiApp) {
    let area = frame.area();
    let layout = create_layout(area);

    if app.show_help_modal {
        render_help_modal(frame, area);
        return;
    }

    render_header(frame, layout.header, app);
    render_loops(frame, layout.main, app);
    render_log(frame, layout.log, app);
    render_footer(frame, layout.footer);
}

fn on_off(v: bool) -> &'static str {
    if v {
        "ON"
    } else {
        "OFF"
    }
}

/// Transport status, tempo and settings, plus the beat cells
fn render_header(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let met = &app.state.metronome;
    let settings = &app.state.settings;

    let status_color = if met.running {
        Color::Green
    } else {
        Color::Yellow
    };
    let status_icon = if met.running { "▶" } else { "⏸" };

    let midi = if settings.midi_sync_enabled {
        if settings.midi_sync_output {
            "OUT"
        } else {
            "ON"
        }
    } else {
        "OFF"
    };

    let header_lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", status_icon),
                Style::default()
                    .fg(status_color)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "RETROSPECT",
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  │  "),
            Span::styled(
                format!("{:.1} BPM", met.bpm),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!("  {}/4", met.beats_per_bar),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  │  Bar "),
            Span::styled(
                format!("{}", met.bar + 1),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  Beat "),
            Span::styled(
                format!("{}/{}", met.beat + 1, met.beats_per_bar),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  │  "),
            Span::raw(format!(
                "Q={}  Lookback={}  Click={}  MIDI={}",
                settings.default_quantize.name(),
                settings.lookback_bars,
                on_off(settings.click_enabled),
                midi
            )),
        ]),
        Line::from(beat_cells(met)),
    ];

    let header = Paragraph::new(header_lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

/// One cell per beat, the current one filled
fn beat_cells(met: &MetronomeState) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw(" ")];
    for b in 0..met.beats_per_bar.max(1) {
        if b == met.beat {
            spans.push(Span::styled(
                "[X] ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled("[ ] ", Style::default().fg(Color::DarkGray)));
        }
    }
    spans
}

fn state_badge(lp: &LoopInfo) -> Span<'static> {
    match lp.state {
        LoopState::Empty => Span::styled("---   ", Style::default().fg(Color::DarkGray)),
        LoopState::Playing => Span::styled("PLY   ", Style::default().fg(Color::Green)),
        LoopState::Muted => Span::styled("MUT   ", Style::default().fg(Color::Yellow)),
        LoopState::Recording => Span::styled(
            "REC   ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    }
}

/// Loop table, queued operations and the recording banner
fn render_loops(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled(
        format!(
            "  {:>2}  {:<6} {:>5} {:>7} {:>7} {:>3} {:>6}",
            "#", "State", "Bars", "Layers", "Speed", "Rev", "Pos"
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    for (i, lp) in app.state.loops.iter().enumerate() {
        let marker = if i == app.selected_loop {
            Span::styled(">", Style::default().fg(Color::Cyan))
        } else {
            Span::raw(" ")
        };

        if lp.is_empty() {
            lines.push(Line::from(vec![
                Span::raw(" "),
                marker,
                Span::raw(format!("{:>2}  ", i + 1)),
                Span::styled("---", Style::default().fg(Color::DarkGray)),
            ]));
        } else {
            let rev = if lp.reversed { "R" } else { " " };
            lines.push(Line::from(vec![
                Span::raw(" "),
                marker,
                Span::raw(format!("{:>2}  ", i + 1)),
                state_badge(lp),
                Span::raw(format!(
                    "{:>5.1} {:>7} {:>6.2}x {:>3} {:>5.1}%",
                    lp.length_in_bars,
                    format!("{}/{}", lp.active_layers, lp.layers),
                    lp.speed,
                    rev,
                    lp.play_position_pct * 100.0
                )),
            ]));
        }
    }

    if !app.state.pending_ops.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "  Pending:",
            Style::default().fg(Color::Magenta),
        )));
        for op in &app.state.pending_ops {
            lines.push(Line::from(Span::styled(
                format!(
                    "    loop {} - {} ({})",
                    op.loop_index + 1,
                    op.description,
                    op.quantize.name()
                ),
                Style::default().fg(Color::Magenta),
            )));
        }
    }

    if app.state.recording.active {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("  ● RECORDING loop {}", app.state.recording.loop_index + 1),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Loops ({} active) ", app.state.active_loop_count()));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::White,
        Level::Debug | Level::Trace => Color::DarkGray,
    }
}

/// Tail of the log buffer, newest at the bottom
fn render_log(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let visible = area.height.saturating_sub(2) as usize;
    let entries: Vec<&LogEntry> = app
        .log_buffer
        .iter()
        .rev()
        .take(visible)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let lines: Vec<Line> = entries
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    entry.message.clone(),
                    Style::default().fg(level_color(entry.level)),
                ),
            ])
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title(" Log ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Key help
fn render_footer(frame: &mut Frame, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let lines = vec![
        Line::from(Span::styled(
            " 1-8:select  space:capture  r:record  m:mute  v:reverse  o/O:overdub  u/U:undo/redo",
            dim,
        )),
        Line::from(Span::styled(
            " c:clear  [/]:speed  +/-:bpm  tab:quantize  B/b:lookback  M:click  S:midi  esc:cancel  ?:help  q:quit",
            dim,
        )),
    ];
    let footer = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// Centered rect helper for modals
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let lines = vec![
        ("1-8 / Up / Down", "select loop"),
        ("space", "capture from lookback buffer"),
        ("r", "start/stop recording"),
        ("m", "toggle mute"),
        ("v", "toggle reverse"),
        ("o / O", "start / stop overdub"),
        ("u / U", "undo / redo layer"),
        ("c", "clear loop"),
        ("[ / ]", "halve / double speed"),
        ("+ / -", "BPM up / down"),
        ("tab", "cycle quantize mode"),
        ("B / b", "lookback bars up / down"),
        ("M", "toggle metronome click"),
        ("S", "toggle MIDI sync"),
        ("esc", "cancel pending operations"),
        ("q", "quit"),
    ];

    let height = lines.len() as u16 + 2;
    let modal_area = centered_rect(46, height, area);
    frame.render_widget(Clear, modal_area);

    let text: Vec<Line> = lines
        .into_iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(
                    format!(" {:<16}", key),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(desc),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Keys (esc to close) ")
        .title_alignment(Alignment::Center);
    frame.render_widget(Paragraph::new(text).block(block), modal_area);
}
