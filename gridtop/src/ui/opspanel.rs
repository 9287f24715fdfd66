//! Maintenance panel: per-operation status lines, the update progress
//! gauge, and the pending-reconnect countdown.

use std::time::Instant;

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::ops::{MaintenanceController, OpState, RebootState, RunPhase};

fn op_line<'a>(label: &'a str, key: &'a str, state: &OpState) -> Line<'a> {
    let (text, color) = match state {
        OpState::Idle => ("ready".to_string(), Color::Gray),
        OpState::InProgress => ("in progress...".to_string(), Color::Yellow),
        OpState::Completed(msg) => (format!("done - {msg}"), Color::Green),
        OpState::Failed(msg) => (format!("FAILED - {msg}"), Color::Red),
    };
    Line::from(vec![
        Span::styled(format!("[{key}] "), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{label:<14}")),
        Span::styled(text, Style::default().fg(color)),
    ])
}

pub fn draw_ops(f: &mut ratatui::Frame<'_>, area: Rect, ops: &MaintenanceController, now: Instant) {
    let block = Block::default().borders(Borders::ALL).title("Maintenance");
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 4 {
        return;
    }

    let mut lines = vec![
        op_line("backup", "b", &ops.backup),
        op_line("restore", "r", &ops.restore),
        op_line("factory reset", "F", &ops.factory),
    ];

    let reboot = match ops.reboot {
        RebootState::Idle => Span::styled("ready", Style::default().fg(Color::Gray)),
        RebootState::ConfirmPending => {
            Span::styled("confirm? (y/n)", Style::default().fg(Color::Yellow))
        }
        RebootState::Requested => {
            Span::styled("requested...", Style::default().fg(Color::Yellow))
        }
    };
    lines.push(Line::from(vec![
        Span::styled("[R] ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{:<14}", "reboot")),
        reboot,
    ]));

    let avail = match &ops.availability {
        _ if ops.checking_updates => Span::styled("checking...", Style::default().fg(Color::Yellow)),
        Some(a) if a.updates_available => Span::styled(
            format!("{} -> {} available ('U' to apply)", a.current_version_id, a.remote_version_id),
            Style::default().fg(Color::Green),
        ),
        Some(a) => Span::styled(
            format!("up to date ({})", a.current_version_id),
            Style::default().fg(Color::Gray),
        ),
        None => Span::styled("'u' to check", Style::default().fg(Color::Gray)),
    };
    lines.push(Line::from(vec![
        Span::styled("[u] ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{:<14}", "updates")),
        avail,
    ]));

    if let Some(p) = ops.pending_reload() {
        let left = p.at.saturating_duration_since(now).as_secs();
        lines.push(Line::from(Span::styled(
            format!("reconnecting in {left}s..."),
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(n) = &ops.notice {
        lines.push(Line::from(Span::styled(
            n.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }

    // Update gauge occupies the last rows while a run is visible
    let gauge_h = if ops.update.phase != RunPhase::Idle { 3 } else { 0 };
    let text_area = Rect {
        height: inner.height.saturating_sub(gauge_h),
        ..inner
    };
    f.render_widget(Paragraph::new(lines), text_area);

    if gauge_h > 0 && inner.height > gauge_h {
        let gauge_area = Rect {
            y: inner.y + inner.height - gauge_h,
            height: gauge_h,
            ..inner
        };
        let (label, color) = match ops.update.phase {
            RunPhase::Error => (
                ops.update
                    .error
                    .clone()
                    .unwrap_or_else(|| "update failed".into()),
                Color::Red,
            ),
            RunPhase::Done => ("update complete".into(), Color::Green),
            RunPhase::DeviceLost => (ops.update.message.clone(), Color::Yellow),
            _ => (
                format!("{} ({}%)", ops.update.message, ops.update.percent),
                Color::Cyan,
            ),
        };
        let g = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Update"))
            .gauge_style(Style::default().fg(color))
            .percent(ops.update.percent.min(100) as u16)
            .label(label);
        f.render_widget(g, gauge_area);
    }
}
