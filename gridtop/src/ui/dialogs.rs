//! Modal dialogs rendered over the main layout: reboot/apply confirms,
//! restore path entry, factory-reset captcha.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ops::{MaintenanceController, OpState};
use crate::ui::util::truncate_middle;

// Centered popup of fixed size, clamped to the frame
fn popup(area: Rect, w: u16, h: u16) -> Rect {
    let w = w.min(area.width);
    let h = h.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn render_box(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, lines: Vec<Line>) {
    let rect = popup(area, 56, lines.len() as u16 + 2);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(Style::default().fg(Color::Yellow)),
        ),
        rect,
    );
}

pub fn draw_confirm_reboot(f: &mut ratatui::Frame<'_>, area: Rect) {
    render_box(
        f,
        area,
        "Reboot appliance",
        vec![
            Line::from("The appliance will be unreachable for a short while."),
            Line::from(""),
            Line::from("Press 'y' to reboot, 'n' to cancel."),
        ],
    );
}

pub fn draw_confirm_apply(f: &mut ratatui::Frame<'_>, area: Rect, ops: &MaintenanceController) {
    let mut lines = vec![Line::from(
        "Install the available software update? The appliance restarts afterwards.",
    )];
    if let Some(log) = ops
        .availability
        .as_ref()
        .and_then(|a| a.change_log.as_deref())
    {
        lines.push(Line::from(""));
        for l in log.lines().take(6) {
            lines.push(Line::from(l.to_string()));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Press 'y' to start, 'n' to cancel."));
    render_box(f, area, "Apply update", lines);
}

pub fn draw_restore_dialog(f: &mut ratatui::Frame<'_>, area: Rect, ops: &MaintenanceController) {
    let mut lines = vec![
        Line::from("Path to a .db backup file to upload:"),
        Line::from(vec![
            Span::raw("> "),
            Span::styled(
                format!("{}_", truncate_middle(&ops.restore_path, 50)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from("Enter to upload, Esc to cancel."),
    ];
    if let OpState::Failed(msg) = &ops.restore {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    render_box(f, area, "Restore backup", lines);
}

pub fn draw_factory_dialog(f: &mut ratatui::Frame<'_>, area: Rect, ops: &MaintenanceController) {
    let Some(captcha) = &ops.captcha else { return };
    let gate = if captcha.is_valid() {
        Span::styled("Enter to confirm", Style::default().fg(Color::Green))
    } else {
        Span::styled("answer to unlock confirm", Style::default().fg(Color::Gray))
    };
    let mut lines = vec![
        Line::from(Span::styled(
            "This wipes all data on the appliance. A final backup is taken first.",
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(format!(
            "To confirm, solve: {} + {} = ?",
            captcha.operand_a, captcha.operand_b
        )),
        Line::from(vec![
            Span::raw("> "),
            Span::styled(
                format!("{}_", captcha.answer),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![gate, Span::raw(", Esc to cancel.")]),
    ];
    match &ops.factory {
        OpState::Failed(msg) => lines.push(Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(Color::Red),
        ))),
        OpState::InProgress => lines.push(Line::from(Span::styled(
            "resetting...",
            Style::default().fg(Color::Yellow),
        ))),
        _ => {}
    }
    render_box(f, area, "Factory reset", lines);
}
