//! Aggregate statistics card: meters, chargers, collection schedule.

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::types::DeviceStatus;
use crate::ui::util::ago;

pub fn draw_stats(f: &mut ratatui::Frame<'_>, area: Rect, status: Option<&DeviceStatus>) {
    let block = Block::default().borders(Borders::ALL).title("Collection");
    let Some(s) = status else {
        f.render_widget(block, area);
        return;
    };

    let err_style = if s.recent_error_count > 0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };
    let last = s
        .last_collection
        .map(|t| ago(t, Utc::now()))
        .unwrap_or_else(|| "never".into());
    let ports = s
        .udp_listener_ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let lines = vec![
        Line::from(format!("meters    {} / {} active", s.active_meters, s.total_meters)),
        Line::from(format!("chargers  {} / {} active", s.active_chargers, s.total_chargers)),
        Line::from(format!("last collection  {last}")),
        Line::from(format!("next collection  in {}m", s.next_collection_minutes)),
        Line::from(format!("udp listeners    {ports}")),
        Line::from(vec![
            Span::raw("recent errors    "),
            Span::styled(s.recent_error_count.to_string(), err_style),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}
