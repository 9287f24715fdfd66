//! Health chart column: cpu/memory/disk sparklines fed by the merged
//! 24h history.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

use crate::history::HealthHistory;
use crate::types::DeviceStatus;
use crate::ui::util::human;

fn spark(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: String,
    data: &[u64],
    color: Color,
) {
    let max_points = area.width.saturating_sub(2) as usize;
    let start = data.len().saturating_sub(max_points);
    let s = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data[start..])
        .max(100)
        .style(Style::default().fg(color));
    f.render_widget(s, area);
}

pub fn draw_health(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    history: &HealthHistory,
    status: Option<&DeviceStatus>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let cpu: Vec<u64> = history.points().iter().map(|p| p.cpu_percent.round() as u64).collect();
    let mem: Vec<u64> = history.points().iter().map(|p| p.memory_percent.round() as u64).collect();
    let disk: Vec<u64> = history.points().iter().map(|p| p.disk_percent.round() as u64).collect();

    let (cpu_title, mem_title, disk_title) = if let Some(s) = status {
        let h = &s.system_health;
        (
            format!("CPU (now: {:>5.1}%)", h.cpu_percent),
            format!(
                "Memory (now: {:>5.1}% - {} / {})",
                h.memory_percent,
                human(h.memory_used_bytes),
                human(h.memory_total_bytes)
            ),
            format!(
                "Disk (now: {:>5.1}% - {} / {})",
                h.disk_percent,
                human(h.disk_used_bytes),
                human(h.disk_total_bytes)
            ),
        )
    } else {
        ("CPU".into(), "Memory".into(), "Disk".into())
    };

    spark(f, rows[0], cpu_title, &cpu, Color::Cyan);
    spark(f, rows[1], mem_title, &mem, Color::Magenta);
    spark(f, rows[2], disk_title, &disk, Color::Green);
}
