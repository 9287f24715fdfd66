//! Top header with device uptime, temperature, and reachability.

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

use crate::types::DeviceStatus;

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, status: Option<&DeviceStatus>, online: bool) {
    let title = if let Some(s) = status {
        let h = &s.system_health;
        let temp = if h.temperature_celsius > 0.0 {
            let icon = if h.temperature_celsius < 60.0 {
                "😎"
            } else if h.temperature_celsius < 80.0 {
                "⚠️"
            } else {
                "🔥"
            };
            format!("{:.1}°C {}", h.temperature_celsius, icon)
        } else {
            "temp N/A".into()
        };
        let link = if online { "online" } else { "offline - retrying" };
        format!(
            "gridtop - appliance {} | up {} | {}  (press 'q' to quit)",
            link, h.uptime_label, temp
        )
    } else if online {
        "gridtop - connecting... (press 'q' to quit)".into()
    } else {
        "gridtop - appliance offline, retrying... (press 'q' to quit)".into()
    };
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}
