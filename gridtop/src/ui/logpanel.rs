//! Audit log table with per-category color tags and a filter row.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::logs::{classify, count_by_category, LogCategory};
use crate::types::LogEntry;

pub fn draw_logs(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    entries: &[LogEntry],
    filter: Option<LogCategory>,
    scroll: usize,
) {
    let title = match filter {
        Some(c) => format!("Audit log - filter: {} (←/→ to change)", c.tag().trim()),
        None => "Audit log - all (←/→ to filter)".into(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    // Filter row: per-category counts, active filter highlighted
    let counts = count_by_category(entries);
    let mut spans: Vec<Span> = Vec::new();
    for (cat, n) in &counts {
        let mut style = Style::default().fg(cat.color());
        if filter == Some(*cat) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(format!("{} {} ", cat.tag().trim(), n), style));
    }
    f.render_widget(
        ratatui::widgets::Paragraph::new(Line::from(spans)),
        Rect { height: 1, ..inner },
    );

    let table_area = Rect {
        y: inner.y + 1,
        height: inner.height.saturating_sub(1),
        ..inner
    };

    let visible = table_area.height.saturating_sub(1) as usize;
    let filtered: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| filter.map(|c| classify(&e.action) == c).unwrap_or(true))
        .collect();
    let start = scroll.min(filtered.len().saturating_sub(visible));

    let rows: Vec<Row> = filtered
        .iter()
        .skip(start)
        .take(visible)
        .map(|e| {
            let cat = classify(&e.action);
            let when = e.created_at.format("%m-%d %H:%M:%S").to_string();
            let detail = e.details.clone().unwrap_or_default();
            Row::new(vec![
                Cell::from(when),
                Cell::from(cat.tag()).style(Style::default().fg(cat.color())),
                Cell::from(e.action.clone()),
                Cell::from(detail),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(3),
            Constraint::Percentage(45),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["time", "cat", "action", "details"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    );
    f.render_widget(table, table_area);
}
