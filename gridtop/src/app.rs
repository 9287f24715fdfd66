//! App state and main loop: input handling, polling the appliance, driving
//! maintenance operations, and drawing.

use std::{
    io,
    path::Path,
    time::{Duration, Instant},
};

use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::time::sleep;

use crate::api::{ApiError, DeviceClient};
use crate::history::{HealthHistory, HistoryRepository};
use crate::logs::LogCategory;
use crate::ops::{MaintenanceController, OpState, RebootState, UPDATE_POLL_INTERVAL};
use crate::types::{DeviceStatus, LogEntry};
use crate::ui::{
    dialogs::{draw_confirm_apply, draw_confirm_reboot, draw_factory_dialog, draw_restore_dialog},
    header::draw_header,
    health::draw_health,
    logpanel::draw_logs,
    opspanel::draw_ops,
    stats::draw_stats,
};

const HEALTH_POLL: Duration = Duration::from_secs(5);
const LOGS_POLL: Duration = Duration::from_secs(30);
const LOGS_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialog {
    None,
    ConfirmReboot,
    ConfirmApply,
    RestorePath,
    FactoryReset,
}

pub struct App {
    client: DeviceClient,
    repo: Box<dyn HistoryRepository>,

    history: HealthHistory,
    status: Option<DeviceStatus>,
    online: bool,
    logs: Vec<LogEntry>,
    log_filter: Option<LogCategory>,
    log_scroll: usize,

    ops: MaintenanceController,
    dialog: Dialog,

    should_quit: bool,

    last_health_poll: Instant,
    last_logs_poll: Instant,
    last_update_poll: Instant,
}

impl App {
    pub fn new(client: DeviceClient, repo: Box<dyn HistoryRepository>) -> Self {
        let past = |d: Duration| Instant::now().checked_sub(d).unwrap_or_else(Instant::now);
        Self {
            client,
            repo,
            history: HealthHistory::default(),
            status: None,
            online: true,
            logs: Vec::new(),
            log_filter: None,
            log_scroll: 0,
            ops: MaintenanceController::new(),
            dialog: Dialog::None,
            should_quit: false,
            // trigger immediately on first loop
            last_health_poll: past(HEALTH_POLL),
            last_logs_poll: past(LOGS_POLL),
            last_update_poll: Instant::now(),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.seed_session().await;

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal).await;

        // Teardown; all polling dies with the loop
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        let _ = self.repo.save(&self.history);

        res
    }

    /// Once per session: seed the chart from the server backfill plus the
    /// locally cached series from the previous run. Bucket dedup makes the
    /// two sources safe to overlay.
    async fn seed_session(&mut self) {
        let now = Utc::now();
        match self.client.health_history().await {
            Ok(samples) => {
                self.history = HealthHistory::seed(&samples, now);
                self.online = true;
            }
            Err(e) => {
                self.history = HealthHistory::default();
                self.online = !e.is_transport();
            }
        }
        let cached = self.repo.load();
        for p in cached.points() {
            self.history.merge_point(*p, now);
        }
        if let Ok(entries) = self.client.logs(LOGS_LIMIT).await {
            self.logs = entries;
        }
    }

    /// The TUI rendition of a page reload: drop all transient state and
    /// start a fresh session against the (likely restarted) appliance.
    async fn reload_session(&mut self) {
        self.ops = MaintenanceController::new();
        self.dialog = Dialog::None;
        self.status = None;
        self.seed_session().await;
        let past = Instant::now()
            .checked_sub(HEALTH_POLL)
            .unwrap_or_else(Instant::now);
        self.last_health_poll = past;
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind != event::KeyEventKind::Press {
                        continue;
                    }
                    self.handle_key(k.code).await;
                }
            }
            if self.should_quit {
                break;
            }

            let now = Instant::now();

            // Health poll: merge into the bounded history; a transport
            // failure means "offline", retried on the next tick (no backoff)
            if self.last_health_poll.elapsed() >= HEALTH_POLL {
                match self.client.status().await {
                    Ok(s) => {
                        self.history.merge_live(&s.system_health, Utc::now());
                        let _ = self.repo.save(&self.history);
                        self.status = Some(s);
                        self.online = true;
                    }
                    Err(e) => self.online = !e.is_transport(),
                }
                self.last_health_poll = Instant::now();
            }

            // Audit log poll
            if self.last_logs_poll.elapsed() >= LOGS_POLL {
                if let Ok(entries) = self.client.logs(LOGS_LIMIT).await {
                    self.logs = entries;
                }
                self.last_logs_poll = Instant::now();
            }

            // Update status poll, only while a run is in flight
            if self.ops.update.phase.polling()
                && self.last_update_poll.elapsed() >= UPDATE_POLL_INTERVAL
            {
                let result = self.client.update_status().await;
                self.ops.on_update_poll(result, Instant::now());
                self.last_update_poll = Instant::now();
            }

            // Scheduled reconnect after restore/reboot/reset/update
            if self.ops.take_due_reload(now).is_some() {
                self.reload_session().await;
            }

            terminal.draw(|f| self.draw(f))?;

            sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }

    async fn handle_key(&mut self, code: KeyCode) {
        match self.dialog {
            Dialog::ConfirmReboot => self.handle_reboot_key(code).await,
            Dialog::ConfirmApply => self.handle_apply_key(code).await,
            Dialog::RestorePath => self.handle_restore_key(code).await,
            Dialog::FactoryReset => self.handle_factory_key(code).await,
            Dialog::None => self.handle_global_key(code).await,
        }
    }

    async fn handle_global_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('b') => self.run_backup().await,
            KeyCode::Char('r') => {
                self.ops.restore_path.clear();
                self.dialog = Dialog::RestorePath;
            }
            KeyCode::Char('R') => {
                self.ops.request_reboot();
                if self.ops.reboot == RebootState::ConfirmPending {
                    self.dialog = Dialog::ConfirmReboot;
                }
            }
            KeyCode::Char('u') => {
                if self.ops.start_update_check() {
                    let result = self.client.check_updates().await;
                    self.ops.finish_update_check(result);
                }
            }
            KeyCode::Char('U') => {
                if self.ops.can_apply_update() {
                    self.dialog = Dialog::ConfirmApply;
                }
            }
            KeyCode::Char('F') => {
                self.ops.open_factory_dialog(&mut rand::thread_rng());
                self.dialog = Dialog::FactoryReset;
            }
            KeyCode::Left => self.cycle_filter(false),
            KeyCode::Right => self.cycle_filter(true),
            KeyCode::PageUp => self.log_scroll = self.log_scroll.saturating_sub(10),
            KeyCode::PageDown => self.log_scroll = (self.log_scroll + 10).min(self.logs.len()),
            KeyCode::Up => self.log_scroll = self.log_scroll.saturating_sub(1),
            KeyCode::Down => self.log_scroll = (self.log_scroll + 1).min(self.logs.len()),
            _ => {}
        }
    }

    fn cycle_filter(&mut self, forward: bool) {
        let all = LogCategory::ALL;
        let idx = self.log_filter.and_then(|c| all.iter().position(|&a| a == c));
        self.log_filter = match (idx, forward) {
            (None, true) => Some(all[0]),
            (None, false) => Some(all[all.len() - 1]),
            (Some(i), true) if i + 1 < all.len() => Some(all[i + 1]),
            (Some(_), true) => None,
            (Some(0), false) => None,
            (Some(i), false) => Some(all[i - 1]),
        };
        self.log_scroll = 0;
    }

    async fn run_backup(&mut self) {
        if !self.ops.start_backup() {
            return;
        }
        let result = match self.client.create_backup().await {
            Ok(created) => {
                // Client-side download of the artifact next to the console
                match self.client.download_backup(&created.backup_name).await {
                    Ok(bytes) => match tokio::fs::write(&created.backup_name, bytes).await {
                        Ok(()) => Ok(created.backup_name),
                        Err(e) => Err(ApiError::Device {
                            status: 0,
                            message: format!("could not write artifact: {e}"),
                        }),
                    },
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };
        self.ops.finish_backup(result);
    }

    async fn handle_reboot_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.dialog = Dialog::None;
                if self.ops.confirm_reboot() {
                    let result = self.client.reboot().await;
                    self.ops.finish_reboot(result, Instant::now());
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.ops.cancel_reboot();
                self.dialog = Dialog::None;
            }
            _ => {}
        }
    }

    async fn handle_apply_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.dialog = Dialog::None;
                if !self.ops.can_apply_update() {
                    return;
                }
                match self.client.apply_update().await {
                    Ok(()) => {
                        self.ops.update_started();
                        self.last_update_poll = Instant::now();
                    }
                    Err(e) => self.ops.update_start_failed(e),
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.dialog = Dialog::None,
            _ => {}
        }
    }

    async fn handle_restore_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.dialog = Dialog::None;
                if !self.ops.restore.in_progress() {
                    self.ops.restore = OpState::Idle;
                }
            }
            KeyCode::Backspace => {
                self.ops.restore_path.pop();
            }
            KeyCode::Char(c) => self.ops.restore_path.push(c),
            KeyCode::Enter => match self.ops.begin_restore() {
                Ok(path) => {
                    let result = self.upload_restore(&path).await;
                    let ok = result.is_ok();
                    self.ops.finish_restore(result, Instant::now());
                    if ok {
                        self.dialog = Dialog::None;
                    }
                }
                // Rejected before any request; shown inline in the dialog
                Err(v) => self.ops.restore = OpState::Failed(v.to_string()),
            },
            _ => {}
        }
    }

    async fn upload_restore(&self, path: &str) -> Result<(), ApiError> {
        let data = tokio::fs::read(path).await.map_err(|e| ApiError::Device {
            status: 0,
            message: format!("could not read {path}: {e}"),
        })?;
        let file_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "backup.db".into());
        self.client.restore(&file_name, data).await
    }

    async fn handle_factory_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                if !self.ops.factory.in_progress() {
                    self.ops.close_factory_dialog();
                    self.dialog = Dialog::None;
                }
            }
            KeyCode::Backspace => {
                if let Some(c) = self.ops.captcha.as_mut() {
                    c.answer.pop();
                }
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                if let Some(c) = self.ops.captcha.as_mut() {
                    c.answer.push(ch);
                }
            }
            KeyCode::Enter => {
                if self.ops.confirm_factory_reset().is_ok() {
                    let result = self
                        .client
                        .factory_reset()
                        .await
                        .map(|created| created.backup_name);
                    self.ops.finish_factory_reset(result, Instant::now());
                    if !self.ops.factory_dialog_open {
                        self.dialog = Dialog::None;
                    }
                }
            }
            _ => {}
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(10)])
            .split(area);

        draw_header(f, rows[0], self.status.as_ref(), self.online);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[1]);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(9), Constraint::Length(8)])
            .split(cols[0]);
        draw_health(f, left[0], &self.history, self.status.as_ref());
        draw_stats(f, left[1], self.status.as_ref());

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(12)])
            .split(cols[1]);
        draw_logs(f, right[0], &self.logs, self.log_filter, self.log_scroll);
        draw_ops(f, right[1], &self.ops, Instant::now());

        match self.dialog {
            Dialog::ConfirmReboot => draw_confirm_reboot(f, area),
            Dialog::ConfirmApply => draw_confirm_apply(f, area, &self.ops),
            Dialog::RestorePath => draw_restore_dialog(f, area, &self.ops),
            Dialog::FactoryReset => draw_factory_dialog(f, area, &self.ops),
            Dialog::None => {}
        }
    }
}
