//! Maintenance operation state machines: backup, restore, reboot, update
//! check/apply, factory reset.
//!
//! The controller owns only state and transitions; the event loop performs
//! the actual requests and feeds results back in. That keeps every branch
//! (including the mid-update "device went away" path) drivable from tests
//! without a device or real timers.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::api::ApiError;
use crate::types::{UpdateAvailability, UpdatePhase, UpdateProgress};

// Delays before the console attempts to reconnect after an operation that
// restarts the appliance's server process. The update-lost delay is longer
// because the device is mid-install when we lose it.
pub const RESTORE_RELOAD_DELAY: Duration = Duration::from_secs(8);
pub const REBOOT_RELOAD_DELAY: Duration = Duration::from_secs(20);
pub const FACTORY_RESET_RELOAD_DELAY: Duration = Duration::from_secs(10);
pub const UPDATE_DONE_RELOAD_DELAY: Duration = Duration::from_secs(5);
pub const UPDATE_LOST_RELOAD_DELAY: Duration = Duration::from_secs(20);

pub const UPDATE_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Generic single-shot operation state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OpState {
    #[default]
    Idle,
    InProgress,
    Completed(String),
    Failed(String),
}

impl OpState {
    pub fn in_progress(&self) -> bool {
        matches!(self, OpState::InProgress)
    }
}

/// Client-side precondition failures; rejected before any request is sent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no file selected")]
    EmptyPath,
    #[error("restore file must end in .db")]
    WrongSuffix,
    #[error("captcha answer is wrong")]
    BadCaptcha,
    #[error("operation already in progress")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebootState {
    #[default]
    Idle,
    ConfirmPending,
    Requested,
}

/// Arithmetic challenge gating factory reset. Not a security control, just
/// a brake on accidental clicks.
#[derive(Debug, Clone)]
pub struct Captcha {
    pub operand_a: u8,
    pub operand_b: u8,
    pub answer: String,
}

impl Captcha {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self {
            operand_a: rng.gen_range(1..=10),
            operand_b: rng.gen_range(1..=10),
            answer: String::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        let sum = self.operand_a as u32 + self.operand_b as u32;
        self.answer.trim().parse::<u32>().map(|v| v == sum).unwrap_or(false)
    }
}

/// Progress of an update run as the console displays it. `DeviceLost` is
/// local-only: the status poll stopped completing, which mid-update means
/// the device is restarting, not that the update failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Done,
    DeviceLost,
    Error,
}

impl RunPhase {
    /// Whether the 1.5s status poll should be active.
    pub fn polling(self) -> bool {
        matches!(self, RunPhase::Starting | RunPhase::Running)
    }

    pub fn terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::DeviceLost | RunPhase::Error)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRun {
    pub phase: RunPhase,
    // Display percent; clamped so a device reporting 40 after 60 does not
    // make the gauge walk backwards.
    pub percent: u8,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    RestoreCompleted,
    RebootAcknowledged,
    FactoryResetCompleted,
    UpdateDone,
    UpdateDeviceLost,
}

#[derive(Debug, Clone, Copy)]
pub struct PendingReload {
    pub at: Instant,
    pub reason: ReloadReason,
}

#[derive(Debug, Default)]
pub struct MaintenanceController {
    pub backup: OpState,
    pub restore: OpState,
    pub restore_path: String,
    pub reboot: RebootState,
    pub checking_updates: bool,
    pub availability: Option<UpdateAvailability>,
    pub update: UpdateRun,
    pub factory: OpState,
    pub factory_dialog_open: bool,
    pub captcha: Option<Captcha>,
    /// Transient one-line notice for the ops panel footer.
    pub notice: Option<String>,
    pending_reload: Option<PendingReload>,
}

impl MaintenanceController {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- backup -----

    /// Returns true when the event loop should issue the backup request.
    pub fn start_backup(&mut self) -> bool {
        if self.backup.in_progress() {
            return false;
        }
        self.backup = OpState::InProgress;
        true
    }

    pub fn finish_backup(&mut self, result: Result<String, ApiError>) {
        self.backup = match result {
            Ok(name) => OpState::Completed(name),
            Err(e) => OpState::Failed(e.to_string()),
        };
    }

    // ----- restore -----

    /// Validate the entered path before any upload happens. On success the
    /// caller uploads the file and reports back via [`finish_restore`].
    ///
    /// [`finish_restore`]: MaintenanceController::finish_restore
    pub fn begin_restore(&mut self) -> Result<String, ValidationError> {
        if self.restore.in_progress() {
            return Err(ValidationError::Busy);
        }
        let path = self.restore_path.trim().to_string();
        if path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if !path.ends_with(".db") {
            return Err(ValidationError::WrongSuffix);
        }
        self.restore = OpState::InProgress;
        Ok(path)
    }

    pub fn finish_restore(&mut self, result: Result<(), ApiError>, now: Instant) {
        match result {
            Ok(()) => {
                self.restore = OpState::Completed("restore uploaded".into());
                // The backing service restarts after restore; reconnect once
                // it has had a moment to come back.
                self.schedule_reload(now, RESTORE_RELOAD_DELAY, ReloadReason::RestoreCompleted);
            }
            Err(e) => self.restore = OpState::Failed(e.to_string()),
        }
    }

    // ----- reboot -----

    pub fn request_reboot(&mut self) {
        if self.reboot == RebootState::Idle {
            self.reboot = RebootState::ConfirmPending;
        }
    }

    pub fn cancel_reboot(&mut self) {
        if self.reboot == RebootState::ConfirmPending {
            self.reboot = RebootState::Idle;
        }
    }

    /// Returns true when the event loop should issue the reboot request.
    pub fn confirm_reboot(&mut self) -> bool {
        if self.reboot != RebootState::ConfirmPending {
            return false;
        }
        self.reboot = RebootState::Requested;
        true
    }

    pub fn finish_reboot(&mut self, result: Result<(), ApiError>, now: Instant) {
        match result {
            Ok(()) => {
                self.schedule_reload(now, REBOOT_RELOAD_DELAY, ReloadReason::RebootAcknowledged);
            }
            Err(e) => {
                // Re-arm the action
                self.reboot = RebootState::Idle;
                self.notice = Some(format!("reboot failed: {e}"));
            }
        }
    }

    // ----- update check -----

    pub fn start_update_check(&mut self) -> bool {
        if self.checking_updates {
            return false;
        }
        self.checking_updates = true;
        true
    }

    /// Each successful check fully replaces the previous availability. A
    /// failed check leaves it untouched; never a user-facing error.
    pub fn finish_update_check(&mut self, result: Result<UpdateAvailability, ApiError>) {
        self.checking_updates = false;
        match result {
            Ok(avail) => self.availability = Some(avail),
            Err(e) => self.notice = Some(format!("update check failed: {e}")),
        }
    }

    // ----- apply update -----

    pub fn can_apply_update(&self) -> bool {
        self.availability
            .as_ref()
            .map(|a| a.updates_available)
            .unwrap_or(false)
            && !self.update.phase.polling()
    }

    /// Called once the device accepted the apply request.
    pub fn update_started(&mut self) {
        self.update = UpdateRun {
            phase: RunPhase::Starting,
            percent: 0,
            message: "starting update".into(),
            error: None,
        };
    }

    pub fn update_start_failed(&mut self, err: ApiError) {
        self.update = UpdateRun::default();
        self.notice = Some(format!("update apply rejected: {e}", e = err));
    }

    /// One status-poll result. The key branch: a transport failure here is
    /// the device restarting mid-install, not a failed update, so it
    /// schedules a reconnect instead of surfacing an error.
    pub fn on_update_poll(&mut self, result: Result<UpdateProgress, ApiError>, now: Instant) {
        if !self.update.phase.polling() {
            // Stray result after a terminal phase; polling already stopped.
            return;
        }
        match result {
            Ok(progress) => self.adopt_progress(progress, now),
            Err(e) if e.is_transport() => {
                self.update.phase = RunPhase::DeviceLost;
                self.update.message = "device restarting, reconnecting...".into();
                self.schedule_reload(now, UPDATE_LOST_RELOAD_DELAY, ReloadReason::UpdateDeviceLost);
            }
            Err(e) => {
                self.update.phase = RunPhase::Error;
                self.update.error = Some(e.to_string());
            }
        }
    }

    fn adopt_progress(&mut self, p: UpdateProgress, now: Instant) {
        self.update.message = p.message;
        self.update.percent = self.update.percent.max(p.percent.min(100));
        match p.phase {
            UpdatePhase::Starting => self.update.phase = RunPhase::Starting,
            UpdatePhase::Running => self.update.phase = RunPhase::Running,
            UpdatePhase::Done => {
                self.update.phase = RunPhase::Done;
                self.update.percent = 100;
                self.schedule_reload(now, UPDATE_DONE_RELOAD_DELAY, ReloadReason::UpdateDone);
            }
            UpdatePhase::Error => {
                self.update.phase = RunPhase::Error;
                self.update.error = p.error.or_else(|| Some("update failed".into()));
            }
            // The device has not registered the run yet; keep waiting.
            UpdatePhase::Idle => {}
        }
    }

    // ----- factory reset -----

    /// Opening the dialog always regenerates the challenge, invalidating
    /// any previously entered answer.
    pub fn open_factory_dialog<R: Rng>(&mut self, rng: &mut R) {
        self.factory_dialog_open = true;
        self.captcha = Some(Captcha::generate(rng));
    }

    pub fn close_factory_dialog(&mut self) {
        self.factory_dialog_open = false;
        self.captcha = None;
    }

    /// Gate 2: only a correct answer lets the request go out.
    pub fn confirm_factory_reset(&mut self) -> Result<(), ValidationError> {
        if self.factory.in_progress() {
            return Err(ValidationError::Busy);
        }
        let valid = self.captcha.as_ref().map(Captcha::is_valid).unwrap_or(false);
        if !valid {
            return Err(ValidationError::BadCaptcha);
        }
        self.factory = OpState::InProgress;
        Ok(())
    }

    pub fn finish_factory_reset(&mut self, result: Result<String, ApiError>, now: Instant) {
        match result {
            Ok(backup_name) => {
                self.factory = OpState::Completed(backup_name);
                self.factory_dialog_open = false;
                self.schedule_reload(
                    now,
                    FACTORY_RESET_RELOAD_DELAY,
                    ReloadReason::FactoryResetCompleted,
                );
            }
            Err(e) => {
                // Dialog stays open with its captcha; the user may retry.
                self.factory = OpState::Failed(e.to_string());
            }
        }
    }

    // ----- reload scheduling -----

    fn schedule_reload(&mut self, now: Instant, delay: Duration, reason: ReloadReason) {
        if self.pending_reload.is_none() {
            self.pending_reload = Some(PendingReload {
                at: now + delay,
                reason,
            });
        }
    }

    pub fn pending_reload(&self) -> Option<PendingReload> {
        self.pending_reload
    }

    /// Consume the reload once its delay has elapsed.
    pub fn take_due_reload(&mut self, now: Instant) -> Option<ReloadReason> {
        match self.pending_reload {
            Some(p) if now >= p.at => {
                self.pending_reload = None;
                Some(p.reason)
            }
            _ => None,
        }
    }
}
