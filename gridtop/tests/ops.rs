//! Maintenance state-machine behavior, driven without a device or timers.

use std::time::{Duration, Instant};

use gridtop::api::ApiError;
use gridtop::ops::{
    Captcha, MaintenanceController, OpState, RebootState, ReloadReason, RunPhase, ValidationError,
    RESTORE_RELOAD_DELAY, UPDATE_DONE_RELOAD_DELAY, UPDATE_LOST_RELOAD_DELAY,
};
use gridtop::types::{UpdateAvailability, UpdatePhase, UpdateProgress};

fn transport() -> ApiError {
    ApiError::Transport("connection refused".into())
}

fn progress(phase: UpdatePhase, percent: u8) -> UpdateProgress {
    UpdateProgress {
        phase,
        percent,
        message: "installing".into(),
        error: None,
    }
}

fn availability(available: bool) -> UpdateAvailability {
    UpdateAvailability {
        updates_available: available,
        current_version_id: "2.4.1".into(),
        remote_version_id: "2.5.0".into(),
        change_log: None,
    }
}

// ----- apply-update polling -----

#[test]
fn transport_failure_mid_update_schedules_reconnect_without_error() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.update_started();
    ops.on_update_poll(Ok(progress(UpdatePhase::Running, 40)), now);
    assert_eq!(ops.update.phase, RunPhase::Running);

    ops.on_update_poll(Err(transport()), now);
    assert_eq!(ops.update.phase, RunPhase::DeviceLost);
    assert!(ops.update.error.is_none(), "no user-facing error on restart");
    assert!(ops.update.phase.terminal() && !ops.update.phase.polling(), "polling must stop");
    let reload = ops.pending_reload().expect("reconnect scheduled");
    assert_eq!(reload.reason, ReloadReason::UpdateDeviceLost);
    assert_eq!(reload.at, now + UPDATE_LOST_RELOAD_DELAY);
}

#[test]
fn device_reported_error_stops_polling_and_surfaces_message() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.update_started();
    ops.on_update_poll(Ok(progress(UpdatePhase::Running, 40)), now);

    let mut failed = progress(UpdatePhase::Error, 40);
    failed.error = Some("disk full".into());
    ops.on_update_poll(Ok(failed), now);

    assert_eq!(ops.update.phase, RunPhase::Error);
    assert_eq!(ops.update.error.as_deref(), Some("disk full"));
    assert!(!ops.update.phase.polling());
    assert!(ops.pending_reload().is_none(), "no reload on device failure");
}

#[test]
fn done_poll_schedules_reconnect() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.update_started();
    ops.on_update_poll(Ok(progress(UpdatePhase::Done, 100)), now);
    assert_eq!(ops.update.phase, RunPhase::Done);
    let reload = ops.pending_reload().expect("reconnect scheduled");
    assert_eq!(reload.reason, ReloadReason::UpdateDone);
    assert_eq!(reload.at, now + UPDATE_DONE_RELOAD_DELAY);
}

#[test]
fn display_percent_never_regresses() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.update_started();
    ops.on_update_poll(Ok(progress(UpdatePhase::Running, 60)), now);
    ops.on_update_poll(Ok(progress(UpdatePhase::Running, 40)), now);
    assert_eq!(ops.update.percent, 60);
    ops.on_update_poll(Ok(progress(UpdatePhase::Running, 70)), now);
    assert_eq!(ops.update.percent, 70);
}

#[test]
fn stray_poll_after_terminal_phase_is_ignored() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.update_started();
    ops.on_update_poll(Ok(progress(UpdatePhase::Done, 100)), now);
    let first = ops.pending_reload().unwrap();

    // A second done (or anything else) after the terminal phase changes nothing
    ops.on_update_poll(Ok(progress(UpdatePhase::Done, 100)), now + Duration::from_secs(1));
    ops.on_update_poll(Err(transport()), now + Duration::from_secs(1));
    assert_eq!(ops.update.phase, RunPhase::Done);
    assert_eq!(ops.pending_reload().unwrap().at, first.at);
}

#[test]
fn apply_is_guarded_on_availability() {
    let mut ops = MaintenanceController::new();
    assert!(!ops.can_apply_update());
    ops.finish_update_check(Ok(availability(false)));
    assert!(!ops.can_apply_update());
    ops.finish_update_check(Ok(availability(true)));
    assert!(ops.can_apply_update());
    ops.update_started();
    assert!(!ops.can_apply_update(), "not while a run is in flight");
}

#[test]
fn rejected_apply_resets_the_run_and_leaves_a_notice() {
    let mut ops = MaintenanceController::new();
    ops.finish_update_check(Ok(availability(true)));
    ops.update_started();
    assert_eq!(ops.update.phase, RunPhase::Starting);

    ops.update_start_failed(ApiError::Device {
        status: 409,
        message: "update already running".into(),
    });
    assert_eq!(ops.update.phase, RunPhase::Idle);
    assert!(!ops.update.phase.polling());
    assert!(ops.notice.as_deref().unwrap().contains("update already running"));
    assert!(ops.pending_reload().is_none());
    assert!(ops.can_apply_update(), "action is re-armed after rejection");
}

#[test]
fn each_check_replaces_availability_wholesale_and_errors_keep_it() {
    let mut ops = MaintenanceController::new();
    ops.finish_update_check(Ok(availability(true)));
    ops.finish_update_check(Ok(availability(false)));
    assert!(!ops.availability.as_ref().unwrap().updates_available);

    ops.finish_update_check(Err(transport()));
    assert!(ops.availability.is_some(), "failed check leaves state unchanged");
    assert!(ops.notice.is_some());
}

// ----- captcha / factory reset -----

#[test]
fn captcha_accepts_only_the_exact_sum() {
    let mut c = Captcha {
        operand_a: 3,
        operand_b: 9,
        answer: String::new(),
    };
    for wrong in ["", "11", "13", "3", "9", "39", "abc", "-12"] {
        c.answer = wrong.into();
        assert!(!c.is_valid(), "{wrong:?} must not unlock the reset");
    }
    c.answer = "12".into();
    assert!(c.is_valid());
    c.answer = " 12 ".into();
    assert!(c.is_valid(), "surrounding whitespace is tolerated");
}

#[test]
fn reopening_the_dialog_regenerates_and_invalidates() {
    let mut ops = MaintenanceController::new();
    let mut rng = rand::thread_rng();
    ops.open_factory_dialog(&mut rng);
    let c = ops.captcha.as_mut().unwrap();
    c.answer = (c.operand_a as u32 + c.operand_b as u32).to_string();
    assert!(ops.captcha.as_ref().unwrap().is_valid());

    ops.open_factory_dialog(&mut rng);
    let c = ops.captcha.as_ref().unwrap();
    assert!(c.answer.is_empty(), "previous answer discarded");
    assert!((1..=10).contains(&c.operand_a));
    assert!((1..=10).contains(&c.operand_b));
    assert!(!c.is_valid());
}

#[test]
fn factory_confirm_is_rejected_until_captcha_is_valid() {
    let mut ops = MaintenanceController::new();
    let mut rng = rand::thread_rng();
    ops.open_factory_dialog(&mut rng);
    assert_eq!(ops.confirm_factory_reset(), Err(ValidationError::BadCaptcha));

    let c = ops.captcha.as_mut().unwrap();
    c.answer = (c.operand_a as u32 + c.operand_b as u32).to_string();
    assert!(ops.confirm_factory_reset().is_ok());
    assert!(ops.factory.in_progress());
}

#[test]
fn factory_failure_keeps_dialog_and_captcha() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    let mut rng = rand::thread_rng();
    ops.open_factory_dialog(&mut rng);
    let c = ops.captcha.as_mut().unwrap();
    c.answer = (c.operand_a as u32 + c.operand_b as u32).to_string();
    ops.confirm_factory_reset().unwrap();

    ops.finish_factory_reset(
        Err(ApiError::Device {
            status: 500,
            message: "busy".into(),
        }),
        now,
    );
    assert!(matches!(ops.factory, OpState::Failed(_)));
    assert!(ops.factory_dialog_open, "dialog stays open for retry");
    assert!(ops.captcha.is_some(), "captcha state preserved");
    assert!(ops.pending_reload().is_none());
}

#[test]
fn factory_success_schedules_reconnect() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    let mut rng = rand::thread_rng();
    ops.open_factory_dialog(&mut rng);
    let c = ops.captcha.as_mut().unwrap();
    c.answer = (c.operand_a as u32 + c.operand_b as u32).to_string();
    ops.confirm_factory_reset().unwrap();
    ops.finish_factory_reset(Ok("gridtop-prereset.db".into()), now);
    assert!(matches!(ops.factory, OpState::Completed(_)));
    assert_eq!(
        ops.pending_reload().unwrap().reason,
        ReloadReason::FactoryResetCompleted
    );
}

// ----- restore -----

#[test]
fn restore_validation_rejects_before_any_request() {
    let mut ops = MaintenanceController::new();
    assert_eq!(ops.begin_restore(), Err(ValidationError::EmptyPath));
    ops.restore_path = "dump.sql".into();
    assert_eq!(ops.begin_restore(), Err(ValidationError::WrongSuffix));
    assert_eq!(ops.restore, OpState::Idle, "no state change on rejection");

    ops.restore_path = "backups/nightly.db".into();
    assert_eq!(ops.begin_restore().unwrap(), "backups/nightly.db");
    assert!(ops.restore.in_progress());
    assert_eq!(ops.begin_restore(), Err(ValidationError::Busy));
}

#[test]
fn restore_success_schedules_reconnect_failure_rearms() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.restore_path = "nightly.db".into();
    ops.begin_restore().unwrap();
    ops.finish_restore(Ok(()), now);
    let reload = ops.pending_reload().unwrap();
    assert_eq!(reload.reason, ReloadReason::RestoreCompleted);
    assert_eq!(reload.at, now + RESTORE_RELOAD_DELAY);

    let mut ops = MaintenanceController::new();
    ops.restore_path = "nightly.db".into();
    ops.begin_restore().unwrap();
    ops.finish_restore(
        Err(ApiError::Device {
            status: 400,
            message: "bad dump".into(),
        }),
        now,
    );
    assert!(matches!(ops.restore, OpState::Failed(_)));
    assert!(ops.pending_reload().is_none());
}

// ----- reboot / backup -----

#[test]
fn reboot_requires_explicit_confirmation() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    assert!(!ops.confirm_reboot(), "no request without prior confirm step");
    ops.request_reboot();
    assert_eq!(ops.reboot, RebootState::ConfirmPending);
    ops.cancel_reboot();
    assert_eq!(ops.reboot, RebootState::Idle);

    ops.request_reboot();
    assert!(ops.confirm_reboot());
    ops.finish_reboot(Ok(()), now);
    assert_eq!(
        ops.pending_reload().unwrap().reason,
        ReloadReason::RebootAcknowledged
    );
}

#[test]
fn failed_reboot_rearms_the_action() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.request_reboot();
    ops.confirm_reboot();
    ops.finish_reboot(Err(transport()), now);
    assert_eq!(ops.reboot, RebootState::Idle);
    assert!(ops.notice.is_some());
    assert!(ops.pending_reload().is_none());
}

#[test]
fn backup_completion_and_failure() {
    let mut ops = MaintenanceController::new();
    assert!(ops.start_backup());
    assert!(!ops.start_backup(), "double trigger ignored while in flight");
    ops.finish_backup(Ok("gridtop-backup-1.db".into()));
    assert_eq!(ops.backup, OpState::Completed("gridtop-backup-1.db".into()));

    ops.finish_backup(Err(transport()));
    assert!(matches!(ops.backup, OpState::Failed(_)));
}

// ----- reload scheduling -----

#[test]
fn reload_fires_only_once_its_delay_elapsed() {
    let now = Instant::now();
    let mut ops = MaintenanceController::new();
    ops.restore_path = "n.db".into();
    ops.begin_restore().unwrap();
    ops.finish_restore(Ok(()), now);

    assert!(ops.take_due_reload(now).is_none());
    assert!(ops
        .take_due_reload(now + RESTORE_RELOAD_DELAY - Duration::from_millis(1))
        .is_none());
    assert_eq!(
        ops.take_due_reload(now + RESTORE_RELOAD_DELAY),
        Some(ReloadReason::RestoreCompleted)
    );
    assert!(ops.take_due_reload(now + RESTORE_RELOAD_DELAY).is_none(), "consumed");
}
