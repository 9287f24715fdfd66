//! Operations console for the gridtop billing appliance.
//!
//! Core pieces: the bounded health history ([`history`]), the audit-log
//! taxonomy ([`logs`]), and the maintenance operation state machines
//! ([`ops`]). [`app`] wires them to the terminal and the device REST
//! client ([`api`]).

pub mod api;
pub mod app;
pub mod history;
pub mod logs;
pub mod ops;
pub mod profiles;
pub mod types;
pub mod ui;
