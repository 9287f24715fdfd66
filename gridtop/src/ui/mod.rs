//! UI module root: exposes drawing functions for individual panels.

pub mod dialogs;
pub mod header;
pub mod health;
pub mod logpanel;
pub mod opspanel;
pub mod stats;
pub mod util;
