//! Simulated billing appliance. Serves the gridtop REST contract with
//! synthetic telemetry; used by the console's --demo mode and for manual
//! testing against a device that can be "restarted" freely.

mod routes;
mod state;
mod types;

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

const DEFAULT_PORT: u16 = 9090;

fn parse_port<I: IntoIterator<Item = String>>(args: I, default_port: u16) -> u16 {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut long: Option<String> = None;
    let mut short: Option<String> = None;
    while let Some(a) = it.next() {
        match a.as_str() {
            "--port" => long = it.next(),
            "-p" => short = it.next(),
            _ if a.starts_with("--port=") => {
                if let Some((_, v)) = a.split_once('=') {
                    long = Some(v.to_string());
                }
            }
            _ => {}
        }
    }
    long.or(short)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(default_port)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = parse_port(std::env::args(), DEFAULT_PORT);
    let token = std::env::var("GRIDTOP_SIMDEV_TOKEN").ok().filter(|t| !t.is_empty());
    // Scripted failure at 40% for exercising the console's error branch
    let fail_update = std::env::var("GRIDTOP_SIMDEV_UPDATE_FAIL").map(|v| v == "1").unwrap_or(false);

    let state = AppState::new(token, fail_update);
    let app = Router::new()
        .route("/api/health/status", get(routes::health_status))
        .route("/api/health/history", get(routes::health_history))
        .route("/api/logs", get(routes::logs))
        .route("/api/backup", post(routes::create_backup))
        .route("/api/backup/:name", get(routes::download_backup))
        .route("/api/restore", post(routes::restore))
        .route("/api/reboot", post(routes::reboot))
        .route("/api/factory-reset", post(routes::factory_reset))
        .route("/api/update/check", get(routes::update_check))
        .route("/api/update/apply", post(routes::update_apply))
        .route("/api/update/status", get(routes::update_status))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "simulated appliance listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_port, DEFAULT_PORT};

    #[test]
    fn port_long_short_and_assign() {
        let a = |v: &[&str]| {
            std::iter::once("simdev")
                .chain(v.iter().copied())
                .map(String::from)
                .collect::<Vec<_>>()
        };
        assert_eq!(parse_port(a(&["--port", "9001"]), DEFAULT_PORT), 9001);
        assert_eq!(parse_port(a(&["-p", "9002"]), DEFAULT_PORT), 9002);
        assert_eq!(parse_port(a(&["--port=9003"]), DEFAULT_PORT), 9003);
        assert_eq!(parse_port(a(&[]), DEFAULT_PORT), DEFAULT_PORT);
    }
}
