#![forbid(unsafe_code)]

mod app;
mod config;
mod constants;
mod geometry;
mod interaction;
mod ipc;
mod types;
mod window;
mod x11_utils;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;
use x11rb::connection::Connection;

use app::{App, Host, SignalPipes};
use config::Preferences;
use geometry::GeometryStore;
use interaction::{InteractionMachine, OpacityLevel};
use ipc::Role;
use types::Rect;
use window::{FloatingWindow, WindowOptions};
use x11_utils::{work_area, CachedAtoms};

/// Floating clipboard window
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Preferences document (default: <config dir>/clipfloat/preferences.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Singleton socket (default: $XDG_RUNTIME_DIR/clipfloat/clipfloat.sock)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// trace, debug, info, warn or error (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Ignore the stored window rectangle
    #[arg(long)]
    reset_geometry: bool,
}

fn parse_level(name: &str) -> TraceLevel {
    match name.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// Stored rectangle if usable, otherwise the default size centered in `bounds`.
/// Either way the result is at least the minimum size.
fn startup_rect(prefs: &Preferences, bounds: Rect, reset: bool) -> Rect {
    let stored = if reset {
        info!("Ignoring stored geometry");
        None
    } else {
        geometry::load(&prefs.window, bounds)
    };
    let rect = stored.unwrap_or_else(|| bounds.centered(prefs.default_size()));
    let min = prefs.min_size();
    Rect::new(
        rect.x,
        rect.y,
        rect.width.max(min.width),
        rect.height.max(min.height),
    )
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .map(|name| parse_level(&name))
        .unwrap_or(TraceLevel::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let socket_path = match cli.socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };
    let singleton = match ipc::acquire(&socket_path) {
        Ok(Role::Primary(server)) => server,
        Ok(Role::Secondary) => return Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = ?e, "Failed to become the primary instance");
            return Ok(ExitCode::FAILURE);
        }
    };

    let config_path = cli.config.unwrap_or_else(Preferences::default_path);
    let prefs = Preferences::load(&config_path);
    info!(config = ?prefs, "Preferences loaded");

    let (conn, screen_num) = x11rb::connect(None)?;
    let screen = &conn.setup().roots[screen_num];
    info!(
        screen = screen_num,
        width = screen.width_in_pixels,
        height = screen.height_in_pixels,
        "Connected to X11"
    );

    // Pre-cache atoms once at startup
    let atoms = CachedAtoms::new(&conn)?;
    let bounds = work_area(&conn, screen, &atoms)?;
    let rect = startup_rect(&prefs, bounds, cli.reset_geometry);

    let signals = SignalPipes::register()?;
    let window = FloatingWindow::new(
        &conn,
        screen,
        &atoms,
        WindowOptions {
            rect,
            min_size: prefs.min_size(),
            background_pixel: prefs.background_pixel(),
            always_on_top: prefs.always_on_top,
            opacity_percent: prefs.opacity.percent(OpacityLevel::Normal),
        },
    )?;

    let host = Host::new(
        window,
        GeometryStore::new(config_path.clone()),
        prefs.opacity,
        &conn,
        screen,
        &atoms,
    );
    let machine = InteractionMachine::new(prefs.interaction_config());

    App::new(&conn, &atoms, host, machine, singleton, signals, config_path).run()?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryRecord;

    fn screen() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), TraceLevel::DEBUG);
        assert_eq!(parse_level("warn"), TraceLevel::WARN);
        assert_eq!(parse_level("verbose"), TraceLevel::INFO);
    }

    #[test]
    fn test_startup_rect_defaults_to_centered() {
        let prefs = Preferences::default();
        assert_eq!(startup_rect(&prefs, screen(), false), Rect::new(750, 390, 420, 300));
    }

    #[test]
    fn test_startup_rect_uses_stored_geometry() {
        let prefs = Preferences {
            window: GeometryRecord::from(Rect::new(40, 50, 500, 400)),
            ..Preferences::default()
        };
        assert_eq!(startup_rect(&prefs, screen(), false), Rect::new(40, 50, 500, 400));
        assert_eq!(startup_rect(&prefs, screen(), true), Rect::new(750, 390, 420, 300));
    }

    #[test]
    fn test_startup_rect_enforces_minimum() {
        let prefs = Preferences {
            window: GeometryRecord::from(Rect::new(40, 50, 100, 60)),
            ..Preferences::default()
        };
        assert_eq!(startup_rect(&prefs, screen(), false), Rect::new(40, 50, 220, 120));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "clipfloat",
            "--config",
            "/tmp/prefs.json",
            "--reset-geometry",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/prefs.json")));
        assert!(cli.reset_geometry);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.socket, None);
    }
}
