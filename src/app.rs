//! Event loop for the primary instance
//!
//! X11 events, singleton connections and signal notifications are
//! multiplexed with `poll` on a single thread.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io::{ErrorKind, Read};
use std::os::fd::AsFd;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::config::{OpacitySettings, Preferences};
use crate::constants::mouse;
use crate::geometry::GeometryStore;
use crate::interaction::{
    CursorShape, InteractionMachine, InteractionMode, OpacityLevel, PointerEvent, WindowHost,
};
use crate::ipc::SingletonServer;
use crate::types::{Point, Rect};
use crate::window::FloatingWindow;
use crate::x11_utils::{work_area, CachedAtoms};

/// [`WindowHost`] backed by the X11 window and the preferences file.
/// Failures are logged here; the engine never sees them.
pub struct Host<'a> {
    window: FloatingWindow<'a>,
    store: GeometryStore,
    opacity: OpacitySettings,
    conn: &'a RustConnection,
    screen: &'a Screen,
    atoms: &'a CachedAtoms,
}

impl<'a> Host<'a> {
    pub fn new(
        window: FloatingWindow<'a>,
        store: GeometryStore,
        opacity: OpacitySettings,
        conn: &'a RustConnection,
        screen: &'a Screen,
        atoms: &'a CachedAtoms,
    ) -> Self {
        Self {
            window,
            store,
            opacity,
            conn,
            screen,
            atoms,
        }
    }

    pub fn set_opacity_settings(&mut self, opacity: OpacitySettings) {
        self.opacity = opacity;
    }

    pub fn set_always_on_top(&mut self, enabled: bool) {
        if self.window.always_on_top() == enabled {
            return;
        }
        if let Err(e) = self.window.set_always_on_top(enabled) {
            error!(error = ?e, "Failed to change always-on-top");
        }
    }
}

impl WindowHost for Host<'_> {
    fn window_rect(&self) -> Rect {
        self.window.rect()
    }

    fn screen_available_bounds(&self) -> Rect {
        work_area(self.conn, self.screen, self.atoms).unwrap_or_else(|e| {
            warn!(error = ?e, "Failed to query work area, using full screen");
            Rect::new(
                0,
                0,
                i32::from(self.screen.width_in_pixels),
                i32::from(self.screen.height_in_pixels),
            )
        })
    }

    fn set_window_geometry(&mut self, rect: Rect) {
        if let Err(e) = self.window.set_geometry(rect) {
            error!(error = ?e, "Failed to apply window geometry");
        }
    }

    fn set_cursor_shape(&mut self, shape: CursorShape) {
        if let Err(e) = self.window.set_cursor(shape) {
            warn!(error = ?e, "Failed to set cursor");
        }
    }

    fn request_opacity(&mut self, level: OpacityLevel) {
        let percent = self.opacity.percent(level);
        debug!(?level, percent = percent, "Opacity requested");
        if let Err(e) = self.window.set_opacity(percent) {
            warn!(error = ?e, "Failed to set opacity");
        }
    }

    fn bring_to_front_and_focus(&mut self) {
        info!("Raising window");
        if let Err(e) = self.window.raise_and_focus() {
            error!(error = ?e, "Failed to raise window");
        }
        self.request_opacity(OpacityLevel::Normal);
    }

    fn persist_geometry(&mut self, rect: Rect) {
        self.store.save(rect);
    }
}

/// Self-pipes written by signal handlers
pub struct SignalPipes {
    /// SIGINT / SIGTERM
    pub shutdown: UnixStream,
    /// SIGHUP
    pub reload: UnixStream,
}

impl SignalPipes {
    pub fn register() -> Result<Self> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::low_level::pipe;

        let (shutdown, shutdown_write) = UnixStream::pair()
            .context("Failed to create shutdown signal pipe")?;
        let (reload, reload_write) = UnixStream::pair()
            .context("Failed to create reload signal pipe")?;
        shutdown.set_nonblocking(true)
            .context("Failed to make shutdown pipe non-blocking")?;
        reload.set_nonblocking(true)
            .context("Failed to make reload pipe non-blocking")?;

        pipe::register(SIGINT, shutdown_write.try_clone().context("Failed to clone signal pipe")?)
            .context("Failed to register SIGINT handler")?;
        pipe::register(SIGTERM, shutdown_write)
            .context("Failed to register SIGTERM handler")?;
        pipe::register(SIGHUP, reload_write)
            .context("Failed to register SIGHUP handler")?;

        Ok(Self { shutdown, reload })
    }
}

/// Discard pending bytes; returns whether any were read
fn drain(stream: &mut UnixStream) -> bool {
    let mut buf = [0u8; 32];
    let mut any = false;
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return any,
            Ok(_) => any = true,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if e.kind() != ErrorKind::WouldBlock {
                    warn!(error = %e, "Failed to read signal pipe");
                }
                return any;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App<'a> {
    conn: &'a RustConnection,
    atoms: &'a CachedAtoms,
    host: Host<'a>,
    machine: InteractionMachine,
    singleton: SingletonServer,
    signals: SignalPipes,
    config_path: PathBuf,
}

impl<'a> App<'a> {
    pub fn new(
        conn: &'a RustConnection,
        atoms: &'a CachedAtoms,
        host: Host<'a>,
        machine: InteractionMachine,
        singleton: SingletonServer,
        signals: SignalPipes,
        config_path: PathBuf,
    ) -> Self {
        Self {
            conn,
            atoms,
            host,
            machine,
            singleton,
            signals,
            config_path,
        }
    }

    pub fn run(mut self) -> Result<()> {
        self.host.request_opacity(OpacityLevel::Normal);
        info!(
            window = self.host.window.window,
            socket = %self.singleton.path().display(),
            preferences = %self.host.store.path().display(),
            "Window running"
        );

        loop {
            while let Some(event) = self.conn.poll_for_event()
                .context("Failed to poll for X11 event")?
            {
                if self.handle_event(event) == Flow::Exit {
                    return self.shutdown("window closed");
                }
            }
            self.conn.flush()
                .context("Failed to flush X11 connection")?;

            self.wait_for_activity()?;

            if drain(&mut self.signals.shutdown) {
                return self.shutdown("signal received");
            }
            if drain(&mut self.signals.reload) {
                self.reload_preferences();
            }

            for _ in 0..self.singleton.process() {
                self.host.bring_to_front_and_focus();
            }
        }
    }

    /// Block until the X11 connection, a signal pipe or the singleton socket is readable
    fn wait_for_activity(&self) -> Result<()> {
        let mut fds = vec![
            PollFd::new(self.conn.stream().as_fd(), PollFlags::POLLIN),
            PollFd::new(self.signals.shutdown.as_fd(), PollFlags::POLLIN),
            PollFd::new(self.signals.reload.as_fd(), PollFlags::POLLIN),
        ];
        fds.extend(
            self.singleton
                .fds()
                .map(|fd| PollFd::new(fd, PollFlags::POLLIN)),
        );

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) | Err(Errno::EINTR) => Ok(()),
            Err(e) => Err(e).context("Failed to poll event sources"),
        }
    }

    fn handle_event(&mut self, event: Event) -> Flow {
        let window = self.host.window.window;
        match event {
            Event::ButtonPress(event) if event.event == window && event.detail == mouse::BUTTON_LEFT => {
                self.machine.press(&mut self.host, pointer(event.event_x, event.event_y, event.root_x, event.root_y));
            }
            Event::ButtonRelease(event) if event.event == window && event.detail == mouse::BUTTON_LEFT => {
                self.machine.release(&mut self.host, pointer(event.event_x, event.event_y, event.root_x, event.root_y));
            }
            Event::MotionNotify(event) if event.event == window => {
                self.machine.motion(&mut self.host, pointer(event.event_x, event.event_y, event.root_x, event.root_y));
            }
            Event::EnterNotify(event) if event.event == window && event.mode == NotifyMode::NORMAL => {
                self.machine.pointer_entered(&mut self.host);
            }
            Event::LeaveNotify(event) if event.event == window && event.mode == NotifyMode::NORMAL => {
                self.machine.pointer_left(&mut self.host);
            }
            Event::ConfigureNotify(event) if event.window == window => {
                // Our own moves are already tracked; only pick up WM changes while idle
                if self.machine.mode() == InteractionMode::Idle
                    && let Err(e) = self.host.window.sync_geometry()
                {
                    warn!(error = ?e, "Failed to sync geometry after ConfigureNotify");
                }
            }
            Event::ClientMessage(event) if event.window == window && event.type_ == self.atoms.wm_protocols => {
                if event.data.as_data32()[0] == self.atoms.wm_delete_window {
                    info!("Window close requested");
                    return Flow::Exit;
                }
            }
            Event::Error(e) => {
                error!(error = ?e, "X11 error");
            }
            _ => (),
        }
        Flow::Continue
    }

    /// Re-read preferences and push them through the explicit setters
    fn reload_preferences(&mut self) {
        info!(path = %self.config_path.display(), "Reloading preferences");
        let prefs = Preferences::load(&self.config_path);
        let config = prefs.interaction_config();
        if config != self.machine.config() {
            info!(?config, "Interaction settings changed");
            self.machine.set_config(config);
        }
        self.host.set_opacity_settings(prefs.opacity);
        self.host.set_always_on_top(prefs.always_on_top);
        if self.machine.mode() == InteractionMode::Idle {
            self.host.request_opacity(OpacityLevel::Normal);
        }
    }

    fn shutdown(mut self, reason: &str) -> Result<()> {
        info!(reason = reason, "Shutting down");
        let rect = self.host.window_rect();
        self.host.persist_geometry(rect);
        Ok(())
    }
}

fn pointer(event_x: i16, event_y: i16, root_x: i16, root_y: i16) -> PointerEvent {
    PointerEvent::new(
        Point::new(i32::from(event_x), i32::from(event_y)),
        Point::new(i32::from(root_x), i32::from(root_y)),
    )
}
