use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;
use crate::types::Rect;

/// Pre-cached X11 atoms to avoid repeated roundtrips
#[derive(Debug)]
pub struct CachedAtoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_active_window: Atom,
    pub net_workarea: Atom,
    pub motif_wm_hints: Atom,
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom> {
    let label = String::from_utf8_lossy(name);
    Ok(conn
        .intern_atom(false, name)
        .context(format!("Failed to intern {} atom", label))?
        .reply()
        .context(format!("Failed to get reply for {} atom", label))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            wm_protocols: intern(conn, b"WM_PROTOCOLS")?,
            wm_delete_window: intern(conn, b"WM_DELETE_WINDOW")?,
            net_wm_name: intern(conn, b"_NET_WM_NAME")?,
            utf8_string: intern(conn, b"UTF8_STRING")?,
            net_wm_state: intern(conn, b"_NET_WM_STATE")?,
            net_wm_state_above: intern(conn, b"_NET_WM_STATE_ABOVE")?,
            net_wm_window_opacity: intern(conn, b"_NET_WM_WINDOW_OPACITY")?,
            net_active_window: intern(conn, b"_NET_ACTIVE_WINDOW")?,
            net_workarea: intern(conn, b"_NET_WORKAREA")?,
            motif_wm_hints: intern(conn, b"_MOTIF_WM_HINTS")?,
        })
    }
}

/// Available screen area from `_NET_WORKAREA` (first desktop), falling
/// back to the full root window when the WM doesn't publish it
pub fn work_area(conn: &RustConnection, screen: &Screen, atoms: &CachedAtoms) -> Result<Rect> {
    let full = Rect::new(
        0,
        0,
        i32::from(screen.width_in_pixels),
        i32::from(screen.height_in_pixels),
    );

    let prop = conn
        .get_property(false, screen.root, atoms.net_workarea, AtomEnum::CARDINAL, 0, 4)
        .context("Failed to query _NET_WORKAREA property")?
        .reply()
        .context("Failed to get reply for _NET_WORKAREA query")?;

    let values: Vec<u32> = prop.value32().map(|v| v.collect()).unwrap_or_default();
    match values.as_slice() {
        [x, y, w, h, ..] if *w > 0 && *h > 0 => {
            let area = Rect::new(*x as i32, *y as i32, *w as i32, *h as i32);
            debug!(?area, "Using _NET_WORKAREA");
            Ok(area)
        }
        _ => {
            debug!(?full, "_NET_WORKAREA unavailable, using full screen");
            Ok(full)
        }
    }
}

/// Convert an opacity percentage to the `_NET_WM_WINDOW_OPACITY` CARDINAL
pub fn opacity_cardinal(percent: u8) -> u32 {
    let percent = u64::from(percent.min(100));
    (u64::from(u32::MAX) * percent / 100) as u32
}

/// Send a `_NET_WM_STATE` add/remove request for `state` to the WM
pub fn send_wm_state(
    conn: &RustConnection,
    screen: &Screen,
    atoms: &CachedAtoms,
    window: Window,
    state: Atom,
    enable: bool,
) -> Result<()> {
    let action = if enable {
        x11::NET_WM_STATE_ADD
    } else {
        x11::NET_WM_STATE_REMOVE
    };
    let event = ClientMessageEvent::new(
        32,
        window,
        atoms.net_wm_state,
        [action, state, 0, x11::SOURCE_INDICATION_PAGER, 0],
    );
    conn.send_event(
        false,
        screen.root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        event,
    )
    .context(format!("Failed to send _NET_WM_STATE event for window {}", window))?;
    Ok(())
}

/// Activate (focus) an X11 window using _NET_ACTIVE_WINDOW
pub fn activate_window(
    conn: &RustConnection,
    screen: &Screen,
    atoms: &CachedAtoms,
    window: Window,
) -> Result<()> {
    // First, raise the window to top of stack
    conn.configure_window(
        window,
        &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
    )
    .context(format!("Failed to raise window {} to top of stack", window))?;

    let event = ClientMessageEvent::new(
        32,
        window,
        atoms.net_active_window,
        [
            x11::SOURCE_INDICATION_PAGER,
            x11rb::CURRENT_TIME,
            0, // Requestor's currently active window (0 = none)
            0,
            0,
        ],
    );

    conn.send_event(
        false,
        screen.root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        event,
    )
    .context(format!("Failed to send _NET_ACTIVE_WINDOW event for window {}", window))?;

    conn.flush()
        .context("Failed to flush X11 connection after window activation")?;
    Ok(())
}
