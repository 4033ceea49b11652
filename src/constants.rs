//! Application-wide constants
//!
//! Magic numbers and string literals used throughout the application,
//! kept in one place so the protocol and geometry rules stay in sync.

/// Singleton channel constants
pub mod singleton {
    use std::time::Duration;

    /// Command token a secondary launch writes to the primary
    pub const SHOW_TOKEN: &[u8] = b"SHOW";

    /// Upper bound for the startup connect/write probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

    /// Largest payload the primary reads from one connection
    pub const MAX_PAYLOAD: usize = 64;

    /// Directory (under the runtime dir) holding the socket
    pub const SOCKET_DIR: &str = "clipfloat";

    /// Socket file name
    pub const SOCKET_FILE: &str = "clipfloat.sock";
}

/// Geometry restoration constants
pub mod geometry {
    /// Pixels of a restored window guaranteed visible horizontally
    pub const MIN_VISIBLE_X: i32 = 100;

    /// Pixels of a restored window guaranteed visible vertically
    pub const MIN_VISIBLE_Y: i32 = 60;
}

/// Preferences file location and validation limits
pub mod config {
    pub const APP_DIR: &str = "clipfloat";
    pub const FILENAME: &str = "preferences.json";

    pub const MIN_EDGE_MARGIN: i32 = 1;
    pub const MAX_EDGE_MARGIN: i32 = 64;
    pub const MIN_DIMENSION: i32 = 50;
    pub const MAX_DIMENSION: i32 = 4096;
    pub const MAX_PERCENT: u8 = 100;
}

/// X11 protocol constants
pub mod x11 {
    /// WM_CLASS value (instance\0class\0)
    pub const WM_CLASS: &[u8] = b"clipfloat\0Clipfloat\0";

    /// Window title
    pub const WM_NAME: &[u8] = b"clipfloat";

    /// _MOTIF_WM_HINTS flag: the decorations field is valid
    pub const MOTIF_HINTS_DECORATIONS: u32 = 1 << 1;

    /// _NET_WM_STATE client message actions
    pub const NET_WM_STATE_REMOVE: u32 = 0;
    pub const NET_WM_STATE_ADD: u32 = 1;

    /// Source indication for _NET_ACTIVE_WINDOW and _NET_WM_STATE (2 = pager/direct user action)
    pub const SOURCE_INDICATION_PAGER: u32 = 2;
}

/// Glyph indices in the core X "cursor" font
pub mod cursor_glyph {
    pub const LEFT_PTR: u16 = 68;
    pub const SB_H_DOUBLE_ARROW: u16 = 108;
    pub const SB_V_DOUBLE_ARROW: u16 = 116;
    pub const TOP_LEFT_CORNER: u16 = 134;
    pub const TOP_RIGHT_CORNER: u16 = 136;
}

/// Mouse button constants
pub mod mouse {
    /// Left mouse button number
    pub const BUTTON_LEFT: u8 = 1;
}
