//! The borderless, optionally always-on-top X11 window

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use x11rb::connection::Connection;
use x11rb::properties::{WmSizeHints, WmSizeHintsSpecification};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::constants::{cursor_glyph, x11};
use crate::interaction::CursorShape;
use crate::types::{Rect, Size};
use crate::x11_utils::{activate_window, opacity_cardinal, send_wm_state, CachedAtoms};

/// Construction-time window options
#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub rect: Rect,
    pub min_size: Size,
    pub background_pixel: u32,
    pub always_on_top: bool,
    pub opacity_percent: u8,
}

/// Cursors created once from the core "cursor" font
#[derive(Debug)]
struct CursorSet {
    font: Font,
    default: Cursor,
    horizontal: Cursor,
    vertical: Cursor,
    diagonal_nw_se: Cursor,
    diagonal_ne_sw: Cursor,
}

impl CursorSet {
    fn new(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id().context("Failed to generate ID for cursor font")?;
        conn.open_font(font, b"cursor")
            .context("Failed to open core cursor font")?;

        let glyph = |glyph: u16| -> Result<Cursor> {
            let cursor = conn.generate_id().context("Failed to generate cursor ID")?;
            conn.create_glyph_cursor(
                cursor, font, font, glyph, glyph + 1, 0, 0, 0, 0xFFFF, 0xFFFF, 0xFFFF,
            )
            .context(format!("Failed to create glyph cursor {}", glyph))?;
            Ok(cursor)
        };

        Ok(Self {
            font,
            default: glyph(cursor_glyph::LEFT_PTR)?,
            horizontal: glyph(cursor_glyph::SB_H_DOUBLE_ARROW)?,
            vertical: glyph(cursor_glyph::SB_V_DOUBLE_ARROW)?,
            diagonal_nw_se: glyph(cursor_glyph::TOP_LEFT_CORNER)?,
            diagonal_ne_sw: glyph(cursor_glyph::TOP_RIGHT_CORNER)?,
        })
    }

    fn get(&self, shape: CursorShape) -> Cursor {
        match shape {
            CursorShape::Default => self.default,
            CursorShape::Horizontal => self.horizontal,
            CursorShape::Vertical => self.vertical,
            CursorShape::DiagonalNwSe => self.diagonal_nw_se,
            CursorShape::DiagonalNeSw => self.diagonal_ne_sw,
        }
    }

    fn all(&self) -> [Cursor; 5] {
        [
            self.default,
            self.horizontal,
            self.vertical,
            self.diagonal_nw_se,
            self.diagonal_ne_sw,
        ]
    }
}

#[derive(Debug)]
pub struct FloatingWindow<'a> {
    pub window: Window,
    rect: Rect,
    always_on_top: bool,
    cursors: CursorSet,

    conn: &'a RustConnection,
    screen: &'a Screen,
    atoms: &'a CachedAtoms,
}

impl<'a> FloatingWindow<'a> {
    pub fn new(
        conn: &'a RustConnection,
        screen: &'a Screen,
        atoms: &'a CachedAtoms,
        options: WindowOptions,
    ) -> Result<Self> {
        let rect = options.rect;
        if rect.width <= 0 || rect.height <= 0 {
            anyhow::bail!("Invalid window size {}x{} (must be positive)", rect.width, rect.height);
        }

        let window = conn.generate_id()
            .context("Failed to generate X11 window ID")?;
        conn.create_window(
            screen.root_depth,
            window,
            screen.root,
            rect.x as i16,
            rect.y as i16,
            rect.width as u16,
            rect.height as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            screen.root_visual,
            &CreateWindowAux::new()
                .background_pixel(options.background_pixel)
                .event_mask(
                    EventMask::BUTTON_PRESS
                        | EventMask::BUTTON_RELEASE
                        | EventMask::POINTER_MOTION
                        | EventMask::ENTER_WINDOW
                        | EventMask::LEAVE_WINDOW
                        | EventMask::STRUCTURE_NOTIFY
                        | EventMask::EXPOSURE,
                ),
        )
        .context("Failed to create window")?;

        let cursors = CursorSet::new(conn)?;
        let floating = Self {
            window,
            rect,
            always_on_top: options.always_on_top,
            cursors,
            conn,
            screen,
            atoms,
        };
        floating.setup_properties(options)?;

        conn.map_window(window)
            .context("Failed to map window")?;
        conn.flush()
            .context("Failed to flush X11 connection after creating window")?;
        info!(window = window, rect = ?rect, "Mapped window");
        Ok(floating)
    }

    /// Title, class, WM protocols, decorations, size hints, stacking and opacity
    fn setup_properties(&self, options: WindowOptions) -> Result<()> {
        let conn = self.conn;
        let window = self.window;

        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_NAME, AtomEnum::STRING, x11::WM_NAME)
            .context("Failed to set WM_NAME")?;
        conn.change_property8(PropMode::REPLACE, window, self.atoms.net_wm_name, self.atoms.utf8_string, x11::WM_NAME)
            .context("Failed to set _NET_WM_NAME")?;
        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_CLASS, AtomEnum::STRING, x11::WM_CLASS)
            .context("Failed to set WM_CLASS")?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_protocols,
            AtomEnum::ATOM,
            &[self.atoms.wm_delete_window],
        )
        .context("Failed to set WM_PROTOCOLS")?;

        // flags, functions, decorations, input_mode, status
        conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.motif_wm_hints,
            self.atoms.motif_wm_hints,
            &[x11::MOTIF_HINTS_DECORATIONS, 0, 0, 0, 0],
        )
        .context("Failed to remove window decorations")?;

        let mut hints = WmSizeHints::new();
        hints.position = Some((WmSizeHintsSpecification::UserSpecified, self.rect.x, self.rect.y));
        hints.size = Some((WmSizeHintsSpecification::UserSpecified, self.rect.width, self.rect.height));
        hints.min_size = Some((options.min_size.width, options.min_size.height));
        hints.set_normal_hints(conn, window)
            .context("Failed to set WM_NORMAL_HINTS")?;

        // Before mapping, _NET_WM_STATE is set directly; afterwards it must go through the WM
        if options.always_on_top {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.net_wm_state,
                AtomEnum::ATOM,
                &[self.atoms.net_wm_state_above],
            )
            .context("Failed to set window always-on-top")?;
        }

        self.set_opacity(options.opacity_percent)?;
        Ok(())
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn always_on_top(&self) -> bool {
        self.always_on_top
    }

    pub fn set_geometry(&mut self, rect: Rect) -> Result<()> {
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1) as u32)
                .height(rect.height.max(1) as u32),
        )
        .context(format!("Failed to configure window to {:?}", rect))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after configure")?;
        self.rect = rect;
        Ok(())
    }

    /// Re-read the real geometry (after the WM moved or resized us)
    pub fn sync_geometry(&mut self) -> Result<Rect> {
        let geom = self.conn.get_geometry(self.window)
            .context("Failed to send geometry query")?
            .reply()
            .context("Failed to get window geometry")?;
        let origin = self.conn
            .translate_coordinates(self.window, self.screen.root, 0, 0)
            .context("Failed to send coordinate translation")?
            .reply()
            .context("Failed to translate window origin to root")?;
        self.rect = Rect::new(
            i32::from(origin.dst_x),
            i32::from(origin.dst_y),
            i32::from(geom.width),
            i32::from(geom.height),
        );
        debug!(rect = ?self.rect, "Synced window geometry");
        Ok(self.rect)
    }

    pub fn set_cursor(&self, shape: CursorShape) -> Result<()> {
        self.conn.change_window_attributes(
            self.window,
            &ChangeWindowAttributesAux::new().cursor(self.cursors.get(shape)),
        )
        .context(format!("Failed to set cursor {:?}", shape))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after cursor change")?;
        Ok(())
    }

    pub fn set_opacity(&self, percent: u8) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[opacity_cardinal(percent)],
        )
        .context(format!("Failed to set window opacity to {}%", percent))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after opacity change")?;
        Ok(())
    }

    /// Toggle `_NET_WM_STATE_ABOVE` on the mapped window
    pub fn set_always_on_top(&mut self, enabled: bool) -> Result<()> {
        send_wm_state(
            self.conn,
            self.screen,
            self.atoms,
            self.window,
            self.atoms.net_wm_state_above,
            enabled,
        )?;
        self.conn.flush()
            .context("Failed to flush X11 connection after stacking change")?;
        self.always_on_top = enabled;
        info!(enabled = enabled, "Always-on-top changed");
        Ok(())
    }

    /// Map, raise and focus
    pub fn raise_and_focus(&self) -> Result<()> {
        self.conn.map_window(self.window)
            .context("Failed to map window")?;
        activate_window(self.conn, self.screen, self.atoms, self.window)
    }
}

impl Drop for FloatingWindow<'_> {
    fn drop(&mut self) {
        // Clean up each resource independently to prevent cascade failures
        for cursor in self.cursors.all() {
            if let Err(e) = self.conn.free_cursor(cursor) {
                error!("Failed to free cursor {}: {}", cursor, e);
            }
        }

        if let Err(e) = self.conn.close_font(self.cursors.font) {
            error!("Failed to close cursor font {}: {}", self.cursors.font, e);
        }

        if let Err(e) = self.conn.destroy_window(self.window) {
            error!("Failed to destroy window {}: {}", self.window, e);
        }

        if let Err(e) = self.conn.flush() {
            error!("Failed to flush X11 connection during cleanup: {}", e);
        }
    }
}
