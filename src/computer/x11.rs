//! Local device driver: XTest input injection and root window capture.

use std::collections::HashMap;
use std::ffi::CString;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use log::{debug, info, warn};
use parking_lot::Mutex;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::xproto::{ConnectionExt as _, ImageFormat, Window};
use x11rb::protocol::xtest;
use x11rb::xcb_ffi::XCBConnection;

use super::{clipboard, keyboard, Computer, CursorPosition, ScreenSize, Screenshot, PNG_MIME};
use crate::action::{
    ButtonAt, ClickMouse, DragMouse, MouseButton, MoveMouse, PressKey, Scroll, ScrollDirection,
    TypeText,
};
use crate::config::InputConfig;
use crate::drag::{generate_path, PathPoint};
use crate::error::ComputerError;

/// XTest input constants
const INPUT_KEY_PRESS: u8 = 2;
const INPUT_KEY_RELEASE: u8 = 3;
const INPUT_BUTTON_PRESS: u8 = 4;
const INPUT_BUTTON_RELEASE: u8 = 5;

const CLICK_HOLD: Duration = Duration::from_millis(50);
const KEY_GAP: Duration = Duration::from_millis(10);
const TYPE_GAP: Duration = Duration::from_millis(30);

/// Upper bound on wheel clicks sent for one scroll request.
const MAX_SCROLL_CLICKS: u32 = 500;

impl From<ConnectionError> for ComputerError {
    fn from(err: ConnectionError) -> Self {
        ComputerError::Device(format!("X11 connection error: {err}"))
    }
}

impl From<ReplyError> for ComputerError {
    fn from(err: ReplyError) -> Self {
        ComputerError::Device(format!("X11 request failed: {err}"))
    }
}

fn button_code(button: MouseButton) -> u8 {
    match button {
        MouseButton::Left => 1,
        MouseButton::Middle => 2,
        MouseButton::Right => 3,
    }
}

fn wheel_code(direction: ScrollDirection) -> u8 {
    match direction {
        ScrollDirection::Up => 4,
        ScrollDirection::Down => 5,
        ScrollDirection::Left => 6,
        ScrollDirection::Right => 7,
    }
}

fn opposite(direction: ScrollDirection) -> ScrollDirection {
    match direction {
        ScrollDirection::Up => ScrollDirection::Down,
        ScrollDirection::Down => ScrollDirection::Up,
        ScrollDirection::Left => ScrollDirection::Right,
        ScrollDirection::Right => ScrollDirection::Left,
    }
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Pull a drag endpoint onto the root window so the path never outgrows
/// the display.
fn clamp_to_screen(point: PathPoint, size: ScreenSize) -> PathPoint {
    let max_x = i32::try_from(size.width.saturating_sub(1)).unwrap_or(i32::MAX);
    let max_y = i32::try_from(size.height.saturating_sub(1)).unwrap_or(i32::MAX);
    PathPoint::new(point.x.clamp(0, max_x), point.y.clamp(0, max_y))
}

fn wheel_clicks(amount: i32, scale: u32) -> u32 {
    amount.unsigned_abs().saturating_mul(scale).min(MAX_SCROLL_CLICKS)
}

/// Raw X11 access. Every method is one short round trip.
struct Injector {
    conn: XCBConnection,
    root: Window,
    pointer: (i32, i32),
    /// Keysym to keycode cache
    keysym_cache: HashMap<u32, u8>,
}

impl Injector {
    fn connect(display: Option<&str>) -> Result<Self, ComputerError> {
        let name = display
            .map(CString::new)
            .transpose()
            .map_err(|_| ComputerError::device("display name contains a NUL byte"))?;
        let (conn, screen_num) = XCBConnection::connect(name.as_deref())
            .map_err(|e| ComputerError::Device(format!("cannot open display: {e}")))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| ComputerError::device("display has no such screen"))?;

        xtest::get_version(&conn, 2, 2)?.reply()?;

        let mut keysym_cache = HashMap::new();
        let min_keycode = conn.setup().min_keycode;
        let max_keycode = conn.setup().max_keycode;
        let mapping = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;
        let per_keycode = usize::from(mapping.keysyms_per_keycode).max(1);
        for (i, syms) in mapping.keysyms.chunks(per_keycode).enumerate() {
            let keycode = usize::from(min_keycode) + i;
            let Ok(keycode) = u8::try_from(keycode) else { break };
            // Unshifted and shifted levels both map to the same physical key.
            for &sym in syms.iter().take(2) {
                if sym != 0 {
                    keysym_cache.entry(sym).or_insert(keycode);
                }
            }
        }
        debug!("cached {} keysyms", keysym_cache.len());

        let mut injector = Self {
            conn,
            root,
            pointer: (0, 0),
            keysym_cache,
        };
        let cursor = injector.cursor()?;
        injector.pointer = (cursor.x, cursor.y);
        Ok(injector)
    }

    fn warp(&mut self, x: i32, y: i32) -> Result<(), ComputerError> {
        self.pointer = (x, y);
        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, clamp_i16(x), clamp_i16(y))?;
        self.conn.flush()?;
        Ok(())
    }

    fn button(&mut self, button: u8, pressed: bool) -> Result<(), ComputerError> {
        let input_type = if pressed { INPUT_BUTTON_PRESS } else { INPUT_BUTTON_RELEASE };
        xtest::fake_input(
            &self.conn,
            input_type,
            button,
            x11rb::CURRENT_TIME,
            self.root,
            clamp_i16(self.pointer.0),
            clamp_i16(self.pointer.1),
            0,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn key(&mut self, keysym: u32, pressed: bool) -> Result<(), ComputerError> {
        let keycode = self
            .keysym_cache
            .get(&keysym)
            .copied()
            .ok_or_else(|| ComputerError::Device(format!("no keycode for keysym 0x{keysym:x}")))?;
        let input_type = if pressed { INPUT_KEY_PRESS } else { INPUT_KEY_RELEASE };
        xtest::fake_input(&self.conn, input_type, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)?;
        self.conn.flush()?;
        Ok(())
    }

    fn has_keysym(&self, keysym: u32) -> bool {
        self.keysym_cache.contains_key(&keysym)
    }

    fn cursor(&self) -> Result<CursorPosition, ComputerError> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok(CursorPosition {
            x: i32::from(reply.root_x),
            y: i32::from(reply.root_y),
        })
    }

    fn screen_size(&self) -> Result<ScreenSize, ComputerError> {
        let geometry = self.conn.get_geometry(self.root)?.reply()?;
        Ok(ScreenSize {
            width: u32::from(geometry.width),
            height: u32::from(geometry.height),
        })
    }

    /// Root window pixels as 32bpp BGRX.
    fn grab(&self) -> Result<(u32, u32, Vec<u8>), ComputerError> {
        let geometry = self.conn.get_geometry(self.root)?.reply()?;
        let reply = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                self.root,
                0,
                0,
                geometry.width,
                geometry.height,
                !0,
            )?
            .reply()?;
        let (width, height) = (u32::from(geometry.width), u32::from(geometry.height));
        let expected = width as usize * height as usize * 4;
        if reply.data.len() != expected {
            return Err(ComputerError::Device(format!(
                "unsupported pixel format: depth {} with {} bytes for {}x{}",
                reply.depth,
                reply.data.len(),
                width,
                height
            )));
        }
        Ok((width, height, reply.data))
    }
}

/// BGRX pixels to a base64 PNG.
pub fn bgrx_to_png_base64(width: u32, height: u32, bgrx: &[u8]) -> Result<String, ComputerError> {
    let mut rgb: Vec<u8> = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in bgrx.chunks_exact(4) {
        rgb.push(pixel[2]); // R  (memory order: [B, G, R, X])
        rgb.push(pixel[1]); // G
        rgb.push(pixel[0]); // B
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&rgb, width, height, ColorType::Rgb8)
        .map_err(|e| ComputerError::Device(format!("PNG encode failed: {e}")))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&png))
}

/// Drives the X display named by `input.display`.
pub struct X11Computer {
    injector: Mutex<Injector>,
    /// Held for the whole of a multi-event gesture so gestures never interleave.
    gesture: tokio::sync::Mutex<()>,
    drag_step: NonZeroU32,
    mouse_interval: Duration,
    scroll_scale: u32,
}

impl X11Computer {
    pub fn connect(config: &InputConfig) -> Result<Self, ComputerError> {
        let injector = Injector::connect(config.display.as_deref())?;
        info!(
            "Connected to X display {} (clipboard paste {})",
            config.display.as_deref().unwrap_or("$DISPLAY"),
            if clipboard::available() { "available" } else { "unavailable" }
        );
        Ok(Self {
            injector: Mutex::new(injector),
            gesture: tokio::sync::Mutex::new(()),
            drag_step: NonZeroU32::new(config.drag_step).unwrap_or(NonZeroU32::MIN),
            mouse_interval: Duration::from_millis(config.mouse_operate_interval_ms),
            scroll_scale: config.scroll_scale.max(1),
        })
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), ComputerError> {
        self.injector.lock().warp(x, y)
    }

    fn button(&self, button: u8, pressed: bool) -> Result<(), ComputerError> {
        self.injector.lock().button(button, pressed)
    }

    fn key(&self, keysym: u32, pressed: bool) -> Result<(), ComputerError> {
        self.injector.lock().key(keysym, pressed)
    }

    async fn tap_button(&self, button: u8) -> Result<(), ComputerError> {
        self.button(button, true)?;
        tokio::time::sleep(CLICK_HOLD).await;
        self.button(button, false)
    }

    async fn chord(&self, keysyms: &[u32]) -> Result<(), ComputerError> {
        let mut pressed = Vec::with_capacity(keysyms.len());
        let mut result = Ok(());
        for &sym in keysyms {
            if let Err(err) = self.key(sym, true) {
                result = Err(err);
                break;
            }
            pressed.push(sym);
            tokio::time::sleep(KEY_GAP).await;
        }
        // Release whatever went down, even after a failure.
        for &sym in pressed.iter().rev() {
            if let Err(err) = self.key(sym, false) {
                warn!("key release 0x{:x} failed: {}", sym, err);
            }
            tokio::time::sleep(KEY_GAP).await;
        }
        result
    }

    async fn type_char(&self, c: char) -> Result<(), ComputerError> {
        let needs_shift = keyboard::char_needs_shift(c);
        let base = if needs_shift { keyboard::get_unshifted_char(c) } else { c };
        let sym = keyboard::char_to_keysym(base);
        if needs_shift {
            self.chord(&[keyboard::SHIFT_L, sym]).await?;
        } else {
            self.chord(&[sym]).await?;
        }
        tokio::time::sleep(TYPE_GAP).await;
        Ok(())
    }
}

#[async_trait]
impl Computer for X11Computer {
    async fn move_mouse(&self, request: &MoveMouse) -> Result<(), ComputerError> {
        let _gesture = self.gesture.lock().await;
        self.move_to(request.x, request.y)
    }

    async fn click_mouse(&self, request: &ClickMouse) -> Result<(), ComputerError> {
        let _gesture = self.gesture.lock().await;
        self.move_to(request.x, request.y)?;
        let button = button_code(request.button.button());
        for i in 0..request.button.clicks() {
            if i > 0 {
                tokio::time::sleep(CLICK_HOLD).await;
            }
            self.tap_button(button).await?;
        }
        Ok(())
    }

    async fn press_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError> {
        let _gesture = self.gesture.lock().await;
        self.move_to(request.x, request.y)?;
        self.button(button_code(request.button), true)
    }

    async fn release_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError> {
        let _gesture = self.gesture.lock().await;
        self.move_to(request.x, request.y)?;
        self.button(button_code(request.button), false)
    }

    async fn drag_mouse(&self, request: &DragMouse) -> Result<(), ComputerError> {
        let size = self.injector.lock().screen_size()?;
        let path = generate_path(
            clamp_to_screen(request.source, size),
            clamp_to_screen(request.target, size),
            self.drag_step,
        );
        debug!("drag through {} points", path.len());

        let _gesture = self.gesture.lock().await;
        let start = path.first();
        self.move_to(start.x, start.y)?;
        self.button(button_code(MouseButton::Left), true)?;

        let mut result = Ok(());
        for point in path.iter().skip(1) {
            tokio::time::sleep(self.mouse_interval).await;
            if let Err(err) = self.move_to(point.x, point.y) {
                result = Err(err);
                break;
            }
        }
        tokio::time::sleep(self.mouse_interval).await;
        self.button(button_code(MouseButton::Left), false)?;
        result
    }

    async fn scroll(&self, request: &Scroll) -> Result<(), ComputerError> {
        let direction = if request.amount < 0 {
            opposite(request.direction)
        } else {
            request.direction
        };
        let clicks = wheel_clicks(request.amount, self.scroll_scale);
        if clicks == MAX_SCROLL_CLICKS {
            debug!("scroll of {} capped at {} clicks", request.amount, clicks);
        }

        let _gesture = self.gesture.lock().await;
        self.move_to(request.x, request.y)?;
        let wheel = wheel_code(direction);
        for _ in 0..clicks {
            self.button(wheel, true)?;
            self.button(wheel, false)?;
            tokio::time::sleep(KEY_GAP).await;
        }
        Ok(())
    }

    async fn press_key(&self, request: &PressKey) -> Result<(), ComputerError> {
        let keysyms = keyboard::parse_key_combination(&request.key).map_err(ComputerError::Device)?;
        let _gesture = self.gesture.lock().await;
        self.chord(&keysyms).await
    }

    async fn type_text(&self, request: &TypeText) -> Result<(), ComputerError> {
        let _gesture = self.gesture.lock().await;
        let text = request.text.clone();
        let pasted = tokio::task::spawn_blocking(move || clipboard::write_text(&text))
            .await
            .unwrap_or(false);
        if pasted {
            return self.chord(&[keyboard::CONTROL_L, u32::from('v')]).await;
        }

        debug!("clipboard unavailable, typing {} chars", request.text.chars().count());
        {
            let injector = self.injector.lock();
            if let Some(c) = request.text.chars().find(|&c| {
                let base = keyboard::get_unshifted_char(c);
                !injector.has_keysym(keyboard::char_to_keysym(base))
            }) {
                return Err(ComputerError::Device(format!("cannot type character {c:?}")));
            }
        }
        for c in request.text.chars() {
            self.type_char(c).await?;
        }
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<Screenshot, ComputerError> {
        let (width, height, pixels) = self.injector.lock().grab()?;
        let data = tokio::task::spawn_blocking(move || bgrx_to_png_base64(width, height, &pixels))
            .await
            .map_err(|e| ComputerError::Device(format!("encode task failed: {e}")))??;
        Ok(Screenshot {
            data,
            mime_type: PNG_MIME.to_string(),
        })
    }

    async fn get_cursor_position(&self) -> Result<CursorPosition, ComputerError> {
        self.injector.lock().cursor()
    }

    async fn get_screen_size(&self) -> Result<ScreenSize, ComputerError> {
        self.injector.lock().screen_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_and_wheel_codes() {
        assert_eq!(button_code(MouseButton::Left), 1);
        assert_eq!(button_code(MouseButton::Middle), 2);
        assert_eq!(button_code(MouseButton::Right), 3);
        assert_eq!(wheel_code(ScrollDirection::Up), 4);
        assert_eq!(wheel_code(opposite(ScrollDirection::Up)), 5);
        assert_eq!(wheel_code(ScrollDirection::Right), 7);
    }

    #[test]
    fn coordinates_clamp_to_protocol_range() {
        assert_eq!(clamp_i16(100_000), i16::MAX);
        assert_eq!(clamp_i16(-100_000), i16::MIN);
        assert_eq!(clamp_i16(640), 640);
    }

    #[test]
    fn off_screen_drag_is_bounded_by_the_display() {
        let size = ScreenSize { width: 1920, height: 1080 };
        let step = NonZeroU32::new(30).unwrap();
        let path = generate_path(
            clamp_to_screen(PathPoint::new(0, 0), size),
            clamp_to_screen(PathPoint::new(2_000_000_000, -5), size),
            step,
        );
        assert_eq!(path.last(), PathPoint::new(1919, 0));
        assert!(path.len() <= 1920 / 30 + 2);
        assert!(path.iter().all(|p| (0..1920).contains(&p.x) && (0..1080).contains(&p.y)));

        let empty = ScreenSize { width: 0, height: 0 };
        assert_eq!(clamp_to_screen(PathPoint::new(7, -7), empty), PathPoint::new(0, 0));
    }

    #[test]
    fn scroll_clicks_are_capped() {
        assert_eq!(wheel_clicks(3, 2), 6);
        assert_eq!(wheel_clicks(-3, 1), 3);
        assert_eq!(wheel_clicks(0, 4), 0);
        assert_eq!(wheel_clicks(i32::MAX, 10), MAX_SCROLL_CLICKS);
        assert_eq!(wheel_clicks(i32::MIN, 1), MAX_SCROLL_CLICKS);
    }

    #[test]
    fn png_encoding_swaps_channels() {
        // One blue pixel and one red pixel in BGRX order.
        let bgrx = [255, 0, 0, 0, 0, 0, 255, 0];
        let b64 = bgrx_to_png_base64(2, 1, &bgrx).unwrap();
        let png = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0]);
    }
}
