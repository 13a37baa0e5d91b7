//! Capability interface implemented by the local device driver and the
//! remote proxy.

pub mod clipboard;
pub mod keyboard;
pub mod remote;
pub mod x11;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::{ButtonAt, ClickMouse, DragMouse, MoveMouse, PressKey, Scroll, TypeText, Wait};
use crate::context::RequestContext;
use crate::error::ComputerError;

pub use remote::{RemoteBackend, RemoteComputer};
pub use x11::X11Computer;

pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Encoded screen capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    /// Base64 image bytes.
    pub data: String,
    pub mime_type: String,
}

/// Successful outcome of a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutput {
    /// Side effect performed, nothing to report.
    Done,
    Cursor(CursorPosition),
    ScreenSize(ScreenSize),
    /// Capture paired with the screen size fetched for it.
    Screenshot { image: Screenshot, size: ScreenSize },
}

/// One method per action. Implementations serialize device access
/// themselves; callers may invoke concurrently.
#[async_trait]
pub trait Computer: Send + Sync {
    async fn move_mouse(&self, request: &MoveMouse) -> Result<(), ComputerError>;

    async fn click_mouse(&self, request: &ClickMouse) -> Result<(), ComputerError>;

    async fn press_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError>;

    async fn release_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError>;

    async fn drag_mouse(&self, request: &DragMouse) -> Result<(), ComputerError>;

    async fn scroll(&self, request: &Scroll) -> Result<(), ComputerError>;

    async fn press_key(&self, request: &PressKey) -> Result<(), ComputerError>;

    async fn type_text(&self, request: &TypeText) -> Result<(), ComputerError>;

    async fn wait(&self, request: &Wait) -> Result<(), ComputerError> {
        let duration = request.duration().ok_or_else(|| {
            ComputerError::Device(format!("duration must not be negative, got {}", request.duration_ms))
        })?;
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<Screenshot, ComputerError>;

    async fn get_cursor_position(&self) -> Result<CursorPosition, ComputerError>;

    async fn get_screen_size(&self) -> Result<ScreenSize, ComputerError>;
}

#[async_trait]
impl<C: Computer + ?Sized> Computer for Arc<C> {
    async fn move_mouse(&self, request: &MoveMouse) -> Result<(), ComputerError> {
        (**self).move_mouse(request).await
    }

    async fn click_mouse(&self, request: &ClickMouse) -> Result<(), ComputerError> {
        (**self).click_mouse(request).await
    }

    async fn press_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError> {
        (**self).press_mouse(request).await
    }

    async fn release_mouse(&self, request: &ButtonAt) -> Result<(), ComputerError> {
        (**self).release_mouse(request).await
    }

    async fn drag_mouse(&self, request: &DragMouse) -> Result<(), ComputerError> {
        (**self).drag_mouse(request).await
    }

    async fn scroll(&self, request: &Scroll) -> Result<(), ComputerError> {
        (**self).scroll(request).await
    }

    async fn press_key(&self, request: &PressKey) -> Result<(), ComputerError> {
        (**self).press_key(request).await
    }

    async fn type_text(&self, request: &TypeText) -> Result<(), ComputerError> {
        (**self).type_text(request).await
    }

    async fn wait(&self, request: &Wait) -> Result<(), ComputerError> {
        (**self).wait(request).await
    }

    async fn take_screenshot(&self) -> Result<Screenshot, ComputerError> {
        (**self).take_screenshot().await
    }

    async fn get_cursor_position(&self) -> Result<CursorPosition, ComputerError> {
        (**self).get_cursor_position().await
    }

    async fn get_screen_size(&self) -> Result<ScreenSize, ComputerError> {
        (**self).get_screen_size().await
    }
}

/// Resolves the capability to use for one call.
pub trait Backend: Send + Sync + 'static {
    type Computer: Computer;

    /// `endpoint` is a per-call override; backends without one ignore it.
    fn bind(&self, ctx: &RequestContext, endpoint: Option<&str>) -> Result<Self::Computer, ComputerError>;

    /// Whether calls leave this process.
    fn is_remote(&self) -> bool {
        false
    }
}

/// Backend driving devices in this process.
pub struct LocalBackend<C: ?Sized> {
    computer: Arc<C>,
}

impl<C: Computer + ?Sized + 'static> LocalBackend<C> {
    pub fn new(computer: Arc<C>) -> Self {
        Self { computer }
    }
}

impl<C: Computer + ?Sized + 'static> Backend for LocalBackend<C> {
    type Computer = Arc<C>;

    fn bind(&self, _ctx: &RequestContext, _endpoint: Option<&str>) -> Result<Arc<C>, ComputerError> {
        Ok(self.computer.clone())
    }
}
