//! Recording capability used by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Computer, CursorPosition, ScreenSize, Screenshot, PNG_MIME};
use crate::action::{ButtonAt, ClickMouse, DragMouse, MoveMouse, PressKey, Scroll, TypeText};
use crate::error::ComputerError;

pub struct FakeComputer {
    pub calls: Mutex<Vec<String>>,
    pub cursor: CursorPosition,
    pub size: Result<ScreenSize, ComputerError>,
    pub screenshot: Result<Screenshot, ComputerError>,
}

impl Default for FakeComputer {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            cursor: CursorPosition { x: 12, y: 34 },
            size: Ok(ScreenSize {
                width: 1280,
                height: 720,
            }),
            screenshot: Ok(Screenshot {
                data: "iVBORw0KGgo=".into(),
                mime_type: PNG_MIME.into(),
            }),
        }
    }
}

impl FakeComputer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Computer for FakeComputer {
    async fn move_mouse(&self, r: &MoveMouse) -> Result<(), ComputerError> {
        self.record(format!("move_mouse({},{})", r.x, r.y));
        Ok(())
    }

    async fn click_mouse(&self, r: &ClickMouse) -> Result<(), ComputerError> {
        self.record(format!("click_mouse({},{},{})", r.x, r.y, r.button.as_str()));
        Ok(())
    }

    async fn press_mouse(&self, r: &ButtonAt) -> Result<(), ComputerError> {
        self.record(format!("press_mouse({},{},{})", r.x, r.y, r.button.as_str()));
        Ok(())
    }

    async fn release_mouse(&self, r: &ButtonAt) -> Result<(), ComputerError> {
        self.record(format!("release_mouse({},{},{})", r.x, r.y, r.button.as_str()));
        Ok(())
    }

    async fn drag_mouse(&self, r: &DragMouse) -> Result<(), ComputerError> {
        self.record(format!(
            "drag_mouse({},{}->{},{})",
            r.source.x, r.source.y, r.target.x, r.target.y
        ));
        Ok(())
    }

    async fn scroll(&self, r: &Scroll) -> Result<(), ComputerError> {
        self.record(format!("scroll({},{},{},{})", r.x, r.y, r.direction.as_str(), r.amount));
        Ok(())
    }

    async fn press_key(&self, r: &PressKey) -> Result<(), ComputerError> {
        self.record(format!("press_key({})", r.key));
        Ok(())
    }

    async fn type_text(&self, r: &TypeText) -> Result<(), ComputerError> {
        self.record(format!("type_text({})", r.text));
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<Screenshot, ComputerError> {
        self.record("take_screenshot".into());
        self.screenshot.clone()
    }

    async fn get_cursor_position(&self) -> Result<CursorPosition, ComputerError> {
        self.record("get_cursor_position".into());
        Ok(self.cursor)
    }

    async fn get_screen_size(&self) -> Result<ScreenSize, ComputerError> {
        self.record("get_screen_size".into());
        self.size.clone()
    }
}
