//! Transport-agnostic action dispatch.
//!
//! `dispatch` canonicalizes the action name, looks up its schema, validates
//! the parameters, builds the typed action and invokes the capability. Every
//! failure comes back as a [`DispatchError`]; nothing is raised past here.

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::action::naming::to_canonical;
use crate::action::validate::validate;
use crate::action::{Action, Registry};
use crate::computer::{ActionOutput, Computer};
use crate::context::RequestContext;
use crate::error::{ComputerError, DispatchError};

pub type DispatchResult = Result<ActionOutput, DispatchError>;

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    registry: &'static Registry,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Registry::global())
    }
}

impl Dispatcher {
    pub fn new(registry: &'static Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    pub async fn dispatch<C: Computer + ?Sized>(
        &self,
        computer: &C,
        ctx: &RequestContext,
        action: &str,
        params: &Map<String, Value>,
    ) -> DispatchResult {
        let canonical = to_canonical(action.trim());
        debug!(
            "dispatch {} (request {}, credential {})",
            canonical,
            ctx.request_id(),
            ctx.credential().map_or_else(|| "none".to_string(), |c| c.redacted())
        );

        let result = self.run(computer, &canonical, params).await;
        match &result {
            Ok(_) => info!("{} succeeded", canonical),
            Err(err) => warn!("{} failed ({}): {}", canonical, err.kind(), err),
        }
        result
    }

    async fn run<C: Computer + ?Sized>(
        &self,
        computer: &C,
        canonical: &str,
        params: &Map<String, Value>,
    ) -> DispatchResult {
        let descriptor = self.registry.lookup(canonical)?;
        let request = validate(descriptor, params)?;
        let action = Action::from_request(&request)?;
        if action.name() != canonical {
            debug!("{} handled as {}", canonical, action.name());
        }
        invoke(computer, &action)
            .await
            .map_err(|e| e.into_dispatch(canonical))
    }
}

async fn invoke<C: Computer + ?Sized>(computer: &C, action: &Action) -> Result<ActionOutput, ComputerError> {
    let done = |_: ()| ActionOutput::Done;
    match action {
        Action::MoveMouse(r) => computer.move_mouse(r).await.map(done),
        Action::ClickMouse(r) => computer.click_mouse(r).await.map(done),
        Action::PressMouse(r) => computer.press_mouse(r).await.map(done),
        Action::ReleaseMouse(r) => computer.release_mouse(r).await.map(done),
        Action::DragMouse(r) => computer.drag_mouse(r).await.map(done),
        Action::Scroll(r) => computer.scroll(r).await.map(done),
        Action::PressKey(r) => computer.press_key(r).await.map(done),
        Action::TypeText(r) => computer.type_text(r).await.map(done),
        Action::Wait(r) => computer.wait(r).await.map(done),
        Action::TakeScreenshot => {
            // The size is fetched first; a capture is never reported without it.
            let size = computer.get_screen_size().await?;
            if size.width == 0 || size.height == 0 {
                return Err(ComputerError::Device(format!(
                    "invalid screen size {}x{}",
                    size.width, size.height
                )));
            }
            let image = computer.take_screenshot().await?;
            if image.data.is_empty() {
                return Err(ComputerError::Empty("screenshot returned no image data".into()));
            }
            Ok(ActionOutput::Screenshot { image, size })
        }
        Action::GetCursorPosition => computer.get_cursor_position().await.map(ActionOutput::Cursor),
        Action::GetScreenSize => computer.get_screen_size().await.map(ActionOutput::ScreenSize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::fake::FakeComputer;
    use crate::computer::{CursorPosition, ScreenSize, Screenshot};
    use crate::error::FailureKind;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn run(computer: &FakeComputer, action: &str, value: Value) -> DispatchResult {
        let ctx = RequestContext::begin(Some("test"));
        Dispatcher::default()
            .dispatch(computer, &ctx, action, &params(value))
            .await
    }

    #[tokio::test]
    async fn wire_and_canonical_names_dispatch_identically() {
        let computer = FakeComputer::default();
        assert_eq!(run(&computer, "MoveMouse", json!({"PositionX": 1, "PositionY": 2})).await, Ok(ActionOutput::Done));
        assert_eq!(run(&computer, "move_mouse", json!({"x": 1, "y": 2})).await, Ok(ActionOutput::Done));
        assert_eq!(computer.calls(), vec!["move_mouse(1,2)", "move_mouse(1,2)"]);
    }

    #[tokio::test]
    async fn unknown_action_is_not_found() {
        let computer = FakeComputer::default();
        let err = run(&computer, "Teleport", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ActionNotFound);
        assert_eq!(err.to_string(), "Action 'teleport' not found");
        assert!(computer.calls().is_empty());
    }

    #[tokio::test]
    async fn validation_failure_skips_the_device() {
        let computer = FakeComputer::default();
        let err = run(&computer, "drag_mouse", json!({"source_x": 1})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidRequest);
        assert_eq!(err.details().len(), 3);
        assert!(computer.calls().is_empty());
    }

    #[tokio::test]
    async fn press_only_click_reaches_press_mouse() {
        let computer = FakeComputer::default();
        run(&computer, "ClickMouse", json!({"PositionX": 5, "PositionY": 6, "Button": "right", "Press": true}))
            .await
            .unwrap();
        run(&computer, "click_mouse", json!({"button": "double_left"})).await.unwrap();
        assert_eq!(
            computer.calls(),
            vec!["press_mouse(5,6,right)", "click_mouse(0,0,double_click)"]
        );
    }

    #[tokio::test]
    async fn screenshot_pairs_image_with_size() {
        let computer = FakeComputer::default();
        match run(&computer, "TakeScreenshot", json!({})).await.unwrap() {
            ActionOutput::Screenshot { image, size } => {
                assert_eq!(size, ScreenSize { width: 1280, height: 720 });
                assert_eq!(image.mime_type, "image/png");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(computer.calls(), vec!["get_screen_size", "take_screenshot"]);
    }

    #[tokio::test]
    async fn screenshot_fails_when_size_lookup_fails() {
        let computer = FakeComputer {
            size: Err(ComputerError::device("no display")),
            ..Default::default()
        };
        let err = run(&computer, "take_screenshot", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::HandlerError);
        assert_eq!(computer.calls(), vec!["get_screen_size"]);

        let computer = FakeComputer {
            size: Ok(ScreenSize { width: 0, height: 720 }),
            ..Default::default()
        };
        let err = run(&computer, "take_screenshot", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::HandlerError);
    }

    #[tokio::test]
    async fn empty_screenshot_is_empty_response() {
        let computer = FakeComputer {
            screenshot: Ok(Screenshot {
                data: String::new(),
                mime_type: "image/png".into(),
            }),
            ..Default::default()
        };
        let err = run(&computer, "take_screenshot", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::EmptyResponse);
    }

    #[tokio::test]
    async fn queries_are_idempotent() {
        let computer = FakeComputer::default();
        let a = run(&computer, "get_cursor_position", json!({})).await;
        let b = run(&computer, "GetCursorPosition", json!({})).await;
        assert_eq!(a, b);
        assert_eq!(a, Ok(ActionOutput::Cursor(CursorPosition { x: 12, y: 34 })));

        let a = run(&computer, "get_screen_size", json!({})).await;
        let b = run(&computer, "get_screen_size", json!({})).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn negative_wait_is_a_handler_error() {
        let computer = FakeComputer::default();
        assert_eq!(run(&computer, "Wait", json!({"Duration": 1})).await, Ok(ActionOutput::Done));
        let err = run(&computer, "wait", json!({"duration": -1})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::HandlerError);
    }

    #[tokio::test]
    async fn upstream_failures_are_classified() {
        let computer = FakeComputer {
            size: Err(ComputerError::Unavailable("connection refused".into())),
            ..Default::default()
        };
        let err = run(&computer, "get_screen_size", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::UpstreamUnavailable);
    }
}
