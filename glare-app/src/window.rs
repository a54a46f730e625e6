//! Windowed backend on winit + pixels.
//!
//! The engine owns the control flow, so the event loop is pumped from
//! inside [`Presenter::refresh`] instead of handing `main` to `run_app`.
//! `Pixels::render` blocks on vsync, which paces the tick loop.

use crate::render::{Painter, Scene, TextRenderer};
use anyhow::{Context, Result, bail};
use glare_core::{Key, KeyEvent, KeyState, Position, StimulusId};
use glare_experiment::{Background, CollaboratorError, KeySource, Presenter};
use pixels::{Pixels, SurfaceTexture};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::Pixmap;
use tracing::{info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key as WinitKey, NamedKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

const TITLE: &str = "Glare Illusion Perception";

struct WindowApp {
    fullscreen: bool,
    pixels_per_cm: f32,
    /// Handed to the painter once the surface exists.
    font: Option<TextRenderer>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    canvas: Option<Pixmap>,
    painter: Option<Painter>,
    title: String,
    pending: Vec<KeyEvent>,
    closed: bool,
    failure: Option<String>,
}

impl WindowApp {
    fn new(fullscreen: bool, pixels_per_cm: f32, font: Option<TextRenderer>) -> Self {
        Self {
            fullscreen,
            pixels_per_cm,
            font,
            window: None,
            pixels: None,
            canvas: None,
            painter: None,
            title: String::new(),
            pending: Vec::new(),
            closed: false,
            failure: None,
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_resizable(!self.fullscreen);
        if self.fullscreen {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .context("no monitor available")?;
            if let Some(mhz) = monitor.refresh_rate_millihertz() {
                info!("refresh rate: {:.1} Hz", mhz as f64 / 1000.0);
            }
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            "display {}x{}, scale factor {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.resize_canvas(size);
        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    fn resize_canvas(&mut self, size: PhysicalSize<u32>) {
        self.canvas = Pixmap::new(size.width, size.height);
        match &mut self.painter {
            Some(painter) => painter.resize(size.width, size.height),
            None => {
                self.painter = Some(Painter::new(
                    size.width,
                    size.height,
                    self.pixels_per_cm,
                    self.font.take(),
                ));
            }
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                warn!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                warn!("failed to resize buffer: {e}");
            }
        }
        self.resize_canvas(size);
    }

    fn present(&mut self, scene: &Scene) -> Result<(), CollaboratorError> {
        let (Some(window), Some(pixels), Some(canvas), Some(painter)) = (
            &self.window,
            &mut self.pixels,
            &mut self.canvas,
            &mut self.painter,
        ) else {
            return Ok(());
        };

        // without a font the title bar is the only place text can go
        let title = match &scene.message {
            Some(text) if !painter.has_text() => {
                format!("{TITLE} - {}", text.replace('\n', " "))
            }
            _ => TITLE.to_string(),
        };
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }

        painter.paint(scene, canvas);
        let frame = pixels.frame_mut();
        if frame.len() == canvas.data().len() {
            frame.copy_from_slice(canvas.data());
        }
        pixels
            .render()
            .map_err(|e| CollaboratorError::Display(e.to_string()))
    }
}

fn map_key(key: &WinitKey) -> Option<Key> {
    match key.as_ref() {
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Character(s) => s.parse().ok(),
        _ => None,
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.failure = Some(format!("{e:#}"));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.closed = true;
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } if !event.repeat => {
                if let Some(key) = map_key(&event.logical_key) {
                    let state = if event.state.is_pressed() {
                        KeyState::Pressed
                    } else {
                        KeyState::Released
                    };
                    self.pending.push(KeyEvent { key, state });
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = self.window.clone() {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }
}

struct Shared {
    event_loop: EventLoop<()>,
    app: WindowApp,
}

impl Shared {
    fn pump(&mut self) -> Result<(), CollaboratorError> {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app);
        if let Some(failure) = self.app.failure.take() {
            return Err(CollaboratorError::Display(failure));
        }
        if self.app.closed || matches!(status, PumpStatus::Exit(_)) {
            self.app.closed = true;
            return Err(CollaboratorError::DisplayClosed);
        }
        Ok(())
    }
}

pub struct WindowPresenter {
    shared: Rc<RefCell<Shared>>,
    scene: Scene,
}

impl Presenter for WindowPresenter {
    fn show(&mut self, id: StimulusId, at: Position) {
        self.scene.visible.insert(id, at);
    }

    fn hide(&mut self, id: StimulusId) {
        self.scene.visible.remove(&id);
    }

    fn message(&mut self, text: Option<&str>) {
        if let Some(text) = text {
            if self.scene.message.as_deref() != Some(text) {
                info!(target: "glare::screen", "{text}");
            }
        }
        self.scene.message = text.map(str::to_owned);
    }

    fn set_background(&mut self, background: Background) {
        self.scene.background = background;
    }

    fn refresh(&mut self) -> Result<(), CollaboratorError> {
        let mut shared = self.shared.borrow_mut();
        shared.pump()?;
        shared.app.present(&self.scene)
    }
}

pub struct WindowKeys {
    shared: Rc<RefCell<Shared>>,
}

impl KeySource for WindowKeys {
    fn drain(&mut self) -> Result<Vec<KeyEvent>, CollaboratorError> {
        let mut shared = self.shared.borrow_mut();
        if shared.app.closed {
            return Err(CollaboratorError::DisplayClosed);
        }
        Ok(std::mem::take(&mut shared.app.pending))
    }
}

/// Opens the presentation window and blocks until its surface exists.
pub fn open(
    fullscreen: bool,
    pixels_per_cm: f32,
    font: Option<TextRenderer>,
) -> Result<(WindowPresenter, WindowKeys)> {
    let event_loop = EventLoop::new().context("creating event loop")?;
    let mut shared = Shared {
        event_loop,
        app: WindowApp::new(fullscreen, pixels_per_cm, font),
    };

    for _ in 0..500 {
        shared.pump().context("opening presentation window")?;
        if shared.app.window.is_some() {
            let shared = Rc::new(RefCell::new(shared));
            let presenter = WindowPresenter {
                shared: shared.clone(),
                scene: Scene::default(),
            };
            return Ok((presenter, WindowKeys { shared }));
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    bail!("presentation window did not appear")
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    #[test]
    fn keys_map_to_engine_keys() {
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Space)), Some(Key::Space));
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Escape)), Some(Key::Escape));
        assert_eq!(
            map_key(&WinitKey::Character(SmolStr::new("B"))),
            Some(Key::Char('b'))
        );
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Tab)), None);
    }
}
