//! Frame display and keyboard input.
//!
//! The capture loop and the final result view talk to a `FrameDisplay`:
//! - `WindowDisplay` opens a native window (feature: preview)
//! - `TerminalDisplay` reads keys as lines from a terminal and draws nothing
//!
//! Only one window exists at a time. `close()` drops it.

use anyhow::Result;
use image::RgbImage;
use std::io::BufRead;
use std::time::Duration;

/// Keys the pipeline reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPress {
    Space,
    Escape,
    Other,
}

pub trait FrameDisplay {
    /// Render `frame` in a window titled `title`, opening one if needed.
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<()>;

    /// Wait for a key press. `None` blocks until one arrives.
    fn wait_key(&mut self, timeout: Option<Duration>) -> Result<Option<KeyPress>>;

    /// Close any open window.
    fn close(&mut self);
}

impl<T: FrameDisplay + ?Sized> FrameDisplay for Box<T> {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<()> {
        (**self).show(title, frame)
    }

    fn wait_key(&mut self, timeout: Option<Duration>) -> Result<Option<KeyPress>> {
        (**self).wait_key(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ----------------------------------------------------------------------------
// Terminal fallback
// ----------------------------------------------------------------------------

/// Line-oriented key input for hosts without a display.
///
/// An empty line is Space, `q` or `esc` is Escape, and end of input is
/// Escape. Reads block regardless of the timeout.
pub struct TerminalDisplay<R> {
    input: R,
    prompted: bool,
}

impl TerminalDisplay<std::io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> TerminalDisplay<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            prompted: false,
        }
    }
}

impl<R: BufRead> FrameDisplay for TerminalDisplay<R> {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<()> {
        log::debug!(
            "terminal display: '{}' {}x{} not rendered",
            title,
            frame.width(),
            frame.height()
        );
        Ok(())
    }

    fn wait_key(&mut self, _timeout: Option<Duration>) -> Result<Option<KeyPress>> {
        if !self.prompted {
            eprintln!("Enter = capturar/continuar, q + Enter = salir");
            self.prompted = true;
        }
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Some(KeyPress::Escape));
        }
        let key = match line.trim().to_lowercase().as_str() {
            "" | " " => KeyPress::Space,
            "q" | "esc" => KeyPress::Escape,
            _ => KeyPress::Other,
        };
        Ok(Some(key))
    }

    fn close(&mut self) {}
}

// ----------------------------------------------------------------------------
// Native window
// ----------------------------------------------------------------------------

#[cfg(feature = "preview")]
pub use window::WindowDisplay;

#[cfg(feature = "preview")]
mod window {
    use anyhow::{anyhow, Context, Result};
    use image::RgbImage;
    use pixels::{Pixels, SurfaceTexture};
    use std::time::{Duration, Instant};
    use winit::{
        dpi::LogicalSize,
        event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
        event_loop::{ControlFlow, EventLoop},
        platform::run_return::EventLoopExtRunReturn,
        window::{Window, WindowBuilder},
    };

    use super::{FrameDisplay, KeyPress};

    /// `winit` window backed by a `pixels` frame buffer.
    ///
    /// The event loop is created once and reused; winit does not allow a
    /// second one per process.
    pub struct WindowDisplay {
        event_loop: EventLoop<()>,
        surface: Option<Surface>,
    }

    struct Surface {
        // Drop order: the pixel surface goes before its window.
        pixels: Pixels,
        window: Window,
        title: String,
        width: u32,
        height: u32,
    }

    impl WindowDisplay {
        pub fn new() -> Result<Self> {
            let event_loop = std::panic::catch_unwind(EventLoop::new)
                .map_err(|_| anyhow!("no windowing system available"))?;
            Ok(Self {
                event_loop,
                surface: None,
            })
        }

        fn open(&mut self, title: &str, width: u32, height: u32) -> Result<()> {
            self.surface = None;
            let window = WindowBuilder::new()
                .with_title(title)
                .with_inner_size(LogicalSize::new(width as f64, height as f64))
                .with_resizable(false)
                .build(&self.event_loop)
                .context("create preview window")?;
            let size = window.inner_size();
            let texture = SurfaceTexture::new(size.width, size.height, &window);
            let pixels = Pixels::new(width, height, texture)
                .map_err(|e| anyhow!("create pixel buffer: {}", e))?;
            log::debug!("opened window '{}' ({}x{})", title, width, height);
            self.surface = Some(Surface {
                pixels,
                window,
                title: title.to_string(),
                width,
                height,
            });
            Ok(())
        }
    }

    impl FrameDisplay for WindowDisplay {
        fn show(&mut self, title: &str, frame: &RgbImage) -> Result<()> {
            let (width, height) = frame.dimensions();
            let reuse = self
                .surface
                .as_ref()
                .is_some_and(|s| s.width == width && s.height == height);
            if !reuse {
                self.open(title, width, height)?;
            }
            let surface = self
                .surface
                .as_mut()
                .ok_or_else(|| anyhow!("preview window not open"))?;
            if surface.title != title {
                surface.window.set_title(title);
                surface.title = title.to_string();
            }

            for (dst, src) in surface
                .pixels
                .frame_mut()
                .chunks_exact_mut(4)
                .zip(frame.pixels())
            {
                dst.copy_from_slice(&[src[0], src[1], src[2], 0xff]);
            }
            surface
                .pixels
                .render()
                .map_err(|e| anyhow!("render preview: {}", e))
        }

        fn wait_key(&mut self, timeout: Option<Duration>) -> Result<Option<KeyPress>> {
            let deadline = timeout.map(|t| Instant::now() + t);
            let surface = &mut self.surface;
            let mut pressed = None;

            self.event_loop.run_return(|event, _, control_flow| match event {
                Event::WindowEvent {
                    event:
                        WindowEvent::KeyboardInput {
                            input:
                                KeyboardInput {
                                    state: ElementState::Pressed,
                                    virtual_keycode,
                                    ..
                                },
                            ..
                        },
                    ..
                } => {
                    pressed = Some(match virtual_keycode {
                        Some(VirtualKeyCode::Space) => KeyPress::Space,
                        Some(VirtualKeyCode::Escape) => KeyPress::Escape,
                        _ => KeyPress::Other,
                    });
                }
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => pressed = Some(KeyPress::Escape),
                Event::RedrawRequested(_) => {
                    if let Some(surface) = surface.as_ref() {
                        if let Err(err) = surface.pixels.render() {
                            log::warn!("redraw failed: {}", err);
                        }
                    }
                }
                Event::MainEventsCleared => {
                    let expired = deadline.is_some_and(|d| Instant::now() >= d);
                    *control_flow = if pressed.is_some() || expired {
                        ControlFlow::Exit
                    } else if let Some(deadline) = deadline {
                        ControlFlow::WaitUntil(deadline)
                    } else {
                        ControlFlow::Wait
                    };
                }
                _ => {}
            });

            Ok(pressed)
        }

        fn close(&mut self) {
            if let Some(surface) = self.surface.take() {
                log::debug!("closed window '{}'", surface.title);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn terminal_keys_map_from_lines() -> Result<()> {
        let mut display = TerminalDisplay::new(Cursor::new("\nq\nx\nESC\n"));
        assert_eq!(display.wait_key(None)?, Some(KeyPress::Space));
        assert_eq!(display.wait_key(None)?, Some(KeyPress::Escape));
        assert_eq!(display.wait_key(None)?, Some(KeyPress::Other));
        assert_eq!(display.wait_key(None)?, Some(KeyPress::Escape));
        Ok(())
    }

    #[test]
    fn terminal_end_of_input_cancels() -> Result<()> {
        let mut display = TerminalDisplay::new(Cursor::new(""));
        display.show("preview", &RgbImage::new(4, 4))?;
        assert_eq!(display.wait_key(Some(Duration::from_millis(1)))?, Some(KeyPress::Escape));
        Ok(())
    }
}
