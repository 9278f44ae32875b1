//! # Input
//!
//! Turns pointer, wheel and resize events in client coordinates into the
//! guest's input exports. Pointer positions are normalised to the
//! viewport: `(0, 0)` top-left, `(1, 1)` bottom-right.

use tracing::trace;

use crate::backend::Backend;
use crate::session::Result;
use crate::session::Session;

/// The drawing surface, in client coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    pub fn normalize(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.left) / self.width, (y - self.top) / self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    Wheel { delta_y: f32 },
    /// The surface changed size; becomes the new viewport.
    Resize { width: f32, height: f32 },
}

impl<B: Backend> Session<B> {
    /// Forwards one event to the guest.
    pub async fn handle_input(&mut self, viewport: &mut Viewport, event: InputEvent) -> Result<()> {
        trace!(?event, "input");
        match event {
            InputEvent::PointerDown { x, y } => self.invoke("mouseDown", viewport.normalize(x, y)).await,
            InputEvent::PointerMove { x, y } => self.invoke("mouseMove", viewport.normalize(x, y)).await,
            InputEvent::PointerUp => self.invoke("mouseUp", ()).await,
            InputEvent::Wheel { delta_y } => self.invoke("zoom", delta_y).await,
            InputEvent::Resize { width, height } => {
                *viewport = Viewport {
                    width,
                    height,
                    ..*viewport
                };
                self.backend_mut().viewport(0, 0, width as i32, height as i32);
                self.set_aspect(viewport.aspect()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_against_offset_surface() {
        let viewport = Viewport {
            left: 100.0,
            top: 50.0,
            width: 800.0,
            height: 400.0,
        };
        assert_eq!(viewport.normalize(100.0, 50.0), (0.0, 0.0));
        assert_eq!(viewport.normalize(500.0, 250.0), (0.5, 0.5));
        assert_eq!(viewport.normalize(900.0, 450.0), (1.0, 1.0));
        assert_eq!(viewport.aspect(), 2.0);
    }
}
