mod colours;
mod renderer;
mod surface;

pub use colours::class_colour;
pub use renderer::OverlayRenderer;
pub use surface::{OverlaySurface, RgbaCanvas};
