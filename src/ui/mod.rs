// UI module - egui studio and the capture views

pub mod app;
pub mod canvas;
pub mod metronome_view;

pub use app::StudioApp;
pub use canvas::{Canvas, Color, EguiCanvas, Font};
