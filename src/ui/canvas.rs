// Canvas - minimal 2D drawing surface for the capture views
//
// Views draw through this trait so they can be rendered by egui in the
// studio and recorded in tests.

use eframe::egui;

/// RGBA color with straight (non-premultiplied) alpha in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_color32(self) -> egui::Color32 {
        let alpha = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, alpha)
    }
}

/// Text size and weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub size: f32,
    pub bold: bool,
}

impl Font {
    pub const fn regular(size: f32) -> Self {
        Self { size, bold: false }
    }

    pub const fn bold(size: f32) -> Self {
        Self { size, bold: true }
    }
}

/// Coordinates are in pixels from the top-left corner
pub trait Canvas {
    fn width(&self) -> f32;
    fn height(&self) -> f32;

    /// Reset a region to the background
    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);

    /// Draw text with its baseline starting at (x, y)
    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Color);
}

/// `Canvas` over an egui painter, clipped to `rect`
pub struct EguiCanvas<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    background: egui::Color32,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(painter: &'a egui::Painter, rect: egui::Rect, background: egui::Color32) -> Self {
        Self {
            painter,
            rect,
            background,
        }
    }

    fn to_screen(&self, x: f32, y: f32, w: f32, h: f32) -> egui::Rect {
        let min = self.rect.min + egui::vec2(x, y);
        egui::Rect::from_min_size(min, egui::vec2(w.max(0.0), h.max(0.0))).intersect(self.rect)
    }
}

impl Canvas for EguiCanvas<'_> {
    fn width(&self) -> f32 {
        self.rect.width()
    }

    fn height(&self) -> f32 {
        self.rect.height()
    }

    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let rect = self.to_screen(x, y, w, h);
        self.painter.rect_filled(rect, 0.0, self.background);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let rect = self.to_screen(x, y, w, h);
        self.painter.rect_filled(rect, 0.0, color.to_color32());
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Color) {
        // egui has no bold face by default; bold text is drawn slightly larger
        let size = if font.bold { font.size * 1.1 } else { font.size };
        self.painter.text(
            self.rect.min + egui::vec2(x, y),
            egui::Align2::LEFT_BOTTOM,
            text,
            egui::FontId::proportional(size),
            color.to_color32(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion() {
        let color = Color::rgba(139, 0, 0, 0.2).to_color32();
        assert_eq!(color.a(), 51);
        assert_eq!(Color::WHITE.to_color32(), egui::Color32::WHITE);
    }
}
