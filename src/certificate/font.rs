use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use std::path::Path;

use crate::error::CertificateError;

/// Text measurement and rasterization used by the certificate layout.
pub trait Typeface {
    /// Rendered `(width, height)` of a single line, in pixels. The height runs
    /// from the top of the ascent to the lowest inked pixel.
    fn measure(&self, text: &str) -> (u32, u32);

    /// Draws `text` with its top-left corner at `(x, y)`. Pixels outside the
    /// canvas are clipped.
    fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>);
}

pub struct TrueTypeFace {
    font: Font<'static>,
    scale: Scale,
}

impl TrueTypeFace {
    pub fn load(path: &Path, px: f32) -> Result<Self, CertificateError> {
        let data = std::fs::read(path).map_err(|e| CertificateError::filesystem(path, e))?;
        Self::from_bytes(data, px)
    }

    pub fn from_bytes(data: Vec<u8>, px: f32) -> Result<Self, CertificateError> {
        let font = Font::try_from_vec(data)
            .ok_or_else(|| CertificateError::Font("not a TrueType/OpenType font".to_string()))?;
        Ok(Self {
            font,
            scale: Scale::uniform(px),
        })
    }
}

impl Typeface for TrueTypeFace {
    fn measure(&self, text: &str) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }
        let v_metrics = self.font.v_metrics(self.scale);
        let glyphs: Vec<_> = self
            .font
            .layout(text, self.scale, point(0.0, v_metrics.ascent))
            .collect();

        let width = glyphs
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        let height = glyphs
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .map(|bb| bb.max.y as f32)
            .fold(v_metrics.ascent, f32::max);

        (width.ceil().max(0.0) as u32, height.ceil().max(0.0) as u32)
    }

    fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        let v_metrics = self.font.v_metrics(self.scale);
        let origin = point(x as f32, y as f32 + v_metrics.ascent);

        for glyph in self.font.layout(text, self.scale, origin) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || px >= canvas.width() as i32 || py >= canvas.height() as i32 {
                    return;
                }
                let dst = canvas.get_pixel_mut(px as u32, py as u32);
                let inv = 1.0 - coverage;
                for c in 0..3 {
                    dst.0[c] = (color.0[c] as f32 * coverage + dst.0[c] as f32 * inv) as u8;
                }
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Monospaced stand-in: every char is a `char_width` x `height` block.
    pub struct BlockFace {
        pub char_width: u32,
        pub height: u32,
    }

    impl Default for BlockFace {
        fn default() -> Self {
            Self {
                char_width: 10,
                height: 20,
            }
        }
    }

    impl Typeface for BlockFace {
        fn measure(&self, text: &str) -> (u32, u32) {
            let chars = text.chars().count() as u32;
            if chars == 0 {
                (0, 0)
            } else {
                (chars * self.char_width, self.height)
            }
        }

        fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
            let (w, h) = self.measure(text);
            for py in y.max(0)..(y + h as i32).min(canvas.height() as i32) {
                for px in x.max(0)..(x + w as i32).min(canvas.width() as i32) {
                    canvas.put_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}
