use std::{io::Cursor, path::Path, sync::Arc};

use anyhow::Context;

use crate::foundation::{
    color::Rgb8,
    core::Canvas,
    error::{AvatarError, AvatarResult},
};

/// A rendered canvas as RGBA8 pixels.
///
/// Surfaces in this crate output **premultiplied alpha**; the `premultiplied` flag makes that
/// explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl Bitmap {
    /// Fully transparent bitmap of `canvas` size.
    pub fn transparent(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.rgba8_len()],
            premultiplied: true,
        }
    }

    /// Pixel at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Straight-alpha copy of the pixel data.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Encode as PNG.
    pub fn to_png_bytes(&self) -> AvatarResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba8())
            .ok_or_else(|| AvatarError::validation("bitmap buffer does not match its size"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }

    /// Write as a PNG file, creating parent directories.
    pub fn save_png(&self, path: impl AsRef<Path>) -> AvatarResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let bytes = self.to_png_bytes()?;
        std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// One decoded layer image in straight (non-premultiplied) RGBA8.
#[derive(Clone, Debug)]
pub struct LayerImage {
    /// Decoded pixels.
    pub pixels: image::RgbaImage,
}

impl LayerImage {
    /// Decode encoded image bytes (PNG or any format enabled in `image`).
    pub fn decode(bytes: &[u8]) -> AvatarResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        Ok(Self {
            pixels: dyn_img.to_rgba8(),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Drawing surface: composites ordered layer images over an optional opaque fill.
///
/// Layers are stretched to the canvas and drawn in slice order, later on top.
pub trait DrawSurface: Send + Sync {
    /// Render one frame.
    fn render(
        &self,
        layers: &[Arc<LayerImage>],
        background: Option<Rgb8>,
        canvas: Canvas,
    ) -> AvatarResult<Bitmap>;
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
