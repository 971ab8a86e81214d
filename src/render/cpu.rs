use std::sync::Arc;

use crate::{
    foundation::{color::Rgb8, core::Canvas, error::AvatarResult},
    render::{
        backend::{Bitmap, DrawSurface, LayerImage},
        composite::{fill, over_in_place, premultiply},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Resampling filter used when a layer does not match the canvas size.
pub enum ScaleFilter {
    /// Nearest neighbour; cheapest, blocky when downscaling.
    Nearest,
    /// Bilinear.
    Triangle,
    /// Lanczos3; best quality for thumbnails.
    Lanczos3,
}

impl ScaleFilter {
    fn to_image(self) -> image::imageops::FilterType {
        match self {
            ScaleFilter::Nearest => image::imageops::FilterType::Nearest,
            ScaleFilter::Triangle => image::imageops::FilterType::Triangle,
            ScaleFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

#[derive(Clone, Debug)]
/// CPU drawing surface backed by the `image` crate.
pub struct CpuSurface {
    filter: ScaleFilter,
}

impl Default for CpuSurface {
    fn default() -> Self {
        Self::new(ScaleFilter::Triangle)
    }
}

impl CpuSurface {
    /// Surface resampling mismatched layers with `filter`.
    pub fn new(filter: ScaleFilter) -> Self {
        Self { filter }
    }
}

impl DrawSurface for CpuSurface {
    fn render(
        &self,
        layers: &[Arc<LayerImage>],
        background: Option<Rgb8>,
        canvas: Canvas,
    ) -> AvatarResult<Bitmap> {
        let mut out = Bitmap::transparent(canvas);
        if let Some(bg) = background {
            fill(&mut out.data, bg.to_premul_rgba8());
        }

        for layer in layers {
            let premul = premultiplied_at(layer, canvas, self.filter);
            over_in_place(&mut out.data, premul.as_raw())?;
        }

        Ok(out)
    }
}

// Resampling happens on premultiplied data so transparent texels do not bleed color.
fn premultiplied_at(layer: &LayerImage, canvas: Canvas, filter: ScaleFilter) -> image::RgbaImage {
    let mut premul = layer.pixels.clone();
    for px in premul.pixels_mut() {
        px.0 = premultiply(px.0);
    }
    if premul.width() == canvas.width && premul.height() == canvas.height {
        return premul;
    }
    image::imageops::resize(&premul, canvas.width, canvas.height, filter.to_image())
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
