/// Face avatar rendering
///
/// Crops the head from a skin texture sheet, composites the hat layer and
/// block-scales the result to a fixed-size PNG. Rendering is a pure function
/// of the input bytes and the overlay flag.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

/// Output edge length in pixels
pub const AVATAR_SIZE: u32 = 96;

/// Width of a standard-resolution skin sheet
const SKIN_UNIT_WIDTH: u32 = 64;

/// Face and hat regions on a standard-resolution sheet, as (x, y)
const FACE_ORIGIN: (u32, u32) = (8, 8);
const HAT_ORIGIN: (u32, u32) = (40, 8);
const FACE_SIZE: u32 = 8;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Input is not a decodable skin texture
    #[error("failed to decode skin texture: {0}")]
    Decode(String),

    /// Output could not be encoded as PNG
    #[error("failed to encode avatar: {0}")]
    Encode(String),
}

/// A rendered face avatar. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAvatar {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    overlay: bool,
}

impl RenderedAvatar {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn overlay(&self) -> bool {
        self.overlay
    }
}

/// Render a 96x96 face avatar from PNG skin bytes
///
/// Accepts legacy (64x32) and modern (64x64) layouts, plus HD sheets whose
/// width is a multiple of 64.
pub fn render_face(texture: &[u8], overlay: bool) -> Result<RenderedAvatar, RenderError> {
    let decoded = image::load_from_memory_with_format(texture, ImageFormat::Png)
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    // Palette, greyscale and RGB sources all become straight-alpha RGBA here
    let skin = decoded.to_rgba8();
    let scale = layout_scale(skin.width(), skin.height())?;

    let mut face = extract_region(&skin, FACE_ORIGIN, scale);
    for pixel in face.pixels_mut() {
        pixel[3] = u8::MAX;
    }

    if overlay {
        let hat = extract_region(&skin, HAT_ORIGIN, scale);
        if !is_solid_filler(&hat) {
            composite_over(&mut face, &hat);
        }
    }

    let scaled = scale_nearest(&face, AVATAR_SIZE);

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(scaled)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(RenderedAvatar {
        bytes,
        width: AVATAR_SIZE,
        height: AVATAR_SIZE,
        overlay,
    })
}

/// Pixels per standard-resolution texel, validating the sheet layout
fn layout_scale(width: u32, height: u32) -> Result<u32, RenderError> {
    let valid_width = width >= SKIN_UNIT_WIDTH && width % SKIN_UNIT_WIDTH == 0;
    let valid_height = height == width || height * 2 == width;

    if !valid_width || !valid_height {
        return Err(RenderError::Decode(format!(
            "unsupported skin dimensions {}x{}",
            width, height
        )));
    }

    Ok(width / SKIN_UNIT_WIDTH)
}

fn extract_region(skin: &RgbaImage, origin: (u32, u32), scale: u32) -> RgbaImage {
    let size = FACE_SIZE * scale;
    image::imageops::crop_imm(skin, origin.0 * scale, origin.1 * scale, size, size).to_image()
}

/// Legacy skins often fill the hat area with one opaque colour; that is not a hat.
fn is_solid_filler(layer: &RgbaImage) -> bool {
    let mut pixels = layer.pixels();
    match pixels.next() {
        Some(first) => first[3] == u8::MAX && pixels.all(|p| p == first),
        None => true,
    }
}

/// Source-over blend of `top` onto an opaque `base`, skipping fully transparent texels
fn composite_over(base: &mut RgbaImage, top: &RgbaImage) {
    for (x, y, src) in top.enumerate_pixels() {
        let alpha = u32::from(src[3]);
        if alpha == 0 {
            continue;
        }

        let dst = base.get_pixel_mut(x, y);
        let mut out = [0u8, 0, 0, u8::MAX];
        for channel in 0..3 {
            let blended =
                u32::from(src[channel]) * alpha + u32::from(dst[channel]) * (255 - alpha);
            out[channel] = ((blended + 127) / 255) as u8;
        }
        *dst = Rgba(out);
    }
}

/// Integer nearest-neighbour scaling, never interpolated
fn scale_nearest(source: &RgbaImage, size: u32) -> RgbaImage {
    let (width, height) = source.dimensions();
    RgbaImage::from_fn(size, size, |x, y| {
        *source.get_pixel(x * width / size, y * height / size)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn encode(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    /// Skin with a blue face and a transparent hat layer
    fn skin(width: u32, height: u32) -> RgbaImage {
        let scale = width / 64;
        let mut img = RgbaImage::from_pixel(width, height, CLEAR);
        for y in 0..8 * scale {
            for x in 0..8 * scale {
                img.put_pixel(8 * scale + x, 8 * scale + y, BLUE);
            }
        }
        img
    }

    fn decode(avatar: &RenderedAvatar) -> RgbaImage {
        image::load_from_memory(avatar.bytes()).unwrap().to_rgba8()
    }

    #[test]
    fn test_output_is_96_for_legacy_and_modern_layouts() {
        for (w, h) in [(64, 32), (64, 64), (128, 128)] {
            let avatar = render_face(&encode(DynamicImage::ImageRgba8(skin(w, h))), true).unwrap();
            assert_eq!((avatar.width(), avatar.height()), (96, 96));
            assert_eq!(decode(&avatar).dimensions(), (96, 96), "layout {w}x{h}");
        }
    }

    #[test]
    fn test_overlay_composited_where_opaque() {
        let mut img = skin(64, 64);
        // Hat texel (0, 0) of the face region
        img.put_pixel(40, 8, RED);

        let avatar = render_face(&encode(DynamicImage::ImageRgba8(img.clone())), true).unwrap();
        let out = decode(&avatar);
        // Each texel becomes a 12x12 block
        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(11, 11), RED);
        assert_eq!(*out.get_pixel(12, 0), BLUE);
        assert_eq!(*out.get_pixel(95, 95), BLUE);

        let plain = render_face(&encode(DynamicImage::ImageRgba8(img)), false).unwrap();
        assert!(!plain.overlay());
        assert_eq!(*decode(&plain).get_pixel(0, 0), BLUE);
    }

    #[test]
    fn test_translucent_overlay_blends() {
        let mut img = skin(64, 64);
        img.put_pixel(40, 8, Rgba([255, 0, 0, 128]));

        let out = decode(&render_face(&encode(DynamicImage::ImageRgba8(img)), true).unwrap());
        assert_eq!(*out.get_pixel(0, 0), Rgba([128, 0, 127, 255]));
    }

    #[test]
    fn test_solid_filler_overlay_ignored() {
        let mut img = skin(64, 32);
        for y in 8..16 {
            for x in 40..48 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }

        let out = decode(&render_face(&encode(DynamicImage::ImageRgba8(img)), true).unwrap());
        assert_eq!(*out.get_pixel(0, 0), BLUE);
    }

    #[test]
    fn test_base_face_forced_opaque() {
        let mut img = skin(64, 64);
        img.put_pixel(8, 8, Rgba([10, 20, 30, 0]));

        let out = decode(&render_face(&encode(DynamicImage::ImageRgba8(img)), true).unwrap());
        assert_eq!(*out.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_greyscale_input_converted() {
        let img = GrayImage::from_pixel(64, 64, Luma([200]));
        let out = decode(&render_face(&encode(DynamicImage::ImageLuma8(img)), true).unwrap());
        assert_eq!(*out.get_pixel(50, 50), Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut img = skin(64, 64);
        img.put_pixel(43, 11, Rgba([1, 2, 3, 77]));
        let input = encode(DynamicImage::ImageRgba8(img));

        let a = render_face(&input, true).unwrap();
        let b = render_face(&input, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = render_face(b"definitely not a png", true).unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)));
    }

    #[test]
    fn test_unsupported_dimensions_rejected() {
        let input = encode(DynamicImage::ImageRgba8(RgbaImage::new(32, 32)));
        assert!(matches!(render_face(&input, true), Err(RenderError::Decode(_))));

        let input = encode(DynamicImage::ImageRgba8(RgbaImage::new(64, 48)));
        assert!(matches!(render_face(&input, true), Err(RenderError::Decode(_))));
    }
}
