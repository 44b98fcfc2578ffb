//! Truevision TGA loading.
//!
//! Only the raw variants are accepted: true-color (type 2, 24 or 32 bits)
//! and grayscale (type 3, 8 bits). The header is checked here so
//! color-mapped and RLE images fail with a precise error; pixel decoding
//! and orientation handling are done by the `image` crate.

use image::ImageFormat;
use thiserror::Error;

use super::rgba_to_bgra;

const HEADER_LEN: usize = 18;

const TYPE_TRUE_COLOR: u8 = 2;
const TYPE_GRAYSCALE: u8 = 3;

const DESC_TOP_TO_BOTTOM: u8 = 0x20;

#[derive(Error, Debug)]
pub enum TgaError {
    #[error("TGA data truncated: needed {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("color-mapped TGA images are not supported")]
    ColorMapped,
    #[error("unsupported TGA image type {0}")]
    UnsupportedImageType(u8),
    #[error("unsupported bit depth {bits} for TGA image type {image_type}")]
    UnsupportedBitDepth { image_type: u8, bits: u8 },
    #[error("TGA image has zero width or height")]
    ZeroDimension,
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}

/// A decoded image: BGRA8, rows stored top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct TgaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Rejects anything outside the supported subset before decoding.
fn check_header(bytes: &[u8]) -> Result<(), TgaError> {
    if bytes.len() < HEADER_LEN {
        return Err(TgaError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let id_length = bytes[0] as usize;
    let image_type = bytes[2];
    let width = u16::from_le_bytes([bytes[12], bytes[13]]) as usize;
    let height = u16::from_le_bytes([bytes[14], bytes[15]]) as usize;
    let bits = bytes[16];

    if bytes[1] != 0 {
        return Err(TgaError::ColorMapped);
    }

    let bytes_per_pixel = match (image_type, bits) {
        (TYPE_TRUE_COLOR, 24) => 3,
        (TYPE_TRUE_COLOR, 32) => 4,
        (TYPE_GRAYSCALE, 8) => 1,
        (TYPE_TRUE_COLOR | TYPE_GRAYSCALE, bits) => {
            return Err(TgaError::UnsupportedBitDepth { image_type, bits });
        }
        (other, _) => return Err(TgaError::UnsupportedImageType(other)),
    };

    if width == 0 || height == 0 {
        return Err(TgaError::ZeroDimension);
    }

    let expected = HEADER_LEN + id_length + width * height * bytes_per_pixel;
    if bytes.len() < expected {
        return Err(TgaError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    Ok(())
}

pub fn parse_tga(bytes: &[u8]) -> Result<TgaImage, TgaError> {
    check_header(bytes)?;

    let image = image::load_from_memory_with_format(bytes, ImageFormat::Tga)?.to_rgba8();
    let (width, height) = image.dimensions();
    let mut pixels = image.into_raw();
    rgba_to_bgra(&mut pixels);

    Ok(TgaImage {
        width,
        height,
        pixels,
    })
}

/// Encodes an uncompressed 32-bit TGA. Pixels are BGRA, rows top to bottom.
pub fn encode_tga(width: u16, height: u16, bgra: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + bgra.len());
    out.extend_from_slice(&[0, 0, TYPE_TRUE_COLOR, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.push(32);
    out.push(DESC_TOP_TO_BOTTOM | 8);
    out.extend_from_slice(bgra);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESC_RIGHT_TO_LEFT: u8 = 0x10;

    fn header(image_type: u8, width: u16, height: u16, bpp: u8, descriptor: u8) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_LEN];
        h[2] = image_type;
        h[12..14].copy_from_slice(&width.to_le_bytes());
        h[14..16].copy_from_slice(&height.to_le_bytes());
        h[16] = bpp;
        h[17] = descriptor;
        h
    }

    #[test]
    fn bottom_left_origin_is_flipped_to_top_down() {
        // 1x2, 24-bit, default bottom-left origin: first stored row is the bottom one.
        let mut bytes = header(TYPE_TRUE_COLOR, 1, 2, 24, 0);
        bytes.extend_from_slice(&[1, 2, 3]); // bottom
        bytes.extend_from_slice(&[4, 5, 6]); // top

        let image = parse_tga(&bytes).unwrap();
        assert_eq!(image.width, 1);
        assert_eq!(image.height, 2);
        assert_eq!(image.pixels, vec![4, 5, 6, 255, 1, 2, 3, 255]);
    }

    #[test]
    fn top_left_origin_keeps_row_order() {
        let mut bytes = header(TYPE_TRUE_COLOR, 2, 1, 32, DESC_TOP_TO_BOTTOM | 8);
        bytes.extend_from_slice(&[10, 20, 30, 40, 50, 60, 70, 80]);

        let image = parse_tga(&bytes).unwrap();
        assert_eq!(image.pixels, vec![10, 20, 30, 40, 50, 60, 70, 80]);
    }

    #[test]
    fn right_to_left_rows_are_mirrored() {
        let mut bytes = header(TYPE_GRAYSCALE, 2, 1, 8, DESC_TOP_TO_BOTTOM | DESC_RIGHT_TO_LEFT);
        bytes.extend_from_slice(&[7, 9]);

        let image = parse_tga(&bytes).unwrap();
        assert_eq!(image.pixels, vec![9, 9, 9, 255, 7, 7, 7, 255]);
    }

    #[test]
    fn image_id_field_is_skipped() {
        let mut bytes = header(TYPE_GRAYSCALE, 1, 1, 8, 0);
        bytes[0] = 3;
        bytes.extend_from_slice(b"abc");
        bytes.push(42);

        let image = parse_tga(&bytes).unwrap();
        assert_eq!(image.pixels, vec![42, 42, 42, 255]);
    }

    #[test]
    fn truncated_header_and_pixels() {
        assert!(matches!(
            parse_tga(&[0; 5]),
            Err(TgaError::Truncated { expected: 18, actual: 5 })
        ));

        let mut bytes = header(TYPE_TRUE_COLOR, 2, 2, 32, 0);
        bytes.extend_from_slice(&[0; 10]);
        assert!(matches!(
            parse_tga(&bytes),
            Err(TgaError::Truncated { expected: 34, actual: 28 })
        ));
    }

    #[test]
    fn unsupported_variants_are_rejected() {
        assert!(matches!(
            parse_tga(&header(10, 1, 1, 32, 0)),
            Err(TgaError::UnsupportedImageType(10))
        ));
        assert!(matches!(
            parse_tga(&header(TYPE_TRUE_COLOR, 1, 1, 16, 0)),
            Err(TgaError::UnsupportedBitDepth { image_type: 2, bits: 16 })
        ));
        assert!(matches!(
            parse_tga(&header(TYPE_TRUE_COLOR, 0, 4, 32, 0)),
            Err(TgaError::ZeroDimension)
        ));

        let mut mapped = header(1, 1, 1, 8, 0);
        mapped[1] = 1;
        assert!(matches!(parse_tga(&mapped), Err(TgaError::ColorMapped)));
    }

    #[test]
    fn encoder_output_decodes_back() {
        let pixels = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let image = parse_tga(&encode_tga(2, 2, &pixels)).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.pixels, pixels);
    }
}
