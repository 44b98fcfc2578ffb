//! Image file decoding into CPU-side [`TextureData`].

use std::path::{Path, PathBuf};

use image::{RgbaImage, imageops::FilterType};
use thiserror::Error;

use crate::material::TextureData;

pub mod gltf_parser;
pub mod tga_parser;

use tga_parser::TgaError;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to read texture {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode TGA {path}: {source}")]
    Tga { path: PathBuf, source: TgaError },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// How a texture file is turned into GPU-ready pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureOptions {
    pub generate_mipmaps: bool,
    /// Interpret the pixels as sRGB-encoded color.
    pub srgb: bool,
    /// Reverse the row order after decoding.
    pub flip_vertically: bool,
}

impl TextureOptions {
    /// Options used for material maps: mipmapped, linear, flipped so the
    /// UV origin matches the mesh convention.
    pub const MATERIAL: Self = Self {
        generate_mipmaps: true,
        srgb: false,
        flip_vertically: true,
    };
}

/// Loads an image file into BGRA8 texture data.
///
/// `.tga` files are checked against the supported TGA subset first;
/// every format is decoded by the `image` crate.
pub fn load_texture(path: &Path, options: &TextureOptions) -> Result<TextureData, TextureError> {
    let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_tga = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tga"));

    let (width, height, mut pixels) = if is_tga {
        let image = tga_parser::parse_tga(&bytes).map_err(|source| TextureError::Tga {
            path: path.to_path_buf(),
            source,
        })?;
        (image.width, image.height, image.pixels)
    } else {
        let image = image::load_from_memory(&bytes)
            .map_err(|source| TextureError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let mut pixels = image.into_raw();
        rgba_to_bgra(&mut pixels);
        (width, height, pixels)
    };

    if options.flip_vertically {
        flip_rows(&mut pixels, width, height);
    }

    let mips = if options.generate_mipmaps {
        build_mip_chain(width, height, pixels)
    } else {
        vec![pixels]
    };

    log::debug!(
        "Decoded texture {} ({}x{}, {} mip levels)",
        path.display(),
        width,
        height,
        mips.len()
    );

    Ok(TextureData {
        name: path.display().to_string(),
        width,
        height,
        mips,
        srgb: options.srgb,
    })
}

pub(crate) fn rgba_to_bgra(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

fn flip_rows(pixels: &mut [u8], width: u32, height: u32) {
    let row_len = width as usize * 4;
    let height = height as usize;
    for y in 0..height / 2 {
        let (top, bottom) = pixels.split_at_mut((height - 1 - y) * row_len);
        top[y * row_len..(y + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
    }
}

/// Number of levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Builds every mip level from `base`. Channel order does not matter for
/// filtering, so the BGRA bytes go through `RgbaImage` untouched.
fn build_mip_chain(width: u32, height: u32, base: Vec<u8>) -> Vec<Vec<u8>> {
    let levels = mip_level_count(width, height);
    let mut mips = Vec::with_capacity(levels as usize);

    let Some(mut current) = RgbaImage::from_raw(width, height, base.clone()) else {
        return vec![base];
    };
    mips.push(base);

    for _ in 1..levels {
        let w = (current.width() / 2).max(1);
        let h = (current.height() / 2).max(1);
        current = image::imageops::resize(&current, w, h, FilterType::Triangle);
        mips.push(current.as_raw().clone());
    }

    mips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_counts() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(300, 10), 9);
    }

    #[test]
    fn tga_with_material_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.tga");
        // 2x2, rows top to bottom: red, green / blue, white (BGRA)
        let pixels = [
            0, 0, 255, 255, 0, 255, 0, 255, //
            255, 0, 0, 255, 255, 255, 255, 255,
        ];
        std::fs::write(&path, tga_parser::encode_tga(2, 2, &pixels)).unwrap();

        let plain = load_texture(&path, &TextureOptions::default()).unwrap();
        assert_eq!(plain.mips.len(), 1);
        assert_eq!(plain.pixels(), &pixels);

        let material = load_texture(&path, &TextureOptions::MATERIAL).unwrap();
        assert_eq!(material.mips.len(), 2);
        assert_eq!(material.mips[1].len(), 4);
        // flipped: the bottom row now comes first
        assert_eq!(&material.pixels()[..8], &pixels[8..]);
        assert_eq!(&material.pixels()[8..], &pixels[..8]);
        assert!(!material.srgb);
    }

    #[test]
    fn png_is_converted_to_bgra() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbaImage::from_raw(1, 1, vec![255, 0, 0, 255])
            .unwrap()
            .save(&path)
            .unwrap();

        let texture = load_texture(&path, &TextureOptions::default()).unwrap();
        assert_eq!(texture.pixels(), &[0, 0, 255, 255]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_texture(Path::new("/nope/missing.tga"), &TextureOptions::default()).unwrap_err();
        assert!(matches!(err, TextureError::Io { .. }));
    }

    #[test]
    fn corrupt_tga_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tga");
        std::fs::write(&path, [0u8; 4]).unwrap();

        let err = load_texture(&path, &TextureOptions::default()).unwrap_err();
        assert!(matches!(err, TextureError::Tga { .. }));
    }
}
