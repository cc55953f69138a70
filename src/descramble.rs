//! Reverses the site's tile shuffling.
//!
//! A scrambled page is cut into a grid of at most 200×200 tiles (roughly a
//! fifth of each dimension). Every tile except those in the last, possibly
//! clipped, column and row is moved by a cyclic shift selected by the page's
//! scramble level. The arithmetic here has to match the site exactly, pixel
//! for pixel.

use std::io::Cursor;

use image::{imageops, DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use log::trace;

use crate::error::DownloadError;

pub const GRID_DIVISOR: u32 = 5;
pub const MAX_TILE_SIZE: u32 = 200;

/// Tile partition of a `width × height` image.
///
/// `last_col` and `last_row` are zero-based indices of the final column and
/// row, not counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub last_col: u32,
    pub last_row: u32,
}

impl TileGrid {
    /// `None` for empty images, which have no grid.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let tile_width = MAX_TILE_SIZE.min(width.div_ceil(GRID_DIVISOR));
        let tile_height = MAX_TILE_SIZE.min(height.div_ceil(GRID_DIVISOR));

        Some(Self {
            width,
            height,
            tile_width,
            tile_height,
            last_col: width.div_ceil(tile_width) - 1,
            last_row: height.div_ceil(tile_height) - 1,
        })
    }

    /// Grid coordinates of the scrambled tile that belongs at `(col, row)`.
    pub fn source_tile(&self, col: u32, row: u32, level: u32) -> (u32, u32) {
        (shift(col, self.last_col, level), shift(row, self.last_row, level))
    }

    /// Size of the tile at `(col, row)`; the last column and row are clipped.
    pub fn tile_size(&self, col: u32, row: u32) -> (u32, u32) {
        (
            self.tile_width.min(self.width - col * self.tile_width),
            self.tile_height.min(self.height - row * self.tile_height),
        )
    }
}

// The last index is never moved. With a single tile along the axis (last == 0)
// every index is the last one, which also keeps the modulo away from zero.
fn shift(index: u32, last: u32, level: u32) -> u32 {
    if last == 0 || index >= last {
        return index;
    }
    ((u64::from(last - index) + u64::from(level)) % u64::from(last)) as u32
}

/// Rebuild the presentation-order image. Level 0 returns the input untouched.
pub fn descramble(image: &DynamicImage, level: u32) -> DynamicImage {
    if level == 0 {
        return image.clone();
    }
    let Some(grid) = TileGrid::new(image.width(), image.height()) else {
        return image.clone();
    };
    trace!("Descrambling {}x{} at level {} with grid {:?}", grid.width, grid.height, level, grid);

    let source = image.to_rgba8();
    let mut output = RgbaImage::new(grid.width, grid.height);

    for row in 0..=grid.last_row {
        for col in 0..=grid.last_col {
            let (src_col, src_row) = grid.source_tile(col, row, level);
            let (w, h) = grid.tile_size(col, row);
            let tile = source
                .view(src_col * grid.tile_width, src_row * grid.tile_height, w, h)
                .to_image();
            imageops::replace(
                &mut output,
                &tile,
                i64::from(col * grid.tile_width),
                i64::from(row * grid.tile_height),
            );
        }
    }

    DynamicImage::ImageRgba8(output)
}

/// Decode an encoded page, descramble it and re-encode it as PNG.
pub fn descramble_bytes(bytes: &[u8], level: u32) -> Result<Vec<u8>, DownloadError> {
    let image = image::load_from_memory(bytes)?;
    let restored = descramble(&image, level);

    let mut buffer = Cursor::new(Vec::new());
    restored.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    // Every pixel carries the grid coordinates of the tile it sits in.
    fn tagged_image(width: u32, height: u32) -> RgbaImage {
        let grid = TileGrid::new(width, height).unwrap();
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x / grid.tile_width) as u8, (y / grid.tile_height) as u8, 7, 255])
        })
    }

    // Inverse of `descramble`: puts each presentation tile where the site would.
    fn scramble(image: &RgbaImage, level: u32) -> RgbaImage {
        let grid = TileGrid::new(image.width(), image.height()).unwrap();
        let mut output = RgbaImage::new(grid.width, grid.height);
        for row in 0..=grid.last_row {
            for col in 0..=grid.last_col {
                let (src_col, src_row) = grid.source_tile(col, row, level);
                let (w, h) = grid.tile_size(col, row);
                let tile = image.view(col * grid.tile_width, row * grid.tile_height, w, h).to_image();
                imageops::replace(
                    &mut output,
                    &tile,
                    i64::from(src_col * grid.tile_width),
                    i64::from(src_row * grid.tile_height),
                );
            }
        }
        output
    }

    #[test]
    fn test_grid_for_small_image() {
        let grid = TileGrid::new(256, 256).unwrap();
        assert_eq!(grid.tile_width, 52);
        assert_eq!(grid.tile_height, 52);
        assert_eq!(grid.last_col, 4);
        assert_eq!(grid.last_row, 4);
        assert_eq!(grid.tile_size(4, 4), (48, 48));
    }

    #[test]
    fn test_grid_caps_tile_size() {
        let grid = TileGrid::new(2000, 2000).unwrap();
        assert_eq!(grid.tile_width, 200);
        assert_eq!(grid.last_col, 9);

        let tall = TileGrid::new(800, 5000).unwrap();
        assert_eq!(tall.tile_width, 160);
        assert_eq!(tall.tile_height, 200);
        assert_eq!(tall.last_col, 4);
        assert_eq!(tall.last_row, 24);
    }

    #[test]
    fn test_empty_image_has_no_grid() {
        assert!(TileGrid::new(0, 10).is_none());
        assert!(TileGrid::new(10, 0).is_none());
    }

    #[test]
    fn test_source_tile_formula() {
        let grid = TileGrid::new(250, 250).unwrap();
        assert_eq!((grid.last_col, grid.last_row), (4, 4));
        // x = (W - m + L) mod W
        assert_eq!(grid.source_tile(0, 0, 1), (1, 1));
        assert_eq!(grid.source_tile(1, 2, 1), (0, 3));
        assert_eq!(grid.source_tile(3, 0, 2), (3, 2));
        // last column and row stay put
        assert_eq!(grid.source_tile(4, 1, 3), (4, 2));
        assert_eq!(grid.source_tile(4, 4, 3), (4, 4));
    }

    #[test]
    fn test_level_zero_is_identity() {
        let image = DynamicImage::ImageRgba8(tagged_image(123, 77));
        assert_eq!(descramble(&image, 0), image);
    }

    #[test]
    fn test_tiles_land_where_the_formula_says() {
        let level = 3;
        let scrambled = tagged_image(250, 250);
        let grid = TileGrid::new(250, 250).unwrap();
        let restored = descramble(&DynamicImage::ImageRgba8(scrambled), level).to_rgba8();

        for row in 0..=grid.last_row {
            for col in 0..=grid.last_col {
                let (src_col, src_row) = grid.source_tile(col, row, level);
                let pixel = restored.get_pixel(col * grid.tile_width + 1, row * grid.tile_height + 1);
                assert_eq!((pixel[0] as u32, pixel[1] as u32), (src_col, src_row), "tile ({}, {})", col, row);
            }
        }
    }

    #[test]
    fn test_descramble_inverts_scramble() {
        let original = tagged_image(250, 250);
        for level in 1..4 {
            let scrambled = scramble(&original, level);
            assert_ne!(scrambled, original);
            let restored = descramble(&DynamicImage::ImageRgba8(scrambled), level).to_rgba8();
            assert_eq!(restored, original, "level {}", level);
        }
    }

    #[test]
    fn test_uneven_image_round_trips() {
        let original = RgbaImage::from_fn(263, 181, |x, y| Rgba([(x % 251) as u8, (y % 241) as u8, (x ^ y) as u8, 255]));
        let scrambled = scramble(&original, 5);
        let restored = descramble(&DynamicImage::ImageRgba8(scrambled.clone()), 5).to_rgba8();
        assert_eq!(restored, original);

        // the clipped corner tile is never moved
        let grid = TileGrid::new(263, 181).unwrap();
        let corner = (grid.last_col * grid.tile_width, grid.last_row * grid.tile_height);
        assert_eq!(scrambled.get_pixel(corner.0, corner.1), original.get_pixel(corner.0, corner.1));
    }

    #[test]
    fn test_single_column_only_permutes_rows() {
        let image = RgbaImage::from_fn(1, 250, |_, y| Rgba([0, (y / 50) as u8, 0, 255]));
        let grid = TileGrid::new(1, 250).unwrap();
        assert_eq!(grid.last_col, 0);

        let restored = descramble(&DynamicImage::ImageRgba8(image), 2).to_rgba8();
        assert_eq!(restored.dimensions(), (1, 250));
        for row in 0..=grid.last_row {
            let (src_col, src_row) = grid.source_tile(0, row, 2);
            assert_eq!(src_col, 0);
            assert_eq!(restored.get_pixel(0, row * 50)[1] as u32, src_row);
        }
        // row 0 comes from row (4 - 0 + 2) mod 4 = 2
        assert_eq!(restored.get_pixel(0, 0)[1], 2);
    }

    #[test]
    fn test_single_row_only_permutes_columns() {
        let image = RgbaImage::from_fn(250, 1, |x, _| Rgba([(x / 50) as u8, 0, 0, 255]));
        let restored = descramble(&DynamicImage::ImageRgba8(image), 1).to_rgba8();
        assert_eq!(restored.dimensions(), (250, 1));
        assert_eq!(restored.get_pixel(0, 0)[0], 1);
        assert_eq!(restored.get_pixel(249, 0)[0], 4);
    }

    #[test]
    fn test_large_level_does_not_overflow() {
        let grid = TileGrid::new(250, 250).unwrap();
        // (4 - 0 + 4294967295) mod 4
        assert_eq!(grid.source_tile(0, 0, u32::MAX), (3, 3));
    }

    #[test]
    fn test_descramble_bytes_outputs_png() {
        let image = DynamicImage::ImageRgba8(tagged_image(120, 90));
        let mut encoded = Cursor::new(Vec::new());
        image.write_to(&mut encoded, ImageFormat::Png).unwrap();

        let png = descramble_bytes(encoded.get_ref(), 2).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }

    #[test]
    fn test_descramble_bytes_rejects_garbage() {
        assert!(matches!(descramble_bytes(b"not an image", 1), Err(DownloadError::ImageProcessingError(_))));
    }
}
