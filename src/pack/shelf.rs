//! Built-in packer using shelf bin packing.
//!
//! Sprites are sorted by height (tallest first) and placed into horizontal
//! shelves no wider than a target width chosen to keep the sheet roughly
//! square. Padding is inserted between sprites, never along sheet edges.

use super::{LayoutAlgorithm, PackError, PackOptions, PackedSheet, Packer, RawBox, SheetFormat};
use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;

/// Transparent color for the sheet background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Packs images on a blocking worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShelfPacker;

impl ShelfPacker {
    /// Create a new shelf packer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Packer for ShelfPacker {
    async fn pack(
        &self,
        files: &[PathBuf],
        options: &PackOptions,
    ) -> Result<PackedSheet, PackError> {
        let files = files.to_vec();
        let options = options.clone();

        tokio::task::spawn_blocking(move || pack_files(&files, &options))
            .await
            .map_err(|e| PackError::Task(e.to_string()))?
    }
}

/// Result of laying out sprite sizes, before any pixels are touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Position of each input, in input order
    pub positions: Vec<(u32, u32)>,
    /// Final sheet width
    pub width: u32,
    /// Final sheet height
    pub height: u32,
}

/// A shelf in the shelf packing algorithm
#[derive(Debug)]
struct Shelf {
    y: u64,
    height: u64,
    width_used: u64,
}

/// Decode, lay out, compose and encode a sheet synchronously.
pub fn pack_files(files: &[PathBuf], options: &PackOptions) -> Result<PackedSheet, PackError> {
    if files.is_empty() {
        return Err(PackError::Empty);
    }

    let sprites = files
        .par_iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgba8())
                .map_err(|source| PackError::Decode { path: path.clone(), source })
        })
        .collect::<Result<Vec<RgbaImage>, PackError>>()?;

    let sizes: Vec<(u32, u32)> = sprites.iter().map(|s| (s.width(), s.height())).collect();
    let layout = layout_sprites(&sizes, options)?;

    let mut sheet = RgbaImage::from_pixel(layout.width, layout.height, TRANSPARENT);
    let mut coordinates = BTreeMap::new();

    for ((path, sprite), &(x, y)) in files.iter().zip(&sprites).zip(&layout.positions) {
        image::imageops::replace(&mut sheet, sprite, i64::from(x), i64::from(y));
        coordinates.insert(
            path.to_string_lossy().into_owned(),
            RawBox { x, y, width: sprite.width(), height: sprite.height() },
        );
    }

    let image = encode_sheet(sheet, options.format)?;

    Ok(PackedSheet { image, coordinates, width: layout.width, height: layout.height })
}

/// Compute sprite positions for the given sizes.
///
/// Positions and extents are computed in `u64`, so any padding is accepted.
/// Fails with [`PackError::TooLarge`] if the resulting sheet exceeds
/// `options.max_size`.
pub fn layout_sprites(sizes: &[(u32, u32)], options: &PackOptions) -> Result<Layout, PackError> {
    if sizes.is_empty() {
        return Err(PackError::Empty);
    }

    let padding = u64::from(options.padding.unwrap_or(0));
    let sizes: Vec<(u64, u64)> = sizes.iter().map(|&(w, h)| (u64::from(w), u64::from(h))).collect();
    let positions: Vec<(u64, u64)> = match options.algorithm {
        LayoutAlgorithm::BinaryTree => {
            shelf_positions(&sizes, padding, u64::from(options.max_size.0))
        }
        LayoutAlgorithm::TopDown => {
            let mut y = 0u64;
            sizes
                .iter()
                .map(|&(_, h)| {
                    let pos = (0, y);
                    y = y.saturating_add(h + padding);
                    pos
                })
                .collect()
        }
        LayoutAlgorithm::LeftRight => {
            let mut x = 0u64;
            sizes
                .iter()
                .map(|&(w, _)| {
                    let pos = (x, 0);
                    x = x.saturating_add(w + padding);
                    pos
                })
                .collect()
        }
    };

    let (mut width, mut height) =
        positions.iter().zip(&sizes).fold((1u64, 1u64), |(w, h), (&(x, y), &(sw, sh))| {
            (w.max(x.saturating_add(sw)), h.max(y.saturating_add(sh)))
        });

    if options.power_of_two {
        width = next_power_of_two(width);
        height = next_power_of_two(height);
    }

    let (max_width, max_height) = options.max_size;
    if width > u64::from(max_width) || height > u64::from(max_height) {
        return Err(PackError::TooLarge {
            width: clamp_u32(width),
            height: clamp_u32(height),
            max_width,
            max_height,
        });
    }

    // Everything now fits within max_size
    Ok(Layout {
        positions: positions.into_iter().map(|(x, y)| (clamp_u32(x), clamp_u32(y))).collect(),
        width: clamp_u32(width),
        height: clamp_u32(height),
    })
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Shelf placement, tallest first; ties keep input order.
fn shelf_positions(sizes: &[(u64, u64)], padding: u64, max_width: u64) -> Vec<(u64, u64)> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].1.cmp(&sizes[a].1));

    let target_width = target_shelf_width(sizes, padding, max_width);
    let mut shelves: Vec<Shelf> = Vec::new();
    let mut positions = vec![(0, 0); sizes.len()];

    for idx in order {
        let (w, h) = sizes[idx];
        positions[idx] = place_in_shelves(&mut shelves, w, h, padding, target_width);
    }

    positions
}

/// Width that keeps the sheet roughly square, never narrower than the widest sprite.
fn target_shelf_width(sizes: &[(u64, u64)], padding: u64, max_width: u64) -> u64 {
    let area = sizes
        .iter()
        .map(|&(w, h)| (w + padding).saturating_mul(h + padding))
        .fold(0u64, u64::saturating_add);
    let widest = sizes.iter().map(|&(w, _)| w).max().unwrap_or(1);
    let square = (area as f64).sqrt().ceil() as u64;
    square.max(widest).min(max_width.max(widest))
}

/// Place a sprite in an existing shelf or open a new one below the last.
fn place_in_shelves(
    shelves: &mut Vec<Shelf>,
    width: u64,
    height: u64,
    padding: u64,
    max_width: u64,
) -> (u64, u64) {
    for shelf in shelves.iter_mut() {
        let x = if shelf.width_used == 0 { 0 } else { shelf.width_used + padding };
        if height <= shelf.height && x + width <= max_width {
            shelf.width_used = x + width;
            return (x, shelf.y);
        }
    }

    let y = shelves.last().map(|s| s.y.saturating_add(s.height + padding)).unwrap_or(0);
    shelves.push(Shelf { y, height, width_used: width });
    (0, y)
}

/// Get the next power of two >= n
fn next_power_of_two(n: u64) -> u64 {
    n.max(1).checked_next_power_of_two().unwrap_or(u64::MAX)
}

fn encode_sheet(sheet: RgbaImage, format: SheetFormat) -> Result<Vec<u8>, PackError> {
    let image = match format {
        // JPEG has no alpha channel
        SheetFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(sheet).to_rgb8()),
        _ => DynamicImage::ImageRgba8(sheet),
    };

    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format.output_format()).map_err(PackError::Encode)?;
    Ok(bytes.into_inner())
}
