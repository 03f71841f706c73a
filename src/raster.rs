//! Image boundary: decoding layer rasters and rendering result grids.
//!
//! The cost pipeline never touches images; this module converts between `image` buffers and
//! [`Grid`]s for the CLI.

use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};

use crate::foundation::error::{TerrapathError, TerrapathResult};
use crate::foundation::grid::{Cell, Grid};
use crate::layer_cost::LayerKind;

const PATH_RGB: Rgb<u8> = Rgb([255, 0, 0]);

/// Decode an image and keep the first colour channel (0..255) as the raw layer value.
pub fn decode_layer(bytes: &[u8]) -> TerrapathResult<Grid<f64>> {
    let rgba = image::load_from_memory(bytes)
        .context("decode layer image from memory")?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Grid::from_fn(width as usize, height as usize, |c| {
        f64::from(rgba.get_pixel(c.x as u32, c.y as u32)[0])
    }))
}

pub fn load_layer(path: &Path) -> TerrapathResult<Grid<f64>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read layer '{}'", path.display()))?;
    decode_layer(&bytes)
}

/// Decode `bytes` as a layer of `kind`.
///
/// Housing density maps are drawn white for empty land and darker as density rises, so they are
/// inverted onto `0` (empty) through `255` (densest). Other kinds keep the first channel as is,
/// which leaves black roads pixels at `0`, the road value.
pub fn decode_layer_as(kind: &LayerKind, bytes: &[u8]) -> TerrapathResult<Grid<f64>> {
    Ok(oriented(kind, decode_layer(bytes)?))
}

pub fn load_layer_as(kind: &LayerKind, path: &Path) -> TerrapathResult<Grid<f64>> {
    Ok(oriented(kind, load_layer(path)?))
}

fn oriented(kind: &LayerKind, raw: Grid<f64>) -> Grid<f64> {
    match kind {
        LayerKind::HousingDensity => raw.map(|v| 255.0 - v),
        _ => raw,
    }
}

/// Decode a destination mask: any non-zero first channel marks a destination.
pub fn decode_mask(bytes: &[u8]) -> TerrapathResult<Grid<bool>> {
    Ok(decode_layer(bytes)?.map(|v| *v != 0.0))
}

pub fn load_mask(path: &Path) -> TerrapathResult<Grid<bool>> {
    let bytes = std::fs::read(path).with_context(|| format!("read mask '{}'", path.display()))?;
    decode_mask(&bytes)
}

/// Linear normalisation onto 0..255, dividing by the larger of `1` and the grid maximum.
pub fn grayscale(grid: &Grid<f64>) -> TerrapathResult<GrayImage> {
    let (width, height) = image_dims(grid.dims())?;
    let max = normalisation_max(grid);
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let v = grid[Cell::new(x as usize, y as usize)];
        Luma([(v * 255.0 / max).clamp(0.0, 255.0) as u8])
    }))
}

/// Green (cheap) through yellow to red (expensive).
pub fn cost_ramp(grid: &Grid<f64>) -> TerrapathResult<RgbImage> {
    let (width, height) = image_dims(grid.dims())?;
    let max = normalisation_max(grid);
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let v = grid[Cell::new(x as usize, y as usize)];
        ramp_rgb((v * 255.0 / max).clamp(0.0, 255.0) as i32)
    }))
}

fn ramp_rgb(scaled: i32) -> Rgb<u8> {
    let s = f64::from(scaled);
    let r = (255.0 * (s / 127.0)) as i32;
    let g = 255 - (255.0 * ((s - 128.0) / 128.0)) as i32;
    Rgb([r.clamp(0, 255) as u8, g.clamp(0, 255) as u8, 0])
}

/// `base` rendered in grayscale with every path cell painted red.
pub fn path_overlay(path: &Grid<bool>, base: &Grid<f64>) -> TerrapathResult<RgbImage> {
    path.ensure_dims(base.dims())?;
    let mut out = DynamicImage::ImageLuma8(grayscale(base)?).to_rgb8();
    for (cell, on) in path.iter() {
        if *on {
            out.put_pixel(cell.x as u32, cell.y as u32, PATH_RGB);
        }
    }
    Ok(out)
}

/// Write `image` as PNG, creating parent directories.
pub fn save_png(image: impl Into<DynamicImage>, path: &Path) -> TerrapathResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let image: DynamicImage = image.into();
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn normalisation_max(grid: &Grid<f64>) -> f64 {
    grid.values()
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(1.0, f64::max)
}

fn image_dims((width, height): (usize, usize)) -> TerrapathResult<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(TerrapathError::invalid_input(format!(
            "cannot render a {width}x{height} grid as an image"
        ))),
    }
}
