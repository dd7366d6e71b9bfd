//! Asset Resizer - Aspect-Correct Fit Into Slot Geometry
//!
//! For every image-bound column the source raster is scaled to fit fully
//! inside the slot's geometry, centered, with the remaining canvas fully
//! transparent. Never crops, never distorts. Derived assets are written
//! under `<image_root>/_fitted/` with row-and-column-scoped names and the
//! record's value is rewritten to point at them. Any resolution problem
//! is a warning that leaves the value untouched; the generated script
//! then fails per-row at execution time, not per-batch here.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::warn;

use crate::bounds::BoundsMap;
use crate::pipeline::RowWarning;
use crate::records::{Binding, Record};
use crate::slots::SlotGeometry;
use crate::FITTED_DIR;

/// Scale `src` uniformly to fit inside `geometry`, pad with transparent
/// pixels, write PNG to `dest`. The output canvas is always exactly the
/// requested geometry.
pub fn fit_image(
    src: &Path,
    geometry: SlotGeometry,
    dest: &Path,
) -> Result<(), image::ImageError> {
    let source = image::open(src)?.to_rgba8();
    let (sw, sh) = source.dimensions();
    let (bw, bh) = (geometry.width, geometry.height);

    let scale = f64::min(bw as f64 / sw as f64, bh as f64 / sh as f64);
    let fit_w = ((sw as f64 * scale).round() as u32).clamp(1, bw);
    let fit_h = ((sh as f64 * scale).round() as u32).clamp(1, bh);

    let scaled = imageops::resize(&source, fit_w, fit_h, FilterType::Lanczos3);

    // RgbaImage::new zero-fills, so the padding is already alpha = 0.
    let mut canvas = RgbaImage::new(bw, bh);
    let x = i64::from((bw - fit_w) / 2);
    let y = i64::from((bh - fit_h) / 2);
    imageops::overlay(&mut canvas, &scaled, x, y);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    canvas.save(dest)
}

/// Derived-asset path for one record column, scoped by input row so
/// repeated `product_id` values never collide. Path separators in the
/// column name are flattened so the file always lands in `_fitted/`.
pub fn derived_asset_path(image_root: &Path, row: usize, product_id: &str, column: &str) -> PathBuf {
    let safe_column = column.replace(['/', '\\'], "_");
    image_root
        .join(FITTED_DIR)
        .join(format!("r{}_{}_{}.png", row, product_id, safe_column))
}

fn resolve_source(image_root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        image_root.join(path)
    }
}

fn already_fitted(value: &str) -> bool {
    let normalized = value.replace('\\', "/");
    normalized
        .split('/')
        .any(|segment| segment == FITTED_DIR)
}

/// Resize every image-bound column of one record, rewriting values in
/// place. Returns the structured warnings for columns that were skipped;
/// the record keeps processing regardless.
pub fn fit_record_images(
    record: &mut Record,
    bounds: &BoundsMap,
    image_root: &Path,
) -> Vec<RowWarning> {
    let mut warnings = vec![];
    let mut rewrites = vec![];

    for (column, value) in &record.columns {
        let Binding::Image { slot } = Binding::classify(column) else {
            continue;
        };
        if already_fitted(value) {
            continue;
        }

        let Some(geometry) = bounds.get(&slot) else {
            warn!(product_id = %record.product_id, column = %column, "no bounds for slot, leaving value unchanged");
            warnings.push(RowWarning::MissingBounds {
                product_id: record.product_id.clone(),
                column: column.clone(),
            });
            continue;
        };

        let source = resolve_source(image_root, value);
        if !source.is_file() {
            warn!(product_id = %record.product_id, column = %column, source = %source.display(), "image file missing, leaving value unchanged");
            warnings.push(RowWarning::MissingSource {
                product_id: record.product_id.clone(),
                column: column.clone(),
                path: source,
            });
            continue;
        }

        let dest = derived_asset_path(image_root, record.row, &record.product_id, column);
        match fit_image(&source, geometry, &dest) {
            Ok(()) => rewrites.push((column.clone(), dest.to_string_lossy().into_owned())),
            Err(e) => {
                warn!(product_id = %record.product_id, column = %column, error = %e, "resize failed, leaving value unchanged");
                warnings.push(RowWarning::ResizeFailed {
                    product_id: record.product_id.clone(),
                    column: column.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for (column, value) in rewrites {
        record.set_column(&column, value);
    }
    warnings
}
