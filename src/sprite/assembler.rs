//! C7 — Sprite Assembler: pack per-layer marker PNGs into a sheet + index
//! (spec.md §4.7).
//!
//! Grounded on `examples/original_source/sprite/sprite.go::MakeSprite`
//! (glob `*.png`, horizontal packing, `@2x` duplicate, matching JSON index).
//! Rewritten against the `image` crate the way the teacher composites raster
//! tiles in `src/render/overlay.rs` (`RgbaImage`, `image::imageops::overlay`).

use std::collections::BTreeMap;
use std::path::Path;

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TileServerError};

/// Pixel rectangle of one icon inside the sprite sheet, per the Mapbox
/// sprite JSON index format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpriteMeta {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "pixelRatio")]
    pub pixel_ratio: u32,
}

/// Packs every `*.png` under `src_dir` horizontally into `<dest_base>.png` /
/// `<dest_base>@2x.png`, with matching `.json` index files.
pub fn pack(src_dir: &Path, dest_base: &Path) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(src_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Err(TileServerError::BadRequest(format!(
            "no PNG files found in {}",
            src_dir.display()
        )));
    }

    let mut images = Vec::with_capacity(entries.len());
    let mut meta = BTreeMap::new();
    let mut sprite_width = 0u32;
    let mut max_height = 0u32;

    for path in &entries {
        let img = image::open(path)
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("failed to decode {}: {e}", path.display())))?
            .to_rgba8();

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        meta.insert(
            name,
            SpriteMeta {
                x: sprite_width,
                y: 0,
                width: img.width(),
                height: img.height(),
                pixel_ratio: 1,
            },
        );

        sprite_width += img.width();
        max_height = max_height.max(img.height());
        images.push(img);
    }

    let mut sheet = RgbaImage::new(sprite_width, max_height);
    let mut x = 0i64;
    for img in &images {
        imageops::overlay(&mut sheet, img, x, 0);
        x += img.width() as i64;
    }

    save_png(&sheet, &with_suffix(dest_base, ".png"))?;
    save_png(&sheet, &with_suffix(dest_base, "@2x.png"))?;
    save_json(&meta, &with_suffix(dest_base, ".json"))?;
    save_json(&meta, &with_suffix(dest_base, "@2x.json"))?;

    Ok(())
}

fn with_suffix(base: &Path, suffix: &str) -> std::path::PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    std::path::PathBuf::from(s)
}

fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save(path)
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("failed to write sprite PNG {}: {e}", path.display())))
}

fn save_json(meta: &BTreeMap<String, SpriteMeta>, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(meta)
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("sprite index serialization failed: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_png(path: &Path, w: u32, h: u32) {
        let img = RgbaImage::new(w, h);
        img.save(path).unwrap();
    }

    #[test]
    fn packs_multiple_pngs_horizontally() {
        let dir = tempfile::tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"), 10, 20);
        write_test_png(&dir.path().join("b.png"), 15, 5);

        let dest = dir.path().join("out");
        pack(dir.path(), &dest).unwrap();

        assert!(with_suffix(&dest, ".png").exists());
        assert!(with_suffix(&dest, "@2x.png").exists());

        let json = std::fs::read_to_string(with_suffix(&dest, ".json")).unwrap();
        let meta: BTreeMap<String, SpriteMeta> = serde_json::from_str(&json).unwrap();
        assert_eq!(meta["a"].x, 0);
        assert_eq!(meta["b"].x, 10);
        assert_eq!(meta["a"].height, 20);
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        assert!(pack(dir.path(), &dest).is_err());
    }
}
