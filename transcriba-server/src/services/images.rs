//! Image files of imported objects
//!
//! Layout below the import directory:
//!
//! ```text
//! <imports>/<object id>/raw.jpg
//! <imports>/<object id>/thumbnail.jpg
//! <imports>/<object id>/overview.jpg
//! <imports>/<object id>/tiled/<zoom>/<y>/<x>.jpg
//! ```
//!
//! Only `raw.jpg` is written by this service; the other files come from the
//! external tiler. A tile the tiler did not produce is answered with a blank
//! semi-transparent PNG so the viewer can draw edges and out-of-range tiles.

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use transcriba_common::models::TranscribaObject;
use transcriba_common::{Entity, Error, Result};

pub const RAW_IMAGE: &str = "raw.jpg";
pub const THUMBNAIL: &str = "thumbnail.jpg";
pub const OVERVIEW: &str = "overview.jpg";

/// Fill of tiles missing from the pyramid
const BLANK_TILE: Rgba<u8> = Rgba([255, 255, 255, 128]);

/// Folder of one object; the id must be a single plain path component
pub fn object_dir(imports: &Path, object_id: &str) -> Result<PathBuf> {
    let mut components = Path::new(object_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == object_id => Ok(imports.join(name)),
        _ => Err(Error::NotFound(Entity::Directory)),
    }
}

/// Existing file inside an object's folder
fn object_file(imports: &Path, object_id: &str, relative: &Path) -> Result<PathBuf> {
    let dir = object_dir(imports, object_id)?;
    if !dir.is_dir() {
        return Err(Error::NotFound(Entity::Directory));
    }
    let path = dir.join(relative);
    if !path.is_file() {
        return Err(Error::NotFound(Entity::Image));
    }
    Ok(path)
}

pub fn tile(imports: &Path, object_id: &str, zoom: u32, x: u32, y: u32) -> Result<PathBuf> {
    let relative = Path::new("tiled")
        .join(zoom.to_string())
        .join(y.to_string())
        .join(format!("{}.jpg", x));
    object_file(imports, object_id, &relative)
}

/// Blank `size`x`size` PNG served for tiles that do not exist
pub fn blank_tile(size: u32) -> Result<Vec<u8>> {
    let tile = RgbaImage::from_pixel(size, size, BLANK_TILE);
    let mut png = Cursor::new(Vec::new());
    tile.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| Error::Internal(format!("Cannot encode blank tile: {}", e)))?;
    Ok(png.into_inner())
}

pub fn thumbnail(imports: &Path, object_id: &str) -> Result<PathBuf> {
    object_file(imports, object_id, Path::new(THUMBNAIL))
}

pub fn overview(imports: &Path, object_id: &str) -> Result<PathBuf> {
    object_file(imports, object_id, Path::new(OVERVIEW))
}

/// Content type by file extension
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// `[width, height]` of the raw image
pub fn dimensions(object: &TranscribaObject) -> Result<[i64; 2]> {
    match (object.width, object.height) {
        (Some(width), Some(height)) => Ok([width, height]),
        _ => Err(Error::NotFound(Entity::Image)),
    }
}

/// Smallest `i` with `2^i >= value`
pub fn ceil_log2(value: f64) -> u32 {
    let mut i = 0;
    while 2f64.powi(i as i32) < value {
        i += 1;
    }
    i
}

/// Number of zoom levels of the tile pyramid
pub fn zoomsteps(width: i64, height: i64, tile_size: u32) -> u32 {
    let longest = width.max(height) as f64;
    ceil_log2(longest / f64::from(tile_size)) + 1
}

/// Width and height read from the header of any common image format
pub fn image_dimensions(bytes: &[u8]) -> Option<(i64, i64)> {
    let size = imagesize::blob_size(bytes).ok()?;
    Some((i64::try_from(size.width).ok()?, i64::try_from(size.height).ok()?))
}

#[cfg(test)]
pub(crate) fn sample_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    // APP0 segment to skip over
    bytes.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
    bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[0x08, 0x06, 0x00, 0x00, 0x00]);
    // CRC is not checked by header readers
    bytes.extend_from_slice(&[0x00; 4]);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoomsteps() {
        assert_eq!(zoomsteps(4096, 3000, 256), 5);
        assert_eq!(zoomsteps(256, 256, 256), 1);
        assert_eq!(zoomsteps(257, 100, 256), 2);
        assert_eq!(zoomsteps(100, 100, 256), 1);
    }

    #[test]
    fn test_image_dimensions() {
        assert_eq!(image_dimensions(&sample_jpeg(4096, 3000)), Some((4096, 3000)));
        assert_eq!(image_dimensions(&sample_png(1000, 800)), Some((1000, 800)));
        assert_eq!(image_dimensions(b"not an image"), None);
    }

    #[test]
    fn test_object_dir_rejects_paths() {
        let imports = Path::new("/srv/imports");
        assert_eq!(object_dir(imports, "abc-123").unwrap(), imports.join("abc-123"));
        for id in ["../leak", "/etc", "a/b", "..", ".", ""] {
            assert!(
                matches!(object_dir(imports, id), Err(Error::NotFound(Entity::Directory))),
                "{:?} was accepted",
                id
            );
        }
    }

    #[test]
    fn test_blank_tile_is_png_of_tile_size() {
        let png = blank_tile(256).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(image_dimensions(&png), Some((256, 256)));
    }

    #[test]
    fn test_missing_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            thumbnail(dir.path(), "obj"),
            Err(Error::NotFound(Entity::Directory))
        ));

        std::fs::create_dir_all(dir.path().join("obj")).unwrap();
        assert!(matches!(
            tile(dir.path(), "obj", 0, 0, 0),
            Err(Error::NotFound(Entity::Image))
        ));

        let tile_dir = dir.path().join("obj/tiled/2/1");
        std::fs::create_dir_all(&tile_dir).unwrap();
        std::fs::write(tile_dir.join("3.jpg"), b"tile").unwrap();
        let path = tile(dir.path(), "obj", 2, 3, 1).unwrap();
        assert_eq!(content_type(&path), "image/jpeg");
    }
}
