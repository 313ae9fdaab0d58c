use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use super::HistoryResult;
use crate::util::time;

/// Encodes `image` as PNG at `path`, going through a temporary file in the
/// same directory so `path` either holds the complete image or nothing.
pub(crate) fn write_png_atomically(image: &RgbaImage, path: &Path) -> HistoryResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    let result = (|| -> HistoryResult<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        image.write_to(&mut writer, ImageFormat::Png)?;
        writer.into_inner().map_err(|err| err.into_error())?.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Writes a copy of `image` into a user-visible directory, named after the
/// current local time (`drawing_<yyyyMMdd_HHmmss>.png`). An existing file
/// with that name gets a numeric suffix instead of being replaced.
pub fn export_png(image: &RgbaImage, dir: &Path) -> HistoryResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let stem = format!("drawing_{}", time::file_stamp());
    let mut path = dir.join(format!("{stem}.png"));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{suffix}.png"));
        suffix += 1;
    }

    write_png_atomically(image, &path)?;
    log::info!("Exported drawing to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255]));

        let first = export_png(&image, dir.path()).unwrap();
        let second = export_png(&image, dir.path()).unwrap();

        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("drawing_") && name.ends_with(".png"));
        assert_eq!(image::open(&second).unwrap().to_rgba8(), image);
    }

    #[test]
    fn test_export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Pictures").join("board");
        let image = RgbaImage::new(2, 2);

        let path = export_png(&image, &target).unwrap();
        assert!(path.starts_with(&target));
        assert!(path.is_file());
    }
}
