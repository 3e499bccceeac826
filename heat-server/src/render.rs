//! PNG rendering of the field and the on-disk image directory.

use heat_core::{Field, grayscale};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Encodes the field as an 8-bit grayscale `n x n` PNG.
pub fn encode_png(field: &Field) -> Result<Vec<u8>, png::EncodingError> {
    let side = field.n() as u32;
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, side, side);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&grayscale(field))?;
        writer.finish()?;
    }
    Ok(out)
}

/// One line of `steps.jsonl`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step_count: u64,
    pub n: usize,
    pub iterations: u32,
    pub beta: f32,
    pub kernel_ms: f64,
}

/// Directory receiving `heat_image<step>.png` files and the step log.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub const RECORD_FILE: &'static str = "steps.jsonl";

    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<ImageStore> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(ImageStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, step_count: u64) -> PathBuf {
        self.dir.join(format!("heat_image{step_count}.png"))
    }

    pub fn write_image(&self, step_count: u64, png_bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.image_path(step_count);
        fs::write(&path, png_bytes)?;
        Ok(path)
    }

    pub fn append_record(&self, record: &StepRecord) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(Self::RECORD_FILE))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer(&mut w, record)?;
        w.write_all(b"\n")?;
        w.flush()
    }

    /// Removes every `.png` in the directory. Returns how many were removed.
    pub fn clear_images(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "png") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("heat-render-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn png_header_and_dimensions() {
        let field = Field::from_vec(3, vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0, 0.5, 1.0]).unwrap();
        let bytes = encode_png(&field).unwrap();
        assert_eq!(&bytes[..8], &PNG_MAGIC);

        let decoder = png::Decoder::new(bytes.as_slice());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (3, 3));
        assert_eq!(info.color_type, png::ColorType::Grayscale);
        assert_eq!(&buf[..3], &[0, 128, 255]);
    }

    #[test]
    fn store_writes_and_clears_images() {
        let dir = temp_dir("store");
        let store = ImageStore::open(&dir).unwrap();
        store.write_image(1, &PNG_MAGIC).unwrap();
        store.write_image(2, &PNG_MAGIC).unwrap();
        assert!(store.image_path(2).exists());

        store
            .append_record(&StepRecord { step_count: 1, n: 4, iterations: 1, beta: 0.5, kernel_ms: 0.1 })
            .unwrap();

        assert_eq!(store.clear_images().unwrap(), 2);
        assert!(!store.image_path(1).exists());
        // the step log is not an image and survives
        assert!(dir.join(ImageStore::RECORD_FILE).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn records_are_json_lines() {
        let dir = temp_dir("records");
        let store = ImageStore::open(&dir).unwrap();
        for step_count in 1..=2 {
            let rec = StepRecord { step_count, n: 8, iterations: 3, beta: 0.25, kernel_ms: 1.5 };
            store.append_record(&rec).unwrap();
        }
        let text = fs::read_to_string(dir.join(ImageStore::RECORD_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let row: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(row["step_count"], 2);
        assert_eq!(row["beta"], 0.25);

        fs::remove_dir_all(&dir).unwrap();
    }
}
