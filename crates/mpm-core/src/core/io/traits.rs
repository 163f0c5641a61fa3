use nalgebra::Point3;
use std::convert::Infallible;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameIoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// File name for a frame: the index zero-padded to four digits plus the extension.
pub fn frame_file_name(frame_index: usize, extension: &str) -> String {
    format!("{:04}.{}", frame_index, extension)
}

/// An on-disk encoding of one frame's particle positions.
pub trait FrameFormat {
    /// File extension without the leading dot.
    const EXTENSION: &'static str;

    /// The error type for write operations.
    type Error: Error + From<io::Error> + Send + Sync + 'static;

    /// Encodes `positions` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the writer reports an I/O error.
    fn write_to(positions: &[Point3<f32>], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Creates (or truncates) the file at `path` and writes `positions` to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        positions: &[Point3<f32>],
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(positions, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Consumer of per-frame position snapshots.
pub trait FrameSink {
    type Error: Error + Send + Sync + 'static;

    fn write_frame(
        &mut self,
        frame_index: usize,
        positions: &[Point3<f32>],
    ) -> Result<(), Self::Error>;
}

/// Writes every frame to its own file in a directory, using format `F`.
#[derive(Debug, Clone)]
pub struct FrameDirectory<F> {
    dir: PathBuf,
    _format: PhantomData<F>,
}

impl<F: FrameFormat> FrameDirectory<F> {
    /// Creates the directory (and parents) if needed.
    pub fn create<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            _format: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, frame_index: usize) -> PathBuf {
        self.dir.join(frame_file_name(frame_index, F::EXTENSION))
    }
}

impl<F: FrameFormat> FrameSink for FrameDirectory<F> {
    type Error = F::Error;

    fn write_frame(
        &mut self,
        frame_index: usize,
        positions: &[Point3<f32>],
    ) -> Result<(), Self::Error> {
        F::write_to_path(positions, self.path_for(frame_index))
    }
}

/// Discards every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    type Error = Infallible;

    fn write_frame(&mut self, _: usize, _: &[Point3<f32>]) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_file_name_is_zero_padded_to_four_digits() {
        assert_eq!(frame_file_name(0, "csv"), "0000.csv");
        assert_eq!(frame_file_name(42, "ply"), "0042.ply");
        assert_eq!(frame_file_name(999, "csv"), "0999.csv");
        assert_eq!(frame_file_name(12345, "csv"), "12345.csv");
    }

    #[test]
    fn null_sink_accepts_any_frame() {
        let mut sink = NullSink;
        assert!(sink.write_frame(7, &[Point3::origin()]).is_ok());
    }
}
