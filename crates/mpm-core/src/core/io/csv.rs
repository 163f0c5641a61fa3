use super::traits::{FrameDirectory, FrameFormat, FrameIoError};
use nalgebra::Point3;
use std::io::Write;

/// Comma-separated positions with an `x,y,z` header row, one particle per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

pub type CsvFrameWriter = FrameDirectory<CsvFormat>;

impl FrameFormat for CsvFormat {
    const EXTENSION: &'static str = "csv";
    type Error = FrameIoError;

    fn write_to(positions: &[Point3<f32>], writer: &mut impl Write) -> Result<(), Self::Error> {
        let mut csv_writer = ::csv::Writer::from_writer(writer);
        csv_writer.write_record(["x", "y", "z"])?;
        for p in positions {
            csv_writer.serialize((p.x, p.y, p.z))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
