use super::traits::{FrameDirectory, FrameFormat, FrameIoError};
use nalgebra::Point3;
use std::io::Write;

/// ASCII PLY point cloud with a single `vertex` element, readable by most renderers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlyFormat;

pub type PlyFrameWriter = FrameDirectory<PlyFormat>;

impl FrameFormat for PlyFormat {
    const EXTENSION: &'static str = "ply";
    type Error = FrameIoError;

    fn write_to(positions: &[Point3<f32>], writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format ascii 1.0")?;
        writeln!(writer, "comment generated by mpm3d")?;
        writeln!(writer, "element vertex {}", positions.len())?;
        for axis in ["x", "y", "z"] {
            writeln!(writer, "property float {}", axis)?;
        }
        writeln!(writer, "end_header")?;
        for p in positions {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }
        Ok(())
    }
}
