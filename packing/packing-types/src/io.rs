//! Sphere decomposition file I/O.
//!
//! Sphere decompositions and mesh kernels are stored as plain text, one
//! sphere per line:
//!
//! ```text
//! # x y z r
//! 0.0 0.0 0.0 0.5
//! 1.0, 0.0, 0.0, 0.25
//! ```
//!
//! Fields are separated by whitespace or commas. Blank lines and lines
//! starting with `#` or `//` are skipped. Unlike loose point-cloud readers,
//! a malformed record is an error rather than being skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use tracing::debug;

use crate::error::{PackingError, PackingResult};
use crate::sphere::SphereSet;

/// Reads a sphere set from an `xyzr` file.
///
/// # Errors
///
/// Returns [`PackingError::Io`] if the file cannot be read and
/// [`PackingError::InvalidContent`] for a malformed record.
pub fn read_xyzr<P: AsRef<Path>>(path: P) -> PackingResult<SphereSet> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let spheres = parse_records(BufReader::new(file))?;
    debug!(path = %path.display(), spheres = spheres.len(), "Read sphere decomposition");
    Ok(spheres)
}

/// Parses a sphere set from `xyzr` text.
///
/// # Errors
///
/// Returns [`PackingError::InvalidContent`] for a malformed record.
///
/// # Example
///
/// ```
/// use packing_types::parse_xyzr;
///
/// let spheres = parse_xyzr("# kernel\n0 0 0 0.5\n0.1,0.2,0.3,0.05\n").unwrap();
/// assert_eq!(spheres.len(), 2);
/// assert!(parse_xyzr("0 0 0\n").is_err());
/// ```
pub fn parse_xyzr(text: &str) -> PackingResult<SphereSet> {
    parse_records(text.as_bytes())
}

/// Writes a sphere set as `xyzr` text.
///
/// # Errors
///
/// Returns [`PackingError::Io`] if the file cannot be written.
pub fn write_xyzr<P: AsRef<Path>>(spheres: &SphereSet, path: P) -> PackingResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "# x y z r")?;
    for (c, r) in spheres.iter() {
        writeln!(writer, "{} {} {} {}", c.x, c.y, c.z, r)?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_records<R: BufRead>(reader: R) -> PackingResult<SphereSet> {
    let mut centers = Vec::new();
    let mut radii = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 4 {
            return Err(PackingError::invalid_content(
                line_no,
                format!("expected 4 fields (x y z r), found {}", fields.len()),
            ));
        }

        let mut values = [0.0; 4];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field.parse::<f64>().map_err(|_| {
                PackingError::invalid_content(line_no, format!("invalid number '{field}'"))
            })?;
        }
        let [x, y, z, r] = values;
        if !r.is_finite() || r < 0.0 {
            return Err(PackingError::invalid_content(
                line_no,
                format!("invalid radius {r}"),
            ));
        }
        centers.push(Point3::new(x, y, z));
        radii.push(r);
    }

    SphereSet::new(centers, radii)
}
