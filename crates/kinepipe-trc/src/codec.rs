//! Reader and writer for `.trc` marker-trajectory files.
//!
//! A trajectory file is plain text:
//!
//! ```text
//! PathFileType  4  (X/Y/Z)  trial.trc        ┐
//! DataRate  CameraRate  NumFrames  ...         │
//! 30.0  30.0  120  ...                         │ 5 header lines, kept verbatim
//! Frame#  Time  Hip      RKnee ...             │
//!         X1  Y1  Z1  X2  Y2  Z2 ...           ┘
//! 1  0.0000  0.1021  0.9833  1.2040  ...     ← tab-separated body
//! ```
//!
//! Body column 0 is the frame index, column 1 the time in seconds, and the
//! remaining columns repeating X/Y/Z triples, one per marker.  The frame and
//! time fields keep their original text so they survive a rewrite
//! byte-for-byte; coordinates are rewritten with
//! [`COORDINATE_DECIMALS`] fractional digits.  An empty coordinate cell is an
//! untracked marker: it is read as NaN and written back empty.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use kinepipe_types::KineError;

use crate::rotation::Vec3;

/// Number of header lines preceding the numeric body.
pub const HEADER_LINES: usize = 5;

/// Fractional digits used when writing coordinates.
pub const COORDINATE_DECIMALS: usize = 4;

/// Leading metadata columns (frame index, time).
const META_COLUMNS: usize = 2;

/// One body record.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRow {
    frame_index: i64,
    time: f64,
    frame_text: String,
    time_text: String,
    points: Vec<Vec3>,
}

impl TrajectoryRow {
    pub fn frame_index(&self) -> i64 {
        self.frame_index
    }

    /// Time stamp in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Mutable access to the coordinates.  The slice length is fixed so the
    /// per-row marker count cannot drift.
    pub fn points_mut(&mut self) -> &mut [Vec3] {
        &mut self.points
    }
}

/// An in-memory `.trc` file: verbatim header plus parsed body.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryFile {
    header: Vec<String>,
    rows: Vec<TrajectoryRow>,
    line_ending: &'static str,
}

impl TrajectoryFile {
    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// [`KineError::Io`] if the file cannot be read, [`KineError::Format`] if
    /// its content is malformed (see [`TrajectoryFile::parse`]).
    pub fn read(path: &Path) -> Result<Self, KineError> {
        let text = fs::read_to_string(path).map_err(|e| KineError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Parse trajectory text.  `origin` is only used in error messages.
    ///
    /// Fails with [`KineError::Format`] when there are fewer than
    /// [`HEADER_LINES`] lines, when the first body row is not `2 + 3k` columns
    /// wide, when a later row's width differs from the first, or when a frame
    /// index, time or coordinate field cannot be parsed.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, KineError> {
        // `str::lines` strips the '\r', so inspect the raw first line.
        let line_ending = if text.split('\n').next().is_some_and(|l| l.ends_with('\r')) {
            "\r\n"
        } else {
            "\n"
        };

        let mut lines = text.lines();
        let header: Vec<String> = lines.by_ref().take(HEADER_LINES).map(str::to_string).collect();
        if header.len() < HEADER_LINES {
            return Err(format_error(
                origin,
                header.len(),
                format!(
                    "expected a {HEADER_LINES}-line header, file has only {} line(s)",
                    header.len()
                ),
            ));
        }

        let mut rows = Vec::new();
        let mut width: Option<usize> = None;
        for (idx, line) in lines.enumerate() {
            let line_no = HEADER_LINES + idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let expected = match width {
                Some(w) => w,
                None => {
                    let w = fields.len();
                    if w < META_COLUMNS || (w - META_COLUMNS) % 3 != 0 {
                        return Err(format_error(
                            origin,
                            line_no,
                            format!("{w} columns is not frame, time and X/Y/Z triples"),
                        ));
                    }
                    width = Some(w);
                    w
                }
            };
            if fields.len() != expected {
                return Err(format_error(
                    origin,
                    line_no,
                    format!("expected {expected} columns, found {}", fields.len()),
                ));
            }
            rows.push(parse_row(&fields, origin, line_no)?);
        }

        Ok(Self {
            header,
            rows,
            line_ending,
        })
    }

    /// The five header lines, without line terminators.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[TrajectoryRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [TrajectoryRow] {
        &mut self.rows
    }

    /// Number of markers per row (0 for an empty body).
    pub fn marker_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.points.len())
    }

    /// Serialise to text: header verbatim, then one tab-separated line per
    /// row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            out.push_str(line);
            out.push_str(self.line_ending);
        }
        for row in &self.rows {
            out.push_str(&row.frame_text);
            out.push('\t');
            out.push_str(&row.time_text);
            for p in &row.points {
                for v in [p.x, p.y, p.z] {
                    out.push('\t');
                    if !v.is_nan() {
                        out.push_str(&format!("{v:.prec$}", prec = COORDINATE_DECIMALS));
                    }
                }
            }
            out.push_str(self.line_ending);
        }
        out
    }

    /// Replace the file at `path` with this content.
    ///
    /// The text is written to a temporary file in the same directory, synced,
    /// and renamed over `path`, so readers see either the old file or the new
    /// one in full.  An existing file keeps its permissions, and a symlink is
    /// left in place with its target rewritten.
    pub fn write(&self, path: &Path) -> Result<(), KineError> {
        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| KineError::io(&dir, e))?;
        tmp.write_all(self.render().as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| KineError::io(tmp.path(), e))?;
        // The temporary is created owner-only.
        if let Ok(meta) = fs::metadata(&target) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| KineError::io(tmp.path(), e))?;
        }
        tmp.persist(&target).map_err(|e| KineError::io(&target, e.error))?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn format_error(path: &Path, line: usize, details: String) -> KineError {
    KineError::Format {
        path: path.to_path_buf(),
        line,
        details,
    }
}

fn parse_row(fields: &[&str], origin: &Path, line_no: usize) -> Result<TrajectoryRow, KineError> {
    let frame_text = fields[0];
    let frame_index = frame_text.trim().parse::<i64>().map_err(|_| {
        format_error(origin, line_no, format!("frame index '{frame_text}' is not an integer"))
    })?;

    let time_text = fields[1];
    let time = time_text
        .trim()
        .parse::<f64>()
        .map_err(|_| format_error(origin, line_no, format!("time '{time_text}' is not a number")))?;

    let coords = &fields[META_COLUMNS..];
    let mut values = Vec::with_capacity(coords.len());
    for (col, raw) in coords.iter().enumerate() {
        let raw = raw.trim();
        let v = if raw.is_empty() {
            f64::NAN
        } else {
            raw.parse::<f64>().map_err(|_| {
                format_error(
                    origin,
                    line_no,
                    format!("column {}: '{raw}' is not a number", col + META_COLUMNS + 1),
                )
            })?
        };
        values.push(v);
    }
    let points = values
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect();

    Ok(TrajectoryRow {
        frame_index,
        time,
        frame_text: frame_text.to_string(),
        time_text: time_text.to_string(),
        points,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
