//! Session log: one `elapsed_time_s,ema_value` row per smoothed sample.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::SmoothedPoint;

/// Header row of every session log.
pub const LOG_HEADER: &str = "elapsed_time_s,ema_value";

/// Give up looking for a free file name after this many suffixes.
const MAX_NAME_COLLISIONS: u32 = 100;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("log line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("log has no 'elapsed_time_s,ema_value' header")]
    MissingHeader,
}

/// Append-only writer for the session log.
pub struct SeriesLog {
    writer: Box<dyn Write + Send>,
    path: Option<PathBuf>,
    rows_written: u64,
}

impl std::fmt::Debug for SeriesLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesLog")
            .field("path", &self.path)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl SeriesLog {
    /// Create `<dir>/<prefix>_<unix_seconds>.csv` and write the header.
    ///
    /// Never overwrites: on a name clash a `_<n>` suffix is appended.
    pub fn create(dir: &Path, prefix: &str) -> Result<Self, LogError> {
        fs::create_dir_all(dir)?;

        let stamp = chrono::Utc::now().timestamp();
        let mut attempt = 0;
        let (file, path) = loop {
            let name = if attempt == 0 {
                format!("{prefix}_{stamp}.csv")
            } else {
                format!("{prefix}_{stamp}_{attempt}.csv")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (file, path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_NAME_COLLISIONS => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        // Unbuffered: every row is flushed anyway
        let mut log = Self::from_writer(file)?;
        log.path = Some(path);
        tracing::info!(path = %log.path.as_deref().unwrap_or(dir).display(), "Session log created");
        Ok(log)
    }

    /// Wrap an arbitrary writer (tests, pipes) and write the header.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Result<Self, LogError> {
        let mut log = Self {
            writer: Box::new(writer),
            path: None,
            rows_written: 0,
        };
        writeln!(log.writer, "{LOG_HEADER}")?;
        log.writer.flush()?;
        Ok(log)
    }

    /// Write one row and flush it.
    ///
    /// A row is counted once the writer accepts it, even if the flush
    /// that follows fails.
    pub fn append(&mut self, point: &SmoothedPoint) -> Result<(), LogError> {
        let row = format!("{},{}\n", point.elapsed_time_s, point.value);
        self.writer.write_all(row.as_bytes())?;
        self.rows_written += 1;
        self.writer.flush()?;
        Ok(())
    }

    /// Final flush. The file is closed when the log is dropped.
    pub fn close(mut self) -> Result<u64, LogError> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

/// Read a session log written by [`SeriesLog`].
pub fn load_series(path: &Path) -> Result<Vec<SmoothedPoint>, LogError> {
    let contents = fs::read_to_string(path)?;
    parse_series(&contents)
}

/// Parse session log text. Whitespace around fields and blank lines are
/// tolerated.
pub fn parse_series(contents: &str) -> Result<Vec<SmoothedPoint>, LogError> {
    let mut lines = contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    match lines.next() {
        Some((_, header)) if is_header(header) => {}
        _ => return Err(LogError::MissingHeader),
    }

    let mut points = Vec::new();
    for (line, text) in lines {
        let mut fields = text.split(',').map(str::trim);
        let (Some(t), Some(v), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(LogError::Parse {
                line,
                message: format!("expected 2 fields, got '{text}'"),
            });
        };
        let parse = |field: &str, name: &str| {
            field.parse::<f64>().map_err(|e| LogError::Parse {
                line,
                message: format!("{name} '{field}': {e}"),
            })
        };
        points.push(SmoothedPoint::new(
            parse(t, "elapsed_time_s")?,
            parse(v, "ema_value")?,
        ));
    }
    Ok(points)
}

fn is_header(line: &str) -> bool {
    let mut fields = line.split(',').map(str::trim);
    matches!(
        (fields.next(), fields.next(), fields.next()),
        (Some("elapsed_time_s"), Some("ema_value"), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer whose contents stay readable after the log takes ownership.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_header_then_rows() {
        let buf = SharedBuf::default();
        let mut log = SeriesLog::from_writer(buf.clone()).unwrap();
        log.append(&SmoothedPoint::new(0.0, 0.0)).unwrap();
        log.append(&SmoothedPoint::new(0.05, -0.125)).unwrap();
        assert_eq!(log.close().unwrap(), 2);
        assert_eq!(buf.text(), "elapsed_time_s,ema_value\n0,0\n0.05,-0.125\n");
    }

    /// Accepts writes into memory but fails every flush after the header.
    #[derive(Clone, Default)]
    struct FailingFlush {
        buf: SharedBuf,
        flushes: Arc<Mutex<u32>>,
    }

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buf.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            let mut n = self.flushes.lock().unwrap();
            *n += 1;
            if *n > 1 {
                Err(io::Error::new(io::ErrorKind::Other, "device busy"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_row_counted_when_only_flush_fails() {
        let sink = FailingFlush::default();
        let mut log = SeriesLog::from_writer(sink.clone()).unwrap();
        assert!(matches!(log.append(&SmoothedPoint::new(0.0, 0.5)), Err(LogError::Io(_))));
        assert!(log.append(&SmoothedPoint::new(0.05, 0.25)).is_err());
        assert_eq!(log.rows_written(), 2);
        assert_eq!(sink.buf.text(), "elapsed_time_s,ema_value\n0,0.5\n0.05,0.25\n");
    }

    #[test]
    fn test_file_rows_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SeriesLog::create(dir.path(), "live").unwrap();
        let path = log.path().unwrap().to_path_buf();
        log.append(&SmoothedPoint::new(0.0, 1.0)).unwrap();
        log.append(&SmoothedPoint::new(0.05, 2.0)).unwrap();
        // Still open: what is on disk matches the count
        let on_disk = load_series(&path).unwrap();
        assert_eq!(on_disk.len() as u64, log.rows_written());
    }

    #[test]
    fn test_parse_tolerates_spacing_and_blank_lines() {
        let text = "elapsed_time_s, ema_value\n\n 0.0 , 1.5\n0.05,1.25 \n\n";
        let pts = parse_series(text).unwrap();
        assert_eq!(pts, vec![SmoothedPoint::new(0.0, 1.5), SmoothedPoint::new(0.05, 1.25)]);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        assert!(matches!(parse_series(""), Err(LogError::MissingHeader)));
        assert!(matches!(parse_series("0,1\n"), Err(LogError::MissingHeader)));
        match parse_series("elapsed_time_s,ema_value\n0,1\n0.05,abc\n") {
            Err(LogError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(
            parse_series("elapsed_time_s,ema_value\n1,2,3\n"),
            Err(LogError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_create_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let a = SeriesLog::create(dir.path(), "breathing_data").unwrap();
        let b = SeriesLog::create(dir.path(), "breathing_data").unwrap();
        let pa = a.path().unwrap().to_path_buf();
        let pb = b.path().unwrap().to_path_buf();
        assert_ne!(pa, pb);
        assert!(pa.file_name().unwrap().to_string_lossy().starts_with("breathing_data_"));
        assert_eq!(pa.extension().unwrap(), "csv");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SeriesLog::create(dir.path(), "session").unwrap();
        let path = log.path().unwrap().to_path_buf();
        let written: Vec<SmoothedPoint> = (0..50)
            .map(|i| SmoothedPoint::new(i as f64 * 0.05, (i as f64 * 0.3).sin()))
            .collect();
        for p in &written {
            log.append(p).unwrap();
        }
        log.close().unwrap();
        assert_eq!(load_series(&path).unwrap(), written);
    }

    #[test]
    fn test_create_in_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(matches!(
            SeriesLog::create(&blocker, "breathing_data"),
            Err(LogError::Io(_))
        ));
    }
}
