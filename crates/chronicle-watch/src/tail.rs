//! Rotation/truncation-resilient log tailing.
//!
//! A [`LogTailer`] owns a live read cursor into one watched log file and
//! yields newly appended complete lines on each poll. Log-rotation tools
//! replace or truncate the file underneath us, so when a poll finds no new
//! line the tailer compares the on-disk identity (device + inode) and length
//! against its cursor and transparently reopens from the start of the new
//! file when either changed. The cursor is live-only: it is not persisted
//! across process restarts.
//!
//! Invariants:
//!
//! - Lines from one file are yielded in file order, exactly once each.
//! - Only complete newline-terminated lines are yielded; a trailing
//!   unterminated line rewinds the cursor and is retried next poll.
//! - A missing file is never fatal; polls yield nothing until it appears.

use std::fs::{File, Metadata};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Where a freshly watched file is first read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Skip existing content; only lines appended after open are yielded.
    End,
    /// Read the file from the beginning.
    Beginning,
}

/// Identity token for an open file, used to detect replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn identity_of(meta: &Metadata) -> FileIdentity {
    use std::os::unix::fs::MetadataExt;
    FileIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
    }
}

// Without inode identity only length shrinkage can signal rotation.
#[cfg(not(unix))]
fn identity_of(_meta: &Metadata) -> FileIdentity {
    FileIdentity { dev: 0, ino: 0 }
}

/// Live read cursor into an open log file.
struct Cursor {
    reader: BufReader<File>,
    identity: FileIdentity,
    offset: u64,
}

impl Cursor {
    fn open(path: &Path, start: StartPosition) -> io::Result<Self> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        let offset = match start {
            StartPosition::End => meta.len(),
            StartPosition::Beginning => 0,
        };
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(offset))?;
        Ok(Self {
            reader,
            identity: identity_of(&meta),
            offset,
        })
    }

    /// Read the next complete line, or `None` when no terminated line is
    /// available yet. A partial trailing line rewinds the cursor so the
    /// bytes are re-read once the terminator arrives.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            self.reader.seek(SeekFrom::Start(self.offset))?;
            return Ok(None);
        }
        self.offset = self
            .offset
            .saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
        let mut line = String::from_utf8_lossy(&buf).into_owned();
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// Tails one log file, surviving rotation and truncation.
pub struct LogTailer {
    path: PathBuf,
    start: StartPosition,
    cursor: Option<Cursor>,
}

impl LogTailer {
    /// Create a tailer for `path`. The file is not opened until the first
    /// [`poll`](Self::poll); a file missing at startup is not an error.
    pub fn new(path: impl Into<PathBuf>, start: StartPosition) -> Self {
        Self {
            path: path.into(),
            start,
            cursor: None,
        }
    }

    /// The watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return all complete lines appended since the last poll, in file
    /// order. Never blocks waiting for data.
    pub fn poll(&mut self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.cursor.is_none() {
            match Cursor::open(&self.path, self.start) {
                Ok(cursor) => {
                    tracing::info!(path = %self.path.display(), "Watching log file");
                    self.cursor = Some(cursor);
                }
                // Missing or unreadable: yield nothing, retry next poll.
                Err(_) => return lines,
            }
        }

        loop {
            let Some(cursor) = self.cursor.as_mut() else {
                break;
            };
            match cursor.next_line() {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {
                    if self.reopen_if_rotated() {
                        continue;
                    }
                    break;
                }
                Err(error) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %error,
                        "Log read failed, will reopen"
                    );
                    self.cursor = None;
                    break;
                }
            }
        }

        lines
    }

    /// Check the on-disk file against the cursor; reopen from the start of
    /// the new file when it was replaced or truncated. Returns whether a
    /// reopen happened (new lines may now be available).
    fn reopen_if_rotated(&mut self) -> bool {
        let Some(cursor) = self.cursor.as_ref() else {
            return false;
        };
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            // Temporarily missing (mid-rotation): keep the handle, retry
            // next poll.
            Err(_) => return false,
        };

        let replaced = identity_of(&meta) != cursor.identity;
        let truncated = meta.len() < cursor.offset;
        if !replaced && !truncated {
            return false;
        }

        tracing::info!(
            path = %self.path.display(),
            replaced,
            truncated,
            "Log file rotated, reopening"
        );
        match Cursor::open(&self.path, StartPosition::Beginning) {
            Ok(cursor) => {
                self.cursor = Some(cursor);
                true
            }
            Err(_) => {
                self.cursor = None;
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::io::Write;

    use super::*;

    fn append(path: &Path, text: &str) {
        let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn yields_lines_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        fs::write(&path, "one\ntwo\n").unwrap();

        let mut tailer = LogTailer::new(&path, StartPosition::Beginning);
        assert_eq!(tailer.poll(), vec!["one", "two"]);
        assert!(tailer.poll().is_empty());

        append(&path, "three\n");
        assert_eq!(tailer.poll(), vec!["three"]);
    }

    #[test]
    fn start_at_end_skips_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        fs::write(&path, "old\n").unwrap();

        let mut tailer = LogTailer::new(&path, StartPosition::End);
        assert!(tailer.poll().is_empty());

        append(&path, "new\n");
        assert_eq!(tailer.poll(), vec!["new"]);
    }

    #[test]
    fn suppresses_partial_trailing_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        fs::write(&path, "partial").unwrap();

        let mut tailer = LogTailer::new(&path, StartPosition::Beginning);
        assert!(tailer.poll().is_empty());

        append(&path, " line\n");
        assert_eq!(tailer.poll(), vec!["partial line"]);
    }

    #[test]
    fn truncated_and_rewritten_file_is_read_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        fs::write(&path, "first generation line\n").unwrap();

        let mut tailer = LogTailer::new(&path, StartPosition::Beginning);
        assert_eq!(tailer.poll(), vec!["first generation line"]);

        // Truncate in place and rewrite with shorter content.
        fs::write(&path, "rewritten\n").unwrap();
        assert_eq!(tailer.poll(), vec!["rewritten"]);
    }

    #[cfg(unix)]
    #[test]
    fn replaced_file_is_read_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        fs::write(&path, "old file\n").unwrap();

        let mut tailer = LogTailer::new(&path, StartPosition::Beginning);
        assert_eq!(tailer.poll(), vec!["old file"]);

        // Rotate: move the old file aside, create a fresh one in its place.
        let rotated = dir.path().join("latest.log.1");
        fs::rename(&path, &rotated).unwrap();
        fs::write(&path, "fresh file\n").unwrap();

        assert_eq!(tailer.poll(), vec!["fresh file"]);
    }

    #[test]
    fn missing_file_yields_nothing_until_it_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");

        let mut tailer = LogTailer::new(&path, StartPosition::Beginning);
        assert!(tailer.poll().is_empty());
        assert!(tailer.poll().is_empty());

        fs::write(&path, "appeared\n").unwrap();
        assert_eq!(tailer.poll(), vec!["appeared"]);
    }

    #[test]
    fn tolerates_invalid_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        fs::write(&path, b"ok \xff\xfe line\n").unwrap();

        let mut tailer = LogTailer::new(&path, StartPosition::Beginning);
        let lines = tailer.poll();
        assert_eq!(lines.len(), 1);
        assert!(lines.first().unwrap().starts_with("ok "));
        assert!(lines.first().unwrap().ends_with(" line"));
    }
}
