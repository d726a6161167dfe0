//! Line reader for dump files, plain or gzip-compressed.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

/// Lines buffered between the reader thread and the producer
pub const LINE_BUFFER: usize = 1024;

/// One line of a dump and its 1-based position
pub type NumberedLine = (u64, String);

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open `path`, decompressing on the fly when it ends in `.gz`
pub fn open(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read `path` on the blocking pool and stream its lines.
///
/// The file is opened before returning so a missing file is reported here.
/// A read error is sent once and ends the stream; the stream also ends when
/// the receiver is dropped.
pub fn read_lines(path: &Path) -> io::Result<mpsc::Receiver<io::Result<NumberedLine>>> {
    let reader = open(path)?;
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let file = path.display().to_string();

    tokio::task::spawn_blocking(move || {
        let mut count = 0u64;
        for line in reader.lines() {
            count += 1;
            let failed = line.is_err();
            if tx.blocking_send(line.map(|line| (count, line))).is_err() || failed {
                break;
            }
        }
        debug!(file = %file, lines = count, "Finished reading dump");
    });

    Ok(rx)
}
