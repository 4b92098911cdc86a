//! Background line reader.
//!
//! Drains the output pipe line-by-line into an unbounded mpsc channel so
//! arrival time of child output is decoupled from consumption time. The
//! task owns the session's `BufReader` while it runs and hands it back on
//! completion, so bytes buffered past the sentinel survive a reader
//! restart instead of being lost with the task.

use std::fs::File;
use std::io::{BufRead, BufReader};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Spawn the reader task for one child generation.
///
/// The loop reads one line at a time, pushes it onto the queue (the
/// sentinel line included), and stops once the line equals the sentinel
/// exactly. End-of-stream or a read error also stops the loop; the queue
/// then simply ends without a sentinel and the collector reports the
/// response as incomplete.
///
/// The pipe read is synchronous, so the task runs on the blocking pool.
#[must_use]
pub fn spawn_line_reader(
    mut output: BufReader<File>,
    queue: UnboundedSender<String>,
    sentinel: String,
    generation: u64,
) -> JoinHandle<BufReader<File>> {
    tokio::task::spawn_blocking(move || {
        debug!(generation, "line reader started");

        loop {
            let mut line = String::new();
            match output.read_line(&mut line) {
                Ok(0) => {
                    debug!(generation, "output pipe closed before sentinel");
                    break;
                }
                Ok(_) => {
                    let is_sentinel = line == sentinel;
                    if queue.send(line).is_err() {
                        debug!(generation, "line queue receiver dropped");
                        break;
                    }
                    if is_sentinel {
                        debug!(generation, "sentinel observed, reader stopping");
                        break;
                    }
                }
                Err(err) => {
                    warn!(generation, %err, "read from output pipe failed");
                    break;
                }
            }
        }

        output
    })
}
