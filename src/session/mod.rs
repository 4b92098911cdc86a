//! Session façade over the pipe pair, child process, and line reader.
//!
//! A [`Session`] owns everything needed for one request/response
//! conversation with the child: both pipe handles, the child process
//! handle, the reader task, and the line queue. [`Session::ensure_running`]
//! is idempotent and heals exactly the dead component — it never spawns a
//! second child while one is alive and never starts a second reader beside
//! a live one.

pub mod reader;
pub mod spawner;

use std::fs::File;
use std::io::{BufReader, Write};
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::pipes;
use crate::{AppError, Result};

/// One collected response unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Output lines in arrival order, excluding the sentinel itself.
    pub lines: Vec<String>,
    /// `true` iff collection was terminated by the sentinel line.
    pub complete: bool,
}

/// A line-oriented request/response session with a supervised child process.
pub struct Session {
    config: SessionConfig,
    /// Duplex handle on the input pipe, written by [`send`](Self::send).
    input: File,
    /// Parked output reader; `None` while a reader task owns it.
    output: Option<BufReader<File>>,
    queue_tx: UnboundedSender<String>,
    queue_rx: UnboundedReceiver<String>,
    child: Option<Child>,
    reader: Option<JoinHandle<BufReader<File>>>,
    /// Bumped on every child launch; readers log the generation they serve.
    generation: u64,
}

impl Session {
    /// Provision the pipe pair and open the session's handles.
    ///
    /// The child process and reader task start lazily on the first
    /// [`ensure_running`](Self::ensure_running) call.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Pipe` if a pipe cannot be created or opened.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        pipes::ensure_fifo(&config.pipe_in)?;
        pipes::ensure_fifo(&config.pipe_out)?;

        let input = pipes::open_duplex(&config.pipe_in)?;
        let output = BufReader::new(pipes::open_duplex(&config.pipe_out)?);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            input,
            output: Some(output),
            queue_tx,
            queue_rx,
            child: None,
            reader: None,
            generation: 0,
        })
    }

    /// Ensure the child process and reader task are both alive.
    ///
    /// Safe to call before every interaction. A dead child is relaunched
    /// with fresh pipe handles for its standard streams; a finished reader
    /// is restarted from the exact buffered position the previous one
    /// stopped at.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Pipe` on provisioning failure, `AppError::Spawn`
    /// if the executable cannot be launched, or `AppError::Session` if a
    /// previous reader task panicked.
    pub async fn ensure_running(&mut self) -> Result<()> {
        pipes::ensure_fifo(&self.config.pipe_in)?;
        pipes::ensure_fifo(&self.config.pipe_out)?;

        if !spawner::is_running(self.child.as_mut()) {
            let child_stdin = pipes::open_duplex(&self.config.pipe_in)?;
            let child_stdout = pipes::open_duplex(&self.config.pipe_out)?;
            self.generation += 1;
            self.child = Some(spawner::spawn_child(
                &self.config,
                child_stdin,
                child_stdout,
                self.generation,
            )?);
        }

        self.ensure_reader().await
    }

    /// Start a reader task if none is currently alive.
    async fn ensure_reader(&mut self) -> Result<()> {
        if self.reader.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        // Reclaim the buffered handle from the finished task so no bytes
        // read past the previous sentinel are lost.
        let output = match self.reader.take() {
            Some(task) => task
                .await
                .map_err(|err| AppError::Session(format!("reader task panicked: {err}")))?,
            None => self
                .output
                .take()
                .ok_or_else(|| AppError::Session("output handle unavailable".into()))?,
        };

        self.reader = Some(reader::spawn_line_reader(
            output,
            self.queue_tx.clone(),
            self.config.sentinel.clone(),
            self.generation,
        ));

        Ok(())
    }

    /// Write a newline-terminated command to the input pipe and flush.
    ///
    /// Sending and receiving are decoupled; call
    /// [`read_response`](Self::read_response) afterwards if a reply is
    /// expected. Returns the session for chaining.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the pipe write fails.
    pub fn send(&mut self, command: &str) -> Result<&mut Self> {
        debug!(command, "sending command");
        self.input.write_all(command.as_bytes())?;
        self.input.write_all(b"\n")?;
        self.input.flush()?;
        Ok(self)
    }

    /// Wait up to `timeout` for the next queued output line.
    ///
    /// `None` as the timeout blocks indefinitely. A `None` return means no
    /// line arrived within the window — normal "no data yet", not an error.
    pub async fn read_line(&mut self, timeout: Option<Duration>) -> Option<String> {
        match timeout {
            Some(window) => tokio::time::timeout(window, self.queue_rx.recv())
                .await
                .ok()
                .flatten(),
            None => self.queue_rx.recv().await,
        }
    }

    /// Collect one full response: all lines up to the sentinel.
    ///
    /// Relaunches the child and reader first if either died. Each line is
    /// awaited up to `timeout`; a timed-out wait ends collection with
    /// `complete = false` and whatever prefix arrived. With `timeout =
    /// None` the call blocks until the sentinel, so `complete` is always
    /// `true`. The sentinel itself never appears in the returned lines.
    ///
    /// # Errors
    ///
    /// Propagates [`ensure_running`](Self::ensure_running) failures.
    pub async fn read_response(&mut self, timeout: Option<Duration>) -> Result<Response> {
        self.ensure_running().await?;

        let mut lines = Vec::new();
        let mut complete = false;

        loop {
            match self.read_line(timeout).await {
                None => break,
                Some(line) if line == self.config.sentinel => {
                    complete = true;
                    break;
                }
                Some(line) => lines.push(line),
            }
        }

        Ok(Response { lines, complete })
    }

    /// OS pid of the current child, if one is running.
    #[must_use]
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Whether a reader task is currently alive.
    #[must_use]
    pub fn reader_alive(&self) -> bool {
        self.reader.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Kill the child process and release the session.
    ///
    /// Consumes the session: no operation is valid afterwards except
    /// constructing a new one. The pipes persist on the filesystem. A
    /// reader still blocked on the output pipe is unblocked by writing the
    /// sentinel into it, so the task stops through its normal path instead
    /// of leaking.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if no child was ever launched (closing
    /// an unstarted session is a programming error), or `AppError::Spawn`
    /// if the kill fails.
    pub async fn close(mut self) -> Result<()> {
        let mut child = self.child.take().ok_or_else(|| {
            AppError::Session("close called before any child was launched".into())
        })?;

        child
            .kill()
            .await
            .map_err(|err| AppError::Spawn(format!("failed to kill child: {err}")))?;

        if let Some(task) = self.reader.take() {
            if !task.is_finished() {
                let mut unblock = pipes::open_duplex(&self.config.pipe_out)?;
                unblock.write_all(self.config.sentinel.as_bytes())?;
                unblock.flush()?;
            }
            if let Err(err) = task.await {
                warn!(%err, "reader task did not shut down cleanly");
            }
        }

        info!(generation = self.generation, "session closed");
        Ok(())
    }
}
