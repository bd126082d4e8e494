//! Shared stderr with an optional pinned frame at the bottom.
//!
//! Log lines and the live task table both go through a [`Console`]. While a
//! frame is pinned, every log write first erases the frame, prints the log
//! bytes, then draws the frame again below them, so nothing printed above
//! the table is overwritten by the next redraw.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const CLEAR_BELOW: &str = "\x1b[J";
const SHOW_CURSOR: &str = "\x1b[?25h";
const HIDE_CURSOR: &str = "\x1b[?25l";

struct Screen {
    out: Box<dyn Write + Send>,
    frame: String,
}

impl Screen {
    fn erase_frame(&mut self) -> io::Result<()> {
        let drawn = self.frame.lines().count();
        if drawn > 0 {
            write!(self.out, "\x1b[{drawn}F{CLEAR_BELOW}")?;
        }
        Ok(())
    }
}

pub struct Console {
    screen: Mutex<Screen>,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            screen: Mutex::new(Screen {
                out: Box::new(out),
                frame: String::new(),
            }),
        })
    }

    /// The process-wide console on stderr.
    pub fn stderr() -> Arc<Self> {
        static STDERR: OnceLock<Arc<Console>> = OnceLock::new();
        Arc::clone(STDERR.get_or_init(|| Self::new(io::stderr())))
    }

    pub fn writer(self: &Arc<Self>) -> ConsoleWriter {
        ConsoleWriter {
            console: Arc::clone(self),
            buf: Vec::new(),
        }
    }

    /// Replace the pinned frame with `frame`.
    pub fn pin(&self, frame: &str) -> io::Result<()> {
        let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        screen.erase_frame()?;
        screen.frame = frame.to_string();
        write!(screen.out, "{HIDE_CURSOR}{frame}")?;
        screen.out.flush()
    }

    /// Leave the last frame on screen as ordinary output and show the cursor.
    pub fn unpin(&self) {
        let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        screen.frame.clear();
        let _ = write!(screen.out, "{SHOW_CURSOR}");
        let _ = screen.out.flush();
    }

    /// Print `bytes` above the pinned frame.
    pub fn print(&self, bytes: &[u8]) -> io::Result<()> {
        let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        screen.erase_frame()?;
        screen.out.write_all(bytes)?;
        if !screen.frame.is_empty() {
            let frame = screen.frame.clone();
            screen.out.write_all(frame.as_bytes())?;
        }
        screen.out.flush()
    }
}

/// One log event's worth of output, printed when dropped.
pub struct ConsoleWriter {
    console: Arc<Console>,
    buf: Vec<u8>,
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.buf);
        self.console.print(&bytes)
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
