use std::fmt::{self, Write as _};
use std::os::unix::io::RawFd;
use std::process;

use nix::unistd;

pub fn print_usage() -> ! {
    println!("Usage: tsh [-hvp]");
    println!("   -h   Print this help message");
    println!("   -v   Enable verbose mode");
    println!("   -p   Do not print a command prompt");
    process::exit(1);
}

/// Fixed-buffer formatter flushed with raw `write(2)`, for output from
/// signal handlers: no heap, no locks, no buffered I/O. Output longer than
/// the buffer is truncated.
pub struct SioWriter {
    buf: [u8; 256],
    len: usize,
}

impl SioWriter {
    pub fn new() -> Self {
        SioWriter {
            buf: [0; 256],
            len: 0,
        }
    }

    /// Writes the buffered bytes to `fd` and resets the buffer.
    pub fn flush(&mut self, fd: RawFd) {
        if self.len > 0 {
            let _ = unistd::write(fd, &self.buf[..self.len]);
            self.len = 0;
        }
    }
}

impl fmt::Write for SioWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let n = s.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

/// Formats `args` into a stack buffer and writes it to `fd` in one call.
pub fn sio_print(fd: RawFd, args: fmt::Arguments) {
    let mut w = SioWriter::new();
    let _ = w.write_fmt(args);
    w.flush(fd);
}
