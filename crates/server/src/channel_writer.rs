use std::io::{self, Write};

use bytes::Bytes;
use tokio::sync::mpsc::Sender;

/// Blocking `Write` adapter that forwards each write as a chunk to an
/// async receiver. Once the receiver is dropped every write fails with
/// `BrokenPipe`.
///
/// Must be used from a blocking thread, never from inside the runtime.
pub struct ChannelWriter {
    tx: Sender<Bytes>,
}

impl ChannelWriter {
    pub fn new(tx: Sender<Bytes>) -> Self {
        Self { tx }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stream consumer went away"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
