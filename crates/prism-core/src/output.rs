//! Writing responses out: the JSON envelope and, optionally, the image.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::codec;
use crate::pipeline::Response;

/// Serializes response envelopes to a writer.
pub struct ResponseWriter<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> ResponseWriter<W> {
    /// Create a new writer; `pretty` indents the JSON.
    pub fn new(writer: W, pretty: bool) -> Self {
        Self {
            writer,
            pretty,
        }
    }

    /// Write one response envelope followed by a newline.
    pub fn write(&mut self, response: &Response) -> io::Result<()> {
        self.write_value(&response.body)
    }

    fn write_value<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Decode the image of a successful response and write it to `path`.
///
/// Returns `false` without touching the file system for a failed response.
pub fn write_image(response: &Response, path: &Path) -> io::Result<bool> {
    let Some(data) = &response.body.data else {
        return Ok(false);
    };
    let bytes = codec::decode_data_uri(&data.image)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    std::fs::write(path, bytes)?;
    Ok(true)
}
