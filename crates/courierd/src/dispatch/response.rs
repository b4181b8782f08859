//! Response serialisation for the JSONL binding.

use std::io::Write;

use courier_core::ResultEnvelope;

use super::errors::DispatchError;

/// Writes result envelopes as JSONL lines.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps an output stream.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes `result` as one line and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation, writing or flushing fails.
    pub fn write_result(&mut self, result: &ResultEnvelope) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, result)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Answers a request that could not be read or parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_result(&ResultEnvelope::err(error.to_shape()))
    }
}
