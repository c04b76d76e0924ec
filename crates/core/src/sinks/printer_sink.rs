use crate::entry::LogEntry;
use crate::error::SinkError;
use crate::sinks::LogSink;
use std::fmt;
use std::io::{self, Stdout, Write};
use std::marker::PhantomData;
use tracing::info;

/// A sink that writes each entry as a `timestamp payload` line
pub struct PrinterSink<T, W: Write = Stdout> {
    prefix: String,
    writer: W,
    printed: u64,
    _phantom: PhantomData<T>,
}

impl<T> PrinterSink<T> {
    pub fn new(prefix: impl Into<String>) -> Self {
        PrinterSink::with_writer(prefix, io::stdout())
    }
}

impl<T, W: Write> PrinterSink<T, W> {
    pub fn with_writer(prefix: impl Into<String>, writer: W) -> Self {
        let prefix = prefix.into();
        info!("PrinterSink starting with prefix: {}", prefix);
        PrinterSink {
            prefix,
            writer,
            printed: 0,
            _phantom: PhantomData,
        }
    }

    pub fn printed(&self) -> u64 {
        self.printed
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<T: fmt::Display, W: Write> LogSink for PrinterSink<T, W> {
    type Payload = T;

    fn emit(&mut self, entry: LogEntry<T>) -> Result<(), SinkError> {
        writeln!(self.writer, "{}{}", self.prefix, entry)?;
        self.printed += 1;
        Ok(())
    }

    fn complete(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        info!("PrinterSink completed after {} entries", self.printed);
        Ok(())
    }
}
