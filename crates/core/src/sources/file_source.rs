use crate::entry::LogEntry;
use crate::error::SourceError;
use crate::sources::LogSource;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, error};

/// Reads entries from a JSON-lines file, one `{"timestamp": ..., "payload": ...}` object per line.
///
/// The file is opened on the first fetch. Blank lines are skipped.
pub struct FileSource<T> {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line_number: usize,
    finished: bool,
    _phantom: PhantomData<T>,
}

impl<T> FileSource<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileSource {
            path: path.into(),
            lines: None,
            line_number: 0,
            finished: false,
            _phantom: PhantomData,
        }
    }

    async fn open(&mut self) -> Result<(), SourceError> {
        debug!("FileSource opening {}", self.path.display());
        match File::open(&self.path).await {
            Ok(file) => {
                self.lines = Some(BufReader::new(file).lines());
                Ok(())
            }
            Err(e) => {
                error!("Failed to open file {}: {}", self.path.display(), e);
                self.finished = true;
                Err(e.into())
            }
        }
    }
}

impl<T> LogSource for FileSource<T>
where
    T: DeserializeOwned + Send + Clone + 'static,
{
    type Payload = T;

    fn peek_last(&self) -> Option<&LogEntry<T>> {
        None
    }

    async fn fetch_next(&mut self) -> Result<Option<LogEntry<T>>, SourceError> {
        if self.finished {
            return Ok(None);
        }
        if self.lines.is_none() {
            self.open().await?;
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    self.line_number += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    return match serde_json::from_str::<LogEntry<T>>(&line) {
                        Ok(entry) => Ok(Some(entry)),
                        Err(e) => {
                            self.finished = true;
                            Err(SourceError::Malformed {
                                line: self.line_number,
                                message: e.to_string(),
                            })
                        }
                    };
                }
                Ok(None) => {
                    debug!("FileSource reached end of {}", self.path.display());
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => {
                    error!("Failed to read {}: {}", self.path.display(), e);
                    self.finished = true;
                    return Err(e.into());
                }
            }
        }
    }
}
