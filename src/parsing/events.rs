use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::core::event::Event;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid event file: {0}")]
    InvalidFormat(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Layout of an event file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    /// A single JSON array of event objects
    JsonArray,
    /// One JSON event object per line
    JsonLines,
}

impl EventFormat {
    /// Detect the layout from the file name, looking through a `.gz` suffix
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnsupportedFormat` for unknown extensions.
    pub fn detect(path: &Path) -> Result<Self, ParseError> {
        let name = path.to_string_lossy().to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext {
            "json" => Ok(Self::JsonArray),
            "jsonl" | "ndjson" => Ok(Self::JsonLines),
            "" => Err(ParseError::UnsupportedFormat(format!(
                "{} has no extension (expected .json, .jsonl or .ndjson)",
                path.display()
            ))),
            other => Err(ParseError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Iterator over events stored one JSON object per line.
///
/// Blank lines and lines starting with `#` are skipped. Errors carry the
/// 1-based line number.
pub struct EventReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(ParseError::Io(e))),
            }

            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let line = self.line;
            return Some(
                serde_json::from_str(text).map_err(|source| ParseError::Json { line, source }),
            );
        }
    }
}

/// Boxed stream of events, as returned by [`open_events`]
pub type EventStream = Box<dyn Iterator<Item = Result<Event, ParseError>>>;

/// Open an event file for streaming.
///
/// `-` reads JSON lines from stdin. JSON lines files are streamed; JSON array
/// files are read whole.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened,
/// `ParseError::UnsupportedFormat` for unknown extensions, or a parse error
/// if a JSON array file is malformed.
pub fn open_events(path: &Path) -> Result<EventStream, ParseError> {
    if path.to_string_lossy() == "-" {
        return Ok(Box::new(EventReader::new(io::stdin().lock())));
    }

    let format = EventFormat::detect(path)?;
    let reader = open_reader(path)?;

    match format {
        EventFormat::JsonLines => Ok(Box::new(EventReader::new(reader))),
        EventFormat::JsonArray => {
            let events = parse_event_array(reader)?;
            Ok(Box::new(events.into_iter().map(Ok)))
        }
    }
}

/// Read every event of a file into memory
///
/// # Errors
///
/// See [`open_events`]; also fails on the first malformed line of a JSON
/// lines file.
pub fn read_events(path: &Path) -> Result<Vec<Event>, ParseError> {
    open_events(path)?.collect()
}

/// Parse JSON lines text
///
/// # Errors
///
/// Returns `ParseError::Json` for the first malformed line.
pub fn parse_events_text(text: &str) -> Result<Vec<Event>, ParseError> {
    EventReader::new(text.as_bytes()).collect()
}

/// Parse a JSON array of events
///
/// # Errors
///
/// Returns `ParseError::Json` if the input is not valid JSON, or
/// `ParseError::InvalidFormat` if it is not an array of event objects.
pub fn parse_event_array<R: Read>(reader: R) -> Result<Vec<Event>, ParseError> {
    let value: serde_json::Value = serde_json::from_reader(reader).map_err(|source| {
        ParseError::Json {
            line: source.line(),
            source,
        }
    })?;

    let serde_json::Value::Array(values) = value else {
        return Err(ParseError::InvalidFormat(
            "expected a JSON array of events".to_string(),
        ));
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value).map_err(|e| {
                ParseError::InvalidFormat(format!("event {} is invalid: {e}", i + 1))
            })
        })
        .collect()
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
