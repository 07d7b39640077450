use std::io::{self, Write};

use serde_json::{Map, Value};

/// On-disk layout of an ntuple.
///
/// Non-finite cells read the same in both layouts: `NaN`, `inf` or `-inf`,
/// written as strings in JSON lines since JSON has no such numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtupleFormat {
    /// Tab-separated with a header line
    Tsv,
    /// One JSON object per row, keyed by column name
    JsonLines,
}

/// Sink for ntuple rows
pub trait RowWriter {
    fn write_row(&mut self, row: &[f64]) -> io::Result<()>;

    /// Flush buffered output
    fn finish(&mut self) -> io::Result<()>;
}

pub struct TsvWriter<W: Write> {
    out: W,
}

impl<W: Write> TsvWriter<W> {
    /// Create a writer and emit the header line
    ///
    /// # Errors
    ///
    /// Returns an IO error if the header cannot be written.
    pub fn new(mut out: W, columns: &[String]) -> io::Result<Self> {
        writeln!(out, "{}", columns.join("\t"))?;
        Ok(Self { out })
    }
}

impl<W: Write> RowWriter for TsvWriter<W> {
    fn write_row(&mut self, row: &[f64]) -> io::Result<()> {
        let line: Vec<String> = row.iter().map(ToString::to_string).collect();
        writeln!(self.out, "{}", line.join("\t"))
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn cell_value(value: f64) -> Value {
    if value.is_finite() {
        Value::from(value)
    } else {
        Value::String(value.to_string())
    }
}

pub struct JsonLinesWriter<W: Write> {
    out: W,
    columns: Vec<String>,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W, columns: &[String]) -> Self {
        Self {
            out,
            columns: columns.to_vec(),
        }
    }
}

impl<W: Write> RowWriter for JsonLinesWriter<W> {
    fn write_row(&mut self, row: &[f64]) -> io::Result<()> {
        let object: Map<String, Value> = self
            .columns
            .iter()
            .zip(row)
            .map(|(column, &value)| (column.clone(), cell_value(value)))
            .collect();
        serde_json::to_writer(&mut self.out, &object)?;
        writeln!(self.out)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Writer for `format` over `out`
///
/// # Errors
///
/// Returns an IO error if the TSV header cannot be written.
pub fn create_writer<'a, W: Write + 'a>(
    format: NtupleFormat,
    out: W,
    columns: &[String],
) -> io::Result<Box<dyn RowWriter + 'a>> {
    Ok(match format {
        NtupleFormat::Tsv => Box::new(TsvWriter::new(out, columns)?),
        NtupleFormat::JsonLines => Box::new(JsonLinesWriter::new(out, columns)),
    })
}
