//! Output sinks for converted event records.
//!
//! Supports the binary UDD stream (lossless, readable back with
//! [`UddReader`]) and a one-line-per-event CSV summary.

use crate::codec::{self, CodecError};
use crate::udd::{EventRecord, DELTAT_PREVIOUS_EVENT_KEY};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Magic bytes opening a UDD stream.
pub const UDD_MAGIC: &[u8; 8] = b"SNUDDBIN";
/// Current UDD stream format version.
pub const UDD_FORMAT_VERSION: u32 = 1;

/// Errors that can occur during output writing.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Output file already exists: {0}")]
    AlreadyExists(PathBuf),
}

impl From<CodecError> for OutputError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => Self::Io(e),
            CodecError::InvalidFormat(msg) => Self::InvalidFormat(msg),
        }
    }
}

/// A sequential sink of converted event records.
pub trait EventSink {
    /// Persists one record.
    fn process(&mut self, record: &EventRecord) -> Result<(), OutputError>;

    /// Flushes everything written so far.
    fn finish(&mut self) -> Result<(), OutputError>;
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Binary UDD stream
    #[default]
    Binary,
    /// CSV event summary
    Csv,
}

impl OutputFormat {
    /// Picks the format from the file extension (`.csv`, anything else is binary).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Binary,
        }
    }
}

/// Where and how to write the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Refuse to replace an existing file
    pub preserve_existing_output: bool,
}

impl OutputConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preserve_existing_output: false,
        }
    }

    pub fn with_preserve_existing_output(mut self, preserve: bool) -> Self {
        self.preserve_existing_output = preserve;
        self
    }

    pub fn format(&self) -> OutputFormat {
        OutputFormat::from_path(&self.path)
    }

    /// Creates the output file according to the overwrite policy.
    pub fn create_file(&self) -> Result<File, OutputError> {
        if !self.preserve_existing_output {
            return Ok(File::create(&self.path)?);
        }
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => OutputError::AlreadyExists(self.path.clone()),
                _ => OutputError::Io(e),
            })
    }
}

/// Opens the sink matching the configured path.
pub fn open_sink(config: &OutputConfig) -> Result<Box<dyn EventSink>, OutputError> {
    let file = config.create_file()?;
    let sink: Box<dyn EventSink> = match config.format() {
        OutputFormat::Binary => Box::new(UddWriter::new(file)?),
        OutputFormat::Csv => Box::new(CsvSummaryWriter::new(file)?),
    };
    Ok(sink)
}

/// Binary UDD stream writer.
///
/// ```text
/// "SNUDDBIN" [u32 version]
/// [u32 record length][event record]
/// ...
/// ```
pub struct UddWriter<W: Write> {
    writer: BufWriter<W>,
    buffer: Vec<u8>,
    records_written: u64,
}

impl<W: Write> UddWriter<W> {
    /// Creates a new writer and writes the stream header.
    pub fn new(writer: W) -> Result<Self, OutputError> {
        let mut writer = BufWriter::new(writer);
        writer.write_all(UDD_MAGIC)?;
        writer.write_u32::<LittleEndian>(UDD_FORMAT_VERSION)?;
        Ok(Self {
            writer,
            buffer: Vec::new(),
            records_written: 0,
        })
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl<W: Write> EventSink for UddWriter<W> {
    fn process(&mut self, record: &EventRecord) -> Result<(), OutputError> {
        self.buffer.clear();
        codec::encode_event_record(&mut self.buffer, record)?;
        let len = u32::try_from(self.buffer.len()).map_err(|_| {
            OutputError::InvalidFormat(format!("record too large: {} bytes", self.buffer.len()))
        })?;
        self.writer.write_u32::<LittleEndian>(len)?;
        self.writer.write_all(&self.buffer)?;
        self.records_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// CSV writer with one summary line per event.
pub struct CsvSummaryWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> CsvSummaryWriter<W> {
    pub const HEADER: &'static str = "run_id,event_id,seconds,picoseconds,deltat_previous_event,calo_hits,tracker_hits,trigger_ids";

    /// Creates a new CSV writer and writes the column header.
    pub fn new(writer: W) -> Result<Self, OutputError> {
        let mut writer = BufWriter::new(writer);
        writeln!(writer, "{}", Self::HEADER)?;
        Ok(Self { writer })
    }
}

impl<W: Write> EventSink for CsvSummaryWriter<W> {
    fn process(&mut self, record: &EventRecord) -> Result<(), OutputError> {
        let header = &record.header;
        let deltat = header
            .properties
            .fetch_real(DELTAT_PREVIOUS_EVENT_KEY)
            .map(|d| d.to_string())
            .unwrap_or_default();
        let trigger_ids = record
            .udd
            .origin_trigger_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(";");

        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{}",
            header.id.run,
            header.id.event,
            header.timestamp.seconds,
            header.timestamp.picoseconds,
            deltat,
            record.udd.calorimeter_hits.len(),
            record.udd.tracker_hits.len(),
            trigger_ids
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reader for binary UDD streams written by [`UddWriter`].
pub struct UddReader<R: Read> {
    reader: R,
}

impl UddReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OutputError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> UddReader<R> {
    /// Wraps a stream and checks its header.
    pub fn new(mut reader: R) -> Result<Self, OutputError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != UDD_MAGIC {
            return Err(OutputError::InvalidFormat("missing UDD magic".to_string()));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != UDD_FORMAT_VERSION {
            return Err(OutputError::InvalidFormat(format!(
                "unsupported UDD format version {version}"
            )));
        }
        Ok(Self { reader })
    }

    /// Reads the next record, or `None` at the end of the stream.
    pub fn read_next(&mut self) -> Result<Option<EventRecord>, OutputError> {
        let mut len_bytes = [0u8; 4];
        let mut filled = 0;
        while filled < len_bytes.len() {
            match self.reader.read(&mut len_bytes[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(OutputError::InvalidFormat(
                        "truncated record length".to_string(),
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        let payload = codec::read_payload(&mut self.reader, len)?;
        let mut cursor = Cursor::new(payload.as_slice());
        let record = codec::decode_event_record(&mut cursor)?;
        if cursor.position() as usize != len {
            return Err(OutputError::InvalidFormat(format!(
                "{} trailing bytes in UDD record",
                len - cursor.position() as usize
            )));
        }
        Ok(Some(record))
    }

    /// Reads all remaining records.
    pub fn read_all(&mut self) -> Result<Vec<EventRecord>, OutputError> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}
