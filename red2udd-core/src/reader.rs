//! Sequential RED record streams.
//!
//! A RED stream starts with an 8-byte magic and a format version, followed
//! by tagged records:
//!
//! ```text
//! "SNREDBIN" [u32 version]
//! [u16 tag length][tag bytes][u32 payload length][payload]
//! [u16 tag length][tag bytes][u32 payload length][payload]
//! ...
//! ```
//!
//! The tag of the next record can be inspected before its payload is loaded,
//! so a caller can reject foreign records without decoding them.

use crate::codec::{self, CodecError};
use crate::red::{RawEventRecord, RED_SERIAL_TAG};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, ErrorKind, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Magic bytes opening a RED stream.
pub const RED_MAGIC: &[u8; 8] = b"SNREDBIN";
/// Current RED stream format version.
pub const RED_FORMAT_VERSION: u32 = 1;

/// Errors that can occur while reading a RED stream.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Unexpected record tag '{found}' (expected '{expected}')")]
    UnexpectedTag { expected: String, found: String },
}

impl From<CodecError> for ReadError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) if e.kind() == ErrorKind::UnexpectedEof => Self::UnexpectedEof,
            CodecError::Io(e) => Self::Io(e),
            CodecError::InvalidFormat(msg) => Self::InvalidFormat(msg),
        }
    }
}

/// A sequential source of raw event records.
pub trait RecordSource {
    /// Returns `true` when another record is available, reading its tag if
    /// needed.
    fn has_record_tag(&mut self) -> Result<bool, ReadError>;

    /// Tag of the next record, once [`has_record_tag`](Self::has_record_tag)
    /// returned `true`.
    fn record_tag(&self) -> Option<&str>;

    /// Checks the tag of the next record.
    fn record_tag_is(&self, tag: &str) -> bool {
        self.record_tag() == Some(tag)
    }

    /// Loads the next record. Fails if it is not a RED record.
    fn load(&mut self) -> Result<RawEventRecord, ReadError>;
}

/// Reader over a RED binary stream.
#[derive(Debug)]
pub struct RedReader<R: Read> {
    reader: R,
    next_tag: Option<String>,
    records_loaded: u64,
}

impl RedReader<BufReader<File>> {
    /// Opens a RED file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> RedReader<R> {
    /// Wraps a stream and checks its header.
    pub fn new(mut reader: R) -> Result<Self, ReadError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(eof_as_format)?;
        if &magic != RED_MAGIC {
            return Err(ReadError::InvalidFormat("missing RED magic".to_string()));
        }
        let version = reader.read_u32::<LittleEndian>().map_err(eof_as_format)?;
        if version != RED_FORMAT_VERSION {
            return Err(ReadError::InvalidFormat(format!(
                "unsupported RED format version {version}"
            )));
        }

        Ok(Self {
            reader,
            next_tag: None,
            records_loaded: 0,
        })
    }

    /// Number of records loaded so far.
    pub fn records_loaded(&self) -> u64 {
        self.records_loaded
    }

    /// Reads the next tag, or returns `None` at a clean end of stream.
    fn read_tag(&mut self) -> Result<Option<String>, ReadError> {
        let mut first = [0u8; 1];
        loop {
            match self.reader.read(&mut first) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let second = self.reader.read_u8().map_err(eof_as_truncation)?;
        let len = u16::from_le_bytes([first[0], second]) as usize;

        let mut bytes = vec![0u8; len];
        self.reader.read_exact(&mut bytes).map_err(eof_as_truncation)?;
        let tag = String::from_utf8(bytes)
            .map_err(|e| ReadError::InvalidFormat(format!("record tag is not UTF-8: {e}")))?;
        Ok(Some(tag))
    }
}

impl<R: Read> RecordSource for RedReader<R> {
    fn has_record_tag(&mut self) -> Result<bool, ReadError> {
        if self.next_tag.is_none() {
            self.next_tag = self.read_tag()?;
        }
        Ok(self.next_tag.is_some())
    }

    fn record_tag(&self) -> Option<&str> {
        self.next_tag.as_deref()
    }

    fn load(&mut self) -> Result<RawEventRecord, ReadError> {
        if !self.has_record_tag()? {
            return Err(ReadError::UnexpectedEof);
        }
        if !self.record_tag_is(RED_SERIAL_TAG) {
            return Err(ReadError::UnexpectedTag {
                expected: RED_SERIAL_TAG.to_string(),
                found: self.next_tag.clone().unwrap_or_default(),
            });
        }

        let len = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(eof_as_truncation)? as usize;
        let payload = codec::read_payload(&mut self.reader, len).map_err(eof_as_truncation)?;
        self.next_tag = None;

        let mut cursor = Cursor::new(payload.as_slice());
        let record = codec::decode_red(&mut cursor)?;
        if cursor.position() as usize != len {
            return Err(ReadError::InvalidFormat(format!(
                "{} trailing bytes in RED record",
                len - cursor.position() as usize
            )));
        }

        self.records_loaded += 1;
        Ok(record)
    }
}

fn eof_as_format(err: io::Error) -> ReadError {
    if err.kind() == ErrorKind::UnexpectedEof {
        ReadError::InvalidFormat("stream shorter than RED header".to_string())
    } else {
        ReadError::Io(err)
    }
}

fn eof_as_truncation(err: io::Error) -> ReadError {
    if err.kind() == ErrorKind::UnexpectedEof {
        ReadError::UnexpectedEof
    } else {
        ReadError::Io(err)
    }
}

/// Writer producing RED binary streams.
pub struct RedWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: u64,
}

impl RedWriter<File> {
    /// Creates (or truncates) a RED file.
    pub fn create<P: AsRef<Path>>(path: P) -> codec::Result<Self> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> RedWriter<W> {
    /// Wraps a sink and writes the stream header.
    pub fn new(writer: W) -> codec::Result<Self> {
        let mut writer = BufWriter::new(writer);
        writer.write_all(RED_MAGIC)?;
        writer.write_u32::<LittleEndian>(RED_FORMAT_VERSION)?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Appends a raw event record.
    pub fn write(&mut self, record: &RawEventRecord) -> codec::Result<()> {
        let mut payload = Vec::new();
        codec::encode_red(&mut payload, record)?;
        self.write_tagged(RED_SERIAL_TAG, &payload)
    }

    /// Appends an already encoded record under an arbitrary tag.
    pub fn write_tagged(&mut self, tag: &str, payload: &[u8]) -> codec::Result<()> {
        codec::write_string(&mut self.writer, tag)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            CodecError::InvalidFormat(format!("record too large: {} bytes", payload.len()))
        })?;
        self.writer.write_u32::<LittleEndian>(len)?;
        self.writer.write_all(payload)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> codec::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
