//! Asset bundle reader and writer
//!
//! A bundle is a flat stream of little-endian records, each padded to 4 bytes:
//!
//! ```text
//! type_tag_a u32, type_tag_b u32, asset_id u32, size u32, payload[size], padding
//! ```

use std::io::{self, ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// Bundle-wide asset identifier
pub type AssetId = u32;

/// Two-word type tag of a bundle record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(pub u32, pub u32);

/// Tag of compressed animation resources
pub const ANIMATION_TAG: TypeTag = TypeTag(0x5c07_569f, 0x985d_2cd6);

/// Size of a record header in bytes
pub const RECORD_HEADER_SIZE: usize = 16;

/// Default upper bound on a single payload (256 MiB)
pub const DEFAULT_MAX_ASSET_SIZE: u32 = 256 * 1024 * 1024;

/// One record of a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRecord {
    pub tag: TypeTag,
    pub asset_id: AssetId,
    pub bytes: Vec<u8>,
}

impl BundleRecord {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Error reading a bundle
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("bundle read failed: {0}")]
    Io(#[from] io::Error),

    #[error("record {index} header is truncated")]
    TruncatedHeader { index: usize },

    #[error("record {index} (asset {asset_id:#x}) declares {size} bytes but the bundle ends first")]
    TruncatedPayload {
        index: usize,
        asset_id: AssetId,
        size: u32,
    },

    #[error("record {index} (asset {asset_id:#x}) declares {size} bytes, above the {limit} byte limit")]
    TooLarge {
        index: usize,
        asset_id: AssetId,
        size: u32,
        limit: u32,
    },
}

fn padding(size: usize) -> usize {
    (4 - size % 4) % 4
}

/// Sequential reader over bundle records
pub struct BundleReader<R: Read> {
    reader: R,
    index: usize,
    max_asset_size: u32,
    done: bool,
}

impl<R: Read> BundleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            index: 0,
            max_asset_size: DEFAULT_MAX_ASSET_SIZE,
            done: false,
        }
    }

    /// Reject payloads larger than `limit` bytes before allocating them
    pub fn with_max_asset_size(mut self, limit: u32) -> Self {
        self.max_asset_size = limit;
        self
    }

    /// Records returned so far
    pub fn records_read(&self) -> usize {
        self.index
    }

    /// Read the next record, or `None` at a clean end of stream
    pub fn read_next_asset(&mut self) -> Result<Option<BundleRecord>, BundleError> {
        let index = self.index;

        // End of stream is only clean before the first header byte
        let first = match self.reader.read_u8() {
            Ok(byte) => byte,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let truncated = |e: io::Error| match e.kind() {
            ErrorKind::UnexpectedEof => BundleError::TruncatedHeader { index },
            _ => BundleError::Io(e),
        };
        let (tag, asset_id, size) = {
            let first = [first];
            let mut header = (&first[..]).chain(&mut self.reader);
            let tag_a = header.read_u32::<LittleEndian>().map_err(truncated)?;
            let tag_b = header.read_u32::<LittleEndian>().map_err(truncated)?;
            let asset_id = header.read_u32::<LittleEndian>().map_err(truncated)?;
            let size = header.read_u32::<LittleEndian>().map_err(truncated)?;
            (TypeTag(tag_a, tag_b), asset_id, size)
        };
        if size > self.max_asset_size {
            return Err(BundleError::TooLarge {
                index,
                asset_id,
                size,
                limit: self.max_asset_size,
            });
        }

        let mut bytes = vec![0u8; size as usize];
        self.reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => BundleError::TruncatedPayload {
                index,
                asset_id,
                size,
            },
            _ => BundleError::Io(e),
        })?;

        // The last record's padding may be missing
        let pad = padding(bytes.len()) as u64;
        io::copy(&mut (&mut self.reader).take(pad), &mut io::sink())?;

        self.index += 1;
        tracing::trace!(
            "bundle record {}: tag {:08x}:{:08x} asset {:#x} ({} bytes)",
            index,
            tag.0,
            tag.1,
            asset_id,
            size
        );
        Ok(Some(BundleRecord {
            tag,
            asset_id,
            bytes,
        }))
    }
}

impl<R: Read> Iterator for BundleReader<R> {
    type Item = Result<BundleRecord, BundleError>;

    /// Stops after the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_next_asset().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Sequential writer of bundle records
pub struct BundleWriter<W: Write> {
    writer: W,
}

impl<W: Write> BundleWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_asset(&mut self, tag: TypeTag, asset_id: AssetId, bytes: &[u8]) -> io::Result<()> {
        let size = u32::try_from(bytes.len())
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "asset larger than 4 GiB"))?;
        self.writer.write_u32::<LittleEndian>(tag.0)?;
        self.writer.write_u32::<LittleEndian>(tag.1)?;
        self.writer.write_u32::<LittleEndian>(asset_id)?;
        self.writer.write_u32::<LittleEndian>(size)?;
        self.writer.write_all(bytes)?;
        self.writer.write_all(&[0u8; 3][..padding(bytes.len())])?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
