//! Versioned decoder for prefab item records.
//!
//! A sector is a run of binary item records. Each record starts with a common
//! header, followed by a body whose layout depends on the sector's format
//! version. The layout changed at six known versions; every epoch below is a
//! standalone reader so that fixing one can never shift the offsets of another.
//!
//! The decoder returns the record's `block_size`, the number of bytes it
//! consumed. That value is the only way a caller finds the next record, so a
//! body reader that consumes one byte too many or too few corrupts the rest of
//! the sector.

use tracing::{debug, error};

use crate::cursor::{is_bit_set, ByteCursor};
use crate::error::{Error, ItemIssue, Result};
use crate::item::{ItemBase, ItemType, PrefabItem};
use crate::node::NodeUid;
use crate::token::TokenResolver;

/// Oldest format version with a known prefab layout.
pub const MIN_FORMAT_VERSION: u32 = 825;

/// Size of the header shared by every item type.
pub const ITEM_HEADER_SIZE: usize = 0x34;

/// Size of the flags word plus the view-distance byte that follow the header.
pub const FLAGS_BLOCK_SIZE: usize = 0x05;

/// Record layout generations of the prefab item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatEpoch {
    V825,
    V829,
    V831,
    V846,
    V854,
    V855,
}

impl FormatEpoch {
    /// Layout used by sectors of the given format version.
    pub fn for_version(version: u32) -> Option<Self> {
        match version {
            825..=828 => Some(FormatEpoch::V825),
            829..=830 => Some(FormatEpoch::V829),
            831..=845 => Some(FormatEpoch::V831),
            846..=853 => Some(FormatEpoch::V846),
            854 => Some(FormatEpoch::V854),
            v if v >= 855 => Some(FormatEpoch::V855),
            _ => None,
        }
    }
}

/// Fields read from the common item header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemHeader {
    pub item_type: ItemType,
    pub uid: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Read the 0x34-byte header at the cursor position.
pub fn read_header(cursor: &mut ByteCursor<'_>) -> Result<ItemHeader> {
    let start = cursor.position();
    let item_type = ItemType::from_tag(cursor.read_u32()?);
    let uid = cursor.read_u64()?;
    let x = cursor.read_f32()?;
    let y = cursor.read_f32()?;
    let z = cursor.read_f32()?;
    let consumed = cursor.position() - start;
    cursor.skip(ITEM_HEADER_SIZE - consumed)?;
    Ok(ItemHeader {
        item_type,
        uid,
        x,
        y,
        z,
    })
}

/// Body fields of a prefab record, independent of the epoch that produced them.
#[derive(Debug, Clone, Default)]
struct PrefabBody {
    flags: u32,
    dlc_guard: u8,
    hidden: bool,
    is_secret: bool,
    token: u64,
    nodes: Vec<NodeUid>,
    origin: u8,
    padding: i32,
    ferry_uid: u64,
}

fn read_uids(cursor: &mut ByteCursor<'_>, count: usize) -> Result<Vec<u64>> {
    // Never trust a count further than the bytes that could back it.
    let mut uids = Vec::with_capacity(count.min(cursor.remaining() / 8));
    for _ in 0..count {
        uids.push(cursor.read_u64()?);
    }
    Ok(uids)
}

fn decode_825(cursor: &mut ByteCursor<'_>) -> Result<PrefabBody> {
    let mut body = PrefabBody {
        flags: cursor.read_u32()?,
        ..PrefabBody::default()
    };
    body.dlc_guard = (body.flags >> 8) as u8;
    body.hidden = (body.flags >> 16) as u8 & 0x02 != 0;
    cursor.skip(1)?; // view distance

    body.token = cursor.read_u64()?;
    cursor.skip(0x10)?;

    let node_count = cursor.read_count()?;
    body.nodes = read_uids(cursor, node_count)?;

    let connected_count = cursor.read_count()?;
    cursor.skip_records(connected_count, 0x08)?;

    body.origin = cursor.read_u8()?;
    body.padding = i32::from(cursor.read_u8()?);

    cursor.skip_records(node_count, 0x38)?;

    let vegetation_count = cursor.read_count()?;
    cursor.skip_records(vegetation_count, 0x20)?;
    cursor.skip(0x04)?;

    let sphere_count = cursor.read_count()?;
    cursor.skip_records(sphere_count, 0x10)?;
    Ok(body)
}

fn decode_829(cursor: &mut ByteCursor<'_>) -> Result<PrefabBody> {
    let mut body = PrefabBody {
        flags: cursor.read_u32()?,
        ..PrefabBody::default()
    };
    body.dlc_guard = (body.flags >> 8) as u8;
    body.hidden = (body.flags >> 16) as u8 & 0x02 != 0;
    cursor.skip(1)?;

    body.token = cursor.read_u64()?;
    cursor.skip(0x10)?;

    let parts_count = cursor.read_count()?;
    cursor.skip_records(parts_count, 0x08)?;

    // Byte count in a four-byte slot.
    let node_count = usize::from(cursor.read_u8()?);
    cursor.skip(3)?;
    body.nodes = read_uids(cursor, node_count)?;

    let connected_count = cursor.read_count()?;
    cursor.skip_records(connected_count, 0x08)?;
    cursor.skip(0x08)?;

    body.origin = cursor.read_u8()?;
    body.padding = i32::from(cursor.read_u8()?);

    cursor.skip_records(node_count, 0x38)?;

    let vegetation_count = cursor.read_count()?;
    cursor.skip_records(vegetation_count, 0x20)?;
    cursor.skip(0x04)?;

    let sphere_count = cursor.read_count()?;
    cursor.skip_records(sphere_count, 0x14)?;
    Ok(body)
}

fn decode_831(cursor: &mut ByteCursor<'_>) -> Result<PrefabBody> {
    let mut body = PrefabBody {
        flags: cursor.read_u32()?,
        ..PrefabBody::default()
    };
    body.dlc_guard = (body.flags >> 8) as u8;
    body.hidden = (body.flags >> 16) as u8 & 0x02 != 0;
    cursor.skip(1)?;

    body.token = cursor.read_u64()?;
    cursor.skip(0x10)?;

    let parts_count = cursor.read_count()?;
    cursor.skip_records(parts_count, 0x08)?;

    let node_count = usize::from(cursor.read_u8()?);
    cursor.skip(3)?;
    body.nodes = read_uids(cursor, node_count)?;

    let connected_count = cursor.read_count()?;
    cursor.skip_records(connected_count, 0x08)?;
    cursor.skip(0x08)?;

    body.origin = cursor.read_u8()?;
    body.padding = i32::from(cursor.read_u8()?);

    cursor.skip_records(node_count, 0x38)?;

    let vegetation_count = cursor.read_count()?;
    cursor.skip_records(vegetation_count, 0x20)?;
    cursor.skip(0x04)?;

    let sphere_count = cursor.read_count()?;
    cursor.skip_records(sphere_count, 0x14)?;

    cursor.skip_records(node_count, 0x18)?;
    Ok(body)
}

fn decode_846(cursor: &mut ByteCursor<'_>) -> Result<PrefabBody> {
    let mut body = PrefabBody {
        flags: cursor.read_u32()?,
        ..PrefabBody::default()
    };
    body.dlc_guard = (body.flags >> 8) as u8;
    body.hidden = (body.flags >> 16) as u8 & 0x02 != 0;
    cursor.skip(1)?;

    body.token = cursor.read_u64()?;
    cursor.skip(0x10)?;

    let parts_count = cursor.read_count()?;
    cursor.skip_records(parts_count, 0x08)?;

    let node_count = usize::from(cursor.read_u8()?);
    cursor.skip(3)?;
    body.nodes = read_uids(cursor, node_count)?;

    let connected_count = cursor.read_count()?;
    cursor.skip_records(connected_count, 0x08)?;
    cursor.skip(0x08)?;

    body.origin = cursor.read_u8()?;
    body.padding = i32::from(cursor.read_u8()?);

    // Node looks grew by two bytes in this epoch.
    cursor.skip_records(node_count, 0x3A)?;

    let vegetation_count = cursor.read_count()?;
    cursor.skip_records(vegetation_count, 0x20)?;
    cursor.skip(0x04)?;

    let sphere_count = cursor.read_count()?;
    cursor.skip_records(sphere_count, 0x14)?;

    cursor.skip_records(node_count, 0x18)?;
    Ok(body)
}

fn decode_854(cursor: &mut ByteCursor<'_>) -> Result<PrefabBody> {
    let mut body = PrefabBody {
        flags: cursor.read_u32()?,
        ..PrefabBody::default()
    };
    body.dlc_guard = (body.flags >> 8) as u8;
    body.hidden = (body.flags >> 16) as u8 & 0x02 != 0;
    cursor.skip(1)?;

    body.token = cursor.read_u64()?;
    cursor.skip(0x08)?;

    let parts_count = cursor.read_count()?;
    cursor.skip_records(parts_count, 0x08)?;

    let node_count = cursor.read_count()?;
    body.nodes = read_uids(cursor, node_count)?;

    let connected_count = cursor.read_count()?;
    cursor.skip_records(connected_count, 0x08)?;
    cursor.skip(0x08)?;

    body.origin = cursor.read_u8()?;
    body.padding = i32::from(cursor.read_u8()?);

    cursor.skip_records(node_count, 0x0C)?;
    Ok(body)
}

fn decode_855(cursor: &mut ByteCursor<'_>) -> Result<PrefabBody> {
    let mut body = PrefabBody {
        flags: cursor.read_u32()?,
        ..PrefabBody::default()
    };
    body.dlc_guard = (body.flags >> 8) as u8;
    body.hidden = (body.flags >> 16) as u8 & 0x02 != 0;
    body.is_secret = is_bit_set(body.flags as u8, 5);
    cursor.skip(1)?;

    body.token = cursor.read_u64()?;
    cursor.skip(0x08)?;

    let parts_count = cursor.read_count()?;
    cursor.skip_records(parts_count, 0x08)?;

    let node_count = cursor.read_count()?;
    body.nodes = read_uids(cursor, node_count)?;

    let connected_count = cursor.read_count()?;
    cursor.skip_records(connected_count, 0x08)?;

    body.ferry_uid = cursor.read_u64()?;
    body.origin = cursor.read_u8()?;
    cursor.skip(1)?;

    cursor.skip_records(node_count, 0x0C)?;

    body.padding = cursor.read_i32()?;
    cursor.skip(0x04)?;
    Ok(body)
}

/// Decodes prefab records of one sector.
///
/// The `source` label names the sector in log messages; it is not used for
/// any lookups.
pub struct SectorDecoder<'r, R: TokenResolver> {
    resolver: &'r R,
    source: String,
}

impl<'r, R: TokenResolver> SectorDecoder<'r, R> {
    pub fn new(resolver: &'r R, source: impl Into<String>) -> Self {
        Self {
            resolver,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Decode the prefab record at `start` and return it with its block size.
    ///
    /// An unresolvable template token yields an invalid item, not an error.
    /// An unknown format version, a non-prefab header, and reads past the end
    /// of `buffer` are errors.
    pub fn decode_prefab(
        &self,
        buffer: &[u8],
        start: usize,
        version: u32,
    ) -> Result<(PrefabItem, usize)> {
        let epoch = FormatEpoch::for_version(version).ok_or(Error::UnsupportedFormatVersion {
            version,
            offset: start,
        })?;

        let mut cursor = ByteCursor::at(buffer, start)?;
        let header = read_header(&mut cursor)?;
        if header.item_type != ItemType::Prefab {
            return Err(Error::UnexpectedItemType {
                found: header.item_type.tag(),
                offset: start,
            });
        }

        let body = match epoch {
            FormatEpoch::V825 => decode_825(&mut cursor)?,
            FormatEpoch::V829 => decode_829(&mut cursor)?,
            FormatEpoch::V831 => decode_831(&mut cursor)?,
            FormatEpoch::V846 => decode_846(&mut cursor)?,
            FormatEpoch::V854 => decode_854(&mut cursor)?,
            FormatEpoch::V855 => decode_855(&mut cursor)?,
        };
        let block_size = cursor.position() - start;
        debug!(
            uid = %format_args!("{:#x}", header.uid),
            ?epoch,
            offset = start,
            block_size,
            "decoded prefab record"
        );

        let item = self.build_item(header, body, start, block_size);
        Ok((item, block_size))
    }

    /// Decode `count` consecutive prefab records starting at `start`.
    ///
    /// The first fatal error stops the run and is reported with the index and
    /// offset of the failing record.
    pub fn decode_prefab_run(
        &self,
        buffer: &[u8],
        start: usize,
        count: usize,
        version: u32,
    ) -> Result<Vec<PrefabItem>> {
        let mut items = Vec::with_capacity(count.min(buffer.len() / ITEM_HEADER_SIZE));
        let mut offset = start;
        for index in 0..count {
            let (item, block_size) = self
                .decode_prefab(buffer, offset, version)
                .map_err(|source| Error::SectorRecord {
                    index,
                    offset,
                    source: Box::new(source),
                })?;
            offset += block_size;
            items.push(item);
        }
        Ok(items)
    }

    fn build_item(
        &self,
        header: ItemHeader,
        body: PrefabBody,
        offset: usize,
        block_size: usize,
    ) -> PrefabItem {
        let mut base = ItemBase::new(header.uid, ItemType::Prefab, body.nodes);
        base.x = header.x;
        base.y = header.y;
        base.z = header.z;
        base.flags = body.flags;
        base.dlc_guard = body.dlc_guard;
        base.hidden = body.hidden;
        base.block_size = block_size;

        if base.nodes.is_empty() {
            base.invalidate(ItemIssue::NoNodes);
        }

        if self.resolver.lookup_prefab(body.token).is_none() {
            let token = self.resolver.resolve_token(body.token);
            error!(
                uid = %format_args!("{:#x}", header.uid),
                token = %token,
                source = %self.source,
                offset,
                "could not find prefab template"
            );
            base.invalidate(ItemIssue::TemplateNotFound {
                token,
                raw: body.token,
                offset,
            });
        }

        let mut item = PrefabItem::new(header.uid, body.token, body.origin, Vec::new());
        item.base = base;
        item.padding = body.padding;
        item.ferry_uid = body.ferry_uid;
        item.is_secret = body.is_secret;
        item
    }
}

/// Decode one prefab record from an anonymous buffer.
pub fn decode_prefab_item<R: TokenResolver>(
    buffer: &[u8],
    start: usize,
    version: u32,
    resolver: &R,
) -> Result<(PrefabItem, usize)> {
    SectorDecoder::new(resolver, "<buffer>").decode_prefab(buffer, start, version)
}

/// Decode a run of consecutive prefab records from an anonymous buffer.
pub fn decode_prefab_run<R: TokenResolver>(
    buffer: &[u8],
    start: usize,
    count: usize,
    version: u32,
    resolver: &R,
) -> Result<Vec<PrefabItem>> {
    SectorDecoder::new(resolver, "<buffer>").decode_prefab_run(buffer, start, count, version)
}
