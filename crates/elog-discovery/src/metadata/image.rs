// Owned, validated view over a CLI metadata root: heaps plus table geometry.

use std::ops::Range;

use super::bytes::{Cursor, u16_at, u32_at, u64_at};
use super::tables::{Col, MAX_TABLE, schema};
use crate::error::LoadError;

const METADATA_SIGNATURE: u32 = 0x424A_5342; // "BSJB"
const MAX_STREAM_NAME: usize = 32;

const HEAP_STRINGS_WIDE: u8 = 0x01;
const HEAP_GUID_WIDE: u8 = 0x02;
const HEAP_BLOB_WIDE: u8 = 0x04;
const HEAP_EXTRA_DATA: u8 = 0x40;

#[derive(Debug)]
pub(crate) struct MetadataImage {
    bytes: Vec<u8>,
    strings: Range<usize>,
    blobs: Range<usize>,
    heap_sizes: u8,
    rows: [u32; 64],
    table_offsets: [usize; 64],
    row_sizes: [usize; 64],
}

impl MetadataImage {
    /// Validate the metadata root found at `root` inside `bytes` and take ownership of the image.
    pub(crate) fn parse(bytes: Vec<u8>, root: Range<usize>) -> Result<Self, LoadError> {
        let md = bytes
            .get(root.clone())
            .ok_or_else(|| LoadError::truncated("metadata root"))?;
        if u32_at(md, 0) != Some(METADATA_SIGNATURE) {
            return Err(LoadError::malformed("bad metadata signature"));
        }
        let version_len =
            u32_at(md, 12).ok_or_else(|| LoadError::truncated("metadata root"))? as usize;
        let header = 16 + version_len;
        let stream_count =
            u16_at(md, header + 2).ok_or_else(|| LoadError::truncated("metadata root"))?;

        let mut tables = None;
        let mut strings = 0..0;
        let mut blobs = 0..0;
        let mut pos = header + 4;
        for _ in 0..stream_count {
            let offset = u32_at(md, pos).ok_or_else(|| LoadError::truncated("stream header"))?;
            let size = u32_at(md, pos + 4).ok_or_else(|| LoadError::truncated("stream header"))?;
            let name_area = md
                .get(pos + 8..(pos + 8 + MAX_STREAM_NAME).min(md.len()))
                .ok_or_else(|| LoadError::truncated("stream header"))?;
            let name_len = name_area
                .iter()
                .position(|b| *b == 0)
                .ok_or_else(|| LoadError::malformed("unterminated stream name"))?;
            let name = &name_area[..name_len];
            pos += 8 + (name_len + 4) / 4 * 4;

            let start = root.start + offset as usize;
            let end = start + size as usize;
            if end > root.end {
                return Err(LoadError::malformed(format!(
                    "stream {} extends past metadata",
                    String::from_utf8_lossy(name)
                )));
            }
            match name {
                b"#~" | b"#-" => tables = Some(start..end),
                b"#Strings" => strings = start..end,
                b"#Blob" => blobs = start..end,
                _ => {}
            }
        }
        let tables = tables.ok_or_else(|| LoadError::malformed("no table stream"))?;

        let mut image = Self {
            bytes,
            strings,
            blobs,
            heap_sizes: 0,
            rows: [0; 64],
            table_offsets: [0; 64],
            row_sizes: [0; 64],
        };
        image.read_table_layout(tables)?;
        Ok(image)
    }

    fn read_table_layout(&mut self, stream: Range<usize>) -> Result<(), LoadError> {
        let data = &self.bytes[stream.clone()];
        self.heap_sizes = *data.get(6).ok_or_else(|| LoadError::truncated("table stream"))?;
        let valid = u64_at(data, 8).ok_or_else(|| LoadError::truncated("table stream"))?;
        if valid >> (MAX_TABLE + 1) != 0 {
            return Err(LoadError::malformed(format!(
                "unsupported tables present (mask {:#x})",
                valid
            )));
        }

        let mut pos = 24;
        for table in 0..=MAX_TABLE {
            if valid & (1u64 << table) != 0 {
                self.rows[table as usize] =
                    u32_at(data, pos).ok_or_else(|| LoadError::truncated("row counts"))?;
                pos += 4;
            }
        }
        if self.heap_sizes & HEAP_EXTRA_DATA != 0 {
            pos += 4;
        }

        let mut offset = stream.start + pos;
        for table in 0..=MAX_TABLE {
            let size = schema(table)
                .map(|cols| cols.iter().map(|c| self.width(*c)).sum())
                .unwrap_or(0);
            self.row_sizes[table as usize] = size;
            self.table_offsets[table as usize] = offset;
            offset += size * self.rows[table as usize] as usize;
        }
        if offset > stream.end {
            return Err(LoadError::truncated("tables"));
        }
        Ok(())
    }

    fn width(&self, col: Col) -> usize {
        let wide = |flag: u8| if self.heap_sizes & flag != 0 { 4 } else { 2 };
        match col {
            Col::U16 => 2,
            Col::U32 => 4,
            Col::Str => wide(HEAP_STRINGS_WIDE),
            Col::Guid => wide(HEAP_GUID_WIDE),
            Col::Blob => wide(HEAP_BLOB_WIDE),
            Col::Table(t) => {
                if self.rows[t as usize] < 0x1_0000 {
                    2
                } else {
                    4
                }
            }
            Col::Coded(c) => c.width(&self.rows),
        }
    }

    pub(crate) fn row_count(&self, table: u8) -> u32 {
        self.rows[table as usize]
    }

    /// Raw value of column `col` in 1-based `row` of `table`
    pub(crate) fn cell(&self, table: u8, row: u32, col: usize) -> Result<u32, LoadError> {
        if row == 0 || row > self.row_count(table) {
            return Err(LoadError::malformed(format!(
                "row {} out of range for table {:#x}",
                row, table
            )));
        }
        let cols = schema(table)
            .ok_or_else(|| LoadError::malformed(format!("unknown table {:#x}", table)))?;
        let kind = *cols
            .get(col)
            .ok_or_else(|| LoadError::malformed(format!("no column {} in {:#x}", col, table)))?;
        let offset = self.table_offsets[table as usize]
            + (row as usize - 1) * self.row_sizes[table as usize]
            + cols[..col].iter().map(|c| self.width(*c)).sum::<usize>();
        let value = match self.width(kind) {
            2 => u16_at(&self.bytes, offset).map(u32::from),
            _ => u32_at(&self.bytes, offset),
        };
        value.ok_or_else(|| LoadError::truncated("table row"))
    }

    pub(crate) fn string(&self, index: u32) -> Result<String, LoadError> {
        let heap = &self.bytes[self.strings.clone()];
        let tail = heap
            .get(index as usize..)
            .ok_or_else(|| LoadError::malformed(format!("string index {} out of range", index)))?;
        let len = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
    }

    pub(crate) fn blob(&self, index: u32) -> Result<&[u8], LoadError> {
        let heap = &self.bytes[self.blobs.clone()];
        let tail = heap
            .get(index as usize..)
            .ok_or_else(|| LoadError::malformed(format!("blob index {} out of range", index)))?;
        let mut cursor = Cursor::new(tail);
        let len = cursor
            .compressed_u32()
            .ok_or_else(|| LoadError::malformed("bad blob length"))? as usize;
        cursor
            .take(len)
            .ok_or_else(|| LoadError::truncated("blob"))
    }
}
