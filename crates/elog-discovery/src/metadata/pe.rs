// Portable Executable container: just enough to find the CLI metadata root.

use std::ops::Range;

use super::bytes::{u16_at, u32_at};
use crate::error::LoadError;

const DOS_MAGIC: &[u8; 2] = b"MZ";
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
const CLI_HEADER_DIRECTORY: usize = 14;
const SECTION_HEADER_SIZE: usize = 40;

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_pointer: u32,
}

impl Section {
    fn file_offset(&self, rva: u32) -> Option<usize> {
        let extent = self.virtual_size.max(self.raw_size);
        if rva >= self.virtual_address && rva - self.virtual_address < extent {
            (self.raw_pointer as usize).checked_add((rva - self.virtual_address) as usize)
        } else {
            None
        }
    }
}

/// Locate the CLI metadata root inside a PE image. Returns its byte range within `data`.
pub(crate) fn locate_metadata(data: &[u8]) -> Result<Range<usize>, LoadError> {
    if data.get(0..2) != Some(DOS_MAGIC.as_slice()) {
        return Err(LoadError::NotAnAssembly("missing MZ header".to_string()));
    }
    let pe_offset = u32_at(data, 0x3C).ok_or_else(|| LoadError::truncated("DOS header"))? as usize;
    if data.get(pe_offset..pe_offset + 4) != Some(PE_SIGNATURE.as_slice()) {
        return Err(LoadError::NotAnAssembly("missing PE signature".to_string()));
    }

    let coff = pe_offset + 4;
    let section_count =
        u16_at(data, coff + 2).ok_or_else(|| LoadError::truncated("COFF header"))? as usize;
    let optional_size =
        u16_at(data, coff + 16).ok_or_else(|| LoadError::truncated("COFF header"))? as usize;

    let optional = coff + 20;
    let directories = match u16_at(data, optional) {
        Some(PE32_MAGIC) => optional + 96,
        Some(PE32_PLUS_MAGIC) => optional + 112,
        Some(other) => {
            return Err(LoadError::NotAnAssembly(format!(
                "unknown optional header magic {:#x}",
                other
            )));
        }
        None => return Err(LoadError::truncated("optional header")),
    };
    let directory_count =
        u32_at(data, directories - 4).ok_or_else(|| LoadError::truncated("optional header"))?;
    if directory_count as usize <= CLI_HEADER_DIRECTORY {
        return Err(LoadError::NotAnAssembly("no CLI header directory".to_string()));
    }
    let cli_rva = u32_at(data, directories + CLI_HEADER_DIRECTORY * 8)
        .ok_or_else(|| LoadError::truncated("data directories"))?;
    if cli_rva == 0 {
        return Err(LoadError::NotAnAssembly("native image without CLI header".to_string()));
    }

    let sections = read_sections(data, optional + optional_size, section_count)?;
    let cli = rva_to_offset(&sections, cli_rva)?;
    let metadata_rva = u32_at(data, cli + 8).ok_or_else(|| LoadError::truncated("CLI header"))?;
    let metadata_size =
        u32_at(data, cli + 12).ok_or_else(|| LoadError::truncated("CLI header"))? as usize;
    let start = rva_to_offset(&sections, metadata_rva)?;
    let end = start
        .checked_add(metadata_size)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| LoadError::truncated("metadata"))?;
    Ok(start..end)
}

fn read_sections(data: &[u8], table: usize, count: usize) -> Result<Vec<Section>, LoadError> {
    (0..count)
        .map(|i| {
            let base = table + i * SECTION_HEADER_SIZE;
            let field = |offset: usize| {
                u32_at(data, base + offset).ok_or_else(|| LoadError::truncated("section table"))
            };
            Ok(Section {
                virtual_size: field(8)?,
                virtual_address: field(12)?,
                raw_size: field(16)?,
                raw_pointer: field(20)?,
            })
        })
        .collect()
}

fn rva_to_offset(sections: &[Section], rva: u32) -> Result<usize, LoadError> {
    sections
        .iter()
        .find_map(|s| s.file_offset(rva))
        .ok_or_else(|| LoadError::malformed(format!("RVA {:#x} is outside every section", rva)))
}
