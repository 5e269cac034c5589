// Little-endian readers over borrowed byte slices.

pub(crate) fn slice(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    data.get(offset..end)
}

pub(crate) fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    slice(data, offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    slice(data, offset, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn u64_at(data: &[u8], offset: usize) -> Option<u64> {
    let lo = u32_at(data, offset)? as u64;
    let hi = u32_at(data, offset + 4)? as u64;
    Some(lo | (hi << 32))
}

/// Sequential reader used for signatures and custom attribute blobs
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub(crate) fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = slice(self.data, self.pos, len)?;
        self.pos += len;
        Some(bytes)
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> Option<u64> {
        let lo = self.u32()? as u64;
        let hi = self.u32()? as u64;
        Some(lo | (hi << 32))
    }

    /// ECMA-335 II.23.2 compressed unsigned integer
    pub(crate) fn compressed_u32(&mut self) -> Option<u32> {
        let first = self.u8()?;
        if first & 0x80 == 0 {
            Some(first as u32)
        } else if first & 0xC0 == 0x80 {
            let second = self.u8()?;
            Some((((first & 0x3F) as u32) << 8) | second as u32)
        } else if first & 0xE0 == 0xC0 {
            let rest = self.take(3)?;
            Some(
                (((first & 0x1F) as u32) << 24)
                    | ((rest[0] as u32) << 16)
                    | ((rest[1] as u32) << 8)
                    | rest[2] as u32,
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_integers_from_ecma_examples() {
        let cases: &[(&[u8], u32)] = &[
            (&[0x03], 0x03),
            (&[0x7F], 0x7F),
            (&[0x80, 0x80], 0x80),
            (&[0xAE, 0x57], 0x2E57),
            (&[0xBF, 0xFF], 0x3FFF),
            (&[0xC0, 0x00, 0x40, 0x00], 0x4000),
            (&[0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
        ];
        for (bytes, expected) in cases {
            assert_eq!(Cursor::new(bytes).compressed_u32(), Some(*expected));
        }
    }

    #[test]
    fn reads_past_end_return_none() {
        let mut cursor = Cursor::new(&[0x01, 0x02, 0x03]);
        assert_eq!(cursor.u16(), Some(0x0201));
        assert_eq!(cursor.u16(), None);
        assert_eq!(cursor.u8(), Some(0x03));
        assert_eq!(u32_at(&[0u8; 3], 0), None);
        assert_eq!(u64_at(&[1, 0, 0, 0, 2, 0, 0, 0], 0), Some(0x2_0000_0001));
    }
}
