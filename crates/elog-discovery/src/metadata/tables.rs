// Physical layout of the ECMA-335 metadata tables (partition II, chapter 22).

pub(crate) const MODULE: u8 = 0x00;
pub(crate) const TYPE_REF: u8 = 0x01;
pub(crate) const TYPE_DEF: u8 = 0x02;
pub(crate) const FIELD: u8 = 0x04;
pub(crate) const METHOD_DEF: u8 = 0x06;
pub(crate) const PARAM: u8 = 0x08;
pub(crate) const INTERFACE_IMPL: u8 = 0x09;
pub(crate) const MEMBER_REF: u8 = 0x0A;
pub(crate) const CUSTOM_ATTRIBUTE: u8 = 0x0C;
pub(crate) const DECL_SECURITY: u8 = 0x0E;
pub(crate) const STAND_ALONE_SIG: u8 = 0x11;
pub(crate) const EVENT: u8 = 0x14;
pub(crate) const PROPERTY: u8 = 0x17;
pub(crate) const MODULE_REF: u8 = 0x1A;
pub(crate) const TYPE_SPEC: u8 = 0x1B;
pub(crate) const ASSEMBLY: u8 = 0x20;
pub(crate) const ASSEMBLY_REF: u8 = 0x23;
pub(crate) const FILE: u8 = 0x26;
pub(crate) const EXPORTED_TYPE: u8 = 0x27;
pub(crate) const MANIFEST_RESOURCE: u8 = 0x28;
pub(crate) const NESTED_CLASS: u8 = 0x29;
pub(crate) const GENERIC_PARAM: u8 = 0x2A;
pub(crate) const METHOD_SPEC: u8 = 0x2B;
pub(crate) const GENERIC_PARAM_CONSTRAINT: u8 = 0x2C;

/// Highest table number defined for assemblies
pub(crate) const MAX_TABLE: u8 = GENERIC_PARAM_CONSTRAINT;

/// Placeholder for unused tags in a coded index
const NONE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coded {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl Coded {
    pub(crate) fn tables(self) -> &'static [u8] {
        match self {
            Coded::TypeDefOrRef => &[TYPE_DEF, TYPE_REF, TYPE_SPEC],
            Coded::HasConstant => &[FIELD, PARAM, PROPERTY],
            Coded::HasCustomAttribute => &[
                METHOD_DEF,
                FIELD,
                TYPE_REF,
                TYPE_DEF,
                PARAM,
                INTERFACE_IMPL,
                MEMBER_REF,
                MODULE,
                DECL_SECURITY,
                PROPERTY,
                EVENT,
                STAND_ALONE_SIG,
                MODULE_REF,
                TYPE_SPEC,
                ASSEMBLY,
                ASSEMBLY_REF,
                FILE,
                EXPORTED_TYPE,
                MANIFEST_RESOURCE,
                GENERIC_PARAM,
                GENERIC_PARAM_CONSTRAINT,
                METHOD_SPEC,
            ],
            Coded::HasFieldMarshal => &[FIELD, PARAM],
            Coded::HasDeclSecurity => &[TYPE_DEF, METHOD_DEF, ASSEMBLY],
            Coded::MemberRefParent => &[TYPE_DEF, TYPE_REF, MODULE_REF, METHOD_DEF, TYPE_SPEC],
            Coded::HasSemantics => &[EVENT, PROPERTY],
            Coded::MethodDefOrRef => &[METHOD_DEF, MEMBER_REF],
            Coded::MemberForwarded => &[FIELD, METHOD_DEF],
            Coded::Implementation => &[FILE, ASSEMBLY_REF, EXPORTED_TYPE],
            Coded::CustomAttributeType => &[NONE, NONE, METHOD_DEF, MEMBER_REF, NONE],
            Coded::ResolutionScope => &[MODULE, MODULE_REF, ASSEMBLY_REF, TYPE_REF],
            Coded::TypeOrMethodDef => &[TYPE_DEF, METHOD_DEF],
        }
    }

    pub(crate) fn tag_bits(self) -> u32 {
        match self {
            Coded::HasCustomAttribute => 5,
            Coded::MemberRefParent | Coded::CustomAttributeType => 3,
            Coded::TypeDefOrRef
            | Coded::HasConstant
            | Coded::HasDeclSecurity
            | Coded::Implementation
            | Coded::ResolutionScope => 2,
            Coded::HasFieldMarshal
            | Coded::HasSemantics
            | Coded::MethodDefOrRef
            | Coded::MemberForwarded
            | Coded::TypeOrMethodDef => 1,
        }
    }

    /// Split a raw coded value into (table, 1-based row). Row 0 is a null reference.
    pub(crate) fn decode(self, raw: u32) -> Option<(u8, u32)> {
        let bits = self.tag_bits();
        let tag = (raw & ((1 << bits) - 1)) as usize;
        let table = *self.tables().get(tag)?;
        if table == NONE {
            return None;
        }
        Some((table, raw >> bits))
    }

    /// Width in bytes given the row counts of all tables
    pub(crate) fn width(self, rows: &[u32; 64]) -> usize {
        let limit = 1u32 << (16 - self.tag_bits());
        let largest = self
            .tables()
            .iter()
            .filter(|t| **t != NONE)
            .map(|t| rows[*t as usize])
            .max()
            .unwrap_or(0);
        if largest < limit { 2 } else { 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Col {
    U16,
    U32,
    Str,
    Guid,
    Blob,
    Table(u8),
    Coded(Coded),
}

/// Column layout of every table defined for assemblies. `None` for reserved numbers.
pub(crate) fn schema(table: u8) -> Option<&'static [Col]> {
    use self::Coded as C;
    use Col::*;
    let cols: &'static [Col] = match table {
        0x00 => &[U16, Str, Guid, Guid, Guid],
        0x01 => &[Coded(C::ResolutionScope), Str, Str],
        0x02 => &[
            U32,
            Str,
            Str,
            Coded(C::TypeDefOrRef),
            Table(FIELD),
            Table(METHOD_DEF),
        ],
        0x03 => &[Table(FIELD)],
        0x04 => &[U16, Str, Blob],
        0x05 => &[Table(METHOD_DEF)],
        0x06 => &[U32, U16, U16, Str, Blob, Table(PARAM)],
        0x07 => &[Table(PARAM)],
        0x08 => &[U16, U16, Str],
        0x09 => &[Table(TYPE_DEF), Coded(C::TypeDefOrRef)],
        0x0A => &[Coded(C::MemberRefParent), Str, Blob],
        0x0B => &[U16, Coded(C::HasConstant), Blob],
        0x0C => &[
            Coded(C::HasCustomAttribute),
            Coded(C::CustomAttributeType),
            Blob,
        ],
        0x0D => &[Coded(C::HasFieldMarshal), Blob],
        0x0E => &[U16, Coded(C::HasDeclSecurity), Blob],
        0x0F => &[U16, U32, Table(TYPE_DEF)],
        0x10 => &[U32, Table(FIELD)],
        0x11 => &[Blob],
        0x12 => &[Table(TYPE_DEF), Table(EVENT)],
        0x13 => &[Table(EVENT)],
        0x14 => &[U16, Str, Coded(C::TypeDefOrRef)],
        0x15 => &[Table(TYPE_DEF), Table(PROPERTY)],
        0x16 => &[Table(PROPERTY)],
        0x17 => &[U16, Str, Blob],
        0x18 => &[U16, Table(METHOD_DEF), Coded(C::HasSemantics)],
        0x19 => &[
            Table(TYPE_DEF),
            Coded(C::MethodDefOrRef),
            Coded(C::MethodDefOrRef),
        ],
        0x1A => &[Str],
        0x1B => &[Blob],
        0x1C => &[U16, Coded(C::MemberForwarded), Str, Table(MODULE_REF)],
        0x1D => &[U32, Table(FIELD)],
        0x1E => &[U32, U32],
        0x1F => &[U32],
        0x20 => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
        0x21 => &[U32],
        0x22 => &[U32, U32, U32],
        0x23 => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
        0x24 => &[U32, Table(ASSEMBLY_REF)],
        0x25 => &[U32, U32, U32, Table(ASSEMBLY_REF)],
        0x26 => &[U32, Str, Blob],
        0x27 => &[U32, U32, Str, Str, Coded(C::Implementation)],
        0x28 => &[U32, U32, Str, Coded(C::Implementation)],
        0x29 => &[Table(TYPE_DEF), Table(TYPE_DEF)],
        0x2A => &[U16, U16, Coded(C::TypeOrMethodDef), Str],
        0x2B => &[Coded(C::MethodDefOrRef), Blob],
        0x2C => &[Table(GENERIC_PARAM), Coded(C::TypeDefOrRef)],
        _ => return None,
    };
    Some(cols)
}
