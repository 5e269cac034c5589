//! Writer for small but structurally valid CLI assemblies.
//!
//! The output is a PE32 image with one `.text` section holding a CLI header and a metadata
//! root with `#~`, `#Strings`, `#GUID` and `#Blob` streams. Only the tables needed to describe
//! types, their bases, nesting and custom attributes are emitted. There is no IL.

use std::collections::HashMap;

const FILE_ALIGNMENT: usize = 0x200;
const SECTION_RVA: u32 = 0x2000;
const PE_OFFSET: usize = 0x80;
const CLI_HEADER_SIZE: usize = 72;

const TYPE_PUBLIC: u32 = 0x0010_0001;
const TYPE_NESTED_PUBLIC: u32 = 0x0010_0002;
const TYPE_INTERFACE: u32 = 0x0000_00A1;
const TYPE_SEALED_VALUE: u32 = 0x0000_0109;
const CTOR_FLAGS: u16 = 0x1886;

/// Constructor parameter of an attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorParam {
    Bool,
    I4,
    U4,
    String,
    /// `string` wrapped in `depth` single-dimensional arrays
    StringArray(u8),
}

impl CtorParam {
    fn encode(self, sig: &mut Vec<u8>) {
        match self {
            CtorParam::Bool => sig.push(0x02),
            CtorParam::I4 => sig.push(0x08),
            CtorParam::U4 => sig.push(0x09),
            CtorParam::String => sig.push(0x0E),
            CtorParam::StringArray(depth) => {
                sig.extend(std::iter::repeat_n(0x1D, depth as usize));
                sig.push(0x0E);
            }
        }
    }
}

/// Literal argument written into a custom attribute value blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    I4(i32),
    U4(u32),
    String(Option<String>),
    NullArray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Base {
    None,
    Named(String),
    Generic(String),
}

/// Custom attribute applied to a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUsage {
    type_name: String,
    params: Vec<CtorParam>,
    args: Vec<AttrValue>,
}

impl AttributeUsage {
    /// `type_name` is qualified. Resolved to a local constructor when this assembly defines it.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            params: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn string(mut self, value: impl Into<String>) -> Self {
        self.params.push(CtorParam::String);
        self.args.push(AttrValue::String(Some(value.into())));
        self
    }

    pub fn null_string(mut self) -> Self {
        self.params.push(CtorParam::String);
        self.args.push(AttrValue::String(None));
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.params.push(CtorParam::U4);
        self.args.push(AttrValue::U4(value));
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.params.push(CtorParam::I4);
        self.args.push(AttrValue::I4(value));
        self
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.params.push(CtorParam::Bool);
        self.args.push(AttrValue::Bool(value));
        self
    }

    /// A null argument of type `string` nested in `depth` arrays
    pub fn null_string_array(mut self, depth: u8) -> Self {
        self.params.push(CtorParam::StringArray(depth));
        self.args.push(AttrValue::NullArray);
        self
    }

    /// Replace the value blob with raw bytes, keeping the declared parameters
    pub fn raw_value(self, bytes: &[u8]) -> RawAttributeUsage {
        RawAttributeUsage {
            usage: self,
            value: bytes.to_vec(),
        }
    }

    fn value_blob(&self) -> Vec<u8> {
        let mut blob = vec![0x01, 0x00];
        for arg in &self.args {
            match arg {
                AttrValue::Bool(v) => blob.push(u8::from(*v)),
                AttrValue::I4(v) => blob.extend_from_slice(&v.to_le_bytes()),
                AttrValue::U4(v) => blob.extend_from_slice(&v.to_le_bytes()),
                AttrValue::String(None) => blob.push(0xFF),
                AttrValue::NullArray => blob.extend_from_slice(&u32::MAX.to_le_bytes()),
                AttrValue::String(Some(s)) => {
                    blob.extend(compress(s.len() as u32));
                    blob.extend_from_slice(s.as_bytes());
                }
            }
        }
        blob.extend_from_slice(&[0x00, 0x00]);
        blob
    }
}

/// Attribute usage with a hand-written value blob, for malformed-marker cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttributeUsage {
    usage: AttributeUsage,
    value: Vec<u8>,
}

/// A type to define in the assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    namespace: String,
    name: String,
    flags: u32,
    base: Base,
    enclosing: Option<String>,
    constructor: Option<Vec<CtorParam>>,
    attributes: Vec<(AttributeUsage, Option<Vec<u8>>)>,
}

impl TypeDefinition {
    /// Public class deriving from `System.Object`
    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            flags: TYPE_PUBLIC,
            base: Base::Named("System.Object".to_string()),
            enclosing: None,
            constructor: None,
            attributes: Vec::new(),
        }
    }

    pub fn interface(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            flags: TYPE_INTERFACE,
            base: Base::None,
            ..Self::class(namespace, name)
        }
    }

    pub fn value_type(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            flags: TYPE_SEALED_VALUE,
            base: Base::Named("System.ValueType".to_string()),
            ..Self::class(namespace, name)
        }
    }

    /// Set the base type by qualified name; a type defined in the same assembly is referenced
    /// directly, anything else through a type reference.
    pub fn extends(mut self, qualified: impl Into<String>) -> Self {
        self.base = Base::Named(qualified.into());
        self
    }

    /// Derive from a one-argument instantiation of the generic type `qualified`
    /// (for example ``Acme.AggregateRoot`1``).
    pub fn extends_generic(mut self, qualified: impl Into<String>) -> Self {
        self.base = Base::Generic(qualified.into());
        self
    }

    /// Nest inside the type with qualified name `enclosing`, which must be defined earlier
    pub fn nested_in(mut self, enclosing: impl Into<String>) -> Self {
        self.enclosing = Some(enclosing.into());
        self.namespace = String::new();
        self.flags = TYPE_NESTED_PUBLIC;
        self
    }

    /// Give the type an instance constructor, making it usable as a local attribute
    pub fn with_constructor(mut self, params: Vec<CtorParam>) -> Self {
        self.constructor = Some(params);
        self
    }

    pub fn marked(mut self, attribute: AttributeUsage) -> Self {
        self.attributes.push((attribute, None));
        self
    }

    pub fn marked_raw(mut self, attribute: RawAttributeUsage) -> Self {
        self.attributes.push((attribute.usage, Some(attribute.value)));
        self
    }

    pub fn full_name(&self) -> String {
        match &self.enclosing {
            Some(outer) => format!("{}+{}", outer, self.name),
            None if self.namespace.is_empty() => self.name.clone(),
            None => format!("{}.{}", self.namespace, self.name),
        }
    }
}

/// Builds the bytes of one assembly
#[derive(Debug, Clone)]
pub struct AssemblyBuilder {
    name: String,
    references: Vec<String>,
    types: Vec<TypeDefinition>,
}

impl AssemblyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            references: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn reference(mut self, assembly: impl Into<String>) -> Self {
        self.references.push(assembly.into());
        self
    }

    pub fn with_type(mut self, ty: TypeDefinition) -> Self {
        self.types.push(ty);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let metadata = MetadataWriter::new(self).write();
        write_pe(&metadata)
    }
}

struct Heaps {
    strings: Vec<u8>,
    string_index: HashMap<String, u16>,
    blobs: Vec<u8>,
}

impl Heaps {
    fn new() -> Self {
        Self {
            strings: vec![0],
            string_index: HashMap::new(),
            blobs: vec![0],
        }
    }

    fn string(&mut self, value: &str) -> u16 {
        if value.is_empty() {
            return 0;
        }
        if let Some(index) = self.string_index.get(value) {
            return *index;
        }
        let index = self.strings.len() as u16;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn blob(&mut self, value: &[u8]) -> u16 {
        let index = self.blobs.len() as u16;
        self.blobs.extend(compress(value.len() as u32));
        self.blobs.extend_from_slice(value);
        index
    }
}

struct MetadataWriter<'a> {
    assembly: &'a AssemblyBuilder,
    heaps: Heaps,
    type_refs: Vec<[u16; 3]>,
    type_ref_index: HashMap<String, u16>,
    type_specs: Vec<u16>,
    member_refs: Vec<[u16; 3]>,
}

impl<'a> MetadataWriter<'a> {
    fn new(assembly: &'a AssemblyBuilder) -> Self {
        Self {
            assembly,
            heaps: Heaps::new(),
            type_refs: Vec::new(),
            type_ref_index: HashMap::new(),
            type_specs: Vec::new(),
            member_refs: Vec::new(),
        }
    }

    /// TypeDef rid (1-based, after `<Module>`) of a locally defined type
    fn local_type(&self, qualified: &str) -> Option<u16> {
        self.assembly
            .types
            .iter()
            .position(|t| t.full_name() == qualified)
            .map(|i| i as u16 + 2)
    }

    fn type_ref(&mut self, qualified: &str) -> u16 {
        if let Some(rid) = self.type_ref_index.get(qualified) {
            return *rid;
        }
        let (namespace, name) = match qualified.rfind('.') {
            Some(dot) => (&qualified[..dot], &qualified[dot + 1..]),
            None => ("", qualified),
        };
        // ResolutionScope: AssemblyRef row 1
        let row = [(1 << 2) | 2, self.heaps.string(name), self.heaps.string(namespace)];
        self.type_refs.push(row);
        let rid = self.type_refs.len() as u16;
        self.type_ref_index.insert(qualified.to_string(), rid);
        rid
    }

    /// TypeDefOrRef coded index for a qualified name
    fn type_def_or_ref(&mut self, qualified: &str) -> u16 {
        match self.local_type(qualified) {
            Some(rid) => rid << 2,
            None => (self.type_ref(qualified) << 2) | 1,
        }
    }

    fn extends(&mut self, base: &Base) -> u16 {
        match base {
            Base::None => 0,
            Base::Named(name) => self.type_def_or_ref(name),
            Base::Generic(name) => {
                let target = self.type_def_or_ref(name);
                // GENERICINST CLASS <type> 1 OBJECT
                let mut sig = vec![0x15, 0x12];
                sig.extend(compress(target as u32));
                sig.extend_from_slice(&[0x01, 0x1C]);
                let blob = self.heaps.blob(&sig);
                self.type_specs.push(blob);
                ((self.type_specs.len() as u16) << 2) | 2
            }
        }
    }

    fn ctor_signature(&mut self, params: &[CtorParam]) -> u16 {
        let mut sig = vec![0x20];
        sig.extend(compress(params.len() as u32));
        sig.push(0x01);
        for param in params {
            param.encode(&mut sig);
        }
        self.heaps.blob(&sig)
    }

    fn write(mut self) -> Vec<u8> {
        let assembly = self.assembly;
        let module_name = format!("{}.dll", assembly.name);
        let module = [0, self.heaps.string(&module_name), 1, 0, 0];

        // MethodDef rows in TypeDef order so each type owns a contiguous range.
        let mut methods: Vec<[u16; 4]> = Vec::new();
        let mut method_rid_of: HashMap<String, u16> = HashMap::new();
        let mut type_defs: Vec<(u32, [u16; 5])> = Vec::new();
        let ctor_name = self.heaps.string(".ctor");
        type_defs.push((0, [self.heaps.string("<Module>"), 0, 0, 1, 1]));
        for ty in &assembly.types {
            let method_list = methods.len() as u16 + 1;
            if let Some(params) = &ty.constructor {
                let sig = self.ctor_signature(params);
                methods.push([CTOR_FLAGS, ctor_name, sig, 1]);
                method_rid_of.insert(ty.full_name(), methods.len() as u16);
            }
            let name = self.heaps.string(&ty.name);
            let namespace = self.heaps.string(&ty.namespace);
            let extends = self.extends(&ty.base);
            type_defs.push((ty.flags, [name, namespace, extends, 1, method_list]));
        }

        let mut nested: Vec<[u16; 2]> = Vec::new();
        let mut custom_attributes: Vec<[u16; 3]> = Vec::new();
        for (i, ty) in assembly.types.iter().enumerate() {
            let rid = i as u16 + 2;
            if let Some(outer) = &ty.enclosing
                && let Some(outer_rid) = self.local_type(outer)
            {
                nested.push([rid, outer_rid]);
            }
            for (usage, raw) in &ty.attributes {
                let ctor = match method_rid_of.get(&usage.type_name) {
                    Some(method) => (*method << 3) | 2,
                    None => {
                        let parent = (self.type_ref(&usage.type_name) << 3) | 1;
                        let sig = self.ctor_signature(&usage.params);
                        self.member_refs.push([parent, ctor_name, sig]);
                        ((self.member_refs.len() as u16) << 3) | 3
                    }
                };
                let value = match raw {
                    Some(bytes) => self.heaps.blob(bytes),
                    None => self.heaps.blob(&usage.value_blob()),
                };
                custom_attributes.push([(rid << 5) | 3, ctor, value]);
            }
        }

        let assembly_name = self.heaps.string(&assembly.name);
        let mut references = assembly.references.clone();
        if references.is_empty() {
            references.push("System.Runtime".to_string());
        }
        let assembly_refs: Vec<u16> = references.iter().map(|r| self.heaps.string(r)).collect();

        let mut tables = TableStream::default();
        tables.table(0x00, 1, |out| put_u16s(out, &module));
        tables.table(0x01, self.type_refs.len(), |out| {
            self.type_refs.iter().for_each(|row| put_u16s(out, row))
        });
        tables.table(0x02, type_defs.len(), |out| {
            for (flags, row) in &type_defs {
                out.extend_from_slice(&flags.to_le_bytes());
                put_u16s(out, row);
            }
        });
        tables.table(0x06, methods.len(), |out| {
            for [flags, name, sig, params] in &methods {
                out.extend_from_slice(&0u32.to_le_bytes());
                put_u16s(out, &[0, *flags, *name, *sig, *params]);
            }
        });
        tables.table(0x0A, self.member_refs.len(), |out| {
            self.member_refs.iter().for_each(|row| put_u16s(out, row))
        });
        tables.table(0x0C, custom_attributes.len(), |out| {
            custom_attributes.iter().for_each(|row| put_u16s(out, row))
        });
        tables.table(0x1B, self.type_specs.len(), |out| put_u16s(out, &self.type_specs));
        tables.table(0x20, 1, |out| {
            out.extend_from_slice(&0x8004u32.to_le_bytes());
            put_u16s(out, &[1, 0, 0, 0]);
            out.extend_from_slice(&0u32.to_le_bytes());
            put_u16s(out, &[0, assembly_name, 0]);
        });
        tables.table(0x23, assembly_refs.len(), |out| {
            for name in &assembly_refs {
                put_u16s(out, &[4, 0, 0, 0]);
                out.extend_from_slice(&0u32.to_le_bytes());
                put_u16s(out, &[0, *name, 0, 0]);
            }
        });
        tables.table(0x29, nested.len(), |out| {
            nested.iter().for_each(|row| put_u16s(out, row))
        });

        let guid: Vec<u8> = (1..=16).collect();
        write_metadata_root(&[
            ("#~", tables.finish()),
            ("#Strings", self.heaps.strings),
            ("#GUID", guid),
            ("#Blob", self.heaps.blobs),
        ])
    }
}

#[derive(Default)]
struct TableStream {
    valid: u64,
    rows: Vec<u32>,
    data: Vec<u8>,
}

impl TableStream {
    /// Append a table; must be called in ascending table order
    fn table(&mut self, id: u8, rows: usize, write: impl FnOnce(&mut Vec<u8>)) {
        if rows == 0 {
            return;
        }
        self.valid |= 1 << id;
        self.rows.push(rows as u32);
        write(&mut self.data);
    }

    fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&[2, 0, 0, 1]);
        out.extend_from_slice(&self.valid.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        for rows in &self.rows {
            out.extend_from_slice(&rows.to_le_bytes());
        }
        out.extend_from_slice(&self.data);
        out
    }
}

fn put_u16s(out: &mut Vec<u8>, values: &[u16]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn pad4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn write_metadata_root(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let version = b"v4.0.30319\0\0";
    let header_len: usize = 16
        + version.len()
        + 4
        + streams
            .iter()
            .map(|(name, _)| 8 + (name.len() + 4) / 4 * 4)
            .sum::<usize>();

    let mut root = Vec::new();
    root.extend_from_slice(&0x424A_5342u32.to_le_bytes());
    put_u16s(&mut root, &[1, 1]);
    root.extend_from_slice(&0u32.to_le_bytes());
    root.extend_from_slice(&(version.len() as u32).to_le_bytes());
    root.extend_from_slice(version);
    put_u16s(&mut root, &[0, streams.len() as u16]);

    let mut offset = header_len;
    let mut bodies = Vec::new();
    for (name, body) in streams {
        let mut body = body.clone();
        pad4(&mut body);
        root.extend_from_slice(&(offset as u32).to_le_bytes());
        root.extend_from_slice(&(body.len() as u32).to_le_bytes());
        root.extend_from_slice(name.as_bytes());
        root.push(0);
        pad4(&mut root);
        offset += body.len();
        bodies.push(body);
    }
    for body in bodies {
        root.extend_from_slice(&body);
    }
    root
}

fn write_pe(metadata: &[u8]) -> Vec<u8> {
    let section_len = CLI_HEADER_SIZE + metadata.len();
    let raw_size = section_len.div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT;
    let mut image = vec![0u8; FILE_ALIGNMENT + raw_size];

    image[0..2].copy_from_slice(b"MZ");
    put(&mut image, 0x3C, &(PE_OFFSET as u32).to_le_bytes());
    image[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");

    let coff = PE_OFFSET + 4;
    put(&mut image, coff, &0x014Cu16.to_le_bytes());
    put(&mut image, coff + 2, &1u16.to_le_bytes());
    put(&mut image, coff + 16, &224u16.to_le_bytes());
    put(&mut image, coff + 18, &0x2102u16.to_le_bytes());

    let optional = coff + 20;
    put(&mut image, optional, &0x10Bu16.to_le_bytes());
    put(&mut image, optional + 92, &16u32.to_le_bytes());
    let cli_directory = optional + 96 + 14 * 8;
    put(&mut image, cli_directory, &SECTION_RVA.to_le_bytes());
    put(&mut image, cli_directory + 4, &(CLI_HEADER_SIZE as u32).to_le_bytes());

    let section = optional + 224;
    put(&mut image, section, b".text\0\0\0");
    put(&mut image, section + 8, &(section_len as u32).to_le_bytes());
    put(&mut image, section + 12, &SECTION_RVA.to_le_bytes());
    put(&mut image, section + 16, &(raw_size as u32).to_le_bytes());
    put(&mut image, section + 20, &(FILE_ALIGNMENT as u32).to_le_bytes());
    put(&mut image, section + 36, &0x6000_0020u32.to_le_bytes());

    let cli = FILE_ALIGNMENT;
    put(&mut image, cli, &(CLI_HEADER_SIZE as u32).to_le_bytes());
    put(&mut image, cli + 4, &2u16.to_le_bytes());
    put(&mut image, cli + 6, &5u16.to_le_bytes());
    let metadata_rva = SECTION_RVA + CLI_HEADER_SIZE as u32;
    put(&mut image, cli + 8, &metadata_rva.to_le_bytes());
    put(&mut image, cli + 12, &(metadata.len() as u32).to_le_bytes());
    put(&mut image, cli + 16, &1u32.to_le_bytes());

    put(&mut image, cli + CLI_HEADER_SIZE, metadata);
    image
}

fn put(image: &mut [u8], offset: usize, bytes: &[u8]) {
    image[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// ECMA-335 compressed unsigned integer
pub fn compress(value: u32) -> Vec<u8> {
    if value < 0x80 {
        vec![value as u8]
    } else if value < 0x4000 {
        vec![0x80 | (value >> 8) as u8, value as u8]
    } else {
        vec![
            0xC0 | (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_starts_with_dos_and_pe_headers() {
        let bytes = AssemblyBuilder::new("Acme.Domain").build();
        assert_eq!(&bytes[0..2], b"MZ");
        assert_eq!(&bytes[PE_OFFSET..PE_OFFSET + 4], b"PE\0\0");
        assert_eq!(bytes.len() % FILE_ALIGNMENT, 0);
    }

    #[test]
    fn metadata_root_follows_cli_header() {
        let bytes = AssemblyBuilder::new("Acme.Domain").build();
        let root = FILE_ALIGNMENT + CLI_HEADER_SIZE;
        assert_eq!(&bytes[root..root + 4], b"BSJB");
    }

    #[test]
    fn compress_matches_ecma_examples() {
        assert_eq!(compress(0x03), vec![0x03]);
        assert_eq!(compress(0x80), vec![0x80, 0x80]);
        assert_eq!(compress(0x2E57), vec![0xAE, 0x57]);
        assert_eq!(compress(0x4000), vec![0xC0, 0x00, 0x40, 0x00]);
    }

    #[test]
    fn nested_full_name_uses_plus() {
        let inner = TypeDefinition::class("Acme", "Inner").nested_in("Acme.Outer");
        assert_eq!(inner.full_name(), "Acme.Outer+Inner");
    }
}
