use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{LoadError, MarkerError};
use crate::metadata::image::MetadataImage;
use crate::metadata::signature::{self, MarkerArg, ParamType};
use crate::metadata::tables::{
    ASSEMBLY, ASSEMBLY_REF, CUSTOM_ATTRIBUTE, Coded, MEMBER_REF, METHOD_DEF, NESTED_CLASS,
    TYPE_DEF, TYPE_REF, TYPE_SPEC,
};
use crate::metadata::pe;

const MODULE_TYPE_NAME: &str = "<Module>";
const TYPE_ATTR_INTERFACE: u32 = 0x20;
const MAX_NAME_DEPTH: usize = 16;

/// A structural marker (custom attribute) attached to a type
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Qualified name of the marker type
    pub type_name: String,
    /// Constructor parameter types, as declared
    pub params: Vec<ParamType>,
    value: Vec<u8>,
}

impl Marker {
    pub fn new(type_name: impl Into<String>, params: Vec<ParamType>, value: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            params,
            value,
        }
    }

    /// Marker type name without its namespace or enclosing types
    pub fn simple_name(&self) -> &str {
        simple_name(&self.type_name)
    }

    /// Decode every constructor argument
    pub fn arguments(&self) -> Result<Vec<MarkerArg>, MarkerError> {
        signature::decode_fixed_args(&self.params, &self.value, usize::MAX)
    }

    /// The first constructor argument, which must be a non-blank string
    pub fn leading_identifier(&self) -> Result<String, MarkerError> {
        let first = self.params.first().ok_or(MarkerError::NoArguments)?;
        if *first != ParamType::String {
            return Err(MarkerError::NotAString);
        }
        let args = signature::decode_fixed_args(&self.params, &self.value, 1)?;
        match args.into_iter().next() {
            Some(MarkerArg::String(Some(id))) if !id.trim().is_empty() => Ok(id),
            Some(MarkerArg::String(_)) => Err(MarkerError::EmptyIdentifier),
            _ => Err(MarkerError::NotAString),
        }
    }

    /// The first constructor argument parsed as a UUID
    pub fn leading_uuid(&self) -> Result<Uuid, MarkerError> {
        let id = self.leading_identifier()?;
        Uuid::parse_str(id.trim()).map_err(|_| MarkerError::InvalidUuid(id))
    }
}

/// One type defined by a binary
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub namespace: String,
    pub name: String,
    /// `Namespace.Name`, with `+` separating nested types
    pub full_name: String,
    pub is_class: bool,
    /// Qualified name of the direct base type
    pub base: Option<String>,
    pub markers: Vec<Marker>,
}

impl TypeDescriptor {
    pub fn marker(&self, simple: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.simple_name() == simple)
    }
}

pub(crate) fn simple_name(qualified: &str) -> &str {
    let tail = qualified.rsplit('+').next().unwrap_or(qualified);
    tail.rsplit('.').next().unwrap_or(tail)
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Metadata of one binary, loaded without executing it.
///
/// The file is read once and closed before this value is returned.
#[derive(Debug)]
pub struct BinaryMetadata {
    path: PathBuf,
    image: MetadataImage,
    enclosing: HashMap<u32, u32>,
    attributes: HashMap<u32, Vec<u32>>,
}

/// Load a binary's metadata. Any failure means the binary should be skipped.
pub fn load_binary(path: &Path) -> Result<BinaryMetadata, LoadError> {
    let bytes = std::fs::read(path)?;
    let root = pe::locate_metadata(&bytes)?;
    let image = MetadataImage::parse(bytes, root)?;

    let mut enclosing = HashMap::new();
    for row in 1..=image.row_count(NESTED_CLASS) {
        enclosing.insert(
            image.cell(NESTED_CLASS, row, 0)?,
            image.cell(NESTED_CLASS, row, 1)?,
        );
    }

    let mut attributes: HashMap<u32, Vec<u32>> = HashMap::new();
    for row in 1..=image.row_count(CUSTOM_ATTRIBUTE) {
        let parent = image.cell(CUSTOM_ATTRIBUTE, row, 0)?;
        if let Some((TYPE_DEF, owner)) = Coded::HasCustomAttribute.decode(parent) {
            attributes.entry(owner).or_default().push(row);
        }
    }

    Ok(BinaryMetadata {
        path: path.to_path_buf(),
        image,
        enclosing,
        attributes,
    })
}

impl BinaryMetadata {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name from the assembly manifest, if the binary has one
    pub fn assembly_name(&self) -> Result<Option<String>, LoadError> {
        if self.image.row_count(ASSEMBLY) == 0 {
            return Ok(None);
        }
        let name = self.image.cell(ASSEMBLY, 1, 7)?;
        Ok(Some(self.image.string(name)?))
    }

    /// Names of the assemblies this binary declares as dependencies
    pub fn references(&self) -> Result<Vec<String>, LoadError> {
        (1..=self.image.row_count(ASSEMBLY_REF))
            .map(|row| self.image.string(self.image.cell(ASSEMBLY_REF, row, 6)?))
            .collect()
    }

    /// Lazily describe every type the binary defines, skipping the module pseudo-type
    pub fn types(&self) -> impl Iterator<Item = Result<TypeDescriptor, LoadError>> + '_ {
        (1..=self.image.row_count(TYPE_DEF)).filter_map(move |row| self.describe(row).transpose())
    }

    fn describe(&self, row: u32) -> Result<Option<TypeDescriptor>, LoadError> {
        let flags = self.image.cell(TYPE_DEF, row, 0)?;
        let name = self.image.string(self.image.cell(TYPE_DEF, row, 1)?)?;
        if name == MODULE_TYPE_NAME {
            return Ok(None);
        }
        let namespace = self.image.string(self.image.cell(TYPE_DEF, row, 2)?)?;
        let full_name = self.type_def_name(row, 0)?;
        let base = self.type_def_or_ref_name(self.image.cell(TYPE_DEF, row, 3)?, 0)?;
        let is_class = flags & TYPE_ATTR_INTERFACE == 0
            && !matches!(base.as_deref(), Some("System.ValueType" | "System.Enum"));

        let markers = match self.attributes.get(&row) {
            Some(rows) => rows
                .iter()
                .filter_map(|ca| self.marker(*ca).transpose())
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Some(TypeDescriptor {
            namespace,
            name,
            full_name,
            is_class,
            base,
            markers,
        }))
    }

    /// Read one custom attribute row. `None` when its constructor cannot be resolved.
    fn marker(&self, row: u32) -> Result<Option<Marker>, LoadError> {
        let ctor = self.image.cell(CUSTOM_ATTRIBUTE, row, 1)?;
        let value = self.image.blob(self.image.cell(CUSTOM_ATTRIBUTE, row, 2)?)?;

        let (type_name, sig) = match Coded::CustomAttributeType.decode(ctor) {
            Some((METHOD_DEF, method)) if method > 0 => {
                let Some(owner) = self.method_owner(method)? else {
                    return Ok(None);
                };
                (
                    self.type_def_name(owner, 0)?,
                    self.image.cell(METHOD_DEF, method, 4)?,
                )
            }
            Some((MEMBER_REF, member)) if member > 0 => {
                let parent = self.image.cell(MEMBER_REF, member, 0)?;
                let type_name = match Coded::MemberRefParent.decode(parent) {
                    Some((TYPE_REF, r)) if r > 0 => self.type_ref_name(r, 0)?,
                    Some((TYPE_DEF, d)) if d > 0 => self.type_def_name(d, 0)?,
                    Some((TYPE_SPEC, s)) if s > 0 => match self.type_spec_name(s, 0)? {
                        Some(name) => name,
                        None => return Ok(None),
                    },
                    _ => return Ok(None),
                };
                (type_name, self.image.cell(MEMBER_REF, member, 2)?)
            }
            _ => return Ok(None),
        };

        let sig = self.image.blob(sig)?;
        let resolve = |coded: u32| self.type_def_or_ref_name(coded, 0).ok().flatten();
        let params = signature::parse_method_params(sig, &resolve)
            .ok_or_else(|| LoadError::malformed(format!("bad constructor signature on {}", type_name)))?;

        Ok(Some(Marker::new(type_name, params, value.to_vec())))
    }

    /// TypeDef owning MethodDef `method`: method lists are ascending, so it is the last type
    /// whose list starts at or before it.
    fn method_owner(&self, method: u32) -> Result<Option<u32>, LoadError> {
        let mut owner = None;
        for row in 1..=self.image.row_count(TYPE_DEF) {
            if self.image.cell(TYPE_DEF, row, 5)? <= method {
                owner = Some(row);
            } else {
                break;
            }
        }
        Ok(owner)
    }

    fn type_def_name(&self, row: u32, depth: usize) -> Result<String, LoadError> {
        if depth > MAX_NAME_DEPTH {
            return Err(LoadError::malformed("nested type chain too deep"));
        }
        let name = self.image.string(self.image.cell(TYPE_DEF, row, 1)?)?;
        if let Some(outer) = self.enclosing.get(&row) {
            return Ok(format!("{}+{}", self.type_def_name(*outer, depth + 1)?, name));
        }
        let namespace = self.image.string(self.image.cell(TYPE_DEF, row, 2)?)?;
        Ok(qualify(&namespace, &name))
    }

    fn type_ref_name(&self, row: u32, depth: usize) -> Result<String, LoadError> {
        if depth > MAX_NAME_DEPTH {
            return Err(LoadError::malformed("type reference chain too deep"));
        }
        let scope = self.image.cell(TYPE_REF, row, 0)?;
        let name = self.image.string(self.image.cell(TYPE_REF, row, 1)?)?;
        if let Some((TYPE_REF, outer)) = Coded::ResolutionScope.decode(scope)
            && outer > 0
        {
            return Ok(format!("{}+{}", self.type_ref_name(outer, depth + 1)?, name));
        }
        let namespace = self.image.string(self.image.cell(TYPE_REF, row, 2)?)?;
        Ok(qualify(&namespace, &name))
    }

    /// Generic instantiations resolve to their generic definition's name
    fn type_spec_name(&self, row: u32, depth: usize) -> Result<Option<String>, LoadError> {
        let blob = self.image.blob(self.image.cell(TYPE_SPEC, row, 0)?)?;
        match signature::generic_instance_target(blob) {
            Some(coded) => self.type_def_or_ref_name(coded, depth + 1),
            None => Ok(None),
        }
    }

    fn type_def_or_ref_name(&self, coded: u32, depth: usize) -> Result<Option<String>, LoadError> {
        if depth > MAX_NAME_DEPTH {
            return Err(LoadError::malformed("type specification chain too deep"));
        }
        match Coded::TypeDefOrRef.decode(coded) {
            Some((_, 0)) | None => Ok(None),
            Some((TYPE_DEF, row)) => self.type_def_name(row, depth).map(Some),
            Some((TYPE_REF, row)) => self.type_ref_name(row, depth).map(Some),
            Some((_, row)) => self.type_spec_name(row, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name_strips_namespace_and_nesting() {
        assert_eq!(simple_name("Dolittle.SDK.Events.EventTypeAttribute"), "EventTypeAttribute");
        assert_eq!(simple_name("Acme.Outer+InnerAttribute"), "InnerAttribute");
        assert_eq!(simple_name("Plain"), "Plain");
    }

    #[test]
    fn leading_identifier_requires_string_parameter() {
        let marker = Marker::new("Acme.IdAttribute", vec![ParamType::I4], vec![1, 0, 5, 0, 0, 0]);
        assert_eq!(marker.leading_identifier(), Err(MarkerError::NotAString));

        let marker = Marker::new("Acme.IdAttribute", vec![], vec![1, 0]);
        assert_eq!(marker.leading_identifier(), Err(MarkerError::NoArguments));
    }

    #[test]
    fn leading_identifier_rejects_blank_and_null() {
        let blank = Marker::new("A", vec![ParamType::String], vec![1, 0, 2, b' ', b' ']);
        assert_eq!(blank.leading_identifier(), Err(MarkerError::EmptyIdentifier));

        let null = Marker::new("A", vec![ParamType::String], vec![1, 0, 0xFF]);
        assert_eq!(null.leading_identifier(), Err(MarkerError::EmptyIdentifier));
    }

    #[test]
    fn leading_uuid_parses_identifier() {
        let id = "c2a7f1d4-2d3e-4b8a-9f61-3e5b1a0c7d99";
        let mut value = vec![1, 0, id.len() as u8];
        value.extend_from_slice(id.as_bytes());
        let marker = Marker::new("A", vec![ParamType::String], value);
        assert_eq!(marker.leading_uuid(), Ok(Uuid::parse_str(id).unwrap()));

        let marker = Marker::new("A", vec![ParamType::String], vec![1, 0, 3, b'a', b'b', b'c']);
        assert_eq!(
            marker.leading_uuid(),
            Err(MarkerError::InvalidUuid("abc".to_string()))
        );
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = load_binary(Path::new("/nonexistent/elog/Missing.dll")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
