// Constructor signatures and custom attribute value blobs (ECMA-335 II.23.2, II.23.3).

use super::bytes::Cursor;
use crate::error::MarkerError;

const HAS_THIS: u8 = 0x20;
const GENERIC: u8 = 0x10;

const ELEMENT_VOID: u8 = 0x01;
const ELEMENT_BOOLEAN: u8 = 0x02;
const ELEMENT_CHAR: u8 = 0x03;
const ELEMENT_I1: u8 = 0x04;
const ELEMENT_U1: u8 = 0x05;
const ELEMENT_I2: u8 = 0x06;
const ELEMENT_U2: u8 = 0x07;
const ELEMENT_I4: u8 = 0x08;
const ELEMENT_U4: u8 = 0x09;
const ELEMENT_I8: u8 = 0x0A;
const ELEMENT_U8: u8 = 0x0B;
const ELEMENT_R4: u8 = 0x0C;
const ELEMENT_R8: u8 = 0x0D;
const ELEMENT_STRING: u8 = 0x0E;
const ELEMENT_VALUETYPE: u8 = 0x11;
const ELEMENT_CLASS: u8 = 0x12;
const ELEMENT_GENERICINST: u8 = 0x15;
const ELEMENT_OBJECT: u8 = 0x1C;
const ELEMENT_SZARRAY: u8 = 0x1D;

/// Deepest array-of-array nesting accepted in a parameter type
const MAX_TYPE_DEPTH: usize = 8;

/// Literal constructor argument of a marker
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerArg {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(Option<String>),
    /// `System.Type` argument, as its serialized type name
    Type(Option<String>),
    Array(Option<Vec<MarkerArg>>),
}

/// Declared type of one constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    /// A class reference; `System.Type` is the only one with a fixed encoding
    Class(String),
    /// A value type reference, usually an enum whose width lives in another assembly
    ValueType(String),
    Object,
    Array(Box<ParamType>),
    Other(u8),
}

/// Decoded type reference from a `TypeDefOrRefOrSpecEncoded` value, resolved by the caller
pub(crate) type TypeNameResolver<'r> = dyn Fn(u32) -> Option<String> + 'r;

/// Parse a method signature blob into its parameter types.
pub(crate) fn parse_method_params(
    blob: &[u8],
    resolve: &TypeNameResolver<'_>,
) -> Option<Vec<ParamType>> {
    let mut cursor = Cursor::new(blob);
    let convention = cursor.u8()?;
    if convention & HAS_THIS == 0 {
        return None;
    }
    if convention & GENERIC != 0 {
        cursor.compressed_u32()?;
    }
    let count = cursor.compressed_u32()?;
    if cursor.u8()? != ELEMENT_VOID {
        return None;
    }
    (0..count).map(|_| parse_type(&mut cursor, resolve, 0)).collect()
}

fn parse_type(
    cursor: &mut Cursor<'_>,
    resolve: &TypeNameResolver<'_>,
    depth: usize,
) -> Option<ParamType> {
    if depth > MAX_TYPE_DEPTH {
        return None;
    }
    let element = cursor.u8()?;
    let param = match element {
        ELEMENT_BOOLEAN => ParamType::Bool,
        ELEMENT_CHAR => ParamType::Char,
        ELEMENT_I1 => ParamType::I1,
        ELEMENT_U1 => ParamType::U1,
        ELEMENT_I2 => ParamType::I2,
        ELEMENT_U2 => ParamType::U2,
        ELEMENT_I4 => ParamType::I4,
        ELEMENT_U4 => ParamType::U4,
        ELEMENT_I8 => ParamType::I8,
        ELEMENT_U8 => ParamType::U8,
        ELEMENT_R4 => ParamType::R4,
        ELEMENT_R8 => ParamType::R8,
        ELEMENT_STRING => ParamType::String,
        ELEMENT_OBJECT => ParamType::Object,
        ELEMENT_CLASS => {
            let coded = cursor.compressed_u32()?;
            ParamType::Class(resolve(coded).unwrap_or_default())
        }
        ELEMENT_VALUETYPE => {
            let coded = cursor.compressed_u32()?;
            ParamType::ValueType(resolve(coded).unwrap_or_default())
        }
        ELEMENT_SZARRAY => ParamType::Array(Box::new(parse_type(cursor, resolve, depth + 1)?)),
        other => ParamType::Other(other),
    };
    Some(param)
}

/// Extract the generic type definition reference from a `TypeSpec` blob
/// (`GENERICINST (CLASS|VALUETYPE) TypeDefOrRefEncoded ...`).
pub(crate) fn generic_instance_target(blob: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(blob);
    if cursor.u8()? != ELEMENT_GENERICINST {
        return None;
    }
    match cursor.u8()? {
        ELEMENT_CLASS | ELEMENT_VALUETYPE => cursor.compressed_u32(),
        _ => None,
    }
}

/// Decode the fixed arguments of a custom attribute value.
///
/// `limit` stops decoding after that many arguments; later arguments are never inspected.
pub(crate) fn decode_fixed_args(
    params: &[ParamType],
    value: &[u8],
    limit: usize,
) -> Result<Vec<MarkerArg>, MarkerError> {
    let mut cursor = Cursor::new(value);
    if cursor.u16() != Some(0x0001) {
        return Err(MarkerError::BadProlog);
    }
    params
        .iter()
        .take(limit)
        .map(|param| decode_value(&mut cursor, param))
        .collect()
}

fn decode_value(cursor: &mut Cursor<'_>, param: &ParamType) -> Result<MarkerArg, MarkerError> {
    let truncated = || MarkerError::Truncated;
    let arg = match param {
        ParamType::Bool => MarkerArg::Bool(cursor.u8().ok_or_else(truncated)? != 0),
        ParamType::Char => {
            let unit = cursor.u16().ok_or_else(truncated)?;
            MarkerArg::Char(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        ParamType::I1 => MarkerArg::Int(cursor.u8().ok_or_else(truncated)? as i8 as i64),
        ParamType::U1 => MarkerArg::UInt(cursor.u8().ok_or_else(truncated)? as u64),
        ParamType::I2 => MarkerArg::Int(cursor.u16().ok_or_else(truncated)? as i16 as i64),
        ParamType::U2 => MarkerArg::UInt(cursor.u16().ok_or_else(truncated)? as u64),
        ParamType::I4 => MarkerArg::Int(cursor.u32().ok_or_else(truncated)? as i32 as i64),
        ParamType::U4 => MarkerArg::UInt(cursor.u32().ok_or_else(truncated)? as u64),
        ParamType::I8 => MarkerArg::Int(cursor.u64().ok_or_else(truncated)? as i64),
        ParamType::U8 => MarkerArg::UInt(cursor.u64().ok_or_else(truncated)?),
        ParamType::R4 => {
            MarkerArg::Float(f32::from_bits(cursor.u32().ok_or_else(truncated)?) as f64)
        }
        ParamType::R8 => MarkerArg::Float(f64::from_bits(cursor.u64().ok_or_else(truncated)?)),
        ParamType::String => MarkerArg::String(ser_string(cursor)?),
        ParamType::Class(name) if name == "System.Type" => MarkerArg::Type(ser_string(cursor)?),
        ParamType::Array(element) => {
            let count = cursor.u32().ok_or_else(truncated)?;
            if count == u32::MAX {
                MarkerArg::Array(None)
            } else {
                let items = (0..count)
                    .map(|_| decode_value(cursor, element))
                    .collect::<Result<Vec<_>, _>>()?;
                MarkerArg::Array(Some(items))
            }
        }
        other => return Err(MarkerError::UnsupportedArgument(format!("{:?}", other))),
    };
    Ok(arg)
}

/// SerString: 0xFF for null, otherwise a compressed length followed by UTF-8 bytes
fn ser_string(cursor: &mut Cursor<'_>) -> Result<Option<String>, MarkerError> {
    if cursor.peek() == Some(0xFF) {
        cursor.u8();
        return Ok(None);
    }
    let len = cursor.compressed_u32().ok_or(MarkerError::Truncated)? as usize;
    let bytes = cursor.take(len).ok_or(MarkerError::Truncated)?;
    Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_types(_: u32) -> Option<String> {
        None
    }

    #[test]
    fn parses_instance_constructor_signature() {
        // instance void .ctor(string, uint32, string)
        let blob = [0x20, 0x03, 0x01, 0x0E, 0x09, 0x0E];
        let params = parse_method_params(&blob, &no_types).unwrap();
        assert_eq!(params, vec![ParamType::String, ParamType::U4, ParamType::String]);
    }

    #[test]
    fn nested_arrays_are_bounded() {
        // instance void .ctor(string[][])
        let blob = [0x20, 0x01, 0x01, 0x1D, 0x1D, 0x0E];
        let params = parse_method_params(&blob, &no_types).unwrap();
        let nested = ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::String))));
        assert_eq!(params, vec![nested]);

        let mut blob = vec![0x20, 0x01, 0x01];
        blob.extend(std::iter::repeat_n(0x1D, 2_000_000));
        blob.push(0x0E);
        assert!(parse_method_params(&blob, &no_types).is_none());
    }

    #[test]
    fn rejects_static_signature() {
        let blob = [0x00, 0x00, 0x01];
        assert!(parse_method_params(&blob, &no_types).is_none());
    }

    #[test]
    fn decodes_string_uint_and_null_string() {
        let mut value = vec![0x01, 0x00, 0x03, b'a', b'b', b'c'];
        value.extend_from_slice(&7u32.to_le_bytes());
        value.push(0xFF);
        value.extend_from_slice(&[0x00, 0x00]);
        let params = [ParamType::String, ParamType::U4, ParamType::String];
        let args = decode_fixed_args(&params, &value, usize::MAX).unwrap();
        assert_eq!(
            args,
            vec![
                MarkerArg::String(Some("abc".to_string())),
                MarkerArg::UInt(7),
                MarkerArg::String(None),
            ]
        );
    }

    #[test]
    fn limit_skips_undecodable_trailing_arguments() {
        let value = [0x01, 0x00, 0x01, b'x', 0x2A, 0x00, 0x00, 0x00];
        let params = [ParamType::String, ParamType::ValueType("Acme.Level".to_string())];
        assert!(decode_fixed_args(&params, &value, usize::MAX).is_err());
        let first = decode_fixed_args(&params, &value, 1).unwrap();
        assert_eq!(first, vec![MarkerArg::String(Some("x".to_string()))]);
    }

    #[test]
    fn missing_prolog_is_reported() {
        let err = decode_fixed_args(&[ParamType::String], &[0x00, 0x00], 1).unwrap_err();
        assert_eq!(err, MarkerError::BadProlog);
    }

    #[test]
    fn truncated_string_is_reported() {
        let err = decode_fixed_args(&[ParamType::String], &[0x01, 0x00, 0x05, b'a'], 1)
            .unwrap_err();
        assert_eq!(err, MarkerError::Truncated);
    }

    #[test]
    fn generic_instance_points_at_definition() {
        // GENERICINST CLASS TypeRef(3) 1 STRING
        let blob = [0x15, 0x12, (3 << 2) | 1, 0x01, 0x0E];
        assert_eq!(generic_instance_target(&blob), Some((3 << 2) | 1));
        assert_eq!(generic_instance_target(&[0x0E]), None);
    }
}
