//! Packed tag identifiers and BAM-layout tag values.
//!
//! CRAM keys its per-tag data series by a single integer that packs the two-byte
//! tag name and the one-byte value type: `(n0 << 16) | (n1 << 8) | type`. On the
//! wire the id is three bytes, big-endian. Ids order by their packed value.
//!
//! Values are written in the BAM auxiliary-field layout (little-endian integers,
//! NUL-terminated strings, typed arrays with a 32-bit count).

use std::fmt;

use crate::codec::CodecError;

/// The value types a tag may carry
pub const VALUE_TYPES: &[u8] = b"AiIsScCfZHB";

/// Element types allowed inside a `B` array
const ARRAY_SUBTYPES: &[u8] = b"cCsSiIf";

/// A tag name and value type packed into one integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u32);

impl TagId {
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if the name is not a letter followed by a
    /// letter or digit, or the value type is not one of [`VALUE_TYPES`].
    pub fn new(name: &str, value_type: u8) -> Result<Self, CodecError> {
        let [n0, n1] = <[u8; 2]>::try_from(name.as_bytes())
            .map_err(|_| CodecError::InvalidTag(format!("tag name '{name}' is not two characters")))?;
        Self::from_parts(n0, n1, value_type)
    }

    fn from_parts(n0: u8, n1: u8, value_type: u8) -> Result<Self, CodecError> {
        if !n0.is_ascii_alphabetic() || !n1.is_ascii_alphanumeric() {
            return Err(CodecError::InvalidTag(format!(
                "invalid tag name '{}{}'",
                char::from(n0),
                char::from(n1)
            )));
        }
        if !VALUE_TYPES.contains(&value_type) {
            return Err(CodecError::InvalidTag(format!(
                "invalid value type '{}'",
                char::from(value_type)
            )));
        }
        Ok(Self(
            (u32::from(n0) << 16) | (u32::from(n1) << 8) | u32::from(value_type),
        ))
    }

    /// Unpack a raw id
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if the id uses more than 24 bits or its
    /// fields are invalid.
    pub fn from_raw(id: u32) -> Result<Self, CodecError> {
        if id > 0x00FF_FFFF {
            return Err(CodecError::InvalidTag(format!(
                "tag id {id:#x} does not fit in three bytes"
            )));
        }
        let [_, n0, n1, value_type] = id.to_be_bytes();
        Self::from_parts(n0, n1, value_type)
    }

    /// Read the three-byte big-endian wire form
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if the bytes do not name a valid tag.
    pub fn from_bytes(bytes: [u8; 3]) -> Result<Self, CodecError> {
        let [n0, n1, value_type] = bytes;
        Self::from_parts(n0, n1, value_type)
    }

    /// The three-byte big-endian wire form
    #[must_use]
    pub fn to_bytes(self) -> [u8; 3] {
        let [_, n0, n1, value_type] = self.0.to_be_bytes();
        [n0, n1, value_type]
    }

    /// Pack a 16-bit BAM tag code (`n0 | n1 << 8`) with a value type
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if the code or value type is invalid.
    pub fn from_bam_code(code: u16, value_type: u8) -> Result<Self, CodecError> {
        let [n0, n1] = code.to_le_bytes();
        Self::from_parts(n0, n1, value_type)
    }

    /// The 16-bit BAM tag code, `n0 | n1 << 8`
    #[must_use]
    pub fn bam_code(self) -> u16 {
        let [n0, n1] = self.name();
        u16::from_le_bytes([n0, n1])
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn name(self) -> [u8; 2] {
        let [_, n0, n1, _] = self.0.to_be_bytes();
        [n0, n1]
    }

    #[must_use]
    pub fn name_str(self) -> String {
        let [n0, n1] = self.name();
        format!("{}{}", char::from(n0), char::from(n1))
    }

    #[must_use]
    pub fn value_type(self) -> u8 {
        self.0.to_be_bytes()[3]
    }

    /// Serialize `value` in BAM layout
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if the value's type differs from this tag's
    /// value type or a string value contains a NUL byte.
    pub fn write_value(self, value: &TagValue) -> Result<Vec<u8>, CodecError> {
        if value.value_type() != self.value_type() {
            return Err(CodecError::InvalidTag(format!(
                "{self} cannot hold a value of type '{}'",
                char::from(value.value_type())
            )));
        }
        value.to_bam_bytes()
    }

    /// Parse a BAM-layout value of this tag's type. All of `data` must be used.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if `data` is too short, too long, or malformed.
    pub fn read_value(self, data: &[u8]) -> Result<TagValue, CodecError> {
        let mut input = ValueReader { data, pos: 0 };
        let value = input.read_value(self.value_type())?;
        if input.pos != data.len() {
            return Err(CodecError::InvalidTag(format!(
                "{self}: {} trailing bytes after value",
                data.len() - input.pos
            )));
        }
        Ok(value)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name_str(), char::from(self.value_type()))
    }
}

/// A tag value, one variant per BAM value type
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    String(String),
    Hex(String),
    Array(TagArray),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagArray {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float(Vec<f32>),
}

impl TagArray {
    fn subtype(&self) -> u8 {
        match self {
            Self::Int8(_) => b'c',
            Self::UInt8(_) => b'C',
            Self::Int16(_) => b's',
            Self::UInt16(_) => b'S',
            Self::Int32(_) => b'i',
            Self::UInt32(_) => b'I',
            Self::Float(_) => b'f',
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int8(v) => v.len(),
            Self::UInt8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TagValue {
    /// The smallest integer type that holds `value`, preferring unsigned types for
    /// non-negative values
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidTag` if `value` is outside the 32-bit range.
    pub fn integer(value: i64) -> Result<Self, CodecError> {
        let out_of_range =
            || CodecError::InvalidTag(format!("integer {value} does not fit a tag value"));
        if value >= 0 {
            if let Ok(v) = u8::try_from(value) {
                Ok(Self::UInt8(v))
            } else if let Ok(v) = u16::try_from(value) {
                Ok(Self::UInt16(v))
            } else {
                u32::try_from(value).map(Self::UInt32).map_err(|_| out_of_range())
            }
        } else if let Ok(v) = i8::try_from(value) {
            Ok(Self::Int8(v))
        } else if let Ok(v) = i16::try_from(value) {
            Ok(Self::Int16(v))
        } else {
            i32::try_from(value).map(Self::Int32).map_err(|_| out_of_range())
        }
    }

    /// The BAM value type byte for this value
    #[must_use]
    pub fn value_type(&self) -> u8 {
        match self {
            Self::Char(_) => b'A',
            Self::Int8(_) => b'c',
            Self::UInt8(_) => b'C',
            Self::Int16(_) => b's',
            Self::UInt16(_) => b'S',
            Self::Int32(_) => b'i',
            Self::UInt32(_) => b'I',
            Self::Float(_) => b'f',
            Self::String(_) => b'Z',
            Self::Hex(_) => b'H',
            Self::Array(_) => b'B',
        }
    }

    fn to_bam_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        match self {
            Self::Char(c) => out.push(*c),
            Self::Int8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UInt8(v) => out.push(*v),
            Self::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::String(s) | Self::Hex(s) => {
                if s.as_bytes().contains(&0) {
                    return Err(CodecError::InvalidTag(
                        "string value contains a NUL byte".to_string(),
                    ));
                }
                if matches!(self, Self::Hex(_)) && !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(CodecError::InvalidTag(format!("'{s}' is not a hex string")));
                }
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            Self::Array(array) => {
                out.push(array.subtype());
                let count = u32::try_from(array.len()).map_err(|_| {
                    CodecError::InvalidTag("array has too many elements".to_string())
                })?;
                out.extend_from_slice(&count.to_le_bytes());
                match array {
                    TagArray::Int8(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                    TagArray::UInt8(v) => out.extend_from_slice(v),
                    TagArray::Int16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                    TagArray::UInt16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                    TagArray::Int32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                    TagArray::UInt32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                    TagArray::Float(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                }
            }
        }
        Ok(out)
    }
}

struct ValueReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl ValueReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| {
                CodecError::InvalidTag(format!(
                    "value needs {N} more bytes at offset {}, {} available",
                    self.pos,
                    self.data.len().saturating_sub(self.pos)
                ))
            })?;
        self.pos = end;
        // The slice is exactly N bytes long
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_string(&mut self) -> Result<String, CodecError> {
        let rest = &self.data[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| CodecError::InvalidTag("string value is not NUL-terminated".to_string()))?;
        let s = String::from_utf8(rest[..nul].to_vec())
            .map_err(|e| CodecError::InvalidTag(format!("string value is not UTF-8: {e}")))?;
        self.pos += nul + 1;
        Ok(s)
    }

    fn take_array<T, const N: usize>(
        &mut self,
        count: usize,
        convert: fn([u8; N]) -> T,
    ) -> Result<Vec<T>, CodecError> {
        let available = (self.data.len() - self.pos) / N;
        if count > available {
            return Err(CodecError::InvalidTag(format!(
                "array declares {count} elements but only {available} are present"
            )));
        }
        (0..count).map(|_| self.take::<N>().map(convert)).collect()
    }

    fn read_value(&mut self, value_type: u8) -> Result<TagValue, CodecError> {
        let value = match value_type {
            b'A' => TagValue::Char(self.take::<1>()?[0]),
            b'c' => TagValue::Int8(i8::from_le_bytes(self.take()?)),
            b'C' => TagValue::UInt8(self.take::<1>()?[0]),
            b's' => TagValue::Int16(i16::from_le_bytes(self.take()?)),
            b'S' => TagValue::UInt16(u16::from_le_bytes(self.take()?)),
            b'i' => TagValue::Int32(i32::from_le_bytes(self.take()?)),
            b'I' => TagValue::UInt32(u32::from_le_bytes(self.take()?)),
            b'f' => TagValue::Float(f32::from_le_bytes(self.take()?)),
            b'Z' => TagValue::String(self.take_string()?),
            b'H' => TagValue::Hex(self.take_string()?),
            b'B' => {
                let [subtype] = self.take::<1>()?;
                if !ARRAY_SUBTYPES.contains(&subtype) {
                    return Err(CodecError::InvalidTag(format!(
                        "invalid array element type '{}'",
                        char::from(subtype)
                    )));
                }
                let count = usize::try_from(u32::from_le_bytes(self.take()?))
                    .map_err(|_| CodecError::InvalidTag("array count overflows".to_string()))?;
                let array = match subtype {
                    b'c' => TagArray::Int8(self.take_array(count, i8::from_le_bytes)?),
                    b'C' => TagArray::UInt8(self.take_array(count, |[b]: [u8; 1]| b)?),
                    b's' => TagArray::Int16(self.take_array(count, i16::from_le_bytes)?),
                    b'S' => TagArray::UInt16(self.take_array(count, u16::from_le_bytes)?),
                    b'i' => TagArray::Int32(self.take_array(count, i32::from_le_bytes)?),
                    b'I' => TagArray::UInt32(self.take_array(count, u32::from_le_bytes)?),
                    _ => TagArray::Float(self.take_array(count, f32::from_le_bytes)?),
                };
                TagValue::Array(array)
            }
            other => {
                return Err(CodecError::InvalidTag(format!(
                    "invalid value type '{}'",
                    char::from(other)
                )))
            }
        };
        Ok(value)
    }
}
