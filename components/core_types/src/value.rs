//! Tagged 64-bit value representation.
//!
//! This module provides the `TaggedValue` word that carries every value
//! crossing component boundaries: a type tag in the upper 32 bits
//! combined with a 32-bit signed payload in the lower 32 bits.

use std::fmt;

use crate::{VmError, VmErrorKind};

/// Type discriminant carried by every [`TaggedValue`].
///
/// The numeric values of the primitive tags follow the classic
/// array-type codes used by the `NEWARRAY` instruction (4–11), so an
/// array-type operand byte maps onto a tag without translation.
/// References use the otherwise-unassigned code 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TypeTag {
    /// Object reference (payload is an object handle, 0 = null)
    Reference = 1,
    /// Boolean (payload 0 or 1)
    Boolean = 4,
    /// UTF-16 code unit
    Char = 5,
    /// 32-bit float (payload is the raw bit pattern)
    Float = 6,
    /// 64-bit float (payload truncated; full doubles are out of scope)
    Double = 7,
    /// 8-bit signed integer
    Byte = 8,
    /// 16-bit signed integer
    Short = 9,
    /// 32-bit signed integer
    Int = 10,
    /// 64-bit signed integer (payload truncated; full longs are out of scope)
    Long = 11,
}

impl TypeTag {
    /// Decode a tag from its raw upper-word value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(TypeTag::Reference),
            4 => Some(TypeTag::Boolean),
            5 => Some(TypeTag::Char),
            6 => Some(TypeTag::Float),
            7 => Some(TypeTag::Double),
            8 => Some(TypeTag::Byte),
            9 => Some(TypeTag::Short),
            10 => Some(TypeTag::Int),
            11 => Some(TypeTag::Long),
            _ => None,
        }
    }

    /// Decode a tag from a `NEWARRAY` array-type operand byte.
    ///
    /// Only the primitive codes 4–11 are valid array-type operands;
    /// references are created through `ANEWARRAY` instead.
    pub fn from_array_type(code: u8) -> Option<Self> {
        match code {
            4..=11 => TypeTag::from_raw(code as u32),
            _ => None,
        }
    }

    /// Short lowercase name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Reference => "reference",
            TypeTag::Boolean => "boolean",
            TypeTag::Char => "char",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Byte => "byte",
            TypeTag::Short => "short",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 64-bit word combining a [`TypeTag`] and a 32-bit signed payload.
///
/// The encoding is `(tag << 32) XOR signExtend64(payload)`. For a
/// non-negative payload the upper 32 bits are exactly the tag; for a
/// negative payload the sign extension flips every upper bit, so the
/// decoder complements the upper word before reading the tag. The
/// payload occupies the lower 32 bits either way.
///
/// # Examples
///
/// ```
/// use core_types::{TaggedValue, TypeTag};
///
/// let v = TaggedValue::encode(TypeTag::Int, -7);
/// assert_eq!(v.tag(), TypeTag::Int);
/// assert_eq!(v.payload(), -7);
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaggedValue(u64);

const UPPER_SIGN_BIT: u32 = 0x8000_0000;

impl TaggedValue {
    /// Encode a tag and payload into a tagged word.
    pub fn encode(tag: TypeTag, payload: i32) -> Self {
        TaggedValue(((tag as u64) << 32) ^ (payload as i64 as u64))
    }

    /// An int-tagged value.
    pub fn int(value: i32) -> Self {
        TaggedValue::encode(TypeTag::Int, value)
    }

    /// A boolean-tagged value (payload 0 or 1).
    pub fn boolean(value: bool) -> Self {
        TaggedValue::encode(TypeTag::Boolean, value as i32)
    }

    /// A char-tagged value holding a UTF-16 code unit.
    pub fn char(unit: u16) -> Self {
        TaggedValue::encode(TypeTag::Char, unit as i32)
    }

    /// A reference-tagged value holding an object handle payload.
    pub fn reference(handle: i32) -> Self {
        TaggedValue::encode(TypeTag::Reference, handle)
    }

    /// The null reference: reference tag with payload 0.
    pub fn null() -> Self {
        TaggedValue::encode(TypeTag::Reference, 0)
    }

    /// The zero value of a declared type: its tag with payload 0.
    ///
    /// Field and array slots are initialized with this, which makes a
    /// fresh reference slot the null reference.
    pub fn zero_of(tag: TypeTag) -> Self {
        TaggedValue::encode(tag, 0)
    }

    /// Decode the type tag.
    pub fn tag(self) -> TypeTag {
        let mut upper = (self.0 >> 32) as u32;
        if upper & UPPER_SIGN_BIT != 0 {
            // Undo the interaction between XOR and the sign extension
            // of a negative payload.
            upper = !upper;
        }
        TypeTag::from_raw(upper).expect("tagged value carries a valid tag")
    }

    /// Decode the 32-bit signed payload.
    pub fn payload(self) -> i32 {
        self.0 as u32 as i32
    }

    /// The raw 64-bit word, as returned by the entry contract.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is a reference-tagged value.
    pub fn is_reference(self) -> bool {
        self.tag() == TypeTag::Reference
    }

    /// Whether this is the null reference.
    pub fn is_null(self) -> bool {
        self.is_reference() && self.payload() == 0
    }

    /// Decode the payload, failing if the tag differs from `expected`.
    ///
    /// This is the type-check-on-access primitive: field, array and
    /// arithmetic instructions use it to reject operands whose tag is
    /// inconsistent with the instruction.
    pub fn expect(self, expected: TypeTag) -> Result<i32, VmError> {
        let tag = self.tag();
        if tag == expected {
            Ok(self.payload())
        } else {
            Err(VmError::new(
                VmErrorKind::TypeMismatch,
                format!("expected {} value, found {}", expected, tag),
            ))
        }
    }
}

impl fmt::Debug for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag().name(), self.payload())
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            TypeTag::Reference => {
                if self.is_null() {
                    write!(f, "null")
                } else {
                    write!(f, "#{}", self.payload())
                }
            }
            TypeTag::Boolean => write!(f, "{}", self.payload() != 0),
            tag => write!(f, "{}:{}", tag, self.payload()),
        }
    }
}
