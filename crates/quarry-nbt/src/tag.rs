//! The [`Tag`] value type and its wire discriminants.

use crate::Compound;

/// One-byte discriminant identifying a tag's payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    /// Terminates a compound; element type of an empty list.
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagType {
    /// Maps a wire discriminant to its type, or `None` if unknown.
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => TagType::End,
            1 => TagType::Byte,
            2 => TagType::Short,
            3 => TagType::Int,
            4 => TagType::Long,
            5 => TagType::Float,
            6 => TagType::Double,
            7 => TagType::ByteArray,
            8 => TagType::String,
            9 => TagType::List,
            10 => TagType::Compound,
            11 => TagType::IntArray,
            12 => TagType::LongArray,
            _ => return None,
        })
    }

    /// The wire discriminant.
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    /// Homogeneous list; the element type is taken from the first element.
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    /// The discriminant written before this tag's payload.
    pub fn tag_type(&self) -> TagType {
        match self {
            Tag::Byte(_) => TagType::Byte,
            Tag::Short(_) => TagType::Short,
            Tag::Int(_) => TagType::Int,
            Tag::Long(_) => TagType::Long,
            Tag::Float(_) => TagType::Float,
            Tag::Double(_) => TagType::Double,
            Tag::ByteArray(_) => TagType::ByteArray,
            Tag::String(_) => TagType::String,
            Tag::List(_) => TagType::List,
            Tag::Compound(_) => TagType::Compound,
            Tag::IntArray(_) => TagType::IntArray,
            Tag::LongArray(_) => TagType::LongArray,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            Tag::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            Tag::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            Tag::LongArray(v) => Some(v),
            _ => None,
        }
    }

    /// Integer value of any integral tag (byte, short, int or long).
    ///
    /// Readers use this so a field written with a narrower type than
    /// expected still decodes.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Tag::Byte(n) => Some(i64::from(*n)),
            Tag::Short(n) => Some(i64::from(*n)),
            Tag::Int(n) => Some(i64::from(*n)),
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Float(n) => Some(f64::from(*n)),
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Tag {
                fn from(value: $ty) -> Self {
                    Tag::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<i8> => ByteArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<Tag> => List,
    Compound => Compound,
}

impl From<bool> for Tag {
    fn from(value: bool) -> Self {
        Tag::Byte(i8::from(value))
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_type_ids() {
        for id in 0..=12u8 {
            assert_eq!(TagType::from_id(id).unwrap().id(), id);
        }
        assert_eq!(TagType::from_id(13), None);
        assert_eq!(Tag::LongArray(vec![]).tag_type(), TagType::LongArray);
        assert_eq!(Tag::Compound(Compound::new()).tag_type(), TagType::Compound);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(Tag::Byte(-3).as_integer(), Some(-3));
        assert_eq!(Tag::Short(300).as_integer(), Some(300));
        assert_eq!(Tag::Long(1 << 40).as_integer(), Some(1 << 40));
        assert_eq!(Tag::Float(1.0).as_integer(), None);
        assert_eq!(Tag::String("1".into()).as_integer(), None);
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Tag::from(true), Tag::Byte(1));
        assert_eq!(Tag::from("air"), Tag::String("air".to_string()));
        assert_eq!(Tag::from(vec![1i64, 2]), Tag::LongArray(vec![1, 2]));
    }
}
