use std::fmt;

/// Explicit byte order of a schema.
///
/// There is deliberately no native or host-default variant: every schema has
/// to pick one of these at definition time. `Big` and `Network` produce the
/// same bytes and only differ in the marker written into the format token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
    Network,
}

impl ByteOrder {
    /// The marker that prefixes a format token.
    pub fn marker(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::Network => '!',
        }
    }

    pub fn from_marker(marker: char) -> Option<ByteOrder> {
        match marker {
            '<' => Some(ByteOrder::Little),
            '>' => Some(ByteOrder::Big),
            '!' => Some(ByteOrder::Network),
            _ => None,
        }
    }

    pub fn is_little_endian(self) -> bool {
        matches!(self, ByteOrder::Little)
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
            ByteOrder::Network => "network",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-width scalar wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bool,
    F32,
    F64,
}

pub const SCALARS: [Scalar; 11] = [
    Scalar::U8,
    Scalar::U16,
    Scalar::U32,
    Scalar::U64,
    Scalar::I8,
    Scalar::I16,
    Scalar::I32,
    Scalar::I64,
    Scalar::Bool,
    Scalar::F32,
    Scalar::F64,
];

impl Scalar {
    /// The single-character wire code used in format tokens.
    pub fn code(self) -> char {
        match self {
            Scalar::U8 => 'B',
            Scalar::U16 => 'H',
            Scalar::U32 => 'I',
            Scalar::U64 => 'Q',
            Scalar::I8 => 'b',
            Scalar::I16 => 'h',
            Scalar::I32 => 'i',
            Scalar::I64 => 'q',
            Scalar::Bool => '?',
            Scalar::F32 => 'f',
            Scalar::F64 => 'd',
        }
    }

    pub fn from_code(code: char) -> Option<Scalar> {
        SCALARS.iter().copied().find(|s| s.code() == code)
    }

    /// Byte width on the wire.
    pub fn size(self) -> usize {
        match self {
            Scalar::U8 | Scalar::I8 | Scalar::Bool => 1,
            Scalar::U16 | Scalar::I16 => 2,
            Scalar::U32 | Scalar::I32 | Scalar::F32 => 4,
            Scalar::U64 | Scalar::I64 | Scalar::F64 => 8,
        }
    }

    /// The name used in schema documents, e.g. `uint16`.
    pub fn name(self) -> &'static str {
        match self {
            Scalar::U8 => "uint8",
            Scalar::U16 => "uint16",
            Scalar::U32 => "uint32",
            Scalar::U64 => "uint64",
            Scalar::I8 => "int8",
            Scalar::I16 => "int16",
            Scalar::I32 => "int32",
            Scalar::I64 => "int64",
            Scalar::Bool => "bool",
            Scalar::F32 => "float32",
            Scalar::F64 => "float64",
        }
    }

    pub fn from_name(name: &str) -> Option<Scalar> {
        SCALARS.iter().copied().find(|s| s.name() == name)
    }

    pub fn is_integer(self) -> bool {
        self.int_range().is_some()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Scalar::F32 | Scalar::F64)
    }

    /// Inclusive representable range for the integer kinds.
    pub fn int_range(self) -> Option<(i128, i128)> {
        match self {
            Scalar::U8 => Some((0, u8::MAX as i128)),
            Scalar::U16 => Some((0, u16::MAX as i128)),
            Scalar::U32 => Some((0, u32::MAX as i128)),
            Scalar::U64 => Some((0, u64::MAX as i128)),
            Scalar::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Scalar::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Scalar::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Scalar::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Scalar::Bool | Scalar::F32 | Scalar::F64 => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[test]
fn scalar_codes_round_trip() {
    for scalar in SCALARS {
        assert_eq!(Scalar::from_code(scalar.code()), Some(scalar));
        assert_eq!(Scalar::from_name(scalar.name()), Some(scalar));
    }
    assert_eq!(Scalar::from_code('s'), None);
    assert_eq!(Scalar::from_name("native"), None);
}

#[test]
fn byte_order_markers() {
    assert_eq!(ByteOrder::Little.marker(), '<');
    assert_eq!(ByteOrder::Big.marker(), '>');
    assert_eq!(ByteOrder::Network.marker(), '!');
    assert_eq!(ByteOrder::from_marker('='), None);
    assert_eq!(ByteOrder::from_marker('@'), None);
}
