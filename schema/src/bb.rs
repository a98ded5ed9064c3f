use crate::wire::{ByteOrder, Scalar};

/// One scalar as handed to or returned from the fixed-width primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i128),
    Float(f64),
}

macro_rules! to_order_bytes {
    ($value:expr, $order:expr) => {
        if $order.is_little_endian() {
            $value.to_le_bytes()
        } else {
            $value.to_be_bytes()
        }
    };
}

macro_rules! from_order_bytes {
    ($ty:ty, $bytes:expr, $order:expr) => {{
        let mut raw = [0u8; std::mem::size_of::<$ty>()];
        raw.copy_from_slice($bytes);
        if $order.is_little_endian() {
            <$ty>::from_le_bytes(raw)
        } else {
            <$ty>::from_be_bytes(raw)
        }
    }};
}

/// Packs `value` as `scalar` into the first `scalar.size()` bytes of `out`.
///
/// Never truncates: an integer outside the wire range, a value of the wrong
/// shape or a too-short `out` are all rejected.
pub fn pack_scalar(
    value: ScalarValue,
    scalar: Scalar,
    order: ByteOrder,
    out: &mut [u8],
) -> Result<(), ()> {
    let size = scalar.size();
    if out.len() < size {
        return Err(());
    }
    let out = &mut out[..size];

    match (scalar, value) {
        (Scalar::Bool, ScalarValue::Bool(b)) => out[0] = b as u8,
        (Scalar::U8, ScalarValue::Int(v)) => out[0] = u8::try_from(v).map_err(|_| ())?,
        (Scalar::I8, ScalarValue::Int(v)) => {
            out[0] = i8::try_from(v).map_err(|_| ())? as u8
        }
        (Scalar::U16, ScalarValue::Int(v)) => {
            let v = u16::try_from(v).map_err(|_| ())?;
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        (Scalar::I16, ScalarValue::Int(v)) => {
            let v = i16::try_from(v).map_err(|_| ())?;
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        (Scalar::U32, ScalarValue::Int(v)) => {
            let v = u32::try_from(v).map_err(|_| ())?;
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        (Scalar::I32, ScalarValue::Int(v)) => {
            let v = i32::try_from(v).map_err(|_| ())?;
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        (Scalar::U64, ScalarValue::Int(v)) => {
            let v = u64::try_from(v).map_err(|_| ())?;
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        (Scalar::I64, ScalarValue::Int(v)) => {
            let v = i64::try_from(v).map_err(|_| ())?;
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        (Scalar::F32, ScalarValue::Float(v)) => {
            // f32 overflow would silently become infinity
            if v.is_finite() && v.abs() > f32::MAX as f64 {
                return Err(());
            }
            out.copy_from_slice(&to_order_bytes!(v as f32, order));
        }
        (Scalar::F64, ScalarValue::Float(v)) => {
            out.copy_from_slice(&to_order_bytes!(v, order));
        }
        _ => return Err(()),
    }

    Ok(())
}

/// Unpacks one `scalar` from the first `scalar.size()` bytes of `bytes`.
///
/// A boolean byte other than `0` or `1` is an error.
pub fn unpack_scalar(bytes: &[u8], scalar: Scalar, order: ByteOrder) -> Result<ScalarValue, ()> {
    let size = scalar.size();
    if bytes.len() < size {
        return Err(());
    }
    let bytes = &bytes[..size];

    Ok(match scalar {
        Scalar::Bool => match bytes[0] {
            0 => ScalarValue::Bool(false),
            1 => ScalarValue::Bool(true),
            _ => return Err(()),
        },
        Scalar::U8 => ScalarValue::Int(bytes[0] as i128),
        Scalar::I8 => ScalarValue::Int(bytes[0] as i8 as i128),
        Scalar::U16 => ScalarValue::Int(from_order_bytes!(u16, bytes, order) as i128),
        Scalar::I16 => ScalarValue::Int(from_order_bytes!(i16, bytes, order) as i128),
        Scalar::U32 => ScalarValue::Int(from_order_bytes!(u32, bytes, order) as i128),
        Scalar::I32 => ScalarValue::Int(from_order_bytes!(i32, bytes, order) as i128),
        Scalar::U64 => ScalarValue::Int(from_order_bytes!(u64, bytes, order) as i128),
        Scalar::I64 => ScalarValue::Int(from_order_bytes!(i64, bytes, order) as i128),
        Scalar::F32 => ScalarValue::Float(from_order_bytes!(f32, bytes, order) as f64),
        Scalar::F64 => ScalarValue::Float(from_order_bytes!(f64, bytes, order)),
    })
}

/// A fixed-width byte cursor meant for reading.
///
/// Example usage:
///
/// ```
/// use safepack_schema::{ByteOrder, ByteReader, Scalar, ScalarValue};
/// let mut bb = ByteReader::new(&[0x04, 0x00, 0xff]);
/// assert_eq!(bb.read_scalar(Scalar::U16, ByteOrder::Little), Ok(ScalarValue::Int(4)));
/// assert_eq!(bb.read_scalar(Scalar::I8, ByteOrder::Little), Ok(ScalarValue::Int(-1)));
/// ```
///
pub struct ByteReader<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader over `data` starting at index 0.
    pub fn new(data: &'a [u8]) -> ByteReader<'a> {
        ByteReader { data, index: 0 }
    }

    /// Create a reader over `data` starting at `index`. Nothing is copied.
    pub fn at(data: &'a [u8], index: usize) -> ByteReader<'a> {
        ByteReader { data, index }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Try to read one scalar starting at the current index.
    pub fn read_scalar(&mut self, scalar: Scalar, order: ByteOrder) -> Result<ScalarValue, ()> {
        let end = self.index.checked_add(scalar.size()).ok_or(())?;
        if end > self.data.len() {
            return Err(());
        }
        let value = unpack_scalar(&self.data[self.index..end], scalar, order)?;
        self.index = end;
        Ok(value)
    }

    /// Try to read `len` raw bytes starting at the current index. The result
    /// aliases the underlying memory.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ()> {
        let end = self.index.checked_add(len).ok_or(())?;
        if end > self.data.len() {
            Err(())
        } else {
            let value = &self.data[self.index..end];
            self.index = end;
            Ok(value)
        }
    }
}

/// A fixed-width byte cursor meant for writing into a caller-owned region.
///
/// Example usage:
///
/// ```
/// use safepack_schema::{ByteOrder, ByteWriter, Scalar, ScalarValue};
/// let mut buf = [0u8; 4];
/// let mut bb = ByteWriter::new(&mut buf);
/// bb.write_scalar(Scalar::U32, ByteOrder::Big, ScalarValue::Int(0xDEADBEEF)).unwrap();
/// assert_eq!(buf, [0xde, 0xad, 0xbe, 0xef]);
/// ```
///
pub struct ByteWriter<'a> {
    data: &'a mut [u8],
    index: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> ByteWriter<'a> {
        ByteWriter { data, index: 0 }
    }

    /// Create a writer over `data` starting at `index`.
    pub fn at(data: &'a mut [u8], index: usize) -> ByteWriter<'a> {
        ByteWriter { data, index }
    }

    /// Returns the current write index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Write one scalar at the current index.
    pub fn write_scalar(
        &mut self,
        scalar: Scalar,
        order: ByteOrder,
        value: ScalarValue,
    ) -> Result<(), ()> {
        let end = self.index.checked_add(scalar.size()).ok_or(())?;
        if end > self.data.len() {
            return Err(());
        }
        pack_scalar(value, scalar, order, &mut self.data[self.index..end])?;
        self.index = end;
        Ok(())
    }

    /// Write `value` into a `len`-byte slot, padding the tail with NUL bytes.
    /// Fails if `value` is longer than `len`.
    pub fn write_padded(&mut self, value: &[u8], len: usize) -> Result<(), ()> {
        let end = self.index.checked_add(len).ok_or(())?;
        if value.len() > len || end > self.data.len() {
            return Err(());
        }
        let slot = &mut self.data[self.index..end];
        slot[..value.len()].copy_from_slice(value);
        slot[value.len()..].fill(0);
        self.index = end;
        Ok(())
    }
}

#[cfg(test)]
fn pack_once(value: ScalarValue, scalar: Scalar, order: ByteOrder) -> Result<Vec<u8>, ()> {
    let mut out = vec![0u8; scalar.size()];
    pack_scalar(value, scalar, order, &mut out)?;
    Ok(out)
}

#[test]
fn pack_integers() {
    use ScalarValue::Int;
    assert_eq!(pack_once(Int(255), Scalar::U8, ByteOrder::Big), Ok(vec![255]));
    assert_eq!(pack_once(Int(256), Scalar::U8, ByteOrder::Big), Err(()));
    assert_eq!(pack_once(Int(-1), Scalar::U8, ByteOrder::Big), Err(()));
    assert_eq!(pack_once(Int(-1), Scalar::I8, ByteOrder::Big), Ok(vec![0xff]));
    assert_eq!(pack_once(Int(1024), Scalar::U16, ByteOrder::Network), Ok(vec![0x04, 0x00]));
    assert_eq!(pack_once(Int(1024), Scalar::U16, ByteOrder::Little), Ok(vec![0x00, 0x04]));
    assert_eq!(
        pack_once(Int(-2), Scalar::I32, ByteOrder::Little),
        Ok(vec![0xfe, 0xff, 0xff, 0xff])
    );
    assert_eq!(
        pack_once(Int(u64::MAX as i128), Scalar::U64, ByteOrder::Big),
        Ok(vec![0xff; 8])
    );
    assert_eq!(
        pack_once(Int(u64::MAX as i128 + 1), Scalar::U64, ByteOrder::Big),
        Err(())
    );
    assert_eq!(
        pack_once(Int(i64::MIN as i128), Scalar::I64, ByteOrder::Big),
        Ok(vec![0x80, 0, 0, 0, 0, 0, 0, 0])
    );
}

#[test]
fn pack_rejects_mismatched_shapes() {
    assert_eq!(pack_once(ScalarValue::Int(1), Scalar::Bool, ByteOrder::Big), Err(()));
    assert_eq!(pack_once(ScalarValue::Bool(true), Scalar::U8, ByteOrder::Big), Err(()));
    assert_eq!(pack_once(ScalarValue::Float(1.0), Scalar::I16, ByteOrder::Big), Err(()));
    assert_eq!(
        pack_once(ScalarValue::Float(1.0e39), Scalar::F32, ByteOrder::Big),
        Err(())
    );
    let mut short = [0u8; 1];
    assert_eq!(
        pack_scalar(ScalarValue::Int(1), Scalar::U16, ByteOrder::Big, &mut short),
        Err(())
    );
}

#[test]
fn pack_floats() {
    assert_eq!(
        pack_once(ScalarValue::Float(25.5), Scalar::F32, ByteOrder::Little),
        Ok(25.5f32.to_le_bytes().to_vec())
    );
    assert_eq!(
        pack_once(ScalarValue::Float(101325.456), Scalar::F64, ByteOrder::Big),
        Ok(101325.456f64.to_be_bytes().to_vec())
    );
    assert_eq!(
        pack_once(ScalarValue::Float(f64::INFINITY), Scalar::F32, ByteOrder::Big),
        Ok(f32::INFINITY.to_be_bytes().to_vec())
    );
}

#[test]
fn unpack_scalars() {
    let read = |bytes: &[u8], scalar| unpack_scalar(bytes, scalar, ByteOrder::Network);
    assert_eq!(read(&[0], Scalar::Bool), Ok(ScalarValue::Bool(false)));
    assert_eq!(read(&[1], Scalar::Bool), Ok(ScalarValue::Bool(true)));
    assert_eq!(read(&[2], Scalar::Bool), Err(()));
    assert_eq!(read(&[0xff], Scalar::I8), Ok(ScalarValue::Int(-1)));
    assert_eq!(read(&[0xff], Scalar::U8), Ok(ScalarValue::Int(255)));
    assert_eq!(read(&[0x04, 0x00], Scalar::U16), Ok(ScalarValue::Int(1024)));
    assert_eq!(read(&[0x04], Scalar::U16), Err(()));
    assert_eq!(
        read(&[0xde, 0xad, 0xbe, 0xef], Scalar::U32),
        Ok(ScalarValue::Int(0xDEADBEEF))
    );
    assert_eq!(
        unpack_scalar(&[0xef, 0xbe, 0xad, 0xde], Scalar::U32, ByteOrder::Little),
        Ok(ScalarValue::Int(0xDEADBEEF))
    );
}

#[test]
fn reader_sequence() {
    let mut bb = ByteReader::new(&[0x01, 0x04, 0x00, 0xff, b'h', b'i']);
    assert_eq!(bb.read_scalar(Scalar::U8, ByteOrder::Big), Ok(ScalarValue::Int(1)));
    assert_eq!(bb.read_scalar(Scalar::U16, ByteOrder::Big), Ok(ScalarValue::Int(1024)));
    assert_eq!(bb.read_scalar(Scalar::I8, ByteOrder::Big), Ok(ScalarValue::Int(-1)));
    assert_eq!(bb.read_bytes(2), Ok(&b"hi"[..]));
    assert_eq!(bb.index(), 6);
    assert_eq!(bb.read_bytes(1), Err(()));
    assert_eq!(bb.read_bytes(0), Ok(&[][..]));
}

#[test]
fn writer_at_offset_leaves_surroundings() {
    let mut buf = [0xAAu8; 8];
    let mut bb = ByteWriter::at(&mut buf, 2);
    bb.write_scalar(Scalar::U16, ByteOrder::Big, ScalarValue::Int(0x0102)).unwrap();
    bb.write_padded(b"a", 3).unwrap();
    assert_eq!(bb.index(), 7);
    assert_eq!(buf, [0xAA, 0xAA, 0x01, 0x02, b'a', 0, 0, 0xAA]);
}

#[test]
fn writer_rejects_overflow() {
    let mut buf = [0u8; 2];
    let mut bb = ByteWriter::new(&mut buf);
    assert_eq!(bb.write_padded(b"abc", 2), Err(()));
    assert_eq!(bb.write_scalar(Scalar::U32, ByteOrder::Big, ScalarValue::Int(1)), Err(()));
    assert_eq!(bb.index(), 0);
}
