//! Wire-level building blocks for safepack: the byte order policy, the scalar
//! wire codes, a fixed-width pack/unpack primitive and the dynamic [Value]
//! used to hold record instances.
//!
//! ```
//! use safepack_schema::*;
//!
//! let mut buf = [0u8; 3];
//! let mut bb = ByteWriter::new(&mut buf);
//! bb.write_scalar(Scalar::U8, ByteOrder::Network, ScalarValue::Int(1)).unwrap();
//! bb.write_scalar(Scalar::U16, ByteOrder::Network, ScalarValue::Int(1024)).unwrap();
//! assert_eq!(buf, [0x01, 0x04, 0x00]);
//!
//! let mut bb = ByteReader::new(&buf);
//! assert_eq!(bb.read_scalar(Scalar::U8, ByteOrder::Network), Ok(ScalarValue::Int(1)));
//! ```

pub mod bb;
pub mod value;
pub mod wire;

pub use bb::*;
pub use value::*;
pub use wire::*;
