//! Binary encode/decode for collective payloads.
//!
//! All integers are little-endian. Strings, byte arrays and sequences are
//! length-prefixed with a `u32` count. The format carries no schema: both
//! ends of a collective must agree on the payload type, which the
//! [`Wire`] bound enforces at compile time.

use crate::error::WireError;
use crate::id::{Rank, RegionId};

/// A payload that can be marshalled through a byte-oriented collective.
///
/// Implementations append their encoding to `buf` and consume exactly
/// the same bytes back from the front of `r`.
///
/// # Examples
///
/// ```
/// use tessera_core::{from_bytes, to_bytes};
///
/// let value = (7u32, String::from("hive-3"), vec![1.5f64, -2.0]);
/// let bytes = to_bytes(&value);
/// let back: (u32, String, Vec<f64>) = from_bytes(&bytes).unwrap();
/// assert_eq!(back, value);
/// ```
pub trait Wire: Sized {
    /// Append the encoding of `self` to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Decode a value from the front of `r`, advancing it.
    fn decode(r: &mut &[u8]) -> Result<Self, WireError>;
}

/// Encode a value into a fresh buffer.
pub fn to_bytes<T: Wire>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

/// Decode a value that must occupy all of `bytes`.
pub fn from_bytes<T: Wire>(bytes: &[u8]) -> Result<T, WireError> {
    let mut r = bytes;
    let value = T::decode(&mut r)?;
    if !r.is_empty() {
        return Err(WireError::TrailingBytes {
            remaining: r.len(),
        });
    }
    Ok(value)
}

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

/// Write a little-endian u32.
pub fn write_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian u64.
pub fn write_u64_le(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    write_u32_le(buf, b.len() as u32);
    buf.extend_from_slice(b);
}

// ── Primitive readers ───────────────────────────────────────────

/// Take exactly `n` bytes from the front of `r`.
pub fn take<'a>(r: &mut &'a [u8], n: usize) -> Result<&'a [u8], WireError> {
    if r.len() < n {
        return Err(WireError::Truncated {
            needed: n,
            available: r.len(),
        });
    }
    let (head, tail) = r.split_at(n);
    *r = tail;
    Ok(head)
}

fn take_array<const N: usize>(r: &mut &[u8]) -> Result<[u8; N], WireError> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(r, N)?);
    Ok(out)
}

/// Read a single byte.
pub fn read_u8(r: &mut &[u8]) -> Result<u8, WireError> {
    Ok(take(r, 1)?[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut &[u8]) -> Result<u32, WireError> {
    Ok(u32::from_le_bytes(take_array(r)?))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut &[u8]) -> Result<u64, WireError> {
    Ok(u64::from_le_bytes(take_array(r)?))
}

/// Read a length-prefixed byte array.
pub fn read_length_prefixed_bytes<'a>(r: &mut &'a [u8]) -> Result<&'a [u8], WireError> {
    let len = read_u32_le(r)? as usize;
    take(r, len)
}

// ── Wire impls ──────────────────────────────────────────────────

macro_rules! wire_le {
    ($($t:ty),*) => {$(
        impl Wire for $t {
            fn encode(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }

            fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
                Ok(<$t>::from_le_bytes(take_array(r)?))
            }
        }
    )*};
}

wire_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Wire for usize {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u64_le(buf, *self as u64);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        let v = read_u64_le(r)?;
        usize::try_from(v).map_err(|_| WireError::InvalidValue {
            reason: format!("{v} does not fit in usize"),
        })
    }
}

impl Wire for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, u8::from(*self));
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        match read_u8(r)? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(WireError::InvalidTag { tag, what: "bool" }),
        }
    }
}

impl Wire for () {
    fn encode(&self, _buf: &mut Vec<u8>) {}

    fn decode(_r: &mut &[u8]) -> Result<Self, WireError> {
        Ok(())
    }
}

impl Wire for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_length_prefixed_bytes(buf, self.as_bytes());
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        let bytes = read_length_prefixed_bytes(r)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| WireError::InvalidUtf8 {
            detail: e.to_string(),
        })
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.len() as u32);
        for item in self {
            item.encode(buf);
        }
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        let len = read_u32_le(r)? as usize;
        // Cap the preallocation: a corrupt length must not reserve gigabytes.
        let mut out = Vec::with_capacity(len.min(r.len()));
        for _ in 0..len {
            out.push(T::decode(r)?);
        }
        Ok(out)
    }
}

impl<T: Wire> Wire for Option<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            None => write_u8(buf, 0),
            Some(v) => {
                write_u8(buf, 1);
                v.encode(buf);
            }
        }
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        match read_u8(r)? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(r)?)),
            tag => Err(WireError::InvalidTag {
                tag,
                what: "option presence flag",
            }),
        }
    }
}

impl<A: Wire, B: Wire> Wire for (A, B) {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
        self.1.encode(buf);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        Ok((A::decode(r)?, B::decode(r)?))
    }
}

impl<A: Wire, B: Wire, C: Wire> Wire for (A, B, C) {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
        self.1.encode(buf);
        self.2.encode(buf);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        Ok((A::decode(r)?, B::decode(r)?, C::decode(r)?))
    }
}

impl Wire for Rank {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.0);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        Ok(Rank(read_u32_le(r)?))
    }
}

impl Wire for RegionId {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u64_le(buf, self.0);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        Ok(RegionId(read_u64_le(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(to_bytes(&0x0102_0304u32), vec![4, 3, 2, 1]);
        assert_eq!(to_bytes(&-1i64), vec![0xff; 8]);
    }

    #[test]
    fn string_is_length_prefixed() {
        let bytes = to_bytes(&String::from("ab"));
        assert_eq!(bytes, vec![2, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn truncated_input_reports_shortfall() {
        let err = from_bytes::<u64>(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            WireError::Truncated {
                needed: 8,
                available: 3
            }
        );
    }

    #[test]
    fn trailing_bytes_rejected() {
        let err = from_bytes::<u8>(&[1, 2]).unwrap_err();
        assert_eq!(err, WireError::TrailingBytes { remaining: 1 });
    }

    #[test]
    fn invalid_bool_and_option_tags() {
        assert!(matches!(
            from_bytes::<bool>(&[2]),
            Err(WireError::InvalidTag { tag: 2, .. })
        ));
        assert!(matches!(
            from_bytes::<Option<u8>>(&[9, 0]),
            Err(WireError::InvalidTag { tag: 9, .. })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut buf = Vec::new();
        write_length_prefixed_bytes(&mut buf, &[0xff, 0xfe]);
        assert!(matches!(
            from_bytes::<String>(&buf),
            Err(WireError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn corrupt_vec_length_does_not_overallocate() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, u32::MAX);
        assert!(matches!(
            from_bytes::<Vec<u64>>(&buf),
            Err(WireError::Truncated { .. })
        ));
    }

    proptest! {
        #[test]
        fn nested_payload_survives(
            ids in prop::collection::vec(any::<u64>(), 0..16),
            name in "[a-z0-9-]{0,12}",
            weight in any::<Option<i32>>(),
        ) {
            let value = (ids.clone(), name.clone(), weight);
            let back: (Vec<u64>, String, Option<i32>) = from_bytes(&to_bytes(&value)).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
