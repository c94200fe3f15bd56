//! Length-prefixed payload frames.
//!
//! A frame is a `u32` little-endian payload length followed by the
//! payload's [`Wire`] encoding. Frames are what the collectives move, so
//! a receiver can check each slice independently before decoding it.

use tessera_core::wire::{read_u32_le, write_u32_le};
use tessera_core::{from_bytes, Wire, WireError};

const HEADER: usize = 4;

/// Append `value` as a frame to `buf`; returns the frame's length.
pub(crate) fn write_frame<V: Wire>(value: &V, buf: &mut Vec<u8>) -> usize {
    let start = buf.len();
    write_u32_le(buf, 0);
    value.encode(buf);
    let payload = (buf.len() - start - HEADER) as u32;
    buf[start..start + HEADER].copy_from_slice(&payload.to_le_bytes());
    buf.len() - start
}

/// Decode a value from exactly one frame.
pub(crate) fn read_frame<V: Wire>(frame: &[u8]) -> Result<V, WireError> {
    let mut r = frame;
    let declared = read_u32_le(&mut r)? as usize;
    if declared != r.len() {
        return Err(WireError::FrameLength {
            declared,
            actual: r.len(),
        });
    }
    from_bytes(r)
}
