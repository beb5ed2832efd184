//! Packed `u16` result format shared with existing wrapper code.
//!
//! Layout: `[len, x1, y1, s1, x2, y2, s2, ...]` where `len = 3 * n + 1` is the
//! total number of elements including `len` itself.

use crate::error::DetectError;
use crate::merge::Detection;

/// Encode detections into the packed layout.
pub fn encode_packed(detections: &[Detection]) -> Result<Vec<u16>, DetectError> {
    let len = detections.len() * 3 + 1;
    let mut packed = Vec::with_capacity(len);
    packed.push(to_u16(len)?);
    for d in detections {
        packed.push(to_u16(d.x as usize)?);
        packed.push(to_u16(d.y as usize)?);
        packed.push(to_u16(d.size as usize)?);
    }
    Ok(packed)
}

/// Decode a packed buffer. Elements past `len` are ignored.
pub fn decode_packed(packed: &[u16]) -> Result<Vec<Detection>, DetectError> {
    let Some(&len) = packed.first() else {
        return Err(DetectError::MalformedPacked("buffer is empty".to_string()));
    };
    let len = len as usize;
    if len == 0 || (len - 1) % 3 != 0 || packed.len() < len {
        return Err(DetectError::MalformedPacked(format!(
            "buffer declares {len} elements but holds {}",
            packed.len()
        )));
    }
    Ok(packed[1..len]
        .chunks_exact(3)
        .map(|c| Detection::new(c[0] as u32, c[1] as u32, c[2] as u32))
        .collect())
}

fn to_u16(value: usize) -> Result<u16, DetectError> {
    u16::try_from(value).map_err(|_| DetectError::WireOverflow(value))
}
