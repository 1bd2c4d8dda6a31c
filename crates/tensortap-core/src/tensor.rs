use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Fixed rank of the foreign library's tensor representation.
///
/// Tensors always carry 4 extents and 4 byte-strides; logically smaller
/// tensors set the unused trailing extents to 1.
pub const MAX_DIMS: usize = 4;

/// Bytes per element (captures are always 32-bit floats).
pub const ELEM_SIZE: u64 = 4;

/// A captured tensor: name, source view geometry, and an owned copy of the
/// element data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    /// Caller-supplied name (e.g. "blk.0.attn_q.weight"); not deduplicated
    pub name: String,
    /// Extents per axis, innermost first
    pub ne: [i64; MAX_DIMS],
    /// Byte stride per axis of the *source* view at capture time
    pub nb: [u64; MAX_DIMS],
    /// Contiguous row-major copy of the elements
    pub data: Vec<f32>,
}

/// Validate rank-4 extents: every axis must be at least 1.
pub fn validate_shape(ne: &[i64; MAX_DIMS]) -> Result<()> {
    if ne.iter().any(|&n| n < 1) {
        return Err(Error::InvalidShape(format!(
            "dimensions must be positive, got {:?}",
            ne
        )));
    }
    Ok(())
}

/// Validate byte strides: f32 elements cannot sit at non-multiple-of-4
/// offsets.
pub fn validate_strides(nb: &[u64; MAX_DIMS]) -> Result<()> {
    if nb.iter().any(|&b| b % ELEM_SIZE != 0) {
        return Err(Error::InvalidArgument(format!(
            "byte strides must be multiples of {}, got {:?}",
            ELEM_SIZE, nb
        )));
    }
    Ok(())
}

/// Number of elements described by the extents, or `None` on overflow.
pub fn checked_element_count(ne: &[i64; MAX_DIMS]) -> Option<usize> {
    ne.iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(usize::try_from(n).ok()?))
}

/// Byte strides of a dense row-major layout for the given extents.
pub fn contiguous_strides(ne: &[i64; MAX_DIMS]) -> [u64; MAX_DIMS] {
    let mut nb = [ELEM_SIZE; MAX_DIMS];
    for i in 1..MAX_DIMS {
        nb[i] = ne[i - 1] as u64 * nb[i - 1];
    }
    nb
}

/// Number of source bytes a strided gather over (`ne`, `nb`) may touch:
/// the largest reachable element offset plus one element. Extents must have
/// passed `validate_shape` first.
pub fn source_span_bytes(ne: &[i64; MAX_DIMS], nb: &[u64; MAX_DIMS]) -> u64 {
    let last: u64 = ne
        .iter()
        .zip(nb.iter())
        .map(|(&n, &b)| (n as u64 - 1) * b)
        .sum();
    last + ELEM_SIZE
}

impl TensorRecord {
    /// Capture a tensor from a borrowed source slice, honoring the caller's
    /// byte strides.
    ///
    /// Exactly `product(ne)` elements are gathered into a contiguous owned
    /// buffer; `src` is only read during this call. The stride values are
    /// retained as metadata describing the source view.
    pub fn from_strided(
        name: &str,
        src: &[f32],
        ne: [i64; MAX_DIMS],
        nb: [u64; MAX_DIMS],
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("tensor name must not be empty".into()));
        }
        validate_shape(&ne)?;
        validate_strides(&nb)?;
        let count = checked_element_count(&ne)
            .ok_or_else(|| Error::InvalidShape(format!("shape product overflows: {:?}", ne)))?;

        let mut data = Vec::with_capacity(count);
        for i3 in 0..ne[3] {
            for i2 in 0..ne[2] {
                for i1 in 0..ne[1] {
                    for i0 in 0..ne[0] {
                        let byte = i3 as u64 * nb[3]
                            + i2 as u64 * nb[2]
                            + i1 as u64 * nb[1]
                            + i0 as u64 * nb[0];
                        let idx = (byte / ELEM_SIZE) as usize;
                        let value = src.get(idx).copied().ok_or_else(|| {
                            Error::InvalidArgument(format!(
                                "source buffer too small: element offset {} out of {}",
                                idx,
                                src.len()
                            ))
                        })?;
                        data.push(value);
                    }
                }
            }
        }

        Ok(Self { name: name.to_string(), ne, nb, data })
    }

    /// Build a record from an already-contiguous buffer. Strides are derived
    /// from the extents.
    pub fn from_contiguous(name: &str, ne: [i64; MAX_DIMS], data: Vec<f32>) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("tensor name must not be empty".into()));
        }
        validate_shape(&ne)?;
        let count = checked_element_count(&ne)
            .ok_or_else(|| Error::InvalidShape(format!("shape product overflows: {:?}", ne)))?;
        if data.len() != count {
            return Err(Error::InvalidShape(format!(
                "shape {:?} expects {} elements, got {}",
                ne,
                count,
                data.len()
            )));
        }
        let nb = contiguous_strides(&ne);
        Ok(Self { name: name.to_string(), ne, nb, data })
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    /// True when the source view was dense row-major with no padding.
    pub fn is_contiguous(&self) -> bool {
        self.nb == contiguous_strides(&self.ne)
    }

    /// Shape formatted as "d0xd1xd2xd3".
    pub fn shape_string(&self) -> String {
        self.ne.map(|n| n.to_string()).join("x")
    }

    /// Write the element values grouped by the three outer axes, one inner
    /// row per line.
    pub fn write_values<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let mut idx = 0;
        for i3 in 0..self.ne[3] {
            for i2 in 0..self.ne[2] {
                for i1 in 0..self.ne[1] {
                    write!(w, "({}-{}-{}):", i3, i2, i1)?;
                    for _ in 0..self.ne[0] {
                        write!(w, " {}", self.data[idx])?;
                        idx += 1;
                    }
                    writeln!(w)?;
                }
            }
        }
        Ok(())
    }
}
