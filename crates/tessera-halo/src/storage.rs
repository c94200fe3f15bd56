//! The storage collaborator's side of a halo transfer.

use crate::error::HaloError;
use crate::plan::HaloPlan;

/// Byte storage laid out as a plan's bounding region.
///
/// Implementors expose the raw bytes; [`pack`](Self::pack) and
/// [`unpack`](Self::unpack) walk a [`HaloPlan`]'s byte ranges to move the
/// described elements into or out of a contiguous transfer buffer.
pub trait HaloStorage {
    /// The bound's linearised storage.
    fn as_bytes(&self) -> &[u8];

    /// Mutable access to the bound's linearised storage.
    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Append the plan's elements, in transfer order, to `out`.
    fn pack(&self, plan: &HaloPlan, out: &mut Vec<u8>) -> Result<(), HaloError> {
        let bytes = self.as_bytes();
        check_capacity(plan, bytes.len())?;
        out.reserve(plan.byte_count());
        for range in plan.byte_ranges() {
            out.extend_from_slice(&bytes[range]);
        }
        Ok(())
    }

    /// Scatter `data`, in transfer order, into the plan's elements.
    ///
    /// `data` must hold exactly [`HaloPlan::byte_count`] bytes.
    fn unpack(&mut self, plan: &HaloPlan, data: &[u8]) -> Result<(), HaloError> {
        if data.len() != plan.byte_count() {
            return Err(HaloError::PayloadLength {
                expected: plan.byte_count(),
                actual: data.len(),
            });
        }
        let bytes = self.as_bytes_mut();
        check_capacity(plan, bytes.len())?;
        let mut at = 0;
        for range in plan.byte_ranges() {
            let len = range.len();
            bytes[range].copy_from_slice(&data[at..at + len]);
            at += len;
        }
        Ok(())
    }
}

fn check_capacity(plan: &HaloPlan, available: usize) -> Result<(), HaloError> {
    let needed = plan.storage_bytes();
    if available < needed {
        return Err(HaloError::StorageTooSmall { needed, available });
    }
    Ok(())
}

impl HaloStorage for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl HaloStorage for [u8] {
    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}
