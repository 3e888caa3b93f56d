use image::RgbaImage;

const BYTES_PER_PIXEL: u64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("bitmap {width}x{height} has no pixels")]
    Empty { width: u32, height: u32 },
    #[error("bitmap {width}x{height} overflows the address space")]
    Overflow { width: u32, height: u32 },
    #[error("bitmap of {bytes} bytes exceeds the {budget} byte budget")]
    OverBudget { bytes: u64, budget: u64 },
    #[error("allocator refused {bytes} bytes")]
    OutOfMemory { bytes: u64 },
}

/// Allocates a zeroed RGBA bitmap without aborting on failure.
pub fn try_alloc_bitmap(width: u32, height: u32, budget: u64) -> Result<RgbaImage, AllocError> {
    if width == 0 || height == 0 {
        return Err(AllocError::Empty { width, height });
    }

    let bytes = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
        .ok_or(AllocError::Overflow { width, height })?;

    if bytes > budget {
        return Err(AllocError::OverBudget { bytes, budget });
    }

    let len = usize::try_from(bytes).map_err(|_| AllocError::Overflow { width, height })?;

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| AllocError::OutOfMemory { bytes })?;
    buffer.resize(len, 0);

    RgbaImage::from_raw(width, height, buffer).ok_or(AllocError::Overflow { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_within_budget() {
        let bitmap = try_alloc_bitmap(10, 20, 10 * 20 * 4).expect("allocation should succeed");

        assert_eq!(bitmap.dimensions(), (10, 20));
        assert!(bitmap.pixels().all(|pixel| pixel.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn rejects_empty_and_oversized_bitmaps() {
        assert_eq!(
            try_alloc_bitmap(0, 5, u64::MAX),
            Err(AllocError::Empty { width: 0, height: 5 })
        );
        assert_eq!(
            try_alloc_bitmap(100, 100, 1024),
            Err(AllocError::OverBudget { bytes: 40_000, budget: 1024 })
        );
    }
}
