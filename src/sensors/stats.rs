//! Robust statistics over small sample sets.
//!
//! Everything here works in place on a caller-owned slice.  Selection
//! reorders the slice and `median_abs_deviation` overwrites it with the
//! deviations, so clone first if the original order matters.

use crate::error::{Error, Result};

/// Scale factor of the modified z-score (`Φ⁻¹(3/4)`), which makes the MAD
/// comparable to a standard deviation for normal data.
pub const MODIFIED_Z_RATIO: f32 = 0.6745;

/// Numeric types the kernel can select over.
pub trait Sample: Copy + PartialOrd + Default {
    /// `|self − other|`.
    fn abs_diff(self, other: Self) -> Self;
    /// Average of two values, rounded down for integers.
    fn midpoint(self, other: Self) -> Self;
    fn to_f32(self) -> f32;
}

impl Sample for u32 {
    fn abs_diff(self, other: Self) -> Self {
        u32::abs_diff(self, other)
    }

    fn midpoint(self, other: Self) -> Self {
        ((u64::from(self) + u64::from(other)) / 2) as u32
    }

    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for f32 {
    fn abs_diff(self, other: Self) -> Self {
        (self - other).abs()
    }

    fn midpoint(self, other: Self) -> Self {
        (self + other) / 2.0
    }

    fn to_f32(self) -> f32 {
        self
    }
}

/// k-th smallest element (0-indexed) via Hoare partitioning.
pub fn quickselect<T: Sample>(list: &mut [T], k: usize) -> Result<T> {
    if k >= list.len() {
        return Err(Error::InvalidArgument);
    }

    let mut lo = 0;
    let mut hi = list.len() - 1;
    while lo < hi {
        // Middle pivot keeps the returned boundary strictly below `hi`.
        let pivot = list[lo + (hi - lo) / 2];
        let mut i = lo;
        let mut j = hi;
        loop {
            while list[i] < pivot {
                i += 1;
            }
            while list[j] > pivot {
                j -= 1;
            }
            if i >= j {
                break;
            }
            list.swap(i, j);
            i += 1;
            j -= 1;
        }
        // [lo..=j] <= pivot <= [j+1..=hi]
        if k <= j {
            hi = j;
        } else {
            lo = j + 1;
        }
    }
    Ok(list[k])
}

/// Median; the floor-average of the two middle values for even lengths.
pub fn median<T: Sample>(list: &mut [T]) -> Result<T> {
    let n = list.len();
    let upper = quickselect(list, n / 2)?;
    if n % 2 == 1 {
        return Ok(upper);
    }
    let lower = quickselect(list, n / 2 - 1)?;
    Ok(lower.midpoint(upper))
}

/// Median of `|x − median|`.  Overwrites `list` with the deviations.
pub fn median_abs_deviation<T: Sample>(median_value: T, list: &mut [T]) -> Result<T> {
    for x in list.iter_mut() {
        *x = x.abs_diff(median_value);
    }
    median(list)
}

/// `ratio * (value − median) / mad`.  `mad` must already be floored above
/// zero by the caller.
pub fn modified_z_score(value: f32, median_value: f32, mad: f32, ratio: f32) -> f32 {
    ratio * (value - median_value) / mad
}

/// Fixed-point exponential moving average with `lambda` in percent.
pub fn ema(new: i32, old: i32, lambda: u8) -> i32 {
    let lambda = i64::from(lambda.min(100));
    ((lambda * i64::from(new) + (100 - lambda) * i64::from(old)) / 100) as i32
}
