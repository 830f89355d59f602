//! Rational media timestamps
//!
//! Capture timestamps arrive in the camera's native clock domain (usually a
//! nanosecond timescale). Container presentation times use a coarser
//! timescale. `MediaTime` carries both without going through floating point.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Timescale used for presentation times written to the container.
///
/// 600 divides evenly by 24, 25 and 30 (and their multiples), so common
/// frame rates land on whole ticks.
pub const PRESENTATION_TIMESCALE: i32 = 600;

/// Timescale of capture clocks that report nanoseconds.
pub const NANOSECOND_TIMESCALE: i32 = 1_000_000_000;

/// A timestamp expressed as `value / timescale` seconds.
///
/// The timescale is always positive; deserializing a non-positive one fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawMediaTime")]
pub struct MediaTime {
    value: i64,
    timescale: i32,
}

#[derive(Deserialize)]
struct RawMediaTime {
    value: i64,
    timescale: i32,
}

impl TryFrom<RawMediaTime> for MediaTime {
    type Error = String;

    fn try_from(raw: RawMediaTime) -> Result<Self, Self::Error> {
        if raw.timescale <= 0 {
            return Err(format!("timescale must be positive, got {}", raw.timescale));
        }
        Ok(Self {
            value: raw.value,
            timescale: raw.timescale,
        })
    }
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: PRESENTATION_TIMESCALE,
    };

    /// Create a timestamp. A non-positive timescale is clamped to 1.
    pub fn new(value: i64, timescale: i32) -> Self {
        Self {
            value,
            timescale: timescale.max(1),
        }
    }

    /// Nearest tick of `timescale` to `seconds`.
    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        let timescale = timescale.max(1);
        let value = (seconds * timescale as f64).round() as i64;
        Self { value, timescale }
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self::new(nanos, NANOSECOND_TIMESCALE)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    #[inline]
    pub fn seconds(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    /// Re-express this time in another timescale, rounding half away from zero.
    pub fn convert_scale(&self, timescale: i32) -> MediaTime {
        let timescale = timescale.max(1);
        if timescale == self.timescale {
            return *self;
        }
        let num = self.value as i128 * timescale as i128;
        let den = self.timescale as i128;
        let quotient = num / den;
        let remainder = num % den;
        let rounded = if remainder.abs() * 2 >= den {
            quotient + num.signum()
        } else {
            quotient
        };
        MediaTime {
            value: clamp_i64(rounded),
            timescale,
        }
    }

    /// `self - earlier`, expressed in `timescale`.
    ///
    /// The difference is computed exactly before rounding once.
    /// Returns `None` if either timescale is not positive or the result
    /// does not fit.
    pub fn checked_sub(&self, earlier: MediaTime, timescale: i32) -> Option<MediaTime> {
        if self.timescale <= 0 || earlier.timescale <= 0 {
            return None;
        }
        let timescale = timescale.max(1);
        let lhs = self.value as i128 * earlier.timescale as i128;
        let rhs = earlier.value as i128 * self.timescale as i128;
        let common = self.timescale as i128 * earlier.timescale as i128;
        let diff = lhs.checked_sub(rhs)?;
        let num = diff.checked_mul(timescale as i128)?;
        let quotient = num / common;
        let remainder = num % common;
        let rounded = if remainder.abs() * 2 >= common {
            quotient + num.signum()
        } else {
            quotient
        };
        i64::try_from(rounded)
            .ok()
            .map(|value| MediaTime { value, timescale })
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.3}s)", self.value, self.timescale, self.seconds())
    }
}
