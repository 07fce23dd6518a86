//! Fixed-point math utilities for deterministic simulation.
//!
//! Every coordinate, distance and threshold in the engine is an
//! [`I32F32`](fixed::types::I32F32). Floating-point operations can produce
//! different results on different CPUs, which would break lockstep.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Half a map unit, used to pad degenerate boxes.
pub const HALF: Fixed = Fixed::from_bits(1 << 31);

/// Components above this magnitude are scaled down before squaring.
const LENGTH_SCALE_THRESHOLD: Fixed = Fixed::from_bits(1 << 46);

/// Divisor applied to long vectors in [`Vec2Fixed::length`].
const LENGTH_SCALE: Fixed = Fixed::from_bits(1 << 48);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole map units.
    #[must_use]
    pub fn from_int(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Whether `other` is within `range` of this point (inclusive).
    #[must_use]
    pub fn within(self, other: Self, range: Fixed) -> bool {
        self.distance_squared(other) <= range.saturating_mul(range)
    }

    /// Dot product of two vectors, saturating at the representable range.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Length of the vector.
    ///
    /// Long vectors are measured at 1/65536 scale so the squared length
    /// stays representable anywhere on the map.
    #[must_use]
    pub fn length(self) -> Fixed {
        let largest = self.x.saturating_abs().max(self.y.saturating_abs());
        if largest <= LENGTH_SCALE_THRESHOLD {
            return fixed_sqrt(self.dot(self));
        }
        let scaled = Self::new(self.x / LENGTH_SCALE, self.y / LENGTH_SCALE);
        fixed_sqrt(scaled.dot(scaled)).saturating_mul(LENGTH_SCALE)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Advance towards `target` by at most `speed`, never overshooting.
    #[must_use]
    pub fn step_towards(self, target: Self, speed: Fixed) -> Self {
        let diff = target - self;
        let len = diff.length();
        if len <= speed || len == Fixed::ZERO {
            return target;
        }
        let direction = Self::new(diff.x / len, diff.y / len);
        self + Self::new(
            direction.x.saturating_mul(speed),
            direction.y.saturating_mul(speed),
        )
    }
}

/// Computes the square root of a fixed-point number using binary search.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Component-wise, saturating at the map's representable range.
impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_add(rhs.x),
            y: self.y.saturating_add(rhs.y),
        }
    }
}

/// Component-wise, saturating at the map's representable range.
impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_sub(rhs.x),
            y: self.y.saturating_sub(rhs.y),
        }
    }
}

/// Axis-aligned rectangle in map space: origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectFixed {
    /// Top-left corner.
    pub origin: Vec2Fixed,
    /// Width and height (never negative).
    pub size: Vec2Fixed,
}

impl RectFixed {
    /// Smallest rectangle containing every point. `None` for no points.
    #[must_use]
    pub fn bounding(points: impl IntoIterator<Item = Vec2Fixed>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self {
            origin: min,
            size: max - min,
        })
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        let max = self.origin + self.size;
        point.x >= self.origin.x && point.x <= max.x && point.y >= self.origin.y && point.y <= max.y
    }

    /// Center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        Vec2Fixed::new(
            self.origin.x.saturating_add(self.size.x / Fixed::from_num(2)),
            self.origin.y.saturating_add(self.size.y / Fixed::from_num(2)),
        )
    }

    /// Pads zero-width and zero-height axes by half a unit on each side.
    #[must_use]
    pub fn padded(self) -> Self {
        let mut rect = self;
        if rect.size.x == Fixed::ZERO {
            rect.origin.x = rect.origin.x.saturating_sub(HALF);
            rect.size.x = Fixed::ONE;
        }
        if rect.size.y == Fixed::ZERO {
            rect.origin.y = rect.origin.y.saturating_sub(HALF);
            rect.size.y = Fixed::ONE;
        }
        rect
    }
}
