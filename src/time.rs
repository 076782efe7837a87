/// Virtual time for the deterministic simulation.
///
/// Represents a logical timestamp with no dependency on `std::time`.
/// Time advances only when the scheduler processes events, never from
/// wall-clock observation. Units are abstract "time units"; the DAO/DIO
/// transmission window is one unit.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A point in simulation time.
///
/// Always finite and non-negative. Construction through [`VirtualTime::new`]
/// and [`VirtualTime::plus`] enforces that, which is what makes the total
/// `Ord` below sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualTime(f64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    /// Create a `VirtualTime` from a raw value.
    ///
    /// Returns `None` for negative, NaN or infinite values.
    #[inline]
    pub fn new(t: f64) -> Option<Self> {
        if t.is_finite() && t >= 0.0 {
            Some(VirtualTime(t))
        } else {
            None
        }
    }

    /// Return the raw value.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Compute the absolute time that is `delay` units after `self`.
    ///
    /// Returns `None` if `delay` is negative or not finite, or if the sum
    /// overflows to infinity.
    #[inline]
    pub fn plus(self, delay: f64) -> Option<VirtualTime> {
        if !delay.is_finite() || delay < 0.0 {
            return None;
        }
        VirtualTime::new(self.0 + delay)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: VirtualTime) -> bool {
        self.0 < other.0
    }

    /// Returns the elapsed units between two points in time.
    /// Returns `None` if `other` is after `self`.
    #[inline]
    pub fn duration_since(self, other: VirtualTime) -> Option<f64> {
        if other.0 > self.0 {
            None
        } else {
            Some(self.0 - other.0)
        }
    }
}

impl Eq for VirtualTime {}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={:.3}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(VirtualTime::ZERO.as_f64(), 0.0);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(VirtualTime::new(-1.0).is_none());
        assert!(VirtualTime::new(f64::NAN).is_none());
        assert!(VirtualTime::new(f64::INFINITY).is_none());
    }

    #[test]
    fn test_ordering() {
        let t1 = VirtualTime::new(1.5).unwrap();
        let t2 = VirtualTime::new(2.25).unwrap();
        assert!(t1 < t2);
        assert!(t1.is_before(t2));
        assert!(!t2.is_before(t1));
    }

    #[test]
    fn test_plus() {
        let t = VirtualTime::new(1.0).unwrap();
        assert_eq!(t.plus(0.5).unwrap().as_f64(), 1.5);
        assert_eq!(t.plus(0.0), Some(t));
        assert!(t.plus(-0.1).is_none());
        assert!(t.plus(f64::NAN).is_none());
    }

    #[test]
    fn test_duration_since() {
        let t1 = VirtualTime::new(1.0).unwrap();
        let t2 = VirtualTime::new(3.0).unwrap();
        assert_eq!(t2.duration_since(t1), Some(2.0));
        assert_eq!(t1.duration_since(t2), None);
    }

    #[test]
    fn test_display() {
        let t = VirtualTime::new(1.0).unwrap();
        assert_eq!(format!("{}", t), "T=1.000");
    }
}
