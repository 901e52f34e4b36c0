//! Drive demand
//!
//! A demand is the (x, y) pair sent with `REQUEST_MODIFY_DEMAND`: signed
//! percentages of turn and forward drive. Each axis is limited to
//! [`DEMAND_MIN`]..=[`DEMAND_MAX`]; a `Demand` can only be built inside
//! that range, so a constructed value always encodes.

use core::fmt;

use crate::error::EncodeError;

/// Lowest demand percentage on either axis
pub const DEMAND_MIN: i32 = -100;

/// Highest demand percentage on either axis
pub const DEMAND_MAX: i32 = 100;

/// A range-checked drive demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Demand {
    x: i8,
    y: i8,
}

impl Demand {
    /// Neutral demand, no motion
    pub const ZERO: Demand = Demand { x: 0, y: 0 };

    /// Create a demand, rejecting either axis outside [-100, 100]
    pub fn new(x: i32, y: i32) -> Result<Self, EncodeError> {
        Ok(Self {
            x: check_axis("x", x)?,
            y: check_axis("y", y)?,
        })
    }

    pub fn x(&self) -> i8 {
        self.x
    }

    pub fn y(&self) -> i8 {
        self.y
    }

    /// Wire bytes: x then y, each a signed byte
    pub fn to_bytes(&self) -> [u8; 2] {
        [self.x as u8, self.y as u8]
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x {}%, y {}%", self.x, self.y)
    }
}

fn check_axis(field: &'static str, value: i32) -> Result<i8, EncodeError> {
    if (DEMAND_MIN..=DEMAND_MAX).contains(&value) {
        // Range check above keeps this lossless
        Ok(value as i8)
    } else {
        Err(EncodeError::Range {
            field,
            value,
            min: DEMAND_MIN,
            max: DEMAND_MAX,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_accepted() {
        assert!(Demand::new(100, -100).is_ok());
        assert!(Demand::new(-100, 100).is_ok());
        assert_eq!(Demand::new(0, 0), Ok(Demand::ZERO));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            Demand::new(101, 0),
            Err(EncodeError::Range {
                field: "x",
                value: 101,
                min: -100,
                max: 100
            })
        );
        assert!(matches!(
            Demand::new(0, -101),
            Err(EncodeError::Range { field: "y", .. })
        ));
    }

    #[test]
    fn test_to_bytes_twos_complement() {
        let demand = Demand::new(-100, 100).unwrap();
        assert_eq!(demand.to_bytes(), [0x9C, 0x64]);
    }
}
