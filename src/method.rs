use std::fmt;
use std::str::FromStr;

use crate::error::TaxError;
use crate::gains::{AverageCostBasis, DrawnCostBasis, GainCalculator};
use crate::selector::{HighestPriceFirst, LotSelector, NewestFirst, OldestFirst, SmallestLotFirst};

/// Cost-basis accounting method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// Average cost basis over the whole eligible pool.
    #[default]
    Acb,
    /// First in, first out.
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Highest price in, first out.
    Hifo,
}

/// The selector/calculator pair a method runs with.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub selector: &'static dyn LotSelector,
    pub gains: &'static dyn GainCalculator,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Acb, Method::Fifo, Method::Lifo, Method::Hifo];

    pub fn strategy(self) -> Strategy {
        match self {
            Method::Acb => Strategy {
                selector: &SmallestLotFirst,
                gains: &AverageCostBasis,
            },
            Method::Fifo => Strategy {
                selector: &OldestFirst,
                gains: &DrawnCostBasis,
            },
            Method::Lifo => Strategy {
                selector: &NewestFirst,
                gains: &DrawnCostBasis,
            },
            Method::Hifo => Strategy {
                selector: &HighestPriceFirst,
                gains: &DrawnCostBasis,
            },
        }
    }
}

impl FromStr for Method {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACB" => Ok(Method::Acb),
            "FIFO" => Ok(Method::Fifo),
            "LIFO" => Ok(Method::Lifo),
            "HIFO" => Ok(Method::Hifo),
            _ => Err(TaxError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Acb => write!(f, "ACB"),
            Method::Fifo => write!(f, "FIFO"),
            Method::Lifo => write!(f, "LIFO"),
            Method::Hifo => write!(f, "HIFO"),
        }
    }
}
