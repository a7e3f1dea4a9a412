// Exact non-negative rational numbers for share and token accounting.
// Floating point is never used: every replica must reach the same bits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RationalError {
    #[error("Zero denominator")]
    ZeroDenominator,

    #[error("Invalid rational: {0}")]
    Parse(String),
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Non-negative rational, always stored in lowest terms with a positive denominator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    num: u128,
    den: u128,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    pub fn new(num: u128, den: u128) -> Result<Self, RationalError> {
        if den == 0 {
            return Err(RationalError::ZeroDenominator);
        }
        Ok(Self::reduced(num, den))
    }

    fn reduced(num: u128, den: u128) -> Self {
        if num == 0 {
            return Self::ZERO;
        }
        let g = gcd(num, den);
        Self {
            num: num / g,
            den: den / g,
        }
    }

    pub fn from_integer(n: u128) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn numerator(&self) -> u128 {
        self.num
    }

    pub fn denominator(&self) -> u128 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    /// Integer part, rounding toward zero
    pub fn floor(&self) -> u128 {
        self.num / self.den
    }

    pub fn checked_add(&self, other: &Rational) -> Option<Rational> {
        let g = gcd(self.den, other.den);
        let lhs = self.num.checked_mul(other.den / g)?;
        let rhs = other.num.checked_mul(self.den / g)?;
        let den = (self.den / g).checked_mul(other.den)?;
        Some(Self::reduced(lhs.checked_add(rhs)?, den))
    }

    /// None when the result would be negative or overflow
    pub fn checked_sub(&self, other: &Rational) -> Option<Rational> {
        let g = gcd(self.den, other.den);
        let lhs = self.num.checked_mul(other.den / g)?;
        let rhs = other.num.checked_mul(self.den / g)?;
        let den = (self.den / g).checked_mul(other.den)?;
        Some(Self::reduced(lhs.checked_sub(rhs)?, den))
    }

    pub fn checked_mul(&self, other: &Rational) -> Option<Rational> {
        // cross-reduce first to keep intermediates small
        let g1 = gcd(self.num, other.den).max(1);
        let g2 = gcd(other.num, self.den).max(1);
        let num = (self.num / g1).checked_mul(other.num / g2)?;
        let den = (self.den / g2).checked_mul(other.den / g1)?;
        Some(Self::reduced(num, den))
    }

    /// None on division by zero or overflow
    pub fn checked_div(&self, other: &Rational) -> Option<Rational> {
        if other.is_zero() {
            return None;
        }
        self.checked_mul(&Rational {
            num: other.den,
            den: other.num,
        })
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u128> for Rational {
    fn from(n: u128) -> Self {
        Self::from_integer(n)
    }
}

impl Ord for Rational {
    // Continued-fraction comparison, so no cross multiplication can overflow
    fn cmp(&self, other: &Self) -> Ordering {
        let (mut a_num, mut a_den) = (self.num, self.den);
        let (mut b_num, mut b_den) = (other.num, other.den);
        let mut flipped = false;
        loop {
            let (qa, ra) = (a_num / a_den, a_num % a_den);
            let (qb, rb) = (b_num / b_den, b_num % b_den);
            let ord = match qa.cmp(&qb) {
                Ordering::Equal => match (ra == 0, rb == 0) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => {
                        // compare a_den/ra against b_den/rb with the sense reversed
                        a_num = a_den;
                        a_den = ra;
                        b_num = b_den;
                        b_den = rb;
                        flipped = !flipped;
                        continue;
                    }
                },
                ord => ord,
            };
            return if flipped { ord.reverse() } else { ord };
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Rational {
    type Err = RationalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u128>()
                .map_err(|e| RationalError::Parse(format!("{s}: {e}")))
        };
        match s.split_once('/') {
            Some((num, den)) => Rational::new(parse(num)?, parse(den)?),
            None => Ok(Rational::from_integer(parse(s)?)),
        }
    }
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.num, self.den).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let (num, den) = <(u128, u128)>::deserialize(deserializer)?;
            Rational::new(num, den).map_err(serde::de::Error::custom)
        }
    }
}
