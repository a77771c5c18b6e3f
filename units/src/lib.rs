//! Physical quantities used at the edges of the reconstruction pipeline:
//! angles (Euler angles, angular steps) and lengths (pixel sizes in Å).
//!
//! The numerical core works with bare floats; these types are used where
//! values enter or leave it.

pub use uom;
pub use uom::si::Quantity;
pub use uom::si::f32::{Angle, Length, Ratio};

mod units {
  pub use uom::si::{length::{angstrom, nanometer},
                    ratio ::ratio,
                    angle ::{radian, degree, revolution},
  };
}

/// The full circle constant (τ) Equal to 2π.
pub const TWOPI: Angle = Angle {
    dimension: std::marker::PhantomData,
    units: std::marker::PhantomData,
    value: std::f32::consts::TAU,
};

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(angstrom Length  angstrom);
wrap!(nm       Length nanometer);
wrap!(ratio    Ratio      ratio);
wrap!(radian   Angle     radian);
wrap!(degree   Angle     degree);
wrap!(turn     Angle revolution);

// Reverse direction of the above
pub fn angstrom_(x: Length) -> f32 { x.get::<units::angstrom>() }
pub fn nm_      (x: Length) -> f32 { x.get::<units::nanometer>() }
pub fn ratio_   (x: Ratio ) -> f32 { x.get::<units::ratio>() }
pub fn radian_  (x: Angle ) -> f32 { x.get::<units::radian>() }
pub fn degree_  (x: Angle ) -> f32 { x.get::<units::degree>() }
pub fn turn_    (x: Angle ) -> f32 { x.get::<units::revolution>() }

/// Parse a pixel size such as `"1.5"` (Å assumed), `"1.5 Å"` or `"0.15 nm"`.
pub fn parse_length(s: &str) -> Result<Length, std::num::ParseFloatError> {
    let s = s.trim();
    let (number, unit) = match s.find(|c: char| c.is_alphabetic() || c == 'Å') {
        Some(i) => (s[..i].trim(), s[i..].trim()),
        None    => (s, ""),
    };
    let value: f32 = number.parse()?;
    Ok(match unit {
        "nm" => nm(value),
        _    => angstrom(value),
    })
}

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[test]
  fn degrees_and_turns_agree() {
    use units::radian;
    assert_uom_eq!(radian, degree(180.0), turn(0.5), ulps <= 1);
    assert_uom_eq!(radian, TWOPI, turn(1.0), ulps <= 1);
  }

  #[rstest(/**/ text       , expected,
           case("1.5"      , 1.5    ),
           case("1.5 Å"    , 1.5    ),
           case(" 2.0A "   , 2.0    ),
           case("0.15 nm"  , 1.5    ),
  )]
  fn parse_pixel_size(text: &str, expected: f32) {
    let length = parse_length(text).unwrap();
    float_eq::assert_float_eq!(angstrom_(length), expected, rmax <= 1e-5);
  }

  #[test]
  fn parse_pixel_size_rejects_garbage() {
    assert!(parse_length("big").is_err());
  }
}
