//! Moran scatterplot quadrants and LISA move-type codes.

use std::fmt;

use ndarray::{Array2, ArrayView2, Axis};

use geodyn_spatial::SpatialWeights;

use crate::error::LisaError;

/// Quadrant of the Moran scatterplot, coded `HH = 1, LH = 2, LL = 3, HL = 4`
/// as (own value, spatial lag) relative to the mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Quadrant {
    /// High value, high lag.
    HH = 1,
    /// Low value, high lag.
    LH = 2,
    /// Low value, low lag.
    LL = 3,
    /// High value, low lag.
    HL = 4,
}

impl Quadrant {
    /// All quadrants in code order.
    pub const ALL: [Quadrant; 4] = [Quadrant::HH, Quadrant::LH, Quadrant::LL, Quadrant::HL];

    /// Numeric code in `1..=4`.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Quadrant of a point above (`true`) or below the mean on each axis.
    pub fn from_position(own_high: bool, lag_high: bool) -> Self {
        match (own_high, lag_high) {
            (true, true) => Quadrant::HH,
            (false, true) => Quadrant::LH,
            (false, false) => Quadrant::LL,
            (true, false) => Quadrant::HL,
        }
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = LisaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Quadrant::HH),
            2 => Ok(Quadrant::LH),
            3 => Ok(Quadrant::LL),
            4 => Ok(Quadrant::HL),
            _ => Err(LisaError::InvalidQuadrant { value }),
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quadrant::HH => "HH",
            Quadrant::LH => "LH",
            Quadrant::LL => "LL",
            Quadrant::HL => "HL",
        };
        f.write_str(s)
    }
}

/// Move type of a transition from `origin` to `destination`, in `1..=16`.
pub fn move_type(origin: Quadrant, destination: Quadrant) -> u8 {
    4 * (origin.code() - 1) + destination.code()
}

/// Move type refined by the significance of both endpoints, in `1..=64`.
///
/// Codes `1..=16` have both endpoints significant, `17..=32` only the
/// origin, `33..=48` only the destination and `49..=64` neither.
pub fn significant_move_type(
    origin: Quadrant,
    destination: Quadrant,
    origin_significant: bool,
    destination_significant: bool,
) -> u8 {
    let block = match (origin_significant, destination_significant) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    };
    16 * block + move_type(origin, destination)
}

/// Quadrant of every unit and period of an `n x t` panel.
///
/// Each period is centred on its cross-sectional mean; a unit is high when
/// its deviation is strictly positive, and likewise for the lag of the
/// deviations.
///
/// # Errors
///
/// Returns [`LisaError`] if `y` is empty or does not have one row per unit
/// of `w`.
pub fn quadrants<W: SpatialWeights>(
    y: ArrayView2<'_, f64>,
    w: &W,
) -> Result<Array2<Quadrant>, LisaError> {
    if y.is_empty() {
        return Err(LisaError::EmptyData);
    }
    let means = y.mean_axis(Axis(0)).ok_or(LisaError::EmptyData)?;
    let z = &y - &means;
    let lag = w.lag_panel(z.view())?;
    Ok(Array2::from_shape_fn(y.raw_dim(), |(i, t)| {
        Quadrant::from_position(z[[i, t]] > 0.0, lag[[i, t]] > 0.0)
    }))
}
