/*
    Moros, high-fidelity propagation of near-Earth asteroid trajectories
    Copyright (C) 2023-onwards The Moros Developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::EphemerisError;
use crate::algebra::{Coeff, TaylorSeries};
use serde::{Deserialize, Serialize};

/// A piecewise-polynomial time series over a knot grid.
///
/// Piece `k` covers the half-open interval `[knots[k], knots[k+1])` in the
/// local variable `s = t − knots[k]`; the right endpoint of the *last*
/// interval is accepted. Knots are strictly increasing and expressed in days
/// relative to `epoch` (itself in days of TDB past J2000). Evaluation outside
/// the knot range is an error.
///
/// Both the Solar-System ephemeris (`R = f64`) and the dense output of the
/// integrator (`R` = jet ring) use this container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseSeries<R> {
    epoch: f64,
    knots: Vec<f64>,
    pieces: Vec<Vec<TaylorSeries<R>>>,
    coords: usize,
}

impl<R: Coeff> PiecewiseSeries<R> {
    /// Builds an interpolant, validating the knot and piece structure.
    pub fn new(
        epoch: f64,
        knots: Vec<f64>,
        pieces: Vec<Vec<TaylorSeries<R>>>,
    ) -> Result<Self, EphemerisError> {
        if knots.len() < 2 || pieces.len() + 1 != knots.len() {
            return Err(EphemerisError::Malformed {
                reason: format!(
                    "{} knots cannot delimit {} pieces",
                    knots.len(),
                    pieces.len()
                ),
            });
        }
        for (k, pair) in knots.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(EphemerisError::Malformed {
                    reason: format!("knots not strictly increasing at index {k}"),
                });
            }
        }
        let coords = pieces[0].len();
        if coords == 0 || pieces.iter().any(|p| p.len() != coords) {
            return Err(EphemerisError::Malformed {
                reason: "inconsistent coordinate count across pieces".to_string(),
            });
        }
        Ok(Self {
            epoch,
            knots,
            pieces,
            coords,
        })
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn coords(&self) -> usize {
        self.coords
    }

    pub fn num_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// Start of validity, absolute days past J2000.
    pub fn start(&self) -> f64 {
        self.epoch + self.knots[0]
    }

    /// End of validity, absolute days past J2000.
    pub fn end(&self) -> f64 {
        self.epoch + *self.knots.last().unwrap()
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn piece(&self, k: usize) -> &[TaylorSeries<R>] {
        &self.pieces[k]
    }

    /// Index of the piece containing absolute time `t`.
    fn locate(&self, t: f64) -> Result<usize, EphemerisError> {
        let u = t - self.epoch;
        if u < self.knots[0] || u > *self.knots.last().unwrap() {
            return Err(EphemerisError::OutOfDomain {
                t,
                start: self.start(),
                end: self.end(),
            });
        }
        // partition_point returns the first knot beyond u; the piece is the
        // one before it, clamped so the final right endpoint is accepted.
        let idx = self.knots.partition_point(|k| *k <= u);
        Ok(idx.saturating_sub(1).min(self.pieces.len() - 1))
    }

    /// Evaluate every coordinate at absolute time `t`.
    pub fn evaluate(&self, t: f64) -> Result<Vec<R>, EphemerisError> {
        let k = self.locate(t)?;
        let s = t - self.epoch - self.knots[k];
        Ok(self.pieces[k].iter().map(|p| p.evaluate(s)).collect())
    }

    /// Evaluate a single coordinate at absolute time `t`.
    pub fn evaluate_coord(&self, coord: usize, t: f64) -> Result<R, EphemerisError> {
        let k = self.locate(t)?;
        let s = t - self.epoch - self.knots[k];
        Ok(self.pieces[k][coord].evaluate(s))
    }

    /// Interpolant of the time derivative (term-wise differentiation of every
    /// piece). Velocity and acceleration channels are derived this way.
    pub fn differentiate(&self) -> Self {
        Self {
            epoch: self.epoch,
            knots: self.knots.clone(),
            pieces: self
                .pieces
                .iter()
                .map(|piece| piece.iter().map(|p| p.differentiate()).collect())
                .collect(),
            coords: self.coords,
        }
    }
}

impl PiecewiseSeries<f64> {
    /// Evaluate one coordinate in the ring of the prototype `t`.
    ///
    /// The enclosing piece is located from the constant part of `t`; the piece
    /// polynomial is then Horner-evaluated in the prototype's algebra, so a
    /// symbolic evaluation time (a Taylor series in the integration variable,
    /// possibly over the jet ring) propagates into the returned value. The
    /// integrator's coefficient recursion relies on this.
    pub fn evaluate_coord_in<T: Coeff>(&self, coord: usize, t: &T) -> Result<T, EphemerisError> {
        let k = self.locate(t.const_part())?;
        let piece = &self.pieces[k][coord];
        let s = t.clone() - t.lift(self.epoch + self.knots[k]);
        let order = piece.order();
        let mut acc = t.lift(*piece.coeff(order));
        for i in (0..order).rev() {
            acc = acc * s.clone() + t.lift(*piece.coeff(i));
        }
        Ok(acc)
    }

    /// Evaluate a contiguous coordinate triplet (a position vector) in the
    /// ring of the prototype.
    pub fn evaluate_vec3_in<T: Coeff>(
        &self,
        first_coord: usize,
        t: &T,
    ) -> Result<[T; 3], EphemerisError> {
        Ok([
            self.evaluate_coord_in(first_coord, t)?,
            self.evaluate_coord_in(first_coord + 1, t)?,
            self.evaluate_coord_in(first_coord + 2, t)?,
        ])
    }
}
