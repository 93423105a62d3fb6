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

use crate::algebra::AlgebraError;
use crate::dynamics::DynamicsError;
use crate::ephemeris::EphemerisError;
use crate::io::IoError;
use crate::propagation::PropagationError;
use snafu::Snafu;

/// Umbrella error for the driver program and any caller that mixes layers.
#[derive(Debug, Snafu)]
pub enum MorosError {
    #[snafu(display("{source}"), context(false))]
    Algebra { source: AlgebraError },

    #[snafu(display("{source}"), context(false))]
    Ephemeris { source: EphemerisError },

    #[snafu(display("{source}"), context(false))]
    Dynamics { source: DynamicsError },

    #[snafu(display("{source}"), context(false))]
    Propagation { source: PropagationError },

    #[snafu(display("{source}"), context(false))]
    Io { source: IoError },

    #[snafu(display("could not parse epoch `{input}`: {reason}"))]
    EpochParsing { input: String, reason: String },
}
