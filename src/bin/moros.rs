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

//! Propagate the reference asteroid backward and forward from the requested
//! epoch, with jet transport of the uncertain initial parameters, and record
//! the dense trajectories plus the Earth close-approach events.

#[macro_use]
extern crate log;

use clap::Parser;
use hifitime::Epoch;
use moros::constants::{AU_KM, DAYS_PER_YEAR, JD_J2000, SECONDS_PER_DAY};
use moros::prelude::*;
use moros::MorosError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

const LOG_VAR: &str = "MOROS_LOG";

/// Reference barycentric state of (99942) Apophis at 2020-12-17T00:00:00 TDB
/// (JPL orbital solution), km and km/s.
const APOPHIS_POS_KM: [f64; 3] = [-1.2946194810881332e8, 7.0598215550312415e7, 2.6168502572235525e7];
const APOPHIS_VEL_KM_S: [f64; 3] = [-18.3713873961710, -23.8544519923267, -9.2080622586717];

/// Scaled-variable factors for the eight jet parameters: position, velocity,
/// Yarkovsky magnitude, radiation-pressure coefficient. These keep the jet
/// coefficients O(1) over the multi-decade legs.
const JET_SCALES: [f64; 8] = [1e-8, 1e-8, 1e-8, 1e-8, 1e-8, 1e-8, 1e-13, 1e-14];

#[derive(Parser)]
#[command(
    name = "moros",
    about = "Taylor-series propagation of a near-Earth asteroid with jet transport"
)]
struct Args {
    /// Initial epoch (ISO date-time, UTC).
    #[arg(long, default_value = "2020-12-17T00:00:00")]
    jd0: String,

    /// Total degree of the jet-transport algebra (0 disables jet transport).
    #[arg(long, default_value_t = 5)]
    varorder: usize,

    /// Step cap per integration direction.
    #[arg(long, default_value_t = 10_000)]
    maxsteps: usize,

    /// Years to integrate backward (negative).
    #[arg(long = "nyears_bwd", default_value_t = -18.0, allow_negative_numbers = true)]
    nyears_bwd: f64,

    /// Years to integrate forward.
    #[arg(long = "nyears_fwd", default_value_t = 9.0, allow_negative_numbers = true)]
    nyears_fwd: f64,

    /// Taylor expansion order per step.
    #[arg(long, default_value_t = 25)]
    order: usize,

    /// Absolute truncation tolerance.
    #[arg(long, default_value_t = 1e-20)]
    abstol: f64,

    /// Use the fused coefficient kernel.
    #[arg(long = "parse_eqs", default_value_t = true, action = clap::ArgAction::Set)]
    parse_eqs: bool,

    /// Solar-system ephemeris container.
    #[arg(long = "ss_eph_file", default_value = "./sseph343ast016_p31y_et.bin")]
    ss_eph_file: PathBuf,

    /// Nominal Yarkovsky acceleration magnitude, au/day².
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    yarkovsky: f64,

    /// Nominal radiation-pressure coefficient.
    #[arg(long, default_value_t = 0.0)]
    srp: f64,

    /// Output file prefix.
    #[arg(long = "out_prefix", default_value = "apophis")]
    out_prefix: String,
}

fn parse_epoch(input: &str) -> Result<f64, MorosError> {
    let epoch = Epoch::from_str(input)
        .or_else(|_| Epoch::from_str(&format!("{input} UTC")))
        .map_err(|e| MorosError::EpochParsing {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
    Ok(epoch.to_jde_tdb_days() - JD_J2000)
}

fn run_legs<R>(
    dynamics: &RelativisticDynamics,
    opts: PropOpts,
    t0: f64,
    state: Vec<R>,
    args: &Args,
    earth: Option<usize>,
) -> Result<(), MorosError>
where
    R: Coeff + Serialize + DeserializeOwned,
{
    let prop = Propagator::new(dynamics, opts);

    if args.nyears_bwd != 0.0 {
        let mut instance = prop.with(t0, state.clone());
        let sol = instance.until(t0 + args.nyears_bwd * DAYS_PER_YEAR)?;
        info!(
            "backward leg: {:?} after {} steps, final epoch {:.4} days past J2000",
            sol.outcome,
            sol.trajectory.len(),
            sol.t
        );
        let path = format!("{}_bwd.bin", args.out_prefix);
        sol.trajectory.save(&path)?;
        info!("backward dense trajectory written to {path}");
    }

    if args.nyears_fwd != 0.0 {
        let mut instance = prop.with(t0, state);
        let t_end = t0 + args.nyears_fwd * DAYS_PER_YEAR;
        let sol = match earth {
            Some(body) => {
                let event = ClosestApproach::new(dynamics.ephemeris().clone(), body);
                instance.until_with_events(t_end, &event, &EventOpts::default())?
            }
            None => instance.until(t_end)?,
        };
        info!(
            "forward leg: {:?} after {} steps, {} close-approach event(s)",
            sol.outcome,
            sol.trajectory.len(),
            sol.events.len()
        );
        for event in &sol.events {
            info!(
                "close approach at {:.6} days past J2000 (residual {:e})",
                event.t, event.value
            );
        }
        let path = format!("{}_fwd.bin", args.out_prefix);
        sol.trajectory.save(&path)?;
        info!("forward dense trajectory written to {path}");
        if !sol.events.is_empty() {
            let path = format!("{}_events.bin", args.out_prefix);
            EventRecord::save_vec(&sol.events, &path)?;
            info!("event log written to {path}");
        }
    }

    Ok(())
}

fn main() -> Result<(), MorosError> {
    if std::env::var(LOG_VAR).is_err() {
        std::env::set_var(LOG_VAR, "INFO");
    }
    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        eprintln!("could not init logger");
    }

    let args = Args::parse();
    let t0 = parse_epoch(&args.jd0)?;
    info!("initial epoch: {:.6} days of TDB past J2000", t0);

    let eph = Arc::new(SolarSystemEphemeris::load_file(&args.ss_eph_file)?);
    let earth = eph.bodies().iter().position(|b| b.name == "Earth");
    let dynamics = RelativisticDynamics::new(eph).with_threading(true);

    let opts = PropOpts {
        order: args.order,
        abstol: args.abstol,
        maxsteps: args.maxsteps,
        parse_eqs: args.parse_eqs,
        ..Default::default()
    };

    let values = [
        APOPHIS_POS_KM[0] / AU_KM,
        APOPHIS_POS_KM[1] / AU_KM,
        APOPHIS_POS_KM[2] / AU_KM,
        APOPHIS_VEL_KM_S[0] * SECONDS_PER_DAY / AU_KM,
        APOPHIS_VEL_KM_S[1] * SECONDS_PER_DAY / AU_KM,
        APOPHIS_VEL_KM_S[2] * SECONDS_PER_DAY / AU_KM,
        args.yarkovsky,
        args.srp,
    ];

    if args.varorder == 0 {
        info!("jet transport disabled, running the plain numeric integration");
        run_legs(&dynamics, opts, t0, values.to_vec(), &args, earth)
    } else {
        let table = JetTable::shared(values.len(), args.varorder);
        let state: Vec<MultiSeries> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                MultiSeries::constant(table.clone(), v)
                    + MultiSeries::variable(table.clone(), i, JET_SCALES[i])
            })
            .collect();
        run_legs(&dynamics, opts, t0, state, &args, earth)
    }
}
