/*
    Ballistic EKF, extended Kalman filtering of nonlinear dynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

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

extern crate ballistic_ekf;
#[macro_use]
extern crate log;
extern crate pretty_env_logger;

use ballistic_ekf::io::{ConfigRepr, ScenarioSerde};
use std::env::{args, set_var, var};
use std::error::Error;

const LOG_VAR: &str = "BALL_LOG";

/// Runs the falling ball scenario provided as the first argument (a YAML file), or the default scenario.
fn main() -> Result<(), Box<dyn Error>> {
    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "INFO");
    }

    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        println!("could not init logger");
    }

    let scenario = match args().nth(1) {
        Some(path) => {
            info!("loading scenario from {path}");
            ScenarioSerde::load(&path)?
        }
        None => {
            info!("no scenario provided, using the default one");
            ScenarioSerde::default()
        }
    };

    let sim = match scenario.to_simulation() {
        Ok(sim) => sim,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    info!("{}", sim.filter);

    let results = match sim.run() {
        Ok(results) => results,
        Err(e) => {
            error!("{e} ({})", e.kind());
            return Err(e.into());
        }
    };

    info!("filter error: {:.6e}", results.filter_error);
    if let Some(est) = results.final_estimate() {
        info!("final {est}");
    }

    Ok(())
}
