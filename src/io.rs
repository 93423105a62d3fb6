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

//! File containers for ephemerides, trajectories and event logs.

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Snafu)]
pub enum IoError {
    #[snafu(display("could not access {path}: {source}"))]
    FileAccess {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("could not encode {path}: {reason}"))]
    Encode { path: String, reason: String },

    #[snafu(display("could not decode {path}: {reason}"))]
    Decode { path: String, reason: String },
}

/// Binary save/load for any serde container in this crate.
pub trait FileIO: Serialize
where
    for<'de> Self: Deserialize<'de>,
{
    /// Save into a file, returning the number of bytes written.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<usize, IoError> {
        let display = path.as_ref().display().to_string();
        let mut f = BufWriter::new(File::create(&path).context(FileAccessSnafu {
            path: display.clone(),
        })?);
        bincode::serde::encode_into_std_write(self, &mut f, bincode::config::legacy()).map_err(
            |e| IoError::Encode {
                path: display,
                reason: e.to_string(),
            },
        )
    }

    /// Load from a file.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let display = path.as_ref().display().to_string();
        let mut f = BufReader::new(File::open(&path).context(FileAccessSnafu {
            path: display.clone(),
        })?);
        bincode::serde::decode_from_std_read(&mut f, bincode::config::legacy()).map_err(|e| {
            IoError::Decode {
                path: display,
                reason: e.to_string(),
            }
        })
    }

    /// Save a slice of records (an event log, say) into one file.
    fn save_vec<P: AsRef<Path>>(records: &[Self], path: P) -> Result<usize, IoError> {
        let display = path.as_ref().display().to_string();
        let mut f = BufWriter::new(File::create(&path).context(FileAccessSnafu {
            path: display.clone(),
        })?);
        bincode::serde::encode_into_std_write(records, &mut f, bincode::config::legacy()).map_err(
            |e| IoError::Encode {
                path: display,
                reason: e.to_string(),
            },
        )
    }

    /// Load a vector of records.
    fn load_vec<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, IoError> {
        let display = path.as_ref().display().to_string();
        let mut f = BufReader::new(File::open(&path).context(FileAccessSnafu {
            path: display.clone(),
        })?);
        bincode::serde::decode_from_std_read(&mut f, bincode::config::legacy()).map_err(|e| {
            IoError::Decode {
                path: display,
                reason: e.to_string(),
            }
        })
    }
}
