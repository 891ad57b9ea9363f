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

use super::{ConfigError, InvalidConfigSnafu};
use crate::linalg::{DMatrix, DVector};
use either::Either;
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// A square matrix in a configuration file, given either as the list of its diagonal entries or as a list of rows.
///
/// ```yaml
/// prior_covar: [0.25, 0.25]
/// measurement_covar:
///   - [100.0]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixSerde {
    #[serde(with = "either::serde_untagged")]
    inner: Either<Vec<f64>, Vec<Vec<f64>>>,
}

impl MatrixSerde {
    pub fn diagonal(diag: Vec<f64>) -> Self {
        Self {
            inner: Either::Left(diag),
        }
    }

    pub fn full(rows: Vec<Vec<f64>>) -> Self {
        Self {
            inner: Either::Right(rows),
        }
    }

    /// Builds the matrix, failing if the rows are ragged or if the matrix is not square.
    pub fn to_matrix(&self) -> Result<DMatrix<f64>, ConfigError> {
        match &self.inner {
            Either::Left(diag) => Ok(DMatrix::from_diagonal(&DVector::from_column_slice(diag))),
            Either::Right(rows) => {
                let n = rows.len();
                let mut flat = Vec::with_capacity(n * n);
                for (i, row) in rows.iter().enumerate() {
                    ensure!(
                        row.len() == n,
                        InvalidConfigSnafu {
                            msg: format!(
                                "row {i} of a {n}x{n} matrix has {} entries",
                                row.len()
                            ),
                        }
                    );
                    flat.extend_from_slice(row);
                }
                Ok(DMatrix::from_row_slice(n, n, &flat))
            }
        }
    }
}

impl From<&DMatrix<f64>> for MatrixSerde {
    fn from(mat: &DMatrix<f64>) -> Self {
        let diag = DMatrix::from_diagonal(&mat.diagonal());
        if &diag == mat {
            Self::diagonal(mat.diagonal().iter().copied().collect())
        } else {
            Self::full(
                mat.row_iter()
                    .map(|row| row.iter().copied().collect())
                    .collect(),
            )
        }
    }
}
