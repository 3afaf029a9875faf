//! Observers for the run loop: in-memory recording, JSON files per checkpoint and log lines.
use crate::Integrators::rd_solver::Observer;
use crate::Operators::grid::Grid;
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// min, mean and max of one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl FieldStatistics {
    pub fn of(field: &DVector<f64>) -> Self {
        if field.is_empty() {
            return Self {
                min: f64::NAN,
                mean: f64::NAN,
                max: f64::NAN,
            };
        }
        Self {
            min: field.min(),
            mean: field.mean(),
            max: field.max(),
        }
    }
}

/// One checkpoint, fields stored row-major as on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub m: usize,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

impl Snapshot {
    pub fn new(time: f64, m: usize, u: &DVector<f64>, v: &DVector<f64>) -> Self {
        Self {
            time,
            m,
            u: u.as_slice().to_vec(),
            v: v.as_slice().to_vec(),
        }
    }

    /// Both fields must hold m² values
    pub fn check_layout(&self) -> Result<(), String> {
        let expected = self.m * self.m;
        for (name, field) in [("u", &self.u), ("v", &self.v)] {
            if field.len() != expected {
                return Err(format!(
                    "snapshot field {} has {} values, m = {} needs {}",
                    name,
                    field.len(),
                    self.m,
                    expected
                ));
            }
        }
        Ok(())
    }

    /// U as an m×m array, row i holding the points with y = axis[i]
    pub fn u_field(&self) -> Result<DMatrix<f64>, String> {
        self.check_layout()?;
        Ok(DMatrix::from_row_slice(self.m, self.m, &self.u))
    }

    pub fn v_field(&self) -> Result<DMatrix<f64>, String> {
        self.check_layout()?;
        Ok(DMatrix::from_row_slice(self.m, self.m, &self.v))
    }

    pub fn statistics(&self) -> (FieldStatistics, FieldStatistics) {
        (
            FieldStatistics::of(&DVector::from_column_slice(&self.u)),
            FieldStatistics::of(&DVector::from_column_slice(&self.v)),
        )
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("cannot read '{}': {}", path.as_ref().display(), e))?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| format!("invalid snapshot JSON: {}", e))?;
        snapshot.check_layout()?;
        Ok(snapshot)
    }
}

/// Keeps every snapshot in memory
#[derive(Debug, Clone)]
pub struct SnapshotRecorder {
    m: usize,
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotRecorder {
    pub fn new(grid: &Grid) -> Self {
        Self {
            m: grid.m(),
            snapshots: Vec::new(),
        }
    }

    pub fn times(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.time).collect()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

impl Observer for SnapshotRecorder {
    fn on_snapshot(
        &mut self,
        time: f64,
        u: &DVector<f64>,
        v: &DVector<f64>,
    ) -> Result<(), String> {
        self.snapshots.push(Snapshot::new(time, self.m, u, v));
        Ok(())
    }
}

/// Writes `<prefix>_<index>.json` into a directory, one file per checkpoint
#[derive(Debug, Clone)]
pub struct JsonSnapshotWriter {
    directory: PathBuf,
    prefix: String,
    m: usize,
    written: Vec<PathBuf>,
}

impl JsonSnapshotWriter {
    pub fn new<P: AsRef<Path>>(directory: P, prefix: &str, grid: &Grid) -> Result<Self, String> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)
            .map_err(|e| format!("cannot create '{}': {}", directory.display(), e))?;
        Ok(Self {
            directory,
            prefix: prefix.to_string(),
            m: grid.m(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Observer for JsonSnapshotWriter {
    fn on_snapshot(
        &mut self,
        time: f64,
        u: &DVector<f64>,
        v: &DVector<f64>,
    ) -> Result<(), String> {
        let path = self
            .directory
            .join(format!("{}_{:04}.json", self.prefix, self.written.len()));
        let snapshot = Snapshot::new(time, self.m, u, v);
        let content = serde_json::to_string(&snapshot).map_err(|e| e.to_string())?;
        fs::write(&path, content).map_err(|e| format!("cannot write '{}': {}", path.display(), e))?;
        self.written.push(path);
        Ok(())
    }
}

/// Logs min/mean/max of both fields at every checkpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn on_snapshot(
        &mut self,
        time: f64,
        u: &DVector<f64>,
        v: &DVector<f64>,
    ) -> Result<(), String> {
        let su = FieldStatistics::of(u);
        let sv = FieldStatistics::of(v);
        info!(
            "t = {:>9.4}  U [{:+.4e}, {:+.4e}, {:+.4e}]  V [{:+.4e}, {:+.4e}, {:+.4e}]",
            time, su.min, su.mean, su.max, sv.min, sv.mean, sv.max
        );
        Ok(())
    }
}
