//! Rolling multi-horizon evaluation harness.
//!
//! For every configured model family and every horizon the harness shifts
//! the target, splits chronologically, scales with statistics from the
//! training rows, trains (timed), and scores the test rows. Each
//! (model, horizon) pair is an independent cell: a failure is logged and
//! recorded in that cell while the remaining cells still run.

use crate::metrics::evaluate;
use crate::scaler::FittedScaler;
use crate::shift::align_horizon;
use crate::split::ChronologicalSplit;
use cadena_data::io::write_csv;
use cadena_models::{ModelFamily, ModelParams};
use cadena_traits::{CadenaError, FeatureTable, Horizon, Result, TableSchema};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Marker written for cells whose evaluation failed.
pub const MISSING_MARKER: &str = "NA";

/// RMSE table file name.
pub const RMSE_TABLE: &str = "table_rmse.csv";
/// Training time table file name.
pub const TIME_TABLE: &str = "table_time.csv";
/// Combined `rmse / time` table file name.
pub const PAPER_TABLE: &str = "paper_style_table.csv";

/// Configuration for [`RollingEvaluation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Date column of the feature file
    pub date_column: String,
    /// Target column of the feature file
    pub target_column: String,
    /// Forecast horizons in rows (default: 1, 5, 20)
    pub horizons: Vec<Horizon>,
    /// Fraction of rows used for training (default: 0.8)
    pub train_fraction: f64,
    /// Seed passed to every model adapter (default: 42)
    pub seed: u64,
    /// Model families to evaluate, in row order
    pub models: Vec<ModelFamily>,
    /// Hyperparameters for every family
    pub params: ModelParams,
    /// Directory receiving the result tables
    pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let schema = TableSchema::default();
        Self {
            date_column: schema.date_column,
            target_column: schema.target_column,
            horizons: Horizon::defaults(),
            train_fraction: 0.8,
            seed: 42,
            models: ModelFamily::ALL.to_vec(),
            params: ModelParams::default(),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a JSON file; missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The feature file schema implied by this configuration.
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            date_column: self.date_column.clone(),
            target_column: self.target_column.clone(),
        }
    }

    /// Checks the loop structure; model hyperparameters are checked per cell.
    pub fn validate(&self) -> Result<()> {
        if self.horizons.is_empty() {
            return Err(CadenaError::InvalidParameter(
                "at least one horizon is required".to_string(),
            ));
        }
        if self.models.is_empty() {
            return Err(CadenaError::InvalidParameter(
                "at least one model family is required".to_string(),
            ));
        }
        let mut seen = self.horizons.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.horizons.len() {
            return Err(CadenaError::InvalidParameter(
                "horizons must be distinct".to_string(),
            ));
        }
        ChronologicalSplit::new(self.train_fraction).map(|_| ())
    }
}

/// Outcome of one (model, horizon) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Cell {
    /// Training and scoring succeeded.
    Completed {
        /// Test-set root mean squared error
        rmse: f64,
        /// Test-set mean absolute error
        mae: f64,
        /// Wall-clock training time in seconds
        seconds: f64,
        /// Rows used for training
        train_rows: usize,
        /// Rows scored
        test_rows: usize,
    },
    /// Some stage failed; the reason is also logged.
    Failed {
        /// Error message of the failing stage
        reason: String,
    },
}

impl Cell {
    /// Test RMSE, if the cell completed.
    pub const fn rmse(&self) -> Option<f64> {
        match self {
            Self::Completed { rmse, .. } => Some(*rmse),
            Self::Failed { .. } => None,
        }
    }

    /// Training seconds, if the cell completed.
    pub const fn seconds(&self) -> Option<f64> {
        match self {
            Self::Completed { seconds, .. } => Some(*seconds),
            Self::Failed { .. } => None,
        }
    }

    /// Whether the cell failed.
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn rmse_text(&self) -> String {
        self.rmse()
            .map_or_else(|| MISSING_MARKER.to_string(), |v| format!("{v:.4}"))
    }

    fn time_text(&self) -> String {
        self.seconds()
            .map_or_else(|| MISSING_MARKER.to_string(), |v| format!("{v:.2}"))
    }

    fn paper_text(&self) -> String {
        format!("{} / {}", self.rmse_text(), self.time_text())
    }
}

/// One model family's cells, one per report horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Model family
    pub family: ModelFamily,
    /// Display name used as the row label
    pub model: String,
    /// Cells in the order of [`EvaluationReport::horizons`]
    pub cells: Vec<Cell>,
}

/// All result rows of a harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    horizons: Vec<Horizon>,
    rows: Vec<ResultRow>,
}

impl EvaluationReport {
    /// Horizons, in column order.
    pub fn horizons(&self) -> &[Horizon] {
        &self.horizons
    }

    /// Result rows, in model order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Cell for a family and horizon.
    pub fn cell(&self, family: ModelFamily, horizon: Horizon) -> Option<&Cell> {
        let col = self.horizons.iter().position(|h| *h == horizon)?;
        self.rows
            .iter()
            .find(|r| r.family == family)
            .and_then(|r| r.cells.get(col))
    }

    /// Number of failed cells.
    pub fn n_failed(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| c.is_failed())
            .count()
    }

    fn header(&self) -> Vec<String> {
        std::iter::once("model".to_string())
            .chain(self.horizons.iter().map(ToString::to_string))
            .collect()
    }

    fn grid(&self, label_suffix: &str, text: fn(&Cell) -> String) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                std::iter::once(format!("{}{label_suffix}", row.model))
                    .chain(row.cells.iter().map(text))
                    .collect()
            })
            .collect()
    }

    fn frame(&self, label_suffix: &str, text: fn(&Cell) -> String) -> Result<DataFrame> {
        let header = self.header();
        let grid = self.grid(label_suffix, text);
        let columns = header
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let values: Vec<String> = grid.iter().map(|row| row[j].clone()).collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// RMSE table, 4 decimals.
    pub fn rmse_frame(&self) -> Result<DataFrame> {
        self.frame("", Cell::rmse_text)
    }

    /// Training time table in seconds, 2 decimals.
    pub fn time_frame(&self) -> Result<DataFrame> {
        self.frame("", Cell::time_text)
    }

    /// Combined `rmse / time` table.
    pub fn paper_frame(&self) -> Result<DataFrame> {
        self.frame(" (time in s)", Cell::paper_text)
    }

    /// Writes the three result tables into `dir` and returns their paths.
    pub fn write_artifacts(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(3);
        for (name, mut frame) in [
            (RMSE_TABLE, self.rmse_frame()?),
            (TIME_TABLE, self.time_frame()?),
            (PAPER_TABLE, self.paper_frame()?),
        ] {
            let path = dir.join(name);
            write_csv(&mut frame, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Both tables as aligned console text.
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Prediction Performance on Test Set (RMSE)");
        out.push_str(&render_grid(&self.header(), &self.grid("", Cell::rmse_text)));
        let _ = writeln!(out);
        let _ = writeln!(out, "Estimation Time (Seconds)");
        out.push_str(&render_grid(&self.header(), &self.grid("", Cell::time_text)));
        let _ = writeln!(out, "{rule}");
        out
    }
}

/// Left-aligned first column, right-aligned value columns.
fn render_grid(header: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = (0..header.len())
        .map(|j| {
            rows.iter()
                .map(|r| r[j].len())
                .chain(std::iter::once(header[j].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (j, value) in line.iter().enumerate() {
            let width = widths[j];
            if j == 0 {
                let _ = write!(out, "{value:<width$}");
            } else {
                let _ = write!(out, "  {value:>width$}");
            }
        }
        out.push('\n');
    }
    out
}

/// The rolling evaluation harness.
#[derive(Debug, Clone)]
pub struct RollingEvaluation {
    config: HarnessConfig,
    splitter: ChronologicalSplit,
}

impl RollingEvaluation {
    /// Creates a harness after validating the configuration.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let splitter = ChronologicalSplit::new(config.train_fraction)?;
        Ok(Self { config, splitter })
    }

    /// Get the configuration.
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Evaluates every (model, horizon) cell on `table`.
    pub fn run(&self, table: &FeatureTable) -> EvaluationReport {
        info!(
            rows = table.len(),
            features = table.n_features(),
            models = self.config.models.len(),
            horizons = self.config.horizons.len(),
            seed = self.config.seed,
            "starting rolling evaluation"
        );

        let mut rows = Vec::with_capacity(self.config.models.len());
        for &family in &self.config.models {
            let mut cells = Vec::with_capacity(self.config.horizons.len());
            for &horizon in &self.config.horizons {
                let cell = match self.run_cell(table, family, horizon) {
                    Ok(cell) => {
                        info!(
                            model = family.display_name(),
                            horizon = horizon.days(),
                            rmse = cell.rmse().unwrap_or(f64::NAN),
                            seconds = cell.seconds().unwrap_or(f64::NAN),
                            "cell completed"
                        );
                        cell
                    }
                    Err(e) => {
                        warn!(
                            model = family.display_name(),
                            horizon = horizon.days(),
                            error = %e,
                            "cell failed"
                        );
                        Cell::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                cells.push(cell);
            }
            rows.push(ResultRow {
                family,
                model: family.display_name().to_string(),
                cells,
            });
        }

        let report = EvaluationReport {
            horizons: self.config.horizons.clone(),
            rows,
        };
        info!(failed = report.n_failed(), "rolling evaluation finished");
        report
    }

    fn run_cell(&self, table: &FeatureTable, family: ModelFamily, horizon: Horizon) -> Result<Cell> {
        let frame = align_horizon(table, horizon)?;
        let data = self.splitter.split(&frame)?;

        let scaler = FittedScaler::fit(data.x_train)?;
        let x_train = scaler.transform(data.x_train)?;
        let x_test = scaler.transform(data.x_test)?;

        let start = Instant::now();
        let model = family.train(
            x_train.view(),
            data.y_train,
            &self.config.params,
            self.config.seed,
        )?;
        let seconds = start.elapsed().as_secs_f64();

        let evaluation = evaluate(&model, x_test.view(), data.y_test)?;
        Ok(Cell::Completed {
            rmse: evaluation.rmse,
            mae: evaluation.mae,
            seconds,
            train_rows: data.y_train.len(),
            test_rows: data.y_test.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_data::io::read_csv;
    use cadena_traits::Date;
    use ndarray::{Array1, Array2};

    /// 100 daily rows, one predictor, target partly explained by it.
    fn synthetic_table() -> FeatureTable {
        let n = 100;
        let start = Date::from_ymd_opt(2019, 1, 1).unwrap();
        let dates = (0..n).map(|i| start + chrono::Days::new(i as u64)).collect();
        let x = Array2::from_shape_fn((n, 1), |(i, _)| (i as f64 * 0.3).sin());
        let y = Array1::from_iter(
            (0..n).map(|i| 0.01 * (i as f64 * 0.3).sin() + 0.002 * (i as f64 * 1.7).cos()),
        );
        FeatureTable::new(dates, y, x, vec!["CON.DE_Return_lag1".to_string()], "vw_returns")
            .unwrap()
    }

    fn fast_config() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.params.depthwise.n_estimators = 50;
        config.params.leafwise.n_estimators = 50;
        config
    }

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.horizons, Horizon::defaults());
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = HarnessConfig::default();
        config.horizons.clear();
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.train_fraction = 1.5;
        assert!(matches!(
            RollingEvaluation::new(config),
            Err(CadenaError::InvalidParameter(_))
        ));

        let mut config = HarnessConfig::default();
        config.horizons = vec![Horizon::new(5).unwrap(), Horizon::new(5).unwrap()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        fs::write(
            &path,
            r#"{"horizons": [1, 5], "seed": 7, "models": ["en", "lgbm"], "params": {"leafwise": {"num_leaves": 8}}}"#,
        )
        .unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.horizons.len(), 2);
        assert_eq!(config.seed, 7);
        assert_eq!(
            config.models,
            vec![ModelFamily::ElasticNet, ModelFamily::LeafwiseBoost]
        );
        assert_eq!(config.params.leafwise.num_leaves, 8);
        assert_eq!(config.target_column, "vw_returns");
    }

    #[test]
    fn test_end_to_end_writes_three_complete_tables() {
        let dir = tempfile::tempdir().unwrap();
        let harness = RollingEvaluation::new(HarnessConfig::default()).unwrap();
        let report = harness.run(&synthetic_table());

        assert_eq!(report.rows().len(), 3);
        assert_eq!(report.n_failed(), 0);
        for row in report.rows() {
            assert_eq!(row.cells.len(), 3);
            for cell in &row.cells {
                let Cell::Completed { rmse, mae, .. } = cell else {
                    panic!("cell failed: {cell:?}");
                };
                assert!(rmse.is_finite());
                assert!(*rmse >= *mae - 1e-15);
            }
        }

        let paths = report.write_artifacts(dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
        for (path, name) in paths.iter().zip([RMSE_TABLE, TIME_TABLE, PAPER_TABLE]) {
            assert_eq!(path.file_name().unwrap(), name);
            let df = read_csv(path).unwrap();
            assert_eq!(df.shape(), (3, 4));
            let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
            assert_eq!(names, ["model", "1", "5", "20"]);
            let text = fs::read_to_string(path).unwrap();
            assert!(!text.contains(MISSING_MARKER));
        }

        let paper = fs::read_to_string(dir.path().join(PAPER_TABLE)).unwrap();
        assert!(paper.contains("Elastic Net (time in s)"));
        assert!(paper.contains(" / "));
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let table = synthetic_table();
        let mut config = fast_config();
        config.params.depthwise.subsample = 0.8;
        config.params.leafwise.bagging_fraction = 0.7;
        config.params.leafwise.feature_fraction = 1.0;

        let first = RollingEvaluation::new(config.clone()).unwrap().run(&table);
        let second = RollingEvaluation::new(config).unwrap().run(&table);

        for (a, b) in first.rows().iter().zip(second.rows()) {
            let ra: Vec<_> = a.cells.iter().map(Cell::rmse).collect();
            let rb: Vec<_> = b.cells.iter().map(Cell::rmse).collect();
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn test_insufficient_horizon_is_marked() {
        let mut config = fast_config();
        config.horizons = vec![Horizon::new(1).unwrap(), Horizon::new(150).unwrap()];
        let report = RollingEvaluation::new(config).unwrap().run(&synthetic_table());

        assert_eq!(report.n_failed(), 3);
        let cell = report
            .cell(ModelFamily::ElasticNet, Horizon::new(150).unwrap())
            .unwrap();
        assert!(matches!(cell, Cell::Failed { reason } if reason.contains("150")));
        assert!(
            !report
                .cell(ModelFamily::ElasticNet, Horizon::new(1).unwrap())
                .unwrap()
                .is_failed()
        );

        let rmse = report.rmse_frame().unwrap();
        let col = rmse.column("150").unwrap().as_materialized_series().str().unwrap();
        assert!(col.into_iter().all(|v| v == Some(MISSING_MARKER)));

        let paper = report.paper_frame().unwrap();
        let col = paper.column("150").unwrap().as_materialized_series().str().unwrap();
        assert_eq!(col.get(0), Some("NA / NA"));
        assert!(report.render().contains(MISSING_MARKER));
    }

    #[test]
    fn test_training_failure_does_not_stop_siblings() {
        let mut config = fast_config();
        config.params.elastic_net.l1_ratio = 2.0;
        let report = RollingEvaluation::new(config).unwrap().run(&synthetic_table());

        assert!(report.rows()[0].cells.iter().all(Cell::is_failed));
        assert!(report.rows()[1..].iter().all(|r| r.cells.iter().all(|c| !c.is_failed())));
    }

    #[test]
    fn test_render_aligns_columns() {
        let report = EvaluationReport {
            horizons: vec![Horizon::new(1).unwrap()],
            rows: vec![ResultRow {
                family: ModelFamily::ElasticNet,
                model: "Elastic Net".to_string(),
                cells: vec![Cell::Completed {
                    rmse: 0.012345,
                    mae: 0.01,
                    seconds: 0.5,
                    train_rows: 10,
                    test_rows: 3,
                }],
            }],
        };
        let text = report.render();
        assert!(text.contains("Elastic Net  0.0123"));
        assert!(text.contains("Elastic Net  0.50"));
    }
}
