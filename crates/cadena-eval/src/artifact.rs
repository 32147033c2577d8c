//! On-disk model and scaler artifacts.
//!
//! Files are named `<prefix>_<YYYY-MM-DD>.json`, where the prefix is the
//! family's short tag (`en`, `xgb`, `lgbm`) or `scaler`, and the date is the
//! first day of the out-of-sample month.

use crate::monthly::MonthlyModel;
use crate::scaler::FittedScaler;
use cadena_models::{ModelFamily, TrainedModel};
use cadena_traits::{CadenaError, Date, Result, parse_date};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SCALER_PREFIX: &str = "scaler";
const EXTENSION: &str = "json";

/// What an artifact file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A fitted model of the given family.
    Model(ModelFamily),
    /// The scaler paired with a model.
    Scaler,
}

impl ArtifactKind {
    /// File name prefix.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Model(family) => family.artifact_prefix(),
            Self::Scaler => SCALER_PREFIX,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        if prefix == SCALER_PREFIX {
            return Some(Self::Scaler);
        }
        ModelFamily::ALL
            .into_iter()
            .find(|f| f.artifact_prefix() == prefix)
            .map(Self::Model)
    }
}

/// Parsed artifact file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactName {
    /// Artifact contents
    pub kind: ArtifactKind,
    /// First day of the out-of-sample month
    pub test_month: Date,
}

impl ArtifactName {
    /// Name of a model artifact.
    pub const fn model(family: ModelFamily, test_month: Date) -> Self {
        Self {
            kind: ArtifactKind::Model(family),
            test_month,
        }
    }

    /// Name of a scaler artifact.
    pub const fn scaler(test_month: Date) -> Self {
        Self {
            kind: ArtifactKind::Scaler,
            test_month,
        }
    }

    /// File name, e.g. `en_2017-06-01.json`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.{EXTENSION}",
            self.kind.prefix(),
            self.test_month.format("%Y-%m-%d")
        )
    }

    /// Parses a file name produced by [`Self::file_name`].
    pub fn parse(path: &Path) -> Result<Self> {
        let stem = file_stem(path)?;
        let (prefix, date) = stem
            .rsplit_once('_')
            .ok_or_else(|| CadenaError::InvalidData(format!("'{stem}' has no date suffix")))?;
        let kind = ArtifactKind::from_prefix(prefix).ok_or_else(|| {
            CadenaError::InvalidData(format!("unknown artifact prefix '{prefix}'"))
        })?;
        Ok(Self {
            kind,
            test_month: parse_date(date)?,
        })
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CadenaError::InvalidData(format!("no file name in {}", path.display())))
}

/// Test month encoded as the last `_`-separated segment of a file stem.
///
/// Accepts any prefix so that renamed artifacts still resolve their month.
pub fn test_month_from_path(path: &Path) -> Result<Date> {
    let stem = file_stem(path)?;
    let date = stem.rsplit('_').next().unwrap_or(stem);
    parse_date(date)
}

/// Path of the scaler saved next to `model_path`.
pub fn scaler_path_for(model_path: &Path) -> Result<PathBuf> {
    let month = test_month_from_path(model_path)?;
    let dir = model_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(ArtifactName::scaler(month).file_name()))
}

/// Writes the model and its scaler into `dir`, returning both paths.
pub fn save_artifacts(dir: &Path, monthly: &MonthlyModel) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let model_path = dir.join(ArtifactName::model(monthly.family, monthly.test_month).file_name());
    fs::write(&model_path, monthly.model.to_json()?)?;

    let scaler_path = dir.join(ArtifactName::scaler(monthly.test_month).file_name());
    fs::write(&scaler_path, monthly.scaler.to_json()?)?;

    debug!(
        model = %model_path.display(),
        scaler = %scaler_path.display(),
        "saved artifacts"
    );
    Ok((model_path, scaler_path))
}

/// Reads a model artifact.
pub fn load_model(path: &Path) -> Result<TrainedModel> {
    TrainedModel::from_json(&fs::read_to_string(path)?)
}

/// Reads a scaler artifact.
pub fn load_scaler(path: &Path) -> Result<FittedScaler> {
    FittedScaler::from_json(&fs::read_to_string(path)?)
}

/// Model artifacts of `family` in `dir`, ordered by test month.
pub fn find_models(dir: &Path, family: ModelFamily) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        if let Ok(name) = ArtifactName::parse(&path)
            && name.kind == ArtifactKind::Model(family)
        {
            found.push((name.test_month, path));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
