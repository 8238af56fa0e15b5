use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::err::{BenchError, InputError, Result};
use crate::params::{ParamValue, Params};

/// Result keys recorded on every finished test case.
pub const RESULT_INPUT_KB: &str = "inputKilobytes";
pub const RESULT_OUTPUT_KB: &str = "outputKilobytes";

/// One benchmark unit: a named input document plus the parameter chain in
/// effect for the driver running it.
#[derive(Debug, Clone)]
pub struct TestCase {
    name: String,
    input: PathBuf,
    params: Params,
    results: BTreeMap<String, f64>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, input: impl Into<PathBuf>, params: Params) -> Self {
        TestCase {
            name: name.into(),
            input: input.into(),
            params,
            results: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_result(&mut self, key: impl Into<String>, value: f64) {
        self.results.insert(key.into(), value);
    }

    pub fn result(&self, key: &str) -> Option<f64> {
        self.results.get(key).copied()
    }

    pub fn results(&self) -> &BTreeMap<String, f64> {
        &self.results
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseConfig {
    pub name: String,
    pub input: PathBuf,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

/// A whole benchmark run as configured on disk: which drivers to measure,
/// which documents to feed them, and three levels of parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    pub drivers: Vec<DriverConfig>,
    pub cases: Vec<CaseConfig>,
}

impl SuiteConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    /// Loads a suite file and re-bases relative case inputs against its
    /// directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| InputError::FailedToOpenFile {
            path: path.to_owned(),
            source: e,
        })?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .map_err(|e| InputError::FailedToRead {
                path: path.to_owned(),
                source: e,
            })?;

        let mut config = Self::from_json_str(&raw).map_err(|source| BenchError::Config {
            path: path.to_owned(),
            source,
        })?;
        config.resolve_inputs(path.parent().unwrap_or(Path::new(".")));
        Ok(config)
    }

    pub fn resolve_inputs(&mut self, base: &Path) {
        for case in &mut self.cases {
            if case.input.is_relative() {
                case.input = base.join(&case.input);
            }
        }
    }

    pub fn suite_params(&self) -> Arc<Params> {
        Arc::new(params_from_map(&self.params, None))
    }

    /// Effective bag for one driver/case pair: case values override driver
    /// values override suite values.
    pub fn effective_params(&self, driver: &DriverConfig, case: &CaseConfig) -> Params {
        let driver_params = Arc::new(params_from_map(&driver.params, Some(self.suite_params())));
        params_from_map(&case.params, Some(driver_params))
    }

    pub fn test_case(&self, driver: &DriverConfig, case: &CaseConfig) -> TestCase {
        TestCase::new(
            case.name.clone(),
            case.input.clone(),
            self.effective_params(driver, case),
        )
    }
}

fn params_from_map(map: &BTreeMap<String, ParamValue>, defaults: Option<Arc<Params>>) -> Params {
    let mut params = match defaults {
        Some(defaults) => Params::with_defaults(defaults),
        None => Params::new(),
    };
    for (name, value) in map {
        params.insert(name.clone(), value.clone());
    }
    params
}
