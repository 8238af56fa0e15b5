use std::sync::Arc;

use hashbrown::HashMap as FastMap;
use serde::Deserialize;

use crate::err::{ParamResult, ParameterError};

/// One configuration value. Parameters are typed at insertion and never
/// coerced on lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Long(i64),
    Str(String),
}

impl ParamValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Long(_) => "long",
            ParamValue::Str(_) => "string",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Long(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// A named bag of configuration values with an optional chain of defaults
/// (test case params fall back to driver params fall back to suite params).
///
/// A bag is filled while it is uniquely owned and then shared read-only, so
/// concurrent drivers can resolve values without locking.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: FastMap<String, ParamValue, ahash::RandomState>,
    defaults: Option<Arc<Params>>,
}

impl Params {
    pub fn new() -> Self {
        Params {
            values: FastMap::with_hasher(ahash::RandomState::new()),
            defaults: None,
        }
    }

    pub fn with_defaults(defaults: Arc<Params>) -> Self {
        Params {
            values: FastMap::with_hasher(ahash::RandomState::new()),
            defaults: Some(defaults),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Inserts a raw string, inferring its type: `true`/`false` become
    /// booleans, anything parseable as `i64` becomes a long, the rest stays
    /// a string.
    pub fn insert_inferred(&mut self, name: impl Into<String>, raw: &str) {
        let value = match raw {
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            other => match other.parse::<i64>() {
                Ok(n) => ParamValue::Long(n),
                Err(_) => ParamValue::Str(other.to_string()),
            },
        };
        self.values.insert(name.into(), value);
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Walks the defaults chain, nearest bag first.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.defaults.as_ref().and_then(|d| d.get(name)),
        }
    }

    pub fn get_string(&self, name: &str) -> ParamResult<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Str(s)) => Ok(Some(s)),
            Some(other) => Err(Self::mismatch(name, "string", other)),
        }
    }

    pub fn get_boolean(&self, name: &str) -> ParamResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Self::mismatch(name, "boolean", other)),
        }
    }

    pub fn get_long(&self, name: &str) -> ParamResult<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Long(n)) => Ok(Some(*n)),
            Some(other) => Err(Self::mismatch(name, "long", other)),
        }
    }

    fn mismatch(name: &str, requested: &'static str, actual: &ParamValue) -> ParameterError {
        ParameterError::TypeMismatch {
            name: name.to_string(),
            requested,
            actual: actual.kind(),
        }
    }
}

impl<S: Into<String>, V: Into<ParamValue>> FromIterator<(S, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
