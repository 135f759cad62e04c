//! Country records and the persisted collection shape

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::CountryError;

/// A single country record as persisted and returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub continent: String,
    #[serde(deserialize_with = "integral_rank")]
    pub rank: i64,
    /// Relative path of the uploaded flag image, `null` when none was given
    #[serde(default)]
    pub flag: Option<String>,
}

/// Ordered set of countries, persisted as `{"countries": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub countries: Vec<Country>,
}

impl Collection {
    /// First record whose name matches exactly
    pub fn find(&self, name: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.name == name)
    }

    /// Whether `candidate` would break name or rank uniqueness
    pub fn conflicts_with(&self, candidate: &NewCountry) -> bool {
        self.countries
            .iter()
            .any(|c| c.name == candidate.name || c.rank == candidate.rank)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Raw, untyped fields as they arrive from a form or JSON body
#[derive(Debug, Clone, Default)]
pub struct CountryForm {
    pub name: Option<String>,
    pub continent: Option<String>,
    pub rank: Option<String>,
}

/// Validated input for an add operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCountry {
    pub name: String,
    pub continent: String,
    pub rank: i64,
}

impl NewCountry {
    /// Check required fields and parse rank into an integer
    pub fn parse(form: CountryForm) -> Result<Self, CountryError> {
        let name = required(form.name, "name")?;
        let continent = required(form.continent, "continent")?;
        let raw_rank = required(form.rank, "rank")?;

        let trimmed = raw_rank.trim();
        let rank = trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| trimmed.parse::<f64>().ok().and_then(integral))
            .ok_or_else(|| {
                CountryError::InvalidField(format!("rank must be an integer, got '{raw_rank}'"))
            })?;

        Ok(Self {
            name,
            continent,
            rank,
        })
    }

    pub fn into_country(self, flag: Option<String>) -> Country {
        Country {
            name: self.name,
            continent: self.continent,
            rank: self.rank,
            flag,
        }
    }
}

/// Whole-valued floats such as `3.0` or `1e2` within `i64` range
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn integral(value: f64) -> Option<i64> {
    (value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64)
        .then(|| value as i64)
}

/// Stored ranks may be written as `3` or `3.0`; `null` and fractions are rejected
fn integral_rank<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| number.as_f64().and_then(integral))
        .ok_or_else(|| de::Error::custom(format!("rank must be an integer, got {number}")))
}

fn required(value: Option<String>, field: &str) -> Result<String, CountryError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CountryError::InvalidField(format!("{field} is required"))),
    }
}
