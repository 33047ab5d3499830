//! Parameter domains
//!
//! A domain describes the values a single parameter may take. The set of
//! domain kinds is closed; every consumer dispatches with a `match`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::parameters::allele::Allele;

/// Domain of a single parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    /// Real values in `[min, max]`
    Continuous {
        min: f64,
        max: f64,
        #[serde(default)]
        default: Option<f64>,
    },
    /// Real values in `[min, max]`, explored on a logarithmic scale
    Log {
        min: f64,
        max: f64,
        #[serde(default)]
        default: Option<f64>,
    },
    /// Integers in `[min, max]`
    Integer {
        min: i64,
        max: i64,
        #[serde(default)]
        default: Option<i64>,
    },
    /// Integers in `[min, max]`, explored on a logarithmic scale
    DiscreteLog {
        min: i64,
        max: i64,
        #[serde(default)]
        default: Option<i64>,
    },
    /// A finite, ordered set of values
    Categorical {
        values: Vec<Allele>,
        #[serde(default)]
        default: Option<Allele>,
    },
}

impl Domain {
    /// Create a continuous domain
    pub fn continuous(min: f64, max: f64) -> Result<Self, ParameterError> {
        let domain = Self::Continuous {
            min,
            max,
            default: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Create a log-scaled continuous domain
    pub fn log(min: f64, max: f64) -> Result<Self, ParameterError> {
        let domain = Self::Log {
            min,
            max,
            default: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Create an integer domain
    pub fn integer(min: i64, max: i64) -> Result<Self, ParameterError> {
        let domain = Self::Integer {
            min,
            max,
            default: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Create a log-scaled integer domain
    pub fn discrete_log(min: i64, max: i64) -> Result<Self, ParameterError> {
        let domain = Self::DiscreteLog {
            min,
            max,
            default: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Create a categorical domain
    pub fn categorical<I, A>(values: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Allele>,
    {
        let domain = Self::Categorical {
            values: values.into_iter().map(Into::into).collect(),
            default: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Attach a default value
    pub fn with_default(self, value: Allele) -> Result<Self, ParameterError> {
        let domain = match self {
            Self::Continuous { min, max, .. } => Self::Continuous {
                min,
                max,
                default: value.as_f64(),
            },
            Self::Log { min, max, .. } => Self::Log {
                min,
                max,
                default: value.as_f64(),
            },
            Self::Integer { min, max, .. } => Self::Integer {
                min,
                max,
                default: value.as_f64().map(|v| v as i64),
            },
            Self::DiscreteLog { min, max, .. } => Self::DiscreteLog {
                min,
                max,
                default: value.as_f64().map(|v| v as i64),
            },
            Self::Categorical { values, .. } => Self::Categorical {
                values,
                default: Some(value),
            },
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Check bounds, value sets and defaults
    pub fn validate(&self) -> Result<(), ParameterError> {
        match self {
            Self::Continuous { min, max, default } => {
                check_real_range(*min, *max)?;
                check_default(*default, *min, *max)
            }
            Self::Log { min, max, default } => {
                check_real_range(*min, *max)?;
                if *min <= 0.0 {
                    return Err(ParameterError::InvalidDomain(format!(
                        "log domain needs a positive minimum, got {}",
                        min
                    )));
                }
                check_default(*default, *min, *max)
            }
            Self::Integer { min, max, default } => {
                check_integer_range(*min, *max)?;
                check_default(default.map(|v| v as f64), *min as f64, *max as f64)
            }
            Self::DiscreteLog { min, max, default } => {
                check_integer_range(*min, *max)?;
                if *min <= 0 {
                    return Err(ParameterError::InvalidDomain(format!(
                        "discrete log domain needs a positive minimum, got {}",
                        min
                    )));
                }
                check_default(default.map(|v| v as f64), *min as f64, *max as f64)
            }
            Self::Categorical { values, default } => {
                if values.is_empty() {
                    return Err(ParameterError::InvalidDomain(
                        "categorical domain without values".to_string(),
                    ));
                }
                for (i, value) in values.iter().enumerate() {
                    if values[..i].contains(value) {
                        return Err(ParameterError::InvalidDomain(format!(
                            "duplicate categorical value {}",
                            value
                        )));
                    }
                }
                match default {
                    Some(value) if !values.contains(value) => {
                        Err(ParameterError::InvalidDomain(format!(
                            "default {} is not a categorical value",
                            value
                        )))
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Whether this is a categorical domain
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical { .. })
    }

    /// Whether values are explored on a logarithmic scale
    pub fn is_log_scaled(&self) -> bool {
        matches!(self, Self::Log { .. } | Self::DiscreteLog { .. })
    }

    /// Whether the domain holds integers
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Integer { .. } | Self::DiscreteLog { .. })
    }

    /// Number of distinct values, `None` for real-valued domains
    pub fn domain_size(&self) -> Option<u64> {
        match self {
            Self::Continuous { .. } | Self::Log { .. } => None,
            Self::Integer { min, max, .. } | Self::DiscreteLog { min, max, .. } => {
                Some(max.abs_diff(*min).saturating_add(1))
            }
            Self::Categorical { values, .. } => Some(values.len() as u64),
        }
    }

    /// Lower bound of a numeric domain
    pub fn minimum(&self) -> Option<f64> {
        match self {
            Self::Continuous { min, .. } | Self::Log { min, .. } => Some(*min),
            Self::Integer { min, .. } | Self::DiscreteLog { min, .. } => Some(*min as f64),
            Self::Categorical { .. } => None,
        }
    }

    /// Upper bound of a numeric domain
    pub fn maximum(&self) -> Option<f64> {
        match self {
            Self::Continuous { max, .. } | Self::Log { max, .. } => Some(*max),
            Self::Integer { max, .. } | Self::DiscreteLog { max, .. } => Some(*max as f64),
            Self::Categorical { .. } => None,
        }
    }

    /// Categorical values, empty for numeric domains
    pub fn categories(&self) -> &[Allele] {
        match self {
            Self::Categorical { values, .. } => values,
            _ => &[],
        }
    }

    /// Index of a categorical value
    pub fn category_index(&self, value: &Allele) -> Option<usize> {
        self.categories().iter().position(|v| v == value)
    }

    /// Categorical value at an index
    pub fn category(&self, index: usize) -> Option<&Allele> {
        self.categories().get(index)
    }

    /// Default value, if one was given
    pub fn default_value(&self) -> Option<Allele> {
        match self {
            Self::Continuous { default, .. } | Self::Log { default, .. } => {
                default.map(Allele::Float)
            }
            Self::Integer { default, .. } | Self::DiscreteLog { default, .. } => {
                default.map(Allele::Int)
            }
            Self::Categorical { default, .. } => default.clone(),
        }
    }

    /// Check whether a value belongs to the domain
    pub fn contains(&self, value: &Allele) -> bool {
        match self {
            Self::Categorical { values, .. } => values.contains(value),
            Self::Integer { min, max, .. } | Self::DiscreteLog { min, max, .. } => match value {
                Allele::Int(v) => v >= min && v <= max,
                Allele::Float(v) => v.fract() == 0.0 && *v >= *min as f64 && *v <= *max as f64,
                _ => false,
            },
            Self::Continuous { min, max, .. } | Self::Log { min, max, .. } => value
                .as_f64()
                .map_or(false, |v| v >= *min && v <= *max),
        }
    }

    /// Round an arbitrary real number to the nearest valid numeric value.
    ///
    /// Never fails: values outside the domain saturate at its bounds and
    /// non-positive inputs to log domains map to the minimum. Categorical
    /// domains interpret the number as a category index.
    pub fn round_to_valid(&self, value: f64) -> f64 {
        match self {
            Self::Continuous { min, max, .. } => saturate(value, *min, *max),
            Self::Log { min, max, .. } => {
                if value.is_nan() || value <= 0.0 {
                    return *min;
                }
                saturate(value, *min, *max)
            }
            Self::Integer { min, max, .. } => saturate(value.round(), *min as f64, *max as f64),
            Self::DiscreteLog { min, max, .. } => {
                let (min, max) = (*min as f64, *max as f64);
                if value.is_nan() || value <= 0.0 {
                    return min;
                }
                saturate(value.round(), min, max)
            }
            Self::Categorical { values, .. } => {
                saturate(value.round(), 0.0, (values.len() - 1) as f64)
            }
        }
    }

    /// Build the allele for a numeric value of this domain
    ///
    /// Integral domains produce `Allele::Int`, real-valued ones `Allele::Float`.
    /// Categorical domains interpret the value as an index.
    pub fn allele_from_value(&self, value: f64) -> Option<Allele> {
        match self {
            Self::Continuous { .. } | Self::Log { .. } => Some(Allele::Float(value)),
            Self::Integer { .. } | Self::DiscreteLog { .. } => {
                if value.fract() == 0.0 {
                    Some(Allele::Int(value as i64))
                } else {
                    None
                }
            }
            Self::Categorical { values, .. } => {
                if value.fract() != 0.0 || value < 0.0 {
                    return None;
                }
                values.get(value as usize).cloned()
            }
        }
    }

    /// Default value if it is valid, otherwise the minimum or first category
    pub fn fallback_value(&self) -> Allele {
        if let Some(default) = self.default_value().filter(|d| self.contains(d)) {
            return default;
        }
        match self {
            Self::Continuous { min, .. } | Self::Log { min, .. } => Allele::Float(*min),
            Self::Integer { min, .. } | Self::DiscreteLog { min, .. } => Allele::Int(*min),
            Self::Categorical { values, .. } => values[0].clone(),
        }
    }

    /// Replace a value by the nearest valid one
    pub fn repair(&self, value: &Allele) -> Allele {
        if self.contains(value) {
            return value.clone();
        }
        match (self, value.as_f64()) {
            (Self::Categorical { .. }, _) | (_, None) => self.fallback_value(),
            (_, Some(raw)) => {
                let rounded = self.round_to_valid(raw);
                if self.is_integral() {
                    Allele::Int(rounded as i64)
                } else {
                    Allele::Float(rounded)
                }
            }
        }
    }

    /// Draw a uniformly random value (log-uniform for log domains)
    pub fn generate_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Allele {
        match self {
            Self::Continuous { min, max, .. } => {
                if min == max {
                    Allele::Float(*min)
                } else {
                    Allele::Float(rng.gen_range(*min..=*max))
                }
            }
            Self::Log { min, max, .. } => {
                let exponent = if min == max {
                    min.ln()
                } else {
                    rng.gen_range(min.ln()..=max.ln())
                };
                Allele::Float(exponent.exp().clamp(*min, *max))
            }
            Self::Integer { min, max, .. } => Allele::Int(rng.gen_range(*min..=*max)),
            Self::DiscreteLog { min, max, .. } => {
                let low = (*min as f64).ln();
                let high = ((*max + 1) as f64).ln();
                let value = rng.gen_range(low..high).exp().floor() as i64;
                Allele::Int(value.clamp(*min, *max))
            }
            Self::Categorical { values, .. } => values
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| values[0].clone()),
        }
    }
}

fn saturate(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

fn check_real_range(min: f64, max: f64) -> Result<(), ParameterError> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(ParameterError::InvalidDomain(format!(
            "invalid range [{}, {}]",
            min, max
        )));
    }
    Ok(())
}

fn check_integer_range(min: i64, max: i64) -> Result<(), ParameterError> {
    if min > max {
        return Err(ParameterError::InvalidDomain(format!(
            "invalid range [{}, {}]",
            min, max
        )));
    }
    Ok(())
}

fn check_default(default: Option<f64>, min: f64, max: f64) -> Result<(), ParameterError> {
    match default {
        Some(value) if value < min || value > max => Err(ParameterError::InvalidDomain(format!(
            "default {} outside [{}, {}]",
            value, min, max
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_invalid_domains() {
        assert!(Domain::continuous(1.0, 0.0).is_err());
        assert!(Domain::log(0.0, 10.0).is_err());
        assert!(Domain::discrete_log(0, 10).is_err());
        assert!(Domain::categorical(Vec::<Allele>::new()).is_err());
        assert!(Domain::categorical(["a", "a"]).is_err());
    }

    #[test]
    fn test_domain_size() {
        assert_eq!(Domain::integer(-2, 2).unwrap().domain_size(), Some(5));
        assert_eq!(Domain::categorical(["a", "b"]).unwrap().domain_size(), Some(2));
        assert_eq!(Domain::continuous(0.0, 1.0).unwrap().domain_size(), None);
    }

    #[test]
    fn test_round_continuous_saturates() {
        let domain = Domain::continuous(0.0, 1.0).unwrap();
        assert_eq!(domain.round_to_valid(1.5), 1.0);
        assert_eq!(domain.round_to_valid(-0.5), 0.0);
        assert_eq!(domain.round_to_valid(0.6), 0.6);
    }

    #[test]
    fn test_round_integer() {
        let domain = Domain::integer(0, 1).unwrap();
        assert_eq!(domain.round_to_valid(0.3), 0.0);
        assert_eq!(domain.round_to_valid(0.8), 1.0);
        assert_eq!(domain.round_to_valid(7.0), 1.0);
    }

    #[test]
    fn test_round_log_saturates_at_minimum() {
        let domain = Domain::log(1.0, 16.0).unwrap();
        assert_eq!(domain.round_to_valid(0.3), 1.0);
        assert_eq!(domain.round_to_valid(-4.0), 1.0);
        assert_eq!(domain.round_to_valid(100.0), 16.0);
        assert!((domain.round_to_valid(4.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_round_discrete_log() {
        let domain = Domain::discrete_log(1, 1024).unwrap();
        assert_eq!(domain.round_to_valid(3.4), 3.0);
        assert_eq!(domain.round_to_valid(0.0), 1.0);
        assert_eq!(domain.round_to_valid(5000.0), 1024.0);
    }

    #[test]
    fn test_round_is_idempotent_for_valid_values() {
        let domain = Domain::integer(-5, 5).unwrap();
        for v in -5..=5 {
            assert_eq!(domain.round_to_valid(v as f64), v as f64);
        }
    }

    #[test]
    fn test_contains_and_repair() {
        let domain = Domain::integer(0, 10).unwrap();
        assert!(domain.contains(&Allele::Int(3)));
        assert!(!domain.contains(&Allele::Int(11)));
        assert_eq!(domain.repair(&Allele::Int(11)), Allele::Int(10));

        let categorical = Domain::categorical(["a", "b"])
            .unwrap()
            .with_default(Allele::from("b"))
            .unwrap();
        assert_eq!(categorical.repair(&Allele::from("z")), Allele::from("b"));
    }

    #[test]
    fn test_generate_random_is_contained() {
        let mut rng = StdRng::seed_from_u64(7);
        let domains = vec![
            Domain::continuous(-1.0, 1.0).unwrap(),
            Domain::log(0.01, 100.0).unwrap(),
            Domain::integer(-3, 3).unwrap(),
            Domain::discrete_log(1, 64).unwrap(),
            Domain::categorical(["x", "y", "z"]).unwrap(),
        ];
        for domain in &domains {
            for _ in 0..100 {
                let value = domain.generate_random(&mut rng);
                assert!(domain.contains(&value), "{:?} not in {:?}", value, domain);
            }
        }
    }

    #[test]
    fn test_tagged_deserialization() {
        let domain: Domain =
            serde_json::from_str(r#"{"kind": "integer", "min": 1, "max": 5, "default": 2}"#)
                .unwrap();
        assert_eq!(
            domain,
            Domain::Integer {
                min: 1,
                max: 5,
                default: Some(2)
            }
        );
    }
}
