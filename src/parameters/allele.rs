//! Typed gene values

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The typed value held by a single gene
///
/// Human-readable formats write alleles as plain literals, so a parameter
/// tree specification can list categorical values as JSON values. Binary
/// formats, which cannot guess a variant from the input, write the variant
/// tag.
#[derive(Clone, Debug)]
pub enum Allele {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
}

impl Allele {
    /// Numeric view of the allele, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

#[derive(Serialize)]
enum TaggedRef<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

#[derive(Deserialize)]
enum Tagged {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Plain {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Serialize for Allele {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            match self {
                Self::Bool(v) => serializer.serialize_bool(*v),
                Self::Int(v) => serializer.serialize_i64(*v),
                Self::Float(v) => serializer.serialize_f64(*v),
                Self::Str(v) => serializer.serialize_str(v),
            }
        } else {
            let tagged = match self {
                Self::Bool(v) => TaggedRef::Bool(*v),
                Self::Int(v) => TaggedRef::Int(*v),
                Self::Float(v) => TaggedRef::Float(*v),
                Self::Str(v) => TaggedRef::Str(v),
            };
            tagged.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Allele {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            Ok(match Plain::deserialize(deserializer)? {
                Plain::Bool(v) => Self::Bool(v),
                Plain::Int(v) => Self::Int(v),
                Plain::Float(v) => Self::Float(v),
                Plain::Str(v) => Self::Str(v),
            })
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Bool(v) => Self::Bool(v),
                Tagged::Int(v) => Self::Int(v),
                Tagged::Float(v) => Self::Float(v),
                Tagged::Str(v) => Self::Str(v),
            })
        }
    }
}

/// Gene-value equality: integers and floats compare numerically.
impl PartialEq for Allele {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => *a as f64 == *b,
            _ => false,
        }
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Allele {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Allele {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Allele {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Allele {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Allele {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_across_variants() {
        assert_eq!(Allele::Int(3), Allele::Float(3.0));
        assert_eq!(Allele::Float(3.0), Allele::Int(3));
        assert_ne!(Allele::Int(3), Allele::Float(3.5));
        assert_ne!(Allele::Int(1), Allele::Bool(true));
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<Allele> = serde_json::from_str(r#"[true, 4, 0.5, "fast"]"#).unwrap();
        assert!(matches!(values[0], Allele::Bool(true)));
        assert!(matches!(values[1], Allele::Int(4)));
        assert!(matches!(values[2], Allele::Float(v) if v == 0.5));
        assert!(matches!(&values[3], Allele::Str(s) if s == "fast"));
    }

    #[test]
    fn test_binary_round_trip_keeps_variant() {
        let values = vec![
            Allele::Bool(false),
            Allele::Int(7),
            Allele::Float(7.0),
            Allele::from("slow"),
        ];
        let bytes = bincode::serialize(&values).unwrap();
        let decoded: Vec<Allele> = bincode::deserialize(&bytes).unwrap();
        assert!(matches!(decoded[1], Allele::Int(7)));
        assert!(matches!(decoded[2], Allele::Float(v) if v == 7.0));
        assert!(matches!(&decoded[3], Allele::Str(s) if s == "slow"));

        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[false,7,7.0,"slow"]"#);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Allele::Int(2).as_f64(), Some(2.0));
        assert_eq!(Allele::from("a").as_f64(), None);
    }
}
