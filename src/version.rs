//! Module version model and its normalised directory form.

use std::fmt;

use serde_json::{Number, Value};

use crate::error::PublishError;

/// Number of components a version sequence must carry.
pub const VERSION_COMPONENTS: usize = 3;

/// Version of a module as written in the install configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
  /// Ordered components such as `[major, minor, patch]`.
  Components(Vec<String>),
  /// Dotted string such as `"1.2.3"`.
  Dotted(String),
}

impl VersionSpec {
  /// Render the version with `_` separators, as used in module directory names.
  ///
  /// Component sequences must hold exactly three entries. Dotted strings are split on `.`
  /// without any constraint on the number of parts.
  pub fn normalize(&self) -> Result<String, PublishError> {
    match self {
      Self::Components(parts) if parts.len() == VERSION_COMPONENTS => Ok(parts.join("_")),
      Self::Components(parts) => Err(PublishError::InvalidVersion {
        found: format!("{parts:?}"),
      }),
      Self::Dotted(text) => Ok(text.split('.').collect::<Vec<_>>().join("_")),
    }
  }
}

impl fmt::Display for VersionSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Components(parts) => write!(f, "{}", parts.join(".")),
      Self::Dotted(text) => f.write_str(text),
    }
  }
}

impl From<&str> for VersionSpec {
  fn from(value: &str) -> Self {
    Self::Dotted(value.to_string())
  }
}

impl TryFrom<&Value> for VersionSpec {
  type Error = PublishError;

  fn try_from(value: &Value) -> Result<Self, Self::Error> {
    let invalid = || PublishError::InvalidVersion {
      found: value.to_string(),
    };

    match value {
      Value::String(text) => Ok(Self::Dotted(text.clone())),
      Value::Array(items) => items
        .iter()
        .map(|item| match item {
          Value::String(text) => Ok(text.clone()),
          Value::Number(number) => Ok(render_number(number)),
          _ => Err(invalid()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Self::Components),
      _ => Err(invalid()),
    }
  }
}

/// Render a JSON number the way it is written in a version, so `1.0` becomes `1`.
fn render_number(number: &Number) -> String {
  if number.is_f64()
    && let Some(value) = number.as_f64()
  {
    return value.to_string();
  }
  number.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn from_json(value: Value) -> Result<VersionSpec, PublishError> {
    VersionSpec::try_from(&value)
  }

  #[test]
  fn dotted_and_component_forms_normalise_identically() {
    let dotted = from_json(json!("1.2.3")).unwrap();
    let numbers = from_json(json!([1, 2, 3])).unwrap();
    let strings = from_json(json!(["1", "2", "3"])).unwrap();

    assert_eq!(dotted.normalize().unwrap(), "1_2_3");
    assert_eq!(numbers.normalize().unwrap(), "1_2_3");
    assert_eq!(strings.normalize().unwrap(), "1_2_3");
  }

  #[test]
  fn rejects_short_and_long_component_lists() {
    let short = from_json(json!([1, 2])).unwrap();
    assert!(matches!(short.normalize(), Err(PublishError::InvalidVersion { .. })));

    let long = VersionSpec::Components(vec!["1".into(), "2".into(), "3".into(), "4".into()]);
    assert!(long.normalize().is_err());
  }

  #[test]
  fn rejects_scalars_and_null() {
    assert!(matches!(from_json(json!(123)), Err(PublishError::InvalidVersion { .. })));
    assert!(matches!(from_json(Value::Null), Err(PublishError::InvalidVersion { .. })));
    assert!(from_json(json!({"major": 1})).is_err());
    assert!(from_json(json!([1, [2], 3])).is_err());
  }

  #[test]
  fn integral_float_components_drop_the_fraction() {
    let spec = from_json(json!([1.0, 2, 3])).unwrap();
    assert_eq!(spec.normalize().unwrap(), "1_2_3");

    let spec = from_json(json!([1.5, -2, 3])).unwrap();
    assert_eq!(spec.normalize().unwrap(), "1.5_-2_3");
  }

  #[test]
  fn dotted_strings_keep_every_part() {
    let spec = VersionSpec::from("2025.10");
    assert_eq!(spec.normalize().unwrap(), "2025_10");
    assert_eq!(spec.to_string(), "2025.10");
  }
}
