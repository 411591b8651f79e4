use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize as _, Deserializer};

/// Deserialize a config value by name, naming the rejected value in the error
pub(super) fn by_name<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let name = String::deserialize(deserializer)?;
    name.trim()
        .parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid value `{name}`: {e}")))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tracing::Level;

    use super::super::LogRotation;

    #[derive(Deserialize)]
    struct Logging {
        #[serde(deserialize_with = "super::by_name")]
        level: Level,
        #[serde(deserialize_with = "super::by_name")]
        rotation: LogRotation,
    }

    #[test]
    fn it_parses_names_in_any_case() {
        let logging: Logging =
            serde_json::from_str(r#"{ "level": "WARN", "rotation": " Hourly " }"#).unwrap();

        assert_eq!(logging.level, Level::WARN);
        assert_eq!(logging.rotation, LogRotation::Hourly);
    }

    #[test]
    fn it_names_the_rejected_value() {
        let error =
            serde_json::from_str::<Logging>(r#"{ "level": "chatty", "rotation": "daily" }"#)
                .err()
                .unwrap();

        assert!(error.to_string().starts_with("invalid value `chatty`"));
    }
}
