use std::path::Path;
use std::str::FromStr;

use schemars::JsonSchema;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};

/// Log files are named `testx-server.<date>.log`
const FILE_PREFIX: &str = "testx-server";
const FILE_SUFFIX: &str = "log";

/// How often a new log file is started
#[derive(Debug, Default, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[schemars(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    /// A rolling appender writing into `directory`
    pub fn appender(self, directory: &Path) -> Result<RollingFileAppender, InitError> {
        RollingFileAppender::builder()
            .rotation(self.into())
            .filename_prefix(FILE_PREFIX)
            .filename_suffix(FILE_SUFFIX)
            .build(directory)
    }
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minutely" => Ok(Self::Minutely),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "never" => Ok(Self::Never),
            _ => Err("expected one of minutely, hourly, daily or never".to_string()),
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(value: LogRotation) -> Self {
        match value {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("minutely", LogRotation::Minutely, Rotation::MINUTELY)]
    #[case("HOURLY", LogRotation::Hourly, Rotation::HOURLY)]
    #[case("Daily", LogRotation::Daily, Rotation::DAILY)]
    #[case("never", LogRotation::Never, Rotation::NEVER)]
    fn it_parses_and_maps_rotations(
        #[case] name: &str,
        #[case] expected: LogRotation,
        #[case] rotation: Rotation,
    ) {
        let parsed: LogRotation = name.parse().unwrap();

        assert_eq!(parsed, expected);
        assert_eq!(Rotation::from(parsed), rotation);
    }

    #[test]
    fn it_rejects_unknown_rotations() {
        assert!("weekly".parse::<LogRotation>().is_err());
    }

    #[test]
    fn it_writes_never_rotated_logs_into_the_directory() {
        let directory = tempfile::tempdir().unwrap();

        drop(LogRotation::Never.appender(directory.path()).unwrap());

        assert!(directory.path().join("testx-server.log").exists());
    }
}
