//! Log output formats for the daemon's stderr stream.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the records courierd writes to stderr.
///
/// Selected with `--log-format`, `COURIER_LOG_FORMAT` or `log_format` in the
/// configuration file. Parsing ignores case.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record with the event fields flattened beside the
    /// message, so a call's `path`, `code` and `kind` can be filtered on.
    #[default]
    Json,
    /// Single-line text records for a developer watching a terminal.
    Compact,
}

impl LogFormat {
    /// Whether records are meant for a log collector rather than a person.
    ///
    /// Machine-readable output never carries ANSI colour codes.
    #[must_use]
    pub const fn is_machine_readable(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when `--log-format` names an unknown format.
pub type LogFormatParseError = strum::ParseError;
