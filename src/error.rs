use thiserror::Error;

/// Problems with a rule table that make classification unreliable.
///
/// These are fatal at startup: the engine refuses to run rather than
/// silently misclassifying every record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse rules: {0}")]
    Parse(String),

    #[error("Village keyword table is empty")]
    EmptyKeywords,

    #[error("Empty keyword in {table} table")]
    EmptyKeyword { table: &'static str },

    #[error("Empty label for keyword '{keyword}'")]
    EmptyLabel { keyword: String },

    #[error("Keyword '{keyword}' maps to both '{first}' and '{second}'")]
    AmbiguousKeyword {
        keyword: String,
        first: String,
        second: String,
    },

    #[error("{table} band table is empty")]
    EmptyBands { table: &'static str },

    #[error("{table} bands must start at 0, first lower bound is {lower}")]
    UncoveredStart { table: &'static str, lower: f64 },

    #[error("{table} band '{label}' has lower bound {lower} >= upper bound {upper}")]
    InvertedBand {
        table: &'static str,
        label: String,
        lower: f64,
        upper: f64,
    },

    #[error("{table} bands leave a gap between {upper} and {next_lower} (before '{label}')")]
    Gap {
        table: &'static str,
        label: String,
        upper: f64,
        next_lower: f64,
    },

    #[error("{table} bands overlap between {next_lower} and {upper} (at '{label}')")]
    Overlap {
        table: &'static str,
        label: String,
        upper: f64,
        next_lower: f64,
    },

    #[error("{table} band '{label}' is open-ended but is not the last band")]
    OpenBandNotLast { table: &'static str, label: String },

    #[error("{table} band label '{label}' is used more than once")]
    DuplicateBandLabel { table: &'static str, label: String },

    #[error("{table} band label '{label}' collides with the unknown label")]
    UnknownLabelCollision { table: &'static str, label: String },

    #[error("{what} must not be empty")]
    EmptyName { what: &'static str },

    #[error("Size divisor must be a positive finite number, got {0}")]
    InvalidDivisor(f64),
}
