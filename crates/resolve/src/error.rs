use std::fmt;

#[derive(Debug)]
pub enum MappingError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (window out of range, empty table name, etc.).
    ConfigValidation(String),
    /// Missing required column in a lookup table.
    MissingColumn { table: String, column: String },
    /// Date parse error in a lookup table cell.
    DateParse { table: String, line: u64, value: String },
    /// `exported_at` is neither RFC 3339 nor starts with `YYYY-MM-DD`.
    TimestampParse(String),
    /// CSV read error.
    Csv(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::DateParse { table, line, value } => {
                write!(f, "table '{table}', line {line}: cannot parse date '{value}'")
            }
            Self::TimestampParse(value) => {
                write!(f, "cannot derive export date from timestamp '{value}'")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MappingError {}

impl From<csv::Error> for MappingError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<std::io::Error> for MappingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
