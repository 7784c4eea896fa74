//! Formatting for the error tail of the outward stream.
//!
//! A session that dies on a worker failure ends its stream with one line in
//! this shape instead of a clean close; `is_error_line` lets the consumer
//! tell the two apart.

const ERROR_PREFIX: &str = "Error: ";

pub fn error_line(msg: &str) -> String {
    format!("{ERROR_PREFIX}{msg}")
}

pub fn is_error_line(line: &str) -> bool {
    line.starts_with(ERROR_PREFIX)
}
