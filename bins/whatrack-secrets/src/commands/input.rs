//! Reading command input from files, arguments or stdin

use std::io::Read;
use std::path::Path;
use whatrack_core::error::{Error, Result};

/// Read a payload as raw bytes, exactly as stored.
///
/// `None` or `-` reads stdin. Nothing is trimmed: a trailing newline is part
/// of the signed body.
pub fn read_body(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read(p).map_err(|e| Error::from(e).with_context(format!("Reading {}", p.display())))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Read a single-line value from an argument or stdin.
///
/// Values read from stdin lose their trailing line ending.
pub fn read_value(arg: Option<&str>, what: &str) -> Result<String> {
    let value = match arg {
        Some(v) if v != "-" => v.to_string(),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            strip_line_ending(&buf).to_string()
        }
    };

    if value.is_empty() {
        return Err(Error::validation(format!("No {} provided", what)));
    }
    Ok(value)
}

fn strip_line_ending(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use whatrack_core::error::ErrorCode;

    #[test]
    fn test_strip_line_ending() {
        assert_eq!(strip_line_ending("abc\n"), "abc");
        assert_eq!(strip_line_ending("abc\r\n"), "abc");
        assert_eq!(strip_line_ending("abc\n\n"), "abc\n");
        assert_eq!(strip_line_ending("abc"), "abc");
    }

    #[test]
    fn test_read_body_keeps_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"a\":1}\n").unwrap();
        let body = read_body(Some(file.path())).unwrap();
        assert_eq!(body, b"{\"a\":1}\n");
    }

    #[test]
    fn test_read_body_missing_file() {
        let err = read_body(Some(Path::new("/nonexistent/body.json"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }

    #[test]
    fn test_read_value_from_arg() {
        assert_eq!(read_value(Some("EAAG"), "token").unwrap(), "EAAG");
    }

    #[test]
    fn test_read_value_empty_arg_is_validation_error() {
        let err = read_value(Some(""), "token").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("token"));
    }
}
