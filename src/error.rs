//! Top-level error joining load failures and runtime traps.

use std::fmt;

use crate::parser::LoadError;
use crate::runtime::RuntimeError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Load(e) => e.kind.code(),
            Error::Runtime(e) => e.code(),
        }
    }

    /// Byte offset the failure was detected at, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Load(e) => Some(e.offset),
            Error::Runtime(e) => e.offset(),
        }
    }

    /// The form printed to stderr by the `wvm` binary.
    pub fn report(&self) -> Report<'_> {
        Report(self)
    }
}

pub struct Report<'a>(&'a Error);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[wvm] {} ({})", self.0, self.0.code())?;
        if let Some(offset) = self.0.offset() {
            write!(f, "\nByte index before: {offset}.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LoadErrorKind;

    #[test]
    fn test_runtime_report() {
        let err: Error = RuntimeError::DivisionByZero.at(0x2a).into();
        assert_eq!(err.code(), "DIVISION_BY_ZERO");
        assert_eq!(
            err.report().to_string(),
            "[wvm] Integer division by zero (DIVISION_BY_ZERO)\nByte index before: 42."
        );
    }

    #[test]
    fn test_report_without_offset() {
        let err: Error = RuntimeError::EntryNotFound("main".to_string()).into();
        assert_eq!(err.offset(), None);
        assert_eq!(
            err.report().to_string(),
            "[wvm] Entry function not found: main (ENTRY_NOT_FOUND)"
        );
    }

    #[test]
    fn test_load_report() {
        let err: Error = LoadError::new(LoadErrorKind::InvalidVersion(2), 4).into();
        assert_eq!(err.code(), "INVALID_VER");
        assert_eq!(err.offset(), Some(4));
        assert!(err.report().to_string().starts_with("[wvm] Invalid WebAssembly version code found: 2"));
    }
}
