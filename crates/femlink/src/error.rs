//! Boundary error values
//!
//! Every fallible boundary call reports one of three kinds of failure. The
//! message of a native exception is carried verbatim.

use crate::cast::TypeTag;
use thiserror::Error;

/// Kind of a boundary error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullNativePointer,
    WrongDowncastType,
    NativeException,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A native query that may legitimately yield nothing returned null.
    #[error("null native pointer: {what}")]
    NullNativePointer { what: &'static str },

    /// A checked downcast found a different runtime type.
    #[error("wrong downcast type: expected {expected}, found {found}")]
    WrongDowncastType { expected: TypeTag, found: TypeTag },

    /// The native library raised an exception.
    #[error("native exception in {op}: {message}")]
    NativeException { op: &'static str, message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NullNativePointer { .. } => ErrorKind::NullNativePointer,
            Error::WrongDowncastType { .. } => ErrorKind::WrongDowncastType,
            Error::NativeException { .. } => ErrorKind::NativeException,
        }
    }

    /// The exception text exactly as the native library raised it.
    pub fn native_message(&self) -> Option<&str> {
        match self {
            Error::NativeException { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result type for boundary calls
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kinds() {
        let null = Error::NullNativePointer { what: "Mesh nodes" };
        assert_eq!(null.kind(), ErrorKind::NullNativePointer);
        assert_eq!(null.native_message(), None);

        let downcast = Error::WrongDowncastType {
            expected: TypeTag::SparseMatrix,
            found: TypeTag::DenseMatrix,
        };
        assert_eq!(downcast.kind(), ErrorKind::WrongDowncastType);
        assert_eq!(
            downcast.to_string(),
            "wrong downcast type: expected SparseMatrix, found DenseMatrix"
        );
    }

    #[test]
    fn test_native_message_is_verbatim() {
        let err = Error::NativeException {
            op: "H1_FECollection_new",
            message: "H1_FECollection requires order >= 1.".to_string(),
        };
        assert_eq!(err.native_message(), Some("H1_FECollection requires order >= 1."));
        assert!(err.to_string().ends_with("H1_FECollection requires order >= 1."));
    }
}
