pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns an `InvalidArgument` error for `name` from the enclosing function unless
/// `cond` holds.
///
/// The message is the stringified condition, or the formatted trailing arguments.
#[macro_export]
macro_rules! verify_arg {
    ($name:ident, $cond:expr $(,)?) => {
        if !$cond {
            return Err($crate::error::Error::invalid_arg(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
    ($name:ident, $cond:expr, $($fmt:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::invalid_arg(
                stringify!($name),
                format!($($fmt)+),
            ));
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_capacity(capacity: usize) -> crate::Result<usize> {
        verify_arg!(capacity, capacity != 0);
        Ok(capacity)
    }

    fn check_chunk(chunk: usize, capacity: usize) -> crate::Result<()> {
        verify_arg!(chunk, chunk <= capacity, "chunk {chunk} exceeds capacity {capacity}");
        Ok(())
    }

    fn invalid_arg(err: crate::error::Error) -> (String, String) {
        match err.into_kind() {
            ErrorKind::InvalidArgument { name, message } => (name, message),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_verify_arg_condition_message() {
        assert_eq!(check_capacity(16).unwrap(), 16);
        let (name, message) = invalid_arg(check_capacity(0).unwrap_err());
        assert_eq!(name, "capacity");
        assert_eq!(message, "capacity != 0");
    }

    #[test]
    fn test_verify_arg_formatted_message() {
        check_chunk(8, 8).unwrap();
        let (name, message) = invalid_arg(check_chunk(9, 8).unwrap_err());
        assert_eq!(name, "chunk");
        assert_eq!(message, "chunk 9 exceeds capacity 8");
    }
}
