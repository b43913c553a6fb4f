// Error construction macros
// Provides macros for building and returning structured errors

/// Create a new [`BaseError`](crate::BaseError) from a message, optionally
/// with inline metadata in `json!` object syntax
#[macro_export]
macro_rules! base_error {
    ($message:expr) => {
        $crate::BaseError::new($message)
    };
    ($message:expr, { $($metadata:tt)* }) => {{
        let mut error = $crate::BaseError::new($message);
        if let $crate::serde_json::Value::Object(map) =
            $crate::serde_json::json!({ $($metadata)* })
        {
            error = error.with_metadata(map);
        }
        error
    }};
}

/// Return early with an error if a condition is not satisfied, for functions
/// returning `Result<_, BaseError>`
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($rest:tt)+) => {
        if !($cond) {
            return Err($crate::base_error!($($rest)+));
        }
    };
}

/// Bail early with an error, for functions returning `Result<_, BaseError>`
#[macro_export]
macro_rules! bail {
    ($($rest:tt)+) => {
        return Err($crate::base_error!($($rest)+));
    };
}
