// Plinth
// Umbrella crate gathering the plinth utility packages under one roof

pub use plinth_error as error;
pub use plinth_log as log;

// Re-export the central error type; most dependents want nothing else.
pub use plinth_error::BaseError;

/// Everything a typical dependent needs in scope.
pub mod prelude {
    pub use plinth_error::{bail, base_error, ensure};
    pub use plinth_error::{BaseError, Caught, IntoCaught, UnsupportedValue, ValueKind};
    pub use plinth_log::{init_test_logging, LogConfig, LogFormat};
}
