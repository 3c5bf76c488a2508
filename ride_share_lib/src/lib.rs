pub mod listing;
pub mod matching;
pub mod notify;
pub mod passenger;
pub mod secret;
pub mod trip;
pub mod validation;

pub use passenger::PassengerRequest;
pub use trip::DriverTrip;
pub use validation::ValidationError;

/// Password given to records created without one.
pub const DEFAULT_PASSWORD: &str = "0000";
