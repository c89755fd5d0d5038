pub mod store;

pub use store::{HttpParameterStore, ParameterProvider, ParameterValue};
