//! Error types of the dissection & serialization engine.

mod dissect_error;
pub use dissect_error::*;

mod serialize_error;
pub use serialize_error::*;

mod option_error;
pub use option_error::*;

mod invalid_interface_error;
pub use invalid_interface_error::*;
