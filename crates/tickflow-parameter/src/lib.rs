//! Typed, thread-safe parameters for tickflow.
//!
//! A [`Parameter`] is a named value slot with metadata (unit, device, data
//! type, enum table) and a validity flag. Its value may be read and written
//! from any thread; every access converts between the caller's type and the
//! parameter's stored [`DataType`].
//!
//! [`ParameterContainer`] owns the parameters and [`Device`]s of one server.

pub mod container;
pub mod device;
pub mod parameter;
pub mod value;

pub use container::{ParameterContainer, collate};
pub use device::Device;
pub use parameter::Parameter;
pub use value::{ByteArray, DataType, EnumList, ParameterValue, ValueCell, text_to_bool};
