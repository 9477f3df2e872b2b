//! The typed parameter cell.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::value::{DataType, EnumList, ParameterValue, ValueCell, store_text};

/// A named, typed value with unit and identity metadata.
///
/// The value and its valid flag sit behind a single lock so a parameter can
/// be read and written from any thread. Metadata is plain data and is set up
/// before the parameter is shared.
///
/// ```
/// use tickflow_parameter::{DataType, Parameter};
///
/// let speed = Parameter::new("Speed").with_data_type(DataType::Float).with_unit("km/h");
/// speed.set_value(true, 88.0_f64);
/// let mut kmh = 0.0_f64;
/// assert!(speed.get_value(&mut kmh));
/// assert_eq!(kmh, 88.0);
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    name: String,
    display_name: String,
    description: String,
    unit: String,
    device: String,
    signal: String,
    identity: String,
    data_type: DataType,
    #[serde(
        with = "crate::value::enum_list_serde",
        skip_serializing_if = "EnumList::is_empty"
    )]
    enums: EnumList,
    #[serde(skip)]
    cell: Mutex<ValueCell>,
}

impl Parameter {
    /// Create a float parameter with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enums(mut self, enums: EnumList) -> Self {
        self.enums = enums;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    /// Name of the device the parameter belongs to.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn set_device(&mut self, device: impl Into<String>) {
        self.device = device.into();
    }

    /// Signal or channel name.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    pub fn set_signal(&mut self, signal: impl Into<String>) {
        self.signal = signal.into();
    }

    /// Free-form external identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.identity = identity.into();
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }

    /// Enumerate key to text mapping, used when the data type is `Enum`.
    pub fn enums(&self) -> &EnumList {
        &self.enums
    }

    pub fn set_enums(&mut self, enums: EnumList) {
        self.enums = enums;
    }

    pub fn valid(&self) -> bool {
        self.cell.lock().valid
    }

    pub fn set_valid(&self, valid: bool) {
        self.cell.lock().valid = valid;
    }

    /// Convert the stored value into `out` and return the valid flag.
    ///
    /// `out` is written even when the value is invalid. If the stored value
    /// cannot be converted (malformed text, unknown enumerate key), `out`
    /// keeps its previous content.
    pub fn get_value<T: ParameterValue>(&self, out: &mut T) -> bool {
        let cell = self.cell.lock();
        T::load(out, &cell, self.data_type, &self.enums);
        cell.valid
    }

    /// Read the value as `T`, starting from `T::default()`.
    pub fn value<T: ParameterValue + Default>(&self) -> T {
        let mut out = T::default();
        self.get_value(&mut out);
        out
    }

    /// Store `value` converted to this parameter's representation.
    pub fn set_value<T: ParameterValue>(&self, valid: bool, value: T) {
        let mut cell = self.cell.lock();
        cell.valid = valid;
        value.store(&mut cell, self.data_type, &self.enums);
    }

    /// Store text converted to this parameter's representation.
    pub fn set_text(&self, valid: bool, text: &str) {
        let mut cell = self.cell.lock();
        cell.valid = valid;
        store_text(text, &mut cell, self.data_type, &self.enums);
    }

    pub fn init(&self) {
        self.set_valid(false);
    }

    /// Hook for periodic refresh. Does nothing by default.
    pub fn tick(&self) {}

    pub fn exit(&self) {
        self.set_valid(false);
    }

    fn same_metadata(&self, other: &Parameter) -> bool {
        self.name == other.name
            && self.display_name == other.display_name
            && self.description == other.description
            && self.unit == other.unit
            && self.device == other.device
            && self.signal == other.signal
            && self.identity == other.identity
            && self.data_type == other.data_type
            && self.enums == other.enums
    }
}

impl Clone for Parameter {
    fn clone(&self) -> Self {
        let cell = self.cell.lock().clone();
        Self {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            unit: self.unit.clone(),
            device: self.device.clone(),
            signal: self.signal.clone(),
            identity: self.identity.clone(),
            data_type: self.data_type,
            enums: self.enums.clone(),
            cell: Mutex::new(cell),
        }
    }
}

/// Parameters compare by configuration, not by live value.
impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.same_metadata(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ByteArray;
    use std::sync::Arc;

    fn parameter(data_type: DataType) -> Parameter {
        Parameter::new("Olle").with_data_type(data_type)
    }

    fn on_off() -> EnumList {
        EnumList::from([
            (0, "Invalid".to_string()),
            (1, "ON".to_string()),
            (2, "OFF".to_string()),
        ])
    }

    #[test]
    fn test_properties() {
        let mut par = Parameter::new("Olle");
        par.set_display_name("Olle Display Name");
        par.set_description("Olle Description");
        par.set_unit("ms");
        par.set_device("Olle Device");
        par.set_identity("Olle Identity");
        par.set_signal("Olle Signal");
        par.set_data_type(DataType::ByteArray);

        assert_eq!(par.name(), "Olle");
        assert_eq!(par.display_name(), "Olle Display Name");
        assert_eq!(par.unit(), "ms");
        assert_eq!(par.device(), "Olle Device");
        assert_eq!(par.signal(), "Olle Signal");
        assert_eq!(par.identity(), "Olle Identity");
        assert_eq!(par.data_type(), DataType::ByteArray);

        par.set_valid(true);
        assert!(par.valid());
        par.set_valid(false);
        assert!(!par.valid());
    }

    #[test]
    fn test_float_round_trip_and_validity() {
        let par = parameter(DataType::Float);
        par.set_value(true, 1.23_f64);
        let mut out = 0.0_f64;
        assert!(par.get_value(&mut out));
        assert_eq!(out, 1.23);

        par.set_value(false, 4.56_f64);
        let mut out = 0.0_f64;
        assert!(!par.get_value(&mut out));
        assert_eq!(out, 4.56);

        par.set_value(true, 1.0_f32 / 3.0);
        let mut out = 0.0_f32;
        assert!(par.get_value(&mut out));
        assert_eq!(out, 1.0_f32 / 3.0);

        par.set_value(false, f64::NAN);
        let mut out = 0.0_f64;
        assert!(!par.get_value(&mut out));
        assert!(out.is_nan());
    }

    #[test]
    fn test_signed_round_trip() {
        let par = parameter(DataType::Signed);
        par.set_value(true, -12_i32);
        assert_eq!(par.value::<i64>(), -12);
        assert_eq!(par.value::<String>(), "-12");
        assert_eq!(par.value::<f64>(), -12.0);
        assert!(!par.value::<bool>());

        par.set_value(true, 12_i64);
        assert!(par.value::<bool>());
        assert_eq!(par.value::<ByteArray>(), 12_i64.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_unsigned_round_trip() {
        let par = parameter(DataType::Unsigned);
        par.set_value(true, 123_u32);
        assert_eq!(par.value::<u64>(), 123);
        assert_eq!(par.value::<String>(), "123");

        par.set_text(true, " 456 ");
        assert_eq!(par.value::<u16>(), 456);

        par.set_text(true, "not-a-number");
        assert_eq!(par.value::<u64>(), 456);
    }

    #[test]
    fn test_float_to_bool_threshold() {
        let par = parameter(DataType::Float);
        par.set_value(true, 0.5_f64);
        assert!(!par.value::<bool>());
        par.set_value(true, 0.51_f64);
        assert!(par.value::<bool>());
    }

    #[test]
    fn test_boolean_round_trip() {
        let par = parameter(DataType::Boolean);
        par.set_value(true, true);
        assert!(par.value::<bool>());
        assert_eq!(par.value::<String>(), "1");
        assert_eq!(par.value::<ByteArray>(), vec![1]);

        par.set_value(true, false);
        assert!(!par.value::<bool>());
        assert_eq!(par.value::<String>(), "0");
    }

    #[test]
    fn test_boolean_from_text() {
        let par = parameter(DataType::Boolean);
        for text in ["ON", "On", "true", "1", "Enabled"] {
            par.set_text(true, text);
            assert!(par.value::<bool>(), "{text}");
        }
        for text in ["OFF", "false", "0", ""] {
            par.set_text(true, text);
            assert!(!par.value::<bool>(), "{text}");
        }
    }

    #[test]
    fn test_string_to_bool() {
        let par = parameter(DataType::String);
        for text in ["ON", "On", "true", "1", "Enabled"] {
            par.set_value(true, text.to_string());
            assert!(par.value::<bool>(), "{text}");
        }
        for text in ["OFF", "false", "0", ""] {
            par.set_value(true, text.to_string());
            assert!(!par.value::<bool>(), "{text}");
        }
    }

    #[test]
    fn test_string_round_trip() {
        let par = parameter(DataType::String);
        par.set_value(true, "Olle Troll".to_string());
        assert_eq!(par.value::<String>(), "Olle Troll");
        assert_eq!(par.value::<ByteArray>(), b"Olle Troll".to_vec());

        par.set_value(true, 1.0_f64 / 3.0);
        assert_eq!(par.value::<f64>(), 1.0 / 3.0);
    }

    #[test]
    fn test_enum_round_trip() {
        let par = parameter(DataType::Enum).with_enums(on_off());

        par.set_value(true, 1_i64);
        assert_eq!(par.value::<String>(), "ON");
        assert!(par.value::<bool>());

        par.set_text(true, "OFF");
        assert_eq!(par.value::<i64>(), 2);
        assert!(!par.value::<bool>());

        par.set_text(true, "0");
        assert_eq!(par.value::<String>(), "Invalid");

        par.set_value(true, 7_i64);
        assert_eq!(par.value::<String>(), "");
        assert!(par.value::<ByteArray>().is_empty());
    }

    #[test]
    fn test_byte_array_round_trip() {
        let par = parameter(DataType::ByteArray);
        let bytes: ByteArray = vec![1, 2, 3, 255];
        par.set_value(true, bytes.clone());
        let mut out = ByteArray::new();
        assert!(par.get_value(&mut out));
        assert_eq!(out, bytes);
        assert_eq!(par.value::<u8>(), 1);

        par.set_value(true, "abc".to_string());
        assert_eq!(par.value::<String>(), "abc");
    }

    #[test]
    fn test_init_and_exit_invalidate() {
        let par = parameter(DataType::Float);
        par.set_value(true, 1.0_f64);
        par.init();
        assert!(!par.valid());
        par.set_valid(true);
        par.exit();
        assert!(!par.valid());
    }

    #[test]
    fn test_clone_copies_value() {
        let par = parameter(DataType::Signed);
        par.set_value(true, 5_i64);
        let copy = par.clone();
        assert_eq!(copy, par);
        assert_eq!(copy.value::<i64>(), 5);
        assert!(copy.valid());
    }

    #[test]
    fn test_concurrent_access() {
        let par = Arc::new(parameter(DataType::Unsigned));
        let writers: Vec<_> = (0..4)
            .map(|n| {
                let par = par.clone();
                std::thread::spawn(move || {
                    for i in 0..1000_u64 {
                        par.set_value(true, i * 4 + n);
                        let _ = par.value::<String>();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert!(par.valid());
        assert!(par.value::<u64>() < 4000);
    }
}
