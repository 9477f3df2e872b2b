//! Device and parameter collections.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::parameter::Parameter;
use crate::value::DataType;

/// Owns the devices and parameters of a server.
///
/// Name lookups honour the container-wide `ignore_case` flag. Names are not
/// required to be unique; callers that need uniqueness check before adding.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterContainer {
    ignore_case: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    devices: Vec<Device>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<Arc<Parameter>>,
}

impl ParameterContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn set_ignore_case(&mut self, ignore: bool) {
        self.ignore_case = ignore;
    }

    fn same_name(&self, a: &str, b: &str) -> bool {
        if self.ignore_case {
            a.chars()
                .flat_map(char::to_lowercase)
                .eq(b.chars().flat_map(char::to_lowercase))
        } else {
            a == b
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Return the named device, creating it when missing.
    ///
    /// Returns `None` for an empty name.
    pub fn create_device(&mut self, name: &str) -> Option<&mut Device> {
        if name.is_empty() {
            return None;
        }
        let index = match self.device_index(name) {
            Some(index) => index,
            None => {
                self.devices.push(Device::new(name));
                self.devices.len() - 1
            }
        };
        self.devices.get_mut(index)
    }

    fn device_index(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| self.same_name(name, &d.name))
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.device_index(name).map(|index| &self.devices[index])
    }

    pub fn device_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.device_index(name).map(|index| &mut self.devices[index])
    }

    /// Remove the first device with a matching name.
    pub fn delete_device(&mut self, name: &str) -> Option<Device> {
        self.device_index(name)
            .map(|index| self.devices.remove(index))
    }

    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    /// Append a parameter. Duplicate names are accepted; an empty name is not.
    pub fn add_parameter(&mut self, parameter: Parameter) -> Option<Arc<Parameter>> {
        if parameter.name().is_empty() {
            return None;
        }
        let parameter = Arc::new(parameter);
        self.parameters.push(parameter.clone());
        Some(parameter)
    }

    /// Return the parameter `name` on `device`, creating it when missing.
    pub fn create_parameter(&mut self, device: &str, name: &str) -> Option<Arc<Parameter>> {
        if name.is_empty() {
            return None;
        }
        if let Some(existing) = self.parameter_on(device, name) {
            return Some(existing);
        }
        self.add_parameter(Parameter::new(name).with_device(device))
    }

    /// First parameter with a matching name, on any device.
    pub fn parameter(&self, name: &str) -> Option<Arc<Parameter>> {
        self.parameters
            .iter()
            .find(|p| self.same_name(name, p.name()))
            .cloned()
    }

    pub fn parameter_on(&self, device: &str, name: &str) -> Option<Arc<Parameter>> {
        self.parameters
            .iter()
            .find(|p| self.same_name(device, p.device()) && self.same_name(name, p.name()))
            .cloned()
    }

    /// Remove the first parameter with a matching name.
    pub fn delete_parameter(&mut self, name: &str) -> Option<Arc<Parameter>> {
        let index = self
            .parameters
            .iter()
            .position(|p| self.same_name(name, p.name()))?;
        Some(self.parameters.remove(index))
    }

    pub fn parameters_by_type(&self, data_type: DataType) -> Vec<Arc<Parameter>> {
        self.parameters
            .iter()
            .filter(|p| p.data_type() == data_type)
            .cloned()
            .collect()
    }

    /// Distinct, trimmed units in collation order.
    pub fn units(&self) -> Vec<String> {
        let units: BTreeSet<CollatedString> = self
            .parameters
            .iter()
            .map(|p| CollatedString(p.unit().trim().to_string()))
            .collect();
        units.into_iter().map(|unit| unit.0).collect()
    }

    /// Stable sort: devices by name, parameters by device then name.
    pub fn sort(&mut self) {
        self.devices.sort_by(|a, b| collate(&a.name, &b.name));
        self.parameters.sort_by(|a, b| {
            collate(a.device(), b.device()).then_with(|| collate(a.name(), b.name()))
        });
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.parameters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.parameters.is_empty()
    }

    pub fn init(&self) {
        for parameter in &self.parameters {
            parameter.init();
        }
    }

    /// Parameters are not scanned on tick.
    pub fn tick(&self) {}

    pub fn exit(&self) {
        for parameter in &self.parameters {
            parameter.exit();
        }
    }
}

/// Deep copy: the clone's parameters are independent of the original's.
impl Clone for ParameterContainer {
    fn clone(&self) -> Self {
        Self {
            ignore_case: self.ignore_case,
            devices: self.devices.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|p| Arc::new(Parameter::clone(p)))
                .collect(),
        }
    }
}

impl PartialEq for ParameterContainer {
    fn eq(&self, other: &Self) -> bool {
        self.ignore_case == other.ignore_case
            && self.devices == other.devices
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| **a == **b)
    }
}

/// Dictionary-style ordering: case folded first, exact bytes as tie-break.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

#[derive(PartialEq, Eq)]
struct CollatedString(String);

impl Ord for CollatedString {
    fn cmp(&self, other: &Self) -> Ordering {
        collate(&self.0, &other.0)
    }
}

impl PartialOrd for CollatedString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
