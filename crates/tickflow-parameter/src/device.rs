use serde::{Deserialize, Serialize};

/// Static identity of a piece of equipment that parameters belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub name: String,
    pub description: String,
    pub identity: i32,
    pub protocol: String,
    pub bus: String,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_covers_all_fields() {
        let orig = Device {
            name: "Olle".into(),
            description: "Test rig".into(),
            identity: 12,
            protocol: "CAN".into(),
            bus: "CAN1".into(),
        };
        let mut copy = orig.clone();
        assert_eq!(copy, orig);
        copy.bus = "CAN2".into();
        assert_ne!(copy, orig);
    }

    #[test]
    fn test_missing_fields_default() {
        let device: Device = toml::from_str(r#"name = "Pelle""#).unwrap();
        assert_eq!(device, Device::new("Pelle"));
    }
}
