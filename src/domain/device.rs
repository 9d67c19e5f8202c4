// Device domain model
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
}

impl Device {
    pub fn new(id: String) -> Self {
        let name = Self::format_name(&id);
        Self { id, name }
    }

    fn format_name(id: &str) -> String {
        // "Truck_07_" -> "Truck 07"
        id.trim_end_matches('_').replace('_', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name() {
        let device = Device::new("Delivery_Van_".to_string());
        assert_eq!(device.name, "Delivery Van");

        let device = Device::new("truck-7".to_string());
        assert_eq!(device.name, "truck-7");
    }
}
