//! Simulated test environments

use serde::{Deserialize, Serialize};
use vrt_core::{DeviceClass, Viewport};

/// One simulated environment a suite runs its assertions under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEnvironment {
    pub name: String,
    pub device: DeviceClass,
    pub viewport: Viewport,
}

impl TestEnvironment {
    pub fn new(name: impl Into<String>, device: DeviceClass, viewport: Viewport) -> Self {
        Self {
            name: name.into(),
            device,
            viewport,
        }
    }

    /// The three fixed environments every suite runs against
    pub fn defaults() -> Vec<TestEnvironment> {
        vec![
            TestEnvironment::new("Desktop", DeviceClass::Desktop, Viewport::new(1920, 1080)),
            TestEnvironment::new("Tablet", DeviceClass::Tablet, Viewport::new(768, 1024)),
            TestEnvironment::new("Mobile", DeviceClass::Mobile, Viewport::new(375, 667)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_environments() {
        let environments = TestEnvironment::defaults();
        assert_eq!(environments.len(), 3);
        assert_eq!(environments[0].viewport, Viewport::new(1920, 1080));
        assert_eq!(environments[2].device, DeviceClass::Mobile);
        assert_eq!(environments[2].viewport, Viewport::new(375, 667));
    }
}
