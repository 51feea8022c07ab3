use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Buffered pushes per deal room before slow receivers lag
    pub room_capacity: usize,
    /// Buffered pushes per connection
    pub outbound_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            room_capacity: 256,
            outbound_capacity: 64,
        }
    }
}
