//! Default bridge-network constants (§4.9).

use servin_shared::constants::network;

use super::record::NetworkRecord;

pub const DEFAULT_BRIDGE: &str = network::BRIDGE_NAME;

pub fn default_bridge_record() -> NetworkRecord {
    NetworkRecord {
        name: DEFAULT_BRIDGE.to_string(),
        driver: "bridge".to_string(),
        subnet: network::BRIDGE_CIDR.to_string(),
        gateway: network::BRIDGE_GATEWAY.to_string(),
    }
}
