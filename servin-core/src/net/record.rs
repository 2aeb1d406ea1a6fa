use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub name: String,
    pub driver: String,
    pub subnet: String,
    pub gateway: String,
}

impl NetworkRecord {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), driver: "bridge".to_string(), subnet: String::new(), gateway: String::new() }
    }
}
