//! Service catalogue model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// What kind of component a service is. Drives span kinds and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Edge service receiving external traffic.
    Gateway,
    /// Internal HTTP/RPC service.
    #[default]
    Http,
    /// Relational database.
    Database,
    /// Key/value cache.
    Cache,
    /// Message broker.
    Queue,
    /// Background worker.
    Worker,
}

/// One entry of the service catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServiceDefinition {
    /// Service name.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub name: String,
    /// Component kind.
    #[serde(default)]
    pub kind: ServiceKind,
    /// Operations the service exposes.
    #[serde(default)]
    pub operations: Vec<String>,
    /// Services this one calls.
    #[serde(default)]
    pub downstream: Vec<String>,
}

impl ServiceDefinition {
    /// Creates a definition without operations or dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            operations: Vec::new(),
            downstream: Vec::new(),
        }
    }

    /// Adds an operation.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operations.push(operation.into());
        self
    }

    /// Adds a downstream dependency.
    #[must_use]
    pub fn calls(mut self, service: impl Into<String>) -> Self {
        self.downstream.push(service.into());
        self
    }
}

/// A small e-commerce style catalogue used when none is supplied.
#[must_use]
pub fn default_catalogue() -> Vec<ServiceDefinition> {
    vec![
        ServiceDefinition::new("api-gateway", ServiceKind::Gateway)
            .with_operation("GET /api/products")
            .with_operation("POST /api/orders")
            .with_operation("GET /api/users/{id}")
            .calls("user-service")
            .calls("order-service")
            .calls("product-service"),
        ServiceDefinition::new("user-service", ServiceKind::Http)
            .with_operation("getUser")
            .with_operation("authenticate")
            .calls("postgres")
            .calls("redis"),
        ServiceDefinition::new("order-service", ServiceKind::Http)
            .with_operation("createOrder")
            .with_operation("getOrder")
            .calls("postgres")
            .calls("payment-service")
            .calls("kafka"),
        ServiceDefinition::new("product-service", ServiceKind::Http)
            .with_operation("listProducts")
            .with_operation("getProduct")
            .calls("postgres")
            .calls("redis"),
        ServiceDefinition::new("payment-service", ServiceKind::Http)
            .with_operation("charge")
            .with_operation("refund")
            .calls("postgres"),
        ServiceDefinition::new("postgres", ServiceKind::Database)
            .with_operation("SELECT")
            .with_operation("INSERT")
            .with_operation("UPDATE"),
        ServiceDefinition::new("redis", ServiceKind::Cache)
            .with_operation("GET")
            .with_operation("SET"),
        ServiceDefinition::new("kafka", ServiceKind::Queue)
            .with_operation("publish order.created"),
    ]
}
