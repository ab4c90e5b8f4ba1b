use fhir_streamer::{
    BrokerClient, DescriptorTable, IngestionRouter, ResourceRouteDescriptor, RouterConfig,
};
use std::sync::Arc;

pub(crate) const AUDIT_TOPIC: &str = "opsMgmt_PlatformTransactions";

pub(crate) fn builtin_router(name: &str, broker: Arc<dyn BrokerClient>) -> IngestionRouter {
    make_router(
        name,
        DescriptorTable::builtin().expect("builtin table should validate"),
        broker,
        RouterConfig::default(),
    )
}

pub(crate) fn make_router(
    name: &str,
    table: DescriptorTable,
    broker: Arc<dyn BrokerClient>,
    config: RouterConfig,
) -> IngestionRouter {
    IngestionRouter::new(name, Arc::new(table), broker, config)
        .expect("router creation should succeed")
}

#[allow(dead_code)]
pub(crate) fn table_of(descriptors: Vec<ResourceRouteDescriptor>) -> DescriptorTable {
    DescriptorTable::new(descriptors).expect("test table should validate")
}
