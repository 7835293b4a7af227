use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, RequisitionService, SeaOrmAuthService, SeaOrmRequisitionService,
    SeaOrmSupplyInventory, SupplyInventory,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub requisition_service: Arc<dyn RequisitionService>,

    pub supply_inventory: Arc<dyn SupplyInventory>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let requisition_service = Arc::new(SeaOrmRequisitionService::new(store.clone()))
            as Arc<dyn RequisitionService + Send + Sync + 'static>;

        let supply_inventory = Arc::new(SeaOrmSupplyInventory::new(store.clone()))
            as Arc<dyn SupplyInventory + Send + Sync + 'static>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            requisition_service,
            supply_inventory,
        })
    }
}
