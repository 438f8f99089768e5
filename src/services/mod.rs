pub mod audit;
pub mod distributions;
pub mod receivables;
pub mod returns;
pub mod stores;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

pub use audit::AuditService;
pub use distributions::DistributionService;
pub use receivables::ReceivableService;
pub use returns::ReturnService;
pub use stores::StoreService;

/// All domain services, constructed once at startup and shared through
/// application state.
#[derive(Clone)]
pub struct AppServices {
    pub audit: Arc<AuditService>,
    pub stores: StoreService,
    pub distributions: DistributionService,
    pub returns: ReturnService,
    pub receivables: ReceivableService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        let audit = Arc::new(AuditService::new(db.clone()));
        Self {
            stores: StoreService::new(db.clone(), event_sender.clone(), audit.clone()),
            distributions: DistributionService::new(
                db.clone(),
                event_sender.clone(),
                audit.clone(),
            ),
            returns: ReturnService::new(db.clone(), event_sender.clone(), audit.clone()),
            receivables: ReceivableService::new(db, event_sender, audit.clone()),
            audit,
        }
    }
}
