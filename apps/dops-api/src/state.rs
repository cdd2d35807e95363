use std::sync::Arc;

use dops_service::DopsService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DopsService>,
}
impl AppState {
	/// The corpus is not touched here; it loads on the first request that needs it.
	pub fn new(config: dops_config::Config) -> Self {
		Self::from_service(DopsService::new(config))
	}

	pub fn from_service(service: DopsService) -> Self {
		Self { service: Arc::new(service) }
	}
}
