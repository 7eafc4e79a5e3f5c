pub mod catalog_services;
pub mod edge_services;
pub mod notifier_services;
pub mod telegram_services;
pub mod video_relay_services;

pub use catalog_services::DynCatalogService;
pub use telegram_services::DynTelegramService;
pub use video_relay_services::DynVideoRelayService;
