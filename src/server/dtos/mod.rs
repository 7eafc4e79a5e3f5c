pub mod catalog_dto;
pub mod cron_dto;
pub mod health_dto;
