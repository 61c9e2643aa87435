pub mod auth_services;
pub mod media_services;
pub mod post_services;
pub mod publish_scheduler;
