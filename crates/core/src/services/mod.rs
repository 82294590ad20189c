pub mod analytics_service;
pub mod lot_service;
pub mod option_service;
pub mod returns_service;
