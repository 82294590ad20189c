pub mod analytics;
pub mod option;
pub mod position;
pub mod transaction;
