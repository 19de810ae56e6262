pub mod caldav;
pub mod error;
pub mod model;
