pub mod mock;
pub mod observability;
