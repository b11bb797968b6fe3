// Feature layout, derivation and tier mapping
pub mod ml;

// Input schemas
pub mod validation;

// Domain-specific error types
pub mod errors;
