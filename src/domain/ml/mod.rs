pub mod feature_deriver;
pub mod feature_registry;
pub mod tier_ladder;
