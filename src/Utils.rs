//! Helpers around the solver core: logger setup, initial fields and snapshot observers.
pub mod initial_fields;
pub mod logger;
pub mod snapshots;
