//! Reports computed over persisted elements.

pub mod handover;
pub mod takeoff;

pub use handover::{compute_handover_register, handover_register, HandoverAsset, HandoverRegister};
pub use takeoff::{compute_takeoff, takeoff, GroupBy, TakeoffGroup, TakeoffReport, TakeoffSummary};
