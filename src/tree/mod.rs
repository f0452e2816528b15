//! The two relations over the member set: binary placement and sponsorship.

pub mod placement;
pub mod sponsorship;
