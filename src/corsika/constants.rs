//! Physical constants consumed by the time-shift geometry.
//!
//! Lengths are in centimetres, times in nanoseconds, matching the units
//! CORSIKA writes into its particle and header records.

/// Earth radius, cm.
pub const EARTH_RADIUS: f64 = 6.371_315e8;

/// Speed of light, cm/ns.
pub const SPEED_OF_LIGHT: f64 = 29.979_245_8;

/// Default top-of-atmosphere altitude, cm. Used when the event header
/// carries no positive starting height.
pub const ATMOSPHERE_BOUNDARY: f64 = 112.8292e5;

/// CORSIKA particle code for a photon primary.
pub const PHOTON_ID: u32 = 1;
