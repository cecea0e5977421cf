//! The decoded event bundle and the observation-level time geometry.

use log::debug;

use super::block::{EventHeader, EventTrailer};
use super::constants::{ATMOSPHERE_BOUNDARY, EARTH_RADIUS, PHOTON_ID, SPEED_OF_LIGHT};
use super::longitudinal::LongProfile;

/// One fully located shower: decoded header and trailer, the longitudinal
/// profile (possibly empty), and everything a particle cursor needs.
#[derive(Debug, Clone)]
pub struct CorsikaShower {
    header: EventHeader,
    trailer: EventTrailer,
    pub(crate) profile: LongProfile,
    pub(crate) particle_start: u64,
    pub(crate) time_shift: f64,
    pub(crate) observation_level: u32,
}

impl CorsikaShower {
    pub(crate) fn new(
        header: EventHeader,
        trailer: EventTrailer,
        particle_start: u64,
        time_shift: f64,
        observation_level: u32,
    ) -> Self {
        Self {
            header,
            trailer,
            profile: LongProfile::default(),
            particle_start,
            time_shift,
            observation_level,
        }
    }

    pub fn header(&self) -> &EventHeader {
        &self.header
    }

    pub fn trailer(&self) -> &EventTrailer {
        &self.trailer
    }

    pub fn profile(&self) -> &LongProfile {
        &self.profile
    }

    pub fn event_id(&self) -> u32 {
        self.header.event_number
    }

    /// CORSIKA code of the primary.
    pub fn primary_id(&self) -> u32 {
        self.header.particle_id
    }

    /// Primary energy, GeV.
    pub fn energy(&self) -> f32 {
        self.header.energy
    }

    /// Zenith angle of the shower axis, rad.
    pub fn zenith(&self) -> f32 {
        self.header.theta
    }

    /// Geometric time shift applied to emitted particle times, ns.
    pub fn time_shift(&self) -> f64 {
        self.time_shift
    }

    /// The observation level particle iteration selects (1-based).
    pub fn observation_level(&self) -> u32 {
        self.observation_level
    }
}

/// Time for the shower front to travel from its reference height down to
/// the observation level, ns.
///
/// The reference is the first-interaction height, except when the clock
/// started at the margin of the atmosphere (negative `z_first`), in which
/// case it is the starting height from the header or the default
/// atmospheric boundary. For curved geometry the path accounts for the
/// Earth's curvature; a photon primary keeps the first-interaction
/// reference even then.
pub(crate) fn time_shift(header: &EventHeader, observation_level: u32) -> f64 {
    let h_obs = f64::from(header.observation_height[observation_level as usize - 1]);
    let h_first = f64::from(header.z_first.abs());
    let h_boundary = if header.starting_height > 0.0 {
        f64::from(header.starting_height)
    } else {
        ATMOSPHERE_BOUNDARY
    };

    let mut h_reference = if header.z_first < 0.0 { h_boundary } else { h_first };
    let cos_zenith = f64::from(header.theta).cos();

    if header.curved {
        if header.particle_id == PHOTON_ID {
            h_reference = h_first;
        }
        let r_obs = EARTH_RADIUS + h_obs;
        let drop = h_reference - h_obs;
        let path = (r_obs * cos_zenith * r_obs * cos_zenith
            + drop * drop
            + 2.0 * r_obs * drop)
            .sqrt()
            - r_obs * cos_zenith;
        let shift = path / SPEED_OF_LIGHT;
        debug!("Curved geometry time shift to core: {} ns", shift);
        shift
    } else {
        (h_reference - h_obs) / (cos_zenith * SPEED_OF_LIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> EventHeader {
        EventHeader {
            event_number: 1,
            particle_id: 14,
            energy: 1.0e6,
            starting_altitude: 0.0,
            z_first: 1.5e5,
            theta: 0.0,
            phi: 0.0,
            n_observation_levels: 1,
            observation_height: [1.4e5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            curved: false,
            starting_height: 0.0,
        }
    }

    #[test]
    fn vertical_planar_shift_is_height_over_c() {
        let h = header();
        let expected = (1.5e5 - 1.4e5) / SPEED_OF_LIGHT;
        assert!((time_shift(&h, 1) - expected).abs() < 1e-9);
    }

    #[test]
    fn planar_shift_scales_with_inverse_cosine() {
        let mut h = header();
        h.theta = std::f32::consts::FRAC_PI_3; // 60 degrees
        let vertical = (1.5e5 - 1.4e5) / SPEED_OF_LIGHT;
        let shifted = time_shift(&h, 1);
        assert!((shifted - vertical / 0.5).abs() < 1e-3);
    }

    #[test]
    fn negative_z_first_references_the_atmosphere_boundary() {
        let mut h = header();
        h.z_first = -1.5e5;
        let expected = (ATMOSPHERE_BOUNDARY - 1.4e5) / SPEED_OF_LIGHT;
        assert!((time_shift(&h, 1) - expected).abs() < 1e-6);
    }

    #[test]
    fn positive_starting_height_overrides_the_default_boundary() {
        let mut h = header();
        h.z_first = -1.5e5;
        h.starting_height = 2.0e6;
        let expected = (2.0e6 - 1.4e5) / SPEED_OF_LIGHT;
        assert!((time_shift(&h, 1) - expected).abs() < 1e-6);
    }

    #[test]
    fn curved_photon_primary_keeps_first_interaction_reference() {
        // theta = 60 deg, first interaction at 1e5 cm, observation at 1400 m.
        let mut h = header();
        h.particle_id = PHOTON_ID;
        h.curved = true;
        h.theta = std::f32::consts::FRAC_PI_3;
        h.z_first = -1.0e5;

        let h_obs = 1.4e5;
        let h_ref = 1.0e5;
        let cos_zenith = f64::from(h.theta).cos();
        let r_obs = EARTH_RADIUS + h_obs;
        let drop = h_ref - h_obs;
        let expected = ((r_obs * cos_zenith * r_obs * cos_zenith
            + drop * drop
            + 2.0 * r_obs * drop)
            .sqrt()
            - r_obs * cos_zenith)
            / SPEED_OF_LIGHT;

        assert!((time_shift(&h, 1) - expected).abs() < 1e-9);
    }

    #[test]
    fn curved_hadron_references_the_boundary() {
        let mut h = header();
        h.curved = true;
        h.z_first = -1.0e5;
        // A hadron primary with a negative z_first references the
        // atmosphere boundary, so the shift is much larger than the
        // photon's first-interaction path.
        let mut photon = h.clone();
        photon.particle_id = PHOTON_ID;
        assert!(time_shift(&h, 1) > time_shift(&photon, 1));
    }
}
