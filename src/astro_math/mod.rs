use std::f64::consts::PI;

pub type Degrees = f64;
pub type Radians = f64;

pub fn deg_to_rad(degrees: Degrees) -> Radians {
    PI * degrees / 180.
}

pub fn rad_to_deg(rad: Radians) -> Degrees {
    180. * rad / PI
}

pub fn modulo(val: f64, base: f64) -> f64 {
    ((val % base) + base) % base
}

/// A horizontal coordinate pair (altitude, azimuth) in degrees
#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub struct AngularPosition {
    pub alt: Degrees,
    pub az: Degrees,
}

impl AngularPosition {
    pub fn from_alt_az(alt: Degrees, az: Degrees) -> Self {
        Self {
            alt,
            az: modulo(az, 360.),
        }
    }

    /// The dome only rotates in azimuth, so its aperture is modelled on the horizon
    pub fn dome(az: Degrees) -> Self {
        Self::from_alt_az(0., az)
    }

    /// Great circle distance to another position.
    /// Uses the Vincenty form which stays well conditioned for small and antipodal separations.
    pub fn separation(&self, other: &AngularPosition) -> Degrees {
        let (alt1, alt2) = (deg_to_rad(self.alt), deg_to_rad(other.alt));
        let d_az = deg_to_rad(other.az - self.az);

        let y = ((alt2.cos() * d_az.sin()).powi(2)
            + (alt1.cos() * alt2.sin() - alt1.sin() * alt2.cos() * d_az.cos()).powi(2))
        .sqrt();
        let x = alt1.sin() * alt2.sin() + alt1.cos() * alt2.cos() * d_az.cos();

        rad_to_deg(y.atan2(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deg_to_rad() {
        assert_eq!(deg_to_rad(0.), 0.);
        assert_float_relative_eq!(deg_to_rad(55.), 0.9599311);
        assert_float_relative_eq!(deg_to_rad(-10.), -0.1745329);
    }

    #[test]
    fn test_rad_to_deg() {
        assert_eq!(rad_to_deg(0.), 0.);
        assert_float_relative_eq!(rad_to_deg(1.), 57.29578);
        assert_float_relative_eq!(rad_to_deg(-8.), -458.3662);
    }

    #[test]
    fn test_modulo() {
        assert_eq!(modulo(std::f64::consts::TAU, std::f64::consts::PI), 0.);
        assert_eq!(modulo(-365., 360.), 355.);
        assert_eq!(modulo(720., 360.), 0.);
    }

    #[test]
    fn test_dome_position_wraps_azimuth() {
        assert_float_absolute_eq!(AngularPosition::dome(-10.).az, 350., 1E-9);
        assert_float_absolute_eq!(AngularPosition::dome(370.).az, 10., 1E-9);
    }

    #[test]
    fn test_separation_on_horizon() {
        let a = AngularPosition::dome(10.);
        assert_float_absolute_eq!(a.separation(&AngularPosition::dome(90.)), 80., 1E-9);
        assert_float_absolute_eq!(a.separation(&AngularPosition::dome(350.)), 20., 1E-9);
        assert_float_absolute_eq!(a.separation(&AngularPosition::dome(190.)), 180., 1E-9);
        assert_float_absolute_eq!(a.separation(&a), 0., 1E-9);
    }

    #[test]
    fn test_separation_with_altitude() {
        let zenith = AngularPosition::from_alt_az(90., 0.);
        assert_float_absolute_eq!(
            zenith.separation(&AngularPosition::from_alt_az(30., 123.)),
            60.,
            1E-9
        );

        // Azimuth differences shrink towards the pole
        let a = AngularPosition::from_alt_az(60., 0.);
        let b = AngularPosition::from_alt_az(60., 90.);
        assert_float_absolute_eq!(a.separation(&b), 41.4096221, 1E-6);
        assert_float_absolute_eq!(a.separation(&b), b.separation(&a), 1E-12);
    }
}
