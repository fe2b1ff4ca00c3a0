//! GRIB2 parameter lookup tables.
//!
//! Maps `(discipline, category, number)` triples from Sections 0 and 4 to
//! short parameter names, and identifies the three fields the overlay
//! needs.

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// A field the overlay decoder collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetParameter {
    /// Pressure reduced to mean sea level
    Prmsl,
    /// U-component of wind (eastward)
    Ugrd,
    /// V-component of wind (northward)
    Vgrd,
}

impl TargetParameter {
    pub const ALL: [TargetParameter; 3] = [
        TargetParameter::Prmsl,
        TargetParameter::Ugrd,
        TargetParameter::Vgrd,
    ];

    /// Match a parameter triple against the accepted targets.
    pub fn from_key(key: ParamKey) -> Option<Self> {
        match key {
            (0, 3, 1) => Some(TargetParameter::Prmsl),
            (0, 2, 2) => Some(TargetParameter::Ugrd),
            (0, 2, 3) => Some(TargetParameter::Vgrd),
            _ => None,
        }
    }

    pub fn key(self) -> ParamKey {
        match self {
            TargetParameter::Prmsl => (0, 3, 1),
            TargetParameter::Ugrd => (0, 2, 2),
            TargetParameter::Vgrd => (0, 2, 3),
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            TargetParameter::Prmsl => "PRMSL",
            TargetParameter::Ugrd => "UGRD",
            TargetParameter::Vgrd => "VGRD",
        }
    }

    /// Divisor from the GRIB2 unit to the display unit (Pa to hPa for pressure).
    pub fn display_divisor(self) -> f32 {
        match self {
            TargetParameter::Prmsl => 100.0,
            TargetParameter::Ugrd | TargetParameter::Vgrd => 1.0,
        }
    }
}

/// Get parameter short name for logging.
pub fn parameter_short_name(key: ParamKey) -> String {
    if let Some(target) = TargetParameter::from_key(key) {
        return target.short_name().to_string();
    }

    let name = match key {
        // Category 0: Temperature
        (0, 0, 0) => "TMP",
        (0, 0, 6) => "DPT",
        // Category 1: Moisture
        (0, 1, 1) => "RH",
        (0, 1, 8) => "APCP",
        // Category 2: Momentum
        (0, 2, 0) => "WDIR",
        (0, 2, 1) => "WIND",
        (0, 2, 22) => "GUST",
        // Category 3: Mass
        (0, 3, 0) => "PRES",
        (0, 3, 5) => "HGT",
        (0, 3, 192) => "MSLET",
        // Category 6: Cloud
        (0, 6, 1) => "TCDC",
        _ => {
            let (discipline, category, number) = key;
            return format!("P{}_{}_{}", discipline, category, number);
        }
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_round_trip() {
        for target in TargetParameter::ALL {
            assert_eq!(TargetParameter::from_key(target.key()), Some(target));
        }
    }

    #[test]
    fn test_non_target_parameters() {
        assert_eq!(TargetParameter::from_key((0, 3, 0)), None);
        assert_eq!(TargetParameter::from_key((10, 2, 2)), None);
        assert_eq!(parameter_short_name((0, 3, 0)), "PRES");
        assert_eq!(parameter_short_name((0, 3, 1)), "PRMSL");
        assert_eq!(parameter_short_name((209, 1, 0)), "P209_1_0");
    }
}
