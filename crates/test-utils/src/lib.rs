//! Test support for the overlay workspace: synthetic GRIB2 messages, weather
//! grids and float assertions. Only ever used as a dev-dependency.

pub mod builder;
pub mod generators;

pub use builder::*;
pub use generators::*;

/// Assert two numbers differ by at most `tolerance`, compared as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected) = ($actual as f64, $expected as f64);
        let tolerance = $tolerance as f64;
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} = {} is not within {} of {}",
            stringify!($actual),
            actual,
            tolerance,
            expected
        );
    }};
}

/// Assert two values with `x`/`y` fields are within `tolerance` on both axes.
#[macro_export]
macro_rules! assert_point_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected) = (&$actual, &$expected);
        $crate::assert_approx_eq!(actual.x, expected.x, $tolerance);
        $crate::assert_approx_eq!(actual.y, expected.y, $tolerance);
    }};
}

/// Assert two slices have equal length and pairwise close values.
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected) = (&$actual, &$expected);
        assert_eq!(actual.len(), expected.len(), "value counts differ");
        for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!(
                ((*a as f64) - (*e as f64)).abs() <= $tolerance as f64,
                "value {} is {}, expected {}",
                i,
                a,
                e
            );
        }
    }};
}
