pub const MPS_TO_MPH: f64 = 2.236_936;

/// Altitude at which the correction factor is exactly 1.0.
pub const REFERENCE_ALTITUDE_FT: f64 = 7000.0;

/// `(altitude ft, factor)` anchors, ascending. Factor is the ratio of terminal
/// velocity at that altitude to terminal velocity at 7000 ft in the standard
/// atmosphere.
pub const CALIBRATION_TABLE: [(f64, f64); 21] = [
    (0.0, 0.9004),
    (1000.0, 0.9137),
    (2000.0, 0.9273),
    (3000.0, 0.9412),
    (4000.0, 0.9554),
    (5000.0, 0.9699),
    (6000.0, 0.9848),
    (7000.0, 1.0),
    (8000.0, 1.0155),
    (9000.0, 1.0315),
    (10000.0, 1.0477),
    (11000.0, 1.0644),
    (12000.0, 1.0814),
    (13000.0, 1.0989),
    (14000.0, 1.1167),
    (15000.0, 1.1350),
    (16000.0, 1.1538),
    (17000.0, 1.1730),
    (18000.0, 1.1926),
    (19000.0, 1.2128),
    (20000.0, 1.2335),
];

/// Interpolated correction factor, clamped to the table ends.
pub fn correction_factor(altitude_ft: f64) -> f64 {
    let table = &CALIBRATION_TABLE;
    let (first, last) = (table[0], table[table.len() - 1]);
    if altitude_ft.is_nan() || altitude_ft <= first.0 {
        return first.1;
    }
    if altitude_ft >= last.0 {
        return last.1;
    }

    let hi = table.partition_point(|&(alt, _)| alt <= altitude_ft);
    let (alt_lo, factor_lo) = table[hi - 1];
    let (alt_hi, factor_hi) = table[hi];
    let fraction = (altitude_ft - alt_lo) / (alt_hi - alt_lo);
    factor_lo + (factor_hi - factor_lo) * fraction
}

/// Density-corrected fall rate in mph for a raw vertical speed (m/s, either
/// sign) measured at `altitude_ft`.
pub fn normalize_fall_rate(raw_vertical_speed_mps: f64, altitude_ft: f64) -> f64 {
    raw_vertical_speed_mps.abs() * MPS_TO_MPH / correction_factor(altitude_ft)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_ascending() {
        for pair in CALIBRATION_TABLE.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn test_reference_altitude_is_unchanged() {
        let raw = -53.6;
        let normalized = normalize_fall_rate(raw, REFERENCE_ALTITUDE_FT);
        assert!((normalized - 53.6 * MPS_TO_MPH).abs() < 1e-9);
    }

    #[test]
    fn test_between_anchors_lies_between_bracketing_values() {
        let raw = 60.0;
        let at_12k = normalize_fall_rate(raw, 12000.0);
        let at_13k = normalize_fall_rate(raw, 13000.0);
        let between = normalize_fall_rate(raw, 12500.0);
        assert!(between < at_12k);
        assert!(between > at_13k);
        assert!((correction_factor(12500.0) - (1.0814 + 1.0989) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamps_outside_table() {
        assert_eq!(correction_factor(-500.0), 0.9004);
        assert_eq!(correction_factor(35000.0), 1.2335);
        assert_eq!(correction_factor(20000.0), 1.2335);
    }

    #[test]
    fn test_sign_is_ignored() {
        assert_eq!(normalize_fall_rate(-50.0, 9000.0), normalize_fall_rate(50.0, 9000.0));
    }
}
