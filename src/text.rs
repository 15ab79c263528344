//! Number formatting shared by the fixed-column text writers.
//!
//! The SPH executable was historically fed files whose floats were printed in
//! shortest round-trip form with a mandatory fractional part (`10.0`, `0.5`)
//! and two-digit signed exponents outside `[1e-4, 1e16)` (`1e-05`, `1e+16`).

pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if value == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let mut s = format!("{}", value);
        if !s.contains('.') {
            s.push_str(".0");
        }
        return s;
    }

    // 指数表記
    let s = format!("{:e}", value);
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_values_keep_fraction() {
        assert_eq!(format_float(10.0), "10.0");
        assert_eq!(format_float(-3.0), "-3.0");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_shortest_round_trip() {
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(1234.25), "1234.25");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_exponent_form() {
        assert_eq!(format_float(1e-5), "1e-05");
        assert_eq!(format_float(2.5e16), "2.5e+16");
        assert_eq!(format_float(1e-4), "0.0001");
    }
}
