//! Cascaded second-order IIR sections.
//!
//! Each section is `[b0, b1, b2, a1, a2]` and runs in direct form II:
//!
//! ```text
//! z0 = x - a1*z1 - a2*z2
//! y  = b0*z0 + b1*z1 + b2*z2
//! ```
//!
//! The filter state starts at zero for every call.

/// Filter `data` in place through every section of `sections`, in order.
pub fn apply_sos_cascade(data: &mut [f32], sections: &[[f32; 5]]) {
    for &[b0, b1, b2, a1, a2] in sections {
        let (mut z1, mut z2) = (0.0f32, 0.0f32);
        for x in data.iter_mut() {
            let z0 = *x - a1 * z1 - a2 * z2;
            *x = b0 * z0 + b1 * z1 + b2 * z2;
            z2 = z1;
            z1 = z0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_section_passes_through() {
        let mut data = vec![1.0, -2.0, 3.5, 0.25];
        apply_sos_cascade(&mut data, &[[1.0, 0.0, 0.0, 0.0, 0.0]]);
        assert_eq!(data, vec![1.0, -2.0, 3.5, 0.25]);
    }

    #[test]
    fn one_pole_impulse_response() {
        // y[n] = x[n] + 0.5 y[n-1]
        let mut data = vec![1.0, 0.0, 0.0, 0.0];
        apply_sos_cascade(&mut data, &[[1.0, 0.0, 0.0, -0.5, 0.0]]);
        assert_relative_eq!(data[1], 0.5);
        assert_relative_eq!(data[2], 0.25);
        assert_relative_eq!(data[3], 0.125);
    }

    #[test]
    fn sections_run_in_sequence() {
        // two unit delays
        let delay = [0.0, 1.0, 0.0, 0.0, 0.0];
        let mut data = vec![1.0, 0.0, 0.0, 0.0];
        apply_sos_cascade(&mut data, &[delay, delay]);
        assert_eq!(data, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_input_is_fine() {
        let mut data: Vec<f32> = Vec::new();
        apply_sos_cascade(&mut data, &[[1.0, 1.0, 1.0, 0.1, 0.1]]);
        assert!(data.is_empty());
    }
}
