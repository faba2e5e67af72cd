//! Stress invariants derived from report records.
//!
//! ```rust
//! use ccx_io::postprocess::TensorComponents;
//!
//! // sxx, syy, szz, sxy, sxz, syz as printed in a .dat stress row
//! let stress = TensorComponents::from_report([100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
//! assert!((stress.mises() - 100.0).abs() < 1e-9);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Symmetric stress tensor in Voigt components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TensorComponents {
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
    pub xy: f64,
    pub xz: f64,
    pub yz: f64,
}

/// Principal values sorted as max, mid, min.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalValues {
    pub max: f64,
    pub mid: f64,
    pub min: f64,
}

impl PrincipalValues {
    fn sorted(mut values: [f64; 3]) -> Self {
        values.sort_by(|a, b| b.total_cmp(a));
        Self {
            max: values[0],
            mid: values[1],
            min: values[2],
        }
    }
}

impl TensorComponents {
    /// Builds a tensor from the report's column order
    /// `sxx, syy, szz, sxy, sxz, syz`.
    pub fn from_report(values: [f64; 6]) -> Self {
        Self {
            xx: values[0],
            yy: values[1],
            zz: values[2],
            xy: values[3],
            xz: values[4],
            yz: values[5],
        }
    }

    /// von Mises equivalent stress:
    /// sqrt(0.5 * [(sxx-syy)² + (syy-szz)² + (szz-sxx)² + 6 * (sxy² + sxz² + syz²)])
    pub fn mises(&self) -> f64 {
        let normal = (self.xx - self.yy).powi(2)
            + (self.yy - self.zz).powi(2)
            + (self.zz - self.xx).powi(2);
        let shear = self.xy.powi(2) + self.xz.powi(2) + self.yz.powi(2);
        (0.5 * (normal + 6.0 * shear)).sqrt()
    }

    pub fn hydrostatic(&self) -> f64 {
        (self.xx + self.yy + self.zz) / 3.0
    }

    /// Eigenvalues of the tensor from its invariants (trigonometric
    /// solution of the characteristic cubic).
    pub fn principal(&self) -> PrincipalValues {
        let shear_norm = self.xy.abs() + self.yz.abs() + self.xz.abs();
        if shear_norm < 1e-10 {
            return PrincipalValues::sorted([self.xx, self.yy, self.zz]);
        }

        let i1 = self.xx + self.yy + self.zz;
        let i2 = self.xx * self.yy + self.yy * self.zz + self.zz * self.xx
            - self.xy.powi(2)
            - self.yz.powi(2)
            - self.xz.powi(2);
        let i3 = self.xx * self.yy * self.zz + 2.0 * self.xy * self.yz * self.xz
            - self.xx * self.yz.powi(2)
            - self.yy * self.xz.powi(2)
            - self.zz * self.xy.powi(2);

        let p = i2 - i1.powi(2) / 3.0;
        let q = 2.0 * i1.powi(3) / 27.0 - i1 * i2 / 3.0 + i3;
        if p.abs() < 1e-14 {
            let lambda = i1 / 3.0;
            return PrincipalValues::sorted([lambda; 3]);
        }

        // round-off can push the cosine argument just outside [-1, 1]
        let cosine = ((-q / 2.0) / (-p / 3.0).powf(1.5)).clamp(-1.0, 1.0);
        let theta = cosine.acos();
        let k = 2.0 * (-p / 3.0).sqrt();
        let shift = i1 / 3.0;

        PrincipalValues::sorted([
            k * (theta / 3.0).cos() + shift,
            k * ((theta + 2.0 * PI) / 3.0).cos() + shift,
            k * ((theta + 4.0 * PI) / 3.0).cos() + shift,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniaxial_mises_equals_axial_stress() {
        let stress = TensorComponents::from_report([100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!((stress.mises() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn pure_shear_mises_is_root_three_times_shear() {
        let stress = TensorComponents::from_report([0.0, 0.0, 0.0, 100.0, 0.0, 0.0]);
        assert!((stress.mises() - 3.0_f64.sqrt() * 100.0).abs() < 1e-9);
    }

    #[test]
    fn report_column_order_maps_sxz_before_syz() {
        let stress = TensorComponents::from_report([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(stress.xz, 5.0);
        assert_eq!(stress.yz, 6.0);
    }

    #[test]
    fn principal_values_sum_to_trace() {
        let stress = TensorComponents::from_report([100.0, 50.0, 25.0, 10.0, 2.0, 5.0]);
        let p = stress.principal();
        assert!(p.max >= p.mid && p.mid >= p.min);
        assert!((p.max + p.mid + p.min - 175.0).abs() < 1e-6);
    }

    #[test]
    fn diagonal_tensor_principals_are_sorted_diagonal() {
        let stress = TensorComponents::from_report([-5.0, 20.0, 3.0, 0.0, 0.0, 0.0]);
        let p = stress.principal();
        assert_eq!((p.max, p.mid, p.min), (20.0, 3.0, -5.0));
        assert!((stress.hydrostatic() - 6.0).abs() < 1e-12);
    }
}
