mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3, Vector4};

    use crate::metric::Metric;

    #[test]
    fn minkowski_dot_products() {
        let g = Metric::minkowski();
        let a = Vector4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vector4::new(2.0, 0.0, 1.0, 1.0);

        // g(a,b) = a·b (spatial) − a⁰b⁰
        assert_relative_eq!(g.dot4(&a, &b), 2.0 + 3.0 - 4.0);
        assert_relative_eq!(g.dot3(&a, &b), 5.0);
        assert_relative_eq!(g.ndot(&a), -4.0);
    }

    #[test]
    fn normalize_null_zeroes_the_interval() {
        let g = Metric::minkowski();
        let mut k = Vector4::new(3.0, 4.0, 0.0, 1.0);

        g.normalize_null(&mut k);

        assert_relative_eq!(k[3], 5.0);
        assert_relative_eq!(g.dot4(&k, &k), 0.0, epsilon = 1e-12);
        assert!(g.null_residual(&k) < 1e-12);
    }

    #[test]
    fn curved_radial_metric_stretches_radial_distance() {
        // γᵢⱼ = δᵢⱼ + (X²−1) x̂ᵢx̂ⱼ with x̂ = x̂-axis
        let x_metric: f64 = 2.0;
        let mut gamma = Matrix3::identity();
        gamma[(0, 0)] += x_metric * x_metric - 1.0;
        let g = Metric::new(0.5, Vector3::zeros(), gamma);

        let radial = Vector4::new(1.0, 0.0, 0.0, 0.0);
        let tangent = Vector4::new(0.0, 1.0, 0.0, 0.0);

        assert_relative_eq!(g.dot4(&radial, &radial), x_metric * x_metric);
        assert_relative_eq!(g.dot4(&tangent, &tangent), 1.0);

        // time-time component is −α²
        let t = Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(g.dot4(&t, &t), -0.25);
    }
}
