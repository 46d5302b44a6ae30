use opencv::core::{count_non_zero, in_range, Rect, Scalar};
use opencv::imgproc::{cvt_color, COLOR_BGR2HSV};
use opencv::prelude::{Mat, MatTraitConst};
use plate_canon::{EraEstimator, PlateEra};
use tracing::{trace, warn};

use super::PlateCrop;
use crate::config::EraConfig;
use crate::error::DetectorError;

/// Current-format plates carry a blue header strip. The top of the crop is
/// tested for enough blue pixels.
pub struct BlueStripEstimator {
    config: EraConfig,
}

impl BlueStripEstimator {
    pub fn new(config: EraConfig) -> Self {
        Self { config }
    }

    /// Share of blue pixels in the top strip. An empty crop has none.
    pub fn blue_ratio(&self, image: &Mat) -> Result<f64, DetectorError> {
        let cols = image.cols();
        let strip_rows = (image.rows() as f64 * self.config.top_fraction) as i32;
        if image.empty() || cols == 0 || strip_rows == 0 {
            return Ok(0.0);
        }

        let top_strip = image.apply_1(Rect::new(0, 0, cols, strip_rows))?;
        let mut hsv = Mat::default();
        cvt_color(&top_strip, &mut hsv, COLOR_BGR2HSV, 0)?;

        let [h, s, v] = self.config.hsv_lower;
        let lower = Scalar::new(h, s, v, 0.0);
        let [h, s, v] = self.config.hsv_upper;
        let upper = Scalar::new(h, s, v, 0.0);
        let mut mask = Mat::default();
        in_range(&hsv, &lower, &upper, &mut mask)?;

        let blue = count_non_zero(&mask)?;
        Ok(blue as f64 / (strip_rows as f64 * cols as f64))
    }
}

impl EraEstimator<PlateCrop> for BlueStripEstimator {
    fn estimate(&self, crop: &PlateCrop) -> PlateEra {
        match self.blue_ratio(&crop.image) {
            Ok(ratio) => {
                trace!(ratio, "blue strip ratio");
                PlateEra::from(ratio > self.config.min_ratio)
            }
            Err(e) => {
                warn!(error = %e, "blue strip test failed, assuming legacy plate");
                PlateEra::Legacy
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use opencv::core::{vconcat2, CV_8UC3};

    use super::*;

    const BLUE: (f64, f64, f64) = (255.0, 0.0, 0.0);
    const WHITE: (f64, f64, f64) = (255.0, 255.0, 255.0);

    fn solid(rows: i32, (b, g, r): (f64, f64, f64)) -> Mat {
        Mat::new_rows_cols_with_default(rows, 60, CV_8UC3, Scalar::new(b, g, r, 0.0)).unwrap()
    }

    fn crop(image: Mat) -> PlateCrop {
        let bbox = Rect::new(0, 0, image.cols(), image.rows());
        PlateCrop { image, bbox }
    }

    #[test]
    fn blue_header_means_current_plate() {
        let mut image = Mat::default();
        vconcat2(&solid(4, BLUE), &solid(96, WHITE), &mut image).unwrap();

        let estimator = BlueStripEstimator::new(EraConfig::default());
        let ratio = estimator.blue_ratio(&image).unwrap();
        assert!((ratio - 4.0 / 25.0).abs() < 1e-9);
        assert_eq!(estimator.estimate(&crop(image)), PlateEra::Current);
    }

    #[test]
    fn white_plate_is_legacy() {
        let estimator = BlueStripEstimator::new(EraConfig::default());
        assert_eq!(estimator.blue_ratio(&solid(40, WHITE)).unwrap(), 0.0);
        assert_eq!(estimator.estimate(&crop(solid(40, WHITE))), PlateEra::Legacy);
    }

    #[test]
    fn blue_below_the_strip_is_ignored() {
        let mut image = Mat::default();
        vconcat2(&solid(30, WHITE), &solid(70, BLUE), &mut image).unwrap();

        let estimator = BlueStripEstimator::new(EraConfig::default());
        assert_eq!(estimator.estimate(&crop(image)), PlateEra::Legacy);
    }

    #[test]
    fn tiny_and_empty_crops_are_legacy() {
        let estimator = BlueStripEstimator::new(EraConfig::default());
        assert_eq!(estimator.blue_ratio(&Mat::default()).unwrap(), 0.0);
        assert_eq!(estimator.estimate(&crop(solid(3, BLUE))), PlateEra::Legacy);
    }
}
