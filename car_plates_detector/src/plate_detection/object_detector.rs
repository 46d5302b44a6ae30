use opencv::core::{Rect, Scalar, Size, Vector, CV_32F};
use opencv::dnn::{
    blob_from_image, nms_boxes, read_net_from_onnx, Net, DNN_BACKEND_CUDA, DNN_BACKEND_OPENCV,
    DNN_TARGET_CPU, DNN_TARGET_CUDA,
};
use opencv::prelude::{Mat, MatTraitConst, NetTrait, NetTraitConst};
use plate_canon::{CollaboratorError, PlateDetector};
use tracing::{debug, info};

use super::PlateCrop;
use crate::config::PlateModelConfig;
use crate::error::DetectorError;

const YOLO_V5_STRIDES: [i32; 3] = [8, 16, 32];
const YOLO_V5_ANCHORS: i32 = 3;

/// Number of predictions a YOLOv5 head emits for a square input.
pub fn yolo_v5_rows(input_size: i32) -> i32 {
    YOLO_V5_STRIDES
        .iter()
        .map(|stride| YOLO_V5_ANCHORS * (input_size / stride).pow(2))
        .sum()
}

/// Intersection of `rect` with a `cols` x `rows` frame, `None` when empty.
pub fn clamp_to_frame(rect: Rect, cols: i32, rows: i32) -> Option<Rect> {
    let x1 = rect.x.max(0);
    let y1 = rect.y.max(0);
    let x2 = (rect.x + rect.width).min(cols);
    let y2 = (rect.y + rect.height).min(rows);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}

/// YOLOv5 plate detector on the OpenCV DNN module.
pub struct ObjectDetector {
    classifier: Net,
    config: PlateModelConfig,
}

impl ObjectDetector {
    pub fn plate_detector(config: &PlateModelConfig) -> Result<Self, DetectorError> {
        let mut classifier = read_net_from_onnx(&config.model.to_string_lossy())?;

        if config.use_gpu {
            classifier.set_preferable_backend(DNN_BACKEND_CUDA)?;
            classifier.set_preferable_target(DNN_TARGET_CUDA)?;
        } else {
            classifier.set_preferable_backend(DNN_BACKEND_OPENCV)?;
            classifier.set_preferable_target(DNN_TARGET_CPU)?;
        }
        info!(
            model = %config.model.display(),
            gpu = config.use_gpu,
            input_size = config.input_size,
            "plate detector loaded"
        );

        Ok(ObjectDetector {
            classifier,
            config: config.clone(),
        })
    }

    /// Plate boxes in frame coordinates, after non-maximum suppression.
    pub fn boxes(&mut self, image: &Mat) -> Result<Vec<Rect>, DetectorError> {
        let input_size = self.config.input_size;
        let blob = blob_from_image(
            image,
            1.0 / 255.0,
            Size::new(input_size, input_size),
            Scalar::default(),
            true,
            false,
            CV_32F,
        )?;

        self.classifier
            .set_input(&blob, "", 1.0, Scalar::default())?;
        let output_names = self.classifier.get_unconnected_out_layers_names()?;
        let mut output_values = Vector::<Mat>::default();
        self.classifier.forward(&mut output_values, &output_names)?;

        self.post_process(image.rows(), image.cols(), &output_values)
    }

    fn post_process(
        &self,
        img_rows: i32,
        img_cols: i32,
        outputs: &Vector<Mat>,
    ) -> Result<Vec<Rect>, DetectorError> {
        let mut confidences = Vector::<f32>::default();
        let mut boxes = Vector::<Rect>::default();

        let x_factor = img_cols as f32 / self.config.input_size as f32;
        let y_factor = img_rows as f32 / self.config.input_size as f32;

        // each prediction row is `cx, cy, w, h, objectness, class score`
        let rows = yolo_v5_rows(self.config.input_size);
        for data in outputs {
            for j in 0..rows {
                let confidence: f32 = *data.at_3d(0, j, 4)?;
                if confidence <= self.config.confidence_threshold {
                    continue;
                }
                let class_score: f32 = *data.at_3d(0, j, 5)?;
                if class_score <= self.config.class_threshold {
                    continue;
                }
                let cx: f32 = *data.at_3d(0, j, 0)?;
                let cy: f32 = *data.at_3d(0, j, 1)?;
                let w: f32 = *data.at_3d(0, j, 2)?;
                let h: f32 = *data.at_3d(0, j, 3)?;
                let left = (cx - 0.5 * w) * x_factor;
                let top = (cy - 0.5 * h) * y_factor;

                confidences.push(confidence);
                boxes.push(Rect::new(
                    left as i32,
                    top as i32,
                    (w * x_factor) as i32,
                    (h * y_factor) as i32,
                ));
            }
        }

        let mut indices = Vector::<i32>::default();
        nms_boxes(
            &boxes,
            &confidences,
            self.config.nms_score_threshold,
            self.config.nms_threshold,
            &mut indices,
            1.0,
            0,
        )?;

        let mut output = Vec::with_capacity(indices.len());
        for i in indices {
            output.push(boxes.get(i as usize)?);
        }
        debug!(candidates = boxes.len(), plates = output.len(), "plate boxes");
        Ok(output)
    }

    /// Detected plates, each copied out of the frame into its own image.
    pub fn crops(&mut self, image: &Mat) -> Result<Vec<PlateCrop>, DetectorError> {
        let mut crops = Vec::new();
        for rect in self.boxes(image)? {
            let Some(bbox) = clamp_to_frame(rect, image.cols(), image.rows()) else {
                continue;
            };
            // Make it contiguous
            let cropped = image.apply_1(bbox)?.try_clone()?;
            crops.push(PlateCrop {
                image: cropped,
                bbox,
            });
        }
        Ok(crops)
    }
}

unsafe impl Send for ObjectDetector {}
unsafe impl Sync for ObjectDetector {}

impl PlateDetector<Mat> for ObjectDetector {
    type Crop = PlateCrop;

    fn detect(&mut self, frame: &Mat) -> Result<Vec<PlateCrop>, CollaboratorError> {
        self.crops(frame).map_err(DetectorError::into_detector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yolo_rows_match_the_exported_head() {
        assert_eq!(yolo_v5_rows(640), 25200);
        assert_eq!(yolo_v5_rows(320), 6300);
    }

    #[test]
    fn boxes_are_clamped_to_the_frame() {
        assert_eq!(
            clamp_to_frame(Rect::new(-5, -5, 20, 10), 100, 50),
            Some(Rect::new(0, 0, 15, 5))
        );
        assert_eq!(
            clamp_to_frame(Rect::new(90, 40, 20, 20), 100, 50),
            Some(Rect::new(90, 40, 10, 10))
        );
        assert_eq!(
            clamp_to_frame(Rect::new(10, 10, 30, 5), 100, 50),
            Some(Rect::new(10, 10, 30, 5))
        );
    }

    #[test]
    fn boxes_outside_the_frame_vanish() {
        assert_eq!(clamp_to_frame(Rect::new(120, 10, 20, 5), 100, 50), None);
        assert_eq!(clamp_to_frame(Rect::new(10, 10, 0, 5), 100, 50), None);
        assert_eq!(clamp_to_frame(Rect::new(-30, 10, 20, 5), 100, 50), None);
    }

    #[test]
    fn missing_model_fails_to_load() {
        let config = PlateModelConfig {
            model: "does/not/exist.onnx".into(),
            ..PlateModelConfig::default()
        };
        assert!(ObjectDetector::plate_detector(&config).is_err());
    }
}
