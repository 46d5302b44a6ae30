use std::ffi::CString;

use leptess::tesseract::TessApi;
use opencv::imgproc::{cvt_color, COLOR_BGR2GRAY};
use opencv::prelude::{Mat, MatTraitConst, MatTraitConstManual};
use plate_canon::{CollaboratorError, FragmentReader, RawFragment};
use tracing::{debug, info};

use super::PlateCrop;
use crate::config::OcrConfig;
use crate::error::DetectorError;

const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// One fragment per non-empty line of Tesseract output, all sharing the
/// page confidence.
pub fn fragments_from_text(text: &str, confidence: f32) -> Vec<RawFragment> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| RawFragment::new(line, confidence))
        .collect()
}

/// Tesseract OCR over plate crops.
pub struct DnnOcrReader {
    ocr: TessApi,
}

impl DnnOcrReader {
    pub fn new(config: &OcrConfig) -> Result<Self, DetectorError> {
        let data_path = config.data_path.to_string_lossy();
        let mut api = TessApi::new(Some(data_path.as_ref()), &config.language)
            .map_err(DetectorError::tesseract)?;

        set_variable(&mut api, "tessedit_char_whitelist", CHAR_WHITELIST)?;
        set_variable(
            &mut api,
            "tessedit_pageseg_mode",
            &config.page_seg_mode.to_string(),
        )?;
        info!(
            data_path = %data_path,
            language = %config.language,
            page_seg_mode = config.page_seg_mode,
            "tesseract ready"
        );

        Ok(Self { ocr: api })
    }

    pub fn read_image(&mut self, image: &Mat) -> Result<Vec<RawFragment>, DetectorError> {
        if image.empty() {
            return Ok(Vec::new());
        }
        let mut grey = Mat::default();
        cvt_color(image, &mut grey, COLOR_BGR2GRAY, 0)?;

        let cols = grey.cols();
        let rows = grey.rows();
        self.ocr
            .raw
            .set_image(grey.data_bytes()?, cols, rows, 1, cols)
            .map_err(DetectorError::tesseract)?;
        let text = self.ocr.get_utf8_text().map_err(DetectorError::tesseract)?;
        let confidence = self.ocr.mean_text_conf() as f32 / 100.0;

        let fragments = fragments_from_text(&text, confidence);
        debug!(text = %text.trim(), confidence, fragments = fragments.len(), "ocr");
        Ok(fragments)
    }
}

fn set_variable(api: &mut TessApi, name: &str, value: &str) -> Result<(), DetectorError> {
    let name = CString::new(name).map_err(DetectorError::tesseract)?;
    let value = CString::new(value).map_err(DetectorError::tesseract)?;
    api.raw
        .set_variable(&name, &value)
        .map_err(DetectorError::tesseract)
}

unsafe impl Send for DnnOcrReader {}
unsafe impl Sync for DnnOcrReader {}

impl FragmentReader<PlateCrop> for DnnOcrReader {
    fn read(&mut self, crop: &PlateCrop) -> Result<Vec<RawFragment>, CollaboratorError> {
        self.read_image(&crop.image)
            .map_err(DetectorError::into_ocr)
    }
}
