use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use tokio::sync::{Mutex, RwLock};

use crate::app::config::DetectorConfig;
use crate::media::AssetLocation;
use crate::pipeline::{
    build_detected_objects, preprocess, Detections, FrameSize, GraphModel, LabelMap, ModelLoader,
    OutputLayout,
};
use crate::{Error, Result};

/// Loads a detection graph and its label mapping, then turns images into
/// labelled pixel-space boxes.
///
/// Both assets load independently (and may load concurrently); `detect`
/// refuses to run until both are present. Overlapping `detect` calls are
/// serialized on the model.
pub struct Detector {
    model_location: AssetLocation,
    classes_location: AssetLocation,
    threshold: f32,
    layout: OutputLayout,
    loader: Box<dyn ModelLoader>,
    model: Mutex<Option<Box<dyn GraphModel>>>,
    classes: RwLock<Option<Arc<LabelMap>>>,
    model_loaded: AtomicBool,
    classes_loaded: AtomicBool,
}

impl Detector {
    #[cfg(feature = "tflite")]
    pub fn new(config: &DetectorConfig) -> Self {
        let loader = crate::pipeline::TfLiteLoader::new(config.num_threads);
        Self::with_loader(config, Box::new(loader))
    }

    pub fn with_loader(config: &DetectorConfig, loader: Box<dyn ModelLoader>) -> Self {
        Self {
            model_location: AssetLocation::parse(&config.model_url),
            classes_location: AssetLocation::parse(&config.classes_url),
            threshold: config.threshold,
            layout: config.outputs,
            loader,
            model: Mutex::new(None),
            classes: RwLock::new(None),
            model_loaded: AtomicBool::new(false),
            classes_loaded: AtomicBool::new(false),
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded.load(Ordering::Acquire)
    }

    pub fn is_classes_loaded(&self) -> bool {
        self.classes_loaded.load(Ordering::Acquire)
    }

    /// Fetches and deserializes the model. A failure is logged and returned;
    /// whatever model was loaded before stays in place. Not retried.
    pub async fn load_model(&self) -> Result<()> {
        match self.fetch_model().await {
            Ok(model) => {
                *self.model.lock().await = Some(model);
                self.model_loaded.store(true, Ordering::Release);
                tracing::info!(location = %self.model_location, "Model loaded successfully");
                Ok(())
            }
            Err(err) => {
                tracing::error!(location = %self.model_location, "Error loading model: {}", err);
                Err(err)
            }
        }
    }

    async fn fetch_model(&self) -> Result<Box<dyn GraphModel>> {
        let bytes = self.model_location.fetch().await?;
        tracing::debug!(len = bytes.len(), "deserializing model");
        self.loader.load(bytes)
    }

    /// Fetches and parses the label mapping, with the same failure handling as
    /// [`Detector::load_model`].
    pub async fn load_classes(&self) -> Result<()> {
        match self.fetch_classes().await {
            Ok(labels) => {
                let count = labels.len();
                *self.classes.write().await = Some(Arc::new(labels));
                self.classes_loaded.store(true, Ordering::Release);
                tracing::info!(location = %self.classes_location, count, "Classes loaded successfully");
                Ok(())
            }
            Err(err) => {
                tracing::error!(location = %self.classes_location, "Error loading classes: {}", err);
                Err(err)
            }
        }
    }

    async fn fetch_classes(&self) -> Result<LabelMap> {
        let bytes = self.classes_location.fetch().await?;
        LabelMap::from_location_bytes(&self.classes_location, &bytes)
    }

    /// Loads model and classes concurrently. Both loads always run to
    /// completion; the first failure is returned.
    pub async fn load_all(&self) -> Result<()> {
        let (model, classes) = futures::join!(self.load_model(), self.load_classes());
        model.and(classes)
    }

    /// Detects with the configured threshold.
    pub async fn detect(&self, image: &DynamicImage) -> Result<Detections> {
        self.detect_with_threshold(image, self.threshold).await
    }

    /// Returns [`Error::NotReady`] without running anything unless both assets
    /// are loaded. A zero-length result means the model found nothing above
    /// `threshold` (or produced scores in an unusable shape).
    pub async fn detect_with_threshold(
        &self,
        image: &DynamicImage,
        threshold: f32,
    ) -> Result<Detections> {
        let not_ready = || Error::NotReady {
            model_loaded: self.is_model_loaded(),
            classes_loaded: self.is_classes_loaded(),
        };
        if !self.is_model_loaded() {
            tracing::error!("Model not yet loaded");
            return Err(not_ready());
        }
        if !self.is_classes_loaded() {
            tracing::error!("Classes not yet loaded");
            return Err(not_ready());
        }

        let labels = self.classes.read().await.clone().ok_or_else(not_ready)?;

        let outputs = {
            let mut model = self.model.lock().await;
            let model = model.as_mut().ok_or_else(not_ready)?;
            let input = preprocess(image, model.input_size());
            tracing::debug!(shape = ?input.shape, "running inference");
            model.execute(&input).map_err(|err| {
                tracing::error!("Error running model: {}", err);
                err
            })?
        };

        let raw = self.layout.select(&outputs).map_err(|err| {
            tracing::error!("Unexpected model outputs: {}", err);
            err
        })?;
        let (width, height) = image.dimensions();
        let detections =
            build_detected_objects(&raw, &labels, threshold, FrameSize { width, height });
        tracing::debug!(count = detections.len(), threshold, "detection finished");
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{InputTensor, OutputTensor};
    use std::path::PathBuf;

    const MODEL_BYTES: &[u8] = b"fake-graph";

    struct FakeModel {
        outputs: Vec<OutputTensor>,
        input_size: Option<(u32, u32)>,
        seen: Arc<std::sync::Mutex<Vec<[usize; 4]>>>,
    }

    impl GraphModel for FakeModel {
        fn execute(&mut self, input: &InputTensor) -> Result<Vec<OutputTensor>> {
            self.seen.lock().unwrap().push(input.shape);
            Ok(self.outputs.clone())
        }

        fn input_size(&self) -> Option<(u32, u32)> {
            self.input_size
        }
    }

    struct FakeLoader {
        outputs: Vec<OutputTensor>,
        input_size: Option<(u32, u32)>,
        seen: Arc<std::sync::Mutex<Vec<[usize; 4]>>>,
    }

    impl FakeLoader {
        fn new(outputs: Vec<OutputTensor>) -> Self {
            Self {
                outputs,
                input_size: None,
                seen: Arc::default(),
            }
        }
    }

    impl ModelLoader for FakeLoader {
        fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn GraphModel>> {
            if bytes != MODEL_BYTES {
                return Err(Error::Model("not a graph".to_string()));
            }
            Ok(Box::new(FakeModel {
                outputs: self.outputs.clone(),
                input_size: self.input_size,
                seen: self.seen.clone(),
            }))
        }
    }

    // classes, scores, 3 unused outputs, boxes
    fn tfjs_outputs(scores: Vec<f32>) -> Vec<OutputTensor> {
        let n = scores.len();
        let unused = OutputTensor::new(vec![1], vec![0.0]);
        vec![
            OutputTensor::new(vec![1, n], (0..n).map(|i| i as f32).collect()),
            OutputTensor::new(vec![1, n], scores),
            unused.clone(),
            unused.clone(),
            unused,
            OutputTensor::new(
                vec![1, n, 4],
                (0..n).flat_map(|_| [0.1, 0.2, 0.5, 0.6]).collect(),
            ),
        ]
    }

    fn write_asset(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("objdet-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn detector(tag: &str, loader: FakeLoader) -> Detector {
        let model = write_asset(&format!("{}-model.bin", tag), MODEL_BYTES);
        let classes = write_asset(
            &format!("{}-classes.json", tag),
            br#"{"0": "cat", "1": "dog", "2": "bird"}"#,
        );
        let mut config = DetectorConfig::new(
            model.to_string_lossy().into_owned(),
            classes.to_string_lossy().into_owned(),
        );
        config.outputs = OutputLayout::default();
        Detector::with_loader(&config, Box::new(loader))
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
    }

    #[tokio::test]
    async fn test_not_ready_before_load() {
        let det = detector("unloaded", FakeLoader::new(tfjs_outputs(vec![0.9])));
        assert!(!det.is_model_loaded());
        assert!(!det.is_classes_loaded());
        let err = det.detect(&blank(10, 10)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotReady { model_loaded: false, classes_loaded: false }
        ));
    }

    #[tokio::test]
    async fn test_not_ready_with_only_classes() {
        let det = detector("classes-only", FakeLoader::new(tfjs_outputs(vec![0.9])));
        det.load_classes().await.unwrap();
        assert!(det.is_classes_loaded());
        let err = det.detect(&blank(10, 10)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotReady { model_loaded: false, classes_loaded: true }
        ));
    }

    #[tokio::test]
    async fn test_detect_cat_dog_bird() {
        let det = detector("scenario", FakeLoader::new(tfjs_outputs(vec![0.9, 0.3, 0.6])));
        det.load_all().await.unwrap();
        assert!(det.is_model_loaded());
        assert!(det.is_classes_loaded());

        let dets = det.detect(&blank(200, 100)).await.unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class, "cat");
        assert_eq!(dets[1].class, "bird");
        assert_eq!(dets[1].score_text(), "0.6000");
        // [minY 0.1, minX 0.2, maxY 0.5, maxX 0.6] on 200x100
        let [x, y, w, h] = dets[0].bbox;
        assert!((x - 40.0).abs() < 1e-4);
        assert!((y - 10.0).abs() < 1e-4);
        assert!((w - 80.0).abs() < 1e-4);
        assert!((h - 40.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_explicit_threshold() {
        let det = detector("threshold", FakeLoader::new(tfjs_outputs(vec![0.9, 0.3, 0.6])));
        det.load_all().await.unwrap();
        let dets = det.detect_with_threshold(&blank(10, 10), 0.2).await.unwrap();
        assert_eq!(dets.len(), 3);
        let dets = det.detect_with_threshold(&blank(10, 10), 0.9).await.unwrap();
        assert!(dets.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_scores_is_empty_not_sentinel() {
        let mut outputs = tfjs_outputs(vec![0.9]);
        outputs[1] = OutputTensor::new(vec![1], vec![0.9]);
        let det = detector("malformed", FakeLoader::new(outputs));
        det.load_all().await.unwrap();
        let dets = det.detect(&blank(10, 10)).await.unwrap();
        assert!(dets.is_empty());
    }

    #[tokio::test]
    async fn test_missing_output() {
        let mut outputs = tfjs_outputs(vec![0.9]);
        outputs.truncate(4);
        let det = detector("short", FakeLoader::new(outputs));
        det.load_all().await.unwrap();
        let err = det.detect(&blank(10, 10)).await.unwrap_err();
        assert!(matches!(err, Error::MissingOutput { index: 5, .. }));
    }

    #[tokio::test]
    async fn test_failed_loads_leave_state_unset() {
        let config = DetectorConfig::new("/nonexistent/objdet/model.bin", "/nonexistent/objdet/classes.json");
        let det = Detector::with_loader(&config, Box::new(FakeLoader::new(vec![])));
        assert!(det.load_all().await.is_err());
        assert!(!det.is_model_loaded());
        assert!(!det.is_classes_loaded());
    }

    #[tokio::test]
    async fn test_malformed_assets() {
        let model = write_asset("bad-model.bin", b"garbage");
        let classes = write_asset("bad-classes.json", b"{\"cat\": ");
        let config = DetectorConfig::new(
            model.to_string_lossy().into_owned(),
            classes.to_string_lossy().into_owned(),
        );
        let det = Detector::with_loader(&config, Box::new(FakeLoader::new(vec![])));
        assert!(matches!(det.load_model().await, Err(Error::Model(_))));
        assert!(matches!(det.load_classes().await, Err(Error::Json(_))));
        assert!(!det.is_model_loaded());
        assert!(!det.is_classes_loaded());
    }

    #[tokio::test]
    async fn test_reload() {
        let det = detector("reload", FakeLoader::new(tfjs_outputs(vec![0.9])));
        det.load_model().await.unwrap();
        det.load_model().await.unwrap();
        det.load_classes().await.unwrap();
        assert_eq!(det.detect(&blank(10, 10)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resizes_to_model_input() {
        let mut loader = FakeLoader::new(tfjs_outputs(vec![0.9]));
        loader.input_size = Some((32, 16));
        let seen = loader.seen.clone();
        let det = detector("resize", loader);
        det.load_all().await.unwrap();

        let dets = det.detect(&blank(640, 480)).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &[[1usize, 16, 32, 3]][..]);
        // boxes are still reported against the source image
        let [x, _, w, _] = dets[0].bbox;
        assert!((x - 128.0).abs() < 1e-3);
        assert!((w - 256.0).abs() < 1e-3);
    }
}
