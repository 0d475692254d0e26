use crate::core::features::{Descriptor, DescriptorSet};
use crate::core::image::ImageRef;
use crate::services::decode::{DecodeError, DecodeService};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::corners::corners_fast9;

/// Keypoint descriptor provider built on FAST corners and normalized
/// intensity patches.
///
/// Low-texture images naturally produce few or zero descriptors, which is
/// exactly the representation the feature clusterer expects.
pub struct FeatureService {
    max_keypoints: usize,
    fast_threshold: u8,
}

/// Patches are PATCH_SIZE x PATCH_SIZE, so descriptors have 64 dimensions.
const PATCH_SIZE: u32 = 8;
const PATCH_HALF: u32 = PATCH_SIZE / 2;

/// Long edge cap before detection. Keeps descriptor extraction cheap on
/// camera-resolution files without hurting match quality much.
const RESIZE_LONG_EDGE: u32 = 512;

impl Default for FeatureService {
    fn default() -> Self {
        Self {
            max_keypoints: 256,
            fast_threshold: 20,
        }
    }
}

impl FeatureService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_keypoints(mut self, max_keypoints: usize) -> Self {
        self.max_keypoints = max_keypoints;
        self
    }

    /// Decode `image` and extract its descriptor set.
    pub fn compute(
        &self,
        decode: &dyn DecodeService,
        image: &ImageRef,
    ) -> Result<DescriptorSet, DecodeError> {
        let pixels = decode.open(image.path())?;
        let gray = self.prepare(pixels);

        let mut corners = corners_fast9(&gray, self.fast_threshold);
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(self.max_keypoints);

        let descriptors = corners
            .iter()
            .filter_map(|corner| patch_descriptor(&gray, corner.x, corner.y))
            .collect();

        Ok(DescriptorSet::new(image.clone(), descriptors))
    }

    fn prepare(&self, pixels: DynamicImage) -> GrayImage {
        let long_edge = pixels.width().max(pixels.height());
        let pixels = if long_edge > RESIZE_LONG_EDGE {
            let scale = RESIZE_LONG_EDGE as f32 / long_edge as f32;
            pixels.resize(
                (pixels.width() as f32 * scale) as u32,
                (pixels.height() as f32 * scale) as u32,
                FilterType::Triangle,
            )
        } else {
            pixels
        };
        pixels.to_luma8()
    }
}

/// Mean-subtracted, L2-normalized intensity patch around a keypoint, or
/// `None` when the patch falls outside the image or is flat.
fn patch_descriptor(gray: &GrayImage, x: u32, y: u32) -> Option<Descriptor> {
    if x < PATCH_HALF
        || y < PATCH_HALF
        || x + PATCH_HALF > gray.width()
        || y + PATCH_HALF > gray.height()
    {
        return None;
    }

    let mut values = Vec::with_capacity((PATCH_SIZE * PATCH_SIZE) as usize);
    for dy in 0..PATCH_SIZE {
        for dx in 0..PATCH_SIZE {
            let px = x - PATCH_HALF + dx;
            let py = y - PATCH_HALF + dy;
            values.push(gray.get_pixel(px, py).0[0] as f32);
        }
    }

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    for value in &mut values {
        *value -= mean;
    }

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm < 1e-6 {
        return None;
    }
    for value in &mut values {
        *value /= norm;
    }

    Some(Descriptor::new(values))
}
