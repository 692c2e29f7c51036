use std::collections::BTreeMap;

use tracing::{debug, info};

use super::photo::CapturedImage;
use super::view::View;
use crate::error::{Result, ScreeningError};

/// Captured images keyed by view. May be partially populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionImageSet {
    images: BTreeMap<View, CapturedImage>,
}

impl SessionImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a capture under its own view, replacing any earlier one.
    pub fn insert(&mut self, image: CapturedImage) -> Option<CapturedImage> {
        self.images.insert(image.view, image)
    }

    pub fn remove(&mut self, view: View) -> Option<CapturedImage> {
        self.images.remove(&view)
    }

    pub fn get(&self, view: View) -> Option<&CapturedImage> {
        self.images.get(&view)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedImage> {
        self.images.values()
    }

    pub fn views(&self) -> Vec<View> {
        self.images.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// True iff every one of the five views is populated.
    pub fn is_complete(&self) -> bool {
        View::ALL.iter().all(|v| self.images.contains_key(v))
    }

    pub fn missing_views(&self) -> Vec<View> {
        View::ALL
            .iter()
            .copied()
            .filter(|v| !self.images.contains_key(v))
            .collect()
    }
}

impl FromIterator<CapturedImage> for SessionImageSet {
    fn from_iter<I: IntoIterator<Item = CapturedImage>>(iter: I) -> Self {
        let mut set = SessionImageSet::new();
        for image in iter {
            set.insert(image);
        }
        set
    }
}

/// Transient holder for the images of one capture session.
///
/// Created when a capture flow starts and cleared when the flow is left;
/// nothing is persisted.
#[derive(Debug, Default)]
pub struct CaptureStore {
    images: SessionImageSet,
}

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or retake) the image for a view.
    pub fn set_image(&mut self, view: View, mut image: CapturedImage) {
        image.view = view;
        if self.images.insert(image).is_some() {
            info!("Retook {} view", view);
        } else {
            info!("Captured {} view ({}/{})", view, self.images.len(), View::ALL.len());
        }
    }

    pub fn clear_image(&mut self, view: View) -> Option<CapturedImage> {
        debug!("Clearing {} view", view);
        self.images.remove(view)
    }

    pub fn get(&self, view: View) -> Option<&CapturedImage> {
        self.images.get(view)
    }

    pub fn is_complete(&self) -> bool {
        self.images.is_complete()
    }

    pub fn missing_views(&self) -> Vec<View> {
        self.images.missing_views()
    }

    /// Snapshot of whatever has been captured so far.
    pub fn images(&self) -> &SessionImageSet {
        &self.images
    }

    /// Hand out the full set for screening. Refused until all five views are present.
    pub fn proceed(&self) -> Result<SessionImageSet> {
        let missing = self.missing_views();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|v| v.as_str()).collect();
            return Err(ScreeningError::Input(format!(
                "Capture all views before continuing. Missing: {}",
                names.join(", ")
            )));
        }
        Ok(self.images.clone())
    }

    /// Drop every capture, ending the session.
    pub fn clear(&mut self) {
        if !self.images.is_empty() {
            info!("Discarding {} captured image(s)", self.images.len());
        }
        self.images = SessionImageSet::new();
    }
}
