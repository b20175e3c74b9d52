use std::ops::Index;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Created {actual} {what} for a swapchain of {expected} images.")]
pub struct ImageCountError {
    pub what: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// One value per swapchain image, indexed by image index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerImage<T>(Vec<T>);

impl<T> Default for PerImage<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> PerImage<T> {
    /// Wraps `values`, checking there is exactly one per swapchain image.
    pub fn new(
        what: &'static str,
        values: Vec<T>,
        image_count: usize,
    ) -> Result<Self, ImageCountError> {
        if values.len() != image_count {
            return Err(ImageCountError {
                what,
                expected: image_count,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T> Index<usize> for PerImage<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.0[index]
    }
}

impl<T> Index<u32> for PerImage<T> {
    type Output = T;

    fn index(&self, index: u32) -> &T {
        &self.0[index as usize]
    }
}

impl<'a, T> IntoIterator for &'a PerImage<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_one_value_per_image() {
        let views = PerImage::new("image views", vec![10, 11, 12], 3).unwrap();

        assert_eq!(views.len(), 3);
        assert_eq!(views[1usize], 11);
        assert_eq!(views[2u32], 12);
    }

    #[test]
    fn rejects_count_mismatch() {
        let err = PerImage::new("framebuffers", vec![1, 2], 3).unwrap_err();

        assert_eq!(
            err,
            ImageCountError {
                what: "framebuffers",
                expected: 3,
                actual: 2,
            }
        );
        assert_eq!(
            err.to_string(),
            "Created 2 framebuffers for a swapchain of 3 images."
        );
    }

    #[test]
    fn default_is_empty() {
        let buffers: PerImage<u64> = PerImage::default();
        assert!(buffers.is_empty());
        assert_eq!(buffers.iter().count(), 0);
    }
}
