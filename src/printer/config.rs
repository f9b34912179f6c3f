//! # Printer Model Descriptors
//!
//! Static, const descriptors for the three device variants this driver
//! supports (§4.6).

/// A printer model's static characteristics: name, the fixed output
/// dimensions the image pipeline must hit (if any), accepted source
/// formats, and the largest image the device will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterModel {
    /// Human-readable model name.
    pub name: &'static str,
    /// Output pixel dimensions after pipeline processing, if the family
    /// requires a fixed size (Canon). `None` means the image is used
    /// verbatim (Kodak).
    pub print_dimensions: Option<(u32, u32)>,
    /// Source formats accepted as input to the pipeline.
    pub accepted_formats: &'static [&'static str],
    /// Largest accepted image, in bytes, if the family enforces one.
    pub max_image_bytes: Option<usize>,
}

impl PrinterModel {
    /// Kodak Step / Step Touch (standard family flag).
    pub const KODAK_STEP_STANDARD: Self = Self {
        name: "Kodak Step",
        print_dimensions: None,
        accepted_formats: &["jpeg"],
        max_image_bytes: Some(crate::pipeline::KODAK_MAX_JPEG_BYTES),
    };

    /// Kodak Step Slim / Step Touch Snap 2 (slim family flag).
    pub const KODAK_STEP_SLIM: Self = Self {
        name: "Kodak Step Slim",
        print_dimensions: None,
        accepted_formats: &["jpeg"],
        max_image_bytes: Some(crate::pipeline::KODAK_MAX_JPEG_BYTES),
    };

    /// Canon Ivy 2.
    pub const CANON_IVY2: Self = Self {
        name: "Canon Ivy 2",
        print_dimensions: Some((
            crate::pipeline::CANON_PRINT_WIDTH,
            crate::pipeline::CANON_PRINT_HEIGHT,
        )),
        accepted_formats: &["jpeg", "png"],
        max_image_bytes: None,
    };
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kodak_models_have_no_fixed_dimensions() {
        assert!(PrinterModel::KODAK_STEP_STANDARD.print_dimensions.is_none());
        assert!(PrinterModel::KODAK_STEP_SLIM.print_dimensions.is_none());
    }

    #[test]
    fn test_canon_model_fixed_dimensions_match_pipeline() {
        assert_eq!(
            PrinterModel::CANON_IVY2.print_dimensions,
            Some((640, 1616))
        );
    }

    #[test]
    fn test_kodak_models_cap_image_size() {
        assert_eq!(
            PrinterModel::KODAK_STEP_STANDARD.max_image_bytes,
            Some(2 * 1024 * 1024)
        );
    }
}
