use crate::enums::{EditMode, Thickness};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum range shifter radius of the delivery system in mm.
const MAX_RANGE_SHIFTER_RADIUS_MM: f64 = 461.0;
/// Maximum snout radius of the delivery system in mm.
const MAX_SNOUT_RADIUS_MM: f64 = 421.0;

const SNOUT_POSITION_MIN_MM: f64 = 20.0;
const SNOUT_POSITION_MAX_MM: f64 = 421.0;

#[derive(Debug, Error)]
pub enum EditRequestError {
    #[error("input file must have a .dcm extension: {}", .0.display())]
    BadInputExtension(PathBuf),

    #[error("unsupported range shifter thickness: {0} cm (must be 2, 3 or 5)")]
    UnsupportedThickness(u32),

    #[error("plan label must not be empty")]
    EmptyPlanLabel,

    #[error("snout position {0} mm is outside 20.0..=421.0")]
    SnoutPositionOutOfRange(f64),
}

/// Distance from the isocenter to the range shifter for a given snout
/// position, in mm.
pub(crate) fn isocenter_to_range_shifter_distance_mm(snout_position_mm: f64) -> f64 {
    MAX_RANGE_SHIFTER_RADIUS_MM - MAX_SNOUT_RADIUS_MM + snout_position_mm
}

/// Validated description of a single plan edit.
///
/// A request is checked completely at construction time, before any file is
/// touched. [`EditRequest::add`] inserts a new range shifter into every ion
/// beam of the plan, [`EditRequest::modify`] updates one that is already
/// present. A request edits exactly one plan; build a new one per file.
#[derive(Debug, Clone)]
pub struct EditRequest {
    input: PathBuf,
    output: PathBuf,
    plan_label: String,
    mode: EditMode,
}

impl EditRequest {
    /// Build a request that adds a range shifter to every ion beam.
    ///
    /// # Arguments
    ///
    /// * `input` - Plan file to edit, must end in `.dcm`
    /// * `plan_label` - New RT Plan Label
    /// * `thickness_cm` - Range shifter thickness in cm, one of 2, 3 or 5
    /// * `snout_position_mm` - Snout position in mm, between 20.0 and 421.0
    /// * `output` - Output file; `.dcm` is appended when missing, and a name
    ///   derived from the input is used when omitted
    ///
    /// # Errors
    ///
    /// Returns error if any parameter violates its constraint
    pub fn add(
        input: impl Into<PathBuf>,
        plan_label: impl Into<String>,
        thickness_cm: u32,
        snout_position_mm: f64,
        output: Option<PathBuf>,
    ) -> Result<Self, EditRequestError> {
        let thickness = Self::validate_thickness(thickness_cm)?;
        Self::validate_snout_position(snout_position_mm)?;
        Self::new(
            input.into(),
            plan_label.into(),
            EditMode::Add {
                thickness,
                snout_position_mm,
            },
            output,
        )
    }

    /// Build a request that updates an existing range shifter.
    ///
    /// Both the thickness and the snout position are optional; only the
    /// supplied parameters are written to the plan.
    ///
    /// # Errors
    ///
    /// Returns error if any supplied parameter violates its constraint
    pub fn modify(
        input: impl Into<PathBuf>,
        plan_label: impl Into<String>,
        thickness_cm: Option<u32>,
        snout_position_mm: Option<f64>,
        output: Option<PathBuf>,
    ) -> Result<Self, EditRequestError> {
        let thickness = match thickness_cm {
            Some(cm) => Some(Self::validate_thickness(cm)?),
            None => None,
        };
        if let Some(snout) = snout_position_mm {
            Self::validate_snout_position(snout)?;
        }
        Self::new(
            input.into(),
            plan_label.into(),
            EditMode::Modify {
                thickness,
                snout_position_mm,
            },
            output,
        )
    }

    fn new(
        input: PathBuf,
        plan_label: String,
        mode: EditMode,
        output: Option<PathBuf>,
    ) -> Result<Self, EditRequestError> {
        if input.extension().and_then(|ext| ext.to_str()) != Some("dcm") {
            return Err(EditRequestError::BadInputExtension(input));
        }
        if plan_label.trim().is_empty() {
            return Err(EditRequestError::EmptyPlanLabel);
        }
        let output = match output {
            Some(path) => Self::ensure_dcm_extension(path),
            None => Self::default_output(&input, &mode),
        };
        Ok(Self {
            input,
            output,
            plan_label,
            mode,
        })
    }

    fn validate_thickness(cm: u32) -> Result<Thickness, EditRequestError> {
        Thickness::from_cm(cm).ok_or(EditRequestError::UnsupportedThickness(cm))
    }

    fn validate_snout_position(snout_position_mm: f64) -> Result<(), EditRequestError> {
        if (SNOUT_POSITION_MIN_MM..=SNOUT_POSITION_MAX_MM).contains(&snout_position_mm) {
            Ok(())
        } else {
            Err(EditRequestError::SnoutPositionOutOfRange(snout_position_mm))
        }
    }

    fn ensure_dcm_extension(path: PathBuf) -> PathBuf {
        if path.extension().and_then(|ext| ext.to_str()) == Some("dcm") {
            path
        } else {
            let mut name = path.into_os_string();
            name.push(".dcm");
            PathBuf::from(name)
        }
    }

    fn default_output(input: &Path, mode: &EditMode) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let mut name = stem.to_owned();
        if let Some(thickness) = mode_thickness(mode) {
            name.push_str(&format!("_RS{}", thickness.centimeters()));
        }
        if let Some(snout) = mode_snout_position(mode) {
            name.push_str(&format!("_Snout{snout:?}"));
        }
        if name == stem {
            name.push_str("_edited");
        }
        name.push_str(".dcm");
        input.with_file_name(name)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn plan_label(&self) -> &str {
        &self.plan_label
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn thickness(&self) -> Option<Thickness> {
        mode_thickness(&self.mode)
    }

    pub fn snout_position_mm(&self) -> Option<f64> {
        mode_snout_position(&self.mode)
    }

    /// Isocenter to range shifter distance in mm, derived from the snout
    /// position when one is supplied.
    pub fn isocenter_to_range_shifter_distance_mm(&self) -> Option<f64> {
        self.snout_position_mm()
            .map(isocenter_to_range_shifter_distance_mm)
    }
}

fn mode_thickness(mode: &EditMode) -> Option<Thickness> {
    match mode {
        EditMode::Add { thickness, .. } => Some(*thickness),
        EditMode::Modify { thickness, .. } => *thickness,
    }
}

fn mode_snout_position(mode: &EditMode) -> Option<f64> {
    match mode {
        EditMode::Add {
            snout_position_mm, ..
        } => Some(*snout_position_mm),
        EditMode::Modify {
            snout_position_mm, ..
        } => *snout_position_mm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accepts_every_supported_thickness() {
        for (cm, id) in [(2, "RS=2cm"), (3, "RS=3cm"), (5, "RS=5cm")] {
            let request = EditRequest::add("plan.dcm", "PLAN", cm, 250.0, None).unwrap();
            assert_eq!(request.thickness().unwrap().device_id(), id);
        }
    }

    #[test]
    fn add_rejects_unsupported_thickness() {
        let err = EditRequest::add("plan.dcm", "PLAN", 4, 250.0, None).unwrap_err();
        assert!(matches!(err, EditRequestError::UnsupportedThickness(4)));
    }

    #[test]
    fn modify_accepts_absent_thickness() {
        let request = EditRequest::modify("plan.dcm", "PLAN", None, Some(100.0), None).unwrap();
        assert_eq!(request.thickness(), None);
    }

    #[test]
    fn modify_rejects_unsupported_thickness() {
        let err = EditRequest::modify("plan.dcm", "PLAN", Some(7), None, None).unwrap_err();
        assert!(matches!(err, EditRequestError::UnsupportedThickness(7)));
    }

    #[test]
    fn snout_position_bounds_are_inclusive() {
        assert!(EditRequest::add("plan.dcm", "PLAN", 3, 20.0, None).is_ok());
        assert!(EditRequest::add("plan.dcm", "PLAN", 3, 421.0, None).is_ok());
        for snout in [19.9, 421.1, -1.0] {
            let err = EditRequest::add("plan.dcm", "PLAN", 3, snout, None).unwrap_err();
            assert!(matches!(err, EditRequestError::SnoutPositionOutOfRange(_)));
        }
    }

    #[test]
    fn modify_validates_supplied_snout_position() {
        let err = EditRequest::modify("plan.dcm", "PLAN", None, Some(500.0), None).unwrap_err();
        assert!(matches!(
            err,
            EditRequestError::SnoutPositionOutOfRange(value) if value == 500.0
        ));
    }

    #[test]
    fn modify_accepts_absent_snout_position() {
        let request = EditRequest::modify("plan.dcm", "PLAN", Some(2), None, None).unwrap();
        assert_eq!(request.snout_position_mm(), None);
        assert_eq!(request.isocenter_to_range_shifter_distance_mm(), None);
    }

    #[test]
    fn distance_is_snout_position_plus_forty() {
        for snout in [20.0, 100.5, 250.0, 421.0] {
            let request = EditRequest::add("plan.dcm", "PLAN", 3, snout, None).unwrap();
            assert_eq!(
                request.isocenter_to_range_shifter_distance_mm(),
                Some(40.0 + snout)
            );
        }
    }

    #[test]
    fn input_must_have_dcm_extension() {
        for input in ["plan.txt", "plan", "plan.dcm.bak"] {
            let err = EditRequest::add(input, "PLAN", 3, 250.0, None).unwrap_err();
            assert!(matches!(err, EditRequestError::BadInputExtension(_)));
        }
    }

    #[test]
    fn plan_label_must_not_be_empty() {
        for label in ["", "   "] {
            let err = EditRequest::add("plan.dcm", label, 3, 250.0, None).unwrap_err();
            assert!(matches!(err, EditRequestError::EmptyPlanLabel));
        }
    }

    #[test]
    fn default_output_is_derived_from_the_request() {
        let request = EditRequest::add("plan.dcm", "PLAN", 3, 250.0, None).unwrap();
        assert_eq!(request.output(), Path::new("plan_RS3_Snout250.0.dcm"));
    }

    #[test]
    fn default_output_keeps_fractional_snout_positions() {
        let request = EditRequest::add("plan.dcm", "PLAN", 2, 30.5, None).unwrap();
        assert_eq!(request.output(), Path::new("plan_RS2_Snout30.5.dcm"));
    }

    #[test]
    fn default_output_skips_absent_parameters() {
        let request = EditRequest::modify("plan.dcm", "PLAN", Some(5), None, None).unwrap();
        assert_eq!(request.output(), Path::new("plan_RS5.dcm"));

        let request = EditRequest::modify("plan.dcm", "PLAN", None, None, None).unwrap();
        assert_eq!(request.output(), Path::new("plan_edited.dcm"));
    }

    #[test]
    fn explicit_output_gets_dcm_extension_appended() {
        let request =
            EditRequest::add("plan.dcm", "PLAN", 3, 250.0, Some(PathBuf::from("out"))).unwrap();
        assert_eq!(request.output(), Path::new("out.dcm"));

        let request =
            EditRequest::add("plan.dcm", "PLAN", 3, 250.0, Some(PathBuf::from("out.dcm"))).unwrap();
        assert_eq!(request.output(), Path::new("out.dcm"));
    }
}
