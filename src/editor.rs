use crate::enums::{EditMode, Thickness};
use crate::request::{EditRequest, isocenter_to_range_shifter_distance_mm};

use dicom::core::value::{DataSetSequence, PrimitiveValue};
use dicom::core::{DataElement, Tag, VR};
use dicom::object::{DefaultDicomObject, InMemDicomObject, open_file};
use dicom_dictionary_std::tags;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const RANGE_SHIFTER_NUMBER: &str = "1";
const REFERENCED_RANGE_SHIFTER_NUMBER: &str = "1";
const NUMBER_OF_RANGE_SHIFTERS: &str = "1";
const RANGE_SHIFTER_TYPE: &str = "BINARY";
const RANGE_SHIFTER_SETTING: &str = "IN";
const WATER_EQUIVALENT_THICKNESS_MM: f32 = 23.0;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("plan has no ion beam sequence")]
    MissingIonBeamSequence,

    #[error("ion beam {0} has no control points")]
    MissingControlPoints(usize),

    #[error("ion beam {0} has no range shifter to modify")]
    MissingRangeShifter(usize),

    #[error("ion beam {0} has no range shifter settings to modify")]
    MissingRangeShifterSettings(usize),

    #[error("plan has no SOP instance UID")]
    MissingSopInstanceUid,

    #[error("SOP instance UID {0:?} is too short to renumber")]
    SopInstanceUidTooShort(String),

    #[error("DICOM read error: {0}")]
    Read(#[from] dicom::object::ReadError),

    #[error("DICOM write error: {0}")]
    Write(#[from] dicom::object::WriteError),
}

/// Confirmation record of a completed edit.
#[derive(Debug, Clone)]
pub struct EditSummary {
    pub output: PathBuf,
    pub plan_label: String,
    pub sop_instance_uid: String,
}

pub struct RangeShifterEditor;

impl RangeShifterEditor {
    /// Load the plan named by the request, edit it and persist the result.
    ///
    /// The plan is serialized only after the whole edit has completed in
    /// memory, so a failing edit never leaves a partial output file.
    ///
    /// # Errors
    ///
    /// Returns error if the codec cannot read or write the plan, or if the
    /// plan lacks the structure the edit relies on
    pub fn run(request: &EditRequest) -> Result<EditSummary, EditorError> {
        let mut plan = open_file(request.input())?;
        let summary = Self::apply(&mut plan, request)?;
        Self::persist(&plan, request.output())?;
        Ok(summary)
    }

    /// Apply the requested edit to a decoded plan, in place.
    ///
    /// Every ion beam of the plan is edited. Afterwards the RT Plan Label is
    /// overwritten and the SOP Instance UID renumbered, making the document
    /// a new plan instance.
    pub fn apply(
        plan: &mut InMemDicomObject,
        request: &EditRequest,
    ) -> Result<EditSummary, EditorError> {
        let mut beams = Self::sequence_items(plan, tags::ION_BEAM_SEQUENCE)
            .ok_or(EditorError::MissingIonBeamSequence)?;

        for (index, beam) in beams.iter_mut().enumerate() {
            match request.mode() {
                EditMode::Add {
                    thickness,
                    snout_position_mm,
                } => Self::add_range_shifter(beam, index, *thickness, *snout_position_mm)?,
                EditMode::Modify {
                    thickness,
                    snout_position_mm,
                } => Self::modify_range_shifter(beam, index, *thickness, *snout_position_mm)?,
            }
        }

        plan.put(DataElement::new(
            tags::ION_BEAM_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(beams),
        ));
        plan.put(DataElement::new(
            tags::RT_PLAN_LABEL,
            VR::SH,
            PrimitiveValue::from(request.plan_label()),
        ));

        let uid = Self::renumbered_sop_instance_uid(plan)?;
        plan.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(uid.as_str()),
        ));

        let summary = EditSummary {
            output: request.output().to_owned(),
            plan_label: request.plan_label().to_owned(),
            sop_instance_uid: uid,
        };
        info!(
            output = %summary.output.display(),
            plan_label = %summary.plan_label,
            sop_instance_uid = %summary.sop_instance_uid,
            "modified plan file"
        );
        Ok(summary)
    }

    /// Serialize the plan to the given path, overwriting any existing file.
    pub fn persist(plan: &DefaultDicomObject, path: &Path) -> Result<(), EditorError> {
        plan.write_to_file(path)?;
        Ok(())
    }

    fn add_range_shifter(
        beam: &mut InMemDicomObject,
        index: usize,
        thickness: Thickness,
        snout_position_mm: f64,
    ) -> Result<(), EditorError> {
        let mut control_points = Self::sequence_items(beam, tags::ION_CONTROL_POINT_SEQUENCE)
            .filter(|items| !items.is_empty())
            .ok_or(EditorError::MissingControlPoints(index))?;

        let distance_mm = isocenter_to_range_shifter_distance_mm(snout_position_mm);

        beam.put(DataElement::new(
            tags::NUMBER_OF_RANGE_SHIFTERS,
            VR::IS,
            PrimitiveValue::from(NUMBER_OF_RANGE_SHIFTERS),
        ));
        beam.put(DataElement::new(
            tags::RANGE_SHIFTER_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(vec![Self::device_item(thickness)]),
        ));

        control_points[0].put(DataElement::new(
            tags::SNOUT_POSITION,
            VR::FL,
            PrimitiveValue::from(snout_position_mm as f32),
        ));
        control_points[0].put(DataElement::new(
            tags::RANGE_SHIFTER_SETTINGS_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(vec![Self::settings_item(distance_mm)]),
        ));
        beam.put(DataElement::new(
            tags::ION_CONTROL_POINT_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(control_points),
        ));
        Ok(())
    }

    fn modify_range_shifter(
        beam: &mut InMemDicomObject,
        index: usize,
        thickness: Option<Thickness>,
        snout_position_mm: Option<f64>,
    ) -> Result<(), EditorError> {
        if let Some(thickness) = thickness {
            let mut devices = Self::sequence_items(beam, tags::RANGE_SHIFTER_SEQUENCE)
                .filter(|items| !items.is_empty())
                .ok_or(EditorError::MissingRangeShifter(index))?;
            devices[0].put(DataElement::new(
                tags::RANGE_SHIFTER_ID,
                VR::SH,
                PrimitiveValue::from(thickness.device_id()),
            ));
            beam.put(DataElement::new(
                tags::RANGE_SHIFTER_SEQUENCE,
                VR::SQ,
                DataSetSequence::from(devices),
            ));
        }

        if let Some(snout_position_mm) = snout_position_mm {
            let mut control_points = Self::sequence_items(beam, tags::ION_CONTROL_POINT_SEQUENCE)
                .filter(|items| !items.is_empty())
                .ok_or(EditorError::MissingControlPoints(index))?;

            let mut settings =
                Self::sequence_items(&control_points[0], tags::RANGE_SHIFTER_SETTINGS_SEQUENCE)
                    .filter(|items| !items.is_empty())
                    .ok_or(EditorError::MissingRangeShifterSettings(index))?;
            let distance_mm = isocenter_to_range_shifter_distance_mm(snout_position_mm);
            settings[0].put(DataElement::new(
                tags::ISOCENTER_TO_RANGE_SHIFTER_DISTANCE,
                VR::FL,
                PrimitiveValue::from(distance_mm as f32),
            ));

            control_points[0].put(DataElement::new(
                tags::SNOUT_POSITION,
                VR::FL,
                PrimitiveValue::from(snout_position_mm as f32),
            ));
            control_points[0].put(DataElement::new(
                tags::RANGE_SHIFTER_SETTINGS_SEQUENCE,
                VR::SQ,
                DataSetSequence::from(settings),
            ));
            beam.put(DataElement::new(
                tags::ION_CONTROL_POINT_SEQUENCE,
                VR::SQ,
                DataSetSequence::from(control_points),
            ));
        }
        Ok(())
    }

    fn device_item(thickness: Thickness) -> InMemDicomObject {
        InMemDicomObject::from_element_iter(vec![
            DataElement::new(
                tags::RANGE_SHIFTER_NUMBER,
                VR::IS,
                PrimitiveValue::from(RANGE_SHIFTER_NUMBER),
            ),
            DataElement::new(
                tags::RANGE_SHIFTER_ID,
                VR::SH,
                PrimitiveValue::from(thickness.device_id()),
            ),
            DataElement::new(
                tags::RANGE_SHIFTER_TYPE,
                VR::CS,
                PrimitiveValue::from(RANGE_SHIFTER_TYPE),
            ),
        ])
    }

    fn settings_item(distance_mm: f64) -> InMemDicomObject {
        InMemDicomObject::from_element_iter(vec![
            DataElement::new(
                tags::RANGE_SHIFTER_SETTING,
                VR::LO,
                PrimitiveValue::from(RANGE_SHIFTER_SETTING),
            ),
            DataElement::new(
                tags::ISOCENTER_TO_RANGE_SHIFTER_DISTANCE,
                VR::FL,
                PrimitiveValue::from(distance_mm as f32),
            ),
            DataElement::new(
                tags::RANGE_SHIFTER_WATER_EQUIVALENT_THICKNESS,
                VR::FL,
                PrimitiveValue::from(WATER_EQUIVALENT_THICKNESS_MM),
            ),
            DataElement::new(
                tags::REFERENCED_RANGE_SHIFTER_NUMBER,
                VR::IS,
                PrimitiveValue::from(REFERENCED_RANGE_SHIFTER_NUMBER),
            ),
        ])
    }

    /// New SOP Instance UID for the edited plan: the third character of the
    /// original UID replaced with `4`, everything else unchanged.
    fn renumbered_sop_instance_uid(plan: &InMemDicomObject) -> Result<String, EditorError> {
        let uid = plan
            .element(tags::SOP_INSTANCE_UID)
            .ok()
            .and_then(|element| element.to_str().ok())
            .ok_or(EditorError::MissingSopInstanceUid)?;
        let uid = uid.trim_end_matches(['\0', ' ']);
        if uid.chars().count() < 3 {
            return Err(EditorError::SopInstanceUidTooShort(uid.to_owned()));
        }
        Ok(uid
            .chars()
            .enumerate()
            .map(|(i, c)| if i == 2 { '4' } else { c })
            .collect())
    }

    fn sequence_items(obj: &InMemDicomObject, tag: Tag) -> Option<Vec<InMemDicomObject>> {
        let items = obj.element(tag).ok()?.value().items()?;
        Some(items.to_vec())
    }
}
