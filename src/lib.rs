//! # DICOM range shifter editor
//!
//! This crate edits DICOM RT Ion Plans, inserting or updating the range
//! shifter description of every ion beam in the plan.
//!
//! This library is part of the dicom-rs ecosystem and leverages its
//! components to decode, mutate and re-encode plan files. A plan edit is
//! described by an [`EditRequest`], which is validated completely before any
//! file is touched. Two kinds of edits are supported:
//!  - Add: insert a new range shifter device and settings block into every
//!    ion beam, replacing whatever was there before
//!  - Modify: update the identifier and/or snout position of a range
//!    shifter that is already present
//!
//! The isocenter-to-range-shifter distance is always derived from the snout
//! position and the fixed geometry of the delivery system, so the two values
//! cannot diverge. Every saved plan gets a renumbered SOP Instance UID and
//! an updated RT Plan Label; the output is a new plan instance, never a
//! passthrough of the input.
//!
//! # Examples
//!
//! ## Adding a 3 cm range shifter to a plan
//!
//! Read plan.dcm, insert a 3 cm range shifter with the snout at 250.0 mm,
//! and save the result under a derived file name.
//!
//! ```no_run
//! # use dicom_rangeshifter::editor::RangeShifterEditor;
//! # use dicom_rangeshifter::request::EditRequest;
//! let request = EditRequest::add("plan.dcm", "BRAIN RS3", 3, 250.0, None)
//!     .expect("should have built a valid edit request");
//! let summary = RangeShifterEditor::run(&request)
//!     .expect("should have edited and saved the plan");
//! println!("wrote {}", summary.output.display());
//! ```
//!
//! [`EditRequest`]: request::EditRequest

pub mod editor;
pub mod enums;
pub mod request;
