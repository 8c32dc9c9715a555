//! Repair policies, in standard pipeline order.

pub mod baseline;
pub mod custom_fields;
pub mod duplicate_list;
pub mod duplicate_style;
pub mod homograph;
pub mod morph_bundle;
pub mod sequence;
pub mod unused_analysis;
pub mod wordform;

pub use baseline::BaselineFixer;
pub use custom_fields::{CustomFieldDefaults, CustomFieldPruner};
pub use duplicate_list::DuplicateListNames;
pub use duplicate_style::DuplicateStyles;
pub use homograph::HomographAssigner;
pub use morph_bundle::MorphBundleRepairer;
pub use sequence::SequenceRepairer;
pub use unused_analysis::UnusedAnalysisPruner;
pub use wordform::WordformMerger;
