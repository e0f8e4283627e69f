pub mod detector;
pub mod intervention;

pub use detector::DriftDetector;
pub use intervention::{
    AppActivator, DriftHost, HeadlessActivator, HeadlessInterventionUi, InterventionChoice,
    InterventionRequest, InterventionUi,
};
