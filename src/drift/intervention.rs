//! Collaborators the drift detector drives when an intervention is due.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::models::DistractionEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InterventionChoice {
    ResumeWork,
    TakeBreak,
}

impl InterventionChoice {
    /// Keyboard fast-path: Enter resumes, Escape takes the break.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Enter" | "Return" => Some(InterventionChoice::ResumeWork),
            "Escape" | "Esc" => Some(InterventionChoice::TakeBreak),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InterventionChoice::ResumeWork => "Back to work",
            InterventionChoice::TakeBreak => "Taking a break",
        }
    }
}

/// What the modal shows: the objective and the two ways out.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterventionRequest {
    pub objective_text: String,
    pub distraction: DistractionEvent,
    pub choices: [InterventionChoice; 2],
}

impl InterventionRequest {
    pub fn new(distraction: DistractionEvent) -> Self {
        Self {
            objective_text: distraction.objective_text.clone(),
            distraction,
            choices: [InterventionChoice::ResumeWork, InterventionChoice::TakeBreak],
        }
    }
}

/// Modal presentation. The user's answer comes back to the detector as an
/// `InterventionChoice`, never through this trait.
pub trait InterventionUi: Send + Sync {
    fn show(&self, request: &InterventionRequest);
    fn hide(&self);
}

pub trait AppActivator: Send + Sync {
    fn activate(&self, app_id: &str);
}

#[derive(Clone)]
pub struct DriftHost {
    pub ui: Arc<dyn InterventionUi>,
    pub activator: Arc<dyn AppActivator>,
}

/// Stand-in for the overlay when running without a window server.
pub struct HeadlessInterventionUi;

impl InterventionUi for HeadlessInterventionUi {
    fn show(&self, request: &InterventionRequest) {
        let choices: Vec<&str> = request.choices.iter().map(InterventionChoice::label).collect();
        info!(
            "Intervention: drifted into {} while working on \"{}\" [{}]",
            request.distraction.distraction_app,
            request.objective_text,
            choices.join(" | ")
        );
    }

    fn hide(&self) {
        info!("Intervention dismissed");
    }
}

pub struct HeadlessActivator;

impl AppActivator for HeadlessActivator {
    fn activate(&self, app_id: &str) {
        info!("Requesting reactivation of {app_id}");
    }
}
