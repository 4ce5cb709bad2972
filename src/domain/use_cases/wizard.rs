use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    entities::{
        location::GeocodedAddress,
        plant::{DraftPatch, PlantDraft, PlantRecord},
    },
    errors::WizardError,
};

/// The four pages of the add/edit form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Identify = 1,
    Detail = 2,
    Location = 3,
    Review = 4,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Identify => "Scan Plant ID",
            WizardStep::Detail => "Plant Details & Photo",
            WizardStep::Location => "Confirm Location",
            WizardStep::Review => "Review & Submit",
        }
    }

    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Identify => Some(WizardStep::Detail),
            WizardStep::Detail => Some(WizardStep::Location),
            WizardStep::Location => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Identify => None,
            WizardStep::Detail => Some(WizardStep::Identify),
            WizardStep::Location => Some(WizardStep::Detail),
            WizardStep::Review => Some(WizardStep::Location),
        }
    }

    /// The condition the draft must meet before leaving this step forward.
    pub fn gate(self, draft: &PlantDraft) -> Result<(), WizardError> {
        match self {
            WizardStep::Identify if !draft.has_id() => Err(WizardError::MissingPlantId),
            WizardStep::Detail if !draft.has_image() => Err(WizardError::MissingImage),
            WizardStep::Location if !draft.is_located() => Err(WizardError::MissingLocation),
            _ => Ok(()),
        }
    }
}

/// `step == None` is the closed form (the dashboard shows the list).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    pub step: Option<WizardStep>,
    pub draft: PlantDraft,
    pub submitting: bool,
}

#[derive(Debug, Clone)]
pub enum WizardAction {
    OpenNew {
        uid: String,
        now: DateTime<Utc>,
    },
    OpenEdit {
        record: Box<PlantRecord>,
        uid: String,
        now: DateTime<Utc>,
    },
    Update(DraftPatch),
    ScanSucceeded(String),
    LocationCaptured {
        latitude: f64,
        longitude: f64,
        address: GeocodedAddress,
    },
    PhotoCaptured(String),
    Next,
    Previous,
    RequestExit {
        confirmed: bool,
    },
    BeginSubmit,
    SubmitFinished {
        ok: bool,
    },
}

impl WizardState {
    pub fn is_open(&self) -> bool {
        self.step.is_some()
    }

    /// 0 while closed, otherwise the step number.
    pub fn step_number(&self) -> u8 {
        self.step.map(WizardStep::number).unwrap_or(0)
    }

    fn open_step(&self) -> Result<WizardStep, WizardError> {
        self.step.ok_or(WizardError::NotOpen)
    }

    /// Like [`Self::open_step`], but also refuses while a write is pending.
    fn editable_step(&self) -> Result<WizardStep, WizardError> {
        let step = self.open_step()?;
        if self.submitting {
            return Err(WizardError::SubmitInFlight);
        }
        Ok(step)
    }

    pub fn view(&self, qr_scan_available: bool) -> WizardView {
        WizardView {
            open: self.is_open(),
            step: self.step_number(),
            title: self.step.map(WizardStep::title),
            draft: self.draft.clone(),
            submitting: self.submitting,
            can_go_back: self.step.and_then(WizardStep::previous).is_some(),
            qr_scan_available: qr_scan_available && self.step == Some(WizardStep::Identify),
        }
    }
}

fn opened(mut draft: PlantDraft, uid: String, now: DateTime<Utc>) -> WizardState {
    if draft.date_uploaded.is_none() {
        draft.date_uploaded = Some(now);
    }
    if draft.added_by.is_empty() {
        draft.added_by = uid;
    }

    WizardState {
        step: Some(WizardStep::Identify),
        draft,
        submitting: false,
    }
}

/// Applies one action to the form. A rejected action leaves `state` as it
/// was; the caller keeps the old value and shows the error.
pub fn transition(state: &WizardState, action: WizardAction) -> Result<WizardState, WizardError> {
    match action {
        WizardAction::OpenNew { uid, now } => {
            if state.is_open() {
                return Err(WizardError::AlreadyOpen);
            }
            Ok(opened(PlantDraft::default(), uid, now))
        }

        WizardAction::OpenEdit { record, uid, now } => {
            if state.is_open() {
                return Err(WizardError::AlreadyOpen);
            }
            Ok(opened(PlantDraft::from_record(&record), uid, now))
        }

        WizardAction::Update(patch) => {
            state.editable_step()?;
            let mut next = state.clone();
            next.draft.apply_patch(patch);
            Ok(next)
        }

        WizardAction::ScanSucceeded(code) => {
            state.editable_step()?;
            let mut next = state.clone();
            next.draft.id = code;
            Ok(next)
        }

        WizardAction::LocationCaptured { latitude, longitude, address } => {
            state.editable_step()?;
            let mut next = state.clone();
            next.draft.apply_location(latitude, longitude, address);
            Ok(next)
        }

        WizardAction::PhotoCaptured(data_url) => {
            state.editable_step()?;
            let mut next = state.clone();
            next.draft.image_url = data_url;
            Ok(next)
        }

        WizardAction::Next => {
            let step = state.editable_step()?;
            let target = step.next().ok_or(WizardError::NoNextStep)?;
            step.gate(&state.draft)?;

            Ok(WizardState {
                step: Some(target),
                ..state.clone()
            })
        }

        WizardAction::Previous => {
            let step = state.editable_step()?;
            let target = step.previous().ok_or(WizardError::NoPreviousStep)?;

            Ok(WizardState {
                step: Some(target),
                ..state.clone()
            })
        }

        WizardAction::RequestExit { confirmed } => {
            state.editable_step()?;
            if confirmed {
                Ok(WizardState::default())
            } else {
                Ok(state.clone())
            }
        }

        WizardAction::BeginSubmit => {
            let step = state.open_step()?;
            if state.submitting {
                return Err(WizardError::SubmitInFlight);
            }
            if step != WizardStep::Review {
                return Err(WizardError::NotAtReview);
            }
            if !state.draft.has_id() || !state.draft.has_image() {
                return Err(WizardError::IncompleteRecord);
            }

            Ok(WizardState {
                submitting: true,
                ..state.clone()
            })
        }

        WizardAction::SubmitFinished { ok } => {
            state.open_step()?;
            if ok {
                Ok(WizardState::default())
            } else {
                Ok(WizardState {
                    submitting: false,
                    ..state.clone()
                })
            }
        }
    }
}

/// What the form page renders.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub open: bool,
    pub step: u8,
    pub title: Option<&'static str>,
    pub draft: PlantDraft,
    pub submitting: bool,
    pub can_go_back: bool,
    pub qr_scan_available: bool,
}
