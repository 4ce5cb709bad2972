use chrono::Utc;
use indomitum_inventory::{
    entities::{location::GeocodedAddress, plant::DraftPatch},
    errors::WizardError,
    use_cases::wizard::{transition, WizardAction, WizardState, WizardStep},
};

mod test_plant;
use test_plant::*;

fn open_new() -> WizardState {
    transition(&WizardState::default(), WizardAction::OpenNew {
        uid: OWNER.into(),
        now: Utc::now(),
    })
    .unwrap()
}

fn apply(state: &WizardState, action: WizardAction) -> WizardState {
    transition(state, action).unwrap()
}

fn with_id_and_image(state: &WizardState) -> WizardState {
    apply(state, WizardAction::Update(DraftPatch {
        id: Some("P-001".into()),
        image_url: Some("data:image/png;base64,AAAA".into()),
        ..DraftPatch::default()
    }))
}

fn at_review() -> WizardState {
    let mut state = with_id_and_image(&open_new());
    state = apply(&state, WizardAction::Update(DraftPatch {
        address: Some("12 Fern Street".into()),
        ..DraftPatch::default()
    }));
    for _ in 0..3 {
        state = apply(&state, WizardAction::Next);
    }
    state
}

#[test]
fn opening_new_form_starts_at_identify_with_owner_and_timestamp() {
    let state = open_new();

    assert_eq!(state.step, Some(WizardStep::Identify));
    assert_eq!(state.step_number(), 1);
    assert_eq!(state.draft.added_by, OWNER);
    assert!(state.draft.date_uploaded.is_some());
    assert!(state.draft.id.is_empty());
}

#[test]
fn opening_edit_copies_record_and_keeps_original_owner() {
    let record = plant("P-7").added_by(OTHER).located(38.7, -9.1).build();
    let state = transition(&WizardState::default(), WizardAction::OpenEdit {
        record: Box::new(record.clone()),
        uid: OWNER.into(),
        now: Utc::now(),
    })
    .unwrap();

    assert_eq!(state.step, Some(WizardStep::Identify));
    assert_eq!(state.draft.id, "P-7");
    assert_eq!(state.draft.added_by, OTHER);
    assert_eq!(state.draft.latitude, "38.7");
    assert_eq!(state.draft.date_uploaded, record.date_uploaded);
}

#[test]
fn opening_twice_is_rejected() {
    let state = open_new();
    let result = transition(&state, WizardAction::OpenNew { uid: OWNER.into(), now: Utc::now() });
    assert_eq!(result, Err(WizardError::AlreadyOpen));
}

#[test]
fn identify_step_requires_plant_id() {
    let state = open_new();
    let result = transition(&state, WizardAction::Next);

    assert_eq!(result, Err(WizardError::MissingPlantId));
    assert_eq!(
        WizardError::MissingPlantId.to_string(),
        "The Plant ID must be scanned or manually entered to proceed."
    );
}

#[test]
fn whitespace_id_does_not_pass_the_gate() {
    let state = apply(&open_new(), WizardAction::Update(DraftPatch {
        id: Some("   ".into()),
        ..DraftPatch::default()
    }));
    assert_eq!(transition(&state, WizardAction::Next), Err(WizardError::MissingPlantId));
}

#[test]
fn detail_step_requires_image() {
    let state = apply(&open_new(), WizardAction::ScanSucceeded("P-001".into()));
    let state = apply(&state, WizardAction::Next);

    assert_eq!(state.step, Some(WizardStep::Detail));
    assert_eq!(transition(&state, WizardAction::Next), Err(WizardError::MissingImage));
}

#[test]
fn location_step_accepts_address_or_coordinates() {
    let state = with_id_and_image(&open_new());
    let state = apply(&apply(&state, WizardAction::Next), WizardAction::Next);
    assert_eq!(state.step, Some(WizardStep::Location));
    assert_eq!(transition(&state, WizardAction::Next), Err(WizardError::MissingLocation));

    let by_address = apply(&state, WizardAction::Update(DraftPatch {
        address: Some("Manual address".into()),
        ..DraftPatch::default()
    }));
    assert_eq!(apply(&by_address, WizardAction::Next).step, Some(WizardStep::Review));

    let by_coordinates = apply(&state, WizardAction::LocationCaptured {
        latitude: 51.5,
        longitude: -0.12,
        address: GeocodedAddress::default(),
    });
    assert_eq!(by_coordinates.draft.latitude, "51.5");
    assert_eq!(apply(&by_coordinates, WizardAction::Next).step, Some(WizardStep::Review));
}

#[test]
fn captured_location_fills_address_fields() {
    let state = apply(&open_new(), WizardAction::LocationCaptured {
        latitude: 48.85,
        longitude: 2.35,
        address: GeocodedAddress {
            address: "Paris, France".into(),
            city: "Paris".into(),
            country: "France".into(),
            zip: "75001".into(),
        },
    });

    assert_eq!(state.draft.longitude, "2.35");
    assert_eq!(state.draft.city, "Paris");
    assert_eq!(state.draft.country, "France");
    assert_eq!(state.draft.zip, "75001");
}

#[test]
fn previous_keeps_draft_and_is_rejected_on_first_step() {
    let state = with_id_and_image(&open_new());
    let state = apply(&state, WizardAction::Next);
    let back = apply(&state, WizardAction::Previous);

    assert_eq!(back.step, Some(WizardStep::Identify));
    assert_eq!(back.draft.id, "P-001");
    assert_eq!(transition(&back, WizardAction::Previous), Err(WizardError::NoPreviousStep));
}

#[test]
fn next_from_review_is_rejected() {
    let state = at_review();
    assert_eq!(state.step, Some(WizardStep::Review));
    assert_eq!(transition(&state, WizardAction::Next), Err(WizardError::NoNextStep));
}

#[test]
fn submit_only_from_review() {
    let state = with_id_and_image(&open_new());
    assert_eq!(transition(&state, WizardAction::BeginSubmit), Err(WizardError::NotAtReview));
}

#[test]
fn submit_requires_id_and_image_even_at_review() {
    let state = at_review();
    let stripped = apply(&state, WizardAction::Update(DraftPatch {
        image_url: Some(String::new()),
        ..DraftPatch::default()
    }));

    assert_eq!(transition(&stripped, WizardAction::BeginSubmit), Err(WizardError::IncompleteRecord));
}

#[test]
fn second_submit_while_in_flight_is_rejected() {
    let submitting = apply(&at_review(), WizardAction::BeginSubmit);

    assert!(submitting.submitting);
    assert_eq!(transition(&submitting, WizardAction::BeginSubmit), Err(WizardError::SubmitInFlight));
    assert_eq!(transition(&submitting, WizardAction::Previous), Err(WizardError::SubmitInFlight));
    assert_eq!(
        transition(&submitting, WizardAction::Update(DraftPatch::default())),
        Err(WizardError::SubmitInFlight)
    );
}

#[test]
fn successful_submit_closes_and_resets() {
    let submitting = apply(&at_review(), WizardAction::BeginSubmit);
    let done = apply(&submitting, WizardAction::SubmitFinished { ok: true });

    assert_eq!(done, WizardState::default());
    assert!(!done.is_open());
}

#[test]
fn failed_submit_stays_on_review_with_draft() {
    let submitting = apply(&at_review(), WizardAction::BeginSubmit);
    let failed = apply(&submitting, WizardAction::SubmitFinished { ok: false });

    assert_eq!(failed.step, Some(WizardStep::Review));
    assert!(!failed.submitting);
    assert_eq!(failed.draft.id, "P-001");
}

#[test]
fn exit_needs_confirmation_to_discard() {
    let state = with_id_and_image(&open_new());

    let kept = apply(&state, WizardAction::RequestExit { confirmed: false });
    assert_eq!(kept, state);

    let closed = apply(&state, WizardAction::RequestExit { confirmed: true });
    assert_eq!(closed, WizardState::default());
}

#[test]
fn actions_on_closed_form_are_rejected() {
    let closed = WizardState::default();
    assert_eq!(transition(&closed, WizardAction::Next), Err(WizardError::NotOpen));
    assert_eq!(
        transition(&closed, WizardAction::ScanSucceeded("x".into())),
        Err(WizardError::NotOpen)
    );
}

#[test]
fn view_offers_scanning_only_on_first_step_of_mobile_clients() {
    let state = open_new();
    let view = state.view(true);
    assert!(view.qr_scan_available);
    assert_eq!(view.title, Some("Scan Plant ID"));
    assert!(!view.can_go_back);
    assert!(!state.view(false).qr_scan_available);

    let review = at_review().view(true);
    assert!(!review.qr_scan_available);
    assert_eq!(review.title, Some("Review & Submit"));
    assert!(review.can_go_back);
}
