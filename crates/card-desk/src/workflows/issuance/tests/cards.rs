use super::common::*;

use crate::workflows::issuance::domain::{CardEvent, CardStatus};
use crate::workflows::issuance::service::{CardEventRequest, IssuanceError};

fn event(event: CardEvent) -> CardEventRequest {
    CardEventRequest { event }
}

#[test]
fn events_advance_in_strict_order_with_monotonic_timestamps() {
    let (service, _) = build_service();
    let catalog = catalog();

    let application = approved_application(&service, &catalog);
    let card = service.ensure_card(&application.id).expect("card created");
    assert_eq!(card.status, CardStatus::Created);

    let card = service
        .apply_card_event(&card.id, event(CardEvent::Issued))
        .expect("issued");
    let card = service
        .apply_card_event(&card.id, event(CardEvent::Delivered))
        .expect("delivered");
    let card = service
        .apply_card_event(&card.id, event(CardEvent::Handed))
        .expect("handed");
    let card = service
        .apply_card_event(&card.id, event(CardEvent::Activated))
        .expect("activated");

    assert_eq!(card.status, CardStatus::Activated);
    let issued = card.issued_at.expect("issued_at set");
    let delivered = card.delivered_at.expect("delivered_at set");
    let handed = card.handed_at.expect("handed_at set");
    let activated = card.activated_at.expect("activated_at set");
    assert!(issued <= delivered);
    assert!(delivered <= handed);
    assert!(handed <= activated);
}

#[test]
fn skipping_a_stage_fails_and_leaves_state_untouched() {
    let (service, _) = build_service();
    let catalog = catalog();

    let application = approved_application(&service, &catalog);
    let card = service.ensure_card(&application.id).expect("card created");
    let card = service
        .apply_card_event(&card.id, event(CardEvent::Issued))
        .expect("issued");

    let error = service
        .apply_card_event(&card.id, event(CardEvent::Handed))
        .expect_err("cannot hand an undelivered card");
    assert!(matches!(error, IssuanceError::Transition(_)));

    let card = service.get_card(&card.id).expect("card present");
    assert_eq!(card.status, CardStatus::Issued);
    assert!(card.delivered_at.is_none());
    assert!(card.handed_at.is_none());
}

#[test]
fn events_are_not_reversible() {
    let (service, _) = build_service();
    let catalog = catalog();

    let application = approved_application(&service, &catalog);
    let card = service.ensure_card(&application.id).expect("card created");
    let card = service
        .apply_card_event(&card.id, event(CardEvent::Issued))
        .expect("issued");
    let card = service
        .apply_card_event(&card.id, event(CardEvent::Delivered))
        .expect("delivered");

    let error = service
        .apply_card_event(&card.id, event(CardEvent::Issued))
        .expect_err("no going back");
    assert!(matches!(error, IssuanceError::Transition(_)));
}

#[test]
fn close_is_legal_from_any_state_except_closed() {
    let (service, _) = build_service();
    let catalog = catalog();

    let fresh = approved_application(&service, &catalog);
    let fresh_card = service.ensure_card(&fresh.id).expect("card created");
    let closed = service.close_card(&fresh_card.id).expect("closed from CREATED");
    assert_eq!(closed.status, CardStatus::Closed);
    assert!(closed.closed_at.is_some());

    let error = service
        .close_card(&fresh_card.id)
        .expect_err("already closed");
    assert!(matches!(error, IssuanceError::Transition(_)));

    let activated = approved_application(&service, &catalog);
    let card = service.ensure_card(&activated.id).expect("card created");
    for step in [
        CardEvent::Issued,
        CardEvent::Delivered,
        CardEvent::Handed,
        CardEvent::Activated,
    ] {
        service.apply_card_event(&card.id, event(step)).expect("advances");
    }
    let closed = service.close_card(&card.id).expect("closed from ACTIVATED");
    assert_eq!(closed.status, CardStatus::Closed);
    assert!(closed.activated_at.is_some(), "history kept");
}

#[test]
fn closed_card_accepts_no_events() {
    let (service, _) = build_service();
    let catalog = catalog();

    let application = approved_application(&service, &catalog);
    let card = service.ensure_card(&application.id).expect("card created");
    service.close_card(&card.id).expect("closed");

    let error = service
        .apply_card_event(&card.id, event(CardEvent::Issued))
        .expect_err("closed is terminal");
    assert!(matches!(error, IssuanceError::Transition(_)));
}
