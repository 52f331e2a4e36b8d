mod common;

use common::*;
use trellis::{ConfigError, MirrorError, SubmitOutcome};

#[test]
fn modal_form_must_be_open_to_use() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let modal = client.find_modal_form("New color").unwrap();
    let not_open = MirrorError::Config(ConfigError::ModalNotOpen(modal.tuid));

    assert_eq!(client.submit(modal.tuid), Err(not_open.clone()));
    assert_eq!(
        client.enter_input(modal.tuid, "color", "green"),
        Err(not_open.clone())
    );
    assert_eq!(client.close_modal(modal.tuid), Err(not_open.clone()));

    client.open_modal(modal.tuid).unwrap();
    assert_eq!(
        client.open_modal(modal.tuid),
        Err(MirrorError::Config(ConfigError::ModalAlreadyOpen(modal.tuid)))
    );
    client.close_modal(modal.tuid).unwrap();
    assert_eq!(client.submit(modal.tuid), Err(not_open));

    assert_eq!(client.fetcher().count(), 0);
    assert_eq!(shop.colors.lock().len(), 0);
}

#[test]
fn accepted_modal_refreshes_listeners_and_closes() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let modal = client.find_modal_form("New color").unwrap();
    client.open_modal(modal.tuid).unwrap();
    client.enter_input(modal.tuid, "color", "green").unwrap();

    let outcome = client.submit(modal.tuid).unwrap();
    let SubmitOutcome::Accepted { message, report } = outcome else {
        panic!("expected acceptance, got {outcome:?}");
    };
    assert_eq!(message.as_deref(), Some("color added"));
    assert_eq!(report.refreshed.len(), 1);
    assert!(report.is_complete());

    assert_eq!(text_of(&client, "/summary"), "18 items, 1 colors");
    assert_eq!(
        client.fetcher().calls_to("/colors"),
        vec![params(&[("color", "green")])]
    );
    // Submitted values are not passed on to listeners.
    assert_eq!(
        client.fetcher().calls_to("/summary"),
        vec![params(&[("session", "s-1")])]
    );

    let state = client.node(modal.tuid).unwrap().form.unwrap();
    assert!(!state.opened);
    assert_eq!(state.message.as_deref(), Some("color added"));
    assert_eq!(
        client.submit(modal.tuid),
        Err(MirrorError::Config(ConfigError::ModalNotOpen(modal.tuid)))
    );
}

#[test]
fn rejected_submission_refreshes_nothing() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let form = client.find_form("Add item").unwrap();

    let outcome = client.submit(form.tuid).unwrap();
    assert!(!outcome.is_accepted());
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected {
            message: Some("invalid input".to_owned()),
            errors: params(&[("name", "required")]),
        }
    );
    assert_eq!(
        client.fetcher().calls(),
        vec![("/add".to_owned(), params(&[("name", ""), ("color", "red")]))]
    );
    let state = client.node(form.tuid).unwrap().form.unwrap();
    assert_eq!(state.errors, params(&[("name", "required")]));
    assert_eq!(shop.items.lock().len(), 18);
}

#[test]
fn accepted_form_refreshes_each_listener_once() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let form = client.find_form("Add item").unwrap();
    assert_eq!(
        client.form_values(form.tuid).unwrap(),
        params(&[("color", "red")])
    );
    client.enter_input(form.tuid, "name", "Item-19").unwrap();
    client.enter_input(form.tuid, "color", "blue").unwrap();

    let outcome = client.submit(form.tuid).unwrap();
    let SubmitOutcome::Accepted { report, .. } = outcome else {
        panic!("expected acceptance, got {outcome:?}");
    };
    assert_eq!(report.refreshed.len(), 2);

    let recorder = client.fetcher();
    assert_eq!(
        recorder.calls_to("/add"),
        vec![params(&[("name", "Item-19"), ("color", "blue")])]
    );
    assert_eq!(recorder.calls_to("/items").len(), 1);
    assert_eq!(recorder.calls_to("/summary").len(), 1);
    assert_eq!(recorder.count(), 3);

    let table = client.find_table("Items").unwrap();
    assert_eq!(table.table().unwrap().total_row_count(), 19);
    assert_eq!(text_of(&client, "/summary"), "19 items, 0 colors");
    assert_eq!(shop.items.lock()[18].color, "blue");
}

#[test]
fn search_filter_applies_to_rows_added_later() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let search = client.find_search("Filter").unwrap();
    client.enter_input(search.tuid, "name", "Item-1").unwrap();
    client.submit_search(search.tuid).unwrap();

    let form = client.find_form("Add item").unwrap();
    client.enter_input(form.tuid, "name", "Item-19").unwrap();
    client.submit(form.tuid).unwrap();

    let table = client.find_table("Items").unwrap();
    assert_eq!(table.table().unwrap().total_row_count(), 11);
    assert_eq!(text_of(&client, "/summary"), "11 items, 0 colors");
}

#[test]
fn unknown_inputs_are_rejected() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let form = client.find_form("Add item").unwrap();
    assert_eq!(
        client.enter_input(form.tuid, "price", "3"),
        Err(MirrorError::Config(ConfigError::UnknownInput {
            form: form.tuid,
            name: "price".into()
        }))
    );
}

#[test]
fn actions_are_checked_against_the_component_kind() {
    let shop = Shop::new();
    let client = open_shop(&shop);
    let search = client.find_search("Filter").unwrap();
    assert_eq!(
        client.submit(search.tuid),
        Err(MirrorError::Config(ConfigError::UnsupportedAction {
            tuid: search.tuid,
            kind: "search_form".into(),
            action: "submit",
        }))
    );
    let form = client.find_form("Add item").unwrap();
    assert!(client.open_modal(form.tuid).unwrap_err().is_configuration_fault());
    let table = client.find_table("Items").unwrap();
    assert!(client
        .enter_input(table.tuid, "name", "x")
        .unwrap_err()
        .is_configuration_fault());
    assert_eq!(client.fetcher().count(), 0);
}

#[test]
fn accepted_form_can_open_another_page() {
    let shop = Shop::new();
    let client = open_page(&shop, "/signup-page");
    let form = client.find_form("Sign up").unwrap();
    client.enter_input(form.tuid, "user", "ann").unwrap();

    let outcome = client.submit(form.tuid).unwrap();
    assert_eq!(
        client.fetcher().calls_to("/signup"),
        vec![params(&[("user", "ann"), ("plan", "free")])]
    );
    assert_eq!(
        outcome,
        SubmitOutcome::Navigated {
            endpoint: "/welcome".to_owned(),
            parameters: params(&[("user", "ann")]),
        }
    );
    // Only what the target returned: no hidden form values, no old session.
    assert_eq!(
        client.fetcher().calls_to("/welcome"),
        vec![params(&[("user", "ann")])]
    );
    let page = client.page().unwrap();
    assert!(client.session_parameters().unwrap().is_empty());
    assert_eq!(page.title(), Some("Welcome"));
    assert_eq!(page.children[0].text(), "welcome ann");
    assert!(client.find_form("Sign up").is_err());
}
