//! Contact directory served by the demo binary.
//!
//! `/index` shows a search, a paged contact table with a result count, a
//! form adding contacts and a reload button. Each listener has its own
//! endpoint so it can be refreshed on its own.

#![allow(missing_docs)]

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::component::{FieldKind, FormField, ATTR_KEY};
use trellis::form::FieldErrors;
use trellis::table::{PAGE_NUMBER_PARAM, PAGE_SIZE_PARAM};
use trellis::{
    Component, Request, ServiceError, ServiceRegistry, SubmissionResponse, TableData, Ui,
};

pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub city: String,
}

impl Contact {
    fn new(name: &str, city: &str) -> Self {
        Self {
            name: name.to_owned(),
            city: city.to_owned(),
        }
    }
}

#[must_use]
pub fn sample_contacts() -> Vec<Contact> {
    [
        ("Ada", "London"),
        ("Alan", "Manchester"),
        ("Barbara", "Boston"),
        ("Edsger", "Eindhoven"),
        ("Grace", "Arlington"),
        ("Ken", "Murray Hill"),
        ("Margaret", "Boston"),
        ("Niklaus", "Zurich"),
        ("Tony", "Oxford"),
        ("Donald", "Stanford"),
        ("Frances", "Poughkeepsie"),
        ("John", "Princeton"),
    ]
    .into_iter()
    .map(|(name, city)| Contact::new(name, city))
    .collect()
}

fn matching(contacts: &[Contact], request: &Request<'_>) -> Vec<Contact> {
    let query = request.string_or("q", "").to_lowercase();
    contacts
        .iter()
        .filter(|contact| {
            contact.name.to_lowercase().contains(&query)
                || contact.city.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

fn contact_table(contacts: &[Contact]) -> Result<TableData, ServiceError> {
    let mut table = TableData::new(["Name", "City"])?;
    for contact in contacts {
        table.push_row(vec![Some(contact.name.clone()), Some(contact.city.clone())])?;
    }
    Ok(table)
}

fn contacts_component(
    ui: &Ui,
    contacts: &[Contact],
    request: &Request<'_>,
) -> Result<Component, ServiceError> {
    let found = matching(contacts, request);
    let page = request.int_or(PAGE_NUMBER_PARAM, 1)?;
    let size = request.int_or(PAGE_SIZE_PARAM, PAGE_SIZE as i64)?;
    let size = usize::try_from(size).map_err(|_| ServiceError::InvalidParameter {
        name: PAGE_SIZE_PARAM.into(),
        value: size.to_string().into(),
    })?;
    let table = ui.table_with("Contacts", contact_table(&found)?.page_of(page, size));
    Ok(table.with_source("/contacts")?)
}

fn count_component(
    ui: &Ui,
    contacts: &[Contact],
    request: &Request<'_>,
) -> Result<Component, ServiceError> {
    let found = matching(contacts, request);
    let mut count = ui.paragraph(format!("{} of {} contacts", found.len(), contacts.len()));
    if let Ok(key) = request.string(ATTR_KEY) {
        count.append(ui.text(format!(" (reload {key})")));
    }
    Ok(count.with_source("/count")?)
}

fn index_page(ui: &Ui, contacts: &[Contact]) -> Result<Component, ServiceError> {
    let parameters = trellis::Parameters::new();
    let request = Request::new("/index", &parameters);
    let table = contacts_component(ui, contacts, &request)?;
    let count = count_component(ui, contacts, &request)?;

    let mut search = ui.search("Find", "Search");
    search.add_field(
        FormField::new(FieldKind::Search, "Name or city", "q").with_placeholder("e.g. Boston"),
    )?;
    search.connect_listener(&table)?;
    search.connect_listener(&count)?;

    let mut add = ui.form("Add contact", "/contacts/add");
    add.add_field(FormField::new(FieldKind::String, "Name", "name"))?;
    add.add_field(FormField::new(FieldKind::String, "City", "city"))?;
    add.connect_listener(&table)?;
    add.connect_listener(&count)?;

    let mut reload = ui.refresh_button("Reload");
    reload.set_attribute(ATTR_KEY, "manual")?;
    reload.connect_listener(&count)?;

    let mut page = ui.page("Contacts");
    page.set_parameter("app", "trellis-demo")?;
    Ok(page
        .with_child(search)
        .with_child(count)
        .with_child(table)
        .with_child(add)
        .with_child(reload))
}

/// Registry serving the contact directory, starting from `contacts`.
#[must_use]
pub fn registry(contacts: Vec<Contact>) -> ServiceRegistry {
    let registry = ServiceRegistry::new();
    let contacts = Arc::new(Mutex::new(contacts));

    let shared = Arc::clone(&contacts);
    registry.register_component("/index", move |ui, _| index_page(ui, &shared.lock()));

    let shared = Arc::clone(&contacts);
    registry.register_component("/contacts", move |ui, request| {
        contacts_component(ui, &shared.lock(), request)
    });

    let shared = Arc::clone(&contacts);
    registry.register_component("/count", move |ui, request| {
        count_component(ui, &shared.lock(), request)
    });

    let shared = Arc::clone(&contacts);
    registry.register_form_target("/contacts/add", move |request| {
        let name = request.string_or("name", "").trim();
        let city = request.string_or("city", "").trim();
        let mut errors = FieldErrors::new();
        if name.is_empty() {
            errors.insert("name".to_owned(), "required".to_owned());
        }
        if city.is_empty() {
            errors.insert("city".to_owned(), "required".to_owned());
        }
        if !errors.is_empty() {
            return Ok(SubmissionResponse::rejected("contact not added", errors));
        }
        shared.lock().push(Contact::new(name, city));
        Ok(SubmissionResponse::accepted(format!("added {name}")))
    });

    registry
}
