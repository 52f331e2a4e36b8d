#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::component::{FieldKind, FormField, ATTR_KEY, ATTR_OPENS_PAGE_SOURCE, ATTR_SOURCE};
use trellis::form::FieldErrors;
use trellis::table::{PAGE_NUMBER_PARAM, PAGE_SIZE_PARAM};
use trellis::mirror::MirrorNode;
use trellis::{
    Component, Document, FetchError, Fetcher, MirrorClient, Parameters, Request, ServiceError,
    ServiceRegistry, SubmissionResponse, TableData, Ui,
};

pub const PAGE_SIZE: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: usize,
    pub name: String,
    pub color: String,
}

pub fn items(count: usize) -> Vec<Item> {
    (1..=count)
        .map(|id| Item {
            id,
            name: format!("Item-{id}"),
            color: if id % 2 == 0 { "blue" } else { "red" }.to_string(),
        })
        .collect()
}

pub fn params(pairs: &[(&str, &str)]) -> Parameters {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

fn matching(items: &[Item], request: &Request<'_>) -> Vec<Item> {
    let name = request.string_or("name", "");
    let color = request.string_or("color", "");
    items
        .iter()
        .filter(|item| item.name.contains(name) && (color.is_empty() || item.color == color))
        .cloned()
        .collect()
}

pub fn items_table(items: &[Item]) -> TableData {
    let mut data = TableData::new(["Id", "Name", "Color"]).unwrap();
    for item in items {
        data.push_row(vec![
            Some(item.id.to_string()),
            Some(item.name.clone()),
            Some(item.color.clone()),
        ])
        .unwrap();
    }
    data
}

fn with_source(mut component: Component, source: &str) -> Component {
    component
        .attributes
        .insert(ATTR_SOURCE.to_owned(), source.to_owned());
    component
}

fn summary_text(items: usize, colors: usize) -> String {
    format!("{items} items, {colors} colors")
}

/// Demo backend: a searchable, paged item table with a picker, a detail
/// paragraph, an add form, a color modal and a reload button.
pub struct Shop {
    pub registry: Arc<ServiceRegistry>,
    pub items: Arc<Mutex<Vec<Item>>>,
    pub colors: Arc<Mutex<Vec<String>>>,
}

impl Shop {
    pub fn new() -> Self {
        Self::with_items(items(18))
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        let shop = Self {
            registry: Arc::new(ServiceRegistry::new()),
            items: Arc::new(Mutex::new(items)),
            colors: Arc::new(Mutex::new(Vec::new())),
        };
        shop.register_index();
        shop.register_fragments();
        shop.register_targets();
        shop.register_fragile();
        shop.register_console();
        shop
    }

    fn register_index(&self) {
        let items = Arc::clone(&self.items);
        let colors = Arc::clone(&self.colors);
        self.registry.register_component("/index", move |ui, _| {
            Ok(build_index(ui, &items.lock(), colors.lock().len()))
        });
    }

    fn register_fragments(&self) {
        let items = Arc::clone(&self.items);
        self.registry.register_component("/items", move |ui, request| {
            let found = matching(&items.lock(), request);
            let page = request.int_or(PAGE_NUMBER_PARAM, 1)?;
            let size = request.int_or(PAGE_SIZE_PARAM, PAGE_SIZE as i64)?;
            let size = usize::try_from(size)
                .map_err(|_| ServiceError::failed(format!("bad page size {size}")))?;
            Ok(with_source(
                ui.table_with("Items", items_table(&found).page_of(page, size)),
                "/items",
            ))
        });

        let items = Arc::clone(&self.items);
        let colors = Arc::clone(&self.colors);
        self.registry.register_component("/summary", move |ui, request| {
            let found = matching(&items.lock(), request);
            let mut summary = ui.paragraph(summary_text(found.len(), colors.lock().len()));
            if request.has(ATTR_KEY) {
                summary.append(ui.text(format!(" (reloaded by {})", request.string(ATTR_KEY)?)));
            }
            Ok(with_source(summary, "/summary"))
        });

        let items = Arc::clone(&self.items);
        self.registry.register_component("/pick", move |ui, _| {
            let items = items.lock();
            let shown = &items[..items.len().min(3)];
            Ok(with_source(ui.table_picker_with("Pick", items_table(shown)), "/pick"))
        });

        self.registry.register_component("/detail", |ui, request| {
            let text = match request.string("Name") {
                Ok(name) => format!("selected: {name}"),
                Err(_) => "nothing selected".to_owned(),
            };
            Ok(with_source(ui.paragraph(text), "/detail"))
        });

        self.registry.register_component("/welcome", |ui, request| {
            let mut page = ui.page("Welcome");
            page.append(ui.paragraph(format!("welcome {}", request.string_or("user", "stranger"))));
            Ok(page)
        });
    }

    fn register_targets(&self) {
        let items = Arc::clone(&self.items);
        self.registry.register_form_target("/add", move |request| {
            let name = request.string_or("name", "").trim().to_owned();
            if name.is_empty() {
                return Ok(SubmissionResponse::rejected("invalid input", FieldErrors::new())
                    .with_error("name", "required"));
            }
            let mut items = items.lock();
            let id = items.len() + 1;
            items.push(Item {
                id,
                name,
                color: request.string_or("color", "red").to_owned(),
            });
            Ok(SubmissionResponse::accepted("item added"))
        });

        let colors = Arc::clone(&self.colors);
        self.registry.register_form_target("/colors", move |request| {
            colors.lock().push(request.string("color")?.to_owned());
            Ok(SubmissionResponse::accepted("color added"))
        });

        self.registry.register_form_target("/signup", |request| {
            let user = request.string("user")?;
            Ok(SubmissionResponse::accepted_with_parameters(params(&[("user", user)])))
        });

        self.registry.register_component("/signup-page", |ui, _| {
            let mut form = ui.form("Sign up", "/signup");
            form.add_field(FormField::new(FieldKind::String, "User", "user"))
                .map_err(|err| ServiceError::failed(err.to_string()))?;
            form.attributes
                .insert(ATTR_OPENS_PAGE_SOURCE.to_owned(), "/welcome".to_owned());
            form.set_parameter("plan", "free")?;
            let mut page = ui.page("Sign up");
            page.set_parameter("session", "s-3")?;
            Ok(page.with_child(form))
        });
    }

    /// A page whose listeners fail in different ways.
    fn register_fragile(&self) {
        self.registry.register("/broken", |_: &Ui, _: &Request<'_>| {
            Err::<Document, _>(ServiceError::failed("database unavailable"))
        });
        self.registry.register("/garbage", |_: &Ui, _: &Request<'_>| {
            Ok::<_, ServiceError>(serde_json::json!({ "type": "carousel", "tuid": "1" }))
        });
        self.registry.register_component("/fragile", |ui, _| {
            let healthy = with_source(ui.paragraph("healthy"), "/healthy");
            let broken = with_source(ui.paragraph("broken, initial"), "/broken");
            let garbage = with_source(ui.paragraph("garbage, initial"), "/garbage");
            let mut reload = ui.refresh_button("Reload all");
            for listener in [&healthy, &broken, &garbage] {
                reload
                    .connect_listener(listener)
                    .map_err(|err| ServiceError::failed(err.to_string()))?;
            }
            Ok(ui
                .page("Fragile")
                .with_child(reload)
                .with_child(healthy)
                .with_child(broken)
                .with_child(garbage))
        });
        self.registry.register_component("/healthy", |ui, _| {
            Ok(with_source(ui.paragraph("healthy, refreshed"), "/healthy"))
        });
    }
}

impl Shop {
    /// Tabbed console: a paged log answered with `table-data` fragments, a
    /// monitor field set, an export button and a listener whose source
    /// answers with a section.
    fn register_console(&self) {
        let items = Arc::clone(&self.items);
        self.registry.register_component("/log", move |ui, request| {
            let page = request.int_or(PAGE_NUMBER_PARAM, 1)?;
            let size = request.int_or(PAGE_SIZE_PARAM, 5)?;
            let size = usize::try_from(size)
                .map_err(|_| ServiceError::failed(format!("bad page size {size}")))?;
            Ok(ui.table_data(items_table(&items.lock()).page_of(page, size)))
        });
        self.registry.register_component("/health", |ui, request| {
            let queue = request.string_or("queue", "RED");
            Ok(health(ui, queue).with_source("/health")?)
        });
        self.registry.register_component("/morph", |ui, _| Ok(ui.section("Not a listener")));
        self.registry.register("/export", |_: &Ui, request: &Request<'_>| {
            Ok::<_, ServiceError>(serde_json::json!({
                "file": "items.csv",
                "format": request.string_or("format", "txt"),
            }))
        });

        let items = Arc::clone(&self.items);
        self.registry.register_component("/console", move |ui, _| {
            let log = ui
                .table_with("Log", items_table(&items.lock()).page_of(1, 5))
                .with_source("/log")?;
            let monitor = health(ui, "GREEN").with_source("/health")?;
            let morph = ui.paragraph("stable").with_source("/morph")?;

            let mut refresh = ui.refresh_button("Refresh");
            refresh.set_parameter("queue", "RED")?;
            refresh.connect_listener(&log)?;
            refresh.connect_listener(&monitor)?;
            refresh.connect_listener(&morph)?;

            let mut export = ui.download_button("Export", "/export", "items.csv");
            export.set_parameter("format", "csv")?;

            let mut tabs = ui.tabbed_flow();
            tabs.append(ui.tab("Log").with_child(log));
            tabs.append(ui.tab("Health").with_child(monitor).with_child(morph));
            Ok(ui
                .page("Console")
                .with_child(refresh)
                .with_child(export)
                .with_child(tabs))
        });
    }
}

fn health(ui: &Ui, queue: &str) -> Component {
    ui.monitor_fieldset("Health", 5)
        .with_child(ui.monitor_field("db", "GREEN", "up"))
        .with_child(ui.monitor_field("queue", queue, queue.to_lowercase()))
}

pub fn build_index(ui: &Ui, items: &[Item], colors: usize) -> Component {
    let mut page = ui.page("Shop");
    page.set_parameter("session", "s-1").unwrap();

    let table = ui
        .table_with("Items", items_table(items).page_of(1, PAGE_SIZE))
        .with_source("/items")
        .unwrap();
    let summary = ui
        .paragraph(summary_text(items.len(), colors))
        .with_source("/summary")
        .unwrap();
    let detail = ui
        .paragraph("nothing selected")
        .with_source("/detail")
        .unwrap();

    let mut picker = ui
        .table_picker_with("Pick", items_table(&items[..items.len().min(3)]))
        .with_source("/pick")
        .unwrap();
    picker.connect_listener(&detail).unwrap();

    let mut search = ui.search("Filter", "Search");
    search
        .add_field(FormField::new(FieldKind::Search, "Name", "name"))
        .unwrap();
    search.set_parameter("scope", "all").unwrap();
    search.connect_listener(&table).unwrap();
    search.connect_listener(&summary).unwrap();

    let mut form = ui.form("Add item", "/add");
    form.add_field(FormField::new(FieldKind::String, "Name", "name"))
        .unwrap();
    form.add_field(FormField::new(FieldKind::String, "Color", "color").with_initial_value("red"))
        .unwrap();
    form.connect_listener(&table).unwrap();
    form.connect_listener(&summary).unwrap();

    let mut modal = ui.modal_form("New color", "Add color", "/colors");
    modal
        .add_field(FormField::new(FieldKind::String, "Color", "color"))
        .unwrap();
    modal.connect_listener(&summary).unwrap();

    let mut reload = ui.refresh_button("Reload");
    reload.set_attribute(ATTR_KEY, "k1").unwrap();
    reload.connect_listener(&summary).unwrap();

    page.append(search);
    page.append(table);
    page.append(summary);
    page.append(picker);
    page.append(detail);
    page.append(form);
    page.append(modal);
    page.append(reload);
    page
}

/// Fetcher wrapper recording every call.
pub struct Recorder<F> {
    inner: F,
    calls: Mutex<Vec<(String, Parameters)>>,
}

impl<F> Recorder<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Parameters)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Parameters> {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| called == endpoint)
            .map(|(_, parameters)| parameters.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl<F: Fetcher> Fetcher for Recorder<F> {
    fn fetch(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError> {
        self.calls
            .lock()
            .push((endpoint.to_owned(), parameters.clone()));
        self.inner.fetch(endpoint, parameters)
    }
}

pub type ShopClient = MirrorClient<Recorder<Arc<ServiceRegistry>>>;

/// Mirror client with `/index` opened and the recorder cleared.
pub fn open_shop(shop: &Shop) -> ShopClient {
    open_page(shop, "/index")
}

pub fn open_page(shop: &Shop, endpoint: &str) -> ShopClient {
    let client = MirrorClient::new(Recorder::new(Arc::clone(&shop.registry)));
    client.open(endpoint).unwrap();
    client.fetcher().clear();
    client
}

/// The single node currently bound to `source`.
pub fn by_source(client: &ShopClient, source: &str) -> MirrorNode {
    let mut found = client
        .find_all(|node| node.attribute(ATTR_SOURCE) == Some(source))
        .unwrap();
    assert_eq!(found.len(), 1, "expected one node bound to {source}");
    found.remove(0)
}

pub fn text_of(client: &ShopClient, source: &str) -> String {
    by_source(client, source).to_component().text()
}

/// Id column of the visible rows.
pub fn visible_ids(node: &MirrorNode) -> Vec<String> {
    let table = node.table().unwrap();
    (0..table.len())
        .map(|row| table.cell(row, "Id").unwrap().to_owned())
        .collect()
}

pub fn ids(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|id| id.to_string()).collect()
}
