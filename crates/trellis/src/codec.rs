//! Wire-format codec.
//!
//! A document is a JSON object tagged with `type` and `tuid`. Plain attributes
//! sit next to them as strings; children live under `content` (`fields` for
//! a monitor field set); tables, inputs and parameter maps use their own
//! reserved keys.

#![allow(missing_docs)]

use serde_json::{Map, Value};
use smol_str::SmolStr;
use tracing::warn;

use crate::component::{
    is_reserved_key, Body, BodyShape, Component, FieldKind, FormField, Inputs, Kind,
};
use crate::error::CodecError;
use crate::refresh::Parameters;
use crate::table::{Cell, Pagination, TableData};
use crate::tuid::Tuid;

/// Wire-format document.
pub type Document = Value;

const KEY_TYPE: &str = "type";
const KEY_TUID: &str = "tuid";
const KEY_THEAD: &str = "thead";
const KEY_TBODY: &str = "tbody";
const KEY_TABLE_SIZE: &str = "tableSize";
const KEY_PAGE_NUMBER: &str = "pageNumber";
const KEY_PAGE_SIZE: &str = "pageSize";
const KEY_LAST_PAGE_NUMBER: &str = "lastPageNumber";
const KEY_FIRST_ITEM_NUMBER: &str = "firstItemNumber";
const KEY_LAST_ITEM_NUMBER: &str = "lastItemNumber";
const KEY_INPUTS: &str = "inputs";
const KEY_PARAMETERS: &str = "parameters";
const KEY_SESSION_PARAMETERS: &str = "sessionParameters";
const KEY_OPTIONS: &str = "options";

#[must_use]
pub fn serialize(component: &Component) -> Document {
    let mut map = Map::new();
    map.insert(KEY_TYPE.into(), component.kind.tag().into());
    map.insert(KEY_TUID.into(), component.tuid.to_string().into());
    for (key, value) in &component.attributes {
        map.insert(key.clone(), value.clone().into());
    }
    match &component.body {
        Body::Nothing => {}
        Body::Table(table) => write_table(&mut map, table),
        Body::Inputs(inputs) => {
            let fields = inputs.fields.iter().map(write_field).collect();
            map.insert(KEY_INPUTS.into(), Value::Array(fields));
            map.insert(KEY_PARAMETERS.into(), write_parameters(&inputs.parameters));
        }
        Body::Parameters(parameters) => {
            let key = parameters_key(component.kind);
            map.insert(key.into(), write_parameters(parameters));
        }
    }
    if !component.children.is_empty() {
        let children = component.children.iter().map(serialize).collect();
        map.insert(component.kind.children_key().into(), Value::Array(children));
    }
    Value::Object(map)
}

#[must_use]
pub fn to_string(component: &Component) -> String {
    serialize(component).to_string()
}

fn parameters_key(kind: Kind) -> &'static str {
    if kind.is_page() {
        KEY_SESSION_PARAMETERS
    } else {
        KEY_PARAMETERS
    }
}

fn write_table(map: &mut Map<String, Value>, table: &TableData) {
    map.insert(
        KEY_TABLE_SIZE.into(),
        table.total_row_count().to_string().into(),
    );
    if let Some(window) = table.page() {
        for (key, value) in [
            (KEY_PAGE_NUMBER, window.page_number),
            (KEY_PAGE_SIZE, window.page_size),
            (KEY_LAST_PAGE_NUMBER, window.last_page_number),
            (KEY_FIRST_ITEM_NUMBER, window.first_item_number),
            (KEY_LAST_ITEM_NUMBER, window.last_item_number),
        ] {
            map.insert(key.into(), value.to_string().into());
        }
    }
    let thead = table
        .columns()
        .iter()
        .map(|column| Value::String(column.to_string()))
        .collect();
    map.insert(KEY_THEAD.into(), Value::Array(thead));
    let tbody = table
        .rows()
        .iter()
        .map(|row| {
            Value::Array(
                row.iter()
                    .map(|cell| cell.clone().map_or(Value::Null, Value::String))
                    .collect(),
            )
        })
        .collect();
    map.insert(KEY_TBODY.into(), Value::Array(tbody));
}

fn write_field(field: &FormField) -> Value {
    let mut map = Map::new();
    map.insert(KEY_TYPE.into(), field.kind.tag().into());
    map.insert("label".into(), field.label.clone().into());
    map.insert("name".into(), field.name.clone().into());
    if let Some(value) = &field.initial_value {
        map.insert("initialValue".into(), value.clone().into());
    }
    if let Some(placeholder) = &field.placeholder {
        map.insert("placeholder".into(), placeholder.clone().into());
    }
    if field.kind.has_options() {
        map.insert(KEY_OPTIONS.into(), write_parameters(&field.options));
    }
    Value::Object(map)
}

fn write_parameters(parameters: &Parameters) -> Value {
    Value::Object(
        parameters
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect(),
    )
}

/// Decodes a component tree. Children are decoded depth-first in order.
pub fn parse(document: &Document) -> Result<Component, CodecError> {
    let map = as_object(document, "document")?;
    let tag = required_str(map, KEY_TYPE)?;
    let kind = tag.parse::<Kind>()?;
    let tuid = read_tuid(map)?;

    let mut component = Component::new(tuid, kind);
    for (key, value) in map {
        if is_reserved_key(key) {
            continue;
        }
        match value {
            Value::String(text) => {
                component.attributes.insert(key.clone(), text.clone());
            }
            Value::Number(number) => {
                component.attributes.insert(key.clone(), number.to_string());
            }
            Value::Bool(flag) => {
                component.attributes.insert(key.clone(), flag.to_string());
            }
            Value::Null => {}
            Value::Array(_) | Value::Object(_) => {
                warn!(%tuid, key = %key, "skipping attribute with non-scalar value");
            }
        }
    }

    component.body = match kind.body_shape() {
        BodyShape::Nothing => Body::Nothing,
        BodyShape::Table => Body::Table(read_table(map)?),
        BodyShape::Inputs => Body::Inputs(read_inputs(map)?),
        BodyShape::Parameters => {
            Body::Parameters(read_parameters(map, parameters_key(kind))?.unwrap_or_default())
        }
    };

    let children_key = kind.children_key();
    if let Some(content) = map.get(children_key) {
        let children = as_array(content, children_key)?;
        component.children = children.iter().map(parse).collect::<Result<_, _>>()?;
    }
    Ok(component)
}

/// Decodes raw JSON text.
pub fn parse_str(text: &str) -> Result<Component, CodecError> {
    let document: Document = serde_json::from_str(text)?;
    parse(&document)
}

/// Decodes a document that must be a page or a tabbed page.
pub fn parse_page(document: &Document) -> Result<Component, CodecError> {
    let page = parse(document)?;
    if !page.kind.is_page() {
        return Err(CodecError::NotAPage(page.kind.tag().into()));
    }
    Ok(page)
}

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, CodecError> {
    value.as_object().ok_or_else(|| CodecError::InvalidField {
        field: field.into(),
        expected: "an object",
    })
}

fn as_array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, CodecError> {
    value.as_array().ok_or_else(|| CodecError::InvalidField {
        field: field.into(),
        expected: "an array",
    })
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str, CodecError> {
    let value = map
        .get(key)
        .ok_or_else(|| CodecError::MissingField(key.into()))?;
    value.as_str().ok_or_else(|| CodecError::InvalidField {
        field: key.into(),
        expected: "a string",
    })
}

fn read_tuid(map: &Map<String, Value>) -> Result<Tuid, CodecError> {
    match map.get(KEY_TUID) {
        Some(Value::String(text)) => text.parse(),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(Tuid::new)
            .ok_or_else(|| CodecError::InvalidTuid(number.to_string().into())),
        Some(_) => Err(CodecError::InvalidField {
            field: KEY_TUID.into(),
            expected: "a string or an integer",
        }),
        None => Err(CodecError::MissingField(KEY_TUID.into())),
    }
}

/// Counts may arrive as decimal strings or as JSON integers.
fn read_count(map: &Map<String, Value>, key: &str) -> Result<Option<usize>, CodecError> {
    let invalid = || CodecError::InvalidField {
        field: key.into(),
        expected: "a non-negative integer",
    };
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => text.trim().parse().map(Some).map_err(|_| invalid()),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

fn read_table(map: &Map<String, Value>) -> Result<TableData, CodecError> {
    let thead = map
        .get(KEY_THEAD)
        .ok_or_else(|| CodecError::MissingField(KEY_THEAD.into()))?;
    let mut columns: Vec<SmolStr> = Vec::new();
    for column in as_array(thead, KEY_THEAD)? {
        let column = column.as_str().ok_or_else(|| CodecError::InvalidField {
            field: KEY_THEAD.into(),
            expected: "an array of strings",
        })?;
        if columns.iter().any(|existing| existing == column) {
            return Err(CodecError::DuplicateColumn(column.into()));
        }
        columns.push(column.into());
    }

    let mut rows = Vec::new();
    if let Some(tbody) = map.get(KEY_TBODY) {
        for (index, row) in as_array(tbody, KEY_TBODY)?.iter().enumerate() {
            let cells = as_array(row, KEY_TBODY)?;
            if cells.len() != columns.len() {
                return Err(CodecError::RowWidth {
                    row: index,
                    expected: columns.len(),
                    got: cells.len(),
                });
            }
            rows.push(cells.iter().map(read_cell).collect::<Result<Vec<_>, _>>()?);
        }
    }

    let total = read_count(map, KEY_TABLE_SIZE)?.unwrap_or(rows.len());
    let page = match (
        read_count(map, KEY_PAGE_NUMBER)?,
        read_count(map, KEY_PAGE_SIZE)?,
    ) {
        (Some(number), Some(size)) => {
            let requested = i64::try_from(number).unwrap_or(i64::MAX);
            Some(Pagination::new(total, size).window(requested))
        }
        _ => None,
    };
    Ok(TableData::from_parts(columns, rows, total, page))
}

fn read_cell(value: &Value) -> Result<Cell, CodecError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Array(_) | Value::Object(_) => Err(CodecError::InvalidField {
            field: KEY_TBODY.into(),
            expected: "scalar cells",
        }),
    }
}

fn read_inputs(map: &Map<String, Value>) -> Result<Inputs, CodecError> {
    let mut inputs = Inputs {
        parameters: read_parameters(map, KEY_PARAMETERS)?.unwrap_or_default(),
        ..Inputs::default()
    };
    if let Some(fields) = map.get(KEY_INPUTS) {
        for field in as_array(fields, KEY_INPUTS)? {
            let field = as_object(field, KEY_INPUTS)?;
            let optional = |key: &str| field.get(key).and_then(Value::as_str).map(str::to_owned);
            inputs.fields.push(FormField {
                kind: FieldKind::from_tag(required_str(field, KEY_TYPE)?)?,
                name: required_str(field, "name")?.to_owned(),
                label: optional("label").unwrap_or_default(),
                initial_value: optional("initialValue"),
                placeholder: optional("placeholder"),
                options: read_parameters(field, KEY_OPTIONS)?.unwrap_or_default(),
            });
        }
    }
    Ok(inputs)
}

fn read_parameters(
    map: &Map<String, Value>,
    key: &str,
) -> Result<Option<Parameters>, CodecError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => read_string_map(value, key).map(Some),
    }
}

/// Reads a flat map whose values are scalars; scalars are kept as strings.
pub(crate) fn read_string_map(value: &Value, field: &str) -> Result<Parameters, CodecError> {
    as_object(value, field)?
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(CodecError::InvalidField {
                        field: field.into(),
                        expected: "a map of scalar values",
                    })
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Ui, ATTR_REFRESH_LISTENERS};
    use expect_test::expect;
    use serde_json::json;

    #[test]
    fn table_fragment_snapshot() {
        let ui = Ui::new();
        let mut data = TableData::new(["Id", "Name"]).unwrap();
        data.push_row(vec![Some("1".into()), Some("Alice".into())])
            .unwrap();
        data.push_row(vec![Some("2".into()), None]).unwrap();
        let table = ui
            .table_with("Found items", data)
            .with_source("/items")
            .unwrap();
        expect![[r#"{"type":"table","tuid":"1","title":"Found items","source":"/items","tableSize":"2","thead":["Id","Name"],"tbody":[["1","Alice"],["2",null]]}"#]]
            .assert_eq(&to_string(&table));
    }

    #[test]
    fn paged_table_snapshot() {
        let mut full = TableData::new(["Id"]).unwrap();
        for i in 1..=18 {
            full.push_row(vec![Some(i.to_string())]).unwrap();
        }
        let table = Ui::new().table_with("Paged", full.page_of(3, 7));
        expect![[r#"{"type":"table","tuid":"1","title":"Paged","tableSize":"18","pageNumber":"3","pageSize":"7","lastPageNumber":"3","firstItemNumber":"15","lastItemNumber":"18","thead":["Id"],"tbody":[["15"],["16"],["17"],["18"]]}"#]]
            .assert_eq(&to_string(&table));
    }

    #[test]
    fn example_fragment_parses() {
        let document = json!({
            "type": "table", "tuid": "42", "title": "Found items", "tableSize": "3",
            "thead": ["Id", "Name"],
            "tbody": [["1", "Alice"], ["2", "Bob"], ["3", "Carol"]]
        });
        let table = parse(&document).unwrap();
        assert_eq!(table.tuid, Tuid::new(42));
        assert_eq!(table.kind, Kind::Table);
        assert_eq!(table.title(), Some("Found items"));
        let data = table.table().unwrap();
        assert_eq!(data.total_row_count(), 3);
        assert_eq!(data.cell(2, "Name"), Some("Carol"));
        assert!(data.page().is_none());
    }

    #[test]
    fn tree_round_trips() {
        let ui = Ui::new();
        let mut page = ui.page("Home");
        page.set_parameter("session", "s-1").unwrap();
        let table = ui
            .table("Items", ["Id", "Name"])
            .unwrap()
            .with_source("/items")
            .unwrap();
        let mut search = ui.search("Find", "Search");
        search
            .add_field(
                FormField::new(FieldKind::Search, "Name", "name").with_placeholder("any"),
            )
            .unwrap();
        search.set_parameter("scope", "all").unwrap();
        search.connect_listener(&table).unwrap();
        let mut form = ui.modal_form("New", "Create", "/create");
        form.add_field(
            FormField::new(FieldKind::Checkbox, "Active", "active").with_initial_value("on"),
        )
        .unwrap();
        let mut grid = ui.grid(1, 2);
        grid.append(ui.paragraph("left"));
        grid.append(ui.nav_link("Go", "/elsewhere"));
        let mut button = ui.refresh_button("Reload");
        button.set_attribute("key", "k1").unwrap();
        button.set_parameter("hidden", "h").unwrap();
        page.append(ui.section("Main").with_child(search).with_child(table));
        page.append(form);
        page.append(grid);
        page.append(button);

        let decoded = parse(&serialize(&page)).unwrap();
        assert_eq!(decoded, page);

        let text = to_string(&page);
        assert_eq!(parse_str(&text).unwrap(), page);
    }

    #[test]
    fn integer_tuids_and_counts_are_accepted() {
        let document = json!({
            "type": "paragraph", "tuid": 7, "source": "/p",
            "content": [{ "type": "text", "tuid": 8, "text": "hi" }]
        });
        let paragraph = parse(&document).unwrap();
        assert_eq!(paragraph.tuid, Tuid::new(7));
        assert_eq!(paragraph.text(), "hi");
        assert_eq!(paragraph.source(), Some("/p"));
    }

    #[test]
    fn unknown_type_fails_fast() {
        let document = json!({ "type": "panel", "tuid": "1", "content": [
            { "type": "carousel", "tuid": "2" }
        ]});
        assert_eq!(
            parse(&document),
            Err(CodecError::UnsupportedComponentType("carousel".into()))
        );
    }

    #[test]
    fn malformed_documents_are_decode_faults() {
        assert_eq!(
            parse(&json!({ "tuid": "1" })),
            Err(CodecError::MissingField("type".into()))
        );
        assert_eq!(
            parse(&json!({ "type": "panel" })),
            Err(CodecError::MissingField("tuid".into()))
        );
        assert_eq!(
            parse(&json!({ "type": "panel", "tuid": "x1" })),
            Err(CodecError::InvalidTuid("x1".into()))
        );
        assert_eq!(
            parse(&json!({ "type": "table", "tuid": "1", "thead": ["A", "B"], "tbody": [["1"]] })),
            Err(CodecError::RowWidth {
                row: 0,
                expected: 2,
                got: 1
            })
        );
        assert!(matches!(parse_str("{not json"), Err(CodecError::Json(_))));
        assert_eq!(
            parse_page(&json!({ "type": "panel", "tuid": "1" })),
            Err(CodecError::NotAPage("panel".into()))
        );
    }

    #[test]
    fn tabbed_flow_and_tabbed_page_decode() {
        let flow = parse(&json!({
            "type": "tabbedFlow", "tuid": "1",
            "content": [
                { "type": "tab", "tuid": "2", "title": "First",
                  "content": [{ "type": "paragraph", "tuid": "3",
                                "content": [{ "type": "text", "tuid": "4", "text": "one" }] }] },
                { "type": "tab", "tuid": "5", "title": "Second" }
            ]
        }))
        .unwrap();
        assert_eq!(flow.children.len(), 2);
        assert_eq!(flow.children[0].kind, Kind::Tab);
        assert_eq!(flow.children[1].title(), Some("Second"));
        assert_eq!(flow.children[0].children[0].text(), "one");

        let page = parse_page(&json!({
            "type": "tabbed_page", "tuid": "10", "title": "Tabs",
            "sessionParameters": { "user": "ann" },
            "content": [{ "type": "tabbed_panel", "tuid": "11", "title": "A" }]
        }))
        .unwrap();
        assert_eq!(page.kind, Kind::TabbedPage);
        assert_eq!(page.parameters().unwrap()["user"], "ann");
        assert_eq!(page.children[0].kind, Kind::TabbedPanel);
    }

    #[test]
    fn monitor_fieldset_lists_fields() {
        let ui = Ui::new();
        let set = ui
            .monitor_fieldset("Health", 5)
            .with_source("/health")
            .unwrap()
            .with_child(ui.monitor_field("db", "GREEN", "up"))
            .with_child(ui.monitor_field("mq", "RED", "down"));
        let document = serialize(&set);
        assert_eq!(document["fields"].as_array().unwrap().len(), 2);
        assert!(document.get("content").is_none());
        assert_eq!(document["fields"][1]["type"], "monitor-field-greenred");

        let decoded = parse(&document).unwrap();
        assert_eq!(decoded, set);
        assert_eq!(decoded.source(), Some("/health"));
        assert_eq!(decoded.children[1].attribute("value"), Some("RED"));
        assert_eq!(decoded.children[1].text(), "down");
    }

    #[test]
    fn option_inputs_list_and_download_button_round_trip() {
        let ui = Ui::new();
        let mut form = ui.form("Pick", "/pick");
        form.add_field(
            FormField::new(FieldKind::Select, "Color", "color")
                .with_option("red", "Red")
                .with_option("blue", "Blue")
                .with_initial_value("blue"),
        )
        .unwrap();
        form.add_field(
            FormField::new(FieldKind::Radio, "Size", "size").with_option("Small", "s"),
        )
        .unwrap();
        let mut download = ui.download_button("Export", "/export", "items.csv");
        download.set_parameter("format", "csv").unwrap();
        let mut list = ui.list(false);
        list.append(ui.text("first"));
        let page = ui
            .page("P")
            .with_child(form)
            .with_child(download)
            .with_child(list);

        let document = serialize(&page);
        let inputs = &document["content"][0]["inputs"];
        assert_eq!(inputs[0]["type"], "select");
        assert_eq!(inputs[0]["options"], json!({ "red": "Red", "blue": "Blue" }));
        assert_eq!(inputs[1]["type"], "from_input_radio");
        assert_eq!(document["content"][1]["parameters"], json!({ "format": "csv" }));
        assert_eq!(document["content"][2]["isOrdered"], "false");
        assert_eq!(parse(&document).unwrap(), page);
    }

    #[test]
    fn table_data_fragment_decodes() {
        let fragment = parse(&json!({
            "type": "table-data", "tuid": "4", "tableSize": "18", "pageNumber": "2",
            "pageSize": "7", "thead": ["Id"], "tbody": [["8"], ["9"]]
        }))
        .unwrap();
        assert_eq!(fragment.kind, Kind::TableData);
        let data = fragment.table().unwrap();
        assert_eq!(data.total_row_count(), 18);
        assert_eq!(data.page().unwrap().first_item_number, 8);
        assert_eq!(data.cell(1, "Id"), Some("9"));
    }

    #[test]
    fn oversized_page_counts_decode_without_overflow() {
        let document = json!({
            "type": "table", "tuid": "1", "thead": ["Id"], "tbody": [],
            "tableSize": usize::MAX.to_string(),
            "pageSize": (usize::MAX / 2 + 1).to_string(),
            "pageNumber": "2"
        });
        let table = parse(&document).unwrap();
        let window = table.table().unwrap().page().unwrap();
        assert_eq!(window.page_number, 2);
        assert_eq!(window.last_item_number, usize::MAX);
    }

    #[test]
    fn scalar_attributes_become_strings() {
        let document = json!({
            "type": "section", "tuid": "1", "title": "T", "count": 3, "open": true,
            "refreshListeners": "4,5", "nested": { "x": 1 }
        });
        let section = parse(&document).unwrap();
        assert_eq!(section.attribute("count"), Some("3"));
        assert_eq!(section.attribute("open"), Some("true"));
        assert_eq!(section.attribute(ATTR_REFRESH_LISTENERS), Some("4,5"));
        assert_eq!(section.attribute("nested"), None);
    }
}
