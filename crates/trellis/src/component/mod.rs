//! Component tree model.

#![allow(missing_docs)]

mod builder;
mod kind;

pub use builder::Ui;
pub use kind::{BodyShape, Kind};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::{CodecError, ConfigError};
use crate::refresh::Parameters;
use crate::table::TableData;
use crate::tuid::{join_tuids, split_tuids, Tuid};

pub const ATTR_TITLE: &str = "title";
pub const ATTR_SOURCE: &str = "source";
pub const ATTR_REFRESH_LISTENERS: &str = "refreshListeners";
pub const ATTR_TARGET: &str = "target";
pub const ATTR_TEXT: &str = "text";
pub const ATTR_LABEL: &str = "label";
pub const ATTR_KEY: &str = "key";
pub const ATTR_SUBMIT_LABEL: &str = "submitLabel";
pub const ATTR_OPEN_BUTTON_LABEL: &str = "openButtonLabel";
pub const ATTR_OPENS_PAGE_SOURCE: &str = "opensPageSource";
pub const ATTR_ROWS: &str = "rows";
pub const ATTR_COLUMNS: &str = "columns";
pub const ATTR_IS_ORDERED: &str = "isOrdered";
pub const ATTR_DOWNLOAD_NAME: &str = "downloadName";
pub const ATTR_NAME: &str = "name";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_AUTO_REFRESH_PERIOD: &str = "auto_refresh_period_s";

/// Wire keys owned by the codec. They can never be plain attributes.
pub const RESERVED_KEYS: &[&str] = &[
    "type",
    "tuid",
    "content",
    "fields",
    "thead",
    "tbody",
    "tableSize",
    "pageNumber",
    "pageSize",
    "lastPageNumber",
    "firstItemNumber",
    "lastItemNumber",
    "inputs",
    "parameters",
    "sessionParameters",
];

#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Input kinds a form or search can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Number,
    TextArea,
    Password,
    Email,
    Checkbox,
    Day,
    Search,
    Select,
    Radio,
}

impl FieldKind {
    pub const ALL: [FieldKind; 10] = [
        FieldKind::String,
        FieldKind::Number,
        FieldKind::TextArea,
        FieldKind::Password,
        FieldKind::Email,
        FieldKind::Checkbox,
        FieldKind::Day,
        FieldKind::Search,
        FieldKind::Select,
        FieldKind::Radio,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::TextArea => "textarea",
            FieldKind::Password => "password",
            FieldKind::Email => "email",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Day => "day",
            FieldKind::Search => "search",
            FieldKind::Select => "select",
            FieldKind::Radio => "from_input_radio",
        }
    }

    /// Inputs offering a fixed set of options.
    #[must_use]
    pub const fn has_options(self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio)
    }

    pub fn from_tag(tag: &str) -> Result<Self, CodecError> {
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| CodecError::UnsupportedInputType(tag.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub kind: FieldKind,
    pub name: String,
    pub label: String,
    pub initial_value: Option<String>,
    pub placeholder: Option<String>,
    /// Choices of a select or radio input, in wire order.
    pub options: Parameters,
}

impl FormField {
    #[must_use]
    pub fn new(kind: FieldKind, label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            label: label.into(),
            initial_value: None,
            placeholder: None,
            options: Parameters::new(),
        }
    }

    #[must_use]
    pub fn with_initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Adds a choice to a select or radio input. Other inputs ignore it.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if self.kind.has_options() {
            self.options.insert(key.into(), value.into());
        }
        self
    }
}

/// Inputs of a form or search, plus hidden parameters sent along with them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inputs {
    pub fields: Vec<FormField>,
    pub parameters: Parameters,
}

impl Inputs {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn push(&mut self, field: FormField) -> Result<(), ConfigError> {
        if self.field(&field.name).is_some() {
            return Err(ConfigError::DuplicateField(field.name.into()));
        }
        self.fields.push(field);
        Ok(())
    }
}

/// Kind-specific payload of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Nothing,
    Table(TableData),
    Inputs(Inputs),
    /// Session parameters on a page, hidden parameters on a refresh button.
    Parameters(Parameters),
}

impl Body {
    #[must_use]
    pub fn empty(shape: BodyShape) -> Self {
        match shape {
            BodyShape::Nothing => Body::Nothing,
            BodyShape::Table => Body::Table(TableData::default()),
            BodyShape::Inputs => Body::Inputs(Inputs::default()),
            BodyShape::Parameters => Body::Parameters(Parameters::new()),
        }
    }
}

/// A node of the UI tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub tuid: Tuid,
    pub kind: Kind,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Component>,
    pub body: Body,
}

impl Component {
    #[must_use]
    pub fn new(tuid: Tuid, kind: Kind) -> Self {
        Self {
            tuid,
            kind,
            attributes: IndexMap::new(),
            children: Vec::new(),
            body: Body::empty(kind.body_shape()),
        }
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(ConfigError::ReservedAttribute(key.into()));
        }
        self.attributes.insert(key, value.into());
        Ok(())
    }

    /// Builder form of [`Component::set_attribute`].
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        self.set_attribute(key, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.attribute(ATTR_TITLE)
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.attribute(ATTR_SOURCE)
    }

    pub fn set_source(&mut self, source: impl Into<String>) -> Result<(), ConfigError> {
        if !self.kind.is_refreshable() {
            return Err(ConfigError::NotRefreshable {
                listener: self.tuid,
                kind: self.kind.tag().into(),
            });
        }
        self.attributes.insert(ATTR_SOURCE.to_owned(), source.into());
        Ok(())
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Result<Self, ConfigError> {
        self.set_source(source)?;
        Ok(self)
    }

    /// Listener TUIDs registered on this trigger, in connection order.
    pub fn listeners(&self) -> Result<Vec<Tuid>, CodecError> {
        self.attribute(ATTR_REFRESH_LISTENERS)
            .map_or_else(|| Ok(Vec::new()), split_tuids)
    }

    /// Registers `listener` to be refreshed whenever this trigger fires.
    ///
    /// Fails when this component is not a trigger, when the listener cannot be
    /// refreshed, or when the listener has no source yet. Connecting the same
    /// listener twice keeps a single registration.
    pub fn connect_listener(&mut self, listener: &Component) -> Result<(), ConfigError> {
        if !self.kind.is_trigger() {
            return Err(ConfigError::NotTrigger {
                trigger: self.tuid,
                kind: self.kind.tag().into(),
            });
        }
        if !listener.kind.is_refreshable() {
            return Err(ConfigError::NotRefreshable {
                listener: listener.tuid,
                kind: listener.kind.tag().into(),
            });
        }
        if listener.source().is_none() {
            return Err(ConfigError::ListenerWithoutSource {
                listener: listener.tuid,
            });
        }
        // Lists written by this crate always parse; anything else is replaced.
        let mut listeners = self.listeners().unwrap_or_default();
        if !listeners.contains(&listener.tuid) {
            listeners.push(listener.tuid);
        }
        self.attributes
            .insert(ATTR_REFRESH_LISTENERS.to_owned(), join_tuids(&listeners));
        Ok(())
    }

    /// Appends a child and returns it for further configuration.
    pub fn append(&mut self, child: Component) -> &mut Component {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    #[must_use]
    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn table(&self) -> Option<&TableData> {
        match &self.body {
            Body::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut TableData> {
        match &mut self.body {
            Body::Table(table) => Some(table),
            _ => None,
        }
    }

    #[must_use]
    pub fn inputs(&self) -> Option<&Inputs> {
        match &self.body {
            Body::Inputs(inputs) => Some(inputs),
            _ => None,
        }
    }

    pub fn add_field(&mut self, field: FormField) -> Result<(), ConfigError> {
        match &mut self.body {
            Body::Inputs(inputs) => inputs.push(field),
            _ => Err(self.unsupported("inputs")),
        }
    }

    /// Hidden parameters of forms, searches and refresh buttons, or the
    /// session parameters of a page.
    #[must_use]
    pub fn parameters(&self) -> Option<&Parameters> {
        match &self.body {
            Body::Inputs(inputs) => Some(&inputs.parameters),
            Body::Parameters(parameters) => Some(parameters),
            Body::Nothing | Body::Table(_) => None,
        }
    }

    pub fn set_parameter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let parameters = match &mut self.body {
            Body::Inputs(inputs) => &mut inputs.parameters,
            Body::Parameters(parameters) => parameters,
            Body::Nothing | Body::Table(_) => return Err(self.unsupported("parameters")),
        };
        parameters.insert(key.into(), value.into());
        Ok(())
    }

    pub(crate) fn unsupported(&self, action: &'static str) -> ConfigError {
        ConfigError::UnsupportedAction {
            tuid: self.tuid,
            kind: SmolStr::new(self.kind.tag()),
            action,
        }
    }

    /// Depth-first lookup over the whole subtree, this node included.
    #[must_use]
    pub fn find(&self, tuid: Tuid) -> Option<&Component> {
        if self.tuid == tuid {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(tuid))
    }

    pub fn find_mut(&mut self, tuid: Tuid) -> Option<&mut Component> {
        if self.tuid == tuid {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(tuid))
    }

    /// Visits this node and its descendants in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Component)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Every node of the subtree in document order.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Component> {
        let mut nodes = Vec::new();
        self.walk(&mut |node| nodes.push(node));
        nodes
    }

    /// Paragraph text: the concatenated fragments of its `text` children. A
    /// text fragment or monitor field gives its own `text`.
    #[must_use]
    pub fn text(&self) -> String {
        match self.kind {
            Kind::Text | Kind::MonitorField => {
                self.attribute(ATTR_TEXT).unwrap_or_default().to_owned()
            }
            _ => self
                .children
                .iter()
                .filter(|child| child.kind == Kind::Text)
                .filter_map(|child| child.attribute(ATTR_TEXT))
                .collect(),
        }
    }

    /// Grid child at `(row, column)`; children are laid out row-major.
    #[must_use]
    pub fn grid_cell(&self, row: usize, column: usize) -> Option<&Component> {
        if self.kind != Kind::Grid {
            return None;
        }
        let columns = self.attribute(ATTR_COLUMNS)?.parse::<usize>().ok()?;
        if column >= columns {
            return None;
        }
        self.children.get(row * columns + column)
    }

    /// Structural equality ignoring identities.
    ///
    /// TUIDs, and the listener lists that mention them, differ between two
    /// builds of the same page, so they take no part in the comparison.
    #[must_use]
    pub fn content_eq(&self, other: &Component) -> bool {
        self.kind == other.kind
            && attributes_eq(&self.attributes, &other.attributes)
            && self.body == other.body
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.content_eq(b))
    }
}

fn attributes_eq(a: &IndexMap<String, String>, b: &IndexMap<String, String>) -> bool {
    let compared = |map: &IndexMap<String, String>| {
        map.keys()
            .filter(|key| key.as_str() != ATTR_REFRESH_LISTENERS)
            .count()
    };
    compared(a) == compared(b)
        && a.iter()
            .filter(|(key, _)| key.as_str() != ATTR_REFRESH_LISTENERS)
            .all(|(key, value)| b.get(key) == Some(value))
}
