use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::component::{Body, Component, Inputs, Kind, ATTR_SOURCE, ATTR_TITLE};
use crate::error::{CodecError, FetchError};
use crate::form::FieldErrors;
use crate::refresh::{Parameters, RefreshBinding};
use crate::table::TableData;
use crate::tuid::Tuid;

/// Client-side state of a form, modal form or search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormState {
    /// Current value per input name, seeded with initial values.
    pub values: IndexMap<String, String>,
    pub opened: bool,
    /// Message of the last submission response.
    pub message: Option<String>,
    /// Field errors of the last rejected submission.
    pub errors: FieldErrors,
}

impl FormState {
    fn new(inputs: &Inputs) -> Self {
        Self {
            values: inputs
                .fields
                .iter()
                .filter_map(|field| {
                    field
                        .initial_value
                        .clone()
                        .map(|value| (field.name.clone(), value))
                })
                .collect(),
            ..Self::default()
        }
    }
}

/// One node of the mirror tree: decoded component content plus the state a
/// live client keeps for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorNode {
    pub tuid: Tuid,
    pub kind: Kind,
    pub attributes: IndexMap<String, String>,
    pub body: Body,
    pub children: Vec<MirrorNode>,
    /// Present on refreshable kinds.
    pub binding: Option<RefreshBinding>,
    /// Present on kinds with inputs.
    pub form: Option<FormState>,
}

impl MirrorNode {
    #[must_use]
    pub fn from_component(component: Component) -> Self {
        let Component {
            tuid,
            kind,
            attributes,
            children,
            body,
        } = component;
        let binding = kind
            .is_refreshable()
            .then(|| RefreshBinding::new(attributes.get(ATTR_SOURCE).cloned()));
        let form = match &body {
            Body::Inputs(inputs) => Some(FormState::new(inputs)),
            Body::Nothing | Body::Table(_) | Body::Parameters(_) => None,
        };
        Self {
            tuid,
            kind,
            attributes,
            body,
            children: children.into_iter().map(Self::from_component).collect(),
            binding,
            form,
        }
    }

    /// Component content of this subtree, without client state.
    #[must_use]
    pub fn to_component(&self) -> Component {
        Component {
            tuid: self.tuid,
            kind: self.kind,
            attributes: self.attributes.clone(),
            children: self.children.iter().map(Self::to_component).collect(),
            body: self.body.clone(),
        }
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.attribute(ATTR_TITLE)
    }

    #[must_use]
    pub fn table(&self) -> Option<&TableData> {
        match &self.body {
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

    #[must_use]
    pub fn hidden_parameters(&self) -> Parameters {
        match &self.body {
            Body::Inputs(inputs) => inputs.parameters.clone(),
            Body::Parameters(parameters) => parameters.clone(),
            Body::Nothing | Body::Table(_) => Parameters::new(),
        }
    }

    /// Error shown on this component after its last fetch failed.
    #[must_use]
    pub fn fetch_error(&self) -> Option<&FetchError> {
        self.binding.as_ref()?.last_error.as_ref()
    }

    #[must_use]
    pub fn find(&self, tuid: Tuid) -> Option<&MirrorNode> {
        if self.tuid == tuid {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(tuid))
    }

    pub fn find_mut(&mut self, tuid: Tuid) -> Option<&mut MirrorNode> {
        if self.tuid == tuid {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(tuid))
    }

    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a MirrorNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Applies a refresh response to this listener.
    ///
    /// A `table-data` response replaces only the rows and paging of a table
    /// or picker. Any other response must be a refreshable component and is
    /// spliced in whole.
    pub fn accept(&mut self, fresh: Component) -> Result<(), CodecError> {
        let kind = fresh.kind;
        if kind == Kind::TableData {
            if let (Body::Table(table), Body::Table(data)) = (&mut self.body, fresh.body) {
                *table = data;
                return Ok(());
            }
        } else if kind.is_refreshable() {
            self.splice(fresh);
            return Ok(());
        }
        Err(CodecError::UnrefreshableResponse(kind.tag().into()))
    }

    /// Replaces content with a freshly fetched component.
    ///
    /// The node keeps its TUID and its accumulated parameters. When the fresh
    /// component names no source, the previous one is kept.
    pub fn splice(&mut self, fresh: Component) {
        let tuid = self.tuid;
        let previous = self.binding.take();
        let source = fresh
            .source()
            .map(str::to_owned)
            .or_else(|| previous.as_ref().and_then(|binding| binding.source.clone()));
        *self = Self::from_component(fresh);
        self.tuid = tuid;
        if let Some(binding) = &mut self.binding {
            if let Some(previous) = previous {
                binding.accumulated = previous.accumulated;
                binding.phase = previous.phase;
                binding.last_error = previous.last_error;
            }
            if let Some(source) = source {
                self.attributes.insert(ATTR_SOURCE.to_owned(), source.clone());
                binding.source = Some(source);
            }
        }
    }

    /// Indented outline of the subtree, one line per node.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "{:indent$}{}#{}", "", self.kind, self.tuid, indent = depth * 2);
        if let Some(title) = self.title() {
            let _ = write!(out, " \"{title}\"");
        }
        if let Some(table) = self.table() {
            let _ = write!(out, " rows={}/{}", table.len(), table.total_row_count());
        }
        if let Some(binding) = &self.binding {
            if let Some(source) = &binding.source {
                let _ = write!(out, " source={source}");
            }
            if let Some(error) = &binding.last_error {
                let _ = write!(out, " error=\"{error}\"");
            }
        }
        out.push('\n');
        for child in &self.children {
            child.dump_into(out, depth + 1);
        }
    }
}
