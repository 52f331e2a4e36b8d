//! Closed set of component kinds and their wire tags.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// Every component kind understood by the codec and the mirror.
///
/// Adding a kind means adding a variant here; every `match` over `Kind`
/// in the crate is exhaustive so both codec directions have to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Page,
    Section,
    Paragraph,
    Text,
    Panel,
    VerticalFlow,
    HorizontalFlow,
    Grid,
    TabbedFlow,
    Table,
    TablePicker,
    Form,
    ModalForm,
    Search,
    RefreshButton,
    NavLink,
    NavButton,
    /// Bare table body, sent back by paged table sources.
    TableData,
    /// One tab of a tabbed flow.
    Tab,
    List,
    DownloadButton,
    MonitorFieldSet,
    MonitorField,
    /// Page whose top level is a row of tabbed panels.
    TabbedPage,
    TabbedPanel,
}

/// What a component carries beyond attributes and children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    Nothing,
    Table,
    Inputs,
    Parameters,
}

impl Kind {
    pub const ALL: [Kind; 25] = [
        Kind::Page,
        Kind::Section,
        Kind::Paragraph,
        Kind::Text,
        Kind::Panel,
        Kind::VerticalFlow,
        Kind::HorizontalFlow,
        Kind::Grid,
        Kind::TabbedFlow,
        Kind::Table,
        Kind::TablePicker,
        Kind::Form,
        Kind::ModalForm,
        Kind::Search,
        Kind::RefreshButton,
        Kind::NavLink,
        Kind::NavButton,
        Kind::TableData,
        Kind::Tab,
        Kind::List,
        Kind::DownloadButton,
        Kind::MonitorFieldSet,
        Kind::MonitorField,
        Kind::TabbedPage,
        Kind::TabbedPanel,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Kind::Page => "page",
            Kind::Section => "section",
            Kind::Paragraph => "paragraph",
            Kind::Text => "text",
            Kind::Panel => "panel",
            Kind::VerticalFlow => "verticalFlow",
            Kind::HorizontalFlow => "horizontal_flow",
            Kind::Grid => "grid",
            Kind::TabbedFlow => "tabbedFlow",
            Kind::Table => "table",
            Kind::TablePicker => "tablepicker",
            Kind::Form => "form",
            Kind::ModalForm => "modalform",
            Kind::Search => "search_form",
            Kind::RefreshButton => "refreshButton",
            Kind::NavLink => "navlink",
            Kind::NavButton => "navbutton",
            Kind::TableData => "table-data",
            Kind::Tab => "tab",
            Kind::List => "list",
            Kind::DownloadButton => "download_button",
            Kind::MonitorFieldSet => "monitor_fieldset",
            Kind::MonitorField => "monitor-field-greenred",
            Kind::TabbedPage => "tabbed_page",
            Kind::TabbedPanel => "tabbed_panel",
        }
    }

    /// Kinds that own a source and can be replaced by a refresh.
    #[must_use]
    pub const fn is_refreshable(self) -> bool {
        matches!(
            self,
            Kind::Paragraph
                | Kind::Panel
                | Kind::Table
                | Kind::TablePicker
                | Kind::MonitorFieldSet
        )
    }

    /// Kinds that notify listeners when activated.
    #[must_use]
    pub const fn is_trigger(self) -> bool {
        matches!(
            self,
            Kind::TablePicker | Kind::Form | Kind::ModalForm | Kind::Search | Kind::RefreshButton
        )
    }

    #[must_use]
    pub const fn is_form(self) -> bool {
        matches!(self, Kind::Form | Kind::ModalForm)
    }

    /// Kinds a document root may be.
    #[must_use]
    pub const fn is_page(self) -> bool {
        matches!(self, Kind::Page | Kind::TabbedPage)
    }

    /// Wire key holding the children. Monitor field sets list theirs under
    /// `fields`.
    #[must_use]
    pub const fn children_key(self) -> &'static str {
        match self {
            Kind::MonitorFieldSet => "fields",
            _ => "content",
        }
    }

    #[must_use]
    pub const fn body_shape(self) -> BodyShape {
        match self {
            Kind::Table | Kind::TablePicker | Kind::TableData => BodyShape::Table,
            Kind::Form | Kind::ModalForm | Kind::Search => BodyShape::Inputs,
            Kind::Page | Kind::TabbedPage | Kind::RefreshButton | Kind::DownloadButton => {
                BodyShape::Parameters
            }
            Kind::Section
            | Kind::Paragraph
            | Kind::Text
            | Kind::Panel
            | Kind::VerticalFlow
            | Kind::HorizontalFlow
            | Kind::Grid
            | Kind::TabbedFlow
            | Kind::NavLink
            | Kind::NavButton
            | Kind::Tab
            | Kind::List
            | Kind::MonitorFieldSet
            | Kind::MonitorField
            | Kind::TabbedPanel => BodyShape::Nothing,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Kind {
    type Err = CodecError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| CodecError::UnsupportedComponentType(tag.into()))
    }
}
