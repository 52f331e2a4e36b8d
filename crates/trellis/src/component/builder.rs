use std::sync::Arc;

use smol_str::SmolStr;

use super::{
    Body, Component, Kind, ATTR_AUTO_REFRESH_PERIOD, ATTR_COLUMNS, ATTR_DOWNLOAD_NAME,
    ATTR_IS_ORDERED, ATTR_LABEL, ATTR_NAME, ATTR_OPEN_BUTTON_LABEL, ATTR_ROWS, ATTR_SUBMIT_LABEL,
    ATTR_TARGET, ATTR_TEXT, ATTR_TITLE, ATTR_VALUE,
};
use crate::error::ConfigError;
use crate::table::TableData;
use crate::tuid::TuidAllocator;

/// Build-side context. Every component made through it gets a fresh TUID from
/// the shared allocator.
#[derive(Debug, Clone, Default)]
pub struct Ui {
    allocator: Arc<TuidAllocator>,
}

impl Ui {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_allocator(allocator: Arc<TuidAllocator>) -> Self {
        Self { allocator }
    }

    #[must_use]
    pub fn allocator(&self) -> &Arc<TuidAllocator> {
        &self.allocator
    }

    #[must_use]
    pub fn component(&self, kind: Kind) -> Component {
        Component::new(self.allocator.next_tuid(), kind)
    }

    fn labelled(&self, kind: Kind, key: &str, value: impl Into<String>) -> Component {
        let mut component = self.component(kind);
        component.attributes.insert(key.to_owned(), value.into());
        component
    }

    #[must_use]
    pub fn page(&self, title: impl Into<String>) -> Component {
        self.labelled(Kind::Page, ATTR_TITLE, title)
    }

    /// Page whose children are [`Ui::tabbed_panel`]s.
    #[must_use]
    pub fn tabbed_page(&self, title: impl Into<String>) -> Component {
        self.labelled(Kind::TabbedPage, ATTR_TITLE, title)
    }

    #[must_use]
    pub fn tabbed_panel(&self, title: impl Into<String>) -> Component {
        self.labelled(Kind::TabbedPanel, ATTR_TITLE, title)
    }

    #[must_use]
    pub fn section(&self, title: impl Into<String>) -> Component {
        self.labelled(Kind::Section, ATTR_TITLE, title)
    }

    #[must_use]
    pub fn text(&self, text: impl Into<String>) -> Component {
        self.labelled(Kind::Text, ATTR_TEXT, text)
    }

    /// Paragraph holding a single text fragment.
    #[must_use]
    pub fn paragraph(&self, text: impl Into<String>) -> Component {
        let fragment = self.text(text);
        self.component(Kind::Paragraph).with_child(fragment)
    }

    #[must_use]
    pub fn panel(&self) -> Component {
        self.component(Kind::Panel)
    }

    #[must_use]
    pub fn vertical_flow(&self) -> Component {
        self.component(Kind::VerticalFlow)
    }

    #[must_use]
    pub fn horizontal_flow(&self) -> Component {
        self.component(Kind::HorizontalFlow)
    }

    #[must_use]
    pub fn tabbed_flow(&self) -> Component {
        self.component(Kind::TabbedFlow)
    }

    /// One tab of a [`Ui::tabbed_flow`].
    #[must_use]
    pub fn tab(&self, title: impl Into<String>) -> Component {
        self.labelled(Kind::Tab, ATTR_TITLE, title)
    }

    #[must_use]
    pub fn list(&self, ordered: bool) -> Component {
        self.labelled(Kind::List, ATTR_IS_ORDERED, ordered.to_string())
    }

    #[must_use]
    pub fn grid(&self, rows: usize, columns: usize) -> Component {
        let mut grid = self.component(Kind::Grid);
        grid.attributes.insert(ATTR_ROWS.to_owned(), rows.to_string());
        grid.attributes
            .insert(ATTR_COLUMNS.to_owned(), columns.to_string());
        grid
    }

    pub fn table<I, S>(&self, title: impl Into<String>, columns: I) -> Result<Component, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Ok(self.table_with(title, TableData::new(columns)?))
    }

    /// Table showing `data`, typically one page cut out of a larger table.
    #[must_use]
    pub fn table_with(&self, title: impl Into<String>, data: TableData) -> Component {
        let mut table = self.labelled(Kind::Table, ATTR_TITLE, title);
        table.body = Body::Table(data);
        table
    }

    /// Bare table body answering a paged table refresh.
    #[must_use]
    pub fn table_data(&self, data: TableData) -> Component {
        let mut table = self.component(Kind::TableData);
        table.body = Body::Table(data);
        table
    }

    pub fn table_picker<I, S>(
        &self,
        title: impl Into<String>,
        columns: I,
    ) -> Result<Component, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Ok(self.table_picker_with(title, TableData::new(columns)?))
    }

    #[must_use]
    pub fn table_picker_with(&self, title: impl Into<String>, data: TableData) -> Component {
        let mut picker = self.labelled(Kind::TablePicker, ATTR_TITLE, title);
        picker.body = Body::Table(data);
        picker
    }

    /// Form posting its inputs to `target`.
    #[must_use]
    pub fn form(&self, title: impl Into<String>, target: impl Into<String>) -> Component {
        let mut form = self.labelled(Kind::Form, ATTR_TITLE, title);
        form.attributes.insert(ATTR_TARGET.to_owned(), target.into());
        form.attributes
            .insert(ATTR_SUBMIT_LABEL.to_owned(), "Submit".to_owned());
        form
    }

    #[must_use]
    pub fn modal_form(
        &self,
        title: impl Into<String>,
        open_button_label: impl Into<String>,
        target: impl Into<String>,
    ) -> Component {
        let mut form = self.labelled(Kind::ModalForm, ATTR_TITLE, title);
        form.attributes.insert(ATTR_TARGET.to_owned(), target.into());
        form.attributes
            .insert(ATTR_SUBMIT_LABEL.to_owned(), "Submit".to_owned());
        form.attributes
            .insert(ATTR_OPEN_BUTTON_LABEL.to_owned(), open_button_label.into());
        form
    }

    #[must_use]
    pub fn search(&self, title: impl Into<String>, submit_label: impl Into<String>) -> Component {
        let mut search = self.labelled(Kind::Search, ATTR_TITLE, title);
        search
            .attributes
            .insert(ATTR_SUBMIT_LABEL.to_owned(), submit_label.into());
        search
    }

    #[must_use]
    pub fn refresh_button(&self, label: impl Into<String>) -> Component {
        self.labelled(Kind::RefreshButton, ATTR_LABEL, label)
    }

    /// Button fetching `target` with its hidden parameters.
    #[must_use]
    pub fn download_button(
        &self,
        label: impl Into<String>,
        target: impl Into<String>,
        download_name: impl Into<String>,
    ) -> Component {
        let mut button = self.labelled(Kind::DownloadButton, ATTR_LABEL, label);
        button
            .attributes
            .insert(ATTR_TARGET.to_owned(), target.into());
        button
            .attributes
            .insert(ATTR_DOWNLOAD_NAME.to_owned(), download_name.into());
        button
    }

    /// Monitor field set polled every `period_s` seconds by a browser.
    #[must_use]
    pub fn monitor_fieldset(&self, title: impl Into<String>, period_s: u32) -> Component {
        let mut set = self.labelled(Kind::MonitorFieldSet, ATTR_TITLE, title);
        set.attributes
            .insert(ATTR_AUTO_REFRESH_PERIOD.to_owned(), period_s.to_string());
        set
    }

    /// Green/red field of a monitor field set. `value` is `GREEN`, `RED` or
    /// `NEUTRAL`.
    #[must_use]
    pub fn monitor_field(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        text: impl Into<String>,
    ) -> Component {
        let mut field = self.labelled(Kind::MonitorField, ATTR_NAME, name);
        field.attributes.insert(ATTR_VALUE.to_owned(), value.into());
        field.attributes.insert(ATTR_TEXT.to_owned(), text.into());
        field
    }

    #[must_use]
    pub fn nav_link(&self, label: impl Into<String>, target: impl Into<String>) -> Component {
        let mut link = self.labelled(Kind::NavLink, ATTR_LABEL, label);
        link.attributes.insert(ATTR_TARGET.to_owned(), target.into());
        link
    }

    #[must_use]
    pub fn nav_button(&self, label: impl Into<String>, target: impl Into<String>) -> Component {
        let mut button = self.labelled(Kind::NavButton, ATTR_LABEL, label);
        button
            .attributes
            .insert(ATTR_TARGET.to_owned(), target.into());
        button
    }
}
