use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{FormState, MirrorClient, MirrorNode, MirrorTree};
use crate::backend::Fetcher;
use crate::codec::{self, Document};
use crate::component::{
    Kind, ATTR_KEY, ATTR_OPENS_PAGE_SOURCE, ATTR_REFRESH_LISTENERS, ATTR_TARGET,
};
use crate::error::{CodecError, ConfigError, FetchError, MirrorError};
use crate::form::{FieldErrors, SubmissionResponse};
use crate::refresh::{fetch_all, FanOutReport, FetchJob, Parameters};
use crate::table::{PAGE_NUMBER_PARAM, PAGE_SIZE_PARAM};
use crate::tuid::{split_tuids, Tuid};

/// What happened after a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The target accepted the values and every listener was refreshed.
    Accepted {
        message: Option<String>,
        report: FanOutReport,
    },
    /// The target refused the values. No listener was refreshed.
    Rejected {
        message: Option<String>,
        errors: FieldErrors,
    },
    /// The target accepted the values and the form opened another page.
    Navigated {
        endpoint: String,
        parameters: Parameters,
    },
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SubmitOutcome::Rejected { .. })
    }
}

/// How a refreshed table picks its page.
#[derive(Debug, Clone, Copy)]
enum Paging {
    /// Refresh caused by a trigger: start again at page 1.
    Reset,
    GoTo(usize),
}

fn unsupported(node: &MirrorNode, action: &'static str) -> MirrorError {
    ConfigError::UnsupportedAction {
        tuid: node.tuid,
        kind: node.kind.tag().into(),
        action,
    }
    .into()
}

fn expect_kind(
    tree: &MirrorTree,
    tuid: Tuid,
    kinds: &[Kind],
    action: &'static str,
) -> Result<MirrorNode, MirrorError> {
    let node = tree.node(tuid)?;
    if !kinds.contains(&node.kind) {
        return Err(unsupported(node, action));
    }
    Ok(node.clone())
}

fn trigger_listeners(tree: &MirrorTree, trigger: Tuid) -> Result<Vec<Tuid>, MirrorError> {
    let node = tree.node(trigger)?;
    if !node.kind.is_trigger() {
        return Err(ConfigError::NotTrigger {
            trigger,
            kind: node.kind.tag().into(),
        }
        .into());
    }
    let listeners = node
        .attribute(ATTR_REFRESH_LISTENERS)
        .map_or_else(|| Ok(Vec::new()), split_tuids)?;
    Ok(listeners)
}

/// Builds one fetch per listener.
///
/// A listener that is absent, cannot refresh, or has no source gets no job;
/// its fault is returned next to the jobs of the listeners that are fine.
fn plan(
    tree: &MirrorTree,
    trigger: Option<Tuid>,
    listeners: &[Tuid],
    produced: &Parameters,
    paging: Paging,
) -> Result<(Vec<FetchJob>, Vec<(Tuid, ConfigError)>), MirrorError> {
    let mut jobs = Vec::with_capacity(listeners.len());
    let mut faults = Vec::new();
    for &listener in listeners {
        match plan_one(tree, trigger, listener, produced, paging)? {
            Ok(job) => jobs.push(job),
            Err(fault) => faults.push((listener, fault)),
        }
    }
    Ok((jobs, faults))
}

fn plan_one(
    tree: &MirrorTree,
    trigger: Option<Tuid>,
    listener: Tuid,
    produced: &Parameters,
    paging: Paging,
) -> Result<Result<FetchJob, ConfigError>, MirrorError> {
    let node = match (tree.root.find(listener), trigger) {
        (Some(node), _) => node,
        (None, Some(trigger)) => return Ok(Err(ConfigError::MissingListener { trigger, listener })),
        (None, None) => return Err(MirrorError::UnknownComponent(listener)),
    };
    let Some(binding) = node.binding.as_ref() else {
        return Ok(Err(ConfigError::NotRefreshable {
            listener,
            kind: node.kind.tag().into(),
        }));
    };
    let Some(endpoint) = binding.source.clone() else {
        return Ok(Err(ConfigError::ListenerWithoutSource { listener }));
    };
    let mut request = binding.request(&tree.session, produced);
    if let Some(window) = node.table().and_then(|table| table.page()) {
        match paging {
            Paging::Reset => {
                if !produced.contains_key(PAGE_NUMBER_PARAM) {
                    request.insert(PAGE_NUMBER_PARAM.to_owned(), "1".to_owned());
                }
                if !produced.contains_key(PAGE_SIZE_PARAM) {
                    request.insert(PAGE_SIZE_PARAM.to_owned(), window.page_size.to_string());
                }
            }
            Paging::GoTo(page) => {
                request.insert(PAGE_NUMBER_PARAM.to_owned(), page.to_string());
                request.insert(PAGE_SIZE_PARAM.to_owned(), window.page_size.to_string());
            }
        }
    }
    Ok(Ok(FetchJob {
        listener,
        endpoint,
        request,
        produced: produced.clone(),
    }))
}

/// Values a form or search sends: every input, then hidden parameters.
fn submitted_values(node: &MirrorNode) -> Parameters {
    let mut values = Parameters::new();
    if let (Some(inputs), Some(state)) = (node.inputs(), &node.form) {
        for field in &inputs.fields {
            let value = state
                .values
                .get(&field.name)
                .cloned()
                .unwrap_or_default();
            values.insert(field.name.clone(), value);
        }
    }
    for (key, value) in node.hidden_parameters() {
        values.insert(key, value);
    }
    values
}

fn first_failure(report: FanOutReport) -> Result<(), MirrorError> {
    match report.failed.into_iter().next() {
        Some((_, err)) => Err(err.into()),
        None => Ok(()),
    }
}

impl<F: Fetcher> MirrorClient<F> {
    /// Refreshes every listener registered on `trigger`.
    ///
    /// No failure of one listener stops the others. A miswired listener is
    /// skipped and listed in the report's `miswired`; fetch and decode failures
    /// leave the listener content as it was, mark the listener with the error,
    /// and are listed in `failed`.
    pub fn fan_out(&self, trigger: Tuid, produced: &Parameters) -> Result<FanOutReport, MirrorError> {
        let listeners = self.with_tree(|tree| trigger_listeners(tree, trigger))??;
        self.refresh_listeners(Some(trigger), &listeners, produced, Paging::Reset)
    }

    /// Refreshes a single listener, as a trigger producing `produced` would.
    pub fn refresh(&self, listener: Tuid, produced: &Parameters) -> Result<(), MirrorError> {
        let report = self.refresh_listeners(None, &[listener], produced, Paging::Reset)?;
        first_failure(report)
    }

    fn refresh_listeners(
        &self,
        trigger: Option<Tuid>,
        listeners: &[Tuid],
        produced: &Parameters,
        paging: Paging,
    ) -> Result<FanOutReport, MirrorError> {
        let (jobs, miswired) = self.with_tree_mut(|tree| {
            let (jobs, miswired) = plan(tree, trigger, listeners, produced, paging)?;
            // A direct refresh names its listener, so a fault is the caller's.
            if let (None, Some((_, fault))) = (trigger, miswired.first()) {
                return Err(fault.clone().into());
            }
            for job in &jobs {
                if let Some(binding) = tree
                    .root
                    .find_mut(job.listener)
                    .and_then(|node| node.binding.as_mut())
                {
                    binding.begin();
                }
            }
            Ok((jobs, miswired))
        })?;
        for (listener, fault) in &miswired {
            warn!(%listener, "skipping miswired listener: {fault}");
        }
        if jobs.is_empty() {
            return Ok(FanOutReport {
                miswired,
                ..FanOutReport::default()
            });
        }

        let results = fetch_all(&self.fetcher, jobs);

        self.with_tree_mut(|tree| {
            let mut report = FanOutReport {
                miswired,
                ..FanOutReport::default()
            };
            for (job, result) in results {
                let Some(node) = tree.root.find_mut(job.listener) else {
                    warn!(listener = %job.listener, "listener left the tree during refresh");
                    continue;
                };
                let outcome = result
                    .and_then(|document| codec::parse(&document).map_err(FetchError::from))
                    .and_then(|fresh| {
                        let kind = fresh.kind;
                        node.accept(fresh).map(|()| kind).map_err(FetchError::from)
                    });
                match outcome {
                    Ok(kind) => {
                        debug!(listener = %job.listener, %kind, "spliced refreshed listener");
                        if let Some(binding) = node.binding.as_mut() {
                            binding.complete(&job.produced);
                        }
                        report.refreshed.push(job.listener);
                    }
                    Err(err) => {
                        if let FetchError::Decode(fault) = &err {
                            warn!(listener = %job.listener, "discarding undecodable response: {fault}");
                        }
                        if let Some(binding) = node.binding.as_mut() {
                            binding.fail(err.clone());
                        }
                        report.failed.push((job.listener, err));
                    }
                }
            }
            let touched = report
                .refreshed
                .iter()
                .chain(report.failed.iter().map(|(tuid, _)| tuid));
            for tuid in touched {
                if let Some(binding) = tree
                    .root
                    .find_mut(*tuid)
                    .and_then(|node| node.binding.as_mut())
                {
                    binding.settle();
                }
            }
            Ok(report)
        })
    }

    /// Presses a refresh button: its hidden parameters, plus its `key`, go to
    /// every listener.
    pub fn click(&self, button: Tuid) -> Result<FanOutReport, MirrorError> {
        let node = self.with_tree(|tree| {
            expect_kind(tree, button, &[Kind::RefreshButton], "click")
        })??;
        let mut produced = node.hidden_parameters();
        if let Some(key) = node.attribute(ATTR_KEY) {
            produced.insert(ATTR_KEY.to_owned(), key.to_owned());
        }
        self.fan_out(button, &produced)
    }

    /// Submits a search: its input values and hidden parameters go to every
    /// listener.
    pub fn submit_search(&self, search: Tuid) -> Result<FanOutReport, MirrorError> {
        let node = self.with_tree(|tree| {
            expect_kind(tree, search, &[Kind::Search], "search")
        })??;
        self.fan_out(search, &submitted_values(&node))
    }

    /// Clicks a visible row of a table picker. The row, keyed by column,
    /// goes to every listener.
    pub fn click_row(&self, picker: Tuid, row: usize) -> Result<FanOutReport, MirrorError> {
        let node = self.with_tree(|tree| {
            expect_kind(tree, picker, &[Kind::TablePicker], "row click")
        })??;
        let produced = node
            .table()
            .and_then(|table| table.row_map(row))
            .ok_or(MirrorError::RowOutOfRange { tuid: picker, row })?;
        self.fan_out(picker, &produced)
    }

    /// Fetches the target of a download button with the button's hidden
    /// parameters. The page is left as it is.
    pub fn download(&self, button: Tuid) -> Result<Document, MirrorError> {
        let node = self.with_tree(|tree| {
            expect_kind(tree, button, &[Kind::DownloadButton], "download")
        })??;
        let target = node
            .attribute(ATTR_TARGET)
            .ok_or_else(|| CodecError::MissingField(ATTR_TARGET.into()))?;
        debug!(%button, target, "downloading");
        Ok(self.fetcher.fetch(target, &node.hidden_parameters())?)
    }

    /// Shows the next page. Returns `false`, without fetching, on the last
    /// page or for a table that is not paged.
    pub fn next_page(&self, table: Tuid) -> Result<bool, MirrorError> {
        self.step_page(table, true)
    }

    /// Shows the previous page. Returns `false`, without fetching, on page 1.
    pub fn previous_page(&self, table: Tuid) -> Result<bool, MirrorError> {
        self.step_page(table, false)
    }

    /// Requests a specific page. The backend resolves out-of-range numbers.
    pub fn go_to_page(&self, table: Tuid, page: usize) -> Result<(), MirrorError> {
        self.with_tree(|tree| {
            expect_kind(tree, table, &[Kind::Table, Kind::TablePicker], "paging")
        })??;
        let report = self.refresh_listeners(None, &[table], &Parameters::new(), Paging::GoTo(page))?;
        first_failure(report)
    }

    fn step_page(&self, table: Tuid, forward: bool) -> Result<bool, MirrorError> {
        let node = self.with_tree(|tree| {
            expect_kind(tree, table, &[Kind::Table, Kind::TablePicker], "paging")
        })??;
        let Some(window) = node.table().and_then(|data| data.page()).copied() else {
            return Ok(false);
        };
        let target = match forward {
            true if window.has_next() => window.page_number + 1,
            false if window.has_previous() => window.page_number - 1,
            _ => return Ok(false),
        };
        self.go_to_page(table, target)?;
        Ok(true)
    }

    /// Types `value` into the named input of a form, modal form or search.
    pub fn enter_input(&self, form: Tuid, name: &str, value: &str) -> Result<(), MirrorError> {
        self.with_tree_mut(|tree| {
            let node = tree.node_mut(form)?;
            if node.form.is_none() {
                return Err(unsupported(node, "input"));
            }
            if node.inputs().is_none_or(|inputs| inputs.field(name).is_none()) {
                return Err(ConfigError::UnknownInput {
                    form,
                    name: name.into(),
                }
                .into());
            }
            let modal = node.kind == Kind::ModalForm;
            let state = node.form.get_or_insert_with(FormState::default);
            if modal && !state.opened {
                return Err(ConfigError::ModalNotOpen(form).into());
            }
            state.values.insert(name.to_owned(), value.to_owned());
            Ok(())
        })
    }

    /// Current input values of a form, modal form or search.
    pub fn form_values(&self, form: Tuid) -> Result<IndexMap<String, String>, MirrorError> {
        self.with_tree(|tree| -> Result<IndexMap<String, String>, MirrorError> {
            let node = tree.node(form)?;
            node.form
                .as_ref()
                .map(|state| state.values.clone())
                .ok_or_else(|| unsupported(node, "input"))
        })?
    }

    pub fn open_modal(&self, form: Tuid) -> Result<(), MirrorError> {
        self.set_modal_open(form, true)
    }

    pub fn close_modal(&self, form: Tuid) -> Result<(), MirrorError> {
        self.set_modal_open(form, false)
    }

    fn set_modal_open(&self, form: Tuid, open: bool) -> Result<(), MirrorError> {
        self.with_tree_mut(|tree| {
            let node = tree.node_mut(form)?;
            if node.kind != Kind::ModalForm {
                return Err(unsupported(node, if open { "open" } else { "close" }));
            }
            let state = node.form.get_or_insert_with(FormState::default);
            match (state.opened, open) {
                (true, true) => Err(ConfigError::ModalAlreadyOpen(form).into()),
                (false, false) => Err(ConfigError::ModalNotOpen(form).into()),
                _ => {
                    state.opened = open;
                    Ok(())
                }
            }
        })
    }

    /// Submits a form or modal form to its target.
    ///
    /// A modal form must be open. Only an accepted submission refreshes
    /// listeners, and none of the form's values are passed on to them. When
    /// the form declares `opensPageSource`, an accepted submission opens that
    /// page with the parameters returned by the target instead.
    pub fn submit(&self, form: Tuid) -> Result<SubmitOutcome, MirrorError> {
        let (node, listeners) = self.with_tree(|tree| -> Result<_, MirrorError> {
            let node = expect_kind(tree, form, &[Kind::Form, Kind::ModalForm], "submit")?;
            if node.kind == Kind::ModalForm && !node.form.as_ref().is_some_and(|state| state.opened) {
                return Err(ConfigError::ModalNotOpen(form).into());
            }
            let listeners = trigger_listeners(tree, form)?;
            Ok((node, listeners))
        })??;

        let target = node
            .attribute(ATTR_TARGET)
            .ok_or_else(|| CodecError::MissingField(ATTR_TARGET.into()))?
            .to_owned();
        debug!(%form, target = %target, "submitting form");
        let document = self.fetcher.fetch(&target, &submitted_values(&node))?;
        let response = SubmissionResponse::from_document(&document)?;

        self.with_tree_mut(|tree| {
            let state = tree
                .node_mut(form)?
                .form
                .get_or_insert_with(FormState::default);
            state.message.clone_from(&response.message);
            state.errors = response.errors();
            if response.success && node.kind == Kind::ModalForm {
                state.opened = false;
            }
            Ok(())
        })?;

        if !response.success {
            let errors = response.errors();
            return Ok(SubmitOutcome::Rejected {
                message: response.message,
                errors,
            });
        }

        if let Some(page) = node.attribute(ATTR_OPENS_PAGE_SOURCE) {
            let parameters = response.parameters.unwrap_or_default();
            self.open_with(page, &parameters)?;
            return Ok(SubmitOutcome::Navigated {
                endpoint: page.to_owned(),
                parameters,
            });
        }

        let report =
            self.refresh_listeners(Some(form), &listeners, &Parameters::new(), Paging::Reset)?;
        Ok(SubmitOutcome::Accepted {
            message: response.message,
            report,
        })
    }
}
