//! Mirror tree test harness.
//!
//! A [`MirrorClient`] rebuilds the page purely from wire documents and acts on
//! it the way a browser would: it enters form values, submits, clicks rows
//! and buttons, pages through tables, and splices refreshed subtrees in place.

#![allow(missing_docs)]

mod actions;
mod node;

pub use actions::SubmitOutcome;
pub use node::{FormState, MirrorNode};

use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::backend::Fetcher;
use crate::codec::{self, Document};
use crate::component::{Component, Kind, ATTR_LABEL, ATTR_SOURCE};
use crate::error::{ConfigError, MirrorError};
use crate::refresh::Parameters;
use crate::tuid::Tuid;

/// Page currently shown by the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTree {
    /// Endpoint the page was opened from, when known.
    pub endpoint: Option<String>,
    pub root: MirrorNode,
    /// Merged into every refresh request issued from this page.
    pub session: Parameters,
}

impl MirrorTree {
    /// Builds the tree from a decoded page.
    #[must_use]
    pub fn new(endpoint: Option<String>, page: Component) -> Self {
        let root = MirrorNode::from_component(page);
        let session = root.hidden_parameters();
        Self {
            endpoint,
            root,
            session,
        }
    }

    pub fn node(&self, tuid: Tuid) -> Result<&MirrorNode, MirrorError> {
        self.root
            .find(tuid)
            .ok_or(MirrorError::UnknownComponent(tuid))
    }

    pub fn node_mut(&mut self, tuid: Tuid) -> Result<&mut MirrorNode, MirrorError> {
        self.root
            .find_mut(tuid)
            .ok_or(MirrorError::UnknownComponent(tuid))
    }

    /// Every node accepted by `predicate`, depth-first in document order.
    pub fn find_all(&self, predicate: impl Fn(&MirrorNode) -> bool) -> Vec<&MirrorNode> {
        let mut found = Vec::new();
        self.root.walk(&mut |node| {
            if predicate(node) {
                found.push(node);
            }
        });
        found
    }

    /// The single node of `kind`, optionally restricted to a title.
    pub fn find_unique(&self, kind: Kind, title: Option<&str>) -> Result<&MirrorNode, MirrorError> {
        let found = self.find_all(|node| {
            node.kind == kind && title.is_none_or(|title| node.title() == Some(title))
        });
        match found.as_slice() {
            [node] => Ok(*node),
            [] => Err(ConfigError::ComponentNotFound {
                kind: kind.tag().into(),
                title: title.map(SmolStr::new),
            }
            .into()),
            many => Err(ConfigError::AmbiguousComponent {
                kind: kind.tag().into(),
                title: title.map(SmolStr::new),
                count: many.len(),
            }
            .into()),
        }
    }
}

/// Test-side client driving a mirror tree against a [`Fetcher`].
///
/// Reads take a shared lock; every splice happens under the exclusive lock,
/// so a reader sees a listener either before or after its refresh. Fetches
/// run with no lock held.
#[derive(Debug)]
pub struct MirrorClient<F> {
    fetcher: F,
    tree: RwLock<Option<MirrorTree>>,
}

impl<F: Fetcher> MirrorClient<F> {
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            tree: RwLock::new(None),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetches and shows the page served at `endpoint`.
    pub fn open(&self, endpoint: &str) -> Result<(), MirrorError> {
        self.open_with(endpoint, &Parameters::new())
    }

    pub fn open_with(&self, endpoint: &str, parameters: &Parameters) -> Result<(), MirrorError> {
        debug!(endpoint, "opening page");
        let document = self.fetcher.fetch(endpoint, parameters)?;
        let page = codec::parse_page(&document)?;
        *self.tree.write() = Some(MirrorTree::new(Some(endpoint.to_owned()), page));
        Ok(())
    }

    /// Shows a page document obtained elsewhere.
    pub fn load_document(&self, document: &Document) -> Result<(), MirrorError> {
        let page = codec::parse_page(document)?;
        *self.tree.write() = Some(MirrorTree::new(None, page));
        Ok(())
    }

    /// Reads the current tree under the shared lock.
    pub fn with_tree<R>(&self, read: impl FnOnce(&MirrorTree) -> R) -> Result<R, MirrorError> {
        let guard = self.tree.read();
        let tree = guard.as_ref().ok_or(MirrorError::NoPage)?;
        Ok(read(tree))
    }

    pub(crate) fn with_tree_mut<R>(
        &self,
        write: impl FnOnce(&mut MirrorTree) -> Result<R, MirrorError>,
    ) -> Result<R, MirrorError> {
        let mut guard = self.tree.write();
        let tree = guard.as_mut().ok_or(MirrorError::NoPage)?;
        write(tree)
    }

    /// Snapshot of the whole tree.
    pub fn tree(&self) -> Result<MirrorTree, MirrorError> {
        self.with_tree(Clone::clone)
    }

    /// Component content of the whole page.
    pub fn page(&self) -> Result<Component, MirrorError> {
        self.with_tree(|tree| tree.root.to_component())
    }

    pub fn session_parameters(&self) -> Result<Parameters, MirrorError> {
        self.with_tree(|tree| tree.session.clone())
    }

    /// Depth-first lookup over the whole page.
    pub fn find(&self, tuid: Tuid) -> Result<Component, MirrorError> {
        self.with_tree(|tree| tree.node(tuid).map(MirrorNode::to_component))?
    }

    /// Like [`MirrorClient::find`] but includes client state.
    pub fn node(&self, tuid: Tuid) -> Result<MirrorNode, MirrorError> {
        self.with_tree(|tree| tree.node(tuid).cloned())?
    }

    pub fn find_all(
        &self,
        predicate: impl Fn(&MirrorNode) -> bool,
    ) -> Result<Vec<MirrorNode>, MirrorError> {
        self.with_tree(|tree| tree.find_all(predicate).into_iter().cloned().collect())
    }

    pub fn find_unique(&self, kind: Kind, title: Option<&str>) -> Result<MirrorNode, MirrorError> {
        self.with_tree(|tree| tree.find_unique(kind, title).cloned())?
    }

    pub fn find_table(&self, title: &str) -> Result<MirrorNode, MirrorError> {
        self.find_unique(Kind::Table, Some(title))
    }

    pub fn find_table_picker(&self, title: &str) -> Result<MirrorNode, MirrorError> {
        self.find_unique(Kind::TablePicker, Some(title))
    }

    pub fn find_form(&self, title: &str) -> Result<MirrorNode, MirrorError> {
        self.find_unique(Kind::Form, Some(title))
    }

    pub fn find_modal_form(&self, title: &str) -> Result<MirrorNode, MirrorError> {
        self.find_unique(Kind::ModalForm, Some(title))
    }

    pub fn find_search(&self, title: &str) -> Result<MirrorNode, MirrorError> {
        self.find_unique(Kind::Search, Some(title))
    }

    pub fn find_refresh_button(&self, label: &str) -> Result<MirrorNode, MirrorError> {
        let mut found = self.find_all(|node| {
            node.kind == Kind::RefreshButton && node.attribute(ATTR_LABEL) == Some(label)
        })?;
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(ConfigError::ComponentNotFound {
                kind: Kind::RefreshButton.tag().into(),
                title: Some(label.into()),
            }
            .into()),
            count => Err(ConfigError::AmbiguousComponent {
                kind: Kind::RefreshButton.tag().into(),
                title: Some(label.into()),
                count,
            }
            .into()),
        }
    }

    /// Outline of the branch rooted at `tuid`, for diagnostics.
    pub fn dump(&self, tuid: Tuid) -> Result<String, MirrorError> {
        self.with_tree(|tree| tree.node(tuid).map(MirrorNode::dump))?
    }

    /// Source currently bound to a refreshable node.
    pub fn source_of(&self, tuid: Tuid) -> Result<Option<String>, MirrorError> {
        self.with_tree(|tree| {
            tree.node(tuid)
                .map(|node| node.attribute(ATTR_SOURCE).map(str::to_owned))
        })?
    }
}
