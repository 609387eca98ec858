//! Scope tree and the public scope handle.

use crate::core::collector::CollectorInner;
use crate::core::slot::ValueSlot;
use crate::core::value::SettingValue;
use crate::error::{Result, SettingsError};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Index of a scope within its collector's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(usize);

impl ScopeId {
    pub(crate) const ROOT: ScopeId = ScopeId(0);
}

/// One resolution context: a value slot per declared setting plus a link to
/// the parent scope.
pub(crate) struct ScopeNode {
    name: Option<String>,
    parent: Option<ScopeId>,
    slots: BTreeMap<String, ValueSlot>,
    greedy_loaded: AtomicBool,
}

impl ScopeNode {
    pub(crate) fn root(slots: BTreeMap<String, ValueSlot>) -> Self {
        Self {
            name: None,
            parent: None,
            slots,
            greedy_loaded: AtomicBool::new(false),
        }
    }

    /// A new scope whose slots copy the parent's declarations, not its values.
    fn child_of(parent_id: ScopeId, parent: &ScopeNode, name: String) -> Self {
        Self {
            name: Some(name),
            parent: Some(parent_id),
            slots: parent
                .slots
                .iter()
                .map(|(setting, slot)| (setting.clone(), slot.fresh()))
                .collect(),
            greedy_loaded: AtomicBool::new(false),
        }
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub(crate) fn slot(&self, name: &str) -> Result<&ValueSlot> {
        self.slots
            .get(name)
            .ok_or_else(|| SettingsError::UnknownSetting(name.to_string()))
    }

    pub(crate) fn find_slot(&self, name: &str) -> Option<&ValueSlot> {
        self.slots.get(name)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &ValueSlot> {
        self.slots.values()
    }

    pub(crate) fn is_greedy_loaded(&self) -> bool {
        self.greedy_loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_greedy_loaded(&self) {
        self.greedy_loaded.store(true, Ordering::Release);
    }
}

struct TreeInner {
    nodes: Vec<Arc<ScopeNode>>,
    by_path: HashMap<Vec<String>, ScopeId>,
}

/// Registry of every scope of one collector, keyed by path.
///
/// Nodes are only ever appended, so a parent always has a lower index than
/// its children.
pub(crate) struct ScopeTree {
    inner: RwLock<TreeInner>,
}

impl ScopeTree {
    pub(crate) fn new(root: ScopeNode) -> Self {
        Self {
            inner: RwLock::new(TreeInner {
                nodes: vec![Arc::new(root)],
                by_path: HashMap::new(),
            }),
        }
    }

    pub(crate) fn node(&self, id: ScopeId) -> Result<Arc<ScopeNode>> {
        self.inner
            .read()
            .nodes
            .get(id.0)
            .cloned()
            .ok_or_else(|| SettingsError::Internal(format!("scope #{} is not registered", id.0)))
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Return the scope for `segments`, creating it and any missing ancestors.
    pub(crate) fn resolve(&self, segments: &[String], separator: &str) -> Result<(ScopeId, Arc<ScopeNode>)> {
        if segments.is_empty() {
            return Ok((ScopeId::ROOT, self.node(ScopeId::ROOT)?));
        }

        {
            let inner = self.inner.read();
            if let Some(&id) = inner.by_path.get(segments) {
                if let Some(node) = inner.nodes.get(id.0) {
                    return Ok((id, Arc::clone(node)));
                }
            }
        }

        let mut inner = self.inner.write();
        let mut current = ScopeId::ROOT;
        for depth in 1..=segments.len() {
            let path = &segments[..depth];
            current = match inner.by_path.get(path) {
                Some(&id) => id,
                None => {
                    let parent = inner.nodes.get(current.0).cloned().ok_or_else(|| {
                        SettingsError::Internal(format!("parent scope #{} is not registered", current.0))
                    })?;
                    let name = path.join(separator);
                    debug!(scope = %name, "creating scope");

                    let id = ScopeId(inner.nodes.len());
                    inner
                        .nodes
                        .push(Arc::new(ScopeNode::child_of(current, &parent, name)));
                    inner.by_path.insert(path.to_vec(), id);
                    id
                }
            };
        }

        let node = inner
            .nodes
            .get(current.0)
            .cloned()
            .ok_or_else(|| SettingsError::Internal(format!("scope #{} is not registered", current.0)))?;
        Ok((current, node))
    }

    /// The scope `id` and all of its descendants.
    pub(crate) fn subtree(&self, id: ScopeId) -> Vec<Arc<ScopeNode>> {
        let inner = self.inner.read();
        let mut members = HashSet::from([id]);
        let mut result = Vec::new();
        for (index, node) in inner.nodes.iter().enumerate().skip(id.0) {
            let node_id = ScopeId(index);
            let inside = node_id == id || node.parent.is_some_and(|parent| members.contains(&parent));
            if inside {
                members.insert(node_id);
                result.push(Arc::clone(node));
            }
        }
        result
    }

    #[cfg(test)]
    fn replace_node(&self, id: ScopeId, node: ScopeNode) {
        self.inner.write().nodes[id.0] = Arc::new(node);
    }

    #[cfg(test)]
    fn truncate(&self, len: usize) {
        self.inner.write().nodes.truncate(len);
    }
}

/// A handle to one scope of a [`SettingsCollector`](crate::core::SettingsCollector).
///
/// Handles are cheap to clone. Two handles are equal when they refer to the
/// same scope of the same collector.
///
/// # Examples
///
/// ```rust
/// use settings_collector::prelude::*;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let registry = Arc::new(SourceRegistry::new());
/// registry.register(MapSource::new("Values").with_value("x__foo", "x"));
///
/// let settings = SettingsCollector::builder()
///     .with_setting("foo", Setting::new("root"))
///     .build(registry)?;
///
/// let x = settings.scope("x")?;
/// assert_eq!(x.get("foo")?, "x".into());
/// assert_eq!(x.child("y")?.get("foo")?, "x".into());
/// assert_eq!(settings.scope("y")?.get("foo")?, "root".into());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Scope {
    pub(crate) collector: Arc<CollectorInner>,
    pub(crate) id: ScopeId,
    pub(crate) node: Arc<ScopeNode>,
}

impl Scope {
    /// Full name of the scope (`None` for the root).
    pub fn name(&self) -> Option<&str> {
        self.node.name()
    }

    /// Whether this is the root scope.
    pub fn is_root(&self) -> bool {
        self.node.parent().is_none()
    }

    /// The parent scope, or `None` for the root.
    pub fn parent(&self) -> Result<Option<Scope>> {
        let Some(parent) = self.node.parent() else {
            return Ok(None);
        };
        Ok(Some(Scope {
            collector: Arc::clone(&self.collector),
            id: parent,
            node: self.collector.tree.node(parent)?,
        }))
    }

    /// A descendant of this scope; `path` is relative and uses the separator.
    pub fn child(&self, path: &str) -> Result<Scope> {
        match (self.name(), path.is_empty()) {
            (_, true) => Ok(self.clone()),
            (None, false) => self.collector.scope(path),
            (Some(name), false) => {
                let full = format!("{}{}{}", name, self.collector.config.separator, path);
                self.collector.scope(&full)
            }
        }
    }

    /// The global prefix: `"{prefix}{separator}"` or an empty string.
    pub fn prefix(&self) -> String {
        self.collector.config.get_prefix()
    }

    /// The prefix handed to sources for this scope.
    pub fn scope_prefix(&self) -> String {
        self.collector.scope_prefix(&self.node)
    }

    /// Read a setting, resolving it through the sources and parent scopes if
    /// it is not cached.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::UnknownSetting`] if `name` was never declared
    /// - [`SettingsError::Missing`] if nothing provides a value and there is no default
    /// - [`SettingsError::Cast`] if coercion fails and no fallback is allowed
    /// - configuration and source errors from the registry
    pub fn get(&self, name: &str) -> Result<SettingValue> {
        self.collector.get(&self.node, name)
    }

    /// Read a setting and convert it into a Rust type.
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<SettingValue, Error = SettingValue>,
    {
        T::try_from(self.get(name)?).map_err(|value| SettingsError::Cast {
            value: value.repr(),
            setting: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    /// Override a setting in this scope (and, by inheritance, its descendants
    /// that have no value of their own).
    ///
    /// The value is coerced like a source value. For settings declared with
    /// `no_cache` the value is validated and then dropped, as every read goes
    /// back to the sources.
    pub fn set(&self, name: &str, value: impl Into<SettingValue>) -> Result<()> {
        self.collector.set(&self.node, name, value.into())
    }

    /// Resolve several settings (all of them if `names` is empty) from this
    /// scope's sources in one batch, caching what was found.
    ///
    /// Only values found for this very scope are returned; nothing is
    /// inherited from parents. The exception is the root's first greedy load,
    /// which also returns the defaults of every setting no source knew.
    pub fn load(&self, names: &[&str]) -> Result<BTreeMap<String, SettingValue>> {
        let names: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        let names = (!names.is_empty()).then_some(names.as_slice());
        self.collector.load(&self.node, names)
    }

    /// Forget every cached value of this scope and its descendants.
    pub fn clear_cache(&self) {
        self.collector.clear_cache(self.id);
    }

    /// Whether this scope has already done its one greedy load.
    pub fn is_greedy_loaded(&self) -> bool {
        self.node.is_greedy_loaded()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collector.name)?;
        if let Some(name) = self.name() {
            write!(f, "({:?})", name)?;
        }
        Ok(())
    }
}
