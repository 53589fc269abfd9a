use sea_orm::RelationDef;

/// An eager-loaded relation.
///
/// Identified by `name`, which is also the key under which related rows are
/// attached to a returned [`Record`](crate::Record). The relation is kept as
/// a constructor since `RelationDef` itself cannot be cloned.
#[derive(Debug, Clone)]
pub struct Include {
    pub name: String,
    relation: fn() -> RelationDef,
    /// Skip this default on `find`/`find_all` unless explicitly requested.
    pub ignore_on_find: bool,
}

impl Include {
    #[must_use]
    pub fn new(name: impl Into<String>, relation: fn() -> RelationDef) -> Self {
        Self {
            name: name.into(),
            relation,
            ignore_on_find: false,
        }
    }

    /// A fresh definition of the included relation.
    #[must_use]
    pub fn relation(&self) -> RelationDef {
        (self.relation)()
    }

    #[must_use]
    pub fn ignore_on_find(mut self) -> Self {
        self.ignore_on_find = true;
        self
    }
}

/// How requested includes combine with the entity defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncludeMode {
    /// No eager loads at all.
    Raw,
    /// The request as given; defaults only when nothing was requested.
    #[default]
    Explicit,
    /// The request plus every find default not already requested.
    Merge,
}

/// Resolve the includes of one read.
#[must_use]
pub fn merge_includes(
    requested: Option<&[Include]>,
    defaults: &[Include],
    mode: IncludeMode,
) -> Vec<Include> {
    match mode {
        IncludeMode::Raw => Vec::new(),
        IncludeMode::Explicit => requested.unwrap_or(defaults).to_vec(),
        IncludeMode::Merge => {
            let mut out: Vec<Include> = Vec::new();
            let extra = defaults.iter().filter(|d| !d.ignore_on_find);
            for inc in requested.unwrap_or_default().iter().chain(extra) {
                if !out.iter().any(|o| o.name == inc.name) {
                    out.push(inc.clone());
                }
            }
            out
        }
    }
}

/// Defaults that apply to `find`/`find_all` when nothing is requested.
#[must_use]
pub fn find_defaults(defaults: &[Include]) -> Vec<Include> {
    defaults
        .iter()
        .filter(|d| !d.ignore_on_find)
        .cloned()
        .collect()
}
