//! Filter form of the post list view.
//!
//! The list page exposes six inputs whose values become query parameters.
//! Every update rebuilds the query string from scratch and hands it to a
//! [`Navigator`], which performs the full page load.

use anyhow::Result;
use tracing::debug;
use url::form_urlencoded;
use url::Url;

use crate::error::AdminError;

/// Inputs of the list filter form, in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Visible,
    Index,
    Tag,
    Search,
    Provide,
    Page,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::Visible,
        FilterField::Index,
        FilterField::Tag,
        FilterField::Search,
        FilterField::Provide,
        FilterField::Page,
    ];

    /// Input id on the page, also the query parameter name.
    pub fn id(self) -> &'static str {
        match self {
            FilterField::Visible => "visible",
            FilterField::Index => "index",
            FilterField::Tag => "tag",
            FilterField::Search => "search",
            FilterField::Provide => "provide",
            FilterField::Page => "page",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.id() == id)
    }

    fn index(self) -> usize {
        match self {
            FilterField::Visible => 0,
            FilterField::Index => 1,
            FilterField::Tag => 2,
            FilterField::Search => 3,
            FilterField::Provide => 4,
            FilterField::Page => 5,
        }
    }
}

impl std::str::FromStr for FilterField {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s.trim()).ok_or_else(|| AdminError::UnknownFilterField(s.to_string()))
    }
}

/// What triggered an update. Only pagination carries the page forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Filter,
    Paginate,
}

/// Performs the navigation to the current path with a new query string.
pub trait Navigator {
    fn navigate(&mut self, query: &str) -> Result<()>;
}

/// Resolves queries against the admin list URL and remembers the target.
#[derive(Debug, Clone)]
pub struct UrlNavigator {
    base: Url,
    target: Option<Url>,
}

impl UrlNavigator {
    pub fn new(base: Url) -> Self {
        Self { base, target: None }
    }

    /// Where the last navigation went, if any.
    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }
}

impl Navigator for UrlNavigator {
    fn navigate(&mut self, query: &str) -> Result<()> {
        let mut url = self.base.clone();
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(query));
        }
        debug!(target_url = %url, "navigating list view");
        self.target = Some(url);
        Ok(())
    }
}

/// Current values of the filter inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    values: [String; 6],
}

impl FilterForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill inputs from the query string the page was rendered for.
    pub fn from_query(query: &str) -> Self {
        let mut form = Self::new();
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if let Some(field) = FilterField::from_id(&key) {
                form.set(field, value.into_owned());
            }
        }
        form
    }

    pub fn get(&self, field: FilterField) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    /// Serialize the non-empty inputs. The page parameter survives only a
    /// pagination update to a page other than "1".
    pub fn query(&self, kind: UpdateKind) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for field in FilterField::ALL {
            let value = self.get(field);
            if value.is_empty() {
                continue;
            }
            if field == FilterField::Page && (kind != UpdateKind::Paginate || value == "1") {
                continue;
            }
            serializer.append_pair(field.id(), value);
        }
        serializer.finish()
    }

    pub fn update(&self, kind: UpdateKind, navigator: &mut dyn Navigator) -> Result<()> {
        navigator.navigate(&self.query(kind))
    }

    pub fn set_update(
        &mut self,
        field: FilterField,
        value: impl Into<String>,
        navigator: &mut dyn Navigator,
    ) -> Result<()> {
        self.set(field, value);
        self.update(UpdateKind::Filter, navigator)
    }

    pub fn page(&mut self, page: impl Into<String>, navigator: &mut dyn Navigator) -> Result<()> {
        self.set(FilterField::Page, page);
        self.update(UpdateKind::Paginate, navigator)
    }
}
