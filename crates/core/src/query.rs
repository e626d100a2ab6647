#![forbid(unsafe_code)]

use crate::filter::Filter;
use crate::property::PropertyId;
use crate::view::ViewId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sort {
    pub property: PropertyId,
    pub ascending: bool,
}

/// A filtered, projected and ordered read against one view.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub view: ViewId,
    pub filter: Option<Filter>,
    /// Empty means every mapped property.
    pub projection: Vec<PropertyId>,
    pub sort: Option<Sort>,
    pub distinct: bool,
}

impl Query {
    pub fn new(view: ViewId) -> Self {
        Self {
            view,
            filter: None,
            projection: Vec::new(),
            sort: None,
            distinct: false,
        }
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn project(mut self, properties: impl IntoIterator<Item = PropertyId>) -> Self {
        self.projection.extend(properties);
        self
    }

    pub fn sort(mut self, property: PropertyId, ascending: bool) -> Self {
        self.sort = Some(Sort {
            property,
            ascending,
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}
