#![forbid(unsafe_code)]

use crate::plugins::RecordPlugin;
use calsvc_core::ViewId;

/// Joined and instance views: reads and counts only. Every write falls
/// through to the trait defaults and is rejected.
#[derive(Clone, Copy, Debug)]
pub struct QueryOnlyPlugin {
    view: ViewId,
}

impl QueryOnlyPlugin {
    pub const fn new(view: ViewId) -> Self {
        Self { view }
    }
}

impl RecordPlugin for QueryOnlyPlugin {
    fn view(&self) -> ViewId {
        self.view
    }
}
