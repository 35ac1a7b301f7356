//! 可通过 `robowoofy run <task>` 执行的运营任务。

mod cow_sell;
mod woofy;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::Task;

pub use cow_sell::{CowSell, CowSellSettings};
pub use woofy::Woofy;

/// 按名称索引的任务表。
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tasks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Woofy::default()));
        assert!(registry.get("woofy").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["woofy"]);
    }
}
