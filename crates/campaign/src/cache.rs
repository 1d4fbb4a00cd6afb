//! List name to identifier cache
//!
//! Saves a remote round-trip on every name lookup and keeps the mapping
//! consistent when several resume operations run at once. Local
//! registrations and deletions always win over a remote listing that was
//! taken before them.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, ServiceError};
use crate::models::{ListId, MailingList};
use crate::remote::MailingService;

#[derive(Debug, Default)]
struct Entries {
    ids: HashMap<String, ListId>,
    /// Generation of the last local register or unregister, per name
    touched: HashMap<String, u64>,
    generation: u64,
}

impl Entries {
    fn touch(&mut self, name: &str) {
        self.generation += 1;
        self.touched.insert(name.to_string(), self.generation);
    }

    fn touched_since(&self, name: &str, generation: u64) -> bool {
        self.touched.get(name).is_some_and(|g| *g > generation)
    }
}

/// Concurrency-safe mapping from list name to remote list ID
pub struct ListIdCache {
    service: Arc<dyn MailingService>,
    entries: RwLock<Entries>,
    refresh_on_miss: bool,
}

impl ListIdCache {
    /// Build the cache from one full remote listing
    ///
    /// With `refresh_on_miss`, a failed lookup re-lists once before giving
    /// up, which picks up lists created by other processes.
    pub fn initialize(service: Arc<dyn MailingService>, refresh_on_miss: bool) -> Result<Self> {
        let cache = Self {
            service,
            entries: RwLock::new(Entries::default()),
            refresh_on_miss,
        };
        let count = cache.refresh()?;
        info!("List cache initialized with {} lists", count);
        Ok(cache)
    }

    /// Re-list remotely and merge the listing into the map
    ///
    /// Entries are only inserted or updated, never removed. Names registered
    /// or unregistered locally while the listing was in flight keep their
    /// local state.
    pub fn refresh(&self) -> Result<usize> {
        let started = self.entries.read().unwrap().generation;
        let lists = self.service.list_lists()?;
        self.merge_listing(started, &lists);
        Ok(lists.len())
    }

    fn merge_listing(&self, started: u64, lists: &[MailingList]) {
        let mut entries = self.entries.write().unwrap();
        for list in lists {
            if entries.touched_since(&list.name, started) {
                debug!("List {} changed during refresh, keeping local mapping", list.name);
                continue;
            }
            entries.ids.insert(list.name.clone(), list.id);
        }
    }

    fn lookup(&self, name: &str) -> Option<ListId> {
        self.entries.read().unwrap().ids.get(name).copied()
    }

    /// Resolve a list name to its ID
    pub fn resolve(&self, name: &str) -> Result<ListId> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }

        if self.refresh_on_miss {
            debug!("List {} not cached, refreshing", name);
            self.refresh()?;
            if let Some(id) = self.lookup(name) {
                return Ok(id);
            }
        }

        Err(ServiceError::not_found("list", name))
    }

    /// Resolve several names, failing on the first unknown one
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ListId>> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    /// Create a list remotely and register it
    ///
    /// Nothing is registered if the remote call fails. Once this returns,
    /// every reader sees the new mapping.
    pub fn create_and_register(&self, name: &str) -> Result<MailingList> {
        let list = self.service.create_list(name)?;
        self.register(&list);
        Ok(list)
    }

    /// Insert a mapping for a list that already exists remotely
    pub fn register(&self, list: &MailingList) {
        let mut entries = self.entries.write().unwrap();
        entries.touch(&list.name);
        let previous = entries.ids.insert(list.name.clone(), list.id);
        if let Some(old) = previous.filter(|old| *old != list.id) {
            warn!("List {} re-registered: {} -> {}", list.name, old, list.id);
        }
    }

    /// Delete a list by name, then drop its mapping
    ///
    /// The mapping is kept if the remote delete fails.
    pub fn delete_and_unregister(&self, name: &str) -> Result<()> {
        let id = self.resolve(name)?;
        self.delete(&MailingList::new(id, name))
    }

    /// Delete exactly `list` remotely, then drop its mapping if it still
    /// points at that list
    pub fn delete(&self, list: &MailingList) -> Result<()> {
        self.service.delete_list(list.id)?;
        self.unregister(&list.name, list.id);
        Ok(())
    }

    /// Drop a mapping if it still points at `id`
    pub fn unregister(&self, name: &str, id: ListId) -> bool {
        let mut entries = self.entries.write().unwrap();
        entries.touch(name);
        if entries.ids.get(name) == Some(&id) {
            entries.ids.remove(name);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current mapping
    pub fn snapshot(&self) -> HashMap<String, ListId> {
        self.entries.read().unwrap().ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{InMemoryMailingService, Operation};

    fn setup(refresh_on_miss: bool) -> (Arc<InMemoryMailingService>, ListIdCache) {
        let service = Arc::new(InMemoryMailingService::new());
        service.seed_list("desktop");
        service.seed_list("laptop");
        let cache = ListIdCache::initialize(service.clone(), refresh_on_miss).unwrap();
        (service, cache)
    }

    #[test]
    fn test_initialize_loads_all_lists() {
        let (service, cache) = setup(false);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.resolve("laptop").unwrap(), service.lists()[1].id);
        assert_eq!(service.count(Operation::ListLists), 1);
    }

    #[test]
    fn test_initialize_fails_when_listing_fails() {
        let service = Arc::new(InMemoryMailingService::new());
        service.fail_on(Operation::ListLists);
        let result = ListIdCache::initialize(service, true);
        assert!(matches!(result, Err(ServiceError::Remote(_))));
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let (_service, cache) = setup(false);
        let err = cache.resolve("network").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resolve_without_refresh_is_stale() {
        let (service, cache) = setup(false);
        service.seed_list("network");
        assert!(cache.resolve("network").unwrap_err().is_not_found());
        assert_eq!(service.count(Operation::ListLists), 1);
    }

    #[test]
    fn test_resolve_refreshes_once_on_miss() {
        let (service, cache) = setup(true);
        let network = service.seed_list("network");

        assert_eq!(cache.resolve("network").unwrap(), network.id);
        assert!(cache.resolve("missing").unwrap_err().is_not_found());
        assert_eq!(service.count(Operation::ListLists), 3);
    }

    #[test]
    fn test_create_and_register() {
        let (_service, cache) = setup(false);
        let list = cache.create_and_register("network").unwrap();
        assert_eq!(cache.resolve("network").unwrap(), list.id);
    }

    #[test]
    fn test_failed_create_registers_nothing() {
        let (service, cache) = setup(false);
        service.fail_on(Operation::CreateList);
        assert!(cache.create_and_register("network").is_err());
        assert!(cache.resolve("network").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_and_unregister() {
        let (service, cache) = setup(false);
        cache.create_and_register("tmp").unwrap();

        service.fail_on(Operation::DeleteList);
        assert!(cache.delete_and_unregister("tmp").is_err());
        assert!(cache.resolve("tmp").is_ok());

        service.clear_failures();
        cache.delete_and_unregister("tmp").unwrap();
        assert!(cache.resolve("tmp").unwrap_err().is_not_found());
        assert!(service.lists().iter().all(|l| l.name != "tmp"));
    }

    #[test]
    fn test_delete_by_id_keeps_newer_mapping() {
        let (service, cache) = setup(false);
        let old = cache.create_and_register("tmp").unwrap();
        service.delete_list(old.id).unwrap();
        let new = cache.create_and_register("tmp").unwrap();

        assert!(cache.delete(&old).unwrap_err().is_not_found());
        assert_eq!(cache.resolve("tmp").unwrap(), new.id);

        cache.delete(&new).unwrap();
        assert!(cache.resolve("tmp").unwrap_err().is_not_found());
    }

    #[test]
    fn test_listing_taken_before_delete_does_not_resurrect() {
        let (service, cache) = setup(false);
        let old = cache.create_and_register("X_inc_audience").unwrap();

        let started = cache.entries.read().unwrap().generation;
        let listing = service.list_lists().unwrap();

        cache.delete(&old).unwrap();
        cache.merge_listing(started, &listing);

        assert!(cache.resolve("X_inc_audience").unwrap_err().is_not_found());
    }

    #[test]
    fn test_listing_taken_before_recreate_keeps_new_id() {
        let (service, cache) = setup(false);
        let old = cache.create_and_register("X_inc_audience").unwrap();

        let started = cache.entries.read().unwrap().generation;
        let listing = service.list_lists().unwrap();

        cache.delete(&old).unwrap();
        let new = cache.create_and_register("X_inc_audience").unwrap();
        cache.merge_listing(started, &listing);

        assert_eq!(cache.resolve("X_inc_audience").unwrap(), new.id);
        assert_ne!(new.id, old.id);

        // Later listings are taken after the change and merge normally
        let network = service.seed_list("network");
        cache.refresh().unwrap();
        assert_eq!(cache.resolve("network").unwrap(), network.id);
        assert_eq!(cache.resolve("X_inc_audience").unwrap(), new.id);
    }

    #[test]
    fn test_unregister_ignores_newer_mapping() {
        let (_service, cache) = setup(false);
        let list = cache.create_and_register("tmp").unwrap();
        assert!(!cache.unregister("tmp", ListId(list.id.get() + 100)));
        assert!(cache.unregister("tmp", list.id));
        assert!(!cache.snapshot().contains_key("tmp"));
    }

    #[test]
    fn test_concurrent_resolve_after_register() {
        let (_service, cache) = setup(false);
        let list = cache.create_and_register("X").unwrap();

        let resolved: Vec<ListId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..10).map(|_| s.spawn(|| cache.resolve("X").unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(resolved.len(), 10);
        assert!(resolved.iter().all(|id| *id == list.id));
    }

    #[test]
    fn test_concurrent_create_and_resolve() {
        let (_service, cache) = setup(true);

        std::thread::scope(|s| {
            for i in 0..10 {
                let cache = &cache;
                s.spawn(move || {
                    let name = format!("concurrent-test-list-{}", i);
                    let list = cache.create_and_register(&name).unwrap();
                    assert_eq!(cache.resolve(&name).unwrap(), list.id);
                    for _ in 0..5 {
                        cache.refresh().unwrap();
                        assert_eq!(cache.resolve(&name).unwrap(), list.id);
                    }
                });
            }
        });

        assert_eq!(cache.len(), 12);
    }
}
