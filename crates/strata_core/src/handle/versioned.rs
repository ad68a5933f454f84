use super::Handle;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

/// Storage that can resolve handles for [`VersionedRef`].
///
/// `version` must change whenever previously resolved locations may have
/// become wrong (an id was freed, or values were relocated).
pub trait RefProvider<T> {
    fn version(&self) -> u64;

    /// Storage location of the value behind `handle`, if it is still current.
    fn locate(&self, handle: Handle) -> Option<usize>;

    fn at_location(&self, location: usize) -> Option<&T>;

    fn at_location_mut(&mut self, location: usize) -> Option<&mut T>;

    /// Deregister `handle` and hand back its value.
    fn release(&mut self, handle: Handle) -> Option<T>;

    /// Queue that dropped owning references push their handle onto.
    fn release_queue(&self) -> ReleaseQueue;
}

/// Producer side of a provider's pending releases.
#[derive(Debug, Clone)]
pub struct ReleaseQueue {
    tx: Sender<Handle>,
}

impl ReleaseQueue {
    pub fn push(&self, handle: Handle) {
        // The provider is gone, so there is nothing left to free.
        let _ = self.tx.send(handle);
    }
}

/// Consumer side kept by the provider. Drained on the provider's next mutation.
#[derive(Debug)]
pub struct ReleaseInbox {
    tx: Sender<Handle>,
    rx: Receiver<Handle>,
}

impl ReleaseInbox {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn queue(&self) -> ReleaseQueue {
        ReleaseQueue {
            tx: self.tx.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn drain(&self) -> impl Iterator<Item = Handle> + '_ {
        self.rx.try_iter()
    }
}

impl Default for ReleaseInbox {
    fn default() -> Self {
        Self::new()
    }
}

enum Target<T> {
    Null,
    Direct(Arc<T>),
    Bound {
        handle: Handle,
        location: Option<usize>,
        seen_version: Option<u64>,
    },
}

/// Lazily revalidated weak reference.
///
/// A bound reference caches the storage location it resolved to together with
/// the provider version at that time. Lookups only go back through the
/// provider when the version has moved, and a handle whose generation no
/// longer matches resolves to `None`, never to the id's next occupant.
///
/// A direct reference wraps a value that lives outside any provider.
///
/// An owning reference frees its id when dropped: the handle goes onto the
/// provider's [`ReleaseQueue`] and is released on the provider's next
/// mutation (or an explicit `reclaim`).
pub struct VersionedRef<T> {
    target: Target<T>,
    owner: Option<ReleaseQueue>,
}

impl<T> VersionedRef<T> {
    pub fn null() -> Self {
        Self {
            target: Target::Null,
            owner: None,
        }
    }

    pub fn direct(value: Arc<T>) -> Self {
        Self {
            target: Target::Direct(value),
            owner: None,
        }
    }

    pub fn bind(handle: Handle) -> Self {
        Self {
            target: Target::Bound {
                handle,
                location: None,
                seen_version: None,
            },
            owner: None,
        }
    }

    /// Bound reference that frees `handle` in `provider` when released or
    /// dropped.
    pub fn owning<P>(handle: Handle, provider: &P) -> Self
    where
        P: RefProvider<T> + ?Sized,
    {
        Self {
            target: Target::Bound {
                handle,
                location: None,
                seen_version: None,
            },
            owner: Some(provider.release_queue()),
        }
    }

    pub fn handle(&self) -> Option<Handle> {
        match self.target {
            Target::Bound { handle, .. } => Some(handle),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.target, Target::Bound { .. })
    }

    pub fn is_owning(&self) -> bool {
        self.owner.is_some()
    }

    /// Resolve the reference, revalidating against the provider only when
    /// its version changed since the last lookup.
    pub fn get<'a, P>(&'a mut self, provider: &'a P) -> Option<&'a T>
    where
        P: RefProvider<T>,
    {
        match &mut self.target {
            Target::Null => None,
            Target::Direct(value) => Some(&**value),
            Target::Bound {
                handle,
                location,
                seen_version,
            } => {
                revalidate::<T, P>(provider, *handle, location, seen_version);
                provider.at_location((*location)?)
            }
        }
    }

    pub fn get_mut<'a, P>(&'a mut self, provider: &'a mut P) -> Option<&'a mut T>
    where
        P: RefProvider<T>,
    {
        match &mut self.target {
            Target::Null | Target::Direct(_) => None,
            Target::Bound {
                handle,
                location,
                seen_version,
            } => {
                revalidate::<T, P>(&*provider, *handle, location, seen_version);
                provider.at_location_mut((*location)?)
            }
        }
    }

    /// True for direct references, and for bound references that still
    /// resolve.
    pub fn is_valid<P>(&mut self, provider: &P) -> bool
    where
        P: RefProvider<T>,
    {
        match self.target {
            Target::Null => false,
            Target::Direct(_) => true,
            Target::Bound { .. } => self.get(provider).is_some(),
        }
    }

    /// Give up ownership: deregister the handle from the provider and return
    /// the released value. Non-owning references release nothing.
    pub fn release<P>(mut self, provider: &mut P) -> Option<T>
    where
        P: RefProvider<T>,
    {
        self.owner.take()?;
        let handle = self.handle()?;
        provider.release(handle)
    }
}

fn revalidate<T, P: RefProvider<T> + ?Sized>(
    provider: &P,
    handle: Handle,
    location: &mut Option<usize>,
    seen_version: &mut Option<u64>,
) {
    let current = provider.version();
    if *seen_version != Some(current) {
        *location = provider.locate(handle);
        *seen_version = Some(current);
    }
}

impl<T> Clone for VersionedRef<T> {
    /// Clones never own.
    fn clone(&self) -> Self {
        let target = match &self.target {
            Target::Null => Target::Null,
            Target::Direct(value) => Target::Direct(Arc::clone(value)),
            Target::Bound {
                handle,
                location,
                seen_version,
            } => Target::Bound {
                handle: *handle,
                location: *location,
                seen_version: *seen_version,
            },
        };
        Self {
            target,
            owner: None,
        }
    }
}

impl<T> Default for VersionedRef<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> std::fmt::Debug for VersionedRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("VersionedRef");
        match &self.target {
            Target::Null => s.field("target", &"null"),
            Target::Direct(_) => s.field("target", &"direct"),
            Target::Bound {
                handle,
                seen_version,
                ..
            } => s.field("handle", handle).field("seen_version", seen_version),
        };
        s.field("owning", &self.is_owning()).finish()
    }
}

impl<T> Drop for VersionedRef<T> {
    fn drop(&mut self) {
        if let (Some(queue), Some(handle)) = (self.owner.take(), self.handle()) {
            tracing::debug!("Owning reference to {:?} dropped, queued for release", handle);
            queue.push(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::IndexTable;
    use crate::pool::PoolConfig;

    fn table() -> IndexTable<String> {
        IndexTable::new(PoolConfig {
            chunk_size: 4,
            growth_factor: 1.0,
        })
    }

    #[test]
    fn cached_location_tracks_relocation() {
        let mut t = table();
        let handles: Vec<_> = (0..6).map(|i| t.pop_next(format!("v{i}")).unwrap()).collect();
        let mut r = VersionedRef::bind(handles[5]);
        let before = r.get(&t).map(|v| v as *const String);
        assert!(before.is_some());

        for h in &handles[..4] {
            t.mark_free(h.index());
        }
        t.compact();

        let fresh = t.get_at(5).unwrap() as *const String;
        let resolved = r.get(&t).unwrap() as *const String;
        assert_eq!(resolved, fresh);
        assert_ne!(Some(resolved), before);
    }

    #[test]
    fn stale_generation_resolves_to_none_after_reuse() {
        let mut t = table();
        let h = t.try_reserve(42, "old".to_string()).unwrap();
        let mut r = VersionedRef::bind(h);
        assert_eq!(r.get(&t).map(String::as_str), Some("old"));

        t.mark_free(42);
        assert!(!t.is_index_used(42));
        let reused = t.try_reserve(42, "new".to_string()).unwrap();
        assert_eq!(reused.index(), 42);

        assert_eq!(r.get(&t), None);
        assert!(!r.is_valid(&t));
    }

    #[test]
    fn unchanged_version_skips_lookup() {
        struct Counting {
            inner: IndexTable<String>,
            lookups: std::cell::Cell<usize>,
        }
        impl RefProvider<String> for Counting {
            fn version(&self) -> u64 {
                self.inner.version()
            }
            fn locate(&self, handle: Handle) -> Option<usize> {
                self.lookups.set(self.lookups.get() + 1);
                self.inner.locate(handle)
            }
            fn at_location(&self, location: usize) -> Option<&String> {
                self.inner.at_location(location)
            }
            fn at_location_mut(&mut self, location: usize) -> Option<&mut String> {
                self.inner.at_location_mut(location)
            }
            fn release(&mut self, handle: Handle) -> Option<String> {
                self.inner.release(handle)
            }
            fn release_queue(&self) -> ReleaseQueue {
                self.inner.release_queue()
            }
        }

        let mut inner = table();
        let h = inner.pop_next("x".into()).unwrap();
        let other = inner.pop_next("y".into()).unwrap();
        let mut p = Counting {
            inner,
            lookups: Default::default(),
        };
        let mut r = VersionedRef::bind(h);
        r.get(&p);
        r.get(&p);
        r.get(&p);
        assert_eq!(p.lookups.get(), 1);

        p.inner.mark_free(other.index());
        assert!(r.get(&p).is_some());
        assert_eq!(p.lookups.get(), 2);
    }

    #[test]
    fn validity_rules() {
        let t = table();
        let mut null: VersionedRef<String> = VersionedRef::null();
        assert!(!null.is_valid(&t));

        let mut direct = VersionedRef::direct(Arc::new("loose".to_string()));
        assert!(direct.is_valid(&t));
        assert_eq!(direct.get(&t).map(String::as_str), Some("loose"));

        let mut dangling = VersionedRef::bind(Handle::new(3, 0));
        assert!(!dangling.is_valid(&t));
    }

    #[test]
    fn owning_release_frees_the_id() {
        let mut t = table();
        let h = t.pop_next("owned".to_string()).unwrap();
        let r = VersionedRef::owning(h, &t);
        let copy = r.clone();
        assert!(!copy.is_owning());
        assert_eq!(copy.release(&mut t), None);

        assert_eq!(r.release(&mut t).as_deref(), Some("owned"));
        assert!(!t.is_index_used(h.index()));
    }

    #[test]
    fn direct_ref_resolves_without_provider_lookup() {
        let t = table();
        let value = Arc::new("loose".to_string());
        let mut r = VersionedRef::direct(Arc::clone(&value));
        let resolved = r.get(&t).unwrap();
        assert!(std::ptr::eq(resolved, &*value));
        assert_eq!(r.handle(), None);
        assert!(r.clone().get(&t).is_some());
    }

    #[test]
    fn dropped_owning_ref_frees_its_id() {
        let mut t = table();
        let h = t.pop_next("owned".to_string()).unwrap();
        {
            let r = VersionedRef::owning(h, &t);
            assert!(r.is_owning());
        }
        assert_eq!(t.reclaim(), 1);
        assert!(!t.is_index_used(h.index()));
        assert_eq!(t.get(h), None);

        // Dropping is enough; the next claim applies pending releases itself.
        let again = t.pop_next("again".to_string()).unwrap();
        drop(VersionedRef::owning(again, &t));
        let next = t.pop_next("next".to_string()).unwrap();
        assert_eq!(next.index(), again.index());
        assert_eq!(t.get(again), None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn released_owning_ref_is_not_freed_twice() {
        let mut t = table();
        let h = t.pop_next("owned".to_string()).unwrap();
        let r = VersionedRef::owning(h, &t);
        assert_eq!(r.release(&mut t).as_deref(), Some("owned"));
        let reused = t.pop_next("reused".to_string()).unwrap();
        assert_eq!(t.reclaim(), 0);
        assert_eq!(t.get(reused).map(String::as_str), Some("reused"));
    }

    #[test]
    fn get_mut_writes_through() {
        let mut t = table();
        let h = t.pop_next("a".to_string()).unwrap();
        let mut r = VersionedRef::bind(h);
        r.get_mut(&mut t).unwrap().push('b');
        assert_eq!(t.get(h).map(String::as_str), Some("ab"));
    }
}
