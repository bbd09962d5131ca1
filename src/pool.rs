//! Generic transient-object pool.
//!
//! Keeps previously constructed instances alive and toggles them
//! active/inactive instead of constructing/destroying per use, so sustained
//! fire rates run allocation-free in steady state. The pool only grows,
//! never shrinks, for its lifetime.

use std::collections::VecDeque;

use glam::Vec3;
use thiserror::Error;

/// Where and how an activated instance is placed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub position: Vec3,
    /// Facing direction (aim forward for muzzle flashes, surface normal for
    /// impact marks).
    pub orientation: Vec3,
}

impl Placement {
    pub fn new(position: Vec3, orientation: Vec3) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Stable handle to a pooled instance. Identity never changes; only the
/// active flag and placement do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(u32);

impl PoolHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Pool failure modes. Only configuration can fail; runtime use cannot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The instance template was never configured. A setup fault, not a
    /// runtime condition.
    #[error("object pool template is not configured")]
    TemplateUnset,
}

struct Slot<T> {
    item: T,
    active: bool,
    placement: Placement,
}

/// Reusable-instance allocator over instances of `T`.
pub struct ObjectPool<T> {
    template: Option<Box<dyn Fn() -> T + Send + Sync>>,
    slots: Vec<Slot<T>>,
    free: VecDeque<u32>,
}

impl<T> ObjectPool<T> {
    /// Create a pool with no template. [`ObjectPool::get`] and
    /// [`ObjectPool::prewarm`] fail until one is set.
    pub fn unconfigured() -> Self {
        Self {
            template: None,
            slots: Vec::new(),
            free: VecDeque::new(),
        }
    }

    /// Create a pool that constructs instances with `template`.
    pub fn with_template(template: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            template: Some(Box::new(template)),
            slots: Vec::new(),
            free: VecDeque::new(),
        }
    }

    pub fn set_template(&mut self, template: impl Fn() -> T + Send + Sync + 'static) {
        self.template = Some(Box::new(template));
    }

    /// Construct `count` inactive instances up front.
    pub fn prewarm(&mut self, count: usize) -> Result<(), PoolError> {
        for _ in 0..count {
            let handle = self.construct()?;
            self.free.push_back(handle.0);
        }
        Ok(())
    }

    fn construct(&mut self) -> Result<PoolHandle, PoolError> {
        let template = self.template.as_ref().ok_or(PoolError::TemplateUnset)?;
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            item: template(),
            active: false,
            placement: Placement::default(),
        });
        Ok(PoolHandle(index))
    }

    /// Borrow an instance: dequeue an inactive one if available, construct a
    /// new one otherwise. Places and activates it. Never blocks.
    pub fn get(&mut self, placement: Placement) -> Result<PoolHandle, PoolError> {
        let handle = match self.free.pop_front() {
            Some(index) => PoolHandle(index),
            None => self.construct()?,
        };
        let slot = &mut self.slots[handle.index()];
        slot.active = true;
        slot.placement = placement;
        Ok(handle)
    }

    /// Deactivate an instance and re-enqueue it for reuse. A no-op for
    /// handles that are unknown or already inactive; repeated or late
    /// returns are tolerated because callers schedule returns by fixed
    /// delay without cancellation tracking.
    pub fn put_back(&mut self, handle: PoolHandle) {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return;
        };
        if !slot.active {
            return;
        }
        slot.active = false;
        self.free.push_back(handle.0);
    }

    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.slots
            .get(handle.index())
            .map(|s| s.active)
            .unwrap_or(false)
    }

    pub fn item(&self, handle: PoolHandle) -> Option<&T> {
        self.slots.get(handle.index()).map(|s| &s.item)
    }

    pub fn placement(&self, handle: PoolHandle) -> Option<Placement> {
        self.slots.get(handle.index()).map(|s| s.placement)
    }

    /// Total instances ever constructed (active + inactive).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn inactive_count(&self) -> usize {
        self.free.len()
    }

    /// Iterate over currently active instances.
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, Placement, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(i, slot)| (PoolHandle(i as u32), slot.placement, &slot.item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_pool() -> ObjectPool<u32> {
        use std::sync::atomic::{AtomicU32, Ordering};
        let counter = AtomicU32::new(0);
        ObjectPool::with_template(move || counter.fetch_add(1, Ordering::Relaxed))
    }

    #[test]
    fn test_unconfigured_pool_fails_loudly() {
        let mut pool: ObjectPool<u32> = ObjectPool::unconfigured();
        assert_eq!(pool.prewarm(4), Err(PoolError::TemplateUnset));
        assert_eq!(
            pool.get(Placement::default()),
            Err(PoolError::TemplateUnset)
        );
    }

    #[test]
    fn test_prewarm_constructs_inactive_instances() {
        let mut pool = counter_pool();
        pool.prewarm(8).unwrap();
        assert_eq!(pool.len(), 8);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.inactive_count(), 8);
    }

    #[test]
    fn test_get_beyond_prewarm_constructs_new_instances() {
        let mut pool = counter_pool();
        pool.prewarm(3).unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| pool.get(Placement::default()).unwrap())
            .collect();

        // 3 prewarmed + 2 overflow constructions, all active and distinct.
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.active_count(), 5);
        for (i, a) in handles.iter().enumerate() {
            assert!(pool.is_active(*a));
            for b in &handles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_get_reuses_returned_instances() {
        let mut pool = counter_pool();
        pool.prewarm(1).unwrap();

        let first = pool.get(Placement::default()).unwrap();
        pool.put_back(first);
        let second = pool.get(Placement::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_double_return_is_a_no_op() {
        let mut pool = counter_pool();
        let handle = pool.get(Placement::default()).unwrap();

        pool.put_back(handle);
        let inactive_after_first = pool.inactive_count();
        pool.put_back(handle);

        // Inactive set grew by at most one across both returns.
        assert_eq!(pool.inactive_count(), inactive_after_first);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_return_of_never_borrowed_instance_is_a_no_op() {
        let mut pool = counter_pool();
        pool.prewarm(2).unwrap();

        pool.put_back(PoolHandle(0));
        pool.put_back(PoolHandle(99));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.inactive_count(), 2);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_pool_only_grows() {
        let mut pool = counter_pool();
        pool.prewarm(2).unwrap();
        let handles: Vec<_> = (0..6)
            .map(|_| pool.get(Placement::default()).unwrap())
            .collect();
        for h in handles {
            pool.put_back(h);
        }
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.inactive_count(), 6);
    }

    #[test]
    fn test_placement_follows_activation() {
        let mut pool = counter_pool();
        let placement = Placement::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y);
        let handle = pool.get(placement).unwrap();
        assert_eq!(pool.placement(handle), Some(placement));

        let active: Vec<_> = pool.iter_active().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].1, placement);
    }
}
