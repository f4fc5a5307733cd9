//! Fixed-capacity light slot allocator with distance-based eviction.
//!
//! Slots are handed out lowest-index-first. When the pool is full, a light that
//! belongs to a block may take over the slot of the block light farthest from the
//! viewer, provided that light is farther away than the new one. Lights without an
//! owning block (ambient, directional, scene-placed lights) are never evicted.

use glam::Vec3;

use crate::light::{Light, LightGpu, LightHeader};

/// Number of light slots.
pub const MAX_LIGHTS: usize = 256;

/// The block a light belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightOwner {
    /// World coordinates of the owning block.
    pub block: [i64; 3],
    /// World-space center used for the eviction distance.
    pub center: Vec3,
}

/// Result of a successful [`LightPool::add`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Allocation {
    /// Slot the light now occupies.
    pub slot: usize,
    /// Owner whose light was overwritten to make room, if any.
    pub evicted: Option<LightOwner>,
}

#[derive(Clone, Debug)]
struct Slot {
    light: Light,
    owner: Option<LightOwner>,
}

/// Fixed array of [`MAX_LIGHTS`] light slots.
pub struct LightPool {
    slots: Vec<Option<Slot>>,
    active: usize,
    viewer: Vec3,
}

impl LightPool {
    /// Create an empty pool with the viewer at the origin.
    pub fn new() -> Self {
        Self {
            slots: vec![None; MAX_LIGHTS],
            active: 0,
            viewer: Vec3::ZERO,
        }
    }

    /// Position eviction distances are measured from.
    pub fn set_viewer(&mut self, position: Vec3) {
        self.viewer = position;
    }

    pub fn viewer(&self) -> Vec3 {
        self.viewer
    }

    /// Lowest inactive slot, or [`MAX_LIGHTS`] when every slot is taken.
    pub fn first_free_index(&self) -> usize {
        self.slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(MAX_LIGHTS)
    }

    /// Store `light`, evicting a farther block light if the pool is full.
    ///
    /// Returns `None` when no slot could be obtained: the pool is full and either
    /// no owner was given or no block light is strictly farther from the viewer.
    /// The pool is left untouched in that case.
    pub fn add(&mut self, light: Light, owner: Option<LightOwner>) -> Option<Allocation> {
        let free = self.first_free_index();
        if free < MAX_LIGHTS {
            self.slots[free] = Some(Slot { light, owner });
            self.active += 1;
            return Some(Allocation {
                slot: free,
                evicted: None,
            });
        }

        let incoming = owner?;
        let reference = incoming.center.distance(self.viewer);
        let (victim, _) = self.farthest_block_light_beyond(reference)?;

        let previous = self.slots[victim]
            .replace(Slot { light, owner })
            .and_then(|s| s.owner);
        tracing::debug!(
            slot = victim,
            evicted = ?previous.map(|o| o.block),
            "evicted block light for closer block {:?}",
            incoming.block
        );
        Some(Allocation {
            slot: victim,
            evicted: previous,
        })
    }

    /// Block-owned slot with the largest viewer distance above `reference`.
    /// Equal distances resolve to the lowest slot.
    fn farthest_block_light_beyond(&self, reference: f32) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(owner) = slot.as_ref().and_then(|s| s.owner) else {
                continue;
            };
            let distance = owner.center.distance(self.viewer);
            if distance <= reference {
                continue;
            }
            if best.is_none_or(|(_, d)| distance > d) {
                best = Some((index, distance));
            }
        }
        best
    }

    /// Free a slot. Out-of-range or already free slots are ignored.
    pub fn remove(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot)
            && entry.take().is_some()
        {
            self.active -= 1;
        }
    }

    /// Free every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.active = 0;
    }

    pub fn get(&self, slot: usize) -> Option<&Light> {
        self.slots.get(slot)?.as_ref().map(|s| &s.light)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Light> {
        self.slots.get_mut(slot)?.as_mut().map(|s| &mut s.light)
    }

    /// Owning block of an occupied slot.
    pub fn owner(&self, slot: usize) -> Option<&LightOwner> {
        self.slots.get(slot)?.as_ref()?.owner.as_ref()
    }

    /// Number of occupied slots.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Highest occupied slot + 1; the shader walks this many slots.
    pub fn span(&self) -> usize {
        self.slots
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |i| i + 1)
    }

    pub fn is_full(&self) -> bool {
        self.active == MAX_LIGHTS
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Light, Option<&LightOwner>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, &s.light, s.owner.as_ref())))
    }

    /// Lights that belong to no block.
    pub fn unowned(&self) -> impl Iterator<Item = &Light> {
        self.iter()
            .filter(|(_, _, owner)| owner.is_none())
            .map(|(_, light, _)| light)
    }

    /// Buffer header for the current state.
    pub fn header(&self) -> LightHeader {
        LightHeader {
            span: self.span() as u32,
            active: self.active as u32,
            _pad: [0; 2],
        }
    }

    /// All slots packed for upload, inactive slots zeroed.
    pub fn gpu_slots(&self) -> Vec<LightGpu> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map_or(LightGpu::default(), |s| s.light.to_gpu(true)))
            .collect()
    }
}

impl Default for LightPool {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> Light {
        Light::point(Vec3::ZERO, Vec3::ONE, 1.0, Light::DEFAULT_FALLOFF)
    }

    fn owner_at(x: f32) -> LightOwner {
        LightOwner {
            block: [x as i64, 0, 0],
            center: Vec3::new(x, 0.0, 0.0),
        }
    }

    /// Fill every slot with a block light at distance `10 + slot`.
    fn full_pool() -> LightPool {
        let mut pool = LightPool::new();
        for i in 0..MAX_LIGHTS {
            pool.add(lamp(), Some(owner_at(10.0 + i as f32))).expect("free slot");
        }
        pool
    }

    #[test]
    fn test_first_free_index_is_lowest_gap() {
        let mut pool = LightPool::new();
        assert_eq!(pool.first_free_index(), 0);
        for _ in 0..4 {
            pool.add(lamp(), None);
        }
        pool.remove(1);
        assert_eq!(pool.first_free_index(), 1);
        pool.add(lamp(), None);
        assert_eq!(pool.first_free_index(), 4);
    }

    #[test]
    fn test_full_pool_reports_sentinel() {
        let pool = full_pool();
        assert!(pool.is_full());
        assert_eq!(pool.first_free_index(), MAX_LIGHTS);
    }

    #[test]
    fn test_add_without_owner_fails_when_full() {
        let mut pool = full_pool();
        assert_eq!(pool.add(lamp(), None), None);
        assert_eq!(pool.active_count(), MAX_LIGHTS);
    }

    #[test]
    fn test_closer_block_evicts_farthest() {
        let mut pool = full_pool();
        let allocation = pool.add(lamp(), Some(owner_at(1.0))).expect("eviction");
        assert_eq!(allocation.slot, MAX_LIGHTS - 1);
        assert_eq!(
            allocation.evicted.map(|o| o.block),
            Some([10 + MAX_LIGHTS as i64 - 1, 0, 0])
        );
        assert_eq!(pool.owner(MAX_LIGHTS - 1).map(|o| o.block), Some([1, 0, 0]));
        assert_eq!(pool.active_count(), MAX_LIGHTS);
    }

    #[test]
    fn test_farther_block_fails_without_mutation() {
        let mut pool = full_pool();
        let before: Vec<_> = pool.iter().map(|(i, _, o)| (i, o.copied())).collect();
        assert_eq!(pool.add(lamp(), Some(owner_at(10_000.0))), None);
        let after: Vec<_> = pool.iter().map(|(i, _, o)| (i, o.copied())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_equal_distance_is_not_evicted() {
        let mut pool = LightPool::new();
        for _ in 0..MAX_LIGHTS {
            pool.add(lamp(), Some(owner_at(5.0)));
        }
        assert_eq!(pool.add(lamp(), Some(owner_at(5.0))), None);
    }

    #[test]
    fn test_unowned_lights_never_evicted() {
        let mut pool = LightPool::new();
        // Slot 0 is an environment light, conceptually the most distant.
        pool.add(lamp(), None);
        for i in 1..MAX_LIGHTS {
            pool.add(lamp(), Some(owner_at(i as f32)));
        }
        let allocation = pool.add(lamp(), Some(owner_at(0.5))).expect("eviction");
        assert_ne!(allocation.slot, 0);
        assert_eq!(allocation.slot, MAX_LIGHTS - 1);
        assert!(pool.owner(0).is_none());
        assert!(pool.get(0).is_some());
    }

    #[test]
    fn test_only_unowned_lights_blocks_eviction() {
        let mut pool = LightPool::new();
        for _ in 0..MAX_LIGHTS {
            pool.add(lamp(), None);
        }
        assert_eq!(pool.add(lamp(), Some(owner_at(0.0))), None);
    }

    #[test]
    fn test_eviction_uses_viewer_position() {
        let mut pool = full_pool();
        // Viewer far along +x: the slot-0 light (x = 10) is now the farthest.
        pool.set_viewer(Vec3::new(1000.0, 0.0, 0.0));
        let allocation = pool.add(lamp(), Some(owner_at(900.0))).expect("eviction");
        assert_eq!(allocation.slot, 0);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut pool = LightPool::new();
        pool.add(lamp(), None);
        pool.remove(MAX_LIGHTS);
        pool.remove(usize::MAX);
        pool.remove(3);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_remove_frees_slot_and_association() {
        let mut pool = LightPool::new();
        let slot = pool.add(lamp(), Some(owner_at(2.0))).unwrap().slot;
        pool.remove(slot);
        assert!(pool.owner(slot).is_none());
        assert!(pool.get(slot).is_none());
        assert_eq!(pool.active_count(), 0);
        pool.remove(slot);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_active_count_independent_of_gaps() {
        let mut pool = LightPool::new();
        for _ in 0..5 {
            pool.add(lamp(), None);
        }
        pool.remove(0);
        pool.remove(2);
        assert_eq!(pool.first_free_index(), 0);
        assert_eq!(pool.active_count(), 3);
        assert_eq!(pool.span(), 5);
        assert_eq!(
            pool.header(),
            LightHeader {
                span: 5,
                active: 3,
                _pad: [0; 2]
            }
        );
    }

    #[test]
    fn test_gpu_slots_mark_inactive() {
        let mut pool = LightPool::new();
        pool.add(lamp(), None);
        pool.add(lamp(), None);
        pool.remove(0);
        let slots = pool.gpu_slots();
        assert_eq!(slots.len(), MAX_LIGHTS);
        assert_eq!(slots[0].active, 0);
        assert_eq!(slots[1].active, 1);
    }

    #[test]
    fn test_unowned_iterates_environment_lights() {
        let mut pool = LightPool::new();
        pool.add(Light::environment(Vec3::ONE, 0.2), None);
        pool.add(lamp(), Some(owner_at(1.0)));
        assert_eq!(pool.unowned().count(), 1);
    }
}
