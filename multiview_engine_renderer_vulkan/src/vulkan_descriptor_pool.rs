/// DescriptorAllocator - growable set of descriptor pools
///
/// Sets are allocated from the newest pool. When it runs out, a new pool is
/// created. Pools track their live set count; a pool other than the newest
/// that drops to zero is reset and kept for reuse.

use multiview_engine::mview::{Error, Result};
use multiview_engine::{engine_debug, engine_err, engine_error, engine_info};
use ash::vk;
use rustc_hash::FxHashMap;

const SOURCE: &str = "mview::vulkan::DescriptorAllocator";

/// Sets per pool
pub(crate) const POOL_MAX_SETS: u32 = 1024;

pub(crate) fn pool_sizes() -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: POOL_MAX_SETS,
        },
        // Cull and ray-eval sets hold several storage buffers each
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: POOL_MAX_SETS * 4,
        },
    ]
}

/// Whether an allocation failure means "try a fresh pool"
pub(crate) fn is_pool_exhausted(result: vk::Result) -> bool {
    matches!(result, vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL)
}

fn create_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let sizes = pool_sizes();
    let info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&sizes)
        .max_sets(POOL_MAX_SETS);

    unsafe {
        device.create_descriptor_pool(&info, None).map_err(|e| {
            engine_error!(SOURCE, "Failed to create descriptor pool: {:?}", e);
            Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
        })
    }
}

pub(crate) struct DescriptorAllocator {
    /// Newest pool last
    pools: Vec<vk::DescriptorPool>,
    /// Reset pools waiting to become current again
    spare: Vec<vk::DescriptorPool>,
    live: FxHashMap<vk::DescriptorPool, u32>,
}

impl DescriptorAllocator {
    pub(crate) fn new(device: &ash::Device) -> Result<Self> {
        let pool = create_pool(device)?;
        let mut live = FxHashMap::default();
        live.insert(pool, 0);
        Ok(Self { pools: vec![pool], spare: Vec::new(), live })
    }

    fn current(&self) -> Result<vk::DescriptorPool> {
        self.pools
            .last()
            .copied()
            .ok_or_else(|| Error::BackendError("descriptor allocator has no pool".to_string()))
    }

    fn try_allocate(
        device: &ash::Device,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> std::result::Result<vk::DescriptorSet, vk::Result> {
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe { device.allocate_descriptor_sets(&info)? };
        sets.first().copied().ok_or(vk::Result::ERROR_UNKNOWN)
    }

    /// Allocate one set of `layout`, growing when the current pool is full
    pub(crate) fn allocate(
        &mut self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
    ) -> Result<(vk::DescriptorSet, vk::DescriptorPool)> {
        let pool = self.current()?;
        let (set, pool) = match Self::try_allocate(device, pool, layout) {
            Ok(set) => (set, pool),
            Err(e) if is_pool_exhausted(e) => {
                let next = match self.spare.pop() {
                    Some(spare) => spare,
                    None => create_pool(device)?,
                };
                self.pools.push(next);
                self.live.entry(next).or_insert(0);
                engine_info!(SOURCE, "Descriptor pool exhausted, switched pools (total: {})", self.pools.len());
                let set = Self::try_allocate(device, next, layout)
                    .map_err(|e| engine_err!(SOURCE, "Failed to allocate descriptor set after pool growth: {:?}", e))?;
                (set, next)
            }
            Err(e) => return Err(engine_err!(SOURCE, "Failed to allocate descriptor set: {:?}", e)),
        };

        *self.live.entry(pool).or_insert(0) += 1;
        Ok((set, pool))
    }

    /// Return a set to its pool
    pub(crate) fn free(&mut self, device: &ash::Device, set: vk::DescriptorSet, pool: vk::DescriptorPool) -> Result<()> {
        unsafe {
            device
                .free_descriptor_sets(pool, &[set])
                .map_err(|e| engine_err!(SOURCE, "Failed to free descriptor set: {:?}", e))?;
        }

        let remaining = match self.live.get_mut(&pool) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return Err(Error::InvalidResource("descriptor set from an unknown pool".to_string())),
        };

        // Drained pools other than the current one go back to the spares
        if remaining == 0 && self.current()? != pool {
            unsafe {
                device
                    .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                    .map_err(|e| engine_err!(SOURCE, "Failed to reset descriptor pool: {:?}", e))?;
            }
            self.pools.retain(|&p| p != pool);
            self.spare.push(pool);
            engine_debug!(SOURCE, "Descriptor pool drained and recycled");
        }
        Ok(())
    }

    pub(crate) fn pool_count(&self) -> usize {
        self.pools.len() + self.spare.len()
    }

    pub(crate) fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for pool in self.pools.drain(..).chain(self.spare.drain(..)) {
                device.destroy_descriptor_pool(pool, None);
            }
        }
        self.live.clear();
    }
}
