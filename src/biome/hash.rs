//! Stateless per-cell noise for biome stages
//!
//! Every stage decision is a pure function of (seed, salt, x, z), so a cell
//! gets the same answer no matter which chunk asks for it or in what order.

/// Integer hash of a cell coordinate mapped to `[0, 1]`
pub fn cell_hash(seed: u32, salt: u32, x: i32, z: i32) -> f32 {
    let key = seed ^ salt.wrapping_mul(2654435761);
    let mut h = (x as u32)
        .wrapping_mul(374761393)
        .wrapping_add((z as u32).wrapping_mul(668265263))
        .wrapping_add(key.wrapping_mul(1274126177));
    h = (h ^ (h >> 13)).wrapping_mul(1103515245);
    h = (h ^ (h >> 16)).wrapping_mul(2246822519);
    h ^= h >> 15;
    (h & 0x7FFFFFFF) as f32 / 0x7FFFFFFF_u32 as f32
}
