/* =========================
   Partición de claves a buckets de reduce
   ========================= */

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hash FNV-1a de 32 bits, recortado a 31 bits para que sea no negativo.
///
/// No usamos `DefaultHasher`: su algoritmo no está garantizado entre
/// versiones de Rust y todos los procesos (incluidas re-ejecuciones) tienen
/// que mandar la misma clave al mismo bucket.
pub fn ihash(key: &str) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for b in key.as_bytes() {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h & 0x7fff_ffff
}

/// Bucket de reduce para `key`. `n_reduce` tiene que ser >= 1.
pub fn bucket(key: &str, n_reduce: u32) -> u32 {
    debug_assert!(n_reduce > 0, "n_reduce debe ser >= 1");
    ihash(key) % n_reduce
}
