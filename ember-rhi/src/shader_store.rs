//! Process-wide registry of pre-compiled shader byte code, keyed by the
//! shader's source-relative path. Populated at startup from blobs baked into
//! the binary; consumed by shader creation.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

#[derive(Clone, Default)]
struct ByteCodeEntry {
    spv: Option<Arc<[u8]>>,
    dxil: Option<Arc<[u8]>>,
}

fn store() -> &'static RwLock<HashMap<String, ByteCodeEntry>> {
    static STORE: OnceLock<RwLock<HashMap<String, ByteCodeEntry>>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register SPIR-V byte code for `path`, replacing any previous entry.
pub fn register_spv_byte_code(path: &str, spv: impl Into<Arc<[u8]>>) {
    let mut map = store().write().unwrap();
    map.entry(path.to_string()).or_default().spv = Some(spv.into());
}

/// Register DXIL byte code for `path`, replacing any previous entry.
pub fn register_dxil_byte_code(path: &str, dxil: impl Into<Arc<[u8]>>) {
    let mut map = store().write().unwrap();
    map.entry(path.to_string()).or_default().dxil = Some(dxil.into());
}

pub fn get_spv_byte_code(path: &str) -> Option<Arc<[u8]>> {
    store().read().unwrap().get(path).and_then(|e| e.spv.clone())
}

pub fn get_dxil_byte_code(path: &str) -> Option<Arc<[u8]>> {
    store().read().unwrap().get(path).and_then(|e| e.dxil.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_missing_lookup() {
        register_spv_byte_code("shaders/basic.vert", vec![1u8, 2, 3, 4]);
        let code = get_spv_byte_code("shaders/basic.vert").unwrap();
        assert_eq!(&code[..], &[1, 2, 3, 4]);
        assert!(get_spv_byte_code("shaders/absent.frag").is_none());
        assert!(get_dxil_byte_code("shaders/basic.vert").is_none());
    }
}
