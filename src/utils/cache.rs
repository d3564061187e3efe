// Rendered-view path cache. Writers invalidate the paths they touch.
use std::collections::HashMap;
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref PATH_CACHE: RwLock<HashMap<String, String>> = RwLock::new(HashMap::new());
}

pub fn get_cached(path: &str) -> Option<String> {
    PATH_CACHE.read().ok()?.get(path).cloned()
}

pub fn set_cache(path: String, value: String) {
    if let Ok(mut cache) = PATH_CACHE.write() {
        cache.insert(path, value);
    }
}

/// Drops the cached entry for a logical view path after a write touches it.
pub fn invalidate_path(path: &str) {
    if let Ok(mut cache) = PATH_CACHE.write() {
        if cache.remove(path).is_some() {
            log::debug!("🧹 Invalidated cached path: {}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_removes_entry() {
        set_cache("/profile/u_1".to_string(), "rendered".to_string());
        assert_eq!(get_cached("/profile/u_1").as_deref(), Some("rendered"));

        invalidate_path("/profile/u_1");
        assert!(get_cached("/profile/u_1").is_none());
    }

    #[test]
    fn test_invalidate_missing_path_is_noop() {
        invalidate_path("/never-cached");
        assert!(get_cached("/never-cached").is_none());
    }
}
