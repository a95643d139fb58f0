//! Browser localStorage backend for WASM.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use wasm_bindgen::JsValue;

/// Storage backed by `window.localStorage`.
///
/// localStorage is synchronous, so every future here resolves immediately.
/// Quota and privacy-mode failures surface as [`StorageError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn backend() -> StorageResult<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_error(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
    }
}

fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

impl Storage for LocalStorage {
    fn save(&self, key: &str, value: &str) -> BoxFuture<'_, StorageResult<()>> {
        let result = Self::backend().and_then(|storage| {
            storage
                .set_item(key, value)
                .map_err(|e| StorageError::Io(format!("localStorage write failed: {}", js_error(&e))))
        });
        Box::pin(async move { result })
    }

    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<String>> {
        let result = Self::backend().and_then(|storage| {
            storage
                .get_item(key)
                .map_err(|e| StorageError::Io(js_error(&e)))?
                .ok_or_else(|| StorageError::NotFound(key.to_string()))
        });
        Box::pin(async move { result })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let result = Self::backend().and_then(|storage| {
            storage
                .remove_item(key)
                .map_err(|e| StorageError::Io(js_error(&e)))
        });
        Box::pin(async move { result })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let result = Self::backend().and_then(|storage| {
            let len = storage.length().map_err(|e| StorageError::Io(js_error(&e)))?;
            let mut keys = Vec::with_capacity(len as usize);
            for i in 0..len {
                if let Some(key) = storage.key(i).map_err(|e| StorageError::Io(js_error(&e)))? {
                    keys.push(key);
                }
            }
            Ok(keys)
        });
        Box::pin(async move { result })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let result = Self::backend().and_then(|storage| {
            storage
                .get_item(key)
                .map(|value| value.is_some())
                .map_err(|e| StorageError::Io(js_error(&e)))
        });
        Box::pin(async move { result })
    }
}
