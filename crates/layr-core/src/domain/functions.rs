//! The function table shared by parsing and rendering.

use layr_syntax::FuncMap;
use serde_json::Value;

use crate::error::{LayrError, LayrResult};

/// Identifiers owned by the engine. User functions may not take them.
pub const RESERVED: [&str; 3] = ["extend", "include", "block"];

/// User functions plus the reserved directive stubs.
///
/// The stubs make directive names resolvable at parse time. `extend` left
/// in the text after scanning renders nothing; an `include` that was not
/// expanded (because it sits inside a larger expression) fails at render.
#[derive(Clone, Debug)]
pub struct FunctionTable {
    funcs: FuncMap,
}

impl FunctionTable {
    pub fn new() -> Self {
        let mut funcs = FuncMap::new();
        funcs
            .insert("extend", |_| Ok(Value::String(String::new())))
            .insert("include", |_| {
                Err("include must be a standalone directive".to_string())
            })
            .insert("block", |_| Ok(Value::String(String::new())));
        Self { funcs }
    }

    pub fn is_reserved(name: &str) -> bool {
        RESERVED.contains(&name)
    }

    /// Merge user functions in. Nothing is merged if any name is reserved.
    pub fn merge(&mut self, funcs: FuncMap) -> LayrResult<()> {
        let reserved: Vec<&str> = funcs.names().filter(|n| Self::is_reserved(n)).collect();
        if !reserved.is_empty() {
            return Err(LayrError::configuration(format!(
                "cannot register reserved function name(s): {}",
                reserved.join(", ")
            )));
        }
        self.funcs.extend(funcs);
        Ok(())
    }

    pub fn as_func_map(&self) -> &FuncMap {
        &self.funcs
    }

    /// Registered user function names, sorted.
    pub fn user_names(&self) -> Vec<&str> {
        self.funcs.names().filter(|n| !Self::is_reserved(n)).collect()
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_names_are_always_present() {
        let table = FunctionTable::new();
        for name in RESERVED {
            assert!(table.as_func_map().contains(name));
        }
        assert!(table.user_names().is_empty());
    }

    #[test]
    fn merge_rejects_reserved_names_atomically() {
        let mut table = FunctionTable::new();
        let mut funcs = FuncMap::new();
        funcs.insert("upper", |_| Ok(json!(""))).insert("include", |_| Ok(json!("")));

        let err = table.merge(funcs).unwrap_err();
        assert!(matches!(err, LayrError::Configuration { .. }));
        assert!(!table.as_func_map().contains("upper"));
    }

    #[test]
    fn merge_adds_user_functions() {
        let mut table = FunctionTable::new();
        let mut funcs = FuncMap::new();
        funcs.insert("upper", |_| Ok(json!("")));
        table.merge(funcs).unwrap();
        assert_eq!(table.user_names(), vec!["upper"]);
    }

    #[test]
    fn include_stub_fails_when_executed() {
        let table = FunctionTable::new();
        let include = table.as_func_map().get("include").unwrap();
        assert!(include(&[json!("x")]).is_err());
    }
}
