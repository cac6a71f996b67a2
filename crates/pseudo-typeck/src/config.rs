//! Backend configuration: API table overrides read from TOML.
//!
//! ```toml
//! [functions.math.sqrt]
//! function = "sqrt"
//! signature = ["Number", "Float"]
//!
//! [methods.String.title]
//! message = "capitalize"
//! signature = ["String"]
//!
//! [operators.List]
//! "+" = "concat"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::api::{ApiSignature, ApiTables, Expansion};
use crate::ty::ParseTyError;

/// Errors from loading or applying overrides.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse API overrides: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("bad signature for {target}: {source}")]
    Signature {
        target: String,
        #[source]
        source: ParseTyError,
    },
    #[error("{0} has no signature; add `signature = [...]`")]
    MissingSignature(String),
}

/// A function mapping: `namespace.name` in source becomes a standard
/// call of `namespace:function`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionOverride {
    /// Target namespace; defaults to the source namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    pub function: String,
    #[serde(default)]
    pub signature: Option<Vec<String>>,
}

/// A method mapping: `value.name(...)` on a builtin type becomes a
/// standard method call of `message`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodOverride {
    /// Type whose signatures type the call; defaults to the receiver type.
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    pub message: String,
    /// Swap receiver and argument, as `sep.join(items)` does.
    #[serde(default)]
    pub swapped: bool,
    #[serde(default)]
    pub signature: Option<Vec<String>>,
}

/// A set of additions and replacements for [`ApiTables`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiOverrides {
    #[serde(default)]
    pub functions: BTreeMap<String, BTreeMap<String, FunctionOverride>>,
    #[serde(default)]
    pub methods: BTreeMap<String, BTreeMap<String, MethodOverride>>,
    #[serde(default)]
    pub operators: BTreeMap<String, BTreeMap<String, String>>,
}

impl ApiOverrides {
    /// Read and parse overrides from a TOML file.
    pub fn from_file(path: &Path) -> Result<ApiOverrides, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse overrides from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<ApiOverrides, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

fn parse_signature(target: &str, types: &[String]) -> Result<ApiSignature, ConfigError> {
    ApiSignature::parse(types).map_err(|source| ConfigError::Signature {
        target: target.to_string(),
        source,
    })
}

impl ApiTables {
    /// These tables with `overrides` applied on top.
    ///
    /// Every mapping must end up with a signature, either given in the
    /// override or already present in the tables.
    pub fn with_overrides(mut self, overrides: &ApiOverrides) -> Result<ApiTables, ConfigError> {
        for (source_ns, functions) in &overrides.functions {
            for (name, o) in functions {
                let namespace = o.namespace.as_deref().unwrap_or(source_ns);
                let target = format!("{}:{}", namespace, o.function);
                if let Some(types) = &o.signature {
                    let sig = parse_signature(&target, types)?;
                    self.add_signature(namespace, &o.function, sig);
                }
                if self.signature(namespace, &o.function).is_none() {
                    return Err(ConfigError::MissingSignature(target));
                }
                self.add_function(source_ns, name, Expansion::call(namespace, &o.function));
            }
        }

        for (source_ty, methods) in &overrides.methods {
            for (name, o) in methods {
                let ty = o.ty.as_deref().unwrap_or(source_ty);
                let target = format!("{}#{}", ty, o.message);
                if let Some(types) = &o.signature {
                    let sig = parse_signature(&target, types)?;
                    self.add_signature(ty, &o.message, sig);
                }
                if self.signature(ty, &o.message).is_none() {
                    return Err(ConfigError::MissingSignature(target));
                }
                let expansion = if o.swapped {
                    Expansion::swapped(ty, &o.message)
                } else {
                    Expansion::method(ty, &o.message)
                };
                self.add_method(source_ty, name, expansion);
            }
        }

        for (ty, ops) in &overrides.operators {
            for (op, message) in ops {
                if self.signature(ty, message).is_none() {
                    return Err(ConfigError::MissingSignature(format!("{}#{}", ty, message)));
                }
                self.add_operator(ty, op, message);
            }
        }

        Ok(self)
    }
}

/// Everything a translation run needs besides the syntax tree.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    pub api: ApiTables,
    /// The source text, used to slice lines for diagnostics.
    pub source: Option<String>,
}

impl TranslateOptions {
    pub fn new(source: impl Into<String>) -> Self {
        TranslateOptions {
            api: ApiTables::standard(),
            source: Some(source.into()),
        }
    }

    pub fn with_api(mut self, api: ApiTables) -> Self {
        self.api = api;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiEntry;
    use crate::ty::Ty;

    #[test]
    fn applies_function_and_method_overrides() {
        let toml = r#"
[functions.math.sqrt]
function = "square_root"
signature = ["Number", "Float"]

[methods.String.title]
message = "capitalize"
signature = ["String"]
"#;
        let overrides = ApiOverrides::from_str(toml).unwrap();
        let api = ApiTables::standard().with_overrides(&overrides).unwrap();
        assert_eq!(
            api.function("math", "sqrt"),
            Some(&ApiEntry::Fixed(Expansion::call("math", "square_root")))
        );
        assert_eq!(api.signature("math", "square_root").unwrap().ret, Ty::float());
        assert_eq!(
            api.method("String", "title"),
            Some(&ApiEntry::Fixed(Expansion::method("String", "capitalize")))
        );
    }

    #[test]
    fn reuses_existing_signatures() {
        let toml = r#"
[methods.List.add]
message = "push"
"#;
        let api = ApiTables::standard()
            .with_overrides(&ApiOverrides::from_str(toml).unwrap())
            .unwrap();
        assert!(api.method("List", "add").is_some());
    }

    #[test]
    fn rejects_missing_signature() {
        let toml = r#"
[functions.math.floor]
function = "floor"
"#;
        let err = ApiTables::standard()
            .with_overrides(&ApiOverrides::from_str(toml).unwrap())
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"math:floor has no signature; add `signature = [...]`");
    }

    #[test]
    fn rejects_bad_types() {
        let toml = r#"
[methods.String.title]
message = "capitalize"
signature = ["List[String"]
"#;
        let err = ApiTables::standard()
            .with_overrides(&ApiOverrides::from_str(toml).unwrap())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Signature { .. }));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ApiOverrides::from_str("[functions.math.sqrt]\nfunc = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
