use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Runtime parameters passed to a plan.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse from CLI args like "key=value".
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Config(format!("invalid param '{}', empty key", arg)));
            }
            params.values.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// Parameter definition in a plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamDef {
    #[serde(default)]
    pub required: bool,

    pub default: Option<String>,

    pub description: Option<String>,

    /// The value is a path that must exist (resume, cover letter).
    #[serde(default)]
    pub file: bool,
}

/// Value for `name`: CLI param, then definition default. `Ok(None)` if unset.
fn lookup(
    name: &str,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<Option<String>> {
    if let Some(v) = params.get(name) {
        return Ok(Some(v.to_string()));
    }
    match defs.get(name) {
        Some(def) => match &def.default {
            Some(default) => Ok(Some(default.clone())),
            None if def.required => Err(Error::Config(format!(
                "missing required parameter: {}",
                name
            ))),
            None => Ok(Some(String::new())),
        },
        None => Ok(None),
    }
}

/// Substitute `${var}` and `${var:-fallback}` patterns in a string.
///
/// Unknown variables without a fallback are left as written.
pub fn substitute(
    template: &str,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(var_start) = result[start..].find("${") {
        let var_start = start + var_start;
        let Some(var_end) = result[var_start..].find('}') else {
            break;
        };
        let var_end = var_start + var_end;

        let inner = &result[var_start + 2..var_end];
        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name.trim(), Some(fallback)),
            None => (inner.trim(), None),
        };

        let value = match (params.get(name), fallback) {
            (Some(v), _) => v.to_string(),
            (None, Some(fallback)) => match lookup(name, &Params::new(), defs) {
                Ok(Some(v)) if !v.is_empty() => v,
                _ => fallback.to_string(),
            },
            (None, None) => match lookup(name, params, defs)? {
                Some(v) => v,
                None => {
                    start = var_end + 1;
                    continue;
                }
            },
        };

        result.replace_range(var_start..=var_end, &value);
        start = var_start + value.len();
    }

    Ok(result)
}

/// Recursively substitute params in a serde_yaml::Value.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => {
            *s = substitute(s, params, defs)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Fail if a `file` parameter points at nothing.
pub fn check_files(params: &Params, defs: &HashMap<String, ParamDef>) -> Result<()> {
    for (name, def) in defs.iter().filter(|(_, d)| d.file) {
        let Some(path) = lookup(name, params, defs)? else {
            continue;
        };
        if !path.is_empty() && !Path::new(&path).is_file() {
            return Err(Error::Config(format!(
                "parameter '{}' points to a missing file: {}",
                name, path
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(required: bool, default: Option<&str>) -> ParamDef {
        ParamDef {
            required,
            default: default.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_substitute_simple() {
        let params = Params::new().set("name", "world");
        let defs = HashMap::new();
        let result = substitute("hello ${name}!", &params, &defs).unwrap();
        assert_eq!(result, "hello world!");
    }

    #[test]
    fn test_substitute_default() {
        let mut defs = HashMap::new();
        defs.insert("school".to_string(), def(false, Some("MIT")));
        let result = substitute("${school}", &Params::new(), &defs).unwrap();
        assert_eq!(result, "MIT");
    }

    #[test]
    fn test_substitute_inline_fallback() {
        let defs = HashMap::new();
        let result = substitute("${city:-Berkeley, CA}", &Params::new(), &defs).unwrap();
        assert_eq!(result, "Berkeley, CA");

        let params = Params::new().set("city", "Austin, TX");
        let result = substitute("${city:-Berkeley, CA}", &params, &defs).unwrap();
        assert_eq!(result, "Austin, TX");
    }

    #[test]
    fn test_fallback_satisfies_required() {
        let mut defs = HashMap::new();
        defs.insert("phone".to_string(), def(true, None));
        let result = substitute("${phone:-n/a}", &Params::new(), &defs).unwrap();
        assert_eq!(result, "n/a");
    }

    #[test]
    fn test_substitute_required_missing() {
        let mut defs = HashMap::new();
        defs.insert("email".to_string(), def(true, None));
        let result = substitute("${email}", &Params::new(), &defs);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_variable_left_alone() {
        let result = substitute("${HOME}/cv.pdf", &Params::new(), &HashMap::new()).unwrap();
        assert_eq!(result, "${HOME}/cv.pdf");
    }

    #[test]
    fn test_params_from_args() {
        let args = vec!["first=Ada".to_string(), "last=Lovelace".to_string()];
        let params = Params::from_args(&args).unwrap();
        assert_eq!(params.get("first"), Some("Ada"));
        assert_eq!(params.get("last"), Some("Lovelace"));

        assert!(Params::from_args(&["=x".to_string()]).is_err());
        assert!(Params::from_args(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_check_files() {
        let mut defs = HashMap::new();
        defs.insert(
            "resume".to_string(),
            ParamDef {
                file: true,
                ..Default::default()
            },
        );
        assert!(check_files(&Params::new(), &defs).is_ok());

        let params = Params::new().set("resume", "/nonexistent/formwright/cv.pdf");
        assert!(check_files(&params, &defs).is_err());

        let path = std::env::temp_dir().join("formwright-params-cv.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let params = Params::new().set("resume", path.to_string_lossy());
        assert!(check_files(&params, &defs).is_ok());
        let _ = std::fs::remove_file(&path);
    }
}
