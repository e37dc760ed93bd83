//! 配置文件读写与带注释模板生成。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

/// 可落盘的配置类型：文件名加字段元信息（用于生成带注释的模板）。
pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    fn fields() -> &'static [FieldMeta];
}

/// 读取配置文件；文件不存在时先写出带注释的默认模板再返回默认值。
///
/// 用户文件里缺少的字段以默认值补齐，补齐后的完整文件会写回磁盘，
/// 这样升级后新增的字段对用户立即可见。
pub fn load_or_create<T: ConfigSpec>(config_path: Option<&Path>) -> Result<T, ConfigError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(T::FILE_NAME));

    if !path.exists() {
        let defaults = T::default();
        write_commented(&defaults, &path)?;
        return Ok(defaults);
    }

    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let user: Value = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    let incomplete = match &user {
        Value::Mapping(map) => T::fields().iter().any(|f| !map.contains_key(f.name)),
        _ => true,
    };

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    overlay(&mut merged, user);
    let config: T =
        serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))?;

    if incomplete {
        write_commented(&config, &path)?;
    }

    Ok(config)
}

/// 把配置连同字段注释写到 `path`。
pub fn write_commented<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let yaml = render_commented(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render_commented<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let value =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?;
    let Value::Mapping(mapping) = value else {
        return Err(ConfigError::Validation(
            "config must serialize to a mapping".to_string(),
        ));
    };

    let mut out = String::new();
    for field in T::fields() {
        for line in field.description.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(field.name).cloned().unwrap_or(Value::Null);
        let entry = serde_yaml::to_string(&Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        out.push_str(entry.trim());
        out.push('\n');
    }
    Ok(out)
}

/// 用户值覆盖默认值；嵌套映射逐键合并，其余类型整体替换。
fn overlay(defaults: &mut Value, user: Value) {
    match (defaults, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, val) in src {
                match dest.get_mut(&key) {
                    Some(slot) => overlay(slot, val),
                    None => {
                        dest.insert(key, val);
                    }
                }
            }
        }
        (dest, other) => *dest = other,
    }
}
