//! 配置管理器 - 负责处理不同环境下的配置覆盖
//!
//! 环境名称来自 `MIGRATION_ENV`（默认 `development`），
//! 配置文件同级的 `environments/{env}.toml` 会被深度合并到基础配置之上。

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toml::Value;

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    pub fn get_environment() -> String {
        env::var("MIGRATION_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 配置文件对应环境的覆盖文件路径
    pub fn environment_file(config_file: &Path, environment: &str) -> PathBuf {
        config_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("environments")
            .join(format!("{environment}.toml"))
    }

    /// 将指定环境的配置合并到基础配置中；覆盖文件不存在时保持不变
    pub fn apply_overlay_for(
        base: &mut Value,
        config_file: &Path,
        environment: &str,
    ) -> Result<()> {
        let overlay_path = Self::environment_file(config_file, environment);
        if !overlay_path.is_file() {
            return Ok(());
        }

        let content = fs::read_to_string(&overlay_path).with_context(|| {
            format!("unable to read environment config {}", overlay_path.display())
        })?;
        let overlay: Value = toml::from_str(&content).with_context(|| {
            format!("invalid environment config format {}", overlay_path.display())
        })?;

        deep_merge(base, overlay);
        Ok(())
    }
}

/// 表按键递归合并，其余类型整体替换
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(target), Value::Table(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_is_merged_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("migration-worker.toml");
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            "[services.migration_worker]\nrun_mode = \"poll\"\n",
        )
        .unwrap();

        let mut base: Value =
            toml::from_str("[services.migration_worker]\nrun_mode = \"once\"\nqueue = \"q\"\n")
                .unwrap();
        ConfigManager::apply_overlay_for(&mut base, &config_file, "staging").unwrap();

        let worker = &base["services"]["migration_worker"];
        assert_eq!(worker["run_mode"].as_str(), Some("poll"));
        assert_eq!(worker["queue"].as_str(), Some("q"));
    }

    #[test]
    fn missing_overlay_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut base: Value = toml::from_str("a = 1").unwrap();
        ConfigManager::apply_overlay_for(&mut base, &dir.path().join("c.toml"), "production")
            .unwrap();
        assert_eq!(base["a"].as_integer(), Some(1));
    }

    #[test]
    fn deep_merge_replaces_scalars_and_merges_tables() {
        let mut base: Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: Value = toml::from_str("a = 2\n[t]\ny = 3\n").unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(base["a"].as_integer(), Some(2));
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }
}
