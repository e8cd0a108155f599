// ==========================================
// 图像匹配工具 - 设置存储
// ==========================================
// 职责: 持有全部算法的 raw 设置与当前算法的激活视图, 执行变更并通知监听者
// 红线: 每次变更要么完整提交, 要么完整拒绝; 提交后恰好通知一次
// 红线: current 只由 ConditionalResolver 推导, 不可直接修改
// ==========================================

use crate::domain::settings::{CurrentSettings, RawSettings};
use crate::domain::spec::{ParameterSpec, ALGORITHM_KEY};
use crate::domain::types::{ParamType, ParamValue, ParameterMap};
use crate::engine::default_filler::{check_value, DefaultFiller};
use crate::engine::error::ConfigError;
use crate::engine::registry::{ParameterRegistry, RegistryEntry};
use crate::engine::resolver::{ActiveParameters, ConditionalResolver};
use crate::plugin::{Image, PlotOutput};
use crate::store::listener::SettingsChangeListener;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ==========================================
// SettingsStore - 设置存储
// ==========================================
pub struct SettingsStore {
    registry: Arc<ParameterRegistry>,
    /// 算法 -> 原始设置 (覆盖全部分支)
    raw: BTreeMap<String, RawSettings>,
    active_algorithm: String,
    active: ActiveParameters,
    current: Arc<CurrentSettings>,
    listeners: Vec<Arc<dyn SettingsChangeListener>>,
}

impl SettingsStore {
    /// 创建设置存储
    ///
    /// # 参数
    /// - registry: 启动期构建的参数注册表
    /// - filled: DefaultFiller 输出 (算法 -> 完整参数表), 缺失的算法在首次选择时填充
    /// - initial_algorithm: 初始算法
    ///
    /// 初始快照的 revision 为 0, 构造过程不触发通知
    pub fn new(
        registry: Arc<ParameterRegistry>,
        filled: BTreeMap<String, ParameterMap>,
        initial_algorithm: &str,
    ) -> Result<Self, ConfigError> {
        let mut raw = BTreeMap::new();
        for (algorithm, values) in filled {
            if !registry.contains(&algorithm) {
                return Err(ConfigError::UnknownAlgorithm { algorithm });
            }
            raw.insert(algorithm, RawSettings::from_filled(values));
        }

        let entry = lookup(&registry, initial_algorithm)?;
        let settings = match raw.get(initial_algorithm) {
            Some(settings) => settings.clone(),
            None => fill_empty(entry)?,
        };
        let active = ConditionalResolver::new(entry.specs.blocks()).resolve(&settings);
        let current = Arc::new(CurrentSettings {
            algorithm: initial_algorithm.to_string(),
            parameters: active.current(initial_algorithm),
            revision: 0,
        });
        raw.insert(initial_algorithm.to_string(), settings);

        tracing::info!(
            algorithm = initial_algorithm,
            parameters = current.parameters.len(),
            "设置存储初始化完成"
        );

        Ok(Self {
            registry,
            raw,
            active_algorithm: initial_algorithm.to_string(),
            active,
            current,
            listeners: Vec::new(),
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 当前激活设置的不可变快照
    pub fn current_settings(&self) -> Arc<CurrentSettings> {
        Arc::clone(&self.current)
    }

    pub fn active_algorithm(&self) -> &str {
        &self.active_algorithm
    }

    pub fn active_parameters(&self) -> &ActiveParameters {
        &self.active
    }

    pub fn raw_settings(&self, algorithm: &str) -> Option<&RawSettings> {
        self.raw.get(algorithm)
    }

    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ==========================================
    // 监听
    // ==========================================

    pub fn add_change_listener<F>(&mut self, listener: F)
    where
        F: Fn(&Arc<CurrentSettings>) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub fn add_listener(&mut self, listener: Arc<dyn SettingsChangeListener>) {
        self.listeners.push(listener);
    }

    // ==========================================
    // 变更
    // ==========================================

    /// 切换算法
    ///
    /// 丢弃旧的激活视图; 该算法尚无 raw 设置时按空配置填充; 全量重新解析
    pub fn select_algorithm(&mut self, algorithm: &str) -> Result<Arc<CurrentSettings>, ConfigError> {
        let entry = lookup(&self.registry, algorithm)?;
        let settings = match self.raw.get(algorithm) {
            Some(settings) => settings.clone(),
            None => fill_empty(entry)?,
        };
        let active = ConditionalResolver::new(entry.specs.blocks()).resolve(&settings);

        tracing::debug!(
            from = %self.active_algorithm,
            to = algorithm,
            "切换算法"
        );
        self.raw.insert(algorithm.to_string(), settings);
        self.active_algorithm = algorithm.to_string();
        Ok(self.commit(active))
    }

    /// 设置参数取值
    ///
    /// - "algorithm" 转为 select_algorithm
    /// - 取值按规格校验 (null/类型/可选项/范围), 失败时状态不变
    /// - 开关状态保持不变; 仅重算受影响的后续条件块
    pub fn set_value(
        &mut self,
        name: &str,
        value: ParamValue,
    ) -> Result<Arc<CurrentSettings>, ConfigError> {
        if name == ALGORITHM_KEY {
            return match value {
                ParamValue::Str(algorithm) => self.select_algorithm(&algorithm),
                other => Err(ConfigError::TypeMismatch {
                    algorithm: self.active_algorithm.clone(),
                    name: name.to_string(),
                    expected: ParamType::Str,
                    found: other
                        .param_type()
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "null".to_string()),
                }),
            };
        }

        let spec = self.spec_for(name)?;
        check_value(&self.active_algorithm, name, &spec, &value)?;

        let mut settings = self.working_raw();
        settings.values.insert(name.to_string(), value);
        self.apply(name, settings)
    }

    /// 开启/关闭参数
    ///
    /// - 关闭: 仅允许可空参数, 取值被缓存以便重新开启
    /// - 开启: 无可用取值时按 默认值 > 范围下限 > 第一个选项 > 类型零值 补齐
    pub fn set_enabled(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<Arc<CurrentSettings>, ConfigError> {
        let spec = self.spec_for(name)?;
        let mut settings = self.working_raw();

        if enabled {
            settings.disabled.remove(name);
            // 缓存值为空或不满足当前规格 (兄弟分支同名声明) 时补齐
            let usable = settings.values.get(name).is_some_and(|v| {
                !v.is_null() && check_value(&self.active_algorithm, name, &spec, v).is_ok()
            });
            if !usable {
                settings
                    .values
                    .insert(name.to_string(), spec.fallback_value());
            }
        } else {
            if !spec.nullable {
                return Err(ConfigError::NullNotAllowed {
                    algorithm: self.active_algorithm.clone(),
                    name: name.to_string(),
                });
            }
            settings.disabled.insert(name.to_string());
        }

        self.apply(name, settings)
    }

    /// 使用当前快照调用当前算法的绘图函数
    pub fn plot(&self, base: &Image, query: &Image) -> anyhow::Result<PlotOutput> {
        self.registry.plot(
            &self.active_algorithm,
            base,
            query,
            &self.current.flat_parameters(),
        )
    }

    // ==========================================
    // 内部
    // ==========================================

    fn entry(&self) -> Result<&RegistryEntry, ConfigError> {
        lookup(&self.registry, &self.active_algorithm)
    }

    /// 参数规格: 激活的声明优先, 否则取规范化规格表中的最后一次声明
    fn spec_for(&self, name: &str) -> Result<ParameterSpec, ConfigError> {
        if let Some(active) = self.active.get(name) {
            return Ok(active.spec.clone());
        }
        self.entry()?
            .specs
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownParameter {
                algorithm: self.active_algorithm.clone(),
                name: name.to_string(),
            })
    }

    fn working_raw(&self) -> RawSettings {
        self.raw
            .get(&self.active_algorithm)
            .cloned()
            .unwrap_or_default()
    }

    /// 增量重算并提交
    fn apply(&mut self, name: &str, settings: RawSettings) -> Result<Arc<CurrentSettings>, ConfigError> {
        let changed: BTreeSet<String> = [name.to_string()].into_iter().collect();
        let active = {
            let entry = self.entry()?;
            ConditionalResolver::new(entry.specs.blocks()).reresolve(&self.active, &settings, &changed)
        };
        self.raw.insert(self.active_algorithm.clone(), settings);
        Ok(self.commit(active))
    }

    /// 提交新的激活视图: 生成快照, revision 递增, 通知全部监听者一次
    fn commit(&mut self, active: ActiveParameters) -> Arc<CurrentSettings> {
        let snapshot = Arc::new(CurrentSettings {
            algorithm: self.active_algorithm.clone(),
            parameters: active.current(&self.active_algorithm),
            revision: self.current.revision + 1,
        });
        self.active = active;
        self.current = Arc::clone(&snapshot);

        tracing::debug!(
            algorithm = %snapshot.algorithm,
            revision = snapshot.revision,
            parameters = snapshot.parameters.len(),
            "设置已提交"
        );
        for listener in &self.listeners {
            listener.on_change(&snapshot);
        }
        snapshot
    }
}

fn lookup<'r>(registry: &'r ParameterRegistry, algorithm: &str) -> Result<&'r RegistryEntry, ConfigError> {
    registry
        .entry(algorithm)
        .ok_or_else(|| ConfigError::UnknownAlgorithm {
            algorithm: algorithm.to_string(),
        })
}

fn fill_empty(entry: &RegistryEntry) -> Result<RawSettings, ConfigError> {
    let values = DefaultFiller::new(&entry.algorithm, &entry.specs).fill(&ParameterMap::new())?;
    Ok(RawSettings::from_filled(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec::{Branch, ConditionalBlock};
    use crate::engine::registry::build_registry;
    use crate::plugin::{PlotFn, PluginSpec};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<ParameterRegistry> {
        let plot: PlotFn = Arc::new(
            |base: &Image, _query: &Image, _params: &ParameterMap| -> anyhow::Result<PlotOutput> {
                Ok(PlotOutput {
                    duration: Vec::new(),
                    image: base.clone(),
                })
            },
        );
        let plugin = PluginSpec {
            name: "test".to_string(),
            algorithms: vec!["A".to_string(), "B".to_string()],
            parameter_blocks: vec![
                ConditionalBlock::unconditional(Branch::new("all").param(
                    "color_space",
                    json!({"type": "str", "options": ["BGR", "BW"], "default": "BGR"}),
                )),
                ConditionalBlock::conditional(
                    "algorithm",
                    vec![Branch::new("A").param(
                        "threshold",
                        json!({"type": "float", "nullable": true, "min": 0.0, "max": 1.0, "default": 0.5}),
                    )],
                ),
            ],
            plot_functions: [("A".to_string(), Arc::clone(&plot)), ("B".to_string(), plot)]
                .into_iter()
                .collect(),
        };
        Arc::new(build_registry(vec![plugin]).unwrap())
    }

    #[test]
    fn test_failed_mutation_leaves_state_untouched() {
        let mut store = SettingsStore::new(registry(), BTreeMap::new(), "A").unwrap();
        let before = store.current_settings();

        let err = store
            .set_value("threshold", ParamValue::Float(2.0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValueOutOfRange { .. }));
        assert_eq!(store.current_settings(), before);
        assert_eq!(store.current_settings().revision, 0);
    }

    #[test]
    fn test_revision_and_notifications() {
        let mut store = SettingsStore::new(registry(), BTreeMap::new(), "A").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        store.add_change_listener(move |_s: &Arc<CurrentSettings>| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set_enabled("threshold", false).unwrap();
        store.set_enabled("threshold", true).unwrap();
        let last = store.select_algorithm("B").unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(last.revision, 3);
        assert!(!last.contains("threshold"));
    }

    #[test]
    fn test_algorithm_value_routes_to_selection() {
        let mut store = SettingsStore::new(registry(), BTreeMap::new(), "A").unwrap();
        let snapshot = store.set_value("algorithm", ParamValue::from("B")).unwrap();
        assert_eq!(snapshot.algorithm, "B");
        assert_eq!(store.active_algorithm(), "B");

        let err = store.set_value("algorithm", ParamValue::from("Z")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAlgorithm { .. }));
        let err = store.set_enabled("algorithm", false).unwrap_err();
        assert!(matches!(err, ConfigError::NullNotAllowed { .. }));
    }

    #[test]
    fn test_unknown_parameter() {
        let mut store = SettingsStore::new(registry(), BTreeMap::new(), "A").unwrap();
        let err = store.set_value("sigma", ParamValue::Float(1.0)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParameter { .. }));
    }
}
