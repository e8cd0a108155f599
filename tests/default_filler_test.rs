// ==========================================
// DefaultFiller 集成测试
// ==========================================
// 测试目标: 默认值填充 / 用户配置校验 / 幂等性 / 往返校验
// 覆盖范围: 场景规格与全部内置算法
// ==========================================


use image_finder::domain::types::{ParamValue, ParameterMap};
use image_finder::engine::{check_value, fill_all, ConfigError, DefaultFiller, ParameterRegistry};
use std::collections::BTreeMap;
use test_helpers::{builtin_registry, map, scenario_registry};

fn fill(registry: &ParameterRegistry, algorithm: &str, raw: &ParameterMap) -> Result<ParameterMap, ConfigError> {
    let specs = registry.specs(algorithm).expect("算法应已注册");
    DefaultFiller::new(algorithm, specs).fill(raw)
}

/// 填充结果中的每个已声明参数都应通过单值校验
fn assert_round_trip(registry: &ParameterRegistry, algorithm: &str, filled: &ParameterMap) {
    let specs = registry.specs(algorithm).unwrap();
    for (name, value) in filled {
        if let Some(spec) = specs.get(name) {
            check_value(algorithm, name, spec, value)
                .unwrap_or_else(|e| panic!("{} 未通过往返校验: {}", name, e));
        }
    }
    assert_eq!(fill(registry, algorithm, filled).unwrap(), *filled);
}

// ==========================================
// 场景规格
// ==========================================

#[test]
fn test_scenario_fill() {
    let registry = scenario_registry();
    let filled = fill(&registry, "A", &ParameterMap::new()).unwrap();
    assert_eq!(
        filled,
        map(&[
            ("color_space", ParamValue::from("BGR")),
            ("threshold", ParamValue::Float(0.5)),
            ("algorithm", ParamValue::from("A")),
        ])
    );

    let filled_b = fill(&registry, "B", &ParameterMap::new()).unwrap();
    assert!(!filled_b.contains_key("threshold"));
}

#[test]
fn test_user_override_is_kept() {
    let registry = scenario_registry();
    let filled = fill(
        &registry,
        "A",
        &map(&[
            ("color_space", ParamValue::from("BW")),
            ("threshold", ParamValue::Float(0.25)),
        ]),
    )
    .unwrap();
    assert_eq!(filled["color_space"], ParamValue::from("BW"));
    assert_eq!(filled["threshold"], ParamValue::Float(0.25));
}

#[test]
fn test_config_errors() {
    let registry = scenario_registry();

    let cases: Vec<(ParameterMap, &str)> = vec![
        (map(&[("color_space", ParamValue::Null)]), "NullNotAllowed"),
        (map(&[("color_space", ParamValue::Int(1))]), "TypeMismatch"),
        (map(&[("threshold", ParamValue::Int(1))]), "TypeMismatch"),
        (map(&[("color_space", ParamValue::from("HSV"))]), "OptionNotAllowed"),
        (map(&[("threshold", ParamValue::Float(-0.1))]), "ValueOutOfRange"),
        (map(&[("algorithm", ParamValue::from("B"))]), "AlgorithmIdentityMismatch"),
    ];

    for (raw, expected) in cases {
        let err = fill(&registry, "A", &raw).unwrap_err();
        let kind = match err {
            ConfigError::NullNotAllowed { .. } => "NullNotAllowed",
            ConfigError::TypeMismatch { .. } => "TypeMismatch",
            ConfigError::OptionNotAllowed { .. } => "OptionNotAllowed",
            ConfigError::ValueOutOfRange { .. } => "ValueOutOfRange",
            ConfigError::AlgorithmIdentityMismatch { .. } => "AlgorithmIdentityMismatch",
            ConfigError::UnknownAlgorithm { .. } => "UnknownAlgorithm",
            ConfigError::UnknownParameter { .. } => "UnknownParameter",
        };
        assert_eq!(kind, expected, "配置 {:?}", raw);
    }
}

#[test]
fn test_matching_algorithm_identity_is_accepted() {
    let registry = scenario_registry();
    let filled = fill(&registry, "A", &map(&[("algorithm", ParamValue::from("A"))])).unwrap();
    assert_eq!(filled["algorithm"], ParamValue::from("A"));
}

#[test]
fn test_error_carries_algorithm_and_name() {
    let registry = scenario_registry();
    let err = fill(&registry, "A", &map(&[("threshold", ParamValue::from("high"))])).unwrap_err();
    assert_eq!(err.path(), "\"A\".\"threshold\"");
    assert!(err.to_string().contains("threshold"));
}

#[test]
fn test_fill_is_idempotent() {
    let registry = scenario_registry();
    let configs = vec![
        ParameterMap::new(),
        map(&[("threshold", ParamValue::Null)]),
        map(&[("color_space", ParamValue::from("BW")), ("legacy", ParamValue::Int(3))]),
    ];
    for raw in configs {
        let once = fill(&registry, "A", &raw).unwrap();
        let twice = fill(&registry, "A", &once).unwrap();
        assert_eq!(once, twice);
    }
}

// ==========================================
// 内置算法
// ==========================================

#[test]
fn test_builtin_defaults_follow_algorithm_branch() {
    let registry = builtin_registry();

    let bf = fill(&registry, "Brute-Force", &ParameterMap::new()).unwrap();
    assert_eq!(bf["detector"], ParamValue::from("ORB"));
    assert_eq!(bf["matching_method"], ParamValue::from("best"));
    assert_eq!(bf["norm_type"], ParamValue::from("NORM_HAMMING"));
    assert!(!bf.contains_key("cross_check"));
    assert!(!bf.contains_key("trees"));

    let flann = fill(&registry, "FLANN", &ParameterMap::new()).unwrap();
    assert_eq!(flann["detector"], ParamValue::from("SIFT"));
    assert_eq!(flann["matching_method"], ParamValue::from("KNN"));
    assert_eq!(flann["trees"], ParamValue::Int(100));
    assert_eq!(flann["checks"], ParamValue::Int(500));
    assert!(!flann.contains_key("norm_type"));
}

#[test]
fn test_builtin_fill_covers_inactive_branches() {
    let registry = builtin_registry();
    let bf = fill(&registry, "Brute-Force", &ParameterMap::new()).unwrap();

    // matching_method = best, 但 KNN / radius 分支的默认值同样被填充
    assert_eq!(bf["k"], ParamValue::Int(1));
    assert_eq!(bf["maxDistance"], ParamValue::Float(0.5));
    assert_eq!(bf["n_matches"], ParamValue::Int(10));
    assert_eq!(bf["match_ratio_threshold"], ParamValue::Float(0.5));
    // 检测器参数默认为空, 不出现在结果中
    assert!(!bf.contains_key("nfeatures"));
    assert_eq!(bf.len(), 10);
}

#[test]
fn test_builtin_round_trip() {
    let registry = builtin_registry();
    let overrides: Vec<(&str, ParameterMap)> = vec![
        ("Brute-Force", ParameterMap::new()),
        (
            "Brute-Force",
            map(&[
                ("detector", ParamValue::from("SIFT")),
                ("nfeatures", ParamValue::Int(200)),
                ("cross_check", ParamValue::Bool(true)),
            ]),
        ),
        ("FLANN", map(&[("matching_method", ParamValue::from("radius-based"))])),
        ("Match Template", map(&[("filter_by", ParamValue::from("ratio"))])),
    ];

    for (algorithm, raw) in overrides {
        let filled = fill(&registry, algorithm, &raw).unwrap();
        assert_round_trip(&registry, algorithm, &filled);
    }
}

#[test]
fn test_inactive_branch_override_is_validated() {
    let registry = builtin_registry();
    // top N 分支未激活, 但其参数的覆盖值仍需满足范围
    let err = fill(
        &registry,
        "Brute-Force",
        &map(&[
            ("match_filters_by", ParamValue::from("ratio threshold")),
            ("n_matches", ParamValue::Int(1000)),
        ]),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ValueOutOfRange { .. }));
}

#[test]
fn test_fill_all() {
    let registry = builtin_registry();
    let mut user = BTreeMap::new();
    user.insert(
        "Match Template".to_string(),
        map(&[("method", ParamValue::from("TM_CCOEFF"))]),
    );

    let filled = fill_all(&registry, &user).unwrap();
    assert_eq!(filled.len(), 3);
    assert_eq!(filled["Match Template"]["method"], ParamValue::from("TM_CCOEFF"));
    assert_eq!(filled["FLANN"]["algorithm"], ParamValue::from("FLANN"));

    user.insert("SURF".to_string(), ParameterMap::new());
    let err = fill_all(&registry, &user).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownAlgorithm { ref algorithm } if algorithm == "SURF"));
}
