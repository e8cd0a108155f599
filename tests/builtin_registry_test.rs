// ==========================================
// 内置插件注册表 集成测试
// ==========================================
// 测试目标: 内置插件规格通过校验 / 各算法的初始 current 视图 / 预览绘图
// ==========================================


use image_finder::domain::types::ParamValue;
use image_finder::plugin::{Algorithm, Image};
use std::collections::BTreeSet;
use test_helpers::{builtin_registry, store_for};

fn current_keys(algorithm: &str) -> BTreeSet<String> {
    store_for(builtin_registry(), algorithm)
        .current_settings()
        .parameters
        .keys()
        .cloned()
        .collect()
}

fn keys(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_registry_lists_builtin_algorithms() {
    let registry = builtin_registry();
    assert_eq!(
        registry.algorithms(),
        vec!["Brute-Force", "FLANN", "Match Template"]
    );
    for algorithm in Algorithm::ALL {
        let entry = registry.entry(algorithm.id()).unwrap();
        assert_eq!(entry.plugin, algorithm.plugin());
    }
}

#[test]
fn test_brute_force_initial_view() {
    assert_eq!(
        current_keys("Brute-Force"),
        keys(&[
            "algorithm",
            "color_space",
            "detector",
            "matching_method",
            "norm_type",
            "match_filters_by",
            "n_matches",
        ])
    );
}

#[test]
fn test_current_keeps_block_order() {
    let store = store_for(builtin_registry(), "Brute-Force");
    let current = store.current_settings();
    let order: Vec<&str> = current.parameters.keys().map(String::as_str).collect();
    assert_eq!(
        order,
        vec![
            "algorithm",
            "color_space",
            "detector",
            "matching_method",
            "norm_type",
            "match_filters_by",
            "n_matches",
        ]
    );

    let resolved: Vec<&str> = store
        .active_parameters()
        .entries()
        .iter()
        .filter(|e| e.enabled)
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(order[1..], resolved[..]);

    // 绘图函数收到的参数表与快照顺序一致
    let flat = current.flat_parameters();
    assert_eq!(flat.keys().map(String::as_str).collect::<Vec<_>>(), order);
}

#[test]
fn test_flann_initial_view() {
    let store = store_for(builtin_registry(), "FLANN");
    let current = store.current_settings();
    assert_eq!(
        current.parameters.keys().cloned().collect::<BTreeSet<_>>(),
        keys(&[
            "algorithm",
            "color_space",
            "detector",
            "matching_method",
            "trees",
            "checks",
            "k",
            "match_filters_by",
            "n_matches",
        ])
    );
    assert_eq!(current.get("detector"), Some(&ParamValue::from("SIFT")));
    assert_eq!(current.get("k"), Some(&ParamValue::Int(1)));
}

#[test]
fn test_match_template_initial_view() {
    let store = store_for(builtin_registry(), "Match Template");
    let current = store.current_settings();
    assert_eq!(
        current.parameters.keys().cloned().collect::<BTreeSet<_>>(),
        keys(&["algorithm", "color_space", "method", "filter_by", "n_matches"])
    );
    assert_eq!(
        current.get("method"),
        Some(&ParamValue::from("TM_SQDIFF_NORMED"))
    );
    assert_eq!(current.get("n_matches"), Some(&ParamValue::Int(1)));
    // 未激活的 ratio 分支仍在 raw 中保留默认值
    assert_eq!(
        store.raw_settings("Match Template").unwrap().values["match_ratio_threshold"],
        ParamValue::Float(0.5)
    );
}

#[test]
fn test_detector_parameters_are_active_but_off() {
    let store = store_for(builtin_registry(), "Brute-Force");
    let nfeatures = store.active_parameters().get("nfeatures").unwrap();
    assert!(!nfeatures.enabled);
    assert_eq!(nfeatures.value, ParamValue::Null);
    assert!(nfeatures.spec.nullable);

    let cross_check = store.active_parameters().get("cross_check").unwrap();
    assert!(!cross_check.enabled);
}

#[test]
fn test_preview_plot_in_bw() {
    let mut store = store_for(builtin_registry(), "Brute-Force");
    store.set_value("color_space", ParamValue::from("BW")).unwrap();

    let base = Image::filled(40, 30, [0, 128, 255]);
    let query = Image::filled(10, 20, [255, 255, 255]);
    let output = store.plot(&base, &query).unwrap();

    let labels: Vec<&str> = output.duration.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Color space change (BW)", "Detector ORB creation", "Plotting"]
    );
    assert_eq!(output.image.channels, 3);
    assert_eq!(output.image.width, 50);
    assert_eq!(output.image.height, 30);
}

#[test]
fn test_registry_plot_rejects_unknown_algorithm() {
    let registry = builtin_registry();
    let image = Image::filled(4, 4, [0, 0, 0]);
    let err = registry
        .plot("SURF", &image, &image, &Default::default())
        .unwrap_err();
    assert!(err.to_string().contains("SURF"));
}
