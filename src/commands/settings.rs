use crate::commands::ingest::DEFAULT_FEEDBACK_TEXT_COLUMNS;
use crate::models::impact_score::{default_weights, ScoreWeights};
use crate::models::theme::{default_themes, ThemeLexicon};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;
const SETTINGS_DIR: &str = ".impactlens";

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub weights: ScoreWeights,
    pub lexicon: ThemeLexicon,
    pub feedback_text_columns: Vec<String>,
    pub workers: usize,
    pub high_impact_threshold: f64,
    pub summary_top_n: usize,
}

pub fn get_settings(workspace_path: &str) -> Result<Value, String> {
    load_settings_from_disk(workspace_path)
}

pub fn save_settings(workspace_path: &str, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(workspace_path, settings)
}

pub fn load_effective_settings(workspace_path: &str) -> Result<EffectiveSettings, String> {
    let settings = load_settings_from_disk(workspace_path)?;
    Ok(effective_from_value(workspace_path, &settings))
}

fn effective_from_value(workspace_path: &str, settings: &Value) -> EffectiveSettings {
    let workspace = Path::new(workspace_path);
    let resolve = |key: &str, default: &str| {
        let raw = settings.get(key).and_then(Value::as_str).unwrap_or(default);
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            workspace.join(path)
        }
    };

    let mut weights = default_weights();
    if let Some(obj) = settings.get("weights").and_then(Value::as_object) {
        for (key, value) in obj {
            if let Some(v) = value.as_f64() {
                weights.insert(key.clone(), v);
            }
        }
    }

    let lexicon = settings
        .get("themes")
        .and_then(|v| serde_json::from_value::<BTreeMap<String, Vec<String>>>(v.clone()).ok())
        .map(ThemeLexicon::from_map)
        .filter(|lexicon| !lexicon.is_empty())
        .unwrap_or_default();

    let feedback_text_columns = settings
        .get("feedbackTextColumns")
        .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
        .filter(|cols| !cols.is_empty())
        .unwrap_or_else(|| string_list(DEFAULT_FEEDBACK_TEXT_COLUMNS));

    EffectiveSettings {
        data_dir: resolve("dataDir", "data"),
        output_dir: resolve("outputDir", "output"),
        weights: ScoreWeights::from_map(&weights),
        lexicon,
        feedback_text_columns,
        workers: settings.get("workers").and_then(Value::as_u64).unwrap_or(0).min(64) as usize,
        high_impact_threshold: settings
            .get("highImpactThreshold")
            .and_then(Value::as_f64)
            .unwrap_or(0.65)
            .clamp(0.0, 1.0),
        summary_top_n: settings
            .get("summaryTopN")
            .and_then(Value::as_u64)
            .unwrap_or(5)
            .clamp(1, 50) as usize,
    }
}

pub fn load_settings_from_disk(workspace_path: &str) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_settings_dir(workspace_path)?;

    let original = match read_settings_file(&path)? {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            // Leave the file for the user to fix.
            log::warn!("Ignoring unreadable settings.json ({e}); using defaults");
            return Ok(migrate_settings(json!({})));
        }
        None => json!({}),
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(workspace_path: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_settings_dir(workspace_path)?;

    let mut merged = match read_settings_file(&path)? {
        Some(Ok(value)) => migrate_settings(value),
        Some(Err(e)) => {
            return Err(format!(
                "Refusing to overwrite unreadable settings.json ({e}); fix or remove {}",
                path.display()
            ))
        }
        None => default_settings(),
    };
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

/// `None` when the file does not exist; the inner error is a JSON parse failure.
fn read_settings_file(path: &Path) -> Result<Option<Result<Value, serde_json::Error>>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings.json: {e}"))?;
    Ok(Some(serde_json::from_str::<Value>(&raw)))
}

fn settings_path(workspace_path: &str) -> PathBuf {
    Path::new(workspace_path)
        .join(SETTINGS_DIR)
        .join("settings.json")
}

fn ensure_settings_dir(workspace_path: &str) -> Result<(), String> {
    let dir = Path::new(workspace_path).join(SETTINGS_DIR);
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create {SETTINGS_DIR} directory: {e}"))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        migrate_weights_from_percentages(&mut out);
    }

    if version < 2 {
        // V2 moves the theme lexicon and text columns into settings.
        ensure_key(&mut out, "themes", json!(default_themes()));
        ensure_key(&mut out, "feedbackTextColumns", json!(DEFAULT_FEEDBACK_TEXT_COLUMNS));
        ensure_key(&mut out, "workers", json!(0));
    }

    deep_merge_defaults(&mut out, &default_settings());
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "dataDir": "data",
        "outputDir": "output",
        "weights": default_weights(),
        "themes": default_themes(),
        "feedbackTextColumns": DEFAULT_FEEDBACK_TEXT_COLUMNS,
        "workers": 0,
        "highImpactThreshold": 0.65,
        "summaryTopN": 5
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        // A user-supplied lexicon replaces the default one wholesale.
        if key == "themes" && target_obj.contains_key(key) {
            continue;
        }
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if key == "themes" {
                    target_obj.insert(key.clone(), value.clone());
                } else if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn migrate_weights_from_percentages(settings: &mut Value) {
    let Some(weights) = settings.get_mut("weights").and_then(Value::as_object_mut) else {
        return;
    };

    let has_percentage_like_values = weights.values().any(|v| v.as_f64().unwrap_or(0.0) > 1.0);
    if !has_percentage_like_values {
        return;
    }

    for value in weights.values_mut() {
        if let Some(v) = value.as_f64() {
            *value = json!(v / 100.0);
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    // Clamp numerics.
    clamp_u64(obj, "workers", 0, 64, 0);
    clamp_u64(obj, "summaryTopN", 1, 50, 5);
    clamp_f64(obj, "highImpactThreshold", 0.0, 1.0, 0.65);

    ensure_string(obj, "dataDir", "data");
    ensure_string(obj, "outputDir", "output");

    let columns: Vec<String> = obj
        .get("feedbackTextColumns")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let columns = if columns.is_empty() {
        string_list(DEFAULT_FEEDBACK_TEXT_COLUMNS)
    } else {
        columns
    };
    obj.insert("feedbackTextColumns".to_string(), json!(columns));

    // Lowercase/dedupe keywords and drop empty themes.
    let raw_themes: BTreeMap<String, Vec<String>> = obj
        .get("themes")
        .and_then(Value::as_object)
        .map(|themes| {
            themes
                .iter()
                .map(|(name, keywords)| {
                    let keywords = keywords
                        .as_array()
                        .map(|list| list.iter().filter_map(Value::as_str).map(str::to_string).collect())
                        .unwrap_or_default();
                    (name.clone(), keywords)
                })
                .collect()
        })
        .unwrap_or_default();
    let lexicon = ThemeLexicon::from_map(raw_themes);
    let lexicon = if lexicon.is_empty() {
        ThemeLexicon::default()
    } else {
        lexicon
    };
    obj.insert("themes".to_string(), json!(lexicon.to_map()));

    // Normalize weights.
    let default_weight_map = default_weights();
    let weights = obj
        .entry("weights".to_string())
        .or_insert_with(|| json!({}));

    if let Some(weight_obj) = weights.as_object_mut() {
        weight_obj.retain(|key, _| default_weight_map.contains_key(key));
        for (key, default_value) in &default_weight_map {
            let current = weight_obj.get(key).and_then(Value::as_f64).unwrap_or(*default_value);
            weight_obj.insert(key.clone(), json!(current.clamp(0.0, 1.0)));
        }

        let sum: f64 = weight_obj.values().filter_map(Value::as_f64).sum();
        if (sum - 1.0).abs() < 1e-9 {
            // Already sums to 1.
        } else if sum > f64::EPSILON {
            for value in weight_obj.values_mut() {
                if let Some(v) = value.as_f64() {
                    *value = json!((v / sum).clamp(0.0, 1.0));
                }
            }
        } else {
            *weights = json!(default_weight_map);
        }
    } else {
        *weights = json!(default_weight_map);
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map.get(key).and_then(Value::as_f64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_string(map: &mut Map<String, Value>, key: &str, default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string();
    map.insert(key.to_string(), json!(valid));
}

fn string_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn weights_from_value(settings: &Value) -> HashMap<String, f64> {
        settings
            .get("weights")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_f64().map(|v| (k.clone(), v)))
                    .collect()
            })
            .unwrap_or_else(default_weights)
    }

    #[test]
    fn malformed_settings_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().to_string_lossy().to_string();
        let settings_dir = dir.path().join(SETTINGS_DIR);
        fs::create_dir_all(&settings_dir).unwrap();
        let file = settings_dir.join("settings.json");
        let broken = r#"{ "weights": { "priority": 0.8, "effort": 0.1, "theme": 0.1 }, }"#;
        fs::write(&file, broken).unwrap();

        let value = get_settings(&workspace).unwrap();
        assert_eq!(weights_from_value(&value), default_weights());
        assert!(load_effective_settings(&workspace).is_ok());
        assert_eq!(fs::read_to_string(&file).unwrap(), broken);

        let err = save_settings(&workspace, json!({ "workers": 2 })).unwrap_err();
        assert!(err.contains("Refusing to overwrite"), "{err}");
        assert_eq!(fs::read_to_string(&file).unwrap(), broken);
    }

    #[test]
    fn migrates_percentage_weights_and_normalizes() {
        let input = json!({
            "schema_version": 0,
            "weights": {
                "priority": 40,
                "effort": 30,
                "theme": 30
            }
        });

        let migrated = migrate_settings(input);
        let weights = weights_from_value(&migrated);
        let sum: f64 = weights.values().sum();

        assert!((sum - 1.0).abs() < 1e-6);
        assert!((weights["priority"] - 0.4).abs() < 1e-9);
        assert_eq!(
            migrated
                .get("schema_version")
                .and_then(Value::as_i64)
                .unwrap(),
            SETTINGS_SCHEMA_VERSION
        );
    }

    #[test]
    fn v1_settings_gain_lexicon_and_columns() {
        let migrated = migrate_settings(json!({ "schema_version": 1, "summaryTopN": 3 }));

        assert_eq!(migrated["summaryTopN"], json!(3));
        assert!(migrated["themes"]["email"].is_array());
        assert_eq!(migrated["feedbackTextColumns"][0], json!("reason_for_rating"));
    }

    #[test]
    fn merges_partial_settings_without_losing_existing_values() {
        let mut existing = default_settings();
        merge_settings(&mut existing, &json!({ "summaryTopN": 10 }));
        let migrated = migrate_settings(existing);

        assert_eq!(migrated["summaryTopN"], json!(10));
        assert_eq!(migrated["highImpactThreshold"], json!(0.65));
        assert!(migrated.get("weights").is_some());
    }

    #[test]
    fn custom_lexicon_replaces_defaults_and_is_cleaned() {
        let mut existing = default_settings();
        merge_settings(
            &mut existing,
            &json!({ "themes": { "Billing": ["Invoice", " REFUND "], "blank": [""] } }),
        );
        let migrated = migrate_settings(existing);

        let themes = migrated["themes"].as_object().unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(migrated["themes"]["billing"], json!(["invoice", "refund"]));
    }

    #[test]
    fn sanitizes_out_of_range_values() {
        let migrated = migrate_settings(json!({
            "schema_version": 2,
            "workers": 1000,
            "highImpactThreshold": 3.0,
            "weights": { "priority": 0, "effort": 0, "theme": 0 },
            "feedbackTextColumns": []
        }));

        assert_eq!(migrated["workers"], json!(64));
        assert_eq!(migrated["highImpactThreshold"], json!(1.0));
        assert_eq!(weights_from_value(&migrated), default_weights());
        assert_eq!(migrated["feedbackTextColumns"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn effective_settings_resolve_relative_paths() {
        let effective = effective_from_value("/work", &default_settings());
        assert_eq!(effective.data_dir, PathBuf::from("/work/data"));
        assert_eq!(effective.weights, ScoreWeights::default());
        assert_eq!(effective.lexicon, ThemeLexicon::default());
        assert_eq!(effective.summary_top_n, 5);
    }
}
