//! WebAssembly bindings for NetSieve
//!
//! Exposes one [`WasmEngine`] per extension background context. All list
//! management goes through the same engine instance; `classify` reads the
//! index published by the last `rebuild`.

use wasm_bindgen::prelude::*;

use ns_compiler::{Engine, ParseReport};
use ns_core::config::EngineConfig;
use ns_core::types::{Action, RequestType};

fn set(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &JsValue::from_str(key), value);
}

fn report_to_js(report: &ParseReport) -> JsValue {
    let result = js_sys::Object::new();
    set(&result, "lines", &JsValue::from(report.lines as u32));
    set(&result, "accepted", &JsValue::from(report.accepted as u32));
    set(&result, "ignored", &JsValue::from(report.ignored as u32));
    set(&result, "unsupported", &JsValue::from(report.unsupported as u32));
    set(&result, "malformed", &JsValue::from(report.malformed as u32));
    result.into()
}

#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Create an engine. `config_json` may be empty for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmEngine, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) if !json.trim().is_empty() => {
                EngineConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?
            }
            _ => EngineConfig::default(),
        };
        Ok(Self {
            engine: Engine::new(config),
        })
    }

    /// Register or replace a list; returns its parse report.
    #[wasm_bindgen(js_name = addList)]
    pub fn add_list(&self, id: &str, text: &str) -> Result<JsValue, JsValue> {
        let report = self
            .engine
            .add_list(id, text)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        if report.rejected() > 0 {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "List '{}': {} of {} lines rejected",
                id,
                report.rejected(),
                report.lines
            )));
        }
        Ok(report_to_js(&report))
    }

    #[wasm_bindgen(js_name = removeList)]
    pub fn remove_list(&self, id: &str) -> Result<(), JsValue> {
        self.engine
            .remove_list(id)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), JsValue> {
        self.engine
            .set_enabled(id, enabled)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Compile enabled lists; returns the number of network rules.
    pub fn rebuild(&self) -> u32 {
        self.engine.rebuild().network_rule_count() as u32
    }

    /// Returns `{action, matchedRule, bytesEstimate}`.
    pub fn classify(&self, url: &str, source_domain: &str, resource_type: &str) -> JsValue {
        let decision = self
            .engine
            .classify(url, source_domain, RequestType::from_request_name(resource_type));

        let result = js_sys::Object::new();
        let action = match decision.action {
            Action::Block => "block",
            Action::Allow => "allow",
        };
        set(&result, "action", &JsValue::from_str(action));
        let matched = match &decision.matched_rule {
            Some(rule) => JsValue::from_str(&rule.text),
            None => JsValue::NULL,
        };
        set(&result, "matchedRule", &matched);
        set(&result, "bytesEstimate", &JsValue::from(decision.bytes_estimate as f64));
        result.into()
    }

    #[wasm_bindgen(js_name = cosmeticSelectors)]
    pub fn cosmetic_selectors(&self, host: &str) -> js_sys::Array {
        self.engine
            .cosmetic_selectors(host)
            .iter()
            .map(|selector| JsValue::from_str(selector))
            .collect()
    }

    /// Statistics snapshot as a JSON string.
    pub fn statistics(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.statistics()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Classification latency and parse-error counters as a JSON string.
    pub fn metrics(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.metrics()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = resetStatistics)]
    pub fn reset_statistics(&self) {
        self.engine.reset_statistics();
    }
}
