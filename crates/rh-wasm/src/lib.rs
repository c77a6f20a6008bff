//! WebAssembly bindings for reheader

use std::sync::Once;

use wasm_bindgen::prelude::*;
use rh_compiler::{parse_storage, select_active_profiles, ActiveProfiles, BadgeState, DisplayCache, PauseMenuState};
use rh_core::{
    types::NO_ID, Engine, EngineSettings, Header, RequestContext, ResourceType, RewriteResult,
    ValueSource,
};

// =============================================================================
// Host services
// =============================================================================

/// UUIDs from the browser's crypto source and the JS clock.
struct JsValues;

impl ValueSource for JsValues {
    fn uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

/// Forwards `log` records to the worker console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            _ => web_sys::console::log_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;
static LOGGER_INIT: Once = Once::new();

/// Route engine logs to the console. `level` is `error`, `warn`, `info`,
/// `debug` or `trace`; anything else turns logging off.
#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    LOGGER_INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
    });
    log::set_max_level(level.parse().unwrap_or(log::LevelFilter::Off));
}

// =============================================================================
// Engine
// =============================================================================

#[wasm_bindgen]
pub struct RewriteEngine {
    engine: Engine<JsValues>,
    active: ActiveProfiles,
    badge_cache: DisplayCache<BadgeState>,
}

#[wasm_bindgen]
impl RewriteEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> RewriteEngine {
        RewriteEngine {
            engine: Engine::with_values(EngineSettings::default(), JsValues),
            active: ActiveProfiles::default(),
            badge_cache: DisplayCache::new(),
        }
    }

    /// Replace the active profiles from a storage snapshot. Returns
    /// `{profiles, modifiers, errors}`; profiles that fail to compile are
    /// listed in `errors` and left out.
    #[wasm_bindgen(js_name = loadStorage)]
    pub fn load_storage(&mut self, json: &str) -> Result<JsValue, JsValue> {
        let storage = parse_storage(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.active = select_active_profiles(&storage);
        self.engine.set_paused(storage.is_paused);
        self.engine.set_locked_tab(self.active.locked_tab_id);

        let result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&result, &"profiles".into(), &JsValue::from(self.active.profiles.len() as u32));
        let _ = js_sys::Reflect::set(&result, &"modifiers".into(), &JsValue::from(self.active.modifier_count() as u32));
        let errors = js_sys::Array::new();
        for error in &self.active.errors {
            errors.push(&JsValue::from_str(&format!("{}: {}", error.title, error.error)));
        }
        let _ = js_sys::Reflect::set(&result, &"errors".into(), &errors);
        Ok(result.into())
    }

    #[wasm_bindgen(js_name = setPaused)]
    pub fn set_paused(&mut self, paused: bool) {
        self.engine.set_paused(paused);
    }

    #[wasm_bindgen(js_name = isPaused)]
    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    #[wasm_bindgen(js_name = modifyRequestUrls)]
    pub fn modify_request_urls(&self, details: JsValue) -> JsValue {
        let details = Details::read(&details);
        let result = self.engine.modify_request_urls(&self.active.profiles, &details.context());
        result_to_js(result)
    }

    #[wasm_bindgen(js_name = modifyRequestHeaders)]
    pub fn modify_request_headers(&self, details: JsValue) -> JsValue {
        let details = Details::read(&details);
        let result = self.engine.modify_request_headers(&self.active.profiles, &details.context());
        result_to_js(result)
    }

    #[wasm_bindgen(js_name = modifyResponseHeaders)]
    pub fn modify_response_headers(&self, details: JsValue) -> JsValue {
        let details = Details::read(&details);
        let result = self.engine.modify_response_headers(&self.active.profiles, &details.context());
        result_to_js(result)
    }

    /// Badge `{icon, text, color}`, or `undefined` when unchanged since the
    /// last call.
    pub fn badge(&mut self) -> JsValue {
        let state = BadgeState::compute(self.engine.is_paused(), &self.active);
        let Some(badge) = self.badge_cache.update(state) else {
            return JsValue::UNDEFINED;
        };
        let result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&result, &"icon".into(), &JsValue::from_str(badge.icon.path()));
        let _ = js_sys::Reflect::set(&result, &"text".into(), &JsValue::from_str(&badge.text));
        let _ = js_sys::Reflect::set(&result, &"color".into(), &JsValue::from_str(&badge.color));
        result.into()
    }

    #[wasm_bindgen(js_name = pauseMenuTitle)]
    pub fn pause_menu_title(&self) -> String {
        PauseMenuState::new(self.engine.is_paused()).title().to_string()
    }
}

impl Default for RewriteEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Event details
// =============================================================================

/// Owned copy of a `webRequest` details object.
struct Details {
    url: String,
    method: String,
    resource_type: ResourceType,
    tab_id: i32,
    tab_group_id: i32,
    window_id: i32,
    timestamp_ms: i64,
    request_headers: Vec<Header>,
    response_headers: Option<Vec<Header>>,
}

impl Details {
    fn read(details: &JsValue) -> Self {
        let resource_type = get_string(details, "type")
            .map(|name| ResourceType::from_browser_name_lossy(&name))
            .unwrap_or(ResourceType::OTHER);
        Self {
            url: get_string(details, "url").unwrap_or_default(),
            method: get_string(details, "method").unwrap_or_else(|| "GET".to_string()),
            resource_type,
            tab_id: get_id(details, "tabId"),
            tab_group_id: get_id(details, "tabGroupId"),
            window_id: get_id(details, "windowId"),
            timestamp_ms: get_field(details, "timeStamp")
                .and_then(|v| v.as_f64())
                .map(|v| v as i64)
                .unwrap_or_else(|| js_sys::Date::now() as i64),
            request_headers: get_headers(details, "requestHeaders").unwrap_or_default(),
            response_headers: get_headers(details, "responseHeaders"),
        }
    }

    fn context(&self) -> RequestContext<'_> {
        RequestContext {
            url: &self.url,
            method: &self.method,
            resource_type: self.resource_type,
            tab_id: self.tab_id,
            tab_group_id: self.tab_group_id,
            window_id: self.window_id,
            timestamp_ms: self.timestamp_ms,
            request_headers: &self.request_headers,
            response_headers: self.response_headers.as_deref(),
        }
    }
}

fn get_field(object: &JsValue, key: &str) -> Option<JsValue> {
    js_sys::Reflect::get(object, &key.into())
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn get_string(object: &JsValue, key: &str) -> Option<String> {
    get_field(object, key).and_then(|value| value.as_string())
}

fn get_id(object: &JsValue, key: &str) -> i32 {
    get_field(object, key)
        .and_then(|value| value.as_f64())
        .map(|value| value as i32)
        .unwrap_or(NO_ID)
}

fn get_headers(object: &JsValue, key: &str) -> Option<Vec<Header>> {
    let array = get_field(object, key)?;
    let array = js_sys::Array::from(&array);
    let mut headers = Vec::with_capacity(array.length() as usize);
    for entry in array.iter() {
        let name = get_string(&entry, "name").unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let value = get_string(&entry, "value").unwrap_or_default();
        headers.push(Header { name, value });
    }
    Some(headers)
}

fn headers_to_js(headers: &[Header]) -> js_sys::Array {
    let array = js_sys::Array::new();
    for header in headers {
        let entry = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&entry, &"name".into(), &JsValue::from_str(&header.name));
        let _ = js_sys::Reflect::set(&entry, &"value".into(), &JsValue::from_str(&header.value));
        array.push(&entry);
    }
    array
}

fn result_to_js(result: RewriteResult) -> JsValue {
    let js_result = js_sys::Object::new();
    match result {
        RewriteResult::NoChange => return JsValue::UNDEFINED,
        RewriteResult::RequestHeaders(headers) => {
            let _ = js_sys::Reflect::set(&js_result, &"requestHeaders".into(), &headers_to_js(&headers));
        }
        RewriteResult::ResponseHeaders(headers) => {
            let _ = js_sys::Reflect::set(&js_result, &"responseHeaders".into(), &headers_to_js(&headers));
        }
        RewriteResult::RedirectUrl(url) => {
            let _ = js_sys::Reflect::set(&js_result, &"redirectUrl".into(), &JsValue::from_str(&url));
        }
    }
    js_result.into()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    const STORAGE: &str = r##"{
        "profiles": [{
            "title": "Profile 1",
            "backgroundColor": "#336699",
            "headers": [{"name": "X-Test", "value": "{{url_hostname}}"}],
            "respHeaders": [{"name": "X-Resp", "value": "1"}],
            "urlReplacements": [{"name": "bewisse.com", "value": "modheader.com"}]
        }],
        "selectedProfile": 0
    }"##;

    fn details(json: &str) -> JsValue {
        js_sys::JSON::parse(json).unwrap()
    }

    fn loaded() -> RewriteEngine {
        let mut engine = RewriteEngine::new();
        engine.load_storage(STORAGE).unwrap();
        engine
    }

    #[wasm_bindgen_test]
    fn rewrites_request_headers() {
        let engine = loaded();
        let result = engine.modify_request_headers(details(
            r#"{"url":"https://example.com/","type":"main_frame","tabId":1,"requestHeaders":[]}"#,
        ));
        let headers = js_sys::Array::from(&js_sys::Reflect::get(&result, &"requestHeaders".into()).unwrap());
        assert_eq!(headers.length(), 1);
        let value = js_sys::Reflect::get(&headers.get(0), &"value".into()).unwrap();
        assert_eq!(value.as_string().as_deref(), Some("example.com"));
    }

    #[wasm_bindgen_test]
    fn redirects_and_pauses() {
        let mut engine = loaded();
        let result = engine.modify_request_urls(details(r#"{"url":"https://bewisse.com/"}"#));
        let url = js_sys::Reflect::get(&result, &"redirectUrl".into()).unwrap();
        assert_eq!(url.as_string().as_deref(), Some("https://modheader.com/"));

        engine.set_paused(true);
        assert!(engine.modify_request_urls(details(r#"{"url":"https://bewisse.com/"}"#)).is_undefined());
        assert_eq!(engine.pause_menu_title(), "Unpause");
    }

    #[wasm_bindgen_test]
    fn badge_only_reports_changes() {
        let mut engine = loaded();
        let badge = engine.badge();
        let text = js_sys::Reflect::get(&badge, &"text".into()).unwrap();
        assert_eq!(text.as_string().as_deref(), Some("3"));
        let color = js_sys::Reflect::get(&badge, &"color".into()).unwrap();
        assert_eq!(color.as_string().as_deref(), Some("#336699"));
        assert!(engine.badge().is_undefined());
        engine.set_paused(true);
        assert!(!engine.badge().is_undefined());
    }

    #[wasm_bindgen_test]
    fn locked_tab_limits_rewrites() {
        let mut engine = RewriteEngine::new();
        engine
            .load_storage(
                r#"{"profiles":[{"headers":[{"name":"X","value":"1"}],"tabFilters":[{"tabId":7}]}],
                    "selectedProfile":0,"lockedTabId":5}"#,
            )
            .unwrap();
        let result = engine.modify_request_headers(details(r#"{"url":"https://example.com/","tabId":7}"#));
        assert!(result.is_undefined());
    }
}
