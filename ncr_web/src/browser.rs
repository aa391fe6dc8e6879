//! wasm-bindgen surface.
//!
//! The page constructs a [`WebSession`] with a store object whose methods
//! return promises:
//!
//! ```js
//! const store = {
//!   nextDocumentNumber: () => Promise<string>,
//!   addNcrRecord: (record) => Promise<void>,
//!   addReturnRecord: (record) => Promise<void>,
//!   listNcrRecords: () => Promise<object[]>,
//! };
//! const session = new WebSession(store, "assets/logo.png", null);
//! await session.loadPrintFonts(); // fetches config export.print_fonts
//! ```
//!
//! Long-running calls return promises. A save borrows the session for its
//! whole duration; any other call made meanwhile is rejected with a
//! `SAVE_NOT_READY` error instead of touching the form.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array, JSON};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Response, Url};

use ncr_core::config::NcrConfig;
use ncr_core::errors::{NcrError, NcrResult};
use ncr_core::export::{ExportFile, LogoSource};
use ncr_core::records::{NcrRecord, ReturnRecord};
use ncr_core::store::{NcrStore, StoreError, StoreResult};

use crate::{error_json, to_json, NcrSession};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

fn busy() -> JsValue {
    JsValue::from_str(&error_json(&NcrError::SaveNotReady {
        state: "saving".to_string(),
    }))
}

// ============================================================================
// Store adapter
// ============================================================================

/// [`NcrStore`] backed by a page-supplied JavaScript object
pub struct JsStore {
    inner: Object,
}

impl JsStore {
    pub fn new(inner: Object) -> Self {
        JsStore { inner }
    }

    async fn call(&self, method: &str, arg: Option<JsValue>) -> StoreResult<JsValue> {
        let to_store_error = |e: JsValue| {
            let message = js_message(&e);
            if message.to_lowercase().contains("permission") {
                StoreError::PermissionDenied(message)
            } else {
                StoreError::Other(message)
            }
        };

        let function = Reflect::get(&self.inner, &JsValue::from_str(method))
            .map_err(to_store_error)?
            .dyn_into::<Function>()
            .map_err(|_| StoreError::Unavailable(format!("store has no method '{}'", method)))?;

        let returned = match arg {
            Some(arg) => function.call1(&self.inner, &arg),
            None => function.call0(&self.inner),
        }
        .map_err(to_store_error)?;

        JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(to_store_error)
    }

    fn to_js<T: serde::Serialize>(value: &T) -> StoreResult<JsValue> {
        let json = serde_json::to_string(value).map_err(|e| StoreError::Other(e.to_string()))?;
        JSON::parse(&json).map_err(|e| StoreError::Other(js_message(&e)))
    }
}

#[async_trait(?Send)]
impl NcrStore for JsStore {
    async fn next_document_number(&self) -> StoreResult<String> {
        let value = self.call("nextDocumentNumber", None).await?;
        // non-string results fall through to the sentinel check as empty
        Ok(value.as_string().unwrap_or_default())
    }

    async fn add_ncr_record(&self, record: &NcrRecord) -> StoreResult<()> {
        self.call("addNcrRecord", Some(Self::to_js(record)?)).await.map(|_| ())
    }

    async fn add_return_record(&self, record: &ReturnRecord) -> StoreResult<()> {
        self.call("addReturnRecord", Some(Self::to_js(record)?)).await.map(|_| ())
    }

    async fn ncr_records(&self) -> StoreResult<Vec<NcrRecord>> {
        let value = self.call("listNcrRecords", None).await?;
        let json: String = JSON::stringify(&value)
            .map_err(|e| StoreError::Other(js_message(&e)))?
            .into();
        serde_json::from_str(&json).map_err(|e| StoreError::Other(e.to_string()))
    }
}

// ============================================================================
// Fetch
// ============================================================================

/// GET `url` with the browser's fetch API and return the body bytes.
async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let window = web_sys::window().ok_or("no window")?;

    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("fetch of {} failed: {}", url, js_message(&e)))?
        .dyn_into()
        .map_err(|_| format!("fetch of {} returned no response", url))?;
    if !response.ok() {
        return Err(format!("fetch of {} returned HTTP {}", url, response.status()));
    }

    let buffer = response.array_buffer().map_err(|e| js_message(&e))?;
    let buffer = JsFuture::from(buffer).await.map_err(|e| js_message(&e))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Logo fetched over HTTP
pub struct FetchLogo {
    url: Option<String>,
}

#[async_trait(?Send)]
impl LogoSource for FetchLogo {
    async fn fetch_logo(&self) -> NcrResult<Vec<u8>> {
        let url = self.url.as_deref().ok_or_else(|| NcrError::export("no logo configured"))?;
        fetch_bytes(url).await.map_err(NcrError::export)
    }
}

// ============================================================================
// Download
// ============================================================================

/// How long a download's object URL outlives the click
const DOWNLOAD_URL_LIFETIME_MS: i32 = 10_000;
/// The print tab loads the PDF lazily, so its URL lives longer
const PRINT_URL_LIFETIME_MS: i32 = 60_000;

fn object_url(file: &ExportFile) -> Result<String, JsValue> {
    let bytes = Uint8Array::from(file.bytes.as_slice());
    let parts = Array::new();
    parts.push(&bytes);
    let options = BlobPropertyBag::new();
    options.set_type(&file.mime);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

/// Hand `file` to the browser as a download.
pub fn download(file: &ExportFile) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let url = object_url(file)?;

    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(&file.file_name);
    anchor.click();

    revoke_later(url, DOWNLOAD_URL_LIFETIME_MS)?;
    tracing::debug!(file = %file.file_name, "download started");
    Ok(())
}

/// Open `file` in a new tab for the browser's print dialog.
pub fn open_for_print(file: &ExportFile) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let url = object_url(file)?;
    window.open_with_url_and_target(&url, "_blank")?;
    revoke_later(url, PRINT_URL_LIFETIME_MS)
}

/// Release an object URL once the browser has had time to read it.
///
/// Revoking right after `click()` can cancel the download in some browsers.
fn revoke_later(url: String, delay_ms: i32) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let revoke = Closure::once_into_js(move || {
        if let Err(e) = Url::revoke_object_url(&url) {
            tracing::debug!(error = %js_message(&e), "object URL not revoked");
        }
    });
    window.set_timeout_with_callback_and_timeout_and_arguments_0(revoke.unchecked_ref(), delay_ms)?;
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

/// The page's handle on one NCR form
#[wasm_bindgen]
pub struct WebSession {
    session: Rc<RefCell<NcrSession>>,
    store: Rc<JsStore>,
    logo: Rc<FetchLogo>,
}

#[wasm_bindgen]
impl WebSession {
    /// `config_json` is an optional `NcrConfig` document; missing keys use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(store: Object, logo_url: Option<String>, config_json: Option<String>) -> Result<WebSession, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<NcrConfig>(&json)
                .map_err(|e| JsValue::from_str(&error_json(&e.into())))?,
            None => NcrConfig::default(),
        };
        let logo_url = logo_url.or_else(|| config.export.logo_location.clone());

        Ok(WebSession {
            session: Rc::new(RefCell::new(NcrSession::new(config))),
            store: Rc::new(JsStore::new(store)),
            logo: Rc::new(FetchLogo { url: logo_url }),
        })
    }

    fn with<T>(&self, f: impl FnOnce(&NcrSession) -> Result<T, String>) -> Result<T, JsValue> {
        let session = self.session.try_borrow().map_err(|_| busy())?;
        f(&session).map_err(|e| JsValue::from_str(&e))
    }

    fn with_mut<T>(&self, f: impl FnOnce(&mut NcrSession) -> Result<T, String>) -> Result<T, JsValue> {
        let mut session = self.session.try_borrow_mut().map_err(|_| busy())?;
        f(&mut session).map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = statusJson)]
    pub fn status_json(&self) -> Result<String, JsValue> {
        self.with(|s| s.status_json())
    }

    #[wasm_bindgen(js_name = formJson)]
    pub fn form_json(&self) -> Result<String, JsValue> {
        self.with(|s| s.form_json())
    }

    #[wasm_bindgen(js_name = setFormJson)]
    pub fn set_form_json(&self, json: &str) -> Result<(), JsValue> {
        self.with_mut(|s| s.set_form_json(json))
    }

    #[wasm_bindgen(js_name = draftJson)]
    pub fn draft_json(&self) -> Result<String, JsValue> {
        self.with(|s| s.draft_json())
    }

    #[wasm_bindgen(js_name = setDraftJson)]
    pub fn set_draft_json(&self, json: &str) -> Result<(), JsValue> {
        self.with_mut(|s| s.set_draft_json(json))
    }

    #[wasm_bindgen(js_name = itemsJson)]
    pub fn items_json(&self) -> Result<String, JsValue> {
        self.with(|s| s.items_json())
    }

    #[wasm_bindgen(js_name = addItem)]
    pub fn add_item(&self) -> Result<String, JsValue> {
        self.with_mut(|s| s.add_item())
    }

    #[wasm_bindgen(js_name = removeItem)]
    pub fn remove_item(&self, id: &str) -> Result<(), JsValue> {
        self.with_mut(|s| s.remove_item(id))
    }

    #[wasm_bindgen(js_name = editItem)]
    pub fn edit_item(&self, id: &str) -> Result<(), JsValue> {
        self.with_mut(|s| s.edit_item(id))
    }

    #[wasm_bindgen(js_name = requestSave)]
    pub fn request_save(&self) -> Result<(), JsValue> {
        self.with_mut(|s| s.request_save())
    }

    #[wasm_bindgen(js_name = cancelSave)]
    pub fn cancel_save(&self) -> Result<(), JsValue> {
        self.with_mut(|s| {
            s.cancel_save();
            Ok(())
        })
    }

    /// Resolves with the save report JSON. With `queue_print`, the saved
    /// document is opened for printing once the save succeeds.
    #[wasm_bindgen(js_name = confirmSave)]
    pub fn confirm_save(&self, queue_print: bool) -> Promise {
        let session = Rc::clone(&self.session);
        let store = Rc::clone(&self.store);
        future_to_promise(async move {
            let mut session = session.try_borrow_mut().map_err(|_| busy())?;
            let report = session
                .confirm_save(store.as_ref(), queue_print)
                .await
                .map_err(|e| JsValue::from_str(&e))?;

            if queue_print {
                let file = session.print_saved().map_err(|e| JsValue::from_str(&e))?;
                open_for_print(&file)?;
            }
            Ok(JsValue::from_str(&to_json(&report)?))
        })
    }

    /// Build the workbook and download it.
    #[wasm_bindgen(js_name = exportExcel)]
    pub fn export_excel(&self, override_validation: bool) -> Promise {
        let session = Rc::clone(&self.session);
        let logo = Rc::clone(&self.logo);
        future_to_promise(async move {
            let session = session.try_borrow().map_err(|_| busy())?;
            let file = session
                .export_excel(override_validation, logo.as_ref())
                .await
                .map_err(|e| JsValue::from_str(&e))?;
            download(&file)?;
            Ok(JsValue::from_str(&file.file_name))
        })
    }

    /// Download the workbook of the last saved NCR, named after its
    /// document number. Resolves with the file name.
    #[wasm_bindgen(js_name = exportSaved)]
    pub fn export_saved(&self) -> Promise {
        let session = Rc::clone(&self.session);
        let logo = Rc::clone(&self.logo);
        future_to_promise(async move {
            let session = session.try_borrow().map_err(|_| busy())?;
            let file = session
                .export_saved_excel(logo.as_ref())
                .await
                .map_err(|e| JsValue::from_str(&e))?;
            download(&file)?;
            Ok(JsValue::from_str(&file.file_name))
        })
    }

    /// Fetch the fonts listed in `export.print_fonts` and make them
    /// available to print. Resolves with the number of faces added;
    /// fonts that fail to load are logged and skipped.
    #[wasm_bindgen(js_name = loadPrintFonts)]
    pub fn load_print_fonts(&self) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            let urls = session
                .try_borrow()
                .map_err(|_| busy())?
                .config()
                .export
                .print_fonts
                .clone();

            let mut added = 0;
            for url in &urls {
                let loaded = match fetch_bytes(url).await {
                    Ok(data) => {
                        let mut session = session.try_borrow_mut().map_err(|_| busy())?;
                        session.add_print_font(data)
                    }
                    Err(e) => Err(e),
                };
                match loaded {
                    Ok(faces) => added += faces,
                    Err(e) => tracing::warn!(url = %url, error = %e, "print font skipped"),
                }
            }
            Ok(JsValue::from_f64(added as f64))
        })
    }

    /// Render the current form and open it for printing.
    pub fn print(&self) -> Result<(), JsValue> {
        let file = self.with(|s| s.print())?;
        open_for_print(&file)
    }

    /// Resolves with `{founders, customers, product_codes}` JSON.
    #[wasm_bindgen(js_name = suggestionsJson)]
    pub fn suggestions_json(&self) -> Promise {
        let session = Rc::clone(&self.session);
        let store = Rc::clone(&self.store);
        future_to_promise(async move {
            let session = session.try_borrow().map_err(|_| busy())?;
            let json = session
                .suggestions_json(store.as_ref())
                .await
                .map_err(|e| JsValue::from_str(&e))?;
            Ok(JsValue::from_str(&json))
        })
    }
}
