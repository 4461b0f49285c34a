//! Example bundles driving the modlink public API.
//!
//! Reconstructs a small font-loading bundle: an entry module pulls an
//! injected stylesheet, the stylesheet resolves compiled css and font asset
//! urls, and the css-loader helper lives in a shared vendors chunk the
//! entry has to wait for.

use std::rc::Rc;

use modlink::interop::{MERGE, PASSTHROUGH, RESOLVE_ID};
use modlink::{BodyMap, DeferredEntry, Delivery, ModuleBody, ModuleId, Value};

/// Chunk carrying the font entry and its stylesheet modules.
pub const FONT_CHUNK: &str = "font";
/// Shared chunk carrying the css-loader helper.
pub const VENDORS_CHUNK: &str = "vendors~extract~font~user";

/// Entry-point module of the bundle.
pub const FONT_ENTRY: &str = "./src/js/font.js";
/// Style-injecting wrapper around the compiled stylesheet.
pub const ICONFONT_CSS: &str = "./src/font/iconfont.css";
/// Compiled stylesheet with resolved asset urls.
pub const COMPILED_CSS: &str = "css-loader!./src/font/iconfont.css";
/// Embedded-opentype font asset.
pub const EOT_ASSET: &str = "./src/font/iconfont.eot";
/// Woff font asset.
pub const WOFF_ASSET: &str = "./src/font/iconfont.woff";
/// css-loader runtime helper, shared through the vendors chunk.
pub const CSS_LOADER_API: &str = "./node_modules/css-loader/dist/runtime/api.js";

fn font_entry_body() -> ModuleBody {
    Rc::new(|record, rt| {
        rt.mark_module(record);
        rt.require(&ModuleId::from(ICONFONT_CSS))?;
        Ok(())
    })
}

fn style_injector_body() -> ModuleBody {
    Rc::new(|record, rt| {
        let content = rt.require(&ModuleId::from(COMPILED_CSS))?;
        let content = rt.default_export(&content);
        let locals = Value::object();
        if let Some(obj) = locals.as_object() {
            if let Some(css) = content.as_object().and_then(|o| o.get("css")) {
                obj.set("css", css)?;
            }
        }
        record.replace_exports(locals)
    })
}

fn compiled_css_body() -> ModuleBody {
    Rc::new(|record, rt| {
        let api = rt.require(&ModuleId::from(CSS_LOADER_API))?;
        let banner = api
            .as_object()
            .and_then(|o| o.get("banner"))
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let eot = rt.to_namespace(Value::from(EOT_ASSET), RESOLVE_ID | MERGE | PASSTHROUGH)?;
        let eot_url = rt.default_export(&eot);
        let woff = rt.require(&ModuleId::from(WOFF_ASSET))?;
        let woff_url = rt.default_export(&woff);

        let css = format!(
            "{}\n@font-face {{ font-family: \"iconfont\"; src: url({}) format(\"embedded-opentype\"), url({}) format(\"woff\"); }}",
            banner,
            eot_url.as_str().unwrap_or(""),
            woff_url.as_str().unwrap_or(""),
        );

        let exports = Value::object();
        if let Some(obj) = exports.as_object() {
            obj.set("css", Value::from(css))?;
            obj.set("id", Value::from(record.id().as_str()))?;
            obj.seal();
        }
        record.replace_exports(exports)
    })
}

fn asset_body(url: &'static str) -> ModuleBody {
    Rc::new(move |record, rt| {
        rt.mark_module(record);
        record.export("default", url)
    })
}

fn css_loader_api_body() -> ModuleBody {
    Rc::new(|record, _rt| {
        let exports = Value::object();
        if let Some(obj) = exports.as_object() {
            obj.set("banner", Value::from("/* css-loader runtime */"))?;
        }
        record.replace_exports(exports)
    })
}

/// The delivery carrying the font chunk and all of its modules.
pub fn font_delivery() -> Delivery {
    Delivery::new()
        .chunk(FONT_CHUNK)
        .module_body(FONT_ENTRY, font_entry_body())
        .module_body(ICONFONT_CSS, style_injector_body())
        .module_body(COMPILED_CSS, compiled_css_body())
        .module_body(EOT_ASSET, asset_body("static/font/084187c444.eot"))
        .module_body(WOFF_ASSET, asset_body("static/font/836168041f.woff"))
}

/// The delivery carrying the shared vendors chunk.
pub fn vendors_delivery() -> Delivery {
    Delivery::new()
        .chunk(VENDORS_CHUNK)
        .module_body(CSS_LOADER_API, css_loader_api_body())
}

/// The bundle's entry point, blocked on the vendors chunk.
pub fn font_entry() -> DeferredEntry {
    DeferredEntry::new(FONT_ENTRY).after(VENDORS_CHUNK)
}

/// Every native body of the bundle, keyed by id, for manifest-driven
/// deliveries.
pub fn font_bodies() -> BodyMap {
    let mut bodies = BodyMap::default();
    bodies.insert(ModuleId::from(FONT_ENTRY), font_entry_body());
    bodies.insert(ModuleId::from(ICONFONT_CSS), style_injector_body());
    bodies.insert(ModuleId::from(COMPILED_CSS), compiled_css_body());
    bodies.insert(
        ModuleId::from(EOT_ASSET),
        asset_body("static/font/084187c444.eot"),
    );
    bodies.insert(
        ModuleId::from(WOFF_ASSET),
        asset_body("static/font/836168041f.woff"),
    );
    bodies.insert(ModuleId::from(CSS_LOADER_API), css_loader_api_body());
    bodies
}
