//! [`Surface`] backed by absolutely positioned `div`s
//!
//! All primitives live under one root element, so child indices on the
//! surface match DOM child indices. Label text is drawn through a `::before`
//! pseudo-element and never adds DOM children.

use std::collections::HashMap;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use remote_ui_protocol::{ImageFormat, WindowSystemCursorType};

use crate::style::{geometry_css, image_data_url, label_text, opacity, paint_css, Declarations};
use crate::surface::{Geometry, Paint, Surface};

const NODE_CLASS: &str = "remote-ui-node";
const LABEL_CLASS: &str = "remote-ui-node remote-ui-label";

const STYLESHEET: &str = "\
.remote-ui-root { position: relative; width: 100%; height: 100%; overflow: hidden; }\n\
.remote-ui-node { position: absolute; box-sizing: border-box; overflow: hidden; }\n\
.remote-ui-label::before { content: attr(data-text); overflow: hidden; text-overflow: ellipsis; }\n";

pub struct DomSurface {
    document: Document,
    root: HtmlElement,
    images: HashMap<i64, String>,
}

impl DomSurface {
    /// Build the root (and its stylesheet) inside `container`
    pub fn new(document: &Document, container: &HtmlElement) -> Result<Self, JsValue> {
        let style = document.create_element("style")?;
        style.set_text_content(Some(STYLESHEET));
        container.append_child(&style)?;

        let root: HtmlElement = document.create_element("div")?.dyn_into()?;
        root.set_class_name("remote-ui-root");
        container.append_child(&root)?;

        Ok(Self {
            document: document.clone(),
            root,
            images: HashMap::new(),
        })
    }

    pub const fn root(&self) -> &HtmlElement {
        &self.root
    }

    fn apply(element: &HtmlElement, declarations: &Declarations) {
        let style = element.style();
        for (name, value) in declarations {
            if value.is_empty() {
                let _ = style.remove_property(name);
            } else {
                let _ = style.set_property(name, value);
            }
        }
    }
}

impl Surface for DomSurface {
    type Handle = HtmlElement;

    fn create(&mut self, node: i64) -> Option<HtmlElement> {
        let element = match self.document.create_element("div") {
            Ok(element) => element.dyn_into::<HtmlElement>().ok()?,
            Err(e) => {
                tracing::error!(node, ?e, "could not create element");
                return None;
            }
        };
        element.set_class_name(NODE_CLASS);
        let _ = element.set_attribute("data-node", &node.to_string());
        Some(element)
    }

    fn place(&mut self, handle: &HtmlElement, parent: Option<&HtmlElement>, index: usize) {
        let parent = parent.unwrap_or(&self.root);
        handle.remove();
        let reference = u32::try_from(index)
            .ok()
            .and_then(|i| parent.child_nodes().item(i));
        if let Err(e) = parent.insert_before(handle, reference.as_ref()) {
            tracing::warn!(?e, index, "could not place element");
        }
    }

    fn set_geometry(&mut self, handle: &HtmlElement, geometry: &Geometry) {
        Self::apply(handle, &geometry_css(geometry));
    }

    fn set_paint(&mut self, handle: &HtmlElement, paint: &Paint) {
        let images = &self.images;
        Self::apply(handle, &paint_css(paint, &|id| images.get(&id).cloned()));
        let style = handle.style();
        match opacity(paint) {
            "" => {
                let _ = style.remove_property("opacity");
            }
            value => {
                let _ = style.set_property("opacity", value);
            }
        }
        if let Some(text) = label_text(paint) {
            handle.set_class_name(LABEL_CLASS);
            let _ = handle.set_attribute("data-text", text);
        } else {
            handle.set_class_name(NODE_CLASS);
            let _ = handle.remove_attribute("data-text");
        }
        if matches!(paint, Paint::Polygon { .. } | Paint::Image { .. }) {
            let _ = style.set_property("pointer-events", "none");
        } else {
            let _ = style.remove_property("pointer-events");
        }
    }

    fn set_cursor(&mut self, handle: &HtmlElement, cursor: Option<WindowSystemCursorType>) {
        let style = handle.style();
        let _ = match cursor {
            Some(cursor) => style.set_property("cursor", cursor.css()),
            None => style.remove_property("cursor").map(drop),
        };
    }

    fn remove(&mut self, handle: &HtmlElement) {
        handle.remove();
    }

    fn define_image(&mut self, id: i64, format: ImageFormat, bytes: &[u8]) {
        self.images.insert(id, image_data_url(format, bytes));
    }

    fn drop_image(&mut self, id: i64) {
        self.images.remove(&id);
    }
}
