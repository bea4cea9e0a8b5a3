//! Browser input translated into host events
//!
//! DOM events are first copied into plain snapshots so the translation can be
//! tested natively. Key codes go through a [`KeyCodeMap`]; the mapping table
//! itself lives outside this crate.

use remote_ui_protocol::{
    BrowserEvent, IOCharInfo, IOKeyInfo, IOMouseButton, IOMouseInfo, IOMouseInfoWithButton, Rect,
    WindowSizingConfig,
};

/// One wheel notch on the host side
pub const WHEEL_DELTA: f64 = 120.0;

/// Pixels the browser scrolls for one notch
const PIXELS_PER_NOTCH: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseSnapshot {
    /// Position relative to the window root
    pub x: f64,
    pub y: f64,
    /// DOM `buttons` bitmask: 1 left, 2 right, 4 middle
    pub buttons: u16,
    pub ctrl: bool,
    pub shift: bool,
    pub delta_x: f64,
    pub delta_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySnapshot {
    pub key: String,
    pub code: String,
    /// Legacy DOM `keyCode`
    pub key_code: u32,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub caps_lock: bool,
    pub repeat: bool,
}

/// Maps a DOM key to the host's key code
pub trait KeyCodeMap {
    fn host_code(&self, key: &KeySnapshot) -> Option<i64>;
}

/// Uses the legacy DOM `keyCode`, which follows virtual-key numbering for
/// letters, digits and most control keys
#[derive(Debug, Clone, Copy, Default)]
pub struct DomKeyCodes;

impl KeyCodeMap for DomKeyCodes {
    fn host_code(&self, key: &KeySnapshot) -> Option<i64> {
        (key.key_code != 0).then(|| i64::from(key.key_code))
    }
}

impl<F: Fn(&KeySnapshot) -> Option<i64>> KeyCodeMap for F {
    fn host_code(&self, key: &KeySnapshot) -> Option<i64> {
        self(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Down,
    Up,
    DoubleClick,
}

#[allow(clippy::cast_possible_truncation)]
pub fn mouse_info(mouse: &MouseSnapshot) -> IOMouseInfo {
    IOMouseInfo {
        ctrl: mouse.ctrl,
        shift: mouse.shift,
        left: mouse.buttons & 1 != 0,
        right: mouse.buttons & 2 != 0,
        middle: mouse.buttons & 4 != 0,
        x: mouse.x.round() as i64,
        y: mouse.y.round() as i64,
        wheel: 0,
        non_client: false,
    }
}

/// DOM `button` index to host button
pub const fn button_from_dom(button: i16) -> Option<IOMouseButton> {
    match button {
        0 => Some(IOMouseButton::Left),
        1 => Some(IOMouseButton::Middle),
        2 => Some(IOMouseButton::Right),
        _ => None,
    }
}

pub fn button_event(action: ButtonAction, button: i16, mouse: &MouseSnapshot) -> Option<BrowserEvent> {
    let info = IOMouseInfoWithButton {
        button: button_from_dom(button)?,
        info: mouse_info(mouse),
    };
    Some(match action {
        ButtonAction::Down => BrowserEvent::IOButtonDown(info),
        ButtonAction::Up => BrowserEvent::IOButtonUp(info),
        ButtonAction::DoubleClick => BrowserEvent::IOButtonDoubleClick(info),
    })
}

pub fn move_event(mouse: &MouseSnapshot) -> BrowserEvent {
    BrowserEvent::IOMouseMoving(mouse_info(mouse))
}

/// Wheel deltas in host units; the vertical axis is flipped (positive is up)
#[allow(clippy::cast_possible_truncation)]
pub fn wheel_events(mouse: &MouseSnapshot) -> Vec<BrowserEvent> {
    let notches = |pixels: f64| (pixels / PIXELS_PER_NOTCH * WHEEL_DELTA).round() as i64;
    let mut events = Vec::new();
    let vertical = -notches(mouse.delta_y);
    if vertical != 0 {
        events.push(BrowserEvent::IOVWheel(IOMouseInfo {
            wheel: vertical,
            ..mouse_info(mouse)
        }));
    }
    let horizontal = notches(mouse.delta_x);
    if horizontal != 0 {
        events.push(BrowserEvent::IOHWheel(IOMouseInfo {
            wheel: horizontal,
            ..mouse_info(mouse)
        }));
    }
    events
}

pub fn key_event(down: bool, key: &KeySnapshot, map: &dyn KeyCodeMap) -> Option<BrowserEvent> {
    let info = IOKeyInfo {
        code: map.host_code(key)?,
        ctrl: key.ctrl,
        shift: key.shift,
        alt: key.alt,
        capslock: key.caps_lock,
        auto_repeat_key_down: down && key.repeat,
    };
    Some(if down {
        BrowserEvent::IOKeyDown(info)
    } else {
        BrowserEvent::IOKeyUp(info)
    })
}

/// Character input for keys that produce text
pub fn char_event(key: &KeySnapshot) -> Option<BrowserEvent> {
    if key.ctrl || key.alt {
        return None;
    }
    let code = match key.key.as_str() {
        "Enter" => '\r',
        "Tab" => '\t',
        "Backspace" => '\u{8}',
        text => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return None,
            }
        }
    };
    Some(BrowserEvent::IOChar(IOCharInfo {
        code,
        ctrl: key.ctrl,
        shift: key.shift,
        alt: key.alt,
        capslock: key.caps_lock,
    }))
}

/// The browser window as seen by the host: no frame, filling the viewport
pub fn viewport_sizing(width: i64, height: i64) -> WindowSizingConfig {
    let bounds = Rect::new(0, 0, width.max(0), height.max(0));
    WindowSizingConfig {
        bounds,
        client_bounds: bounds,
        ..WindowSizingConfig::default()
    }
}

#[cfg(target_arch = "wasm32")]
pub use listeners::attach;

#[cfg(target_arch = "wasm32")]
mod listeners {
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{window, HtmlElement, KeyboardEvent, MouseEvent, WheelEvent};

    use super::{
        button_event, char_event, key_event, move_event, viewport_sizing, wheel_events,
        ButtonAction, DomKeyCodes, KeyCodeMap, KeySnapshot, MouseSnapshot,
    };
    use crate::handler::KeyState;
    use crate::transport::ClientHandle;
    use remote_ui_protocol::BrowserEvent;

    /// Virtual-key code of Caps Lock
    const CAPS_LOCK: i64 = 20;

    fn mouse_snapshot(root: &HtmlElement, e: &MouseEvent) -> MouseSnapshot {
        MouseSnapshot {
            x: f64::from(e.client_x() - root.offset_left()),
            y: f64::from(e.client_y() - root.offset_top()),
            buttons: e.buttons(),
            ctrl: e.ctrl_key() || e.meta_key(),
            shift: e.shift_key(),
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }

    fn key_snapshot(e: &KeyboardEvent) -> KeySnapshot {
        KeySnapshot {
            key: e.key(),
            code: e.code(),
            key_code: e.key_code(),
            ctrl: e.ctrl_key() || e.meta_key(),
            shift: e.shift_key(),
            alt: e.alt_key(),
            caps_lock: e.get_modifier_state("CapsLock"),
            repeat: e.repeat(),
        }
    }

    fn listen<E: JsCast + 'static>(
        target: &web_sys::EventTarget,
        name: &str,
        mut handler: impl FnMut(E) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(move |e: web_sys::Event| {
            if let Ok(e) = e.dyn_into::<E>() {
                handler(e);
            }
        }) as Box<dyn FnMut(_)>);
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    /// Feed mouse, wheel, keyboard and resize events into the outbox
    pub fn attach(root: &HtmlElement, handle: &ClientHandle, keys: &KeyState) -> Result<(), JsValue> {
        for (name, action) in [
            ("mousedown", ButtonAction::Down),
            ("mouseup", ButtonAction::Up),
            ("dblclick", ButtonAction::DoubleClick),
        ] {
            let (root_c, handle) = (root.clone(), handle.clone());
            listen(root, name, move |e: MouseEvent| {
                if action == ButtonAction::Down {
                    let _ = root_c.focus();
                }
                if let Some(event) = button_event(action, e.button(), &mouse_snapshot(&root_c, &e)) {
                    handle.send_event(&event);
                }
            })?;
        }

        let (root_c, handle_c) = (root.clone(), handle.clone());
        listen(root, "mousemove", move |e: MouseEvent| {
            handle_c.send_event(&move_event(&mouse_snapshot(&root_c, &e)));
        })?;

        let (root_c, handle_c) = (root.clone(), handle.clone());
        listen(root, "wheel", move |e: WheelEvent| {
            e.prevent_default();
            let mouse = MouseSnapshot {
                delta_x: e.delta_x(),
                delta_y: e.delta_y(),
                ..mouse_snapshot(&root_c, &e)
            };
            for event in wheel_events(&mouse) {
                handle_c.send_event(&event);
            }
        })?;

        let handle_c = handle.clone();
        listen(root, "mouseenter", move |_: MouseEvent| {
            handle_c.send_event(&BrowserEvent::IOMouseEntered);
        })?;
        let handle_c = handle.clone();
        listen(root, "mouseleave", move |_: MouseEvent| {
            handle_c.send_event(&BrowserEvent::IOMouseLeaved);
        })?;

        for down in [true, false] {
            let (handle_c, keys_c) = (handle.clone(), keys.clone());
            listen(root, if down { "keydown" } else { "keyup" }, move |e: KeyboardEvent| {
                let key = key_snapshot(&e);
                if let Some(code) = DomKeyCodes.host_code(&key) {
                    keys_c.set_pressed(code, down);
                }
                keys_c.set_toggled(CAPS_LOCK, key.caps_lock);
                if let Some(event) = key_event(down, &key, &DomKeyCodes) {
                    handle_c.send_event(&event);
                }
                if down {
                    if let Some(event) = char_event(&key) {
                        handle_c.send_event(&event);
                    }
                    e.prevent_default();
                }
            })?;
        }

        if let Some(win) = window() {
            let handle_c = handle.clone();
            let win_c = win.clone();
            listen(&win, "resize", move |_: web_sys::Event| {
                let size = |v: Result<JsValue, JsValue>| {
                    v.ok().and_then(|v| v.as_f64()).unwrap_or_default() as i64
                };
                let sizing =
                    viewport_sizing(size(win_c.inner_width()), size(win_c.inner_height()));
                handle_c.send_event(&BrowserEvent::WindowBoundsUpdated(sizing));
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> MouseSnapshot {
        MouseSnapshot {
            x,
            y,
            ..MouseSnapshot::default()
        }
    }

    fn key(key: &str, key_code: u32) -> KeySnapshot {
        KeySnapshot {
            key: key.to_string(),
            key_code,
            ..KeySnapshot::default()
        }
    }

    #[test]
    fn buttons_bitmask() {
        let info = mouse_info(&MouseSnapshot {
            buttons: 0b101,
            ..at(10.4, 20.6)
        });
        assert!(info.left && info.middle && !info.right);
        assert_eq!((info.x, info.y), (10, 21));
    }

    #[test]
    fn unknown_button_is_ignored() {
        assert!(button_event(ButtonAction::Down, 3, &at(0.0, 0.0)).is_none());
        assert!(matches!(
            button_event(ButtonAction::DoubleClick, 2, &at(0.0, 0.0)),
            Some(BrowserEvent::IOButtonDoubleClick(IOMouseInfoWithButton {
                button: IOMouseButton::Right,
                ..
            }))
        ));
    }

    #[test]
    fn wheel_down_is_negative() {
        let events = wheel_events(&MouseSnapshot {
            delta_y: 100.0,
            ..at(1.0, 1.0)
        });
        assert_eq!(events.len(), 1);
        let BrowserEvent::IOVWheel(info) = &events[0] else {
            panic!("expected vertical wheel");
        };
        assert_eq!(info.wheel, -120);
    }

    #[test]
    fn key_down_uses_map() {
        let map = |k: &KeySnapshot| (k.key == "a").then_some(65);
        assert!(matches!(
            key_event(true, &key("a", 0), &map),
            Some(BrowserEvent::IOKeyDown(IOKeyInfo { code: 65, .. }))
        ));
        assert!(key_event(true, &key("b", 66), &map).is_none());
        assert!(matches!(
            key_event(false, &key("b", 66), &DomKeyCodes),
            Some(BrowserEvent::IOKeyUp(IOKeyInfo { code: 66, .. }))
        ));
    }

    #[test]
    fn chars_for_text_keys_only() {
        assert!(matches!(
            char_event(&key("é", 0)),
            Some(BrowserEvent::IOChar(IOCharInfo { code: 'é', .. }))
        ));
        assert!(matches!(
            char_event(&key("Enter", 13)),
            Some(BrowserEvent::IOChar(IOCharInfo { code: '\r', .. }))
        ));
        assert!(char_event(&key("ArrowLeft", 37)).is_none());
        let ctrl_c = KeySnapshot {
            ctrl: true,
            ..key("c", 67)
        };
        assert!(char_event(&ctrl_c).is_none());
    }

    #[test]
    fn viewport_fills_window() {
        let sizing = viewport_sizing(800, 600);
        assert_eq!(sizing.client_bounds, Rect::new(0, 0, 800, 600));
        assert_eq!(sizing.bounds, sizing.client_bounds);
    }
}
