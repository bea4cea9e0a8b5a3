//! Geometry, fonts, window/controller configuration and input shapes

use crate::{wire_enum, wire_struct};

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Point = "Point" {
        pub x: i64 = "x",
        pub y: i64 = "y",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Size = "Size" {
        pub x: i64 = "x",
        pub y: i64 = "y",
    }
}

wire_struct! {
    /// Half-open rectangle `[x1, x2) x [y1, y2)`
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Rect = "Rect" {
        pub x1: i64 = "x1",
        pub y1: i64 = "y1",
        pub x2: i64 = "x2",
        pub y2: i64 = "y2",
    }
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl Size {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl Rect {
    pub const fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub const fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub const fn height(&self) -> i64 {
        self.y2 - self.y1
    }

    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Overlap of two rectangles; disjoint inputs give an empty rectangle
    /// anchored at the clamped corner
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        Self {
            x1,
            y1,
            x2: self.x2.min(other.x2).max(x1),
            y2: self.y2.min(other.y2).max(y1),
        }
    }

    #[must_use]
    pub const fn translate(&self, dx: i64, dy: i64) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum WindowHitTestResult = "WindowHitTestResult" {
        BorderNoSizing = "BorderNoSizing",
        BorderLeft = "BorderLeft",
        BorderRight = "BorderRight",
        BorderTop = "BorderTop",
        BorderBottom = "BorderBottom",
        BorderLeftTop = "BorderLeftTop",
        BorderRightTop = "BorderRightTop",
        BorderLeftBottom = "BorderLeftBottom",
        BorderRightBottom = "BorderRightBottom",
        Title = "Title",
        ButtonMinimum = "ButtonMinimum",
        ButtonMaximum = "ButtonMaximum",
        ButtonClose = "ButtonClose",
        Client = "Client",
        Icon = "Icon",
        #[default]
        NoDecision = "NoDecision",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum WindowSystemCursorType = "WindowSystemCursorType" {
        SmallWaiting = "SmallWaiting",
        LargeWaiting = "LargeWaiting",
        #[default]
        Arrow = "Arrow",
        Cross = "Cross",
        Hand = "Hand",
        Help = "Help",
        IBeam = "IBeam",
        SizeAll = "SizeAll",
        SizeNesw = "SizeNESW",
        SizeNs = "SizeNS",
        SizeNwse = "SizeNWSE",
        SizeWe = "SizeWE",
    }
}

impl WindowSystemCursorType {
    /// CSS `cursor` keyword
    pub const fn css(&self) -> &'static str {
        match self {
            Self::SmallWaiting => "progress",
            Self::LargeWaiting => "wait",
            Self::Arrow => "default",
            Self::Cross => "crosshair",
            Self::Hand => "pointer",
            Self::Help => "help",
            Self::IBeam => "text",
            Self::SizeAll => "move",
            Self::SizeNesw => "nesw-resize",
            Self::SizeNs => "ns-resize",
            Self::SizeNwse => "nwse-resize",
            Self::SizeWe => "ew-resize",
        }
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum WindowSizeState = "WindowSizeState" {
        Minimized = "Minimized",
        #[default]
        Restored = "Restored",
        Maximized = "Maximized",
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum IOMouseButton = "IOMouseButton" {
        Left = "Left",
        Middle = "Middle",
        Right = "Right",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct FontProperties = "FontProperties" {
        pub font_family: String = "fontFamily",
        pub size: i64 = "size",
        pub bold: bool = "bold",
        pub italic: bool = "italic",
        pub underline: bool = "underline",
        pub strikeline: bool = "strikeline",
        pub antialias: bool = "antialias",
        pub vertical_antialias: bool = "verticalAntialias",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct FontConfig = "FontConfig" {
        pub default_font: FontProperties = "defaultFont",
        pub supported_fonts: Option<Vec<String>> = "supportedFonts",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ScreenConfig = "ScreenConfig" {
        pub bounds: Rect = "bounds",
        pub client_bounds: Rect = "clientBounds",
        pub scaling_x: f64 = "scalingX",
        pub scaling_y: f64 = "scalingY",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct WindowSizingConfig = "WindowSizingConfig" {
        pub bounds: Rect = "bounds",
        pub client_bounds: Rect = "clientBounds",
        pub size_state: WindowSizeState = "sizeState",
        pub custom_frame_padding: Rect = "customFramePadding",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct WindowShowing = "WindowShowing" {
        pub activate: bool = "activate",
        pub size_state: WindowSizeState = "sizeState",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct IOMouseInfo = "IOMouseInfo" {
        pub ctrl: bool = "ctrl",
        pub shift: bool = "shift",
        pub left: bool = "left",
        pub middle: bool = "middle",
        pub right: bool = "right",
        pub x: i64 = "x",
        pub y: i64 = "y",
        pub wheel: i64 = "wheel",
        pub non_client: bool = "nonClient",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IOMouseInfoWithButton = "IOMouseInfoWithButton" {
        pub button: IOMouseButton = "button",
        pub info: IOMouseInfo = "info",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct IOKeyInfo = "IOKeyInfo" {
        pub code: i64 = "code",
        pub ctrl: bool = "ctrl",
        pub shift: bool = "shift",
        pub alt: bool = "alt",
        pub capslock: bool = "capslock",
        pub auto_repeat_key_down: bool = "autoRepeatKeyDown",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IOCharInfo = "IOCharInfo" {
        pub code: char = "code",
        pub ctrl: bool = "ctrl",
        pub shift: bool = "shift",
        pub alt: bool = "alt",
        pub capslock: bool = "capslock",
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct GlobalShortcutKey = "GlobalShortcutKey" {
        pub id: i64 = "id",
        pub ctrl: bool = "ctrl",
        pub shift: bool = "shift",
        pub alt: bool = "alt",
        pub code: i64 = "code",
    }
}
