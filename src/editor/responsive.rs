//! Viewport-driven layout decisions for the editor chrome.

use serde::Serialize;

pub const MOBILE_MAX_WIDTH: f64 = 768.0;
pub const TABLET_MAX_WIDTH: f64 = 992.0;
/// Viewport change below which subscribers are not notified.
const SIGNIFICANT_DELTA: f64 = 50.0;

const TOUCH_TARGET_SIZE: u32 = 44;
const POINTER_TARGET_SIZE: u32 = 32;
const TOUCH_TARGET_SPACING: u32 = 8;
const POINTER_TARGET_SPACING: u32 = 4;
const MOBILE_TOOLTIP_DELAY_MS: u64 = 1000;
const TOOLTIP_DELAY_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn from_width(width: f64) -> Self {
        if width < MOBILE_MAX_WIDTH {
            DeviceType::Mobile
        } else if width < TABLET_MAX_WIDTH {
            DeviceType::Tablet
        } else {
            DeviceType::Desktop
        }
    }

    pub fn image_max_width(self) -> u32 {
        match self {
            DeviceType::Mobile => 600,
            DeviceType::Tablet => 1024,
            DeviceType::Desktop => 1920,
        }
    }

    pub fn image_quality(self) -> f32 {
        match self {
            DeviceType::Mobile => 0.7,
            DeviceType::Tablet => 0.8,
            DeviceType::Desktop => 0.9,
        }
    }

    pub fn grid_columns(self) -> u8 {
        match self {
            DeviceType::Mobile => 1,
            DeviceType::Tablet | DeviceType::Desktop => 2,
        }
    }

    pub fn tooltip_delay_ms(self) -> u64 {
        match self {
            DeviceType::Mobile => MOBILE_TOOLTIP_DELAY_MS,
            _ => TOOLTIP_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// What the host reports about the current window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub is_touch: bool,
    pub low_power: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveOptions {
    pub device_type: DeviceType,
    pub orientation: Orientation,
    pub is_touch_device: bool,
    pub is_low_power_device: bool,
    pub window_width: f64,
    pub window_height: f64,
}

impl ResponsiveOptions {
    pub fn from_viewport(viewport: Viewport) -> Self {
        ResponsiveOptions {
            device_type: DeviceType::from_width(viewport.width),
            orientation: if viewport.height > viewport.width {
                Orientation::Portrait
            } else {
                Orientation::Landscape
            },
            is_touch_device: viewport.is_touch,
            is_low_power_device: viewport.low_power,
            window_width: viewport.width,
            window_height: viewport.height,
        }
    }

    pub fn touch_target_size(&self) -> u32 {
        if self.is_touch_device {
            TOUCH_TARGET_SIZE
        } else {
            POINTER_TARGET_SIZE
        }
    }

    pub fn touch_target_spacing(&self) -> u32 {
        if self.is_touch_device {
            TOUCH_TARGET_SPACING
        } else {
            POINTER_TARGET_SPACING
        }
    }

    pub fn reduce_animations(&self) -> bool {
        self.is_low_power_device || self.device_type == DeviceType::Mobile
    }

    pub fn styles(&self) -> ResponsiveStyles {
        let mobile = self.device_type == DeviceType::Mobile;
        ResponsiveStyles {
            controls: ControlStyles {
                size: self.touch_target_size(),
                spacing: self.touch_target_spacing(),
                border_radius: if mobile { "4px" } else { "6px" },
                font_size: if mobile { "14px" } else { "16px" },
            },
            menu: MenuStyles {
                max_height: if self.orientation == Orientation::Portrait { "50vh" } else { "70vh" },
                width: if mobile { "100%" } else { "auto" },
                position: if mobile { "fixed" } else { "absolute" },
                bottom: if mobile { "0" } else { "auto" },
            },
            tooltip: TooltipStyles {
                delay: self.device_type.tooltip_delay_ms(),
                enabled: !mobile || self.orientation == Orientation::Landscape,
            },
            grid: GridStyles {
                columns: self.device_type.grid_columns(),
                gap: if mobile { "8px" } else { "16px" },
            },
            animations: AnimationStyles {
                enabled: !self.reduce_animations(),
                duration: if mobile { "150ms" } else { "300ms" },
            },
        }
    }

    fn differs_significantly(&self, other: &ResponsiveOptions) -> bool {
        self.device_type != other.device_type
            || self.orientation != other.orientation
            || (self.window_width - other.window_width).abs() > SIGNIFICANT_DELTA
            || (self.window_height - other.window_height).abs() > SIGNIFICANT_DELTA
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlStyles {
    pub size: u32,
    pub spacing: u32,
    pub border_radius: &'static str,
    pub font_size: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuStyles {
    pub max_height: &'static str,
    pub width: &'static str,
    pub position: &'static str,
    pub bottom: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipStyles {
    pub delay: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridStyles {
    pub columns: u8,
    pub gap: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationStyles {
    pub enabled: bool,
    pub duration: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsiveStyles {
    pub controls: ControlStyles,
    pub menu: MenuStyles,
    pub tooltip: TooltipStyles,
    pub grid: GridStyles,
    pub animations: AnimationStyles,
}

pub type Subscriber = Box<dyn FnMut(&ResponsiveOptions) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct ResponsiveUIManager {
    current: Option<ResponsiveOptions>,
    enabled: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl Default for ResponsiveUIManager {
    fn default() -> Self {
        ResponsiveUIManager {
            current: None,
            enabled: true,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }
}

impl ResponsiveUIManager {
    pub fn new() -> Self {
        ResponsiveUIManager::default()
    }

    pub fn options(&self) -> Option<&ResponsiveOptions> {
        self.current.as_ref()
    }

    pub fn styles(&self) -> Option<ResponsiveStyles> {
        self.current.as_ref().map(ResponsiveOptions::styles)
    }

    /// Stores the new viewport and notifies subscribers on the first update
    /// and on any significant change. Returns whether they were notified.
    pub fn update(&mut self, viewport: Viewport) -> bool {
        let next = ResponsiveOptions::from_viewport(viewport);
        let significant = self.current.as_ref().map_or(true, |prev| prev.differs_significantly(&next));
        self.current = Some(next);
        if significant {
            self.notify()
        } else {
            false
        }
    }

    /// Pauses or resumes notifications. Resuming re-sends the current options.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.notify();
        }
    }

    /// Registers `callback`, calling it at once when options are known.
    pub fn subscribe(&mut self, mut callback: Subscriber) -> SubscriptionId {
        if let Some(current) = &self.current {
            callback(current);
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
        self.current = None;
    }

    fn notify(&mut self) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        if !self.enabled {
            return false;
        }
        for (_, callback) in self.subscribers.iter_mut() {
            callback(current);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn viewport(width: f64, height: f64) -> Viewport {
        Viewport {
            width,
            height,
            is_touch: false,
            low_power: false,
        }
    }

    #[test]
    fn device_breakpoints() {
        assert_eq!(DeviceType::from_width(767.0), DeviceType::Mobile);
        assert_eq!(DeviceType::from_width(768.0), DeviceType::Tablet);
        assert_eq!(DeviceType::from_width(992.0), DeviceType::Desktop);
        assert_eq!(DeviceType::Tablet.image_max_width(), 1024);
        assert_eq!(DeviceType::Mobile.grid_columns(), 1);
    }

    #[test]
    fn mobile_portrait_styles() {
        let options = ResponsiveOptions::from_viewport(Viewport {
            width: 390.0,
            height: 844.0,
            is_touch: true,
            low_power: false,
        });
        let styles = options.styles();
        assert_eq!(styles.controls.size, 44);
        assert_eq!(styles.controls.spacing, 8);
        assert_eq!(styles.menu.max_height, "50vh");
        assert_eq!(styles.menu.position, "fixed");
        assert!(!styles.tooltip.enabled);
        assert_eq!(styles.tooltip.delay, 1000);
        assert!(!styles.animations.enabled);
        assert_eq!(styles.grid.gap, "8px");
    }

    #[test]
    fn desktop_pointer_styles() {
        let styles = ResponsiveOptions::from_viewport(viewport(1440.0, 900.0)).styles();
        assert_eq!(styles.controls.size, 32);
        assert_eq!(styles.menu.max_height, "70vh");
        assert!(styles.tooltip.enabled);
        assert!(styles.animations.enabled);
        assert_eq!(styles.animations.duration, "300ms");
    }

    #[test]
    fn subscribers_hear_only_significant_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ResponsiveUIManager::new();
        let sink = seen.clone();
        let id = manager.subscribe(Box::new(move |o: &ResponsiveOptions| {
            sink.lock().unwrap().push(o.window_width);
        }));

        assert!(manager.update(viewport(1200.0, 800.0)));
        assert!(!manager.update(viewport(1230.0, 820.0)));
        assert!(manager.update(viewport(1300.0, 820.0)));
        assert!(manager.update(viewport(700.0, 820.0)));
        assert_eq!(*seen.lock().unwrap(), vec![1200.0, 1300.0, 700.0]);

        let late = Arc::new(Mutex::new(0));
        let counter = late.clone();
        manager.subscribe(Box::new(move |_: &ResponsiveOptions| *counter.lock().unwrap() += 1));
        assert_eq!(*late.lock().unwrap(), 1);

        assert!(manager.unsubscribe(id));
        manager.set_enabled(false);
        assert!(!manager.update(viewport(300.0, 600.0)));
        manager.set_enabled(true);
        assert_eq!(*late.lock().unwrap(), 2);
    }
}
