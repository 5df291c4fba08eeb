use serde::{Deserialize, Serialize};
use std::fmt;

/// Bridge-assigned light identifier.
pub type LightId = u32;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Arithmetic mean of the three channels.
    pub fn brightness(&self) -> f32 {
        self.channel_sum() as f32 / 3.0
    }

    pub fn channel_sum(&self) -> u16 {
        self.r as u16 + self.g as u16 + self.b as u16
    }

    /// True when all channels are equal (a gray, black or white).
    pub fn is_achromatic(&self) -> bool {
        self.r == self.g && self.g == self.b
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Extracted colors, most dominant first.
pub type Palette = Vec<Color>;

/// One poll result from the playback service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// Comma-separated artist names.
    pub artist: String,
    pub album: String,
    pub artwork_url: Option<String>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub is_playing: bool,
}

/// Colors chosen for each configured light, in configured light order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightAssignment {
    entries: Vec<(LightId, Color)>,
}

impl LightAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the color of `light`, replacing any earlier entry for it.
    pub fn insert(&mut self, light: LightId, color: Color) {
        match self.entries.iter_mut().find(|(id, _)| *id == light) {
            Some(entry) => entry.1 = color,
            None => self.entries.push((light, color)),
        }
    }

    pub fn get(&self, light: LightId) -> Option<Color> {
        self.entries
            .iter()
            .find(|(id, _)| *id == light)
            .map(|(_, color)| *color)
    }

    pub fn light_ids(&self) -> impl Iterator<Item = LightId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LightId, Color)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A light as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightInfo {
    pub id: LightId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub on: bool,
    pub reachable: bool,
    pub color_capable: bool,
    /// Color the running sync last assigned to this light.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_color: Option<Color>,
}

impl LightInfo {
    /// Color capability is derived from the bridge's light type.
    pub fn new(id: LightId, name: String, kind: String, on: bool, reachable: bool) -> Self {
        Self {
            color_capable: kind.to_lowercase().contains("color"),
            id,
            name,
            kind,
            on,
            reachable,
            current_color: None,
        }
    }
}

/// A room or zone defined on the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightGroup {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub class: String,
    pub lights: Vec<LightId>,
}

/// State pushed to a single light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightState {
    /// CIE chromaticity coordinates.
    pub xy: (f64, f64),
    /// Device brightness, 0-254.
    pub brightness: u8,
    /// Transition time in deciseconds.
    pub transition: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_is_channel_mean() {
        assert_eq!(Color::new(30, 60, 90).brightness(), 60.0);
        assert_eq!(Color::new(255, 255, 255).channel_sum(), 765);
    }

    #[test]
    fn assignment_keeps_insertion_order_and_replaces() {
        let mut assignment = LightAssignment::new();
        assignment.insert(12, Color::RED);
        assignment.insert(3, Color::GREEN);
        assignment.insert(12, Color::BLUE);

        assert_eq!(assignment.light_ids().collect::<Vec<_>>(), vec![12, 3]);
        assert_eq!(assignment.get(12), Some(Color::BLUE));
        assert_eq!(assignment.get(7), None);
    }

    #[test]
    fn color_capability_comes_from_type() {
        let light = LightInfo::new(1, "Desk".into(), "Extended color light".into(), true, true);
        assert!(light.color_capable);
        let plain = LightInfo::new(2, "Shelf".into(), "Dimmable light".into(), true, true);
        assert!(!plain.color_capable);
    }

    #[test]
    fn light_info_serializes_capability() {
        let mut light = LightInfo::new(1, "Desk".into(), "Color light".into(), false, true);
        let json = serde_json::to_value(&light).unwrap();
        assert_eq!(json["type"], "Color light");
        assert_eq!(json["color_capable"], true);
        assert!(json.get("current_color").is_none());

        light.current_color = Some(Color::BLUE);
        let json = serde_json::to_value(&light).unwrap();
        assert_eq!(json["current_color"], serde_json::json!({"r": 0, "g": 0, "b": 255}));
    }
}
