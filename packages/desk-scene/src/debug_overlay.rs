//! Debug readout toggled by double-click.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    pub fps: u32,
    pub triangles: u64,
}

impl DebugInfo {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("FPS: {}", self.fps),
            format!("Triangles: {}", group_thousands(self.triangles)),
            "Double-click to hide".to_string(),
        ]
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `1234567` -> `"1,234,567"`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(12345), "12,345");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_lines() {
        let info = DebugInfo { fps: 58, triangles: 12345 };
        assert_eq!(info.lines(), vec!["FPS: 58", "Triangles: 12,345", "Double-click to hide"]);
    }

    #[test]
    fn test_json() {
        let info = DebugInfo { fps: 60, triangles: 10 };
        assert_eq!(info.to_json(), r#"{"fps":60,"triangles":10}"#);
    }
}
