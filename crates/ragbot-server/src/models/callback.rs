use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn factor(&self) -> f64 {
        match self {
            Direction::Increase => 1.25,
            Direction::Decrease => 0.75,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Direction::Increase => "+",
            Direction::Decrease => "-",
        }
    }
}

/// Data carried by one adjustment button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentPayload {
    pub action_id: i64,
    pub action: Direction,
}

impl AdjustmentPayload {
    pub fn parse(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    pub fn encode(&self) -> String {
        serde_json::json!({ "action_id": self.action_id, "action": self.action.as_str() }).to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ControlButton {
    pub label: String,
    pub payload: String,
}

/// Two-button `-`/`+` keyboard bound to one action.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdjustmentControl {
    pub action_id: i64,
    pub buttons: Vec<ControlButton>,
}

impl AdjustmentControl {
    pub fn for_action(action_id: i64) -> Self {
        let buttons = [Direction::Decrease, Direction::Increase]
            .into_iter()
            .map(|direction| ControlButton {
                label: direction.label().to_string(),
                payload: AdjustmentPayload { action_id, action: direction }.encode(),
            })
            .collect();

        Self { action_id, buttons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        let payload = AdjustmentPayload::parse(r#"{"action_id": 3, "action": "decrease"}"#).unwrap();
        assert_eq!(payload.action_id, 3);
        assert_eq!(payload.action, Direction::Decrease);
    }

    #[test]
    fn test_reject_malformed_payloads() {
        let rejected = [
            r#"{"action_id": 3}"#,
            r#"{"action_id": "3", "action": "increase"}"#,
            r#"{"action_id": 3, "action": "double"}"#,
            r#"{"action_id": 3, "action": "increase", "extra": 1}"#,
            r#"{'action_id': 3, 'action': 'increase'}"#,
            "__import__('os').system('id')",
            "",
        ];
        for raw in rejected {
            assert!(AdjustmentPayload::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_control_buttons_carry_decodable_payloads() {
        let control = AdjustmentControl::for_action(7);
        assert_eq!(control.buttons.len(), 2);
        assert_eq!(control.buttons[0].label, "-");
        assert_eq!(control.buttons[1].label, "+");

        let decrease = AdjustmentPayload::parse(&control.buttons[0].payload).unwrap();
        assert_eq!(decrease, AdjustmentPayload { action_id: 7, action: Direction::Decrease });
        let increase = AdjustmentPayload::parse(&control.buttons[1].payload).unwrap();
        assert_eq!(increase.action, Direction::Increase);
    }
}
