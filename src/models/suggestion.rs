use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Move,
    Keep,
    StyleUpdate,
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Keep => write!(f, "keep"),
            Self::StyleUpdate => write!(f, "style_update"),
        }
    }
}

impl std::str::FromStr for RecommendedAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move" => Ok(Self::Move),
            "keep" => Ok(Self::Keep),
            "style_update" => Ok(Self::StyleUpdate),
            _ => Err(format!("unknown recommended action: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub suggested_path: Vec<String>,
    pub explanation: String,
    pub current_location_optimal: bool,
    pub style_matches: bool,
    pub stability_score: f64,
    pub recommended_action: RecommendedAction,
}

impl Suggestion {
    /// Conservative reply used whenever the model output cannot be trusted:
    /// the bookmark stays where it is.
    pub fn keep_in_place(current_path: &[String]) -> Self {
        Self {
            suggested_path: current_path.to_vec(),
            explanation: "Error processing bookmark - maintaining current location".to_string(),
            current_location_optimal: true,
            style_matches: true,
            stability_score: 1.0,
            recommended_action: RecommendedAction::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names_round_trip() {
        for action in [
            RecommendedAction::Move,
            RecommendedAction::Keep,
            RecommendedAction::StyleUpdate,
        ] {
            let parsed: RecommendedAction = action.to_string().parse().unwrap();
            assert_eq!(parsed, action);
        }
        assert!("MOVE".parse::<RecommendedAction>().is_err());
    }

    #[test]
    fn keep_in_place_preserves_path() {
        let path = vec!["Bookmarks bar".to_string(), "Work".to_string()];
        let fallback = Suggestion::keep_in_place(&path);
        assert_eq!(fallback.suggested_path, path);
        assert_eq!(fallback.recommended_action, RecommendedAction::Keep);
    }
}
