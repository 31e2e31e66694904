use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::bookmark::{BookmarkNode, FolderSummaryEntry};
use crate::models::preset::Preset;
use crate::models::suggestion::{RecommendedAction, Suggestion};
use crate::services::ai_service::AiGateway;
use crate::services::settings_service::GenerationParams;
use crate::services::tree_service::format_path;

#[derive(Debug, thiserror::Error)]
pub enum SuggestionParseError {
    #[error("no JSON object found in reply")]
    NoObject,

    #[error("reply object is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` has the wrong type")]
    InvalidField(&'static str),

    #[error("invalid recommendedAction: {0}")]
    InvalidAction(String),
}

pub fn build_suggestion_prompt(
    bookmark: &BookmarkNode,
    current_path: &[String],
    folder_summary: &[FolderSummaryEntry],
    preset: &Preset,
) -> Result<String, AppError> {
    let location = if current_path.is_empty() {
        "(top level)".to_string()
    } else {
        format_path(current_path)
    };
    let instructions = preset
        .instructions
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let summary_json = serde_json::to_string_pretty(folder_summary)?;
    let url = bookmark.url.as_deref().unwrap_or("");

    Ok(format!(
        "Analyze this bookmark and suggest where it belongs.\n\
\n\
Bookmark: {title}\n\
URL: {url}\n\
Current location: {location}\n\
\n\
Existing folders (paths are relative to the bookmarks bar, counts are direct children):\n\
{summary_json}\n\
\n\
Organization instructions ({preset_name}):\n\
{instructions}\n\
\n\
Respond with JSON in this exact format:\n\
{{\n\
  \"suggestedPath\": [\"Folder\", \"Subfolder\"],\n\
  \"explanation\": \"Explanation for the suggested location\",\n\
  \"currentLocationOptimal\": true,\n\
  \"styleMatches\": true,\n\
  \"stabilityScore\": 0.0,\n\
  \"recommendedAction\": \"move\"\n\
}}\n\
\"suggestedPath\" is relative to the bookmarks bar; an empty list means the top level.\n\
\"stabilityScore\" is a number between 0.0 and 1.0.\n\
\"recommendedAction\" is one of \"move\", \"keep\" or \"style_update\".\n\
No other text.",
        title = bookmark.title,
        preset_name = preset.name,
    ))
}

/// The first `{...}` substring whose braces balance, ignoring braces inside
/// JSON string literals.
pub fn extract_balanced_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

fn balanced_end(candidate: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in candidate.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn required<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, SuggestionParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Err(SuggestionParseError::MissingField(key)),
        Some(value) => Ok(value),
    }
}

fn required_bool(object: &Map<String, Value>, key: &'static str) -> Result<bool, SuggestionParseError> {
    required(object, key)?
        .as_bool()
        .ok_or(SuggestionParseError::InvalidField(key))
}

pub fn parse_suggestion_strict(text: &str) -> Result<Suggestion, SuggestionParseError> {
    let raw = extract_balanced_object(text).ok_or(SuggestionParseError::NoObject)?;
    let value: Value = serde_json::from_str(raw)?;
    let object = value
        .as_object()
        .ok_or(SuggestionParseError::NoObject)?;

    let suggested_path = required(object, "suggestedPath")?
        .as_array()
        .ok_or(SuggestionParseError::InvalidField("suggestedPath"))?
        .iter()
        .map(|segment| segment.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(SuggestionParseError::InvalidField("suggestedPath"))?;

    let explanation = required(object, "explanation")?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or(SuggestionParseError::MissingField("explanation"))?
        .to_string();

    let current_location_optimal = required_bool(object, "currentLocationOptimal")?;
    let style_matches = required_bool(object, "styleMatches")?;

    let stability_score = required(object, "stabilityScore")?
        .as_f64()
        .ok_or(SuggestionParseError::InvalidField("stabilityScore"))?
        .clamp(0.0, 1.0);

    let action_raw = required(object, "recommendedAction")?
        .as_str()
        .ok_or(SuggestionParseError::InvalidField("recommendedAction"))?;
    let recommended_action = action_raw
        .parse::<RecommendedAction>()
        .map_err(|_| SuggestionParseError::InvalidAction(action_raw.to_string()))?;

    Ok(Suggestion {
        suggested_path,
        explanation,
        current_location_optimal,
        style_matches,
        stability_score,
        recommended_action,
    })
}

/// Never fails: any malformed reply becomes a keep-in-place suggestion.
pub fn parse_suggestion(text: &str, current_path: &[String]) -> Suggestion {
    match parse_suggestion_strict(text) {
        Ok(suggestion) => suggestion,
        Err(err) => {
            tracing::warn!(error = %err, reply = %text, "unusable suggestion reply, keeping bookmark in place");
            Suggestion::keep_in_place(current_path)
        }
    }
}

/// One gateway round trip for one bookmark. Gateway failures propagate;
/// protocol failures fall back to keeping the bookmark where it is.
pub async fn request_suggestion<G: AiGateway>(
    gateway: &G,
    params: &GenerationParams,
    bookmark: &BookmarkNode,
    current_path: &[String],
    folder_summary: &[FolderSummaryEntry],
    preset: &Preset,
) -> Result<Suggestion, AppError> {
    let prompt = build_suggestion_prompt(bookmark, current_path, folder_summary, preset)?;
    let request = params.request(prompt);
    let reply = gateway.complete(&request).await?;
    Ok(parse_suggestion(&reply, current_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::testing::ScriptedGateway;
    use crate::services::ai_service::Provider;

    const WELL_FORMED: &str = r#"{
        "suggestedPath": ["Work", "2024"],
        "explanation": "Belongs with other work links",
        "currentLocationOptimal": false,
        "styleMatches": true,
        "stabilityScore": 0.8,
        "recommendedAction": "move"
    }"#;

    fn current_path() -> Vec<String> {
        vec!["Misc".to_string()]
    }

    fn preset() -> Preset {
        Preset {
            id: "p".into(),
            name: "Minimal Organization".into(),
            instructions: vec!["Use minimal names".into(), "Prefer subfolders".into()],
        }
    }

    fn params() -> GenerationParams {
        GenerationParams {
            provider: Provider::OpenAi,
            credential: "sk-test".into(),
            model: "gpt-4".into(),
            temperature: Some(0.3),
            max_output_tokens: Some(1024),
        }
    }

    #[test]
    fn parses_well_formed_object() {
        let suggestion = parse_suggestion_strict(WELL_FORMED).unwrap();
        assert_eq!(suggestion.suggested_path, vec!["Work", "2024"]);
        assert_eq!(suggestion.recommended_action, RecommendedAction::Move);
        assert!(!suggestion.current_location_optimal);
        assert!((suggestion.stability_score - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn surrounding_prose_does_not_change_result() {
        let alone = parse_suggestion(WELL_FORMED, &current_path());
        for wrapped in [
            format!("Sure! Here is my answer:\n{WELL_FORMED}\nHope this helps."),
            format!("```json\n{WELL_FORMED}\n```"),
            format!("{WELL_FORMED} trailing words"),
        ] {
            assert_eq!(parse_suggestion(&wrapped, &current_path()), alone);
        }
    }

    #[test]
    fn braces_inside_strings_do_not_break_balance() {
        let text = r#"note: {"suggestedPath": ["A}"], "explanation": "uses { and }", "currentLocationOptimal": true, "styleMatches": true, "stabilityScore": 1, "recommendedAction": "keep"} {"other": 1}"#;
        let suggestion = parse_suggestion_strict(text).unwrap();
        assert_eq!(suggestion.suggested_path, vec!["A}"]);
        assert_eq!(suggestion.explanation, "uses { and }");
    }

    #[test]
    fn extract_skips_unbalanced_prefix() {
        assert_eq!(extract_balanced_object("x } { \"a\": {} } y"), Some("{ \"a\": {} }"));
        assert_eq!(extract_balanced_object("{ never closed"), None);
        assert_eq!(extract_balanced_object("no braces"), None);
    }

    #[test]
    fn falls_back_without_object() {
        let fallback = parse_suggestion("I think it should move to Work.", &current_path());
        assert_eq!(fallback.recommended_action, RecommendedAction::Keep);
        assert_eq!(fallback.suggested_path, current_path());
    }

    #[test]
    fn falls_back_on_each_missing_or_mistyped_field() {
        let base: Value = serde_json::from_str(WELL_FORMED).unwrap();
        let mutations: Vec<(&str, Option<Value>)> = vec![
            ("suggestedPath", None),
            ("suggestedPath", Some(Value::String("Work".into()))),
            ("suggestedPath", Some(serde_json::json!(["Work", 7]))),
            ("explanation", None),
            ("explanation", Some(Value::String(String::new()))),
            ("currentLocationOptimal", Some(Value::String("false".into()))),
            ("styleMatches", None),
            ("stabilityScore", Some(Value::String("0.5".into()))),
            ("recommendedAction", Some(Value::String("delete".into()))),
            ("recommendedAction", None),
        ];

        for (field, replacement) in mutations {
            let mut object = base.as_object().unwrap().clone();
            match replacement {
                Some(value) => {
                    object.insert(field.to_string(), value);
                }
                None => {
                    object.remove(field);
                }
            }
            let text = Value::Object(object).to_string();
            assert!(parse_suggestion_strict(&text).is_err(), "{field} should be rejected");

            let fallback = parse_suggestion(&text, &current_path());
            assert_eq!(fallback.recommended_action, RecommendedAction::Keep);
            assert_eq!(fallback.suggested_path, current_path());
        }
    }

    #[test]
    fn decode_error_falls_back() {
        let fallback = parse_suggestion("{ suggestedPath: nope }", &current_path());
        assert_eq!(fallback, Suggestion::keep_in_place(&current_path()));
    }

    #[test]
    fn stability_score_is_clamped() {
        let text = WELL_FORMED.replace("0.8", "3.5");
        let suggestion = parse_suggestion_strict(&text).unwrap();
        assert!((suggestion.stability_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn prompt_mentions_bookmark_location_and_rules() {
        let bookmark = BookmarkNode::leaf("9", "Rust Book", "https://doc.rust-lang.org/book");
        let summary = vec![FolderSummaryEntry {
            path: "Work".into(),
            bookmark_count: 2,
            folder_count: 0,
        }];
        let prompt =
            build_suggestion_prompt(&bookmark, &["Misc".to_string()], &summary, &preset()).unwrap();

        assert!(prompt.contains("Bookmark: Rust Book"));
        assert!(prompt.contains("URL: https://doc.rust-lang.org/book"));
        assert!(prompt.contains("Current location: Misc"));
        assert!(prompt.contains("- Prefer subfolders"));
        assert!(prompt.contains("\"bookmarkCount\": 2"));
        assert!(prompt.contains("\"recommendedAction\""));
    }

    #[test]
    fn prompt_marks_top_level_location() {
        let bookmark = BookmarkNode::leaf("9", "Top", "https://top.example");
        let prompt = build_suggestion_prompt(&bookmark, &[], &[], &preset()).unwrap();
        assert!(prompt.contains("Current location: (top level)"));
    }

    #[tokio::test]
    async fn request_suggestion_sends_one_request_with_params() {
        let gateway = ScriptedGateway::new(vec![Ok(WELL_FORMED.to_string())]);
        let bookmark = BookmarkNode::leaf("9", "Rust Book", "https://doc.rust-lang.org/book");

        let suggestion =
            request_suggestion(&gateway, &params(), &bookmark, &current_path(), &[], &preset())
                .await
                .unwrap();
        assert_eq!(suggestion.recommended_action, RecommendedAction::Move);

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4");
        assert_eq!(requests[0].credential, "sk-test");
        assert_eq!(requests[0].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn request_suggestion_propagates_gateway_errors() {
        let gateway = ScriptedGateway::new(vec![Err("rate limited".to_string())]);
        let bookmark = BookmarkNode::leaf("9", "Rust Book", "https://doc.rust-lang.org/book");

        let err = request_suggestion(&gateway, &params(), &bookmark, &[], &[], &preset())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
    }
}
