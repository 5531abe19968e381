use crate::error::DocumentError;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Decoded survey definition file.
///
/// Only the fields used for listing are modelled; everything else in the
/// document is ignored. Missing or `null` containers decode to empty values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub props: SurveyProps,

    #[serde(default, deserialize_with = "null_as_default")]
    pub survey_definition: SurveyDefinition,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyProps {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: Vec<LocalisedObject>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: Vec<LocalisedObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
}

/// A locale code paired with ordered text fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalisedObject {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<ExpressionArg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpressionArg {
    #[serde(default, deserialize_with = "null_as_default")]
    pub str: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fields extracted from a valid survey document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSurvey {
    pub key: String,
    pub name: BTreeMap<String, String>,
    pub description: BTreeMap<String, String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Read and decode one survey definition.
pub fn parse_survey_document(path: &Path) -> Result<ParsedSurvey, DocumentError> {
    let data = std::fs::read(path)?;
    parse_survey_bytes(&data)
}

/// Decode survey definition bytes.
///
/// Fails with [`DocumentError::InvalidFormat`] when `surveyDefinition.key` is
/// absent or empty.
pub fn parse_survey_bytes(data: &[u8]) -> Result<ParsedSurvey, DocumentError> {
    let doc: SurveyDocument = serde_json::from_slice(data)?;
    if doc.survey_definition.key.is_empty() {
        return Err(DocumentError::InvalidFormat);
    }

    let metadata = if doc.metadata.is_empty() {
        None
    } else {
        Some(doc.metadata.into_iter().collect())
    };

    Ok(ParsedSurvey {
        key: doc.survey_definition.key,
        name: localized_to_flat_map(&doc.props.name),
        description: localized_to_flat_map(&doc.props.description),
        metadata,
    })
}

/// Join each locale's non-empty parts with a single space.
///
/// Locales whose joined text is empty are dropped.
pub fn localized_to_flat_map(objects: &[LocalisedObject]) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    for object in objects {
        let parts: Vec<&str> = object
            .parts
            .iter()
            .map(|part| part.str.as_str())
            .filter(|text| !text.is_empty())
            .collect();
        if parts.is_empty() {
            continue;
        }
        flat.insert(object.code.clone(), parts.join(" "));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const SURVEY: &str = r#"{
        "props": {
            "name": [
                {"code": "en", "parts": [{"str": "Hello"}, {"str": ""}, {"str": "World"}]},
                {"code": "fr", "parts": [{"str": ""}]},
                {"code": "de", "parts": [{"dtype": "exp"}, {"str": "Hallo"}]}
            ],
            "description": [{"code": "en", "parts": [{"str": "Weekly"}]}]
        },
        "surveyDefinition": {"key": "weekly", "items": []},
        "metadata": {"version": "3", "owner": "team"},
        "published": 1650000000
    }"#;

    #[test]
    fn decodes_key_text_and_metadata() {
        let parsed = parse_survey_bytes(SURVEY.as_bytes()).unwrap();

        assert_eq!(parsed.key, "weekly");
        assert_eq!(
            parsed.name,
            BTreeMap::from([
                ("de".to_string(), "Hallo".to_string()),
                ("en".to_string(), "Hello World".to_string()),
            ])
        );
        assert_eq!(
            parsed.description,
            BTreeMap::from([("en".to_string(), "Weekly".to_string())])
        );
        assert_eq!(
            parsed.metadata,
            Some(BTreeMap::from([
                ("owner".to_string(), "team".to_string()),
                ("version".to_string(), "3".to_string()),
            ]))
        );
    }

    #[test]
    fn missing_or_empty_key_is_invalid() {
        for raw in [
            r#"{"props": {"name": []}}"#,
            r#"{"surveyDefinition": {}}"#,
            r#"{"surveyDefinition": {"key": ""}}"#,
            r#"{"surveyDefinition": {"key": null}}"#,
        ] {
            let err = parse_survey_bytes(raw.as_bytes()).unwrap_err();
            assert!(
                matches!(err, DocumentError::InvalidFormat),
                "{raw} -> {err:?}"
            );
        }
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = parse_survey_bytes(b"{\"surveyDefinition\": ").unwrap_err();
        assert!(matches!(err, DocumentError::Decode(_)));

        let err = parse_survey_bytes(br#"{"surveyDefinition": {"key": "k"}, "metadata": {"n": 1}}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::Decode(_)));
    }

    #[test]
    fn unreadable_file_is_a_read_error() {
        let temp = tempdir().unwrap();
        let err = parse_survey_document(&temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, DocumentError::Read(_)));
    }

    #[test]
    fn null_containers_and_empty_metadata() {
        let parsed = parse_survey_bytes(
            br#"{"props": {"name": null, "description": null}, "surveyDefinition": {"key": "k"}, "metadata": {}}"#,
        )
        .unwrap();
        assert!(parsed.name.is_empty());
        assert_eq!(parsed.metadata, None);

        let parsed =
            parse_survey_bytes(br#"{"props": null, "surveyDefinition": {"key": "k"}, "metadata": null}"#)
                .unwrap();
        assert!(parsed.description.is_empty());
        assert_eq!(parsed.metadata, None);
    }

    #[test]
    fn locale_codes_are_not_validated() {
        let objects = vec![LocalisedObject {
            code: "xx-nonsense".into(),
            parts: vec![
                ExpressionArg { str: "a".into() },
                ExpressionArg { str: "b".into() },
            ],
        }];
        assert_eq!(
            localized_to_flat_map(&objects),
            BTreeMap::from([("xx-nonsense".to_string(), "a b".to_string())])
        );
    }
}
